pub mod api;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod event;
pub mod inbox;
pub mod poller;
pub mod ui;
