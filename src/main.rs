use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use civicmsg::api::{Credentials, DashboardApi, HttpDashboard, Role, SendRequest};
use civicmsg::app::{App, Field};
use civicmsg::config::Config;
use civicmsg::dispatch::Dispatcher;
use civicmsg::editor;
use civicmsg::event::{AppEvent, Effect, SendOrigin};
use civicmsg::inbox;
use civicmsg::poller::Poller;
use civicmsg::ui;

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[derive(Parser, Debug)]
#[command(
    name = "civicmsg",
    version,
    about = "Messages and notifications from the complaint dashboard, in the terminal"
)]
struct Cli {
    /// Config file (default: ~/.config/civicmsg/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Dashboard origin, overrides the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Dashboard role: resident or official
    #[arg(long)]
    role: Option<Role>,

    /// Sign-in email
    #[arg(long)]
    email: Option<String>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print conversations, newest first
    Inbox,
    /// Print notifications
    Notifications,
    /// Send one message and exit
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        content: String,
        /// Related complaint id
        #[arg(long)]
        complaint: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, warning) = Config::load(cli.config.as_deref());
    if let Some(base_url) = cli.base_url {
        config.server.base_url = base_url;
    }
    if let Some(role) = cli.role {
        config.server.role = role;
    }
    if let Some(email) = cli.email {
        config.server.email = Some(email);
    }
    let config = Arc::new(config);

    init_logging(&config, cli.debug)?;
    info!("civicmsg {} against {}", env!("CARGO_PKG_VERSION"), config.server.base_url);
    if let Some(w) = &warning {
        warn!("{}", w);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let api: Arc<dyn DashboardApi> = Arc::new(
        HttpDashboard::new(&config.server.base_url)
            .with_context(|| format!("Bad base URL {}", config.server.base_url))?,
    );
    let credentials = config.credentials();

    match cli.command {
        Some(command) => runtime.block_on(run_command(config, api, credentials, command)),
        None => run_tui(config, warning, runtime, api, credentials),
    }
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(config: &Config, debug: bool) -> Result<()> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log.level))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_command(
    config: Arc<Config>,
    api: Arc<dyn DashboardApi>,
    credentials: Option<Credentials>,
    command: Command,
) -> Result<()> {
    if let Some(credentials) = &credentials {
        api.login(credentials).await.context("Sign-in failed")?;
    }

    match command {
        Command::Inbox => {
            let conversations = inbox::group_conversations(api.messages().await?);
            if conversations.is_empty() {
                println!("{}", ui::NO_MESSAGES);
            }
            for c in &conversations {
                let preview = c
                    .latest_message()
                    .map(|m| ui::format::one_line(&m.preview()))
                    .unwrap_or_default();
                let unread = match c.unread_count() {
                    0 => String::new(),
                    n => format!(" ({} unread)", n),
                };
                println!(
                    "{} {} {}{}",
                    ui::format::truncate(&c.latest.display(), config.layout.date_width),
                    ui::format::truncate(
                        &format!("{} <{}>", c.name, c.email),
                        config.layout.name_width * 2
                    ),
                    preview,
                    unread
                );
            }
        }
        Command::Notifications => {
            let notifications = api.notifications().await?;
            if notifications.is_empty() {
                println!("{}", ui::NO_NOTIFICATIONS);
            }
            for n in &notifications {
                let marker = if n.read { " " } else { "*" };
                println!(
                    "{} {} {}: {}",
                    marker,
                    ui::format::truncate(&n.timestamp.display(), config.layout.date_width),
                    n.title_display(),
                    ui::format::one_line(n.body())
                );
            }
        }
        Command::Send {
            to,
            subject,
            content,
            complaint,
        } => {
            let request = SendRequest {
                to_email: to,
                subject,
                content,
                complaint_id: complaint.filter(|c| !c.is_empty()),
            };
            let result = api.send_message(&request).await;
            let delivered = matches!(&result, Ok(resp) if resp.success);

            // Same wording as the interactive forms
            let mut app = App::new(config, false);
            app.apply(AppEvent::Sent {
                origin: SendOrigin::Direct,
                result,
            });
            let text = app.alert.unwrap_or_default();
            if !delivered {
                return Err(anyhow!(text));
            }
            println!("{}", text);
        }
    }
    Ok(())
}

fn run_tui(
    config: Arc<Config>,
    warning: Option<String>,
    runtime: Runtime,
    api: Arc<dyn DashboardApi>,
    credentials: Option<Credentials>,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let can_login = credentials.is_some();
    let dispatcher = Dispatcher::new(api, runtime.handle().clone(), tx, credentials);

    let mut app = App::new(config.clone(), can_login);
    if let Some(w) = warning {
        app.set_status(&w);
    }
    dispatcher.run_all(app.startup_effects());

    let refresher = dispatcher.clone();
    let mut poller = Poller::spawn(runtime.handle(), config.poll_period(), move |cycle, reason| {
        debug!("refresh cycle {} ({:?})", cycle, reason);
        refresher.refresh();
    });

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &dispatcher, &poller, rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    poller.stop();
    runtime.shutdown_timeout(Duration::from_secs(1));
    info!("bye");
    result
}

fn event_loop(
    terminal: &mut Tui,
    app: &mut App,
    dispatcher: &Dispatcher,
    poller: &Poller,
    mut rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        // Apply background results first so the frame shows them
        while let Ok(event) = rx.try_recv() {
            let effects = app.apply(event);
            run_effects(terminal, app, dispatcher, poller, effects)?;
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if app.should_quit {
            return Ok(());
        }

        // Poll with timeout so results show up without input
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                app.clear_status();
                let effects = app.handle_key(key);
                run_effects(terminal, app, dispatcher, poller, effects)?;
            }
            Event::FocusGained => {
                debug!("terminal focused, refreshing");
                poller.trigger();
            }
            _ => {}
        }
    }
}

fn run_effects(
    terminal: &mut Tui,
    app: &mut App,
    dispatcher: &Dispatcher,
    poller: &Poller,
    effects: Vec<Effect>,
) -> Result<()> {
    for effect in effects {
        match effect {
            Effect::EditContent => edit_content(terminal, app)?,
            Effect::Refresh => {
                app.set_status("Refreshing...");
                poller.trigger();
            }
            other => dispatcher.run(other),
        }
    }
    Ok(())
}

/// Hand the focused form's body to $EDITOR
fn edit_content(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let Some(current) = app.active_form_mut().map(|form| form.content.clone()) else {
        return Ok(());
    };

    match editor::edit_text(&current) {
        Ok(Some(text)) => {
            if let Some(form) = app.active_form_mut() {
                form.content = text;
                form.focus = Field::Content;
            }
        }
        Ok(None) => app.set_status("Editor cancelled"),
        Err(e) => {
            error!("editor failed: {:#}", e);
            app.set_status(&format!("Editor failed: {}", e));
        }
    }
    terminal.clear()?;
    Ok(())
}
