use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use gym_portal::api::Gateway;
use gym_portal::config;
use gym_portal::models::Role;
use gym_portal::session::SessionStore;
use gym_portal::ui::{
    admin::{handle_input as handle_admin_input, render_admin, AdminAction, AdminScreenState},
    login::{handle_input as handle_login_input, render_login, LoginAction, LoginState},
    member::{
        handle_input as handle_member_input, render_member, MemberAction, MemberLoad,
        MemberScreenState, MemberSummary,
    },
};
use gym_portal::workflow::{Outcome, PendingRequest};

/// Strength Gym membership portal
#[derive(Parser, Debug)]
#[command(name = "gym-portal", version, about)]
struct Cli {
    /// Backend base URL (overrides GYM_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Session file holding the token and role (overrides GYM_SESSION_FILE)
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Log file (overrides GYM_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Forget the saved session before starting
    #[arg(long)]
    logout: bool,
}

// Represents the current screen in the app
enum AppScreen {
    Login,
    Admin,
    Member,
}

// Network work queued by a screen; run after the next draw so the screen
// can show that it is waiting.
enum Task {
    SignIn { email: String, password: String },
    Register { name: String, email: String, password: String },
    LoadRoster,
    Submit(PendingRequest),
    LoadMemberPlan,
}

// Main application state
struct AppState {
    gateway: Gateway,
    screen: AppScreen,
    login_state: LoginState,
    admin_state: Option<AdminScreenState>,
    member_state: Option<MemberScreenState>,
    pending: Option<Task>,
}

impl AppState {
    fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            screen: AppScreen::Login,
            login_state: LoginState::new(),
            admin_state: None,
            member_state: None,
            pending: None,
        }
    }

    fn enter_role(&mut self, role: Role) {
        match role {
            Role::Admin => {
                self.admin_state = Some(AdminScreenState::new(today()));
                self.screen = AppScreen::Admin;
                self.schedule_roster_load();
            }
            Role::Client => {
                self.member_state = Some(MemberScreenState::new());
                self.screen = AppScreen::Member;
                self.pending = Some(Task::LoadMemberPlan);
            }
        }
    }

    fn schedule_roster_load(&mut self) {
        if let Some(admin) = &mut self.admin_state {
            admin.dashboard.mark_loading();
            self.pending = Some(Task::LoadRoster);
        }
    }

    fn show_login(&mut self, message: Option<&str>) {
        self.login_state = LoginState::new();
        self.login_state.error = message.map(str::to_string);
        self.admin_state = None;
        self.member_state = None;
        self.pending = None;
        self.screen = AppScreen::Login;
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?.with_overrides(cli.api_url, cli.session_file, cli.log_file);
    init_logging(&config.log_path())?;
    println!("Connecting to {}...", config.api_url());

    let mut session = SessionStore::open(config.session_path())?;
    if cli.logout {
        session.clear()?;
    }
    info!(api = config.api_url(), "portal starting");
    let gateway = Gateway::new(config.api_url(), session);

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new(gateway);

    // Resume a saved session straight into its dashboard
    let session = app_state.gateway.session().await;
    if session.is_authenticated() {
        if let Some(role) = session.role {
            app_state.enter_role(role);
        }
    }

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("Error: {:#}", err);
    }

    println!("See you at the gym!");

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| match app_state.screen {
            AppScreen::Login => render_login(f, &app_state.login_state),
            AppScreen::Admin => {
                if let Some(state) = &mut app_state.admin_state {
                    render_admin(f, state);
                }
            }
            AppScreen::Member => {
                if let Some(state) = &app_state.member_state {
                    render_member(f, state);
                }
            }
        })?;

        if let Some(task) = app_state.pending.take() {
            run_task(app_state, task).await;
            continue;
        }

        let should_quit = match app_state.screen {
            AppScreen::Login => handle_login_screen(app_state)?,
            AppScreen::Admin => handle_admin_screen(app_state).await?,
            AppScreen::Member => handle_member_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn run_task(app_state: &mut AppState, task: Task) {
    match task {
        Task::SignIn { email, password } => {
            match app_state.gateway.login(&email, &password).await {
                Ok(auth) => app_state.enter_role(auth.role),
                Err(e) => app_state.login_state.fail(e.to_string()),
            }
        }
        Task::Register {
            name,
            email,
            password,
        } => match app_state.gateway.register(&name, &email, &password).await {
            Ok(auth) => app_state.enter_role(auth.role),
            Err(e) => app_state.login_state.fail(e.to_string()),
        },
        Task::LoadRoster => {
            let Some(admin) = &mut app_state.admin_state else {
                return;
            };
            match admin.dashboard.refresh(&app_state.gateway).await {
                Err(e) if e.is_auth() => {
                    app_state.show_login(Some("Session expired, please sign in again"))
                }
                _ => admin.clamp_selection(),
            }
        }
        Task::Submit(request) => {
            let Some(admin) = &mut app_state.admin_state else {
                return;
            };
            let result = request.send(&app_state.gateway).await;
            match admin.dashboard.complete(result) {
                Outcome::Refetch => app_state.schedule_roster_load(),
                Outcome::SignedOut => {
                    app_state.show_login(Some("Session expired, please sign in again"))
                }
                Outcome::Retained => {}
            }
        }
        Task::LoadMemberPlan => {
            let load = match app_state.gateway.my_plan().await {
                Ok(Some(plan)) => MemberLoad::Active(Box::new(MemberSummary::new(plan, today()))),
                Ok(None) => MemberLoad::NoPlan,
                Err(e) if e.is_auth() => {
                    app_state.show_login(Some("Session expired, please sign in again"));
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "failed to fetch own plan");
                    MemberLoad::Failed(e.to_string())
                }
            };
            if let Some(member) = &mut app_state.member_state {
                member.load = load;
            }
        }
    }
}

fn handle_login_screen(app_state: &mut AppState) -> Result<bool> {
    match handle_login_input(&mut app_state.login_state)? {
        Some(LoginAction::Quit) => return Ok(true),
        Some(LoginAction::SignIn { email, password }) => {
            app_state.pending = Some(Task::SignIn { email, password });
        }
        Some(LoginAction::Register {
            name,
            email,
            password,
        }) => {
            app_state.pending = Some(Task::Register {
                name,
                email,
                password,
            });
        }
        None => {}
    }

    Ok(false)
}

async fn handle_admin_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.admin_state {
        match handle_admin_input(state, today())? {
            Some(AdminAction::Quit) => return Ok(true),
            Some(AdminAction::Logout) => {
                app_state.gateway.logout().await;
                app_state.show_login(None);
            }
            Some(AdminAction::Refresh) => app_state.schedule_roster_load(),
            Some(AdminAction::Submit) => {
                if let Some(request) = state.dashboard.begin_submit() {
                    app_state.pending = Some(Task::Submit(request));
                }
            }
            None => {}
        }
    }

    Ok(false)
}

async fn handle_member_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.member_state {
        match handle_member_input(state)? {
            Some(MemberAction::Quit) => return Ok(true),
            Some(MemberAction::Logout) => {
                app_state.gateway.logout().await;
                app_state.show_login(None);
            }
            Some(MemberAction::Retry) => {
                state.load = MemberLoad::Loading;
                app_state.pending = Some(Task::LoadMemberPlan);
            }
            None => {}
        }
    }

    Ok(false)
}
