use crate::auth::{AuthUser, IdentityProvider};
use crate::config::Config;
use crate::theme::Theme;
use crate::users::{UserDocument, UserService, UserSettings};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use quiz_core::{
    Difficulty, LeaderboardEntry, LeaderboardFilter, Quiz, Session, SessionPhase, SessionResult,
    Submission, TimeBand, UserStatistics, DURATION_CHOICES,
};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Poll interval of the event loop
pub const TICK_RATE: Duration = Duration::from_millis(100);

const SECOND: Duration = Duration::from_secs(1);

/// Result of handling a key press
pub enum AppAction {
    Continue,
    Quit,
}

/// Current screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    /// Sign in or create an account
    Login,
    /// The quiz itself, before and during the countdown
    Game,
    /// Final score and the save status of the session
    GameOver,
    /// The player's statistics
    Profile,
    Leaderboard,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
    Name,
}

/// Login / sign-up form
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub mode: LoginMode,
    pub field: LoginField,
    pub email: String,
    pub password: String,
    pub name: String,
    pub error: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            mode: LoginMode::SignIn,
            field: LoginField::Email,
            email: String::new(),
            password: String::new(),
            name: String::new(),
            error: None,
        }
    }
}

impl LoginForm {
    fn fields(&self) -> &'static [LoginField] {
        match self.mode {
            LoginMode::SignIn => &[LoginField::Email, LoginField::Password],
            LoginMode::SignUp => &[LoginField::Name, LoginField::Email, LoginField::Password],
        }
    }

    fn move_field(&mut self, forward: bool) {
        let fields = self.fields();
        let idx = fields.iter().position(|&f| f == self.field).unwrap_or(0);
        let next = if forward {
            (idx + 1) % fields.len()
        } else {
            (idx + fields.len() - 1) % fields.len()
        };
        self.field = fields[next];
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        };
        self.field = self.fields()[0];
        self.error = None;
    }

    fn current_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
            LoginField::Name => &mut self.name,
        }
    }
}

/// Rows of the settings screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Name,
    Theme,
    Sound,
    Notifications,
}

impl SettingsRow {
    pub const ALL: [SettingsRow; 4] = [
        SettingsRow::Name,
        SettingsRow::Theme,
        SettingsRow::Sound,
        SettingsRow::Notifications,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub row: usize,
    pub name: String,
    pub settings: UserSettings,
    pub status: Option<Result<String, String>>,
}

impl SettingsForm {
    pub fn selected(&self) -> SettingsRow {
        SettingsRow::ALL[self.row.min(SettingsRow::ALL.len() - 1)]
    }
}

/// Where the result of the last session is on its way to the store
#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    Idle,
    /// Written on the next tick, after a frame announcing it
    Pending,
    Saved(UserStatistics),
    Failed(String),
}

/// The main application state
pub struct App {
    config: Config,
    pub theme: Theme,
    auth: Arc<dyn IdentityProvider>,
    auth_rx: Receiver<Option<AuthUser>>,
    users: UserService,
    /// Signed-in player
    pub user: Option<AuthUser>,
    /// Current screen state
    pub screen_state: ScreenState,
    pub login: LoginForm,
    /// Problem feed and the typed answer
    pub quiz: Quiz,
    /// Score and countdown of the current game
    pub session: Session,
    /// When the countdown last advanced
    last_second: Option<Instant>,
    pub last_result: Option<SessionResult>,
    pub save_state: SaveState,
    pub leaderboard_filter: LeaderboardFilter,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub profile: Option<UserDocument>,
    pub settings_form: SettingsForm,
    /// Message to display
    pub message: Option<String>,
    /// Message timer
    message_timer: u32,
}

impl App {
    pub fn new(config: Config, auth: Arc<dyn IdentityProvider>, users: UserService) -> Self {
        let auth_rx = auth.subscribe();
        let difficulty = config.default_difficulty;
        let mut app = Self {
            theme: Theme::from_name(config.theme),
            auth,
            auth_rx,
            users,
            user: None,
            screen_state: ScreenState::Login,
            login: LoginForm::default(),
            quiz: Quiz::new(difficulty),
            session: Session::new(difficulty, config.default_duration),
            last_second: None,
            last_result: None,
            save_state: SaveState::Idle,
            leaderboard_filter: LeaderboardFilter {
                limit: config.leaderboard_limit,
                ..Default::default()
            },
            leaderboard: Vec::new(),
            profile: None,
            settings_form: SettingsForm::default(),
            message: None,
            message_timer: 0,
            config,
        };
        app.sync_auth();
        app
    }

    /// Update timers (called every tick)
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        self.sync_auth();

        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = None;
            }
        }

        if self.save_state == SaveState::Pending {
            self.save_result();
        }

        if let Some(mut last) = self.last_second {
            while self.session.is_playing() && now.saturating_duration_since(last) >= SECOND {
                last += SECOND;
                if self.session.tick_second() {
                    self.finish_session();
                }
            }
            self.last_second = self.session.is_playing().then_some(last);
        }
    }

    /// Show a temporary message
    pub fn show_message(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_timer = 30; // ~3 seconds at 100ms poll
    }

    /// Apply sign-in and sign-out notifications from the identity provider
    fn sync_auth(&mut self) {
        let mut latest = None;
        while let Ok(user) = self.auth_rx.try_recv() {
            latest = Some(user);
        }
        let Some(user) = latest else {
            return;
        };

        match user {
            Some(user) => {
                let first = self.user.as_ref().map(|u| &u.uid) != Some(&user.uid);
                self.user = Some(user);
                if first {
                    self.on_signed_in();
                }
            }
            None => {
                self.user = None;
                self.abandon_session();
                self.profile = None;
                self.theme = Theme::from_name(self.config.theme);
                self.login = LoginForm::default();
                self.screen_state = ScreenState::Login;
            }
        }
    }

    fn on_signed_in(&mut self) {
        let Some(user) = self.user.clone() else {
            return;
        };
        let doc = match self.users.get_user(&user.uid) {
            Ok(doc) => Some(doc),
            Err(crate::error::ServiceError::UserNotFound(_)) => {
                warn!(uid = %user.uid, "no user document, creating one");
                self.users
                    .create_user(&user.uid, &user.display_name, &user.email)
                    .map_err(|e| warn!(error = %e, "failed to create user document"))
                    .ok()
            }
            Err(e) => {
                warn!(error = %e, "failed to load user document");
                None
            }
        };
        if let Some(doc) = &doc {
            self.theme = Theme::from_name(doc.settings.theme);
        }
        self.profile = doc;
        self.login = LoginForm::default();
        self.screen_state = ScreenState::Game;
        self.show_message(&format!("Welcome, {}!", user.display_name));
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        match self.screen_state {
            ScreenState::Login => self.handle_login_key(key),
            ScreenState::Game => self.handle_game_key(key),
            ScreenState::GameOver => self.handle_game_over_key(key),
            ScreenState::Profile => self.handle_profile_key(key),
            ScreenState::Leaderboard => self.handle_leaderboard_key(key),
            ScreenState::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Esc => return AppAction::Quit,
            KeyCode::F(2) => self.login.toggle_mode(),
            KeyCode::Tab | KeyCode::Down => self.login.move_field(true),
            KeyCode::BackTab | KeyCode::Up => self.login.move_field(false),
            KeyCode::Backspace => {
                self.login.current_mut().pop();
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Char(c) => self.login.current_mut().push(c),
            _ => {}
        }
        AppAction::Continue
    }

    fn submit_login(&mut self) {
        let LoginForm {
            mode,
            email,
            password,
            name,
            ..
        } = self.login.clone();

        let result = match mode {
            LoginMode::SignIn => self.auth.sign_in(&email, &password).map(|_| ()),
            LoginMode::SignUp => self
                .auth
                .create_account(&email, &password, &name)
                .map(|account| {
                    if let Err(e) =
                        self.users
                            .create_user(&account.uid, &account.display_name, &account.email)
                    {
                        warn!(error = %e, "failed to create user document");
                    }
                }),
        };

        match result {
            Ok(()) => self.sync_auth(),
            Err(e) => {
                self.login.password.clear();
                self.login.error = Some(e.to_string());
            }
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => self.type_char(c),
            KeyCode::Backspace => self.quiz.backspace(),
            KeyCode::Esc if self.session.is_playing() => {
                self.abandon_session();
                self.show_message("Game abandoned");
            }
            _ if self.session.is_playing() => {
                if let KeyCode::Char(c) = key.code {
                    self.type_char(c);
                }
            }

            // Settings, only before the countdown starts
            KeyCode::Left | KeyCode::Char('h') => {
                self.set_difficulty(self.session.difficulty().prev());
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.set_difficulty(self.session.difficulty().next());
            }
            KeyCode::Up | KeyCode::Char('k') => self.cycle_duration(true),
            KeyCode::Down | KeyCode::Char('j') => self.cycle_duration(false),

            KeyCode::Char('b') => self.open_leaderboard(),
            KeyCode::Char('i') => self.open_profile(),
            KeyCode::Char('s') => self.open_settings(),
            KeyCode::Char('o') => self.sign_out(),
            KeyCode::Char('q') | KeyCode::Esc => return AppAction::Quit,
            _ => {}
        }
        AppAction::Continue
    }

    fn type_char(&mut self, c: char) {
        match self.quiz.push_char(c) {
            Ok(Submission::Pending) => self.start_countdown(),
            Ok(Submission::Resolved(outcome)) => {
                self.start_countdown();
                self.session.record(&outcome);
            }
            Err(_) => self.show_message("Numbers only"),
        }
    }

    fn start_countdown(&mut self) {
        if self.last_second.is_none() && !self.session.is_playing() {
            self.session.start();
            self.last_second = Some(Instant::now());
            info!(
                difficulty = %self.session.difficulty(),
                duration = self.session.duration_secs(),
                "session started"
            );
        }
    }

    fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.session.set_difficulty(difficulty) {
            self.quiz.set_difficulty(difficulty);
        }
    }

    fn cycle_duration(&mut self, up: bool) {
        let current = self.session.duration_secs();
        let idx = DURATION_CHOICES.iter().position(|&d| d == current).unwrap_or(0);
        let next = if up {
            DURATION_CHOICES[(idx + 1) % DURATION_CHOICES.len()]
        } else {
            DURATION_CHOICES[(idx + DURATION_CHOICES.len() - 1) % DURATION_CHOICES.len()]
        };
        self.session.set_duration(next);
    }

    /// Drop the running countdown and start over with the same settings
    fn abandon_session(&mut self) {
        self.session.reset();
        self.last_second = None;
        self.quiz.set_difficulty(self.session.difficulty());
    }

    fn finish_session(&mut self) {
        let today = Local::now().date_naive();
        self.last_result = self.session.result(today);
        self.last_second = None;
        self.save_state = SaveState::Pending;
        self.screen_state = ScreenState::GameOver;
        if let Some(result) = &self.last_result {
            info!(score = result.score, attempts = self.session.attempts(), "session finished");
        }
    }

    fn save_result(&mut self) {
        let (Some(user), Some(result)) = (self.user.as_ref(), self.last_result.as_ref()) else {
            self.save_state = SaveState::Failed("Not signed in".to_string());
            return;
        };
        self.save_state = match self.users.record_session(&user.uid, result) {
            Ok(stats) => SaveState::Saved(stats),
            Err(e) => {
                warn!(error = %e, "failed to save session");
                SaveState::Failed(e.to_string())
            }
        };
    }

    fn handle_game_over_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Esc => {
                self.abandon_session();
                self.screen_state = ScreenState::Game;
            }
            KeyCode::Char('b') => self.open_leaderboard(),
            KeyCode::Char('i') => self.open_profile(),
            _ => {}
        }
        AppAction::Continue
    }

    fn open_profile(&mut self) {
        self.leave_game();
        self.screen_state = ScreenState::Profile;
        self.refresh_profile();
    }

    fn refresh_profile(&mut self) {
        let Some(uid) = self.user.as_ref().map(|u| u.uid.clone()) else {
            return;
        };
        match self.users.get_user(&uid) {
            Ok(doc) => self.profile = Some(doc),
            Err(e) => {
                warn!(error = %e, "failed to load profile");
                self.profile = None;
                self.show_message("Could not load profile");
            }
        }
    }

    fn handle_profile_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.screen_state = ScreenState::Game,
            KeyCode::Char('b') => self.open_leaderboard(),
            KeyCode::Char('s') => self.open_settings(),
            _ => {}
        }
        AppAction::Continue
    }

    fn open_leaderboard(&mut self) {
        self.leave_game();
        self.screen_state = ScreenState::Leaderboard;
        self.refresh_leaderboard();
    }

    fn refresh_leaderboard(&mut self) {
        match self.users.leaderboard(&self.leaderboard_filter) {
            Ok(entries) => self.leaderboard = entries,
            Err(e) => {
                warn!(error = %e, "failed to load leaderboard");
                self.leaderboard.clear();
                self.show_message("Could not load leaderboard");
            }
        }
    }

    fn handle_leaderboard_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.screen_state = ScreenState::Game,
            KeyCode::Char('i') => self.open_profile(),
            // Difficulty filter: All -> Easy -> Medium -> Hard
            KeyCode::Left | KeyCode::Char('h') => {
                self.leaderboard_filter.difficulty = cycle(
                    self.leaderboard_filter.difficulty,
                    Difficulty::all(),
                    false,
                );
                self.refresh_leaderboard();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.leaderboard_filter.difficulty =
                    cycle(self.leaderboard_filter.difficulty, Difficulty::all(), true);
                self.refresh_leaderboard();
            }
            // Time filter: All -> Fast -> Medium -> Slow
            KeyCode::Up | KeyCode::Char('k') => {
                self.leaderboard_filter.time_band =
                    cycle(self.leaderboard_filter.time_band, TimeBand::all(), false);
                self.refresh_leaderboard();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.leaderboard_filter.time_band =
                    cycle(self.leaderboard_filter.time_band, TimeBand::all(), true);
                self.refresh_leaderboard();
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn open_settings(&mut self) {
        self.leave_game();
        self.refresh_profile();
        let (name, settings) = match &self.profile {
            Some(doc) => (doc.name.clone(), doc.settings.clone()),
            None => (
                self.user
                    .as_ref()
                    .map(|u| u.display_name.clone())
                    .unwrap_or_default(),
                UserSettings::default(),
            ),
        };
        self.settings_form = SettingsForm {
            name,
            settings,
            ..Default::default()
        };
        self.screen_state = ScreenState::Settings;
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> AppAction {
        let form = &mut self.settings_form;
        match key.code {
            KeyCode::Esc => {
                // Discard the theme preview
                if let Some(doc) = &self.profile {
                    self.theme = Theme::from_name(doc.settings.theme);
                }
                self.screen_state = ScreenState::Game;
            }
            KeyCode::Up => form.row = form.row.saturating_sub(1),
            KeyCode::Down | KeyCode::Tab => {
                form.row = (form.row + 1).min(SettingsRow::ALL.len() - 1);
            }
            KeyCode::Enter => self.save_settings(),
            code => match (form.selected(), code) {
                (SettingsRow::Name, KeyCode::Char(c)) => form.name.push(c),
                (SettingsRow::Name, KeyCode::Backspace) => {
                    form.name.pop();
                }
                (SettingsRow::Theme, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                    form.settings.theme = form.settings.theme.next();
                    self.theme = Theme::from_name(form.settings.theme);
                }
                (SettingsRow::Sound, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                    form.settings.sound = !form.settings.sound;
                }
                (
                    SettingsRow::Notifications,
                    KeyCode::Left | KeyCode::Right | KeyCode::Char(' '),
                ) => {
                    form.settings.notifications = !form.settings.notifications;
                }
                _ => {}
            },
        }
        AppAction::Continue
    }

    fn save_settings(&mut self) {
        let Some(uid) = self.user.as_ref().map(|u| u.uid.clone()) else {
            return;
        };
        let name = self.settings_form.name.trim().to_string();
        let settings = self.settings_form.settings.clone();

        // Rename the account first; the user document follows it
        let result = self
            .auth
            .update_display_name(&name)
            .map_err(|e| e.to_string())
            .and_then(|user| {
                self.user = Some(user);
                self.users
                    .update_profile(&uid, &name)
                    .and_then(|()| self.users.update_settings(&uid, &settings))
                    .map_err(|e| e.to_string())
            });

        let status = match result {
            Ok(()) => {
                self.refresh_profile();
                Ok("Settings updated successfully".to_string())
            }
            Err(e) => {
                warn!(error = %e, "failed to update settings");
                Err(e)
            }
        };
        self.settings_form.status = Some(status);
    }

    fn sign_out(&mut self) {
        if let Err(e) = self.auth.sign_out() {
            warn!(error = %e, "sign out failed");
        }
        self.sync_auth();
    }

    /// Leaving the game view drops a running countdown and clears a
    /// finished one, so the next visit starts from `Ready`
    fn leave_game(&mut self) {
        if self.session.phase() != SessionPhase::Ready {
            self.abandon_session();
        }
    }
}

/// Step through `None` followed by every value
fn cycle<T: Copy + PartialEq>(current: Option<T>, values: &[T], forward: bool) -> Option<T> {
    let mut options: Vec<Option<T>> = vec![None];
    options.extend(values.iter().copied().map(Some));
    let idx = options.iter().position(|&o| o == current).unwrap_or(0);
    let next = if forward {
        (idx + 1) % options.len()
    } else {
        (idx + options.len() - 1) % options.len()
    };
    options[next]
}
