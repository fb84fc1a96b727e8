use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::components::popup::{centered_rect, error_line};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LoginMode {
    SignIn,
    Register,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LoginField {
    Name,
    Email,
    Password,
}

pub enum LoginAction {
    Quit,
    SignIn { email: String, password: String },
    Register { name: String, email: String, password: String },
}

pub struct LoginState {
    pub mode: LoginMode,
    pub name: String,
    pub email: String,
    pub password: String,
    pub current_field: LoginField,
    pub error: Option<String>,
    pub busy: bool,
}

impl Default for LoginState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginState {
    pub fn new() -> Self {
        Self {
            mode: LoginMode::SignIn,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            current_field: LoginField::Email,
            error: None,
            busy: false,
        }
    }

    fn fields(&self) -> &'static [LoginField] {
        match self.mode {
            LoginMode::SignIn => &[LoginField::Email, LoginField::Password],
            LoginMode::Register => &[LoginField::Name, LoginField::Email, LoginField::Password],
        }
    }

    fn step_field(&mut self, forward: bool) {
        let fields = self.fields();
        let pos = fields
            .iter()
            .position(|f| *f == self.current_field)
            .unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.current_field = fields[next];
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::SignIn => LoginMode::Register,
            LoginMode::Register => LoginMode::SignIn,
        };
        self.current_field = match self.mode {
            LoginMode::SignIn => LoginField::Email,
            LoginMode::Register => LoginField::Name,
        };
        self.error = None;
    }

    fn field_mut(&mut self) -> &mut String {
        match self.current_field {
            LoginField::Name => &mut self.name,
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.busy = false;
        self.password.clear();
        self.error = Some(message.into());
    }

    fn submit(&mut self) -> Option<LoginAction> {
        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() {
            self.error = Some("Email and password are required".to_string());
            return None;
        }
        self.error = None;
        self.busy = true;
        match self.mode {
            LoginMode::SignIn => Some(LoginAction::SignIn {
                email,
                password: self.password.clone(),
            }),
            LoginMode::Register => {
                let name = self.name.trim().to_string();
                if name.is_empty() {
                    self.busy = false;
                    self.error = Some("Name is required".to_string());
                    return None;
                }
                Some(LoginAction::Register {
                    name,
                    email,
                    password: self.password.clone(),
                })
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<LoginAction> {
        if self.busy {
            return None;
        }
        match key {
            KeyCode::Esc => return Some(LoginAction::Quit),
            KeyCode::Enter => return self.submit(),
            KeyCode::Tab | KeyCode::Down => self.step_field(true),
            KeyCode::BackTab | KeyCode::Up => self.step_field(false),
            KeyCode::F(2) => self.toggle_mode(),
            KeyCode::Backspace => {
                self.field_mut().pop();
            }
            KeyCode::Char(c) => self.field_mut().push(c),
            _ => {}
        }
        None
    }
}

pub fn render_login<B: Backend>(frame: &mut Frame<B>, state: &LoginState) {
    let area = centered_rect(60, 60, frame.size());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(2),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title = match state.mode {
        LoginMode::SignIn => "Strength Gym - Sign In",
        LoginMode::Register => "Strength Gym - Create Account",
    };
    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let masked = "*".repeat(state.password.chars().count());
    let items: Vec<ListItem> = state
        .fields()
        .iter()
        .map(|field| {
            let (label, value) = match field {
                LoginField::Name => ("Name", state.name.as_str()),
                LoginField::Email => ("Email", state.email.as_str()),
                LoginField::Password => ("Password", masked.as_str()),
            };
            let focused = *field == state.current_field;
            let style = if focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let cursor = if focused && !state.busy { "|" } else { "" };
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{label}: "), style),
                Span::raw(format!("{value}{cursor}")),
            ]))
        })
        .collect();
    let form = List::new(items).block(Block::default().borders(Borders::ALL));
    frame.render_widget(form, chunks[1]);

    let status = if state.busy {
        Spans::from("Contacting server...")
    } else {
        error_line(state.error.as_deref())
    };
    frame.render_widget(Paragraph::new(status), chunks[2]);

    let help = Paragraph::new("Enter - Submit | Tab - Next field | F2 - Sign in/Register | Esc - Quit")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[3]);
}

pub fn handle_input(state: &mut LoginState) -> Result<Option<LoginAction>> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            return Ok(state.handle_key(key.code));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(state: &mut LoginState, text: &str) {
        for c in text.chars() {
            state.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn sign_in_collects_credentials() {
        let mut state = LoginState::new();
        type_text(&mut state, "admin@gym.com");
        state.handle_key(KeyCode::Tab);
        type_text(&mut state, "pw");

        match state.handle_key(KeyCode::Enter) {
            Some(LoginAction::SignIn { email, password }) => {
                assert_eq!(email, "admin@gym.com");
                assert_eq!(password, "pw");
            }
            _ => panic!("expected sign-in action"),
        }
        assert!(state.busy);
        // Keys are ignored while the request is in flight.
        assert!(state.handle_key(KeyCode::Esc).is_none());
    }

    #[test]
    fn empty_password_is_caught_locally() {
        let mut state = LoginState::new();
        type_text(&mut state, "a@x.com");
        assert!(state.handle_key(KeyCode::Enter).is_none());
        assert!(state.error.is_some());
        assert!(!state.busy);
    }

    #[test]
    fn register_mode_needs_a_name() {
        let mut state = LoginState::new();
        state.handle_key(KeyCode::F(2));
        assert_eq!(state.current_field, LoginField::Name);

        state.handle_key(KeyCode::Tab);
        type_text(&mut state, "new@x.com");
        state.handle_key(KeyCode::Tab);
        type_text(&mut state, "pw");
        assert!(state.handle_key(KeyCode::Enter).is_none());
        assert_eq!(state.error.as_deref(), Some("Name is required"));

        state.handle_key(KeyCode::Tab);
        assert_eq!(state.current_field, LoginField::Name);
        type_text(&mut state, "Nia");
        assert!(matches!(
            state.handle_key(KeyCode::Enter),
            Some(LoginAction::Register { name, .. }) if name == "Nia"
        ));
    }

    #[test]
    fn failure_clears_password_and_unlocks() {
        let mut state = LoginState::new();
        state.password = "wrong".to_string();
        state.busy = true;
        state.fail("Login failed");
        assert!(!state.busy);
        assert!(state.password.is_empty());
        assert_eq!(state.error.as_deref(), Some("Login failed"));
    }
}
