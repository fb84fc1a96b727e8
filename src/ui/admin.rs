use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use super::components::date_input::{render_date_input, DateInputState};
use super::components::popup::{centered_rect, error_line, popup_frame, render_message};
use crate::expiry::parse_date;
use crate::models::{Client, NewUser};
use crate::roster::{SortColumn, SortDirection};
use crate::workflow::{AdminDashboard, LoadState, Modal, Stage};

pub enum AdminAction {
    Quit,
    Logout,
    Refresh,
    Submit,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PlanField {
    Plan,
    StartDate,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum UserField {
    Name,
    Email,
    Password,
    Phone,
}

impl UserField {
    fn next(self) -> Self {
        match self {
            UserField::Name => UserField::Email,
            UserField::Email => UserField::Password,
            UserField::Password => UserField::Phone,
            UserField::Phone => UserField::Name,
        }
    }

    fn previous(self) -> Self {
        match self {
            UserField::Name => UserField::Phone,
            UserField::Email => UserField::Name,
            UserField::Password => UserField::Email,
            UserField::Phone => UserField::Password,
        }
    }
}

/// Screen state around the dashboard: selection, search box and the
/// cursor inside whichever modal is open.
pub struct AdminScreenState {
    pub dashboard: AdminDashboard,
    table_state: TableState,
    searching: bool,
    plan_field: PlanField,
    date_input: DateInputState,
    user_field: UserField,
}

impl AdminScreenState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            dashboard: AdminDashboard::new(),
            table_state: TableState::default(),
            searching: false,
            plan_field: PlanField::Plan,
            date_input: DateInputState::new(today),
            user_field: UserField::Name,
        }
    }

    /// Keep the selection on a valid row after the roster or filter changed.
    pub fn clamp_selection(&mut self) {
        let len = self.dashboard.roster().len();
        let selected = match self.table_state.selected() {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            Some(i) => Some(i),
            None => Some(0),
        };
        self.table_state.select(selected);
    }

    pub fn next(&mut self) {
        let len = self.dashboard.roster().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.dashboard.roster().len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.table_state
            .selected()
            .and_then(|row| self.dashboard.roster().get(row))
    }

    fn selected_email(&self) -> Option<String> {
        self.selected_client().map(|c| c.email.clone())
    }

    fn open_plan_modal(&mut self, today: NaiveDate) {
        let Some(email) = self.selected_email() else {
            return;
        };
        if self.dashboard.open_assign_plan(&email, today) {
            let start = self
                .dashboard
                .plan_form_mut()
                .map(|form| form.start_date)
                .unwrap_or(today);
            self.date_input = DateInputState::new(start);
            self.plan_field = PlanField::Plan;
        }
    }

    fn open_user_modal(&mut self) {
        if self.dashboard.open_add_user() {
            self.user_field = UserField::Name;
        }
    }

    fn open_delete_modal(&mut self) {
        if let Some(email) = self.selected_email() {
            self.dashboard.open_delete_user(&email);
        }
    }

    pub fn handle_key(&mut self, key: KeyCode, today: NaiveDate) -> Option<AdminAction> {
        let modal = self.dashboard.modal();
        if modal.is_submitting() {
            // A request is in flight.
            return None;
        }
        match modal {
            Modal::Closed => {}
            Modal::AssignPlan(_) => return self.plan_modal_key(key),
            Modal::AddUser(_) => return self.user_modal_key(key),
            Modal::DeleteUser(_) => {
                return match key {
                    KeyCode::Char('y') | KeyCode::Char('Y') => Some(AdminAction::Submit),
                    KeyCode::Char('n') | KeyCode::Esc => {
                        self.dashboard.cancel();
                        None
                    }
                    _ => None,
                };
            }
        }

        if let LoadState::Failed(_) = self.dashboard.load_state() {
            return match key {
                KeyCode::Char('r') | KeyCode::Enter => Some(AdminAction::Refresh),
                KeyCode::Char('l') => Some(AdminAction::Logout),
                KeyCode::Char('q') | KeyCode::Esc => Some(AdminAction::Quit),
                _ => None,
            };
        }

        if self.searching {
            let mut term = self.dashboard.roster().search().to_string();
            match key {
                KeyCode::Enter => self.searching = false,
                KeyCode::Esc => {
                    self.searching = false;
                    term.clear();
                }
                KeyCode::Backspace => {
                    term.pop();
                }
                KeyCode::Char(c) => term.push(c),
                _ => {}
            }
            self.dashboard.roster_mut().set_search(term);
            self.clamp_selection();
            return None;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AdminAction::Quit),
            KeyCode::Char('l') => return Some(AdminAction::Logout),
            KeyCode::Char('r') => return Some(AdminAction::Refresh),
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('a') | KeyCode::Enter => self.open_plan_modal(today),
            KeyCode::Char('n') => self.open_user_modal(),
            KeyCode::Char('d') => self.open_delete_modal(),
            KeyCode::Down => self.next(),
            KeyCode::Up => self.previous(),
            KeyCode::Char(c @ '1'..='6') => {
                let index = c as usize - '1' as usize;
                self.dashboard.roster_mut().sort_by(SortColumn::ALL[index]);
                self.clamp_selection();
            }
            _ => {}
        }
        None
    }

    fn plan_modal_key(&mut self, key: KeyCode) -> Option<AdminAction> {
        if self.date_input.editing {
            match key {
                KeyCode::Enter | KeyCode::Esc => self.date_input.toggle_editing(),
                other => {
                    if self.date_input.handle_key(other) {
                        let date = self.date_input.date;
                        if let Some(form) = self.dashboard.plan_form_mut() {
                            form.start_date = date;
                        }
                    }
                }
            }
            return None;
        }

        match key {
            KeyCode::Esc => self.dashboard.cancel(),
            KeyCode::Char('s') | KeyCode::Char('S') => return Some(AdminAction::Submit),
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.plan_field = match self.plan_field {
                    PlanField::Plan => PlanField::StartDate,
                    PlanField::StartDate => PlanField::Plan,
                };
            }
            KeyCode::Left | KeyCode::Right if self.plan_field == PlanField::Plan => {
                if let Some(form) = self.dashboard.plan_form_mut() {
                    form.plan_name = if key == KeyCode::Right {
                        form.plan_name.next()
                    } else {
                        form.plan_name.previous()
                    };
                }
            }
            KeyCode::Enter if self.plan_field == PlanField::StartDate => {
                self.date_input.toggle_editing();
            }
            KeyCode::Enter => return Some(AdminAction::Submit),
            _ => {}
        }
        None
    }

    fn user_modal_key(&mut self, key: KeyCode) -> Option<AdminAction> {
        match key {
            KeyCode::Esc => self.dashboard.cancel(),
            KeyCode::Enter => return Some(AdminAction::Submit),
            KeyCode::Tab | KeyCode::Down => self.user_field = self.user_field.next(),
            KeyCode::BackTab | KeyCode::Up => self.user_field = self.user_field.previous(),
            KeyCode::Backspace | KeyCode::Char(_) => {
                let field = self.user_field;
                if let Some(user) = self.dashboard.new_user_form_mut() {
                    let value = user_field_mut(user, field);
                    if let KeyCode::Char(c) = key {
                        value.push(c);
                    } else {
                        value.pop();
                    }
                }
            }
            _ => {}
        }
        None
    }
}

fn user_field_mut(user: &mut NewUser, field: UserField) -> &mut String {
    match field {
        UserField::Name => &mut user.name,
        UserField::Email => &mut user.email,
        UserField::Password => &mut user.password,
        UserField::Phone => user.phone.get_or_insert_with(String::new),
    }
}

fn format_date(raw: Option<&str>) -> String {
    match raw {
        None => "N/A".to_string(),
        Some(raw) => match parse_date(raw) {
            Ok(date) => date.format("%d %b %Y").to_string(),
            Err(_) => "Invalid Date".to_string(),
        },
    }
}

pub fn render_admin<B: Backend>(frame: &mut Frame<B>, state: &mut AdminScreenState) {
    let size = frame.size();

    match state.dashboard.load_state() {
        LoadState::Loading if state.dashboard.roster().total() == 0 => {
            let area = centered_rect(40, 20, size);
            let loading = Paragraph::new("Loading members...")
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(loading, area);
            return;
        }
        LoadState::Failed(message) => {
            let inner = popup_frame(frame, "Error Loading Dashboard", 60, 30);
            render_message(
                frame,
                inner,
                vec![
                    Spans::from(""),
                    Spans::from(Span::styled(message.clone(), Style::default().fg(Color::Red))),
                    Spans::from(""),
                    Spans::from("<R> Retry  <L> Log out  <Q> Quit"),
                ],
            );
            return;
        }
        _ => {}
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    render_header(frame, state, chunks[0]);
    render_table(frame, state, chunks[1]);

    let help = if state.searching {
        "Type to filter | Enter - Done | Esc - Clear search"
    } else {
        "<A> Assign/Modify plan | <N> New member | <D> Delete | </> Search | <1-6> Sort | <R> Refresh | <L> Log out | <Q> Quit"
    };
    let buttons = Paragraph::new(help)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));
    frame.render_widget(buttons, chunks[2]);

    match state.dashboard.modal() {
        Modal::Closed => {}
        Modal::AssignPlan(stage) => render_plan_modal(frame, state, stage),
        Modal::AddUser(stage) => render_user_modal(frame, state.user_field, stage),
        Modal::DeleteUser(stage) => {
            let inner = popup_frame(frame, "Confirm Delete", 50, 25);
            let target = stage.form();
            let prompt = if stage.is_submitting() {
                Spans::from("Deleting...")
            } else {
                Spans::from("<Y> Yes  <N> No")
            };
            render_message(
                frame,
                inner,
                vec![
                    Spans::from(""),
                    Spans::from(format!("Delete {} <{}>?", target.name, target.email)),
                    Spans::from("The member and their plan will be removed."),
                    Spans::from(""),
                    error_line(stage.error()),
                    prompt,
                ],
            );
        }
    }
}

fn render_header<B: Backend>(frame: &mut Frame<B>, state: &AdminScreenState, area: Rect) {
    let roster = state.dashboard.roster();
    let total = roster.total();
    let noun = if total == 1 { "Member" } else { "Members" };
    let count = if roster.len() == total {
        format!("{total} {noun}")
    } else {
        format!("{} of {total} {noun}", roster.len())
    };

    let mut spans = vec![
        Span::styled(
            "Member Management",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {count}")),
    ];
    if state.searching || !roster.search().is_empty() {
        let cursor = if state.searching { "|" } else { "" };
        spans.push(Span::styled(
            format!("  Search: {}{cursor}", roster.search()),
            Style::default().fg(Color::Yellow),
        ));
    }
    if matches!(state.dashboard.load_state(), LoadState::Loading) {
        spans.push(Span::raw("  (refreshing...)"));
    }

    let header = Paragraph::new(Spans::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_table<B: Backend>(frame: &mut Frame<B>, state: &mut AdminScreenState, area: Rect) {
    let roster = state.dashboard.roster();

    if roster.total() == 0 {
        let empty = Paragraph::new("No members found. <R> Refresh")
            .block(Block::default().title("Members").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    }

    let sort = roster.sort();
    let header_cells = SortColumn::ALL.iter().enumerate().map(|(i, column)| {
        let marker = match sort {
            Some(s) if s.column == *column => match s.direction {
                SortDirection::Ascending => " ^",
                SortDirection::Descending => " v",
            },
            _ => "",
        };
        Cell::from(format!("{}.{}{marker}", i + 1, column.title()))
    });
    let header = Row::new(header_cells)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD))
        .height(1);

    let rows: Vec<Row> = roster
        .visible()
        .map(|client| {
            let plan = match client.plan_name {
                Some(plan) => Cell::from(plan.label()).style(Style::default().fg(Color::Red)),
                None => Cell::from("No Plan").style(Style::default().fg(Color::DarkGray)),
            };
            Row::new(vec![
                Cell::from(format!("{} ({})", client.name, client.short_id())),
                Cell::from(client.email.clone()),
                Cell::from(client.phone_number.clone().unwrap_or_else(|| "N/A".to_string())),
                plan,
                Cell::from(format_date(client.start_date.as_deref())),
                Cell::from(format_date(client.expiry_date.as_deref())),
            ])
        })
        .collect();

    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title("Members").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(22),
            Constraint::Percentage(24),
            Constraint::Percentage(14),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
        ]);

    frame.render_stateful_widget(table, area, &mut state.table_state);
}

fn render_plan_modal<B: Backend>(
    frame: &mut Frame<B>,
    state: &AdminScreenState,
    stage: &Stage<crate::workflow::PlanForm>,
) {
    let form = stage.form();
    let verb = if form.modifying { "Modify Plan" } else { "Assign Plan" };
    let inner = popup_frame(frame, &format!("{verb} for {}", form.client_name), 60, 50);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(2),
            ]
            .as_ref(),
        )
        .split(inner);

    let plan_style = if state.plan_field == PlanField::Plan {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let plan = Paragraph::new(Spans::from(vec![
        Span::styled("< ", plan_style),
        Span::styled(form.plan_name.label(), plan_style.add_modifier(Modifier::BOLD)),
        Span::styled(" >", plan_style),
    ]))
    .block(Block::default().title("Plan Type").borders(Borders::ALL));
    frame.render_widget(plan, chunks[0]);

    render_date_input(
        frame,
        &state.date_input,
        "Start Date",
        state.plan_field == PlanField::StartDate,
        chunks[1],
    );

    let expiry = Paragraph::new(format!(
        "Estimated Expiry Date: {}",
        form.expiry_date().format("%d %b %Y")
    ));
    frame.render_widget(expiry, chunks[2]);

    let footer = if stage.is_submitting() {
        Spans::from("Saving plan...")
    } else if state.date_input.editing {
        Spans::from("Digits - Type | Left/Right - Part | +/- - Day | Enter - Done")
    } else {
        Spans::from("Tab - Field | Left/Right - Plan | Enter - Edit date / Confirm | S - Confirm | Esc - Cancel")
    };
    render_message(frame, chunks[3], vec![error_line(stage.error()), footer]);
}

fn render_user_modal<B: Backend>(frame: &mut Frame<B>, focus: UserField, stage: &Stage<NewUser>) {
    let inner = popup_frame(frame, "Add New Member", 60, 50);
    let user = stage.form();

    let masked = "*".repeat(user.password.chars().count());
    let fields = [
        (UserField::Name, "Name", user.name.as_str()),
        (UserField::Email, "Email", user.email.as_str()),
        (UserField::Password, "Password", masked.as_str()),
        (UserField::Phone, "Phone (optional)", user.phone.as_deref().unwrap_or("")),
    ];

    let mut lines: Vec<Spans> = fields
        .iter()
        .map(|(field, label, value)| {
            let style = if *field == focus {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let cursor = if *field == focus { "|" } else { "" };
            Spans::from(vec![
                Span::styled(format!("{label}: "), style),
                Span::raw(format!("{value}{cursor}")),
            ])
        })
        .collect();

    lines.push(Spans::from(""));
    lines.push(error_line(stage.error()));
    lines.push(if stage.is_submitting() {
        Spans::from("Creating member...")
    } else {
        Spans::from("Tab - Next field | Enter - Create | Esc - Cancel")
    });

    render_message(frame, inner, lines);
}

pub fn handle_input(state: &mut AdminScreenState, today: NaiveDate) -> Result<Option<AdminAction>> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            return Ok(state.handle_key(key.code, today));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlanName;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn member(name: &str, email: &str, plan: Option<PlanName>) -> Client {
        Client {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            phone_number: None,
            plan_name: plan,
            start_date: None,
            expiry_date: None,
        }
    }

    fn screen() -> AdminScreenState {
        let mut state = AdminScreenState::new(ymd(2026, 10, 15));
        state.dashboard.roster_mut().replace(vec![
            member("Zara", "z@x.com", Some(PlanName::Yearly)),
            member("Abe", "a@x.com", None),
        ]);
        state.clamp_selection();
        state
    }

    fn press(state: &mut AdminScreenState, keys: &[KeyCode]) -> Option<AdminAction> {
        let mut last = None;
        for key in keys {
            last = state.handle_key(*key, ymd(2026, 10, 15));
        }
        last
    }

    #[test]
    fn number_keys_sort_rows_under_the_cursor() {
        let mut state = screen();
        assert_eq!(state.selected_client().unwrap().email, "z@x.com");

        press(&mut state, &[KeyCode::Char('1')]);
        assert_eq!(state.selected_client().unwrap().email, "a@x.com");

        press(&mut state, &[KeyCode::Char('1')]);
        assert_eq!(state.selected_client().unwrap().email, "z@x.com");
    }

    #[test]
    fn search_mode_edits_the_filter() {
        let mut state = screen();
        press(
            &mut state,
            &[KeyCode::Char('/'), KeyCode::Char('a'), KeyCode::Char('b')],
        );
        assert_eq!(state.dashboard.roster().search(), "ab");
        assert_eq!(state.dashboard.roster().len(), 1);

        // 'q' is text while searching, not quit.
        assert!(press(&mut state, &[KeyCode::Char('q')]).is_none());

        press(&mut state, &[KeyCode::Esc]);
        assert_eq!(state.dashboard.roster().search(), "");
        assert_eq!(state.dashboard.roster().len(), 2);
    }

    #[test]
    fn plan_modal_edits_form_and_submits() {
        let mut state = screen();
        press(&mut state, &[KeyCode::Down, KeyCode::Char('a')]);

        let Modal::AssignPlan(stage) = state.dashboard.modal() else {
            panic!("plan modal should be open");
        };
        assert_eq!(stage.form().email, "a@x.com");
        assert_eq!(stage.form().plan_name, PlanName::Monthly);

        press(&mut state, &[KeyCode::Right, KeyCode::Right]);
        press(
            &mut state,
            &[
                KeyCode::Tab,
                KeyCode::Enter,
                KeyCode::Char('2'),
                KeyCode::Char('0'),
                KeyCode::Char('2'),
                KeyCode::Char('4'),
                KeyCode::Char('0'),
                KeyCode::Char('1'),
                KeyCode::Char('3'),
                KeyCode::Char('1'),
                KeyCode::Enter,
            ],
        );

        let Modal::AssignPlan(stage) = state.dashboard.modal() else {
            panic!("plan modal should still be open");
        };
        assert_eq!(stage.form().plan_name, PlanName::HalfYearly);
        assert_eq!(stage.form().start_date, ymd(2024, 1, 31));
        assert_eq!(stage.form().expiry_date(), ymd(2024, 7, 31));

        assert!(matches!(
            press(&mut state, &[KeyCode::Char('s')]),
            Some(AdminAction::Submit)
        ));
    }

    #[test]
    fn user_modal_typing_fills_focused_field() {
        let mut state = screen();
        press(&mut state, &[KeyCode::Char('n')]);
        press(&mut state, &[KeyCode::Char('K'), KeyCode::Char('o')]);
        press(&mut state, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Tab]);
        press(&mut state, &[KeyCode::Char('5'), KeyCode::Char('5'), KeyCode::Backspace]);

        let Modal::AddUser(stage) = state.dashboard.modal() else {
            panic!("add user modal should be open");
        };
        assert_eq!(stage.form().name, "Ko");
        assert_eq!(stage.form().phone.as_deref(), Some("5"));

        press(&mut state, &[KeyCode::Esc]);
        assert!(!state.dashboard.modal().is_open());
    }

    #[test]
    fn delete_needs_y_to_submit() {
        let mut state = screen();
        press(&mut state, &[KeyCode::Char('d')]);
        assert!(matches!(state.dashboard.modal(), Modal::DeleteUser(_)));

        assert!(press(&mut state, &[KeyCode::Char('x')]).is_none());
        assert!(matches!(
            press(&mut state, &[KeyCode::Char('y')]),
            Some(AdminAction::Submit)
        ));

        press(&mut state, &[KeyCode::Char('d'), KeyCode::Char('n')]);
        // 'd' is swallowed by the open prompt; 'n' closes it.
        assert!(!state.dashboard.modal().is_open());
    }

    struct Down;

    #[async_trait::async_trait]
    impl crate::api::MembershipApi for Down {
        async fn list_clients(&self) -> Result<Vec<Client>, crate::api::ApiError> {
            Err(crate::api::ApiError::Http {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn assign_plan(
            &self,
            _: &crate::models::PlanAssignment,
        ) -> Result<(), crate::api::ApiError> {
            Ok(())
        }

        async fn create_user(&self, _: &NewUser) -> Result<(), crate::api::ApiError> {
            Ok(())
        }

        async fn delete_user(&self, _: &str) -> Result<(), crate::api::ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_load_only_offers_retry_logout_quit() {
        let mut state = AdminScreenState::new(ymd(2026, 10, 15));
        assert!(state.dashboard.refresh(&Down).await.is_err());

        assert!(matches!(press(&mut state, &[KeyCode::Char('r')]), Some(AdminAction::Refresh)));
        assert!(press(&mut state, &[KeyCode::Char('n')]).is_none());
        assert!(!state.dashboard.modal().is_open());
    }
}
