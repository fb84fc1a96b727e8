use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tracing::warn;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use super::components::popup::{centered_rect, popup_frame, render_message};
use crate::expiry::{
    compute_expiry, days_left, parse_date, plan_progress, MembershipStatus,
};
use crate::models::MemberPlan;

pub enum MemberAction {
    Quit,
    Logout,
    Retry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberLoad {
    Loading,
    NoPlan,
    Active(Box<MemberSummary>),
    Failed(String),
}

/// Figures shown on the member dashboard, worked out once per fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSummary {
    pub plan: MemberPlan,
    pub start: Option<NaiveDate>,
    pub expiry: Option<NaiveDate>,
    pub days_left: i64,
    pub progress: u8,
    pub status: MembershipStatus,
}

impl MemberSummary {
    /// Prefer the server's expiry; otherwise derive it from the start date.
    pub fn new(plan: MemberPlan, today: NaiveDate) -> Self {
        let start = parse_date(&plan.start_date).ok();
        let expiry = plan
            .expiry_date
            .as_deref()
            .and_then(|raw| parse_date(raw).ok())
            .or_else(|| start.map(|s| compute_expiry(s, plan.plan_name)));

        if expiry.is_none() {
            warn!(start = %plan.start_date, "member plan has no usable dates");
        }

        let days = expiry.map(|e| days_left(e, today)).unwrap_or(0);
        let progress = match (start, expiry) {
            (Some(s), Some(e)) => plan_progress(s, e, today),
            _ => 0,
        };

        Self {
            plan,
            start,
            expiry,
            days_left: days,
            progress,
            status: MembershipStatus::from_days_left(days),
        }
    }
}

pub struct MemberScreenState {
    pub load: MemberLoad,
}

impl Default for MemberScreenState {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberScreenState {
    pub fn new() -> Self {
        Self {
            load: MemberLoad::Loading,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Option<MemberAction> {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => Some(MemberAction::Quit),
            KeyCode::Char('l') => Some(MemberAction::Logout),
            KeyCode::Char('r') => Some(MemberAction::Retry),
            _ => None,
        }
    }
}

fn show_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn render_member<B: Backend>(frame: &mut Frame<B>, state: &MemberScreenState) {
    let summary = match &state.load {
        MemberLoad::Loading => {
            let area = centered_rect(40, 20, frame.size());
            let loading = Paragraph::new("Loading your plan...")
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(loading, area);
            return;
        }
        MemberLoad::NoPlan => {
            let inner = popup_frame(frame, "No Active Plan", 60, 30);
            render_message(
                frame,
                inner,
                vec![
                    Spans::from(""),
                    Spans::from("You don't have an active membership plan."),
                    Spans::from("Ask the front desk about Monthly, Quarterly, Half-Yearly or Yearly plans."),
                    Spans::from(""),
                    Spans::from("<R> Refresh  <L> Log out  <Q> Quit"),
                ],
            );
            return;
        }
        MemberLoad::Failed(message) => {
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
        MemberLoad::Active(summary) => summary,
    };

    let plan = &summary.plan;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(6),
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(frame.size());

    let welcome = Paragraph::new(Span::styled(
        format!("Welcome Back, {}", plan.name),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(welcome, chunks[0]);

    let noun = if summary.days_left == 1 { "day" } else { "days" };
    let status = Paragraph::new(vec![
        Spans::from(vec![
            Span::styled(
                format!("{} Membership", plan.plan_name),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {} {noun} remaining", summary.days_left)),
        ]),
        Spans::from(format!("Started on {}", show_date(summary.start))),
        Spans::from(format!("Expiry Date: {}", show_date(summary.expiry))),
        Spans::from(format!("Status: {}", summary.status.label())),
    ])
    .block(Block::default().title("Plan Status").borders(Borders::ALL));
    frame.render_widget(status, chunks[1]);

    let gauge = Gauge::default()
        .block(Block::default().title("Plan Progress").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Red))
        .percent(u16::from(summary.progress));
    frame.render_widget(gauge, chunks[2]);

    let last_workout = plan
        .last_workout
        .as_deref()
        .and_then(|raw| parse_date(raw).ok());
    let profile = Paragraph::new(vec![
        Spans::from(format!("Email: {}", plan.email)),
        Spans::from(format!(
            "Phone: {}",
            plan.phone_number.as_deref().unwrap_or("N/A")
        )),
        Spans::from(format!("Member Since: {}", show_date(summary.start))),
        Spans::from(format!(
            "Last Workout: {}",
            last_workout
                .map(|d| d.format("%d %b %Y").to_string())
                .unwrap_or_else(|| "Never".to_string())
        )),
        Spans::from(format!(
            "Workouts This Month: {}",
            plan.workouts_this_month.unwrap_or(0)
        )),
    ])
    .block(Block::default().title("Profile Information").borders(Borders::ALL));
    frame.render_widget(profile, chunks[3]);

    let help = Paragraph::new("<R> Refresh | <L> Log out | <Q> Quit")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[4]);
}

pub fn handle_input(state: &mut MemberScreenState) -> Result<Option<MemberAction>> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            return Ok(state.handle_key(key.code));
        }
    }
    Ok(None)
}
