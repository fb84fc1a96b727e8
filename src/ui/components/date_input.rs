use chrono::{Datelike, Duration, NaiveDate};
use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Keyboard date editor: type digits into the highlighted part, move
/// between parts with Left/Right, nudge the whole date with `+`/`-`.
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    buffer: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            buffer: String::new(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        self.date_part = DatePart::Year;
        self.buffer.clear();
    }

    fn next_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.buffer.clear();
    }

    fn previous_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.buffer.clear();
    }

    /// Returns true when the date changed.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        if !self.editing {
            return false;
        }

        let before = self.date;
        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => self.push_digit(c),
            KeyCode::Char('+') => self.shift_days(1),
            KeyCode::Char('-') => self.shift_days(-1),
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            KeyCode::Right => self.next_part(),
            KeyCode::Left => self.previous_part(),
            _ => {}
        }
        self.date != before
    }

    fn push_digit(&mut self, c: char) {
        self.buffer.push(c);
        let width = match self.date_part {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        };
        if self.buffer.len() < width {
            return;
        }

        let value: u32 = self.buffer.parse().unwrap_or(0);
        self.buffer.clear();

        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());
        let updated = match self.date_part {
            DatePart::Year if (1900..=2100).contains(&value) => clamped(value as i32, month, day),
            DatePart::Month if (1..=12).contains(&value) => clamped(year, value, day),
            DatePart::Day if value >= 1 => NaiveDate::from_ymd_opt(year, month, value),
            _ => None,
        };
        if let Some(date) = updated {
            self.date = date;
            if self.date_part != DatePart::Day {
                self.next_part();
            }
        }
    }

    fn shift_days(&mut self, days: i64) {
        if let Some(date) = self.date.checked_add_signed(Duration::days(days)) {
            self.date = date;
        }
    }

    pub fn display(&self) -> String {
        let year = format!("{:04}", self.date.year());
        let month = format!("{:02}", self.date.month());
        let day = format!("{:02}", self.date.day());

        if !self.editing {
            return format!("{year}-{month}-{day}");
        }

        let cursor = |part: DatePart, text: String| {
            if self.date_part != part {
                return text;
            }
            if self.buffer.is_empty() {
                format!("[{text}]")
            } else {
                format!("[{}]", self.buffer)
            }
        };
        format!(
            "{}-{}-{}",
            cursor(DatePart::Year, year),
            cursor(DatePart::Month, month),
            cursor(DatePart::Day, day)
        )
    }
}

/// Keep the day inside the target month, e.g. 31 -> 30 for April.
fn clamped(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = (28..=31)
        .rev()
        .find(|&d| first.with_day(d).is_some())
        .unwrap_or(28);
    first.with_day(day.min(last))
}

pub fn render_date_input<B: Backend>(
    f: &mut Frame<B>,
    state: &DateInputState,
    title: &str,
    focused: bool,
    area: Rect,
) {
    let style = if state.editing {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let input = Paragraph::new(Spans::from(vec![Span::styled(state.display(), style)]))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    f.render_widget(input, area);
}
