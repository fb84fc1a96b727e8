use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// A rect of `percent_x` by `percent_y` centred in `r`.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Clear a centred area and draw a bordered box over it; returns the inner area.
pub fn popup_frame<B: Backend>(
    frame: &mut Frame<B>,
    title: &str,
    percent_x: u16,
    percent_y: u16,
) -> Rect {
    let area = centered_rect(percent_x, percent_y, frame.size());
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::White).bg(Color::Black));
    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);
    inner
}

pub fn render_message<B: Backend>(frame: &mut Frame<B>, area: Rect, lines: Vec<Spans>) {
    let text = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(text, area);
}

/// Single red line for a failed request, or nothing.
pub fn error_line(error: Option<&str>) -> Spans<'static> {
    match error {
        Some(message) => Spans::from(tui::text::Span::styled(
            format!("Error: {message}"),
            Style::default().fg(Color::Red),
        )),
        None => Spans::from(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_sits_inside_parent() {
        let parent = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(50, 20, parent);
        assert_eq!(inner.width, 50);
        assert_eq!(inner.x, 25);
        assert!(inner.y > 0 && inner.bottom() < parent.bottom());
    }
}
