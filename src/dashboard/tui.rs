//! ratatui rendering for the dashboard: a pane table plus a preview of the
//! selected (or zoomed) pane's captured output.

use ansi_to_tui::IntoText;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::activity::State;
use crate::multiplexer::Pane;

use super::Scheduler;

fn state_color(state: State) -> Color {
    match state {
        State::Generating => Color::Green,
        State::Waiting => Color::Yellow,
        State::Thinking => Color::Cyan,
        State::Error => Color::Red,
        State::Stalled => Color::Magenta,
        State::Unknown => Color::DarkGray,
    }
}

fn state_label(state: State) -> &'static str {
    match state {
        State::Generating => "generating",
        State::Waiting => "waiting",
        State::Thinking => "thinking",
        State::Error => "error",
        State::Stalled => "stalled",
        State::Unknown => "unknown",
    }
}

pub fn render(f: &mut Frame, scheduler: &Scheduler, preview_content: Option<&str>) {
    let area = f.area();

    if scheduler.is_zoomed() {
        render_zoomed(f, area, scheduler, preview_content);
        return;
    }

    let chunks = Layout::vertical([Constraint::Percentage(50), Constraint::Min(5), Constraint::Length(1)]).split(area);

    render_table(f, chunks[0], scheduler);
    render_preview(f, chunks[1], scheduler, preview_content);
    render_footer(f, chunks[2]);
}

fn render_table(f: &mut Frame, area: Rect, scheduler: &Scheduler) {
    let rows: Vec<Row> = scheduler
        .panes()
        .iter()
        .map(|pane: &Pane| {
            let status = scheduler.status_of(&pane.id);
            let (label, color, confidence) = match status.and_then(|s| s.activity.as_ref()) {
                Some(activity) => (state_label(activity.state), state_color(activity.state), activity.confidence),
                None => ("loading", Color::DarkGray, 0.0),
            };
            let selected = scheduler.selected_pane_id() == Some(pane.id.as_str());
            let marker = if selected { ">" } else { " " };
            Row::new(vec![
                Cell::from(marker.to_string()),
                Cell::from(pane.title.clone()),
                Cell::from(format!("{:?}", pane.agent_type)),
                Cell::from(Span::styled(label, Style::default().fg(color))),
                Cell::from(format!("{confidence:.2}")),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Percentage(40),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "pane", "agent", "state", "conf"]).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(Block::default().borders(Borders::ALL).title(" panes "));

    f.render_widget(table, area);
}

fn render_preview(f: &mut Frame, area: Rect, scheduler: &Scheduler, preview_content: Option<&str>) {
    let title = scheduler
        .selected_pane_id()
        .map(|id| format!(" preview: {id} "))
        .unwrap_or_else(|| " preview ".to_string());

    let text = match preview_content {
        Some(raw) => raw.into_text().unwrap_or_else(|_| raw.into()),
        None => "(no pane selected)".into(),
    };

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn render_zoomed(f: &mut Frame, area: Rect, scheduler: &Scheduler, preview_content: Option<&str>) {
    let title = scheduler
        .selected_pane_id()
        .map(|id| format!(" zoomed: {id} (press z to exit) "))
        .unwrap_or_else(|| " zoomed ".to_string());

    let text = match preview_content {
        Some(raw) => raw.into_text().unwrap_or_else(|_| raw.into()),
        None => "(no pane selected)".into(),
    };

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled("[↑/↓]", Style::default().fg(Color::Yellow)),
        Span::raw(" select  "),
        Span::styled("[z]", Style::default().fg(Color::Yellow)),
        Span::raw(" zoom  "),
        Span::styled("[q]", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
