//! UI rendering for TUI

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::{App, PAGE_SIZE};
use super::events::{InputMode, Speaker};
use crate::cli::plan_summary;

/// Main draw function
pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Title bar
            Constraint::Min(10),    // Main area
            Constraint::Length(3),  // Input
            Constraint::Length(1),  // Status bar
        ])
        .split(f.area());

    draw_title_bar(f, app, chunks[0]);

    if app.show_plan && app.workflow.plan().is_some() {
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[1]);
        draw_transcript(f, app, main[0]);
        draw_plan(f, app, main[1]);
    } else {
        draw_transcript(f, app, chunks[1]);
    }

    draw_input(f, app, chunks[2]);
    draw_status_bar(f, app, chunks[3]);

    if app.show_help {
        draw_help_popup(f);
    }
}

fn draw_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Insert => Span::styled(" INSERT ", Style::default().bg(Color::Green).fg(Color::Black)),
    };

    let uptime = app.start_time.elapsed().as_secs();

    let title = Line::from(vec![
        mode,
        Span::raw(" "),
        Span::styled("Metaforge", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled("backend:", Style::default().fg(Color::DarkGray)),
        Span::styled(app.backend_url.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw(" | "),
        Span::styled("stage:", Style::default().fg(Color::DarkGray)),
        Span::styled(app.stage().as_str(), Style::default().fg(Color::Magenta)),
        Span::raw(" | "),
        Span::styled(format!("uptime: {}s", uptime), Style::default().fg(Color::DarkGray)),
    ]);

    let title_bar = Paragraph::new(title)
        .style(Style::default().bg(Color::Rgb(30, 30, 30)));

    f.render_widget(title_bar, area);
}

fn speaker_style(speaker: Speaker) -> Style {
    match speaker {
        Speaker::User => Style::default().fg(Color::Cyan),
        Speaker::Agent => Style::default().fg(Color::Green),
        Speaker::System => Style::default().fg(Color::Yellow),
    }
}

fn draw_transcript(f: &mut Frame, app: &App, area: Rect) {
    if app.entries.is_empty() {
        let mut text = vec![
            Line::from(""),
            Line::from("  Describe the agent you want, e.g. \"Un agente que busque noticias tech\","),
            Line::from("  then answer the analyzer's questions."),
            Line::from(""),
        ];
        text.extend(command_lines());
        let welcome = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Conversation "));
        f.render_widget(welcome, area);
        return;
    }

    let page_start = app.current_page * PAGE_SIZE;
    let items: Vec<ListItem> = app.visible_entries().iter().enumerate().map(|(i, entry)| {
        let is_selected = page_start + i == app.entries_scroll;
        let mut label_style = speaker_style(entry.speaker);
        if is_selected {
            label_style = label_style.add_modifier(Modifier::BOLD);
        }
        let text_style = if entry.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::White)
        };

        let mut lines = vec![Line::from(vec![
            Span::styled(format!("{} ", entry.speaker.label()), label_style),
            Span::styled(
                format!("({}s ago)", entry.timestamp.elapsed().as_secs()),
                Style::default().fg(Color::DarkGray),
            ),
        ])];
        for text in entry.text.lines() {
            lines.push(Line::from(Span::styled(format!("  {}", text), text_style)));
        }
        lines.push(Line::from(""));

        ListItem::new(lines)
    }).collect();

    let transcript = List::new(items)
        .block(Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" Conversation ({}/{}) ",
                app.entries_scroll + 1,
                app.entries.len()
            )));

    f.render_widget(transcript, area);
}

fn draw_plan(f: &mut Frame, app: &App, area: Rect) {
    let Some(plan) = app.workflow.plan() else {
        return;
    };

    let mut lines: Vec<Line> = plan_summary(plan)
        .into_iter()
        .map(|(label, value)| Line::from(vec![
            Span::styled(format!("{:<7}", label), Style::default().fg(Color::DarkGray)),
            Span::styled(value, Style::default().fg(Color::White)),
        ]))
        .collect();

    if !plan.instructions.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Instructions", Style::default().add_modifier(Modifier::BOLD))));
        for instruction in &plan.instructions {
            lines.push(Line::from(format!("  - {}", instruction)));
        }
    }

    if let Some(artifact) = app.workflow.artifact() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Generated {}", artifact.filepath),
            Style::default().fg(Color::Green),
        )));
    }

    let plan_widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Plan "));

    f.render_widget(plan_widget, area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let (prompt, color) = match app.input_mode {
        InputMode::Normal => ("i to type › ", Color::DarkGray),
        InputMode::Insert => ("› ", Color::Green),
    };

    let input_widget = Paragraph::new(format!("{}{}", prompt, app.input))
        .block(Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(" Message "));
    f.render_widget(input_widget, area);

    if app.input_mode == InputMode::Insert {
        let column = (prompt.chars().count() + app.cursor_position) as u16;
        f.set_cursor_position((area.x + 1 + column, area.y + 1));
    }
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (left, left_color) = match (&app.status_message, app.input_mode) {
        (Some((msg, _)), _) => (format!(" {}", msg), Color::Yellow),
        (None, InputMode::Normal) => (" ?:help  p:plan  i:insert  q:quit".to_string(), Color::DarkGray),
        (None, InputMode::Insert) => (" Enter:send  Esc:normal  ?:help in normal mode".to_string(), Color::DarkGray),
    };
    let right = format!(
        "{} sent | page {}/{} ",
        app.history.len(),
        app.current_page + 1,
        app.total_pages()
    );
    let gap = (area.width as usize).saturating_sub(left.chars().count() + right.chars().count());

    let status_bar = Paragraph::new(Line::from(vec![
        Span::styled(left, Style::default().fg(left_color)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(Color::Cyan)),
    ]))
    .style(Style::default().bg(Color::Rgb(30, 30, 30)));

    f.render_widget(status_bar, area);
}

/// `:` commands understood by the input line
const COMMANDS: [(&str, &str); 9] = [
    (":plan", "create the plan from the conversation"),
    (":generate [--no-save]", "generate the agent source"),
    (":session", "show the backend session"),
    (":agents", "list the backend's agents"),
    (":health", "check the backend"),
    (":generated", "list generated agents on disk"),
    (":clear", "clear the transcript"),
    (":help", "show this help"),
    (":quit", "exit"),
];

/// Keys that are not plain typing
const KEYS: [(&str, &str); 6] = [
    ("Esc / i", "leave / enter insert mode"),
    ("j k PgUp PgDn g G", "move through the transcript (normal mode)"),
    ("p", "toggle the plan pane (normal mode)"),
    ("Up / Down", "recall sent messages"),
    ("Ctrl+U Ctrl+K Ctrl+W", "cut before cursor / after cursor / word"),
    ("q / Ctrl+Q", "quit"),
];

fn table(rows: &[(&str, &str)], width: usize) -> Vec<Line<'static>> {
    rows.iter()
        .map(|(name, what)| Line::from(vec![
            Span::styled(format!("  {:<width$}", name, width = width), Style::default().fg(Color::Cyan)),
            Span::raw(what.to_string()),
        ]))
        .collect()
}

fn command_lines() -> Vec<Line<'static>> {
    table(&COMMANDS, 24)
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut help_text = vec![Line::from(Span::styled("Commands", bold))];
    help_text.extend(command_lines());
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled("Keys", bold)));
    help_text.extend(table(&KEYS, 24));
    help_text.push(Line::from(""));
    help_text.push(Line::from(Span::styled("? or Esc closes this help", Style::default().fg(Color::DarkGray))));

    let help_widget = Paragraph::new(help_text)
        .wrap(Wrap { trim: false })
        .block(Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help "));

    f.render_widget(help_widget, area);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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
