use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::session::Mode;

const BG_DARK: Color = Color::Rgb(12, 12, 16);
const BG_PANEL: Color = Color::Rgb(18, 18, 24);

const SAPPHIRE: Color = Color::Rgb(101, 150, 243);
const BURGUNDY: Color = Color::Rgb(204, 92, 68);
const OLIVE: Color = Color::Rgb(131, 179, 102);

const TEXT_PRIMARY: Color = Color::Rgb(240, 240, 245);
const TEXT_SECONDARY: Color = Color::Rgb(180, 180, 190);
const TEXT_MUTED: Color = Color::Rgb(105, 116, 133);

const BORDER_DIM: Color = Color::Rgb(45, 50, 60);
const BORDER_ACCENT: Color = Color::Rgb(70, 85, 110);

pub fn draw(frame: &mut Frame, app: &App) {
    let bg = Block::default().style(Style::default().bg(BG_DARK));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // mode tabs
            Constraint::Min(3),    // transcript
            Constraint::Length(3), // input
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    draw_mode_tabs(frame, chunks[0], app);
    draw_transcript(frame, chunks[1], app);
    draw_input(frame, chunks[2], app);
    draw_status_bar(frame, chunks[3], app);

    if app.showing_command_popup() {
        draw_command_popup(frame, chunks[2], app);
    }
}

fn draw_mode_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans: Vec<Span> = vec![Span::styled(
        " vaultchat ",
        Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD),
    )];
    for (i, mode) in Mode::ALL.iter().enumerate() {
        let key = format!("F{}", i + 1);
        let style = if *mode == app.active_mode() {
            Style::default()
                .fg(BG_DARK)
                .bg(SAPPHIRE)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_SECONDARY)
        };
        spans.push(Span::styled(format!(" {} {} ", key, mode.label()), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_transcript(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM))
        .style(Style::default().bg(BG_PANEL));

    let inner_height = area.height.saturating_sub(2) as usize;
    let total_lines = app.display_line_count();
    // scroll_offset counts lines back from the bottom.
    let top = total_lines
        .saturating_sub(inner_height)
        .saturating_sub(app.scroll_offset);

    let paragraph = Paragraph::new(app.display.as_str())
        .block(block)
        .style(Style::default().fg(TEXT_PRIMARY))
        .wrap(Wrap { trim: false })
        .scroll((top as u16, 0));
    frame.render_widget(paragraph, area);
}

fn draw_input(frame: &mut Frame, area: Rect, app: &App) {
    let border_color = if app.is_loading {
        BORDER_DIM
    } else {
        BORDER_ACCENT
    };
    let title = if app.is_loading {
        " waiting for answer... "
    } else {
        " message "
    };

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(TEXT_MUTED)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(BG_PANEL));

    let paragraph = Paragraph::new(app.input.as_str())
        .block(block)
        .style(Style::default().fg(TEXT_PRIMARY));
    frame.render_widget(paragraph, area);

    if !app.is_loading {
        let cursor_x = area.x + 1 + app.input.width() as u16;
        let cursor_x = cursor_x.min(area.x + area.width.saturating_sub(2));
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let (message, color) = match &app.status_message {
        Some(msg) if msg.starts_with("Error:") => (msg.clone(), BURGUNDY),
        Some(msg) => (msg.clone(), TEXT_SECONDARY),
        None => {
            let chat = if app.chat_ready { "agent ready" } else { "agent offline" };
            let vault = match app.vault_chunks {
                Some(n) => format!("vault: {} chunks", n),
                None => "vault: none".to_string(),
            };
            let mut parts = vec![chat.to_string(), vault];
            if let Some(at) = &app.last_activity {
                parts.push(format!("last answer {}", at.format("%H:%M:%S")));
            }
            (format!(" {}", parts.join(" · ")), TEXT_MUTED)
        }
    };

    let indicator = if app.chat_ready {
        Span::styled(" ● ", Style::default().fg(OLIVE))
    } else {
        Span::styled(" ● ", Style::default().fg(BURGUNDY))
    };
    let line = Line::from(vec![
        indicator,
        Span::styled(message, Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_command_popup(frame: &mut Frame, input_area: Rect, app: &App) {
    let filtered = app.get_filtered_commands();
    if filtered.is_empty() {
        return;
    }

    let height = (filtered.len() as u16 + 2).min(input_area.y);
    let area = Rect {
        x: input_area.x + 1,
        y: input_area.y.saturating_sub(height),
        width: input_area.width.saturating_sub(2).min(44),
        height,
    };

    let mut lines: Vec<Line> = Vec::new();
    for (i, (cmd, desc)) in filtered.iter().enumerate() {
        let selected = app.command_selection == Some(i);
        let style = if selected {
            Style::default().fg(BG_DARK).bg(SAPPHIRE)
        } else {
            Style::default().fg(TEXT_PRIMARY)
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<8}", cmd), style.add_modifier(Modifier::BOLD)),
            Span::styled(format!(" {}", desc), style),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_ACCENT))
        .style(Style::default().bg(BG_PANEL));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
