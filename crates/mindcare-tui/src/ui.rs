use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use mindcare_core::resources::{
    CRISIS_RESOURCES, DISCLAIMER, EMERGENCY_NUMBERS, SETUP_STEPS, WELCOME_PROMPTS,
    WELCOME_TEXT, WELCOME_TITLE,
};
use mindcare_core::{ChatMessage, ChatRole, Mood};

use crate::app::{App, FocusPane, Screen};

const SIDEBAR_WIDTH: u16 = 34;
const STREAM_CURSOR: &str = "▍";

/// Parse a line of text and convert **bold** and *italic* markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' {
            current_text.push(c);
            continue;
        }

        let bold = chars.peek() == Some(&'*');
        if bold {
            chars.next();
        } else if chars.peek().map_or(true, |next| next.is_whitespace()) {
            // A lone `*` before a space is arithmetic or a bullet, not emphasis
            current_text.push(c);
            continue;
        }

        // Collect up to the matching delimiter
        let mut inner = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' {
                if !bold {
                    if inner.ends_with(char::is_whitespace) {
                        inner.push(c);
                        continue;
                    }
                    found_close = true;
                    break;
                }
                if chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
            }
            inner.push(c);
        }

        if found_close && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            let modifier = if bold { Modifier::BOLD } else { Modifier::ITALIC };
            spans.push(Span::styled(inner, Style::default().add_modifier(modifier)));
        } else {
            // No closing delimiter, treat as literal
            current_text.push_str(if bold { "**" } else { "*" });
            current_text.push_str(&inner);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Setup => render_setup_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mood_indicator = if app.mood_log.is_empty() {
        String::new()
    } else {
        format!(" [{} moods logged]", app.mood_log.len())
    };

    let title = Line::from(vec![
        Span::styled(" MindcareAI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(mood_indicator, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style, keys): (&str, Style, &[(&str, &str)]) = match (app.screen, app.focus) {
        (Screen::Setup, _) => (
            " SETUP ",
            Style::default().bg(Color::Red).fg(Color::White),
            &[("q", "quit")],
        ),
        (Screen::Chat, FocusPane::Input) => (
            " TYPE ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
            &[("Enter", "send"), ("PgUp/PgDn", "scroll"), ("Tab", "focus"), ("Esc", "chat")],
        ),
        (Screen::Chat, FocusPane::Chat) => (
            " CHAT ",
            Style::default().bg(Color::Blue).fg(Color::White),
            &[("j/k", "scroll"), ("g/G", "top/end"), ("i", "type"), ("m", "mood"), ("d", "hide notice"), ("q", "quit")],
        ),
        (Screen::Chat, FocusPane::Mood) if app.editing_note => (
            " NOTE ",
            Style::default().bg(Color::Yellow).fg(Color::Black),
            &[("Enter", "done"), ("Esc", "done")],
        ),
        (Screen::Chat, FocusPane::Mood) => (
            " MOOD ",
            Style::default().bg(Color::Magenta).fg(Color::White),
            &[("1-6", "log mood"), ("n", "note"), ("Esc", "chat"), ("q", "quit")],
        ),
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_setup_screen(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = (SETUP_STEPS.len() as u16 + 7).min(area.height);

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" API key required ");

    let reason = app
        .setup_error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "No API key configured".to_string());

    let mut lines = vec![
        Line::from(Span::styled(reason, Style::default().fg(Color::Red).bold())),
        Line::default(),
    ];
    for (i, step) in SETUP_STEPS.iter().enumerate() {
        lines.push(Line::from(format!("{}. {}", i + 1, step)));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Press q to quit",
        Style::default().fg(Color::DarkGray),
    )));

    let body = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, popup_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [sidebar_area, main_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH.min(area.width / 2)),
        Constraint::Min(0),
    ])
    .areas(area);

    render_sidebar(app, frame, sidebar_area);

    let disclaimer_height = if app.show_disclaimer { 1 } else { 0 };
    let [disclaimer_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(disclaimer_height),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(main_area);

    if app.show_disclaimer {
        let notice = Line::from(vec![
            Span::styled(" ! ", Style::default().bg(Color::Yellow).fg(Color::Black)),
            Span::styled(format!(" {} ", DISCLAIMER), Style::default().fg(Color::Yellow)),
        ]);
        frame.render_widget(Paragraph::new(notice), disclaimer_area);
    }

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store areas for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2) as usize;

    // Wrap once; the same rows set the scroll range and get drawn.
    let mut rows: Vec<Line<'static>> = Vec::new();
    for msg in app.messages() {
        let mut lines = Vec::new();
        push_message_lines(&mut lines, msg, app.animation_frame);
        for line in lines {
            rows.extend(wrap_line(line, inner_width));
        }
    }
    app.chat_line_count = rows.len().min(u16::MAX as usize) as u16;
    if app.follow_output {
        app.scroll_chat_to_bottom();
    }

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", app.model_label));

    if app.messages().is_empty() {
        let welcome = Paragraph::new(welcome_text())
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(welcome, area);
        return;
    }

    let chat = Paragraph::new(Text::from(rows))
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn welcome_text() -> Text<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            WELCOME_TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(WELCOME_TEXT),
        Line::default(),
        Line::from(Span::styled("Try asking:", Style::default().fg(Color::DarkGray))),
    ];
    for prompt in WELCOME_PROMPTS {
        lines.push(Line::from(Span::styled(
            format!("  \"{}\"", prompt),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }
    Text::from(lines)
}

/// Split text into alternating runs of whitespace and non-whitespace.
fn split_words(text: &str) -> Vec<(&str, bool)> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if let Some(prev) = current {
            if prev != space {
                tokens.push((&text[start..i], prev));
                start = i;
            }
        }
        current = Some(space);
    }
    if let Some(space) = current {
        tokens.push((&text[start..], space));
    }
    tokens
}

/// Word-wrap a styled line into rows of at most `width` columns.
/// Words wider than a row are split; continuation rows drop leading spaces.
fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }

    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0;
    // Whitespace held back until the next word shows it fits on this row
    let mut pending: Vec<Span<'static>> = Vec::new();
    let mut pending_width = 0;

    for span in line.spans {
        let style = span.style;
        for (token, is_space) in split_words(&span.content) {
            let token_width = Span::raw(token).width();

            if is_space {
                if row.is_empty() && rows.is_empty() {
                    // Leading indentation of the first row
                    row.push(Span::styled(token.to_string(), style));
                    row_width += token_width;
                } else if !row.is_empty() {
                    pending.push(Span::styled(token.to_string(), style));
                    pending_width += token_width;
                }
                continue;
            }

            if row_width + pending_width + token_width <= width {
                row.append(&mut pending);
                row_width += pending_width;
                pending_width = 0;
                row.push(Span::styled(token.to_string(), style));
                row_width += token_width;
                continue;
            }

            pending.clear();
            pending_width = 0;
            if row_width > 0 {
                rows.push(Line::from(std::mem::take(&mut row)));
                row_width = 0;
            }

            let mut piece = String::new();
            let mut piece_width = 0;
            for c in token.chars() {
                let char_width = Span::raw(c.to_string()).width();
                if piece_width + char_width > width && !piece.is_empty() {
                    rows.push(Line::from(Span::styled(std::mem::take(&mut piece), style)));
                    piece_width = 0;
                }
                piece.push(c);
                piece_width += char_width;
            }
            row.push(Span::styled(piece, style));
            row_width = piece_width;
        }
    }

    if !row.is_empty() || rows.is_empty() {
        rows.push(Line::from(row));
    }
    rows
}

/// Logical lines for one transcript record, before wrapping.
fn push_message_lines(lines: &mut Vec<Line<'static>>, msg: &ChatMessage, animation_frame: u8) {
    match msg.role {
        ChatRole::User => {
            lines.push(Line::from(Span::styled(
                "You",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            if msg.text.is_empty() {
                lines.push(Line::default());
            }
            for line in msg.text.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        ChatRole::Assistant => {
            lines.push(Line::from(Span::styled(
                "MindcareAI",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));

            if msg.text.is_empty() {
                if msg.streaming {
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("Thinking{}", dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                } else {
                    lines.push(Line::default());
                }
            } else if msg.fallback {
                for line in msg.text.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
                    )));
                }
            } else {
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
                if msg.streaming {
                    if let Some(last) = lines.last_mut() {
                        last.spans.push(Span::styled(STREAM_CURSOR, Style::default().fg(Color::Green)));
                    }
                }
            }

            if !msg.citations.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Sources:",
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                )));
                for (i, citation) in msg.citations.iter().enumerate() {
                    lines.push(Line::from(vec![
                        Span::styled(format!("  [{}] ", i + 1), Style::default().fg(Color::Magenta)),
                        Span::raw(citation.title.clone()),
                        Span::styled(
                            format!(" - {}", citation.uri),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]));
                }
            }
        }
    }
    lines.push(Line::default());
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let title = if app.is_loading() {
        " MindcareAI is replying... "
    } else {
        " Message (Enter to send) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let crisis_height = (CRISIS_RESOURCES.len() as u16) * 2 + 3;
    let [mood_area, logs_area, crisis_area] = Layout::vertical([
        Constraint::Length(Mood::all().len() as u16 + 3),
        Constraint::Min(3),
        Constraint::Length(crisis_height),
    ])
    .areas(area);

    render_mood_picker(app, frame, mood_area);
    render_mood_logs(app, frame, logs_area);
    render_crisis_resources(frame, crisis_area);
}

fn render_mood_picker(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Mood;
    let border_color = if focused { Color::Magenta } else { Color::DarkGray };
    let acknowledged = app.mood_ack.current(Instant::now());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" How are you feeling? ");

    let mut lines: Vec<Line> = Mood::all()
        .iter()
        .enumerate()
        .map(|(i, mood)| {
            let text = format!("{} {} {}", i + 1, mood.icon(), mood.label());
            if acknowledged == Some(*mood) {
                Line::from(vec![
                    Span::styled(text, Style::default().bg(Color::Magenta).fg(Color::White).bold()),
                    Span::styled("  logged", Style::default().fg(Color::Magenta)),
                ])
            } else {
                Line::from(text)
            }
        })
        .collect();

    let note_line = if app.editing_note {
        Line::from(vec![
            Span::styled("Note: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.mood_note.clone()),
            Span::styled(STREAM_CURSOR, Style::default().fg(Color::Yellow)),
        ])
    } else if app.mood_note.is_empty() {
        Line::from(Span::styled("n to add a note", Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(vec![
            Span::styled("Note: ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.mood_note.clone()),
        ])
    };
    lines.push(note_line);

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn render_mood_logs(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Recent logs ({}) ", app.mood_log.len()));

    let text = if app.mood_log.is_empty() {
        Text::from(Span::styled("No logs yet.", Style::default().fg(Color::DarkGray)))
    } else {
        let mut lines = Vec::new();
        for entry in app.mood_log.newest_first() {
            lines.push(Line::from(vec![
                Span::raw(format!("{} {} ", entry.mood.icon(), entry.mood.label())),
                Span::styled(
                    entry.recorded_at.format("%b %d %H:%M").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            if let Some(note) = &entry.note {
                lines.push(Line::from(Span::styled(
                    format!("  {}", note),
                    Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        Text::from(lines)
    };

    let logs = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(logs, area);
}

fn render_crisis_resources(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Crisis support ");

    let mut lines = Vec::new();
    for resource in CRISIS_RESOURCES {
        lines.push(Line::from(Span::styled(resource.name, Style::default().bold())));
        lines.push(Line::from(Span::styled(
            format!("  {}", resource.number),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("Emergency: {}", EMERGENCY_NUMBERS.join(" / ")),
        Style::default().fg(Color::Red).bold(),
    )));

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}
