use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use mindcare_core::{FragmentStream, Mood};

use crate::app::{App, FocusPane, Screen};
use crate::tui::AppEvent;

/// Apply one UI event. Returns the reply stream when the event started a turn.
pub fn handle_event(app: &mut App, event: AppEvent) -> Option<FragmentStream> {
    match event {
        AppEvent::Key(key) => return handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {
            if app.follow_output {
                app.scroll_chat_to_bottom();
            }
        }
        AppEvent::Tick => app.tick(Instant::now()),
    }
    None
}

fn handle_key(app: &mut App, key: KeyEvent) -> Option<FragmentStream> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return None;
    }

    match app.screen {
        Screen::Setup => {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                app.should_quit = true;
            }
            None
        }
        Screen::Chat => match app.focus {
            FocusPane::Input => handle_input_key(app, key),
            FocusPane::Chat => {
                handle_chat_key(app, key);
                None
            }
            FocusPane::Mood => {
                handle_mood_key(app, key);
                None
            }
        },
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) -> Option<FragmentStream> {
    match key.code {
        KeyCode::Enter => return app.submit(),
        KeyCode::Esc => app.focus = FocusPane::Chat,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(half_page(app)),
        KeyCode::PageDown => app.scroll_down(half_page(app)),
        KeyCode::Char(c) if is_text(&key) => app.insert_char(c),
        _ => {}
    }
    None
}

/// Plain or shifted characters. Ctrl and Alt chords never become text.
fn is_text(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Esc => app.focus = FocusPane::Input,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('m') => app.focus = FocusPane::Mood,
        KeyCode::Char('d') => app.dismiss_disclaimer(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_down(half_page(app)),
        KeyCode::PageUp => app.scroll_up(half_page(app)),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_chat_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_mood_key(app: &mut App, key: KeyEvent) {
    if app.editing_note {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => app.editing_note = false,
            KeyCode::Backspace => {
                app.mood_note.pop();
            }
            KeyCode::Char(c) if is_text(&key) => app.mood_note.push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('n') => app.editing_note = true,
        KeyCode::Char('d') => app.dismiss_disclaimer(),
        KeyCode::Esc => app.focus = FocusPane::Chat,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char(c) => {
            if let Some(mood) = mood_for_key(c) {
                app.log_mood(mood, Instant::now());
            }
        }
        _ => {}
    }
}

/// `1`-`6` pick moods in display order.
fn mood_for_key(c: char) -> Option<Mood> {
    let index = c.to_digit(10)?.checked_sub(1)? as usize;
    Mood::all().get(index).copied()
}

fn half_page(app: &App) -> u16 {
    (app.chat_height / 2).max(1)
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use mindcare_core::ai::ScriptedClient;
    use mindcare_core::{ChatStream, Startup};
    use std::sync::Arc;

    fn key(code: KeyCode) -> AppEvent {
        chord(code, KeyModifiers::NONE)
    }

    fn chord(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    fn chat_app() -> App {
        let client: Arc<dyn ChatStream> = Arc::new(ScriptedClient::new().with_reply(&["ok"]));
        App::from_startup(Startup::from_key(Some("key".into())), move |_| client)
    }

    #[test]
    fn enter_submits_typed_message() {
        let mut app = chat_app();
        type_text(&mut app, "I feel anxious");

        let stream = handle_event(&mut app, key(KeyCode::Enter));
        assert!(stream.is_some());
        assert_eq!(app.messages()[0].text, "I feel anxious");
    }

    #[test]
    fn enter_on_empty_input_does_nothing() {
        let mut app = chat_app();

        assert!(handle_event(&mut app, key(KeyCode::Enter)).is_none());
        assert!(app.messages().is_empty());
    }

    #[test]
    fn number_keys_log_moods_in_mood_panel() {
        let mut app = chat_app();
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('m')));
        assert_eq!(app.focus, FocusPane::Mood);

        handle_event(&mut app, key(KeyCode::Char('n')));
        type_text(&mut app, "slept well");
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(&mut app, key(KeyCode::Char('2')));
        handle_event(&mut app, key(KeyCode::Char('7')));

        assert_eq!(app.mood_log.len(), 1);
        let entry = &app.mood_log.entries()[0];
        assert_eq!(entry.mood, Mood::Calm);
        assert_eq!(entry.note.as_deref(), Some("slept well"));
    }

    #[test]
    fn q_in_input_is_text_not_quit() {
        let mut app = chat_app();
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.input, "q");

        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_and_alt_chords_do_not_type() {
        let mut app = chat_app();
        handle_event(&mut app, chord(KeyCode::Char('w'), KeyModifiers::CONTROL));
        handle_event(&mut app, chord(KeyCode::Char('b'), KeyModifiers::ALT));
        assert!(app.input.is_empty());

        handle_event(&mut app, chord(KeyCode::Char('H'), KeyModifiers::SHIFT));
        type_text(&mut app, "i");
        assert_eq!(app.input, "Hi");
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('m')));
        handle_event(&mut app, key(KeyCode::Char('n')));
        handle_event(&mut app, chord(KeyCode::Char('x'), KeyModifiers::ALT));
        assert!(app.mood_note.is_empty());
    }

    #[test]
    fn setup_screen_only_quits() {
        let mut app = App::from_startup(Startup::from_key(None), |_| -> Arc<dyn ChatStream> {
            unreachable!("no client without a key")
        });
        type_text(&mut app, "hello");
        assert!(handle_event(&mut app, key(KeyCode::Enter)).is_none());
        assert!(app.input.is_empty());

        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn mood_keys_map_to_display_order() {
        assert_eq!(mood_for_key('1'), Some(Mood::Happy));
        assert_eq!(mood_for_key('6'), Some(Mood::Angry));
        assert_eq!(mood_for_key('0'), None);
        assert_eq!(mood_for_key('x'), None);
    }
}
