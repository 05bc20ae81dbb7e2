use std::sync::Arc;
use std::time::Instant;

use ratatui::layout::Rect;

use mindcare_core::{
    ActiveTurn, ApiKey, ChatMessage, ChatStream, ConfigurationError, Conversation, Fragment,
    FragmentStream, Mood, MoodAcknowledgement, MoodLog, RemoteCallError, Startup,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// No usable API key; nothing may reach the network.
    Setup,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Chat,
    Mood,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Input => FocusPane::Chat,
            FocusPane::Chat => FocusPane::Mood,
            FocusPane::Mood => FocusPane::Input,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub focus: FocusPane,
    pub setup_error: Option<ConfigurationError>,

    // Chat state
    pub conversation: Conversation,
    pub active_turn: Option<ActiveTurn>,
    pub client: Option<Arc<dyn ChatStream>>,
    pub model_label: String,
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars
    pub chat_scroll: u16,
    pub follow_output: bool, // keep the newest text in view while streaming
    pub chat_height: u16,    // Height of chat area for scroll calculations
    pub chat_line_count: u16, // Wrapped rows in the chat panel, set by `ui::render_chat`
    pub show_disclaimer: bool,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Mood state
    pub mood_log: MoodLog,
    pub mood_ack: MoodAcknowledgement,
    pub mood_note: String,
    pub editing_note: bool,

    // Chat panel area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
}

impl App {
    /// Build the app for a launch-time configuration check. `connect` is only
    /// called when the key is usable.
    pub fn from_startup<F>(startup: Startup, connect: F) -> Self
    where
        F: FnOnce(ApiKey) -> Arc<dyn ChatStream>,
    {
        match startup {
            Startup::Ready(key) => {
                let client = connect(key);
                let mut app = Self::blank(Screen::Chat);
                app.model_label = client.name().to_string();
                app.client = Some(client);
                app
            }
            Startup::SetupRequired(error) => {
                tracing::warn!(%error, "API key unavailable, showing setup screen");
                let mut app = Self::blank(Screen::Setup);
                app.setup_error = Some(error);
                app
            }
        }
    }

    fn blank(screen: Screen) -> Self {
        Self {
            should_quit: false,
            screen,
            focus: FocusPane::Input,
            setup_error: None,

            conversation: Conversation::new(),
            active_turn: None,
            client: None,
            model_label: String::new(),
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            follow_output: true,
            chat_height: 0,
            chat_line_count: 0,
            show_disclaimer: true,
            animation_frame: 0,

            mood_log: MoodLog::new(),
            mood_ack: MoodAcknowledgement::default(),
            mood_note: String::new(),
            editing_note: false,

            chat_area: None,
        }
    }

    pub fn with_model_label(mut self, label: impl Into<String>) -> Self {
        self.model_label = label.into();
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    /// Start a turn from the input box. Returns the stream the caller must
    /// drain through `on_item`.
    pub fn submit(&mut self) -> Option<FragmentStream> {
        let client = self.client.clone()?;

        let turn = match self.conversation.begin_turn(&self.input) {
            Ok(turn) => turn,
            Err(rejected) => {
                tracing::debug!(%rejected, "submission ignored");
                return None;
            }
        };

        let stream = client.stream_reply(self.conversation.request_context(&turn));
        self.active_turn = Some(turn);
        self.input.clear();
        self.input_cursor = 0;
        self.follow_output = true;
        self.scroll_chat_to_bottom();
        Some(stream)
    }

    /// Feed one poll result of the active stream. Returns true once the
    /// stream is finished and should be dropped.
    pub fn on_item(&mut self, item: Option<Result<Fragment, RemoteCallError>>) -> bool {
        match item {
            Some(Ok(fragment)) => {
                self.on_fragment(fragment);
                false
            }
            Some(Err(e)) => {
                self.on_stream_error(e);
                true
            }
            None => {
                self.on_stream_end();
                true
            }
        }
    }

    pub fn on_fragment(&mut self, fragment: Fragment) {
        if let Some(turn) = self.active_turn.as_mut() {
            self.conversation.apply(turn, fragment);
            if self.follow_output {
                self.scroll_chat_to_bottom();
            }
        }
    }

    pub fn on_stream_end(&mut self) {
        if let Some(turn) = self.active_turn.take() {
            self.conversation.complete(turn);
            if self.follow_output {
                self.scroll_chat_to_bottom();
            }
        }
    }

    pub fn on_stream_error(&mut self, error: RemoteCallError) {
        if let Some(turn) = self.active_turn.take() {
            self.conversation.fail(turn, &error);
            if self.follow_output {
                self.scroll_chat_to_bottom();
            }
        }
    }

    /// Log a mood with the pending note, if any, and flash the acknowledgement.
    pub fn log_mood(&mut self, mood: Mood, now: Instant) {
        let note = std::mem::take(&mut self.mood_note);
        self.mood_log.log(mood, Some(&note));
        self.mood_ack.show(mood, now);
        self.editing_note = false;
    }

    /// Tick animation frame and expire the mood acknowledgement (called by Tick event)
    pub fn tick(&mut self, now: Instant) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.mood_ack.expire(now);
    }

    pub fn dismiss_disclaimer(&mut self) {
        self.show_disclaimer = false;
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_output = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_output = self.chat_scroll >= max;
    }

    pub fn scroll_chat_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_output = false;
    }

    /// Scroll chat to bottom so the newest text is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
        self.follow_output = true;
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count.saturating_sub(visible_height)
    }
}

/// Convert char index to byte index for UTF-8 safe string manipulation
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use mindcare_core::ai::{ScriptStep, ScriptedClient};
    use std::time::Duration;

    fn chat_app(client: Arc<ScriptedClient>) -> App {
        App::from_startup(Startup::from_key(Some("test-key".into())), move |_| {
            client as Arc<dyn ChatStream>
        })
    }

    async fn drain(app: &mut App, mut stream: FragmentStream) {
        while !app.on_item(stream.next().await) {}
    }

    #[test]
    fn missing_key_shows_setup_and_never_calls_client() {
        let client = Arc::new(ScriptedClient::new().with_reply(&["unused"]));
        let connect_client = Arc::clone(&client);
        let mut app = App::from_startup(Startup::from_key(None), move |_| {
            connect_client as Arc<dyn ChatStream>
        });

        assert_eq!(app.screen, Screen::Setup);
        assert!(app.setup_error.is_some());

        app.input = "hello".into();
        assert!(app.submit().is_none());
        assert!(app.messages().is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn submit_streams_reply_into_transcript() {
        let client = Arc::new(ScriptedClient::new().with_reply(&["I hear ", "you. "]));
        let mut app = chat_app(Arc::clone(&client));
        app.input = "I feel anxious".into();
        app.input_cursor = app.input.chars().count();

        let stream = app.submit().expect("turn should start");
        assert!(app.input.is_empty());
        assert!(app.is_loading());
        drain(&mut app, stream).await;

        assert!(!app.is_loading());
        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.messages()[1].text, "I hear you. ");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_turn_shows_fallback_and_unlocks_input() {
        let client = Arc::new(ScriptedClient::new().with_script(vec![ScriptStep::Fail {
            status: 500,
            message: "boom".into(),
        }]));
        let mut app = chat_app(client);
        app.input = "hello".into();

        let stream = app.submit().unwrap();
        drain(&mut app, stream).await;

        assert!(!app.is_loading());
        assert_eq!(app.messages().len(), 3);
        assert!(app.messages()[2].fallback);
    }

    #[test]
    fn on_item_reports_when_the_stream_is_done() {
        let mut app = chat_app(Arc::new(ScriptedClient::new()));
        app.input = "hello".into();
        let _stream = app.submit().unwrap();

        assert!(!app.on_item(Some(Ok(Fragment::text("Partial ")))));
        assert!(app.is_loading());
        assert!(app.on_item(Some(Err(RemoteCallError::Status {
            status: 503,
            message: "overloaded".into(),
        }))));

        assert!(!app.is_loading());
        assert_eq!(app.messages()[1].text, "Partial ");
        assert!(app.messages()[2].fallback);
        // Nothing left to finish once the turn is closed
        assert!(app.on_item(None));
        assert_eq!(app.messages().len(), 3);
    }

    #[test]
    fn blank_or_busy_submissions_are_ignored() {
        let client = Arc::new(ScriptedClient::new().with_reply(&["a"]).with_reply(&["b"]));
        let mut app = chat_app(Arc::clone(&client));

        app.input = "   ".into();
        assert!(app.submit().is_none());
        assert!(app.messages().is_empty());

        app.input = "first".into();
        let _stream = app.submit().unwrap();
        app.input = "second".into();
        assert!(app.submit().is_none());
        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.input, "second");
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn mood_click_logs_once_and_ack_expires() {
        let mut app = chat_app(Arc::new(ScriptedClient::new()));
        let start = Instant::now();
        app.mood_note = " rough morning ".into();

        app.log_mood(Mood::Sad, start);
        assert_eq!(app.mood_log.len(), 1);
        assert_eq!(app.mood_log.entries()[0].note.as_deref(), Some("rough morning"));
        assert!(app.mood_note.is_empty());
        assert_eq!(app.mood_ack.current(start), Some(Mood::Sad));

        app.tick(start + Duration::from_secs(3));
        assert_eq!(app.mood_ack.current(start + Duration::from_secs(3)), None);
        assert_eq!(app.mood_log.len(), 1);
    }

    #[test]
    fn input_editing_is_char_aware() {
        let mut app = chat_app(Arc::new(ScriptedClient::new()));
        for c in "héllo".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input, "hélo");
        app.cursor_home();
        app.delete();
        assert_eq!(app.input, "élo");
        app.cursor_end();
        app.insert_char('!');
        assert_eq!(app.input, "élo!");
    }

    #[test]
    fn scrolling_up_stops_following_output() {
        let mut app = chat_app(Arc::new(ScriptedClient::new()));
        app.chat_height = 2;
        app.chat_line_count = 10;
        app.input = "a message".into();
        let _stream = app.submit().unwrap();
        assert!(app.follow_output);
        assert!(app.chat_scroll > 0);

        app.scroll_up(1);
        assert!(!app.follow_output);
        app.scroll_down(100);
        assert!(app.follow_output);
    }
}
