//! Session-only mood journal.

use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownMood;

/// How long the "logged" highlight stays on a mood after it is picked.
pub const ACK_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Calm,
    Neutral,
    Sad,
    Anxious,
    Angry,
}

impl Mood {
    pub fn all() -> [Mood; 6] {
        [
            Mood::Happy,
            Mood::Calm,
            Mood::Neutral,
            Mood::Sad,
            Mood::Anxious,
            Mood::Angry,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Calm => "calm",
            Mood::Neutral => "neutral",
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Angry => "angry",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Calm => "Calm",
            Mood::Neutral => "Neutral",
            Mood::Sad => "Sad",
            Mood::Anxious => "Anxious",
            Mood::Angry => "Angry",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Calm => "😌",
            Mood::Neutral => "😐",
            Mood::Sad => "😢",
            Mood::Anxious => "😰",
            Mood::Angry => "😡",
        }
    }
}

impl FromStr for Mood {
    type Err = UnknownMood;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mood::all()
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| UnknownMood(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Local>,
    pub mood: Mood,
    pub note: Option<String>,
}

impl MoodEntry {
    pub fn iso_timestamp(&self) -> String {
        self.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}

/// Append-only log of mood entries for the current session.
#[derive(Debug, Clone, Default)]
pub struct MoodLog {
    entries: Vec<MoodEntry>,
}

impl MoodLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, mood: Mood, note: Option<&str>) -> &MoodEntry {
        let note = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        self.entries.push(MoodEntry {
            id: Uuid::new_v4(),
            recorded_at: Local::now(),
            mood,
            note,
        });
        let entry = &self.entries[self.entries.len() - 1];
        tracing::debug!(
            mood = mood.as_str(),
            at = %entry.iso_timestamp(),
            total = self.entries.len(),
            "mood logged"
        );
        entry
    }

    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &MoodEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Transient "just logged" indicator for the mood picker.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoodAcknowledgement {
    shown: Option<(Mood, Instant)>,
}

impl MoodAcknowledgement {
    pub fn show(&mut self, mood: Mood, now: Instant) {
        self.shown = Some((mood, now));
    }

    /// The highlighted mood, if its acknowledgement has not run out.
    pub fn current(&self, now: Instant) -> Option<Mood> {
        self.shown
            .filter(|(_, since)| now.saturating_duration_since(*since) < ACK_DURATION)
            .map(|(mood, _)| mood)
    }

    /// Drop an elapsed acknowledgement. Returns true if one was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.shown.is_some() && self.current(now).is_none() {
            self.shown = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mood_names() {
        assert_eq!("Anxious".parse::<Mood>(), Ok(Mood::Anxious));
        assert_eq!(" calm ".parse::<Mood>(), Ok(Mood::Calm));
        assert_eq!("elated".parse::<Mood>(), Err(UnknownMood("elated".into())));
        for mood in Mood::all() {
            assert_eq!(mood.as_str().parse::<Mood>(), Ok(mood));
        }
    }

    #[test]
    fn each_log_appends_one_entry() {
        let mut log = MoodLog::new();
        log.log(Mood::Sad, None);
        log.log(Mood::Sad, Some("long day"));
        log.log(Mood::Calm, Some("   "));

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[1].note.as_deref(), Some("long day"));
        assert_eq!(log.entries()[2].note, None);
        assert_ne!(log.entries()[0].id, log.entries()[1].id);
    }

    #[test]
    fn newest_first_reverses_log_order() {
        let mut log = MoodLog::new();
        log.log(Mood::Happy, None);
        log.log(Mood::Angry, None);

        let moods: Vec<Mood> = log.newest_first().map(|e| e.mood).collect();
        assert_eq!(moods, vec![Mood::Angry, Mood::Happy]);
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let mut log = MoodLog::new();
        let stamp = log.log(Mood::Neutral, None).iso_timestamp();

        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok(), "{stamp}");
    }

    #[test]
    fn acknowledgement_clears_without_touching_log() {
        let start = Instant::now();
        let mut log = MoodLog::new();
        let mut ack = MoodAcknowledgement::default();

        log.log(Mood::Happy, None);
        ack.show(Mood::Happy, start);
        assert_eq!(ack.current(start + Duration::from_millis(1500)), Some(Mood::Happy));
        assert!(!ack.expire(start + Duration::from_millis(1500)));

        assert!(ack.expire(start + ACK_DURATION));
        assert_eq!(ack.current(start + ACK_DURATION), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn new_pick_restarts_acknowledgement() {
        let start = Instant::now();
        let mut ack = MoodAcknowledgement::default();

        ack.show(Mood::Sad, start);
        ack.show(Mood::Calm, start + Duration::from_millis(1900));

        let later = start + Duration::from_millis(2500);
        assert_eq!(ack.current(later), Some(Mood::Calm));
    }
}
