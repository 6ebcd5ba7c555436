//! Story lifecycle and typed projections of tracker records.
//!
//! # Design
//! Stories stay as plain `Record`s because the service adds fields freely;
//! only `current_state` is checked. Projects and notes are small and stable,
//! so they get structs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::record::{Record, Value};

pub type StoryId = u64;

/// Lifecycle states in their conventional order. Any state may move to any
/// other; only membership is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryState {
    Unscheduled,
    Unstarted,
    Started,
    Finished,
    Delivered,
    Accepted,
}

impl StoryState {
    pub const ALL: [StoryState; 6] = [
        StoryState::Unscheduled,
        StoryState::Unstarted,
        StoryState::Started,
        StoryState::Finished,
        StoryState::Delivered,
        StoryState::Accepted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StoryState::Unscheduled => "unscheduled",
            StoryState::Unstarted => "unstarted",
            StoryState::Started => "started",
            StoryState::Finished => "finished",
            StoryState::Delivered => "delivered",
            StoryState::Accepted => "accepted",
        }
    }

    pub fn names() -> [&'static str; 6] {
        Self::ALL.map(StoryState::as_str)
    }
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoryState {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| TrackerError::InvalidState { state: s.to_string() })
    }
}

/// Set `current_state` on a fetched story.
///
/// `story` is the result of the caller's lookup; `None` means the id did not
/// resolve. The state name is checked before the story is touched.
pub fn apply_state_change(story: Option<Record>, story_id: StoryId, new_state: &str) -> Result<Record> {
    let mut story = story.ok_or_else(|| TrackerError::NotFound(format!("no story with id: {story_id}")))?;
    let state: StoryState = new_state.parse()?;
    story.insert("current_state", state.as_str());
    Ok(story)
}

/// The `id` of a story record, as an integer or numeric text.
pub fn story_id(story: &Record) -> Result<StoryId> {
    let value = story.get("id").ok_or_else(|| TrackerError::MissingField("id".to_string()))?;
    integer_field("id", value).and_then(|n| {
        StoryId::try_from(n).map_err(|_| TrackerError::Parse {
            hint: "integer",
            value: n.to_string(),
        })
    })
}

/// Project metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub iteration_length: i64,
    pub week_start_day: String,
    pub point_scale: String,
}

impl Project {
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            name: text_field(record, "name")?,
            iteration_length: integer_field("iteration_length", required(record, "iteration_length")?)?,
            week_start_day: text_field(record, "week_start_day")?,
            point_scale: text_field(record, "point_scale")?,
        })
    }
}

/// A comment attached to a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub author: String,
    pub noted_at: String,
}

impl Note {
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: integer_field("id", required(record, "id")?)?,
            text: text_field(record, "text")?,
            author: text_field(record, "author")?,
            noted_at: text_field(record, "noted_at")?,
        })
    }
}

fn required<'a>(record: &'a Record, name: &str) -> Result<&'a Value> {
    record.get(name).ok_or_else(|| TrackerError::MissingField(name.to_string()))
}

fn text_field(record: &Record, name: &str) -> Result<String> {
    match required(record, name)? {
        Value::Record(_) => Err(TrackerError::MissingField(name.to_string())),
        scalar => Ok(scalar.to_string()),
    }
}

fn integer_field(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        Value::Text(text) => text.trim().parse().map_err(|_| TrackerError::Parse {
            hint: "integer",
            value: text.clone(),
        }),
        Value::Record(_) => Err(TrackerError::MissingField(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story() -> Record {
        Record::new()
            .with("id", 7)
            .with("name", "Fix bug")
            .with("current_state", "unstarted")
    }

    #[test]
    fn parses_every_state_name() {
        for state in StoryState::ALL {
            assert_eq!(state.as_str().parse::<StoryState>().unwrap(), state);
        }
        assert!("Started".parse::<StoryState>().is_err());
    }

    #[test]
    fn states_serialize_lowercase() {
        assert_eq!(serde_json::to_value(StoryState::Delivered).unwrap(), "delivered");
    }

    #[test]
    fn state_change_sets_current_state() {
        let updated = apply_state_change(Some(story()), 7, "started").unwrap();
        assert_eq!(updated.get_str("current_state"), Some("started"));
        assert_eq!(updated.get_str("name"), Some("Fix bug"));
    }

    #[test]
    fn any_state_may_follow_any_other() {
        let accepted = apply_state_change(Some(story()), 7, "accepted").unwrap();
        let back = apply_state_change(Some(accepted), 7, "unscheduled").unwrap();
        assert_eq!(back.get_str("current_state"), Some("unscheduled"));
    }

    #[test]
    fn invalid_state_is_rejected_with_valid_list() {
        let err = apply_state_change(Some(story()), 7, "bogus").unwrap_err();
        assert!(matches!(&err, TrackerError::InvalidState { state } if state == "bogus"));
        let msg = err.to_string();
        for name in StoryState::names() {
            assert!(msg.contains(name), "{msg} lacks {name}");
        }
    }

    #[test]
    fn missing_story_is_not_found() {
        let err = apply_state_change(None, 99, "started").unwrap_err();
        assert!(matches!(&err, TrackerError::NotFound(msg) if msg == "no story with id: 99"));
    }

    #[test]
    fn story_id_accepts_integer_or_numeric_text() {
        assert_eq!(story_id(&story()).unwrap(), 7);
        assert_eq!(story_id(&Record::new().with("id", "12")).unwrap(), 12);
        assert!(matches!(story_id(&Record::new()), Err(TrackerError::MissingField(f)) if f == "id"));
        assert!(matches!(story_id(&Record::new().with("id", -1)), Err(TrackerError::Parse { .. })));
    }

    #[test]
    fn project_from_record() {
        let record = Record::new()
            .with("id", 1)
            .with("name", "Demo")
            .with("iteration_length", 2)
            .with("week_start_day", "Monday")
            .with("point_scale", "0,1,2,3");
        assert_eq!(
            Project::from_record(&record).unwrap(),
            Project {
                name: "Demo".to_string(),
                iteration_length: 2,
                week_start_day: "Monday".to_string(),
                point_scale: "0,1,2,3".to_string(),
            }
        );
    }

    #[test]
    fn project_requires_every_field() {
        let record = Record::new().with("name", "Demo");
        assert!(matches!(
            Project::from_record(&record),
            Err(TrackerError::MissingField(f)) if f == "iteration_length"
        ));
    }

    #[test]
    fn note_accepts_untyped_id() {
        let record = Record::new()
            .with("id", "5")
            .with("text", "hello")
            .with("author", "ann")
            .with("noted_at", "2024/01/02 03:04:05 UTC");
        let note = Note::from_record(&record).unwrap();
        assert_eq!(note.id, 5);
        assert_eq!(note.author, "ann");
    }
}
