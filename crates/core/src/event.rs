//! Analytics event model - the append-only log of what happened.

use crate::id::{SessionId, StudentId};
use crate::Time;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A timestamped record of one tracker mutation or shell run.
///
/// Serialized flat: the common fields sit next to `event_type` and the
/// kind-specific fields, which is also the shape of a CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEvent", into = "RawEvent")]
pub struct Event {
    /// When it happened
    pub timestamp: Time,

    /// Session that recorded it
    pub session_id: SessionId,

    /// Student owning the session
    pub student_id: StudentId,

    /// Lab name
    pub lab_name: String,

    /// Step the event refers to
    pub step_name: Option<String>,

    /// What happened
    pub kind: EventKind,
}

/// Event-specific payload, tagged by `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    /// A step was marked done
    StepCompleted {
        /// Score given
        score: Option<f64>,
        /// Seconds since the step was first started, if known
        time_spent: Option<f64>,
        /// Notes given
        #[serde(default)]
        notes: String,
    },

    /// Partial progress was reported
    PartialProgress {
        /// Progress value as reported
        progress: f64,
        /// Checkpoint recorded with it
        checkpoint_name: Option<String>,
        /// Notes given
        #[serde(default)]
        notes: String,
    },

    /// An attempt was counted
    Attempt,

    /// A shell command ran to completion
    ShellCommand {
        /// Command line
        command: String,
        /// Exit code (-1 if killed by a signal)
        returncode: i32,
        /// Wall time in seconds
        execution_time: f64,
        /// Whether the success criteria held
        success: bool,
        /// Directory it ran in
        working_dir: String,
    },

    /// A shell command hit its timeout
    ShellTimeout {
        /// Command line
        command: String,
        /// Timeout in seconds
        timeout: u64,
    },

    /// A shell command could not be run
    ShellError {
        /// Command line
        command: String,
        /// Error message
        error: String,
    },

    /// A record this version cannot read, kept as found so saving it back
    /// loses nothing
    #[serde(skip)]
    Other {
        /// The `event_type` tag as found
        event_type: String,
        /// The remaining fields as found
        fields: Map<String, Value>,
    },
}

impl EventKind {
    /// The `event_type` tag.
    pub fn name(&self) -> &str {
        match self {
            EventKind::StepCompleted { .. } => "step_completed",
            EventKind::PartialProgress { .. } => "partial_progress",
            EventKind::Attempt => "attempt",
            EventKind::ShellCommand { .. } => "shell_command",
            EventKind::ShellTimeout { .. } => "shell_timeout",
            EventKind::ShellError { .. } => "shell_error",
            EventKind::Other { event_type, .. } => event_type,
        }
    }

    fn into_fields(self) -> Map<String, Value> {
        match self {
            EventKind::Other {
                event_type,
                mut fields,
            } => {
                fields.insert("event_type".to_string(), Value::String(event_type));
                fields
            }
            known => match serde_json::to_value(known) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
        }
    }

    fn from_fields(mut fields: Map<String, Value>) -> Self {
        if let Ok(kind) = serde_json::from_value(Value::Object(fields.clone())) {
            return kind;
        }
        let event_type = match fields.remove("event_type") {
            Some(Value::String(tag)) => tag,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        EventKind::Other { event_type, fields }
    }
}

impl Event {
    /// The `event_type` tag.
    pub fn event_type(&self) -> &str {
        self.kind.name()
    }

    /// Flat key/value view of the event.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// On-disk shape of an [`Event`]: the common fields plus whatever the kind carries.
#[derive(Serialize, Deserialize)]
struct RawEvent {
    #[serde(with = "crate::time::flexible")]
    timestamp: Time,
    session_id: SessionId,
    student_id: StudentId,
    lab_name: String,
    #[serde(default)]
    step_name: Option<String>,
    #[serde(flatten)]
    kind: Map<String, Value>,
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Event {
            timestamp: raw.timestamp,
            session_id: raw.session_id,
            student_id: raw.student_id,
            lab_name: raw.lab_name,
            step_name: raw.step_name,
            kind: EventKind::from_fields(raw.kind),
        }
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        RawEvent {
            timestamp: event.timestamp,
            session_id: event.session_id,
            student_id: event.student_id,
            lab_name: event.lab_name,
            step_name: event.step_name,
            kind: event.kind.into_fields(),
        }
    }
}
