//! labtrack core data models.
//!
//! Steps, the ordered step registry, analytics events and the collaborator
//! traits shared by the tracker and the validator.

#![warn(missing_docs)]

// Identities and time
mod id;
pub mod time;

// Step state
mod step;
mod registry;
mod metadata;

// Analytics
mod event;

// Collaborators
pub mod display;
mod completion;

// Re-exports
pub use id::{SessionId, StudentId, STUDENT_ID_LEN};
pub use time::Time;

pub use step::{clamp_progress, Checkpoint, StepState, StepStatus};
pub use registry::StepRegistry;
pub use metadata::StepMetadata;

pub use event::{Event, EventKind};

pub use display::{
    DisplaySurface, MemoryDisplay, NullDisplay, ProgressView, ShellNotice, StepView,
    ValidationFeedback,
};
pub use completion::{CompletionError, CompletionTarget};
