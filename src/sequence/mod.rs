//! Sequence engine
//!
//! Correlates per-subject domain events into multi-step behavioral
//! sequences with timing windows.
//!
//! - [`process`]: conditions, the `Process` context and verdicts
//! - [`action`]: blueprint steps and periodic re-check schedules
//! - [`blueprint`]: immutable sequence definitions
//! - [`instance`]: live sequence state machine
//! - [`result`]: outcome of a completed sequence
//! - [`bypass`]: reference-counted observer suppression
//! - [`engine`]: blueprint registry and event routing

pub mod action;
pub mod blueprint;
pub mod bypass;
pub mod engine;
pub mod instance;
pub mod process;
pub mod result;

pub use action::{Action, Repeat, ScheduleState};
pub use blueprint::{BlueprintBuilder, BlueprintKey, Gate, SequenceBlueprint};
pub use bypass::{BypassRegistry, BypassTicket, TicketId};
pub use engine::{Completion, SequenceEngine};
pub use instance::{FailReason, Sequence, SequenceState, Step};
pub use process::{Condition, Process, ProcessResult, Verdict, condition};
pub use result::{SequencePoint, SequenceResult};
