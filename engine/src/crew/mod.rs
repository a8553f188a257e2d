//! Crew System
//!
//! Declarative task lists, back-reference resolution and the sequential
//! engine that ties named tools into data-dependent runs.

pub mod engine;
pub mod loader;
pub mod progress;
pub mod reference;
pub mod spec;
pub mod store;

pub use engine::{Crew, CrewRunError, RunState, UnknownToolPolicy};
pub use loader::DocumentFormat;
pub use progress::{JsonLinesSink, ProgressEvent, ProgressSink, RecordingSink, TracingSink};
pub use reference::{resolve_input, Reference, UNKNOWN};
pub use spec::{AgentSpec, CrewConfiguration, TaskSpec};
pub use store::OutputStore;
