//! Core engine — the load → analyze → filter → record → persist cycle.

pub mod cycle;
pub mod events;

pub use cycle::{CycleOutcome, CycleReport, CycleRunner};
pub use events::{CycleEvent, EventRecord, SkipCause};
