mod config_store;
mod output_lifecycle;

pub use config_store::{ConfigStore, LoadOutcome, Section};
pub use output_lifecycle::{next_state, LifecycleEvent, OutputLifecycle, StateTransition};
