use crate::domain::value_objects::OutputState;

/// Port for the presentation layer, notified after every state change
pub trait StateObserver: Send + Sync {
    fn on_state_changed(&self, service: &str, state: OutputState);
}
