use crate::domain::ports::StateObserver;
use crate::domain::value_objects::OutputState;

/// Default presentation stand-in: logs every state change with the style
/// class a UI would apply
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl StateObserver for LoggingObserver {
    fn on_state_changed(&self, service: &str, state: OutputState) {
        match state {
            OutputState::Error => {
                tracing::warn!(service, style = state.style_class(), "{} is {}", service, state)
            }
            _ => tracing::info!(service, style = state.style_class(), "{} is {}", service, state),
        }
    }
}
