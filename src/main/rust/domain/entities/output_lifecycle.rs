use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::domain::value_objects::{stop_code, OutputState, TransportSignal};

/// Number of transitions kept for inspection
const HISTORY_LIMIT: usize = 128;

/// Everything that can move an output between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Configuration (re)loaded from the store
    ConfigLoaded { valid: bool },
    /// User saved a configuration change
    ConfigSaved { valid: bool },
    /// Start requested but the configuration failed validation
    StartRejected,
    /// Transport handle or encoders could not be set up, or start was refused
    HandleFailed,
    /// Handle set up and the start command issued
    StartIssued,
    /// User asked to stop
    StopRequested,
    /// Signal raised by the transport
    Signal(TransportSignal),
}

/// State transition record
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: OutputState,
    pub to: OutputState,
    pub event: LifecycleEvent,
    pub timestamp: Instant,
    pub reason: Option<String>,
}

/// Target state for `event` when in `current`.
///
/// `None` means the event does not apply in this state (for example a late
/// signal after the user stopped the output) and must be ignored.
pub fn next_state(current: OutputState, event: LifecycleEvent) -> Option<OutputState> {
    use OutputState::*;

    match event {
        LifecycleEvent::ConfigLoaded { valid } => Some(if valid { Offline } else { Unused }),
        LifecycleEvent::ConfigSaved { valid } => {
            // A running stream keeps its state; the change applies on next start
            if current.is_active() {
                None
            } else {
                Some(if valid { Offline } else { Unused })
            }
        }
        LifecycleEvent::StartRejected => {
            if current.is_active() {
                None
            } else {
                Some(Error)
            }
        }
        // The handle may refuse the start command after Connecting was entered
        LifecycleEvent::HandleFailed => match current {
            Online => None,
            _ => Some(Error),
        },
        LifecycleEvent::StartIssued => {
            if current.is_active() {
                None
            } else {
                Some(Connecting)
            }
        }
        LifecycleEvent::StopRequested => Some(Offline),
        LifecycleEvent::Signal(signal) => {
            if !current.is_active() {
                return None;
            }
            match signal {
                TransportSignal::Started | TransportSignal::ReconnectSuccess => Some(Online),
                TransportSignal::Reconnecting => Some(Connecting),
                TransportSignal::Stopped { code } if code == stop_code::SUCCESS => Some(Offline),
                TransportSignal::Stopped { .. } => Some(Error),
            }
        }
    }
}

/// Domain entity tracking one output's lifecycle
#[derive(Debug)]
pub struct OutputLifecycle {
    current_state: OutputState,
    history: VecDeque<StateTransition>,
    transition_count: usize,
    online_since: Option<Instant>,
}

impl OutputLifecycle {
    pub fn new() -> Self {
        Self {
            current_state: OutputState::Unused,
            history: VecDeque::new(),
            transition_count: 0,
            online_since: None,
        }
    }

    pub fn current_state(&self) -> OutputState {
        self.current_state
    }

    /// Time since the current stream first went online
    pub fn uptime(&self) -> Option<Duration> {
        self.online_since.map(|start| start.elapsed())
    }

    pub fn transition_count(&self) -> usize {
        self.transition_count
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.history.back()
    }

    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.history.iter()
    }

    /// Apply an event. Returns the transition when the state changed;
    /// events that do not apply, or that target the current state, are no-ops.
    pub fn apply(&mut self, event: LifecycleEvent, reason: Option<String>) -> Option<StateTransition> {
        let target = next_state(self.current_state, event)?;
        if target == self.current_state {
            return None;
        }
        Some(self.record_transition(target, event, reason))
    }

    fn record_transition(
        &mut self,
        new_state: OutputState,
        event: LifecycleEvent,
        reason: Option<String>,
    ) -> StateTransition {
        let transition = StateTransition {
            from: self.current_state,
            to: new_state,
            event,
            timestamp: Instant::now(),
            reason,
        };

        match new_state {
            OutputState::Online => {
                if self.online_since.is_none() {
                    self.online_since = Some(Instant::now());
                }
            }
            OutputState::Connecting => {}
            _ => self.online_since = None,
        }

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(transition.clone());
        self.transition_count += 1;
        self.current_state = new_state;
        transition
    }
}

impl Default for OutputLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
