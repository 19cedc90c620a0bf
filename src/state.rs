//! Interaction lifecycle state machine
//!
//! Owns the current lifecycle state, enforces the transition table,
//! keeps a bounded history of accepted transitions and notifies
//! subscribers on every state change. Rejected transitions are logged
//! and leave the state untouched.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

/// The six lifecycle states of the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// Passive, nothing running
    Idle,
    /// Passive wake-phrase channel is listening
    ListeningWake,
    /// Activated, waiting to capture a command
    Awake,
    /// Command capture in progress
    Listening,
    /// Command sent to the backend, awaiting the response
    Processing,
    /// A recognition or backend failure occurred
    Error,
}

impl InteractionState {
    /// States reachable directly from `self`.
    pub fn allowed(self) -> &'static [InteractionState] {
        use InteractionState::*;
        match self {
            Idle => &[ListeningWake, Awake],
            ListeningWake => &[Awake, Idle],
            Awake => &[Listening, Idle],
            Listening => &[Processing, Awake, Error],
            Processing => &[Awake, Idle, Error],
            Error => &[Idle, Awake],
        }
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionState::Idle => "idle",
            InteractionState::ListeningWake => "listening_wake",
            InteractionState::Awake => "awake",
            InteractionState::Listening => "listening",
            InteractionState::Processing => "processing",
            InteractionState::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// One accepted transition, oldest evicted first once the history
/// holds [`HISTORY_LIMIT`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    pub from: InteractionState,
    pub to: InteractionState,
    pub timestamp: DateTime<Utc>,
}

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        from: InteractionState,
        to: InteractionState,
    },
}

/// Identifier returned by [`StateMachine::subscribe`]; removing it
/// removes exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(InteractionState, InteractionState) + Send>;

pub struct StateMachine {
    current: InteractionState,
    history: VecDeque<TransitionRecord>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: InteractionState::Idle,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn current(&self) -> InteractionState {
        self.current
    }

    pub fn can_transition(&self, to: InteractionState) -> bool {
        self.current.allowed().contains(&to)
    }

    /// Move to `to` if the transition table allows it.
    ///
    /// On success the transition is recorded and every listener is
    /// invoked synchronously with `(from, to)`. A panicking listener is
    /// caught and logged; it neither stops the remaining listeners nor
    /// rolls back the already-committed transition.
    pub fn transition(&mut self, to: InteractionState) -> Result<(), StateError> {
        let from = self.current;
        if !self.can_transition(to) {
            warn!(%from, %to, "transition rejected");
            return Err(StateError::IllegalTransition { from, to });
        }

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(TransitionRecord {
            from,
            to,
            timestamp: Utc::now(),
        });
        self.current = to;
        info!(%from, %to, "state transition");

        for (id, listener) in &mut self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(from, to))).is_err() {
                warn!(id = id.0, "state listener panicked");
            }
        }
        Ok(())
    }

    /// Register a listener called on every accepted transition.
    /// Registering the same closure twice yields two invocations.
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(InteractionState, InteractionState) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(other, _)| *other != id);
    }

    /// Administrative override: force Idle and drop the history.
    /// Bypasses the transition table and does not notify listeners.
    pub fn reset(&mut self) {
        self.current = InteractionState::Idle;
        self.history.clear();
        info!("state machine reset to idle");
    }

    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.history.iter()
    }

    /// Actively engaged with the user.
    pub fn is_awake(&self) -> bool {
        matches!(
            self.current,
            InteractionState::Awake | InteractionState::Listening | InteractionState::Processing
        )
    }

    /// A recognition session (wake or command) is capturing audio.
    pub fn is_listening(&self) -> bool {
        matches!(
            self.current,
            InteractionState::Listening | InteractionState::ListeningWake
        )
    }

    pub fn is_processing(&self) -> bool {
        self.current == InteractionState::Processing
    }

    pub fn is_error(&self) -> bool {
        self.current == InteractionState::Error
    }
}
