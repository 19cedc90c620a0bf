//! Voice-driven command front-end for an inventory system
//!
//! Listens for a spoken wake phrase, drives the interaction lifecycle
//! through a validated state machine, forwards recognized utterances to
//! the backend intent classifier and runs the confirmation/execution
//! flow for inventory movements. Speech-to-text, the classifier and the
//! visual surface are external collaborators behind traits.

pub mod backend;
pub mod config;
pub mod engine;
pub mod fuzzy;
pub mod intent;
pub mod pipeline;
pub mod render;
pub mod sched;
pub mod state;
pub mod wake;
