//! Value propagation.
//!
//! Setting an output pushes its value through every connection it feeds.
//! Receiving inputs re-run their node's evaluator, whose output writes
//! continue the cascade. Everything happens synchronously inside the call
//! that caused the change.

pub mod channel;
pub mod events;
mod cascade;

pub use channel::{PropagationChannel, Subscription};
pub use events::{EventCallback, PropagationEvent, PropagationReport};
