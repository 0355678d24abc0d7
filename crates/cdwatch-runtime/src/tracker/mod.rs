//! Commit tracker implementations.
//!
//! Two mutually substitutable ways of learning a target's latest change
//! identifier: pulling the repository directly, or asking a Gotify server
//! that publishers push commit notifications to.

mod gotify;
mod pull;

pub use gotify::GotifyTracker;
pub use pull::PullTracker;
