//! Single-shot deferred values that can be chained, combined and cancelled.
//!
//! A [`Deferred`] does not run anything by itself. Whoever produces the value (a thread, a timer,
//! an event loop) settles it through [`Deferred::resolve`], [`Deferred::reject`] or [`Deferred::cancel`],
//! and every registered handler runs right there.

mod chain;
mod deferred;
mod error;
mod when;

pub use deferred::{Deferred, Outcome, Resolver, Status};
pub use error::NotResolved;
pub use when::{when2, when3, when4, when_all, when_void};
