//! Bounded waits
//!
//! Some lookups must never hold the caller hostage (boot, identity checks).
//! [`bounded`] races a future against a deadline and hands back either its
//! output or the caller-supplied fallback; the timeout is a value, not an
//! error.

use std::future::Future;
use std::time::Duration;

/// Outcome of a bounded wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Waited<T> {
    /// The operation finished in time
    Ready(T),
    /// The deadline passed; this is the fallback value
    Fallback(T),
}

impl<T> Waited<T> {
    pub fn into_inner(self) -> T {
        match self {
            Waited::Ready(value) | Waited::Fallback(value) => value,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Waited::Fallback(_))
    }
}

/// Wait at most `max` for `operation`, otherwise return `fallback`
///
/// The operation is dropped when the deadline passes.
pub async fn bounded<F, T>(operation: F, max: Duration, fallback: T) -> Waited<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(max, operation).await {
        Ok(value) => Waited::Ready(value),
        Err(_) => Waited::Fallback(fallback),
    }
}
