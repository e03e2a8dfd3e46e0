//! Request cancellation.
//!
//! Requests can be cancelled through two independent sources:
//!
//! - a [`CancelToken`], created together with its [`Canceller`] by
//!   [`CancelToken::source`] or [`CancelToken::new`];
//! - an [`AbortSignal`], owned by an [`AbortController`].
//!
//! Both settle at most once and notify each listener exactly once; a listener
//! added after settling runs immediately. While a request is in flight the
//! dispatcher joins its sources with a [`CancellationController`].

mod controller;
mod once;
mod signal;
mod token;

pub use controller::CancellationController;
pub use once::ListenerId;
pub use signal::{AbortController, AbortSignal};
pub use token::{CancelSource, CancelToken, Canceller};

use crate::config::RequestConfig;
use crate::error::{DispatchError, Result};

/// Fail if either cancellation source of `config` has already fired.
///
/// A cancelled token fails with its own reason. An aborted signal fails with
/// the reason it was aborted with, or a fresh
/// [`Canceled`](crate::ErrorKind::Canceled) error when it has none.
pub fn throw_if_cancellation_requested(config: &RequestConfig) -> Result<()> {
    if let Some(token) = &config.cancel_token {
        token.throw_if_requested()?;
    }
    if let Some(signal) = &config.signal
        && signal.aborted()
    {
        return Err(signal.reason().unwrap_or_else(|| DispatchError::canceled(None)));
    }
    Ok(())
}
