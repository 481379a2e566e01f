//! Default classification of transient failures.

use std::io;

use crate::errors::{ContainerError, ServiceError};

/// HTTP statuses worth retrying: bad gateway, unavailable, gateway timeout.
pub const RETRYABLE_HTTP_STATUSES: [u16; 3] = [502, 503, 504];

/// Returns true if `status` is one of [`RETRYABLE_HTTP_STATUSES`].
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_HTTP_STATUSES.contains(&status)
}

/// Errors that know whether retrying them could help.
///
/// This is the default retryable predicate used by
/// [`RetryPolicy::call`](super::RetryPolicy::call).
pub trait TransientError {
    /// Returns true for network-level failures and gateway errors.
    fn is_transient(&self) -> bool;
}

impl TransientError for ServiceError {
    fn is_transient(&self) -> bool {
        match self {
            // Every connection-level kind is transient.
            Self::Connection { .. } => true,
            Self::Http { status, .. } => is_retryable_status(*status),
            Self::Other { .. } => false,
        }
    }
}

impl TransientError for io::Error {
    fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::TimedOut
        )
    }
}

impl TransientError for ContainerError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Looks through the whole cause chain for a transient failure.
impl TransientError for anyhow::Error {
    fn is_transient(&self) -> bool {
        self.chain().any(|cause| {
            cause
                .downcast_ref::<ServiceError>()
                .is_some_and(TransientError::is_transient)
                || cause
                    .downcast_ref::<io::Error>()
                    .is_some_and(TransientError::is_transient)
                || cause
                    .downcast_ref::<ContainerError>()
                    .is_some_and(TransientError::is_transient)
        })
    }
}

#[cfg(feature = "http")]
impl TransientError for reqwest::Error {
    fn is_transient(&self) -> bool {
        self.is_connect()
            || self.is_timeout()
            || self
                .status()
                .is_some_and(|status| is_retryable_status(status.as_u16()))
    }
}

/// The default retryable predicate as a free function.
pub fn default_retry_predicate<E: TransientError + ?Sized>(err: &E) -> bool {
    err.is_transient()
}
