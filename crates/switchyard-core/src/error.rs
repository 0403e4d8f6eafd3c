// SPDX-License-Identifier: Apache-2.0
//! Command-level error taxonomy.

use switchyard_store::StoreError;

/// Why a command was rejected.
///
/// Every variant except [`CommandError::Store`] is a recoverable domain
/// failure: the dispatcher answers `-1` and state is unchanged. A `Store`
/// error means the backing files failed or are corrupt, which is fatal at
/// the process level.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The acting user has no open session.
    #[error("not logged in")]
    NotLoggedIn,
    /// The user already has an open session.
    #[error("already logged in")]
    AlreadyLoggedIn,
    /// Unknown user or wrong password.
    #[error("invalid credentials")]
    BadCredentials,
    /// The caller's privilege does not permit the operation.
    #[error("permission denied")]
    PermissionDenied,
    /// A unique key already exists.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
    /// The referenced entity does not exist.
    #[error("no such {0}")]
    NotFound(&'static str),
    /// A field value failed validation.
    #[error("invalid {0}")]
    InvalidField(&'static str),
    /// The train was already released.
    #[error("train already released")]
    AlreadyReleased,
    /// The train has not been released yet.
    #[error("train not released")]
    NotReleased,
    /// The order was already refunded.
    #[error("order already refunded")]
    AlreadyRefunded,
    /// Not enough seats remain and queueing was not requested.
    #[error("not enough seats")]
    SoldOut,
    /// The requested stops do not form a forward journey on this train.
    #[error("invalid route")]
    BadRoute,
    /// The date falls outside the train's operating window.
    #[error("date outside operating window")]
    OutsideWindow,
    /// The storage layer failed; the process cannot continue safely.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    /// True for failures that must terminate the process rather than
    /// produce a `-1` response.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
