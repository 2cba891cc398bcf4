//! Per-page state controllers.
//!
//! Each page holds the last fetched lists, a loading status, an error banner
//! and whatever is being edited. Remote results are merged into local state
//! only after the store confirms them; a failure leaves the lists as they
//! were and sets the banner.

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod task_form;

use crate::core::session::SessionProvider;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageStatus {
    #[default]
    Loading,
    Ready,
}

/// A destructive action waiting for the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation<T> {
    pub target: T,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

/// The signed-in user's id, or [`Error::NotSignedIn`].
pub fn scoping_key(sessions: &dyn SessionProvider) -> Result<String, Error> {
    sessions.user_id().ok_or(Error::NotSignedIn)
}
