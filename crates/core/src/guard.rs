//! Route guard for protected views.
//!
//! Protected views only render for an authenticated session. How a session comes to exist is
//! the caller's business (a bearer token on the REST server, configured credentials in the CLI);
//! the guard only decides whether the session it is handed is usable.

use crate::{GlucoError, GlucoResult};
use chrono::{DateTime, Utc};
use gluco_types::NonEmptyText;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: NonEmptyText,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: NonEmptyText, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub trait RouteGuard: Send + Sync {
    fn authorize(&self, session: Option<&Session>, now: DateTime<Utc>) -> GlucoResult<()>;
}

/// Admits any present, unexpired session.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionGuard;

impl RouteGuard for SessionGuard {
    fn authorize(&self, session: Option<&Session>, now: DateTime<Utc>) -> GlucoResult<()> {
        match session {
            Some(session) if !session.is_expired(now) => Ok(()),
            Some(session) => {
                tracing::info!(user = %session.user, "session expired");
                Err(GlucoError::Unauthorized)
            }
            None => Err(GlucoError::Unauthorized),
        }
    }
}
