//! Response feedback into session and rate state

use super::credentials::Session;
use crate::http::RateGovernor;
use reqwest::header::HeaderMap;

/// Hands every response's headers to the session and the rate governor.
///
/// Token rotation and limit tightening are picked up from live traffic, so
/// neither needs its own polling loop.
#[derive(Debug, Clone)]
pub struct SessionBridge {
    session: Session,
    governor: RateGovernor,
}

impl SessionBridge {
    /// Create a bridge over a session and a governor
    pub fn new(session: Session, governor: RateGovernor) -> Self {
        Self { session, governor }
    }

    /// Session fed by this bridge
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Governor fed by this bridge
    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Propagate response headers; returns true when tokens rotated
    pub fn observe(&self, headers: &HeaderMap) -> bool {
        self.governor.observe(headers);
        self.session.apply_headers(headers)
    }
}
