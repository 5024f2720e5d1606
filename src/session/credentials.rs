//! Credential pair and the session that rotates it

use crate::types::encode_component;
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, SET_COOKIE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

const MST: &str = "mst";
const JST: &str = "jst";

/// Two-token cookie pair identifying a logged-in user.
///
/// # Security
///
/// Token values never appear in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Long-lived master session token
    pub mst: String,
    /// Short-lived rotating token
    pub jst: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(mst: impl Into<String>, jst: impl Into<String>) -> Self {
        Self {
            mst: mst.into(),
            jst: jst.into(),
        }
    }

    /// `Cookie` header value
    pub fn cookie_header(&self) -> String {
        format!(
            "{JST}={}; {MST}={}",
            encode_component(&self.jst),
            encode_component(&self.mst)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mst", &"[REDACTED]")
            .field("jst", &"[REDACTED]")
            .finish()
    }
}

/// Shared, rotating credentials.
///
/// Cheap to clone; clones observe the same tokens. Subscribers are woken
/// whenever a response rotates either token, which is how an external
/// store learns it has something new to persist.
#[derive(Clone)]
pub struct Session {
    tx: Arc<watch::Sender<Credentials>>,
}

impl Session {
    /// Create a session from an existing credential pair
    pub fn new(credentials: Credentials) -> Self {
        let (tx, _rx) = watch::channel(credentials);
        Self { tx: Arc::new(tx) }
    }

    /// Current credentials
    pub fn credentials(&self) -> Credentials {
        self.tx.borrow().clone()
    }

    /// Receive every rotated credential pair
    pub fn subscribe(&self) -> watch::Receiver<Credentials> {
        self.tx.subscribe()
    }

    /// Pick up rotated tokens from `Set-Cookie` headers.
    ///
    /// Returns true when either token changed.
    pub fn apply_headers(&self, headers: &HeaderMap) -> bool {
        let mut mst = None;
        let mut jst = None;

        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            match parse_set_cookie(value) {
                Some((name, token)) if name == MST => mst = Some(token),
                Some((name, token)) if name == JST => jst = Some(token),
                _ => {}
            }
        }

        if mst.is_none() && jst.is_none() {
            return false;
        }

        let rotated = self.tx.send_if_modified(|current| {
            let mut changed = false;
            if let Some(mst) = mst.take() {
                if current.mst != mst {
                    current.mst = mst;
                    changed = true;
                }
            }
            if let Some(jst) = jst.take() {
                if current.jst != jst {
                    current.jst = jst;
                    changed = true;
                }
            }
            changed
        });

        if rotated {
            info!("Session tokens rotated by server");
        } else {
            debug!("Session tokens re-sent unchanged");
        }
        rotated
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &*self.tx.borrow())
            .finish()
    }
}

/// Name and decoded value of the first pair in a `Set-Cookie` header
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = percent_decode_str(value.trim()).decode_utf8_lossy();
    Some((name.to_string(), value.into_owned()))
}
