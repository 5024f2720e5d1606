//! Session module
//!
//! Rotating credential tokens and the bridge that feeds every transport
//! response back into session and rate state.
//!
//! Obtaining the initial token pair is the caller's business; this module
//! only keeps it fresh once traffic starts flowing.

mod bridge;
mod credentials;

pub use bridge::SessionBridge;
pub use credentials::{Credentials, Session};

#[cfg(test)]
mod tests;
