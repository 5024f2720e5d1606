//! Cursor module
//!
//! Extended-timestamp pagination keys.
//!
//! # Overview
//!
//! The server pages time-ordered result sets with keys of the form
//! `2020-06-01T00:00:00.000Z#17`: an RFC 3339 instant followed by a
//! sequence suffix that orders entries sharing the same instant. The
//! engine only needs three things from a key: parse it, order it, and
//! write it back out.

mod extended;

pub use extended::Cursor;
