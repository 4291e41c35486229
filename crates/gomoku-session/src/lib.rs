//! Seat binding for networked rooms.
//!
//! In a local room whoever holds the handle may act for either seat. In a
//! networked room each human seat belongs to one remote identity, and every
//! move arrives tagged with the caller's identity. This crate keeps that
//! mapping honest.
//!
//! ```text
//! Transport (identity) → Session (identity ⇄ seat) → Room (seat acts)
//! ```

mod binding;
mod error;

pub use binding::SeatBinding;
pub use error::BindingError;
