//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod capabilities;

pub use capabilities::*;
