//! Session domain: conversation messages and the per-session aggregate.

pub mod entities;

pub use entities::{Message, Role, SessionState};
