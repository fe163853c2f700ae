//! Types kept in the visitor session.

pub mod session;

pub use session::{Flash, FlashKind, keys as session_keys};
