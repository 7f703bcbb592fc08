//! Identifier generation.
//!
//! Confirmation ids are short because users type them back
//! (`approve 3f9a1c2e`); trace ids use the full UUID form.

use uuid::Uuid;

/// Generate a random (v4) UUID string.
pub fn uuid_v4() -> String {
    Uuid::new_v4().to_string()
}

/// Generate an 8-hex-digit identifier suitable for typing in chat.
pub fn short_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..8].to_string()
}
