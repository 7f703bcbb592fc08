//! Query classification domain
//!
//! Maps raw message text to a [`QueryClassification`]. The fast path
//! ([`quick_classify`]) is a pure table lookup; the structured-output
//! helpers in [`parsing`] back the LLM fallback run by the application layer.

pub mod entities;
pub mod parsing;
pub mod patterns;

pub use entities::{
    ClassificationContext, Complexity, QueryCategory, QueryClassification, QueryType,
};
pub use parsing::{
    classification_instructions, classification_schema, parse_classification_response,
};
pub use patterns::{estimate_complexity, quick_classify};
