//! Diagnostics for the yo compiler.
//!
//! The semantic passes report failures as a single fatal [`Diagnostic`]
//! per translation unit: an error code, a message, and the source span
//! of the offending node. Rendering with source snippets is the host's
//! concern.

mod diagnostic;
mod error_code;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::ErrorCode;
