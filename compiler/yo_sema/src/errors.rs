//! Semantic errors.
//!
//! Every error is fatal to the current translation unit: the driver
//! produces one diagnostic and stops. Variants carry display-ready
//! strings so that `Display` works without an interner in hand.

use std::fmt;

use yo_diagnostic::{Diagnostic, ErrorCode};
use yo_ir::Span;

/// Result alias for the semantic passes.
pub type SemaResult<T> = Result<T, SemaError>;

/// A fatal semantic error.
#[derive(Debug, Clone, PartialEq)]
pub enum SemaError {
    UnknownType {
        name: String,
        span: Span,
    },
    UnknownIdentifier {
        name: String,
        span: Span,
    },
    UnknownIntrinsic {
        name: String,
        span: Span,
    },
    Redefinition {
        name: String,
        span: Span,
    },
    IncompatibleRedeclaration {
        name: String,
        span: Span,
    },
    UnresolvedCall {
        span: Span,
    },
    AmbiguousCall {
        name: String,
        candidates: Vec<String>,
        span: Span,
    },
    NoViableOverload {
        name: String,
        span: Span,
    },
    TemplateDeductionFailure {
        name: String,
        param: String,
        span: Span,
    },
    TypeMismatch {
        expected: String,
        found: String,
        context: &'static str,
        span: Span,
    },
    InvalidCast {
        from: String,
        to: String,
        span: Span,
    },
    InvalidOperator {
        op: String,
        operand: String,
        span: Span,
    },
    InvalidMatchPattern {
        message: String,
        span: Span,
    },
    NoInitialValue {
        name: String,
        span: Span,
    },
    /// Attribute combination the declaration cannot carry.
    InvalidAttribute {
        message: String,
        span: Span,
    },
    /// Caller's declared side effects do not admit the callee.
    IncompatibleSideEffects {
        callee: String,
        span: Span,
    },
    /// A `use` directive named a module the loader cannot provide.
    ModuleNotFound {
        module: String,
        span: Span,
    },
    Unimplemented {
        what: &'static str,
        span: Span,
    },
}

impl SemaError {
    /// Location of the offending node.
    pub fn span(&self) -> Span {
        match self {
            SemaError::UnknownType { span, .. }
            | SemaError::UnknownIdentifier { span, .. }
            | SemaError::UnknownIntrinsic { span, .. }
            | SemaError::Redefinition { span, .. }
            | SemaError::IncompatibleRedeclaration { span, .. }
            | SemaError::UnresolvedCall { span }
            | SemaError::AmbiguousCall { span, .. }
            | SemaError::NoViableOverload { span, .. }
            | SemaError::TemplateDeductionFailure { span, .. }
            | SemaError::TypeMismatch { span, .. }
            | SemaError::InvalidCast { span, .. }
            | SemaError::InvalidOperator { span, .. }
            | SemaError::InvalidMatchPattern { span, .. }
            | SemaError::NoInitialValue { span, .. }
            | SemaError::InvalidAttribute { span, .. }
            | SemaError::IncompatibleSideEffects { span, .. }
            | SemaError::ModuleNotFound { span, .. }
            | SemaError::Unimplemented { span, .. } => *span,
        }
    }

    /// The stable code for this error kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            SemaError::UnknownType { .. } => ErrorCode::UNKNOWN_TYPE,
            SemaError::UnknownIdentifier { .. } => ErrorCode::UNKNOWN_IDENTIFIER,
            SemaError::UnknownIntrinsic { .. } => ErrorCode::UNKNOWN_INTRINSIC,
            SemaError::Redefinition { .. } => ErrorCode::REDEFINITION,
            SemaError::IncompatibleRedeclaration { .. } => ErrorCode::INCOMPATIBLE_REDECLARATION,
            SemaError::UnresolvedCall { .. } => ErrorCode::UNRESOLVED_CALL,
            SemaError::AmbiguousCall { .. } => ErrorCode::AMBIGUOUS_CALL,
            SemaError::NoViableOverload { .. } => ErrorCode::NO_VIABLE_OVERLOAD,
            SemaError::TemplateDeductionFailure { .. } => ErrorCode::TEMPLATE_DEDUCTION_FAILURE,
            SemaError::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            SemaError::InvalidCast { .. } => ErrorCode::INVALID_CAST,
            SemaError::InvalidOperator { .. } => ErrorCode::INVALID_OPERATOR,
            SemaError::InvalidMatchPattern { .. } => ErrorCode::INVALID_MATCH_PATTERN,
            SemaError::NoInitialValue { .. } => ErrorCode::NO_INITIAL_VALUE,
            SemaError::InvalidAttribute { .. } => ErrorCode::INCOMPATIBLE_REDECLARATION,
            SemaError::IncompatibleSideEffects { .. } => ErrorCode::TYPE_MISMATCH,
            SemaError::ModuleNotFound { .. } => ErrorCode::UNKNOWN_IDENTIFIER,
            SemaError::Unimplemented { .. } => ErrorCode::UNIMPLEMENTED,
        }
    }

    /// Convert into a host-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.code(), self.to_string(), self.span());
        if let SemaError::AmbiguousCall { candidates, .. } = self {
            for candidate in candidates {
                diag = diag.with_note(format!("candidate: {}", candidate));
            }
        }
        diag
    }
}

impl fmt::Display for SemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemaError::UnknownType { name, .. } => {
                write!(f, "unable to resolve nominal type '{}'", name)
            }
            SemaError::UnknownIdentifier { name, .. } => {
                write!(f, "unable to resolve identifier '{}'", name)
            }
            SemaError::UnknownIntrinsic { name, .. } => {
                write!(f, "unhandled call to intrinsic '{}'", name)
            }
            SemaError::Redefinition { name, .. } => write!(f, "redefinition of '{}'", name),
            SemaError::IncompatibleRedeclaration { name, .. } => {
                write!(f, "redeclaration of '{}' with incompatible signature", name)
            }
            SemaError::UnresolvedCall { .. } => write!(f, "unable to resolve call target"),
            SemaError::AmbiguousCall { name, .. } => {
                write!(f, "ambiguous call to '{}'", name)
            }
            SemaError::NoViableOverload { name, .. } => {
                write!(f, "no viable overload for call to '{}'", name)
            }
            SemaError::TemplateDeductionFailure { name, param, .. } => {
                write!(
                    f,
                    "unable to deduce template argument '{}' in call to '{}'",
                    param, name
                )
            }
            SemaError::TypeMismatch {
                expected,
                found,
                context,
                ..
            } => write!(
                f,
                "incompatible type in {}: expected '{}', got '{}'",
                context, expected, found
            ),
            SemaError::InvalidCast { from, to, .. } => {
                write!(f, "no known conversion from '{}' to '{}'", from, to)
            }
            SemaError::InvalidOperator { op, operand, .. } => {
                write!(f, "operator '{}' cannot be applied to '{}'", op, operand)
            }
            SemaError::InvalidMatchPattern { message, .. } => {
                write!(f, "invalid match pattern: {}", message)
            }
            SemaError::NoInitialValue { name, .. } => {
                write!(
                    f,
                    "variable '{}' has neither a type annotation nor an initial value",
                    name
                )
            }
            SemaError::InvalidAttribute { message, .. } => write!(f, "{}", message),
            SemaError::IncompatibleSideEffects { callee, .. } => {
                write!(
                    f,
                    "cannot call '{}': callee side effects exceed the caller's declaration",
                    callee
                )
            }
            SemaError::ModuleNotFound { module, .. } => {
                write!(f, "unable to load module '{}'", module)
            }
            SemaError::Unimplemented { what, .. } => write!(f, "{} are not implemented", what),
        }
    }
}

impl std::error::Error for SemaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SemaError::UnknownType {
            name: "Foo".to_owned(),
            span: Span::new(1, 4),
        };
        assert_eq!(err.to_string(), "unable to resolve nominal type 'Foo'");
        assert_eq!(err.code(), ErrorCode::UNKNOWN_TYPE);
    }

    #[test]
    fn test_ambiguous_call_notes() {
        let err = SemaError::AmbiguousCall {
            name: "f".to_owned(),
            candidates: vec!["f(i32) -> void".to_owned(), "f(u32) -> void".to_owned()],
            span: Span::DUMMY,
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.notes.len(), 2);
    }
}
