//! Declaration attributes.
//!
//! Attributes are recognized by the parser and attached to declarations;
//! the semantic passes consult them during registration and lowering.

use std::fmt;

/// Declared side effect of a function.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SideEffect {
    None,
    Io,
    Unknown,
}

/// Attributes recognized on function declarations.
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionAttributes {
    /// Expose the plain name as the linkage symbol.
    pub no_mangle: bool,
    /// Explicit linkage symbol, verbatim. Mutually exclusive with
    /// `no_mangle`.
    pub mangled_name: Option<String>,
    /// Resolved internally instead of linking an external symbol. The
    /// body must be empty.
    pub intrinsic: bool,
    pub inline: bool,
    pub always_inline: bool,
    /// Declared elsewhere; implies `no_mangle` during registration.
    pub extern_: bool,
    /// Run before `main` via the global constructor array.
    pub startup: bool,
    /// Run after `main` via the global destructor array.
    pub shutdown: bool,
    /// Side effects the function may perform.
    pub side_effects: Vec<SideEffect>,
}

impl Default for FunctionAttributes {
    fn default() -> Self {
        FunctionAttributes {
            no_mangle: false,
            mangled_name: None,
            intrinsic: false,
            inline: false,
            always_inline: false,
            extern_: false,
            startup: false,
            shutdown: false,
            side_effects: vec![SideEffect::Unknown],
        }
    }
}

impl FunctionAttributes {
    /// Check attribute combinations that cannot be expressed together.
    pub fn validate(&self) -> Result<(), AttributeError> {
        if self.no_mangle && self.mangled_name.is_some() {
            return Err(AttributeError::MangleConflict);
        }
        Ok(())
    }

    /// Whether the caller's declared side effects admit calling a
    /// function with `callee` effects. A caller with `unknown` effects
    /// may call anything.
    pub fn may_call(&self, callee: &FunctionAttributes) -> bool {
        if self.side_effects.contains(&SideEffect::Unknown) {
            return true;
        }
        callee
            .side_effects
            .iter()
            .all(|effect| self.side_effects.contains(effect))
    }
}

/// Attributes recognized on struct declarations.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct StructAttributes {
    /// Suppress synthesis of the implicit `init` static method.
    pub no_init: bool,
}

/// Invalid attribute combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// `mangle` and `no_mangle` on the same declaration.
    MangleConflict,
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::MangleConflict => {
                write!(f, "'mangle' and 'no_mangle' are mutually exclusive")
            }
        }
    }
}

impl std::error::Error for AttributeError {}
