//! Template-argument deduction.

use rustc_hash::FxHashMap;

use yo_ir::{CallExpr, ExprKind, FunctionDecl, Name, Span, TypeDesc, TypeDescKind, TypeId};

use crate::emit::Emitter;
use crate::errors::{SemaError, SemaResult};

use super::Lowering;

/// How a template argument was pinned down. Explicit arguments bind
/// strongest; a type deduced from a non-literal expression overrides one
/// deduced from a literal, because literals can still be coerced to the
/// expression's type afterwards.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Reason {
    Expr,
    Literal,
    Explicit,
}

impl<E: Emitter> Lowering<'_, E> {
    /// Attempt to deduce every template argument of `decl` for a call.
    ///
    /// Returns `None` when the candidate cannot match (arity or
    /// conflicting deductions); fails hard only when arguments were
    /// consistent but left a template parameter undetermined.
    pub(crate) fn deduce_template_args(
        &mut self,
        decl: &FunctionDecl,
        call: &CallExpr,
        arg_offset: usize,
        call_span: Span,
    ) -> SemaResult<Option<FxHashMap<Name, TypeDesc>>> {
        let sig = &decl.sig;
        if sig.params.len() != call.args.len() + arg_offset {
            return Ok(None);
        }

        let mut deductions: FxHashMap<Name, Option<(TypeId, Reason)>> = FxHashMap::default();
        for (i, &param) in sig.template_params.iter().enumerate() {
            if let Some(explicit) = call.template_args.get(i) {
                let ty = self.resolve_type_desc(explicit, true)?;
                deductions.insert(param, Some((ty, Reason::Explicit)));
            } else {
                deductions.insert(param, None);
            }
        }

        for i in arg_offset..sig.params.len() {
            // Walk through pointer indirections to the nominal leaf; the
            // deduced type has the same number of layers stripped from
            // the argument's guessed type.
            let mut indirections = 0usize;
            let mut leaf = &sig.params[i];
            while let TypeDescKind::Pointer(inner) = &leaf.kind {
                indirections += 1;
                leaf = inner;
            }
            let Some(leaf_name) = leaf.nominal_name() else {
                continue;
            };
            if !deductions.contains_key(&leaf_name) {
                continue;
            }

            let arg = &call.args[i - arg_offset];
            let is_literal = matches!(arg.kind, ExprKind::Number(_));
            let reason = if is_literal { Reason::Literal } else { Reason::Expr };

            let mut deduced = self.guess_type(arg)?;
            for _ in 0..indirections {
                match self.types.pointee(deduced) {
                    Some(inner) => deduced = inner,
                    None => return Ok(None),
                }
            }

            match deductions.get(&leaf_name).copied().flatten() {
                None => {
                    deductions.insert(leaf_name, Some((deduced, reason)));
                }
                Some((_, Reason::Literal)) => {
                    deductions.insert(leaf_name, Some((deduced, reason)));
                }
                Some((existing, _)) => {
                    if !is_literal && existing != deduced {
                        return Ok(None);
                    }
                }
            }
        }

        let mut mapping = FxHashMap::default();
        for &param in &sig.template_params {
            match deductions.get(&param).copied().flatten() {
                Some((ty, _)) => {
                    mapping.insert(param, TypeDesc::resolved(ty, Span::DUMMY));
                }
                None => {
                    return Err(SemaError::TemplateDeductionFailure {
                        name: self.names.lookup(decl.name).to_owned(),
                        param: self.names.lookup(param).to_owned(),
                        span: call_span,
                    });
                }
            }
        }
        Ok(Some(mapping))
    }
}
