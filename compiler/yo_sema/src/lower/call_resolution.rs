//! Call resolution: target classification, overload scoring, and
//! on-demand template instantiation.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use yo_ir::{
    CallExpr, ExprKind, FunctionDecl, FunctionKind, FunctionSignature, Name, Span, TypeDesc,
};

use crate::emit::{Emitter, FuncToken, Linkage};
use crate::errors::{SemaError, SemaResult};
use crate::mangle;
use crate::registry::ResolvedCallable;
use crate::specialize::TemplateSpecializer;

use super::Lowering;

/// Where the callable's value comes from at the call site.
#[derive(Copy, Clone, Debug)]
pub(crate) enum CalleeSource {
    /// A declared function symbol.
    Func(FuncToken),
    /// The call target expression itself evaluates to the callee (a
    /// function-typed variable or a function-typed struct field).
    TargetValue,
    /// Resolution ran in speculative mode, or the target is an
    /// intrinsic; nothing was emitted.
    NotEmitted,
}

/// A resolved call target.
pub(crate) struct CallTarget {
    /// Signature to type-check arguments against. Parameter descriptors
    /// resolve in the caller's environment.
    pub sig: FunctionSignature,
    pub decl: Option<Rc<FunctionDecl>>,
    pub callee: CalleeSource,
    pub arg_offset: u8,
}

struct CandidateMatch {
    score: u32,
    callable: ResolvedCallable,
    mapping: FxHashMap<Name, TypeDesc>,
}

impl<E: Emitter> Lowering<'_, E> {
    /// Resolve the target of a call expression.
    ///
    /// With `omit_codegen` set, resolution is purely speculative: no
    /// value is emitted and template instantiation stays structural.
    /// The elaborator uses that mode when only the return type matters.
    pub(crate) fn resolve_call(
        &mut self,
        call: &CallExpr,
        span: Span,
        omit_codegen: bool,
    ) -> SemaResult<CallTarget> {
        let (canonical, arg_offset) = match &call.target.kind {
            ExprKind::Ident(name) => {
                // A local variable of function type shadows any
                // registered overloads.
                if let Some(var) = self.scope.get(*name).copied() {
                    return self.target_from_value_of(var.ty, span);
                }
                let text = self.names.lookup(*name);
                let global = mangle::canonical_name(FunctionKind::Global, None, text);
                if self.registry.has_overloads(&global) {
                    (global, 0u8)
                } else {
                    let operator = mangle::canonical_operator(text);
                    if self.registry.has_overloads(&operator) {
                        (operator, 0)
                    } else {
                        return Err(SemaError::UnresolvedCall { span });
                    }
                }
            }
            ExprKind::StaticDeclRef { type_name, member } => {
                let canonical = mangle::canonical_name(
                    FunctionKind::StaticMethod,
                    Some(self.names.lookup(*type_name)),
                    self.names.lookup(*member),
                );
                (canonical, 0)
            }
            ExprKind::Member { target, member } => {
                let target_ty = self.guess_type(target)?;
                let pointee = self
                    .types
                    .pointee(target_ty)
                    .filter(|&inner| self.types.is_struct(inner))
                    .ok_or(SemaError::UnresolvedCall { span })?;

                if let Some((_, field_ty)) = self.types.struct_field(pointee, *member) {
                    // A struct field that happens to hold a function.
                    return self.target_from_value_of(field_ty, span);
                }
                let struct_name = self
                    .types
                    .struct_name(pointee)
                    .ok_or(SemaError::UnresolvedCall { span })?;
                let canonical = mangle::canonical_name(
                    FunctionKind::InstanceMethod,
                    Some(self.names.lookup(struct_name)),
                    self.names.lookup(*member),
                );
                (canonical, 1)
            }
            _ => return Err(SemaError::UnresolvedCall { span }),
        };

        self.resolve_overloads(&canonical, call, span, arg_offset, omit_codegen)
    }

    /// Build a call target from a function-typed value.
    fn target_from_value_of(&mut self, ty: yo_ir::TypeId, span: Span) -> SemaResult<CallTarget> {
        let Some((ret, params, conv)) = self.types.function_parts(ty) else {
            return Err(SemaError::TypeMismatch {
                expected: "a function type".to_owned(),
                found: self.display_type(ty),
                context: "call target",
                span,
            });
        };
        let sig = FunctionSignature {
            params: params
                .into_iter()
                .map(|param| TypeDesc::resolved(param, span))
                .collect(),
            ret: TypeDesc::resolved(ret, span),
            is_variadic: false,
            template_params: Vec::new(),
            conv,
        };
        Ok(CallTarget {
            sig,
            decl: None,
            callee: CalleeSource::TargetValue,
            arg_offset: 0,
        })
    }

    /// Score every registered candidate and pick the unique best one.
    fn resolve_overloads(
        &mut self,
        canonical: &str,
        call: &CallExpr,
        span: Span,
        arg_offset: u8,
        omit_codegen: bool,
    ) -> SemaResult<CallTarget> {
        let candidates: Vec<ResolvedCallable> = self.registry.overloads_of(canonical).to_vec();
        if candidates.is_empty() {
            return Err(SemaError::UnresolvedCall { span });
        }

        let mut matches: SmallVec<[CandidateMatch; 4]> = SmallVec::new();
        for callable in candidates {
            // Specializations are reached through the resolved table;
            // scoring considers only source-level candidates.
            if callable.from_template {
                continue;
            }
            // Every candidate attempt is bracketed by a marker so failed
            // deductions leave no residue in the nominal-type table.
            let marker = self.nominal_types.marker();
            let scored = self.score_candidate(&callable, call, span, arg_offset);
            self.nominal_types.remove_all_since(marker);
            if let Some(candidate) = scored? {
                trace!(canonical, score = candidate.score, "viable candidate");
                matches.push(candidate);
            }
        }

        matches.sort_by_key(|candidate| candidate.score);

        if matches.is_empty() {
            return Err(SemaError::NoViableOverload {
                name: canonical.to_owned(),
                span,
            });
        }
        if matches.len() > 1 && matches[0].score == matches[1].score {
            let candidates = matches
                .iter()
                .map(|candidate| self.display_signature(&candidate.callable.decl))
                .collect();
            return Err(SemaError::AmbiguousCall {
                name: canonical.to_owned(),
                candidates,
                span,
            });
        }

        let mut drained = matches.into_iter();
        let best = match drained.next() {
            Some(best) => best,
            None => {
                return Err(SemaError::NoViableOverload {
                    name: canonical.to_owned(),
                    span,
                })
            }
        };

        if best.callable.decl.sig.is_template() {
            return self.instantiate_for_call(&best.callable, &best.mapping, arg_offset, omit_codegen, span);
        }

        let callee = match best.callable.func {
            Some(func) => CalleeSource::Func(func),
            None => CalleeSource::NotEmitted,
        };
        Ok(CallTarget {
            sig: best.callable.decl.sig.clone(),
            decl: Some(best.callable.decl),
            callee,
            arg_offset,
        })
    }

    /// Check one candidate: arity, template deduction, and per-position
    /// parameter compatibility. Lower scores are better; a template
    /// candidate starts at 2, and each trivial literal coercion adds 1.
    fn score_candidate(
        &mut self,
        callable: &ResolvedCallable,
        call: &CallExpr,
        span: Span,
        arg_offset: u8,
    ) -> SemaResult<Option<CandidateMatch>> {
        let decl = &callable.decl;
        let sig = &decl.sig;
        let offset = arg_offset as usize;
        if sig.params.len() < offset {
            return Ok(None);
        }
        let fixed = sig.params.len() - offset;
        let is_variadic_c = sig.is_variadic && decl.attrs.extern_;

        if !sig.is_variadic {
            if call.args.len() != fixed {
                return Ok(None);
            }
        } else {
            let adjustment = usize::from(is_variadic_c);
            if call.args.len() + adjustment < fixed {
                return Ok(None);
            }
        }

        let mut score = 0u32;
        let mut mapping = FxHashMap::default();
        if sig.is_template() {
            // Prefer a non-templated overload, all else being equal.
            score += 2;
            match self.deduce_template_args(decl, call, offset, span)? {
                Some(deduced) => {
                    for (&param, desc) in &deduced {
                        if let Some(ty) = desc.resolved_type() {
                            self.nominal_types.insert(param, ty);
                        }
                    }
                    mapping = deduced;
                }
                None => return Ok(None),
            }
        }

        for i in offset..sig.params.len() {
            let Some(arg) = call.args.get(i - offset) else {
                break;
            };
            let arg_ty = self.guess_type(arg)?;
            let expected = self.resolve_type_desc(&sig.params[i], false)?;
            if arg_ty == expected {
                continue;
            }
            if let Some(&literal) = arg.as_number_literal() {
                if self.literal_fits(literal, expected) {
                    score += 1;
                    continue;
                }
            }
            return Ok(None);
        }

        Ok(Some(CandidateMatch {
            score,
            callable: callable.clone(),
            mapping,
        }))
    }

    /// Specialize a winning template candidate, memoizing on the fully
    /// resolved mangled name. Outside speculative mode the
    /// specialization is registered and its body emitted immediately,
    /// on a clean slate.
    fn instantiate_for_call(
        &mut self,
        callable: &ResolvedCallable,
        mapping: &FxHashMap<Name, TypeDesc>,
        arg_offset: u8,
        omit_codegen: bool,
        span: Span,
    ) -> SemaResult<CallTarget> {
        let specialized = TemplateSpecializer::new(mapping).specialize_function(&callable.decl);

        let ret = self.resolve_type_desc(&specialized.sig.ret, true)?;
        let mut param_types = Vec::with_capacity(specialized.sig.params.len());
        for param in &specialized.sig.params {
            param_types.push(self.resolve_type_desc(param, true)?);
        }

        let plain = self.names.lookup(specialized.name);
        let owner = specialized.owner.map(|owner| self.names.lookup(owner));
        let mangled = mangle::mangled_name(
            specialized.kind,
            owner,
            plain,
            &param_types,
            ret,
            &self.types,
            &self.names,
        );

        // Reuse an existing specialization with an equal signature.
        if let Some(existing) = self.registry.resolved_by_name(&mangled) {
            let existing = existing.clone();
            if self.signatures_equal(&existing.decl.sig, &specialized.sig)? {
                trace!(mangled = mangled.as_str(), "reusing specialization");
                let callee = match existing.func {
                    Some(func) => CalleeSource::Func(func),
                    None => CalleeSource::NotEmitted,
                };
                return Ok(CallTarget {
                    sig: existing.decl.sig.clone(),
                    decl: Some(existing.decl),
                    callee,
                    arg_offset,
                });
            }
        }

        let registered = Rc::new(specialized);
        if !omit_codegen && !registered.attrs.intrinsic {
            let fn_type = self.types.function(ret, param_types, registered.sig.conv);
            let func = self.emitter.declare_function(
                &mangled,
                fn_type,
                registered.sig.is_variadic,
                Linkage::External,
                &self.types,
            );
            let entry = ResolvedCallable {
                decl: registered.clone(),
                func: Some(func),
                arg_offset,
                from_template: true,
            };
            self.registry.insert_resolved(mangled.clone(), entry.clone());
            let canonical = mangle::canonical_name(registered.kind, owner, plain);
            self.registry.add_overload(canonical, entry);
            debug!(mangled = mangled.as_str(), "instantiated template");

            self.with_clean_slate(|this| this.lower_function_body(&registered, func))?;
            return Ok(CallTarget {
                sig: registered.sig.clone(),
                decl: Some(registered),
                callee: CalleeSource::Func(func),
                arg_offset,
            });
        }

        Ok(CallTarget {
            sig: registered.sig.clone(),
            decl: Some(registered),
            callee: CalleeSource::NotEmitted,
            arg_offset,
        })
    }
}
