//! What each call site resolved to
//!
//! The body checker records one `Site` per call, constructor use, method
//! call and empty array literal. Monomorphization reads the sites of every
//! body; the evaluator looks targets up by span.

use crate::stdlib::Builtin;
use crate::traits::ImplId;
use crate::types::Type;
use crate::utils::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Function {
        name: String,
        type_args: Vec<Type>,
    },
    Builtin {
        builtin: Builtin,
        type_args: Vec<Type>,
    },
    /// Enum constructor, struct literal (`ctor == adt`) or `[]` (`adt == "Array"`)
    Constructor {
        adt: String,
        ctor: String,
        type_args: Vec<Type>,
    },
    InherentMethod {
        owner: String,
        method: String,
        type_args: Vec<Type>,
    },
    TraitMethod {
        trait_name: String,
        method: String,
        self_ty: Type,
        trait_args: Vec<Type>,
    },
}

impl CallTarget {
    /// Word used for this site in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            CallTarget::Constructor { .. } => "constructor",
            _ => "function",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CallTarget::Function { name, .. } => name,
            CallTarget::Builtin { builtin, .. } => builtin.name(),
            CallTarget::Constructor { ctor, .. } => ctor,
            CallTarget::InherentMethod { method, .. } | CallTarget::TraitMethod { method, .. } => method,
        }
    }

    /// Every type the site was instantiated at
    pub fn types(&self) -> Vec<&Type> {
        match self {
            CallTarget::Function { type_args, .. }
            | CallTarget::Builtin { type_args, .. }
            | CallTarget::Constructor { type_args, .. }
            | CallTarget::InherentMethod { type_args, .. } => type_args.iter().collect(),
            CallTarget::TraitMethod { self_ty, trait_args, .. } => {
                std::iter::once(self_ty).chain(trait_args).collect()
            }
        }
    }

    /// Rewrite every type the target carries
    pub fn map_types(&self, mut f: impl FnMut(&Type) -> Type) -> CallTarget {
        let mut all = |tys: &[Type]| tys.iter().map(&mut f).collect::<Vec<_>>();
        match self {
            CallTarget::Function { name, type_args } => CallTarget::Function {
                name: name.clone(),
                type_args: all(type_args),
            },
            CallTarget::Builtin { builtin, type_args } => CallTarget::Builtin {
                builtin: *builtin,
                type_args: all(type_args),
            },
            CallTarget::Constructor { adt, ctor, type_args } => CallTarget::Constructor {
                adt: adt.clone(),
                ctor: ctor.clone(),
                type_args: all(type_args),
            },
            CallTarget::InherentMethod { owner, method, type_args } => CallTarget::InherentMethod {
                owner: owner.clone(),
                method: method.clone(),
                type_args: all(type_args),
            },
            CallTarget::TraitMethod { trait_name, method, self_ty, trait_args } => {
                let self_ty = all(std::slice::from_ref(self_ty)).remove(0);
                CallTarget::TraitMethod {
                    trait_name: trait_name.clone(),
                    method: method.clone(),
                    self_ty,
                    trait_args: all(trait_args),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub target: CallTarget,
    pub span: Span,
}

/// A checked function or method body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyKey {
    Function(String),
    Method { owner: String, method: String },
    ImplMethod { impl_id: ImplId, method: String },
}

impl fmt::Display for BodyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKey::Function(name) => write!(f, "{}", name),
            BodyKey::Method { owner, method } => write!(f, "{}::{}", owner, method),
            BodyKey::ImplMethod { impl_id, method } => write!(f, "impl#{}::{}", impl_id.0, method),
        }
    }
}

/// An integer literal and the type it was checked at
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralUse {
    pub span: Span,
    pub ty: Type,
    pub value: i128,
}

/// Result of checking one body, with every type fully substituted
#[derive(Debug, Clone, Default)]
pub struct CheckedBody {
    /// In the order the checker finished them (innermost first)
    pub sites: Vec<Site>,
    /// Final type of each integer literal; may still mention the body's
    /// own generic parameters
    pub literals: Vec<LiteralUse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamRef;
    use pretty_assertions::assert_eq;

    #[test]
    fn trait_targets_expose_self_type_first() {
        let target = CallTarget::TraitMethod {
            trait_name: "Convert".into(),
            method: "convert".into(),
            self_ty: Type::BOOL,
            trait_args: vec![Type::INT],
        };
        assert_eq!(target.types(), vec![&Type::BOOL, &Type::INT]);
        assert_eq!(target.kind(), "function");
        assert_eq!(target.name(), "convert");
    }

    #[test]
    fn map_types_reaches_every_position() {
        let t = Type::Param(ParamRef { id: 7, name: "T".into() });
        let target = CallTarget::TraitMethod {
            trait_name: "Convert".into(),
            method: "convert".into(),
            self_ty: Type::adt("Option", vec![t.clone()]),
            trait_args: vec![t],
        };
        let mapped = target.map_types(|ty| {
            let mut subst = crate::types::ParamSubst::new();
            subst.insert(7, Type::INT);
            ty.subst(&subst)
        });
        assert!(mapped.types().iter().all(|ty| ty.is_ground()));
    }
}
