//! Member and method resolution
//!
//! `value.name` is looked up in this order: a field of the receiver's
//! type, an inherent method of that type, then trait methods. A trait
//! method is a candidate when the trait declares the name and the receiver
//! can implement the trait: through a bound already attached to it, a
//! declared bound on a rigid parameter, or an applicable impl. Several
//! candidates are an error; nothing is ever picked by specificity.

use crate::frontend::ast::{Expr, Ident};
use crate::semantic::decls::owner_name;
use crate::semantic::infer::BodyChecker;
use crate::semantic::scope::{Member, MethodDef};
use crate::semantic::targets::CallTarget;
use crate::traits::Solver;
use crate::types::{TraitRef, Type};
use crate::utils::{Error, Result, Span};
use log::trace;

/// What a member access resolved to
#[derive(Debug)]
pub(super) enum Resolved<'a> {
    /// Field with its type at the receiver's arguments
    Field(Type),
    Inherent(&'a MethodDef),
    Trait(TraitRef),
}

impl<'a> BodyChecker<'a> {
    pub(super) fn resolve_member(&mut self, receiver: &Type, name: &Ident, call: bool) -> Result<Resolved<'a>> {
        let decls = self.decls;
        let ty = self.ctx.shallow_resolve(receiver);

        if let Some(member) = owner_name(&ty).and_then(|owner| decls.member(owner, &name.name)) {
            return match (member, call) {
                (Member::Field { ty: field_ty, .. }, false) => {
                    let args = match &ty {
                        Type::App(_, args) => args.as_slice(),
                        _ => &[],
                    };
                    let subst = owner_name(&ty)
                        .and_then(|owner| decls.adts.get(owner))
                        .map(|adt| adt.subst_for(args))
                        .unwrap_or_default();
                    Ok(Resolved::Field(field_ty.subst(&subst)))
                }
                (Member::Field { .. }, true) => Err(Error::MemberNotMethod {
                    name: name.name.clone(),
                    span: name.span,
                }),
                (Member::Method(def), true) => Ok(Resolved::Inherent(def)),
                (Member::Method(_), false) => Err(Error::MethodNotMember {
                    name: name.name.clone(),
                    span: name.span,
                }),
            };
        }

        let mut candidates = self.trait_candidates(&ty, &name.name);
        trace!("{}.{}: {} trait candidate(s)", ty, name.name, candidates.len());
        match candidates.len() {
            0 => Err(Error::NoSuchMethodOrMember {
                name: name.name.clone(),
                ty: self.ctx.describe(&ty),
                span: name.span,
            }),
            1 if !call => Err(Error::MethodNotMember {
                name: name.name.clone(),
                span: name.span,
            }),
            1 => Ok(Resolved::Trait(candidates.remove(0))),
            _ => Err(Error::AmbiguousMethodCall {
                method: name.name.clone(),
                candidates: candidates
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                span: name.span,
            }),
        }
    }

    /// Traits declaring `method` that `ty` may implement, ordered by name
    fn trait_candidates(&mut self, ty: &Type, method: &str) -> Vec<TraitRef> {
        let decls = self.decls;
        let declaring: Vec<_> = decls
            .traits
            .traits()
            .filter(|def| def.method(method).is_some())
            .collect();

        match ty {
            Type::Var(v) => {
                let bounds = self.ctx.bounds(*v);
                let bound: Vec<_> = declaring
                    .iter()
                    .filter_map(|def| bounds.iter().find(|b| b.name == def.name).cloned())
                    .collect();
                if !bound.is_empty() {
                    return bound;
                }
                declaring
                    .iter()
                    .map(|def| {
                        let args = def.params.iter().map(|_| self.ctx.fresh_var()).collect();
                        TraitRef::new(def.name.clone(), args)
                    })
                    .collect()
            }
            Type::Param(p) => {
                let declared: Vec<_> = declaring
                    .iter()
                    .filter_map(|def| self.env.bounds_of(p).iter().find(|b| b.name == def.name).cloned())
                    .collect();
                if !declared.is_empty() {
                    return declared;
                }
                self.applicable(ty, &declaring)
            }
            _ => self.applicable(ty, &declaring),
        }
    }

    /// Traits among `declaring` with at least one impl that could apply
    fn applicable(&mut self, ty: &Type, declaring: &[&crate::traits::TraitDef]) -> Vec<TraitRef> {
        let solver = Solver::new(&self.decls.traits, &self.env);
        let mut found = Vec::new();
        for def in declaring {
            let args = def.params.iter().map(|_| self.ctx.fresh_var()).collect();
            let trait_ref = TraitRef::new(def.name.clone(), args);
            if solver.may_hold(&mut self.ctx, ty, &trait_ref) {
                found.push(trait_ref);
            }
        }
        found
    }

    pub(super) fn check_field_access(&mut self, expr: &Expr, field: &Ident) -> Result<Type> {
        let receiver = self.check_expr(expr)?;
        match self.resolve_member(&receiver, field, false)? {
            Resolved::Field(ty) => Ok(ty),
            // resolve_member reports methods used as members
            Resolved::Inherent(_) | Resolved::Trait(_) => Err(Error::MethodNotMember {
                name: field.name.clone(),
                span: field.span,
            }),
        }
    }

    pub(super) fn check_method_call(&mut self, expr: &Expr, method: &Ident, args: &[Expr], span: Span) -> Result<Type> {
        let receiver = self.check_expr(expr)?;
        match self.resolve_member(&receiver, method, true)? {
            Resolved::Inherent(def) => {
                let (subst, type_args) = self.instantiate(&def.sig.generics, span)?;
                let params: Vec<_> = def.sig.params.iter().map(|p| p.subst(&subst)).collect();
                let Some((self_param, rest)) = params.split_first() else {
                    return Err(Error::ArgCountMismatch {
                        name: def.name.clone(),
                        expected: 0,
                        got: args.len(),
                        span,
                    });
                };
                self.unify(self_param, &receiver, expr.span())?;
                self.check_args(&def.name, rest, args, span)?;
                self.record(
                    CallTarget::InherentMethod {
                        owner: def.owner.clone(),
                        method: def.name.clone(),
                        type_args,
                    },
                    span,
                );
                Ok(def.sig.ret.subst(&subst))
            }
            Resolved::Trait(trait_ref) => {
                let decls = self.decls;
                let sig = decls
                    .traits
                    .get(&trait_ref.name)
                    .and_then(|def| def.method_sig_for(&method.name, &receiver, &trait_ref.args));
                let Some(sig) = sig else {
                    return Err(Error::NoSuchMethodOrMember {
                        name: method.name.clone(),
                        ty: self.ctx.describe(&receiver),
                        span: method.span,
                    });
                };
                self.ctx.require(&receiver, trait_ref.clone(), span)?;
                self.check_args(&method.name, &sig.params[1..], args, span)?;
                self.record(
                    CallTarget::TraitMethod {
                        trait_name: trait_ref.name,
                        method: method.name.clone(),
                        self_ty: receiver,
                        trait_args: trait_ref.args,
                    },
                    span,
                );
                Ok(sig.ret)
            }
            Resolved::Field(_) => Err(Error::MemberNotMethod {
                name: method.name.clone(),
                span: method.span,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::ErrorKind;
    use crate::{compile, CompileOptions};
    use pretty_assertions::assert_eq;

    const PAIR: &str = "struct Pair<A, B> { first: A, second: B }\n\
                        impl<A, B> Pair<A, B> { fn swap(self) -> Pair<B, A> { Pair { first: self.second, second: self.first } } }\n";

    fn check(source: &str) -> Result<(), (ErrorKind, String)> {
        compile(source, &CompileOptions::default())
            .map(|_| ())
            .map_err(|e| (e.kind(), e.to_string()))
    }

    #[test]
    fn fields_and_inherent_methods() {
        let src = format!("{}fn main() -> Bool {{ let p = Pair {{ first: 1, second: true }}; p.swap().first }}", PAIR);
        assert_eq!(check(&src), Ok(()));
    }

    #[test]
    fn field_in_call_position() {
        let src = format!("{}fn main() {{ let p = Pair {{ first: 1, second: 2 }}; p.first(); }}", PAIR);
        assert_eq!(
            check(&src),
            Err((ErrorKind::KindMismatch, "first is a member variable, not a method".into()))
        );
    }

    #[test]
    fn method_in_member_position() {
        let src = format!("{}fn main() {{ let p = Pair {{ first: 1, second: 2 }}; let s = p.swap; }}", PAIR);
        assert_eq!(
            check(&src),
            Err((ErrorKind::KindMismatch, "swap is a method, not a member variable".into()))
        );
    }

    #[test]
    fn missing_member() {
        let src = format!("{}fn main() {{ let p = Pair {{ first: 1, second: 2 }}; p.third(); }}", PAIR);
        assert_eq!(
            check(&src),
            Err((
                ErrorKind::NoSuchMethodOrMember,
                "type Pair<Int, Int> has no method or member named \"third\"".into()
            ))
        );
    }

    #[test]
    fn trait_method_through_impl_and_bound() {
        let src = "trait Show { fn show(self) -> String; }\n\
                   impl Show for Int { fn show(self) -> String { to_string(self) } }\n\
                   fn describe<T: Show>(x: T) -> String { x.show() }\n\
                   fn main() -> String { let n: Int = 4; concat(n.show(), describe(5)) }";
        assert_eq!(check(src), Ok(()));
    }

    #[test]
    fn same_method_in_two_applicable_traits_is_ambiguous() {
        let src = "trait Show { fn show(self) -> String; }\n\
                   trait Print { fn show(self) -> String; }\n\
                   impl Show for Int { fn show(self) -> String { \"s\" } }\n\
                   impl Print for Int { fn show(self) -> String { \"p\" } }\n\
                   fn main() -> String { let n: Int = 4; n.show() }";
        assert_eq!(
            check(src),
            Err((
                ErrorKind::AmbiguousMethodCall,
                "ambiguous call to method show: candidates from traits Print, Show".into()
            ))
        );
    }

    #[test]
    fn trait_without_impl_is_not_a_candidate() {
        let src = "trait Show { fn show(self) -> String; }\n\
                   trait Print { fn show(self) -> String; }\n\
                   impl Show for Int { fn show(self) -> String { \"s\" } }\n\
                   impl Print for Bool { fn show(self) -> String { \"p\" } }\n\
                   fn main() -> String { let n: Int = 4; n.show() }";
        assert_eq!(check(src), Ok(()));
    }

    #[test]
    fn parameter_without_bound_has_no_methods() {
        let src = "trait Show { fn show(self) -> String; }\n\
                   fn describe<T>(x: T) -> String { x.show() }\n\
                   fn main() {}";
        assert_eq!(check(src).unwrap_err().0, ErrorKind::NoSuchMethodOrMember);
    }

    #[test]
    fn unbounded_variable_receiver_picks_the_only_declaring_trait() {
        let src = "trait Show { fn show(self) -> String; }\n\
                   impl Show for Bool { fn show(self) -> String { \"b\" } }\n\
                   fn main() -> String { let xs = []; let s = xs[0].show(); push(xs, true); s }";
        assert_eq!(check(src), Ok(()));
    }
}
