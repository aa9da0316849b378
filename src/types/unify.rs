//! Inference context: type-variable arena and unifier
//!
//! Variables live in a per-body arena of cells linked union-find style.
//! Only a root cell carries a binding and the trait bounds of its class.
//! Binding a variable turns its bounds into obligations on the bound term;
//! the trait solver discharges those later.

use crate::types::{Type, TyVarId, TraitRef};
use crate::utils::{Error, Result, Span};
use log::trace;

#[derive(Debug, Clone)]
struct VarCell {
    parent: Option<TyVarId>,
    value: Option<Type>,
    bounds: Vec<TraitRef>,
}

/// A deferred "type implements trait" requirement
#[derive(Debug, Clone, PartialEq)]
pub struct Obligation {
    pub ty: Type,
    pub trait_ref: TraitRef,
    pub span: Span,
}

/// Saved arena state for speculative unification
#[derive(Debug, Clone)]
pub struct Snapshot {
    cells: Vec<VarCell>,
    pending: Vec<Obligation>,
}

#[derive(Debug, Clone, Default)]
pub struct InferCtx {
    cells: Vec<VarCell>,
    pending: Vec<Obligation>,
}

impl InferCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_id(&mut self) -> TyVarId {
        let id = TyVarId(self.cells.len() as u32);
        self.cells.push(VarCell { parent: None, value: None, bounds: Vec::new() });
        id
    }

    pub fn fresh_var(&mut self) -> Type {
        Type::Var(self.fresh_id())
    }

    pub fn var_count(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, v: TyVarId) -> &VarCell {
        &self.cells[v.0 as usize]
    }

    fn cell_mut(&mut self, v: TyVarId) -> &mut VarCell {
        &mut self.cells[v.0 as usize]
    }

    /// Class representative, compressing the path on the way
    pub fn find(&mut self, v: TyVarId) -> TyVarId {
        let mut root = v;
        while let Some(parent) = self.cell(root).parent {
            root = parent;
        }
        let mut cur = v;
        while let Some(parent) = self.cell(cur).parent {
            self.cell_mut(cur).parent = Some(root);
            cur = parent;
        }
        root
    }

    /// Follow variable bindings at the top of `ty` only
    pub fn shallow_resolve(&mut self, ty: &Type) -> Type {
        let mut ty = ty.clone();
        while let Type::Var(v) = ty {
            let root = self.find(v);
            match &self.cell(root).value {
                Some(value) => ty = value.clone(),
                None => return Type::Var(root),
            }
        }
        ty
    }

    /// Apply the current substitution everywhere in `ty`
    pub fn resolve(&mut self, ty: &Type) -> Type {
        match self.shallow_resolve(ty) {
            Type::App(head, args) => Type::App(head, args.iter().map(|a| self.resolve(a)).collect()),
            Type::Fn(params, ret) => Type::Fn(
                params.iter().map(|p| self.resolve(p)).collect(),
                Box::new(self.resolve(&ret)),
            ),
            other => other,
        }
    }

    /// Rendered form of `ty` under the current substitution
    pub fn describe(&mut self, ty: &Type) -> String {
        self.resolve(ty).to_string()
    }

    pub fn describe_trait(&mut self, trait_ref: &TraitRef) -> String {
        TraitRef {
            name: trait_ref.name.clone(),
            args: trait_ref.args.iter().map(|a| self.resolve(a)).collect(),
        }
        .to_string()
    }

    /// Bounds accumulated on the class of `v`
    pub fn bounds(&mut self, v: TyVarId) -> Vec<TraitRef> {
        let root = self.find(v);
        self.cell(root).bounds.clone()
    }

    /// Unbound class representatives, in allocation order
    pub fn unresolved_roots(&mut self) -> Vec<TyVarId> {
        (0..self.cells.len() as u32)
            .map(TyVarId)
            .filter(|&v| self.cell(v).parent.is_none() && self.cell(v).value.is_none())
            .collect()
    }

    // ==================== Unification ====================

    pub fn unify(&mut self, a: &Type, b: &Type, span: Span) -> Result<()> {
        let a = self.shallow_resolve(a);
        let b = self.shallow_resolve(b);
        trace!("unify {} ~ {}", a, b);

        match (&a, &b) {
            (Type::Var(x), Type::Var(y)) => {
                if x != y {
                    self.union(*x, *y, span)?;
                }
                Ok(())
            }
            (Type::Var(v), other) | (other, Type::Var(v)) => self.bind(*v, other, span),
            (Type::Prim(p), Type::Prim(q)) if p == q => Ok(()),
            (Type::Param(p), Type::Param(q)) if p.id == q.id => Ok(()),
            (Type::App(h1, args1), Type::App(h2, args2)) if h1 == h2 && args1.len() == args2.len() => {
                for (x, y) in args1.iter().zip(args2) {
                    self.unify(x, y, span)?;
                }
                Ok(())
            }
            (Type::Fn(p1, r1), Type::Fn(p2, r2)) if p1.len() == p2.len() => {
                for (x, y) in p1.iter().zip(p2) {
                    self.unify(x, y, span)?;
                }
                self.unify(r1, r2, span)
            }
            _ => Err(Error::UnificationFailure {
                lhs: self.describe(&a),
                rhs: self.describe(&b),
                span,
            }),
        }
    }

    /// Merge two unbound classes; bounds move to the surviving root
    fn union(&mut self, x: TyVarId, y: TyVarId, span: Span) -> Result<()> {
        let moved = std::mem::take(&mut self.cell_mut(y).bounds);
        self.cell_mut(y).parent = Some(x);
        for bound in moved {
            self.add_bound(x, bound, span)?;
        }
        Ok(())
    }

    fn bind(&mut self, v: TyVarId, ty: &Type, span: Span) -> Result<()> {
        if self.occurs(v, ty) {
            return Err(Error::InfiniteType {
                var: Type::Var(v).to_string(),
                ty: self.describe(ty),
                span,
            });
        }
        let bounds = std::mem::take(&mut self.cell_mut(v).bounds);
        self.cell_mut(v).value = Some(ty.clone());
        for trait_ref in bounds {
            self.pending.push(Obligation { ty: ty.clone(), trait_ref, span });
        }
        Ok(())
    }

    fn occurs(&mut self, v: TyVarId, ty: &Type) -> bool {
        match self.shallow_resolve(ty) {
            Type::Var(w) => w == v,
            Type::App(_, args) => args.iter().any(|a| self.occurs(v, a)),
            Type::Fn(params, ret) => params.iter().any(|p| self.occurs(v, p)) || self.occurs(v, &ret),
            Type::Prim(_) | Type::Param(_) => false,
        }
    }

    // ==================== Bounds ====================

    /// Require `ty: trait_ref`; attaches to unbound variables, defers otherwise
    pub fn require(&mut self, ty: &Type, trait_ref: TraitRef, span: Span) -> Result<()> {
        match self.shallow_resolve(ty) {
            Type::Var(v) => self.add_bound(v, trait_ref, span),
            other => {
                self.pending.push(Obligation { ty: other, trait_ref, span });
                Ok(())
            }
        }
    }

    /// Attach a bound to an unbound class. A second bound for the same
    /// trait must agree with the first on every argument.
    pub fn add_bound(&mut self, v: TyVarId, trait_ref: TraitRef, span: Span) -> Result<()> {
        let root = self.find(v);
        if let Some(value) = self.cell(root).value.clone() {
            self.pending.push(Obligation { ty: value, trait_ref, span });
            return Ok(());
        }
        let existing = self
            .cell(root)
            .bounds
            .iter()
            .find(|b| b.name == trait_ref.name)
            .cloned();
        match existing {
            None => {
                self.cell_mut(root).bounds.push(trait_ref);
                Ok(())
            }
            Some(existing) => {
                let agrees = self.probe(|ctx| {
                    for (a, b) in existing.args.iter().zip(&trait_ref.args) {
                        ctx.unify(a, b, span)?;
                    }
                    Ok(())
                });
                if agrees.is_ok() {
                    return Ok(());
                }
                Err(Error::ConflictingConstraint {
                    ty: self.describe(&Type::Var(root)),
                    existing: self.describe_trait(&existing),
                    new: self.describe_trait(&trait_ref),
                    span,
                })
            }
        }
    }

    // ==================== Obligations ====================

    pub fn take_pending(&mut self) -> Vec<Obligation> {
        std::mem::take(&mut self.pending)
    }

    pub fn push_pending(&mut self, obligation: Obligation) {
        self.pending.push(obligation);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    // ==================== Snapshots ====================

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { cells: self.cells.clone(), pending: self.pending.clone() }
    }

    pub fn rollback(&mut self, snapshot: Snapshot) {
        self.cells = snapshot.cells;
        self.pending = snapshot.pending;
    }

    /// Run `f`, keeping its effects only if it succeeds
    pub fn probe<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let snapshot = self.snapshot();
        let result = f(self);
        if result.is_err() {
            self.rollback(snapshot);
        }
        result
    }

    /// Would `a` and `b` unify? Leaves the arena untouched either way.
    pub fn can_unify(&mut self, a: &Type, b: &Type) -> bool {
        let snapshot = self.snapshot();
        let ok = self.unify(a, b, Span::dummy()).is_ok();
        self.rollback(snapshot);
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamRef, Prim};
    use pretty_assertions::assert_eq;

    fn sp() -> Span {
        Span::dummy()
    }

    fn num() -> TraitRef {
        TraitRef::new("Num", vec![])
    }

    #[test]
    fn binds_and_resolves_through_chains() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        let c = ctx.fresh_var();
        ctx.unify(&a, &b, sp()).unwrap();
        ctx.unify(&b, &c, sp()).unwrap();
        ctx.unify(&c, &Type::INT, sp()).unwrap();
        assert_eq!(ctx.resolve(&a), Type::INT);
        assert_eq!(ctx.resolve(&Type::adt("Option", vec![b])), Type::adt("Option", vec![Type::INT]));
    }

    #[test]
    fn unification_is_symmetric() {
        let pairs = vec![
            (Type::INT, Type::BOOL),
            (Type::adt("Option", vec![Type::INT]), Type::adt("Option", vec![Type::INT])),
            (Type::array(Type::INT), Type::adt("Option", vec![Type::INT])),
            (Type::func(vec![Type::INT], Type::UNIT), Type::func(vec![], Type::UNIT)),
        ];
        for (a, b) in pairs {
            let forward = InferCtx::new().unify(&a, &b, sp()).is_ok();
            let backward = InferCtx::new().unify(&b, &a, sp()).is_ok();
            assert_eq!(forward, backward, "{} ~ {}", a, b);
        }

        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        let lhs = Type::adt("Pair", vec![v.clone(), Type::BOOL]);
        let rhs = Type::adt("Pair", vec![Type::INT, v]);
        assert!(ctx.clone().unify(&lhs, &rhs, sp()).is_err());
        assert!(ctx.unify(&rhs, &lhs, sp()).is_err());
    }

    #[test]
    fn reunifying_equal_types_is_a_noop() {
        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        let ty = Type::adt("Option", vec![v.clone()]);
        ctx.unify(&ty, &ty, sp()).unwrap();
        assert_eq!(ctx.unresolved_roots().len(), 1);
        ctx.unify(&v, &Type::INT, sp()).unwrap();
        ctx.unify(&v, &Type::INT, sp()).unwrap();
        assert!(!ctx.has_pending());
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        let err = ctx.unify(&v, &Type::array(v.clone()), sp()).unwrap_err();
        assert_eq!(err.to_string(), "variable a0 already occurs in Array<a0>");
    }

    #[test]
    fn mismatch_reports_both_types() {
        let mut ctx = InferCtx::new();
        let err = ctx.unify(&Type::INT, &Type::BOOL, sp()).unwrap_err();
        assert_eq!(err.to_string(), "cannot unify types Int and Bool");
    }

    #[test]
    fn rigid_params_only_unify_with_themselves() {
        let t = Type::Param(ParamRef { id: 0, name: "T".into() });
        let u = Type::Param(ParamRef { id: 1, name: "U".into() });
        let mut ctx = InferCtx::new();
        assert!(ctx.unify(&t, &t, sp()).is_ok());
        assert!(ctx.unify(&t, &u, sp()).is_err());
        assert!(ctx.unify(&t, &Type::INT, sp()).is_err());
    }

    #[test]
    fn binding_turns_bounds_into_obligations() {
        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        ctx.require(&v, num(), sp()).unwrap();
        assert!(!ctx.has_pending());
        ctx.unify(&v, &Type::BOOL, sp()).unwrap();
        let pending = ctx.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].ty, Type::BOOL);
        assert_eq!(pending[0].trait_ref, num());
    }

    #[test]
    fn union_merges_bounds() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        ctx.require(&a, num(), sp()).unwrap();
        ctx.require(&b, TraitRef::new("Eq", vec![]), sp()).unwrap();
        ctx.unify(&a, &b, sp()).unwrap();
        let Type::Var(root) = ctx.shallow_resolve(&b) else { panic!() };
        let names: Vec<_> = ctx.bounds(root).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Num".to_string(), "Eq".to_string()]);
    }

    #[test]
    fn conflicting_bounds_for_same_trait() {
        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        ctx.require(&v, TraitRef::new("Convert", vec![Type::INT]), sp()).unwrap();
        let err = ctx
            .require(&v, TraitRef::new("Convert", vec![Type::BOOL]), sp())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type a0 cannot be constrained by both Convert<Int> and Convert<Bool>"
        );
    }

    #[test]
    fn compatible_bounds_refine_arguments() {
        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        let arg = ctx.fresh_var();
        ctx.require(&v, TraitRef::new("Convert", vec![arg.clone()]), sp()).unwrap();
        ctx.require(&v, TraitRef::new("Convert", vec![Type::Prim(Prim::UInt8)]), sp()).unwrap();
        assert!(ctx.can_unify(&arg, &Type::Prim(Prim::UInt8)));
    }

    #[test]
    fn probe_rolls_back_on_failure() {
        let mut ctx = InferCtx::new();
        let v = ctx.fresh_var();
        let result = ctx.probe(|c| {
            c.unify(&v, &Type::INT, sp())?;
            c.unify(&Type::INT, &Type::BOOL, sp())
        });
        assert!(result.is_err());
        assert_eq!(ctx.resolve(&v), v);
    }
}
