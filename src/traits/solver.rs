//! Trait obligation solver
//!
//! Obligations collected during inference are discharged here once the
//! types involved are known well enough. An obligation on an unbound
//! variable becomes a bound on that variable; one on a rigid parameter is
//! met by the parameter's declared bounds; anything else needs exactly one
//! applicable impl. Several applicable impls leave the obligation pending
//! until more of the type is known.

use crate::traits::coherence::could_hold;
use crate::traits::registry::{ImplId, TraitTable};
use crate::types::{GenericDef, InferCtx, Obligation, ParamRef, Type, TraitRef};
use crate::utils::{Error, Result, Span};
use log::{debug, trace};
use std::collections::HashMap;

const MAX_ROUNDS: usize = 256;
const CANDIDATE_DEPTH: usize = 8;

/// Bounds of the generic parameters in scope of the body being checked
#[derive(Debug, Clone, Default)]
pub struct GenericEnv {
    bounds: HashMap<u32, Vec<TraitRef>>,
}

impl GenericEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, generics: &[GenericDef]) {
        for generic in generics {
            self.bounds
                .entry(generic.param.id)
                .or_default()
                .extend(generic.bounds.iter().cloned());
        }
    }

    pub fn bounds_of(&self, param: &ParamRef) -> &[TraitRef] {
        self.bounds.get(&param.id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Outcome of one selection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Discharged by this impl
    Impl(ImplId),
    /// Discharged by a declared bound on a rigid parameter
    Param,
    /// Turned into a bound on an unbound variable
    Attached,
    /// Several impls still apply
    Deferred,
}

pub struct Solver<'a> {
    table: &'a TraitTable,
    env: &'a GenericEnv,
}

impl<'a> Solver<'a> {
    pub fn new(table: &'a TraitTable, env: &'a GenericEnv) -> Self {
        Self { table, env }
    }

    /// Impls whose head (and where-bounds) could apply to `ty`
    pub fn candidates(&self, ctx: &mut InferCtx, ty: &Type, trait_ref: &TraitRef) -> Vec<ImplId> {
        self.table
            .impls_of(&trait_ref.name)
            .filter(|def| {
                let snapshot = ctx.snapshot();
                let inst = def.instantiate(ctx);
                let applies = ctx.unify(&inst.head, ty, Span::dummy()).is_ok()
                    && inst
                        .trait_args
                        .iter()
                        .zip(&trait_ref.args)
                        .all(|(a, b)| ctx.unify(a, b, Span::dummy()).is_ok())
                    && inst
                        .obligations
                        .iter()
                        .all(|(t, b)| self.param_or_impl(ctx, t, b));
                ctx.rollback(snapshot);
                applies
            })
            .map(|def| def.id)
            .collect()
    }

    fn param_or_impl(&self, ctx: &mut InferCtx, ty: &Type, bound: &TraitRef) -> bool {
        match ctx.shallow_resolve(ty) {
            Type::Param(p) if self.env.bounds_of(&p).iter().any(|b| b.name == bound.name) => true,
            resolved => could_hold(self.table, ctx, &resolved, bound, CANDIDATE_DEPTH),
        }
    }

    /// Does `ty: trait_ref` hold (or could it, for partially known types)?
    /// Leaves `ctx` untouched.
    pub fn may_hold(&self, ctx: &mut InferCtx, ty: &Type, trait_ref: &TraitRef) -> bool {
        match ctx.shallow_resolve(ty) {
            Type::Var(_) => true,
            Type::Param(p) if self.env.bounds_of(&p).iter().any(|b| b.name == trait_ref.name) => true,
            resolved => !self.candidates(ctx, &resolved, trait_ref).is_empty(),
        }
    }

    pub fn select(&self, ctx: &mut InferCtx, ob: &Obligation) -> Result<Selection> {
        let ty = ctx.shallow_resolve(&ob.ty);
        trace!("select {}: {}", ty, ob.trait_ref);

        if let Type::Var(v) = ty {
            ctx.add_bound(v, ob.trait_ref.clone(), ob.span)?;
            return Ok(Selection::Attached);
        }

        if let Type::Param(p) = &ty {
            let declared = self
                .env
                .bounds_of(p)
                .iter()
                .find(|b| b.name == ob.trait_ref.name)
                .cloned();
            if let Some(declared) = declared {
                for (a, b) in declared.args.iter().zip(&ob.trait_ref.args) {
                    ctx.unify(a, b, ob.span)?;
                }
                return Ok(Selection::Param);
            }
        }

        let candidates = self.candidates(ctx, &ty, &ob.trait_ref);
        match candidates.as_slice() {
            [] => Err(Error::UnsatisfiedConstraint {
                ty: ctx.describe(&ty),
                trait_name: ctx.describe_trait(&ob.trait_ref),
                span: ob.span,
            }),
            [id] => {
                self.commit(ctx, *id, &ty, ob)?;
                Ok(Selection::Impl(*id))
            }
            _ => Ok(Selection::Deferred),
        }
    }

    fn commit(&self, ctx: &mut InferCtx, id: ImplId, ty: &Type, ob: &Obligation) -> Result<()> {
        let inst = self.table.impl_def(id).instantiate(ctx);
        ctx.unify(&inst.head, ty, ob.span)?;
        for (a, b) in inst.trait_args.iter().zip(&ob.trait_ref.args) {
            ctx.unify(a, b, ob.span)?;
        }
        for (t, bound) in inst.obligations {
            ctx.require(&t, bound, ob.span)?;
        }
        Ok(())
    }

    /// Discharge pending obligations until nothing changes
    pub fn solve(&self, ctx: &mut InferCtx) -> Result<()> {
        for round in 0..MAX_ROUNDS {
            let pending = ctx.take_pending();
            if pending.is_empty() {
                return Ok(());
            }
            let mut progress = false;
            let mut deferred = Vec::new();
            for ob in pending {
                match self.select(ctx, &ob)? {
                    Selection::Deferred => deferred.push(ob),
                    _ => progress = true,
                }
            }
            let stalled = !progress && !ctx.has_pending();
            for ob in deferred {
                ctx.push_pending(ob);
            }
            if stalled {
                debug!("solver stalled after {} rounds", round + 1);
                return Ok(());
            }
        }
        Ok(())
    }
}
