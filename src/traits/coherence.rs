//! Coherence: no two impls of one trait may apply to the same type
//!
//! A new impl is compared against every earlier impl of the same trait in
//! registration order. Heads and trait arguments are freshened and unified;
//! if that succeeds, the where-bounds of both impls are re-checked against
//! the unified types and the pair only overlaps when none of them is
//! provably unsatisfiable. The first overlapping impl is blamed as previous.
//!
//! Bounds can only be refuted against the impls known at that point, so
//! once every impl is registered each pair is checked again against the
//! complete table.

use crate::traits::registry::{ImplDef, TraitTable};
use crate::types::{InferCtx, Type, TraitRef};
use crate::utils::{Error, Result, Span};
use log::trace;

/// Nesting limit for bound re-checks through generic impls
const RECHECK_DEPTH: usize = 8;

pub(crate) fn check_overlap(table: &TraitTable, new: &ImplDef) -> Result<()> {
    for existing in table.impls_of(&new.trait_ref.name) {
        if overlaps(table, existing, new) {
            return Err(overlap_error(existing, new));
        }
    }
    Ok(())
}

/// Every pair of impls of one trait, against the complete table; the
/// later-registered impl of the first overlapping pair is blamed
pub(crate) fn check_all(table: &TraitTable) -> Result<()> {
    for new in table.impls() {
        let earlier = table
            .impls_of(&new.trait_ref.name)
            .filter(|existing| existing.id < new.id);
        for existing in earlier {
            if overlaps(table, existing, new) {
                return Err(overlap_error(existing, new));
            }
        }
    }
    Ok(())
}

fn overlap_error(existing: &ImplDef, new: &ImplDef) -> Error {
    Error::OverlappingInstance {
        trait_name: new.trait_ref.name.clone(),
        ty: new.head.to_string(),
        previous_ty: existing.head.to_string(),
        span: new.span,
        previous: existing.span,
    }
}

/// Most-general unification of two impl heads, then a bound re-check
pub fn overlaps(table: &TraitTable, a: &ImplDef, b: &ImplDef) -> bool {
    let mut ctx = InferCtx::new();
    let ia = a.instantiate(&mut ctx);
    let ib = b.instantiate(&mut ctx);

    if ctx.unify(&ia.head, &ib.head, Span::dummy()).is_err() {
        return false;
    }
    if ia.trait_args.len() != ib.trait_args.len() {
        return false;
    }
    for (x, y) in ia.trait_args.iter().zip(&ib.trait_args) {
        if ctx.unify(x, y, Span::dummy()).is_err() {
            return false;
        }
    }

    let overlap = ia
        .obligations
        .iter()
        .chain(&ib.obligations)
        .all(|(ty, bound)| could_hold(table, &mut ctx, ty, bound, RECHECK_DEPTH));
    trace!("overlap {} / {}: {}", a.head, b.head, overlap);
    overlap
}

/// False only when no impl can ever satisfy `ty: bound`
pub fn could_hold(table: &TraitTable, ctx: &mut InferCtx, ty: &Type, bound: &TraitRef, depth: usize) -> bool {
    if depth == 0 {
        return true;
    }
    let ty = ctx.shallow_resolve(ty);
    if matches!(ty, Type::Var(_) | Type::Param(_)) {
        return true;
    }
    table.impls_of(&bound.name).any(|def| {
        let snapshot = ctx.snapshot();
        let inst = def.instantiate(ctx);
        let heads = ctx.unify(&inst.head, &ty, Span::dummy()).is_ok()
            && inst.trait_args.len() == bound.args.len()
            && inst
                .trait_args
                .iter()
                .zip(&bound.args)
                .all(|(x, y)| ctx.unify(x, y, Span::dummy()).is_ok());
        let ok = heads
            && inst
                .obligations
                .iter()
                .all(|(t, b)| could_hold(table, ctx, t, b, depth - 1));
        ctx.rollback(snapshot);
        ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::registry::{ImplId, ImplOrigin, TraitDef};
    use crate::types::{GenericDef, ParamAlloc, ParamRef};
    use crate::utils::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct Fixture {
        table: TraitTable,
        params: ParamAlloc,
    }

    impl Fixture {
        fn new() -> Self {
            let mut params = ParamAlloc::default();
            let mut table = TraitTable::new();
            for name in ["Tr", "Num"] {
                let self_param = params.fresh("Self");
                table.define_trait(TraitDef {
                    name: name.into(),
                    self_param,
                    params: Vec::new(),
                    methods: Vec::new(),
                    builtin: false,
                    span: Span::dummy(),
                });
            }
            let mut fixture = Self { table, params };
            for prim in [Type::INT, Type::UINT] {
                fixture.register("Num", prim, vec![], 0).unwrap();
            }
            fixture
        }

        fn param(&mut self, name: &str) -> ParamRef {
            self.params.fresh(name)
        }

        fn register(&mut self, trait_name: &str, head: Type, generics: Vec<GenericDef>, line: u32) -> Result<ImplId> {
            self.table.register_impl(ImplDef {
                id: ImplId(0),
                trait_ref: TraitRef::new(trait_name, vec![]),
                generics,
                head,
                methods: BTreeMap::new(),
                origin: ImplOrigin::Item(line as usize),
                span: Span::new(0, 0, line, 1, 0),
            })
        }
    }

    fn unbounded(p: &ParamRef) -> GenericDef {
        GenericDef { param: p.clone(), bounds: vec![], span: Span::dummy() }
    }

    #[test]
    fn generic_head_overlaps_concrete_head() {
        let mut fx = Fixture::new();
        let t = fx.param("T");
        fx.register("Tr", Type::adt("Option", vec![Type::Param(t.clone())]), vec![unbounded(&t)], 1)
            .unwrap();
        let err = fx
            .register("Tr", Type::adt("Option", vec![Type::INT]), vec![], 5)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverlappingInstance);
        let Error::OverlappingInstance { ty, previous_ty, span, previous, .. } = err else { unreachable!() };
        assert_eq!(ty, "Option<Int>");
        assert_eq!(previous_ty, "Option<T>");
        assert_eq!((span.line, previous.line), (5, 1));
    }

    #[test]
    fn first_registered_impl_is_blamed() {
        let mut fx = Fixture::new();
        let t = fx.param("T");
        fx.register("Tr", Type::adt("Option", vec![Type::INT]), vec![], 1).unwrap();
        fx.register("Tr", Type::BOOL, vec![], 2).unwrap();
        fx.register("Tr", Type::adt("Pair", vec![Type::INT, Type::INT]), vec![], 3).unwrap();
        let err = fx
            .register("Tr", Type::adt("Option", vec![Type::Param(t.clone())]), vec![unbounded(&t)], 4)
            .unwrap_err();
        let Error::OverlappingInstance { previous, previous_ty, .. } = err else { unreachable!() };
        assert_eq!(previous.line, 1);
        assert_eq!(previous_ty, "Option<Int>");
    }

    #[test]
    fn distinct_heads_do_not_overlap() {
        let mut fx = Fixture::new();
        fx.register("Tr", Type::adt("Option", vec![Type::INT]), vec![], 1).unwrap();
        fx.register("Tr", Type::adt("Option", vec![Type::BOOL]), vec![], 2).unwrap();
        fx.register("Tr", Type::array(Type::INT), vec![], 3).unwrap();
        assert_eq!(fx.table.impls_of("Tr").count(), 3);
    }

    #[test]
    fn unsatisfiable_bounds_prevent_overlap() {
        let mut fx = Fixture::new();
        let t = fx.param("T");
        let bounded = GenericDef { param: t.clone(), bounds: vec![TraitRef::new("Num", vec![])], span: Span::dummy() };
        fx.register("Tr", Type::adt("Option", vec![Type::Param(t.clone())]), vec![bounded], 1)
            .unwrap();
        fx.register("Tr", Type::adt("Option", vec![Type::BOOL]), vec![], 2).unwrap();
        let err = fx.register("Tr", Type::adt("Option", vec![Type::UINT]), vec![], 3);
        assert!(err.is_err());
    }

    #[test]
    fn bounds_satisfied_by_later_impls_still_overlap() {
        let mut fx = Fixture::new();
        let self_param = fx.param("Self");
        fx.table.define_trait(TraitDef {
            name: "Show".into(),
            self_param,
            params: Vec::new(),
            methods: Vec::new(),
            builtin: false,
            span: Span::dummy(),
        });
        let t = fx.param("T");
        let shown = GenericDef { param: t.clone(), bounds: vec![TraitRef::new("Show", vec![])], span: Span::dummy() };
        fx.register("Tr", Type::Param(t.clone()), vec![shown], 1).unwrap();
        fx.register("Tr", Type::BOOL, vec![], 2).unwrap();
        assert!(check_all(&fx.table).is_ok());

        fx.register("Show", Type::BOOL, vec![], 3).unwrap();
        let Error::OverlappingInstance { ty, previous_ty, span, previous, .. } = check_all(&fx.table).unwrap_err()
        else {
            unreachable!()
        };
        assert_eq!((ty.as_str(), previous_ty.as_str()), ("Bool", "T"));
        assert_eq!((span.line, previous.line), (2, 1));
    }

    #[test]
    fn overlap_is_detected_in_both_orders() {
        for flip in [false, true] {
            let mut fx = Fixture::new();
            let t = fx.param("T");
            let generic = (Type::array(Type::Param(t.clone())), vec![unbounded(&t)]);
            let concrete = (Type::array(Type::INT), vec![]);
            let (first, second) = if flip { (concrete, generic) } else { (generic, concrete) };
            fx.register("Tr", first.0, first.1, 1).unwrap();
            assert!(fx.register("Tr", second.0, second.1, 2).is_err());
        }
    }
}
