//! Trait definitions and the global impl table

use crate::traits::coherence;
use crate::types::{FnSig, GenericDef, InferCtx, ParamRef, ParamSubst, Type, TraitRef};
use crate::utils::{Error, Result, Span};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Required method of a trait; `sig.params[0]` is the self parameter
#[derive(Debug, Clone)]
pub struct TraitMethod {
    pub name: String,
    pub sig: FnSig,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TraitDef {
    pub name: String,
    /// Stands for the implementing type inside method signatures
    pub self_param: ParamRef,
    pub params: Vec<ParamRef>,
    pub methods: Vec<TraitMethod>,
    /// Instances are fixed by the compiler
    pub builtin: bool,
    pub span: Span,
}

impl TraitDef {
    pub fn method(&self, name: &str) -> Option<&TraitMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Signature of `method` with `Self` and the trait parameters replaced
    pub fn method_sig_for(&self, method: &str, self_ty: &Type, args: &[Type]) -> Option<FnSig> {
        let method = self.method(method)?;
        let mut subst = ParamSubst::new();
        subst.insert(self.self_param.id, self_ty.clone());
        for (param, arg) in self.params.iter().zip(args) {
            subst.insert(param.id, arg.clone());
        }
        Some(FnSig {
            generics: Vec::new(),
            params: method.sig.params.iter().map(|p| p.subst(&subst)).collect(),
            ret: method.sig.ret.subst(&subst),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImplId(pub usize);

/// Where an impl came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplOrigin {
    Builtin,
    /// Index of the `impl` item in the program
    Item(usize),
}

#[derive(Debug, Clone)]
pub struct ImplDef {
    pub id: ImplId,
    pub trait_ref: TraitRef,
    pub generics: Vec<GenericDef>,
    pub head: Type,
    /// Method signatures, in terms of the impl's generics
    pub methods: BTreeMap<String, FnSig>,
    pub origin: ImplOrigin,
    pub span: Span,
}

/// An impl with its generics replaced by fresh inference variables
#[derive(Debug, Clone)]
pub struct InstantiatedImpl {
    pub subst: ParamSubst,
    pub head: Type,
    pub trait_args: Vec<Type>,
    pub obligations: Vec<(Type, TraitRef)>,
}

impl ImplDef {
    pub fn instantiate(&self, ctx: &mut InferCtx) -> InstantiatedImpl {
        let mut subst = ParamSubst::new();
        for generic in &self.generics {
            subst.insert(generic.param.id, ctx.fresh_var());
        }
        let obligations = self
            .generics
            .iter()
            .flat_map(|g| {
                let ty = Type::Param(g.param.clone()).subst(&subst);
                g.bounds.iter().map(move |b| (ty.clone(), b.clone()))
            })
            .map(|(ty, b)| (ty, b.subst(&subst)))
            .collect();
        InstantiatedImpl {
            head: self.head.subst(&subst),
            trait_args: self.trait_ref.args.iter().map(|a| a.subst(&subst)).collect(),
            obligations,
            subst,
        }
    }
}

/// Trait definitions plus every registered impl, in registration order
#[derive(Debug, Clone, Default)]
pub struct TraitTable {
    traits: BTreeMap<String, TraitDef>,
    impls: Vec<ImplDef>,
    by_trait: HashMap<String, Vec<ImplId>>,
}

impl TraitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_trait(&mut self, def: TraitDef) {
        debug!("trait {} ({} methods)", def.name, def.methods.len());
        self.traits.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&TraitDef> {
        self.traits.get(name)
    }

    /// All traits, ordered by name
    pub fn traits(&self) -> impl Iterator<Item = &TraitDef> {
        self.traits.values()
    }

    pub fn impls_of<'a>(&'a self, trait_name: &str) -> impl Iterator<Item = &'a ImplDef> + 'a {
        self.by_trait
            .get(trait_name)
            .into_iter()
            .flatten()
            .map(move |id| &self.impls[id.0])
    }

    pub fn impl_def(&self, id: ImplId) -> &ImplDef {
        &self.impls[id.0]
    }

    pub fn impls(&self) -> &[ImplDef] {
        &self.impls
    }

    pub fn next_impl_id(&self) -> ImplId {
        ImplId(self.impls.len())
    }

    /// Add an impl after the built-in and coherence checks
    pub fn register_impl(&mut self, mut def: ImplDef) -> Result<ImplId> {
        let trait_name = def.trait_ref.name.clone();
        let trait_def = self.traits.get(&trait_name).ok_or_else(|| Error::UndefinedSymbol {
            name: trait_name.clone(),
            span: def.span,
        })?;
        if trait_def.builtin && def.origin != ImplOrigin::Builtin {
            return Err(Error::BuiltinTraitInstanceForbidden {
                trait_name,
                span: def.span,
            });
        }

        coherence::check_overlap(self, &def)?;

        let id = self.next_impl_id();
        def.id = id;
        debug!("impl {} for {} registered as #{}", def.trait_ref, def.head, id.0);
        self.impls.push(def);
        self.by_trait.entry(trait_name).or_default().push(id);
        Ok(id)
    }

    /// Re-run the overlap check over every pair once all impls are in
    pub fn check_coherence(&self) -> Result<()> {
        coherence::check_all(self)
    }

    /// Select the impl for fully known types, returning the impl's
    /// parameter assignment
    pub fn find_ground(&self, trait_name: &str, self_ty: &Type, args: &[Type]) -> Option<(ImplId, ParamSubst)> {
        self.impls_of(trait_name).find_map(|def| {
            let mut subst = ParamSubst::new();
            let matched = match_type(&def.head, self_ty, &mut subst)
                && def.trait_ref.args.len() == args.len()
                && def
                    .trait_ref
                    .args
                    .iter()
                    .zip(args)
                    .all(|(pattern, arg)| match_type(pattern, arg, &mut subst));
            let bounds_hold = matched
                && def.generics.iter().all(|g| {
                    let ty = Type::Param(g.param.clone()).subst(&subst);
                    g.bounds.iter().all(|b| {
                        let b = b.subst(&subst);
                        self.find_ground(&b.name, &ty, &b.args).is_some()
                    })
                });
            bounds_hold.then_some((def.id, subst))
        })
    }
}

/// One-way structural match of `pattern` (mentioning impl parameters)
/// against a ground type
pub fn match_type(pattern: &Type, ty: &Type, subst: &mut ParamSubst) -> bool {
    match (pattern, ty) {
        (Type::Param(p), _) => match subst.get(&p.id) {
            Some(bound) => bound == ty,
            None => {
                subst.insert(p.id, ty.clone());
                true
            }
        },
        (Type::Prim(a), Type::Prim(b)) => a == b,
        (Type::App(h1, a1), Type::App(h2, a2)) => {
            h1 == h2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(p, t)| match_type(p, t, subst))
        }
        (Type::Fn(p1, r1), Type::Fn(p2, r2)) => {
            p1.len() == p2.len()
                && p1.iter().zip(p2).all(|(p, t)| match_type(p, t, subst))
                && match_type(r1, r2, subst)
        }
        _ => false,
    }
}
