//! Program-wide declarations collected before any body is checked

use crate::frontend::ast;
use crate::semantic::scope::{Member, MemberTable, MethodDef, Symbol, SymbolKind, SymbolTable};
use crate::stdlib::{register_builtin_traits, BuiltinRegistry};
use crate::traits::TraitTable;
use crate::types::{FnSig, GenericDef, ParamAlloc, ParamRef, ParamSubst, Prim, TraitRef, Type, TypeHead};
use crate::utils::{Error, Result, Span};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub enum AdtKind {
    Struct,
    /// Constructor names in declaration order
    Enum(Vec<String>),
}

/// User or prelude struct/enum
#[derive(Debug, Clone)]
pub struct AdtDef {
    pub name: String,
    pub generics: Vec<GenericDef>,
    pub kind: AdtKind,
    pub span: Span,
}

impl AdtDef {
    pub fn params(&self) -> impl Iterator<Item = &ParamRef> {
        self.generics.iter().map(|g| &g.param)
    }

    /// Substitution taking the declared parameters to `args`
    pub fn subst_for(&self, args: &[Type]) -> ParamSubst {
        self.params().map(|p| p.id).zip(args.iter().cloned()).collect()
    }
}

/// Value constructor of an enum; `fields` mention the enum's parameters
#[derive(Debug, Clone)]
pub struct CtorDef {
    pub name: String,
    pub adt: String,
    pub tag: usize,
    pub fields: Vec<Type>,
    pub span: Span,
}

/// Top-level function
#[derive(Debug, Clone)]
pub struct FnDef {
    pub name: String,
    pub sig: FnSig,
    /// Index of the item in the program
    pub item: usize,
    pub span: Span,
}

/// Everything the body checker may refer to
#[derive(Debug, Clone)]
pub struct Decls {
    pub params: ParamAlloc,
    pub globals: SymbolTable,
    pub adts: BTreeMap<String, AdtDef>,
    pub ctors: HashMap<String, CtorDef>,
    pub functions: BTreeMap<String, FnDef>,
    pub builtins: BuiltinRegistry,
    /// Fields and inherent methods, keyed by the owning type's head name
    pub members: HashMap<String, MemberTable>,
    pub traits: TraitTable,
}

impl Decls {
    pub fn new() -> Result<Self> {
        let mut params = ParamAlloc::default();
        let builtins = BuiltinRegistry::new(&mut params);
        let mut traits = TraitTable::new();
        register_builtin_traits(&mut traits, &mut params)?;

        let mut globals = SymbolTable::new();
        for name in builtins.names() {
            globals.define(Symbol::new(name, SymbolKind::Builtin, Type::UNIT, Span::dummy()))?;
        }
        for def in traits.traits() {
            globals.define(Symbol::new(&def.name, SymbolKind::Trait, Type::UNIT, Span::dummy()))?;
        }

        Ok(Self {
            params,
            globals,
            adts: BTreeMap::new(),
            ctors: HashMap::new(),
            functions: BTreeMap::new(),
            builtins,
            members: HashMap::new(),
            traits,
        })
    }

    pub fn member(&self, owner: &str, name: &str) -> Option<&Member> {
        self.members.get(owner)?.get(name)
    }

    pub fn method(&self, owner: &str, name: &str) -> Option<&MethodDef> {
        match self.member(owner, name)? {
            Member::Method(def) => Some(def),
            Member::Field { .. } => None,
        }
    }

    /// Constructors of an enum, in declaration order
    pub fn enum_ctors(&self, adt: &str) -> Option<&[String]> {
        match &self.adts.get(adt)?.kind {
            AdtKind::Enum(ctors) => Some(ctors),
            AdtKind::Struct => None,
        }
    }

    // ==================== Type Resolution ====================

    /// Resolve a written type. `scope` supplies the generic parameters in
    /// view; `self_ty` is what `Self` stands for, if anything.
    pub fn resolve_type(&self, ty: &ast::Type, scope: &SymbolTable, self_ty: Option<&Type>) -> Result<Type> {
        match ty {
            ast::Type::Function { params, ret, .. } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type(p, scope, self_ty))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Type::func(params, self.resolve_type(ret, scope, self_ty)?))
            }
            ast::Type::Named { name, args, span } => {
                let arity = |expected: usize| {
                    if args.len() == expected {
                        Ok(())
                    } else {
                        Err(Error::TypeArityMismatch {
                            name: name.clone(),
                            expected,
                            got: args.len(),
                            span: *span,
                        })
                    }
                };
                let resolved = args
                    .iter()
                    .map(|a| self.resolve_type(a, scope, self_ty))
                    .collect::<Result<Vec<_>>>()?;

                if name == "Self" {
                    arity(0)?;
                    return self_ty.cloned().ok_or_else(|| Error::UndefinedType {
                        name: name.clone(),
                        span: *span,
                    });
                }
                if let Some(prim) = Prim::from_name(name) {
                    arity(0)?;
                    return Ok(Type::Prim(prim));
                }
                if name == "Array" {
                    arity(1)?;
                    return Ok(Type::App(TypeHead::Array, resolved));
                }

                let symbol = scope.lookup_type(name).or_else(|| self.globals.lookup_type(name));
                match symbol {
                    Some(sym) if sym.kind == SymbolKind::TypeParameter => {
                        arity(0)?;
                        Ok(sym.ty.clone())
                    }
                    Some(sym) if sym.kind == SymbolKind::Type => {
                        let expected = self.adts.get(name).map_or(0, |adt| adt.generics.len());
                        arity(expected)?;
                        Ok(Type::adt(name.clone(), resolved))
                    }
                    _ => Err(Error::UndefinedType { name: name.clone(), span: *span }),
                }
            }
        }
    }

    pub fn resolve_bound(&self, bound: &ast::TraitBound, scope: &SymbolTable, self_ty: Option<&Type>) -> Result<TraitRef> {
        let name = &bound.name.name;
        let def = match self.globals.lookup_type(name) {
            Some(sym) if sym.kind == SymbolKind::Trait => self.traits.get(name),
            _ => None,
        };
        let def = def.ok_or_else(|| Error::UndefinedSymbol {
            name: name.clone(),
            span: bound.name.span,
        })?;
        if def.params.len() != bound.args.len() {
            return Err(Error::TypeArityMismatch {
                name: name.clone(),
                expected: def.params.len(),
                got: bound.args.len(),
                span: bound.span,
            });
        }
        let args = bound
            .args
            .iter()
            .map(|a| self.resolve_type(a, scope, self_ty))
            .collect::<Result<Vec<_>>>()?;
        Ok(TraitRef::new(name.clone(), args))
    }

    /// Bring already allocated parameters into `scope`
    pub fn enter_params<'p>(&self, scope: &mut SymbolTable, params: impl IntoIterator<Item = &'p ParamRef>, span: Span) -> Result<()> {
        for param in params {
            scope.define(Symbol::new(
                param.name.clone(),
                SymbolKind::TypeParameter,
                Type::Param(param.clone()),
                span,
            ))?;
        }
        Ok(())
    }

    /// Allocate parameters for `generics`, define them in `scope`, then
    /// resolve their inline bounds and the `where` clause
    pub fn declare_generics(
        &mut self,
        scope: &mut SymbolTable,
        generics: &[ast::GenericParam],
        where_clause: &[ast::WherePredicate],
        self_ty: Option<&Type>,
    ) -> Result<Vec<GenericDef>> {
        let mut defs = Vec::with_capacity(generics.len());
        for generic in generics {
            let param = self.params.fresh(generic.name.name.clone());
            scope.define(Symbol::new(
                generic.name.name.clone(),
                SymbolKind::TypeParameter,
                Type::Param(param.clone()),
                generic.name.span,
            ))?;
            defs.push(GenericDef { param, bounds: Vec::new(), span: generic.name.span });
        }
        for (def, generic) in defs.iter_mut().zip(generics) {
            for bound in &generic.bounds {
                let resolved = self.resolve_bound(bound, scope, self_ty)?;
                add_bound(def, resolved, bound.span)?;
            }
        }
        for pred in where_clause {
            let target = defs.iter().position(|d| d.param.name == pred.param.name);
            let Some(index) = target else {
                return Err(Error::UndefinedTypeVariable {
                    name: pred.param.name.clone(),
                    span: pred.param.span,
                });
            };
            for bound in &pred.bounds {
                let resolved = self.resolve_bound(bound, scope, self_ty)?;
                add_bound(&mut defs[index], resolved, bound.span)?;
            }
        }
        Ok(defs)
    }
}

/// One parameter may carry a trait only once, at one argument list
fn add_bound(def: &mut GenericDef, bound: TraitRef, span: Span) -> Result<()> {
    match def.bounds.iter().find(|b| b.name == bound.name) {
        Some(existing) if *existing == bound => Ok(()),
        Some(existing) => Err(Error::ConflictingConstraint {
            ty: def.param.name.clone(),
            existing: existing.to_string(),
            new: bound.to_string(),
            span,
        }),
        None => {
            def.bounds.push(bound);
            Ok(())
        }
    }
}

/// Key of the member table a receiver type looks in
pub fn owner_name(ty: &Type) -> Option<&str> {
    match ty {
        Type::Prim(p) => Some(p.name()),
        other => other.head_name(),
    }
}
