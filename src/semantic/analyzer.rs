//! Semantic analysis driver
//!
//! Phase 1 declares every name (so bodies may refer forward), then
//! resolves signatures, struct and enum members, traits and impls. Impls
//! are registered in textual order, which fixes the order coherence
//! conflicts are reported in. Phase 2 checks bodies in textual order.
//! Phase 3 checks `main` and plans monomorphization.

use crate::frontend::ast::{self, Item, Program};
use crate::semantic::decls::{owner_name, AdtDef, AdtKind, CtorDef, Decls, FnDef};
use crate::semantic::infer::{params_of, BodyChecker};
use crate::semantic::mono::{self, MonoPlan};
use crate::semantic::scope::{Member, MethodDef, Symbol, SymbolKind, SymbolTable};
use crate::semantic::targets::{BodyKey, CallTarget, CheckedBody};
use crate::traits::{ImplDef, ImplId, ImplOrigin, TraitDef, TraitMethod};
use crate::types::{FnSig, GenericDef, Prim, TraitRef, Type};
use crate::utils::{Error, Result, Span};
use crate::CompileOptions;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

/// Output of semantic analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    pub decls: Decls,
    /// Checked bodies, in textual order
    pub bodies: Vec<(BodyKey, CheckedBody)>,
    /// Call target of every call, method call, constructor and function reference
    pub targets: HashMap<Span, CallTarget>,
    /// Final type of every integer literal (may mention generic parameters)
    pub literals: HashMap<Span, Type>,
    pub plan: MonoPlan,
}

pub fn analyze(program: &Program, options: &CompileOptions) -> Result<Analysis> {
    let mut analyzer = Analyzer::new(program, options)?;
    analyzer.declare_items()?;
    analyzer.resolve_declarations()?;
    analyzer.resolve_impls()?;
    info!(
        "declared {} types, {} functions, {} impls",
        analyzer.decls.adts.len(),
        analyzer.decls.functions.len(),
        analyzer.decls.traits.impls().len()
    );

    let bodies = analyzer.check_bodies()?;
    let Analyzer { decls, .. } = analyzer;
    let plan = mono::plan(&decls, &bodies, options.instantiation_limit)?;

    let mut targets = HashMap::new();
    let mut literals = HashMap::new();
    for (_, body) in &bodies {
        for site in &body.sites {
            targets.insert(site.span, site.target.clone());
        }
        literals.extend(body.literals.iter().map(|lit| (lit.span, lit.ty.clone())));
    }
    Ok(Analysis { decls, bodies, targets, literals, plan })
}

struct Analyzer<'p> {
    program: &'p Program,
    options: &'p CompileOptions,
    decls: Decls,
    /// Owner type of each inherent impl item
    inherent_owners: HashMap<usize, String>,
    /// Registered impl of each trait impl item
    impl_ids: HashMap<usize, ImplId>,
}

impl<'p> Analyzer<'p> {
    fn new(program: &'p Program, options: &'p CompileOptions) -> Result<Self> {
        Ok(Self {
            program,
            options,
            decls: Decls::new()?,
            inherent_owners: HashMap::new(),
            impl_ids: HashMap::new(),
        })
    }

    // ==================== Phase 1: names ====================

    fn declare_items(&mut self) -> Result<()> {
        for item in &self.program.items {
            match item {
                Item::Struct(def) => self.declare_adt(&def.name, &def.generics, AdtKind::Struct, def.span)?,
                Item::Enum(def) => {
                    let ctors = def.variants.iter().map(|v| v.name.name.clone()).collect();
                    self.declare_adt(&def.name, &def.generics, AdtKind::Enum(ctors), def.span)?;
                    for (tag, variant) in def.variants.iter().enumerate() {
                        self.decls.globals.define(Symbol::new(
                            variant.name.name.clone(),
                            SymbolKind::Constructor,
                            Type::UNIT,
                            variant.name.span,
                        ))?;
                        self.decls.ctors.insert(
                            variant.name.name.clone(),
                            CtorDef {
                                name: variant.name.name.clone(),
                                adt: def.name.name.clone(),
                                tag,
                                fields: Vec::new(),
                                span: variant.span,
                            },
                        );
                    }
                }
                Item::Trait(def) => {
                    self.decls.globals.define(Symbol::new(
                        def.name.name.clone(),
                        SymbolKind::Trait,
                        Type::UNIT,
                        def.name.span,
                    ))?;
                    let mut scope = SymbolTable::new();
                    scope.enter_scope();
                    let self_param = self.decls.params.fresh("Self");
                    let mut params = Vec::new();
                    for generic in &def.generics {
                        let param = self.decls.params.fresh(generic.name.name.clone());
                        self.decls.enter_params(&mut scope, [&param], generic.name.span)?;
                        params.push(param);
                    }
                    self.decls.traits.define_trait(TraitDef {
                        name: def.name.name.clone(),
                        self_param,
                        params,
                        methods: Vec::new(),
                        builtin: false,
                        span: def.span,
                    });
                }
                Item::Function(func) => {
                    self.decls.globals.define(Symbol::new(
                        func.sig.name.name.clone(),
                        SymbolKind::Function,
                        Type::UNIT,
                        func.sig.name.span,
                    ))?;
                }
                Item::Impl(_) => {}
            }
        }
        Ok(())
    }

    fn declare_adt(&mut self, name: &ast::Ident, generics: &[ast::GenericParam], kind: AdtKind, span: Span) -> Result<()> {
        if Prim::from_name(&name.name).is_some() || matches!(name.name.as_str(), "Array" | "Self") {
            return Err(Error::DuplicateDefinition { name: name.name.clone(), span: name.span });
        }
        self.decls.globals.define(Symbol::new(name.name.clone(), SymbolKind::Type, Type::UNIT, name.span))?;

        let mut scope = SymbolTable::new();
        scope.enter_scope();
        let mut defs = Vec::with_capacity(generics.len());
        for generic in generics {
            let param = self.decls.params.fresh(generic.name.name.clone());
            self.decls.enter_params(&mut scope, [&param], generic.name.span)?;
            defs.push(GenericDef { param, bounds: Vec::new(), span: generic.name.span });
        }
        debug!("declare type {} with {} parameter(s)", name.name, defs.len());
        self.decls.adts.insert(
            name.name.clone(),
            AdtDef { name: name.name.clone(), generics: defs, kind, span },
        );
        Ok(())
    }

    // ==================== Phase 1: signatures ====================

    fn resolve_declarations(&mut self) -> Result<()> {
        for (index, item) in self.program.items.iter().enumerate() {
            match item {
                Item::Struct(def) => {
                    let scope = self.adt_scope(&def.name.name, &def.generics)?;
                    let mut members = self.decls.members.remove(&def.name.name).unwrap_or_default();
                    for (index, field) in def.fields.iter().enumerate() {
                        let ty = self.decls.resolve_type(&field.ty, &scope, None)?;
                        members.insert(&field.name.name, Member::Field { index, ty, span: field.name.span })?;
                    }
                    self.decls.members.insert(def.name.name.clone(), members);
                }
                Item::Enum(def) => {
                    let scope = self.adt_scope(&def.name.name, &def.generics)?;
                    for variant in &def.variants {
                        let fields = variant
                            .fields
                            .iter()
                            .map(|ty| self.decls.resolve_type(ty, &scope, None))
                            .collect::<Result<Vec<_>>>()?;
                        if let Some(ctor) = self.decls.ctors.get_mut(&variant.name.name) {
                            ctor.fields = fields;
                        }
                    }
                }
                Item::Trait(def) => self.resolve_trait(def)?,
                Item::Function(func) => {
                    let mut scope = SymbolTable::new();
                    scope.enter_scope();
                    let generics =
                        self.decls
                            .declare_generics(&mut scope, &func.sig.generics, &func.sig.where_clause, None)?;
                    let params = self.param_types(&func.sig, &scope, None)?;
                    let ret = self.return_type(&func.sig, &scope, None)?;
                    let name = func.sig.name.name.clone();
                    debug!("declare fn {} ({} generic)", name, generics.len());
                    self.decls.functions.insert(
                        name.clone(),
                        FnDef { name, sig: FnSig { generics, params, ret }, item: index, span: func.span },
                    );
                }
                Item::Impl(_) => {}
            }
        }
        Ok(())
    }

    /// Scope holding an ADT's parameters; also resolves their bounds
    fn adt_scope(&mut self, name: &str, generics: &[ast::GenericParam]) -> Result<SymbolTable> {
        let mut scope = SymbolTable::new();
        scope.enter_scope();
        let Some(adt) = self.decls.adts.get(name) else {
            return Ok(scope);
        };
        for def in adt.generics.clone() {
            self.decls.enter_params(&mut scope, [&def.param], def.span)?;
        }

        let mut bounds = Vec::with_capacity(generics.len());
        for generic in generics {
            let resolved = generic
                .bounds
                .iter()
                .map(|b| self.decls.resolve_bound(b, &scope, None))
                .collect::<Result<Vec<_>>>()?;
            bounds.push(resolved);
        }
        if let Some(adt) = self.decls.adts.get_mut(name) {
            for (def, resolved) in adt.generics.iter_mut().zip(bounds) {
                def.bounds = resolved;
            }
        }
        Ok(scope)
    }

    fn resolve_trait(&mut self, def: &ast::TraitDef) -> Result<()> {
        let Some(mut trait_def) = self.decls.traits.get(&def.name.name).cloned() else {
            return Ok(());
        };
        let mut scope = SymbolTable::new();
        scope.enter_scope();
        self.decls.enter_params(&mut scope, &trait_def.params, def.name.span)?;
        let self_ty = Type::Param(trait_def.self_param.clone());

        let mut methods: Vec<TraitMethod> = Vec::new();
        for sig in &def.methods {
            if let Some(generic) = sig.generics.first() {
                return Err(Error::UnexpectedToken {
                    expected: "'('".into(),
                    got: "'<'".into(),
                    span: generic.span,
                });
            }
            require_self(sig)?;
            if methods.iter().any(|m| m.name == sig.name.name) {
                return Err(Error::DuplicateDefinition { name: sig.name.name.clone(), span: sig.name.span });
            }
            let params = self.param_types(sig, &scope, Some(&self_ty))?;
            let ret = self.return_type(sig, &scope, Some(&self_ty))?;
            methods.push(TraitMethod {
                name: sig.name.name.clone(),
                sig: FnSig::monomorphic(params, ret),
                span: sig.span,
            });
        }
        trait_def.methods = methods;
        self.decls.traits.define_trait(trait_def);
        Ok(())
    }

    fn param_types(&self, sig: &ast::FunctionSig, scope: &SymbolTable, self_ty: Option<&Type>) -> Result<Vec<Type>> {
        let mut types = Vec::with_capacity(sig.params.len());
        for (i, param) in sig.params.iter().enumerate() {
            match (&param.ty, self_ty) {
                (Some(ty), _) => types.push(self.decls.resolve_type(ty, scope, self_ty)?),
                (None, Some(self_ty)) if i == 0 => types.push(self_ty.clone()),
                (None, _) => return Err(Error::ExpectedType { span: param.span }),
            }
        }
        Ok(types)
    }

    fn return_type(&self, sig: &ast::FunctionSig, scope: &SymbolTable, self_ty: Option<&Type>) -> Result<Type> {
        match &sig.ret_type {
            Some(ty) => self.decls.resolve_type(ty, scope, self_ty),
            None => Ok(Type::UNIT),
        }
    }

    // ==================== Phase 1: impls ====================

    fn resolve_impls(&mut self) -> Result<()> {
        for (index, item) in self.program.items.iter().enumerate() {
            if let Item::Impl(block) = item {
                match &block.trait_ref {
                    None => self.resolve_inherent_impl(index, block)?,
                    Some(trait_ref) => self.resolve_trait_impl(index, block, trait_ref)?,
                }
            }
        }
        self.decls.traits.check_coherence()
    }

    fn resolve_inherent_impl(&mut self, index: usize, block: &ast::ImplBlock) -> Result<()> {
        let mut scope = SymbolTable::new();
        scope.enter_scope();
        let impl_generics = self
            .decls
            .declare_generics(&mut scope, &block.generics, &block.where_clause, None)?;
        let target = self.decls.resolve_type(&block.target, &scope, None)?;
        let Some(owner) = owner_name(&target).map(str::to_string) else {
            return Err(Error::UndefinedType { name: target.to_string(), span: block.target.span() });
        };

        let mut members = self.decls.members.remove(&owner).unwrap_or_default();
        for (method_index, method) in block.methods.iter().enumerate() {
            let sig = &method.sig;
            require_self(sig)?;
            if let Some(generic) = sig
                .generics
                .iter()
                .find(|g| impl_generics.iter().any(|d| d.param.name == g.name.name))
            {
                return Err(Error::RepeatedTypeParameter {
                    name: generic.name.name.clone(),
                    span: generic.name.span,
                });
            }
            scope.enter_scope();
            let method_generics = self
                .decls
                .declare_generics(&mut scope, &sig.generics, &sig.where_clause, Some(&target))?;
            let params = self.param_types(sig, &scope, Some(&target))?;
            let ret = self.return_type(sig, &scope, Some(&target))?;
            scope.exit_scope();

            let generics = impl_generics.iter().cloned().chain(method_generics).collect();
            let def = MethodDef {
                owner: owner.clone(),
                name: sig.name.name.clone(),
                sig: FnSig { generics, params, ret },
                item: index,
                index: method_index,
                span: sig.name.span,
            };
            debug!("declare method {}::{}", owner, def.name);
            members.insert(&sig.name.name, Member::Method(def))?;
        }
        self.decls.members.insert(owner.clone(), members);
        self.inherent_owners.insert(index, owner);
        Ok(())
    }

    fn resolve_trait_impl(&mut self, index: usize, block: &ast::ImplBlock, bound: &ast::TraitBound) -> Result<()> {
        let mut scope = SymbolTable::new();
        scope.enter_scope();
        let generics = self
            .decls
            .declare_generics(&mut scope, &block.generics, &block.where_clause, None)?;
        let head = self.decls.resolve_type(&block.target, &scope, None)?;
        let trait_ref: TraitRef = self.decls.resolve_bound(bound, &scope, Some(&head))?;

        let mut methods = BTreeMap::new();
        for method in &block.methods {
            let sig = &method.sig;
            if let Some(generic) = sig.generics.first() {
                return Err(Error::UnexpectedToken {
                    expected: "'('".into(),
                    got: "'<'".into(),
                    span: generic.span,
                });
            }
            require_self(sig)?;
            let params = self.param_types(sig, &scope, Some(&head))?;
            let ret = self.return_type(sig, &scope, Some(&head))?;
            if methods.insert(sig.name.name.clone(), FnSig::monomorphic(params, ret)).is_some() {
                return Err(Error::DuplicateDefinition { name: sig.name.name.clone(), span: sig.name.span });
            }
        }

        let id = self.decls.traits.register_impl(ImplDef {
            id: self.decls.traits.next_impl_id(),
            trait_ref: trait_ref.clone(),
            generics,
            head: head.clone(),
            methods,
            origin: ImplOrigin::Item(index),
            span: block.span,
        })?;
        self.impl_ids.insert(index, id);
        self.check_impl_complete(id, block, &trait_ref, &head)
    }

    /// The impl must define exactly the trait's methods, each with the
    /// trait's signature at `Self = head`
    fn check_impl_complete(&self, id: ImplId, block: &ast::ImplBlock, trait_ref: &TraitRef, head: &Type) -> Result<()> {
        let Some(trait_def) = self.decls.traits.get(&trait_ref.name) else {
            return Ok(());
        };
        let impl_def = self.decls.traits.impl_def(id);

        for method in &block.methods {
            let name = &method.sig.name;
            let Some(expected) = trait_def.method_sig_for(&name.name, head, &trait_ref.args) else {
                return Err(Error::ExtraTraitMethod {
                    trait_name: trait_ref.name.clone(),
                    method: name.name.clone(),
                    span: name.span,
                });
            };
            if let Some(got) = impl_def.methods.get(&name.name) {
                if got.params != expected.params || got.ret != expected.ret {
                    return Err(Error::TraitMethodMismatch {
                        trait_name: trait_ref.name.clone(),
                        method: name.name.clone(),
                        expected: expected.fn_type().to_string(),
                        got: got.fn_type().to_string(),
                        span: method.sig.span,
                    });
                }
            }
        }
        for required in &trait_def.methods {
            if !impl_def.methods.contains_key(&required.name) {
                return Err(Error::MissingTraitMethod {
                    trait_name: trait_ref.name.clone(),
                    ty: head.to_string(),
                    method: required.name.clone(),
                    span: block.span,
                });
            }
        }
        Ok(())
    }

    // ==================== Phase 2: bodies ====================

    fn check_bodies(&self) -> Result<Vec<(BodyKey, CheckedBody)>> {
        let mut bodies = Vec::new();
        for (index, item) in self.program.items.iter().enumerate() {
            match item {
                Item::Function(func) => {
                    let def = &self.decls.functions[&func.sig.name.name];
                    debug!("check fn {}", def.name);
                    let checked = BodyChecker::new(&self.decls, self.options, &def.sig.generics, None, def.sig.ret.clone())?
                        .check(&params_of(&func.sig, &def.sig.params), &func.body)?;
                    bodies.push((BodyKey::Function(def.name.clone()), checked));
                }
                Item::Impl(block) if block.trait_ref.is_none() => {
                    let owner = &self.inherent_owners[&index];
                    for method in &block.methods {
                        let Some(def) = self.decls.method(owner, &method.sig.name.name) else {
                            continue;
                        };
                        debug!("check method {}::{}", owner, def.name);
                        let self_ty = def.sig.params.first().cloned();
                        let checked = BodyChecker::new(&self.decls, self.options, &def.sig.generics, self_ty, def.sig.ret.clone())?
                            .check(&params_of(&method.sig, &def.sig.params), &method.body)?;
                        bodies.push((
                            BodyKey::Method { owner: owner.clone(), method: def.name.clone() },
                            checked,
                        ));
                    }
                }
                Item::Impl(block) => {
                    let id = self.impl_ids[&index];
                    let impl_def = self.decls.traits.impl_def(id);
                    for method in &block.methods {
                        let name = &method.sig.name.name;
                        let Some(sig) = impl_def.methods.get(name) else {
                            continue;
                        };
                        debug!("check impl method {} for {}::{}", impl_def.trait_ref, impl_def.head, name);
                        let checked = BodyChecker::new(
                            &self.decls,
                            self.options,
                            &impl_def.generics,
                            Some(impl_def.head.clone()),
                            sig.ret.clone(),
                        )?
                        .check(&params_of(&method.sig, &sig.params), &method.body)?;
                        bodies.push((BodyKey::ImplMethod { impl_id: id, method: name.clone() }, checked));
                    }
                }
                Item::Struct(_) | Item::Enum(_) | Item::Trait(_) => {}
            }
        }
        Ok(bodies)
    }
}

/// Methods take `self` first
fn require_self(sig: &ast::FunctionSig) -> Result<()> {
    if sig.has_self() {
        return Ok(());
    }
    let (got, span) = match sig.params.first() {
        Some(param) => (format!("identifier {}", param.name.name), param.span),
        None => ("')'".to_string(), sig.span),
    };
    Err(Error::UnexpectedToken { expected: "'self'".into(), got, span })
}

#[cfg(test)]
mod tests {
    use crate::utils::ErrorKind;
    use crate::{compile, CompileOptions};
    use pretty_assertions::assert_eq;

    fn error(source: &str) -> (ErrorKind, String, u32) {
        match compile(source, &CompileOptions::default()) {
            Ok(_) => panic!("expected an error"),
            Err(err) => (err.kind(), err.to_string(), err.span().map_or(0, |s| s.line)),
        }
    }

    #[test]
    fn forward_references_and_mutual_recursion() {
        let src = "fn main() -> Bool { even(10) }\n\
                   fn even(n: Int) -> Bool { if n == 0 { true } else { odd(n - 1) } }\n\
                   fn odd(n: Int) -> Bool { if n == 0 { false } else { even(n - 1) } }";
        assert!(compile(src, &CompileOptions::default()).is_ok());
    }

    #[test]
    fn duplicate_top_level_names() {
        let (kind, msg, line) = error("fn f() {}\nfn f() {}\nfn main() {}");
        assert_eq!(kind, ErrorKind::DuplicateDefinition);
        assert_eq!(msg, "symbol \"f\" is already defined");
        assert_eq!(line, 2);
        assert_eq!(error("enum E { Some }\nfn main() {}").0, ErrorKind::DuplicateDefinition);
        assert_eq!(error("struct Int { x: Int }\nfn main() {}").0, ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn repeated_struct_member_and_type_parameter() {
        assert_eq!(error("struct P { x: Int, x: Bool }\nfn main() {}").0, ErrorKind::DuplicateDefinition);
        assert_eq!(error("struct P<T, T> { x: T }\nfn main() {}").0, ErrorKind::RepeatedTypeParameter);
        assert_eq!(error("fn f<A, A>(x: A) {}\nfn main() {}").0, ErrorKind::RepeatedTypeParameter);
    }

    #[test]
    fn method_generics_may_not_reuse_impl_generics() {
        let (kind, msg, line) = error(
            "struct Box<T> { x: T }\n\
             impl<T> Box<T> {\n  fn get<T>(self) -> Int { 1 }\n}\n\
             fn main() {}",
        );
        assert_eq!(kind, ErrorKind::RepeatedTypeParameter);
        assert_eq!(msg, "type parameter \"T\" is repeated");
        assert_eq!(line, 3);
        let ok = "struct Box<T> { x: T }\n\
                  impl<T> Box<T> { fn map<U>(self, y: U) -> U { y } }\n\
                  fn main() -> Int { let b = Box { x: true }; b.map(1) }";
        assert!(compile(ok, &CompileOptions::default()).is_ok());
    }

    #[test]
    fn conflicting_declared_bounds() {
        let convert = "trait Convert<U> { fn convert(self) -> U; }\n";
        let (kind, msg, line) = error(&format!(
            "{}fn f<T: Convert<Int> + Convert<Bool>>(x: T) -> Int {{ x.convert() }}\nfn main() {{}}",
            convert
        ));
        assert_eq!(kind, ErrorKind::ConflictingConstraint);
        assert_eq!(msg, "type T cannot be constrained by both Convert<Int> and Convert<Bool>");
        assert_eq!(line, 2);
        assert_eq!(
            error(&format!(
                "{}fn f<T: Convert<Int>>(x: T) -> Int where T: Convert<Bool> {{ x.convert() }}\nfn main() {{}}",
                convert
            ))
            .0,
            ErrorKind::ConflictingConstraint
        );
        let repeated = format!(
            "{}fn f<T: Convert<Int>>(x: T) -> Int where T: Convert<Int> {{ x.convert() }}\nfn main() {{}}",
            convert
        );
        assert!(compile(&repeated, &CompileOptions::default()).is_ok());
    }

    #[test]
    fn method_name_colliding_with_field() {
        let (kind, _, line) = error(
            "struct P { size: Int }\n\
             impl P { fn size(self) -> Int { 1 } }\n\
             fn main() {}",
        );
        assert_eq!(kind, ErrorKind::DuplicateDefinition);
        assert_eq!(line, 2);
    }

    #[test]
    fn undefined_names_are_reported_at_the_reference() {
        let (kind, msg, line) = error("fn main() -> Int {\n  let a = 1;\n  a + b\n}");
        assert_eq!(kind, ErrorKind::UndefinedSymbol);
        assert_eq!(msg, "symbol \"b\" is not defined in this scope");
        assert_eq!(line, 3);
        assert_eq!(error("fn f(x: Widget) {}\nfn main() {}").0, ErrorKind::UndefinedSymbol);
        assert_eq!(error("fn f<T>(x: T) where U: Eq {}\nfn main() {}").0, ErrorKind::UndefinedTypeVariable);
    }

    #[test]
    fn type_constructor_arity() {
        assert_eq!(
            error("fn f(x: Option<Int, Int>) {}\nfn main() {}").1,
            "Expected 1 parameter(s) to type constructor Option, but got 2"
        );
    }

    #[test]
    fn builtin_trait_instances_are_forbidden() {
        let (kind, msg, _) = error(
            "struct Money { cents: Int }\n\
             impl Num for Money {}\n\
             fn main() {}",
        );
        assert_eq!(kind, ErrorKind::BuiltinTraitInstanceForbidden);
        assert_eq!(msg, "cannot add new instances to built-in trait Num");
    }

    #[test]
    fn impl_completeness() {
        let show = "trait Show { fn show(self) -> String; }\n";
        assert_eq!(
            error(&format!("{}impl Show for Int {{}}\nfn main() {{}}", show)).1,
            "impl of trait Show for type Int is missing method show"
        );
        assert_eq!(
            error(&format!(
                "{}impl Show for Int {{ fn show(self) -> String {{ \"\" }} fn extra(self) {{}} }}\nfn main() {{}}",
                show
            ))
            .0,
            ErrorKind::ExtraTraitMethod
        );
        assert_eq!(
            error(&format!("{}impl Show for Int {{ fn show(self) -> Int {{ 1 }} }}\nfn main() {{}}", show)).1,
            "method show does not match trait Show: expected fn(Int) -> String, but got fn(Int) -> Int"
        );
    }

    #[test]
    fn overlapping_impls_blame_the_later_one() {
        let src = "trait Tr { fn go(self) -> Int; }\n\
                   impl<T> Tr for Option<T> { fn go(self) -> Int { 1 } }\n\
                   impl Tr for Bool { fn go(self) -> Int { 2 } }\n\
                   impl Tr for Option<Int> { fn go(self) -> Int { 3 } }\n\
                   fn main() {}";
        let err = compile(src, &CompileOptions::default()).unwrap_err();
        match err {
            crate::utils::Error::OverlappingInstance { ty, previous_ty, span, previous, .. } => {
                assert_eq!((ty.as_str(), previous_ty.as_str()), ("Option<Int>", "Option<T>"));
                assert_eq!((span.line, previous.line), (4, 2));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn methods_need_a_receiver() {
        assert_eq!(
            error("struct P { x: Int }\nimpl P { fn make() -> Int { 1 } }\nfn main() {}").1,
            "expected 'self', but got ')'"
        );
    }

    #[test]
    fn missing_main() {
        assert_eq!(
            compile("fn helper() {}", &CompileOptions::default()).unwrap_err().kind(),
            ErrorKind::MissingMain
        );
    }
}
