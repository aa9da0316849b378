//! Monomorphization feasibility
//!
//! Every recorded call site must have ground type arguments, up to the
//! enclosing body's own generic parameters. Starting from `main`, each
//! reachable instantiation is then enumerated with those parameters
//! substituted; trait method calls are bound to the impl selected for the
//! now concrete receiver.

use crate::semantic::decls::Decls;
use crate::semantic::targets::{BodyKey, CallTarget, CheckedBody};
use crate::types::{GenericDef, ParamSubst, Type};
use crate::utils::{Error, Result, Span};
use log::{debug, trace};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// One concrete specialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRecord {
    /// `f`, `Owner::method` or `<Head as Trait>::method`
    pub name: String,
    pub type_args: Vec<String>,
}

/// Every specialization reachable from `main`, in discovery order
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonoPlan {
    pub instances: Vec<InstanceRecord>,
}

impl MonoPlan {
    pub fn contains(&self, name: &str, type_args: &[&str]) -> bool {
        self.instances
            .iter()
            .any(|i| i.name == name && i.type_args.iter().map(String::as_str).eq(type_args.iter().copied()))
    }
}

#[derive(Debug)]
struct Instance {
    key: BodyKey,
    subst: ParamSubst,
    type_args: Vec<Type>,
}

pub fn plan(decls: &Decls, bodies: &[(BodyKey, CheckedBody)], limit: usize) -> Result<MonoPlan> {
    check_entry(decls)?;
    check_sites(bodies)?;

    let by_key: HashMap<&BodyKey, &CheckedBody> = bodies.iter().map(|(k, b)| (k, b)).collect();
    let mut planner = Planner {
        decls,
        limit,
        seen: HashSet::new(),
        counts: HashMap::new(),
        queue: VecDeque::new(),
        plan: MonoPlan::default(),
    };
    planner.enqueue(
        Instance {
            key: BodyKey::Function("main".into()),
            subst: ParamSubst::new(),
            type_args: Vec::new(),
        },
        Span::dummy(),
    )?;

    while let Some(instance) = planner.queue.pop_front() {
        let Some(body) = by_key.get(&instance.key) else {
            continue;
        };
        trace!("specializing {} at [{}]", instance.key, join(&instance.type_args));
        check_literals(body, &instance.subst)?;
        for site in &body.sites {
            let target = site.target.map_types(|t| t.subst(&instance.subst));
            if let Some(callee) = planner.callee(&target, site.span)? {
                planner.enqueue(callee, site.span)?;
            }
        }
    }

    debug!("monomorphization: {} instance(s)", planner.plan.instances.len());
    Ok(planner.plan)
}

/// `main` exists, is not generic and takes no arguments
fn check_entry(decls: &Decls) -> Result<()> {
    let main = decls.functions.get("main").ok_or(Error::MissingMain)?;
    if main.sig.is_generic() {
        return Err(Error::CannotInferConcreteType {
            kind: "function".into(),
            name: main.name.clone(),
            span: main.span,
        });
    }
    if !main.sig.params.is_empty() {
        return Err(Error::ArgCountMismatch {
            name: main.name.clone(),
            expected: 0,
            got: main.sig.params.len(),
            span: main.span,
        });
    }
    Ok(())
}

/// No call site may keep an inference variable; the first offender in
/// body order is blamed
fn check_sites(bodies: &[(BodyKey, CheckedBody)]) -> Result<()> {
    for (key, body) in bodies {
        for site in &body.sites {
            if site.target.types().iter().any(|t| t.has_vars()) {
                debug!("under-determined call to {} in {}", site.target.name(), key);
                return Err(Error::CannotInferConcreteType {
                    kind: site.target.kind().into(),
                    name: site.target.name().into(),
                    span: site.span,
                });
            }
        }
    }
    Ok(())
}

/// Literals typed by a generic parameter are range-checked once the
/// parameter is known
fn check_literals(body: &CheckedBody, subst: &ParamSubst) -> Result<()> {
    if subst.is_empty() {
        return Ok(());
    }
    for lit in &body.literals {
        if let Type::Prim(prim) = lit.ty.subst(subst) {
            if !prim.contains(lit.value) {
                return Err(Error::IntegerLiteralOutOfRange {
                    literal: lit.value.to_string(),
                    span: lit.span,
                });
            }
        }
    }
    Ok(())
}

struct Planner<'d> {
    decls: &'d Decls,
    limit: usize,
    seen: HashSet<(BodyKey, Vec<Type>)>,
    counts: HashMap<BodyKey, usize>,
    queue: VecDeque<Instance>,
    plan: MonoPlan,
}

impl<'d> Planner<'d> {
    /// The body a concrete call site enters, if it has one
    fn callee(&self, target: &CallTarget, span: Span) -> Result<Option<Instance>> {
        match target {
            CallTarget::Function { name, type_args } => {
                let Some(def) = self.decls.functions.get(name) else {
                    return Ok(None);
                };
                Ok(Some(Instance {
                    key: BodyKey::Function(name.clone()),
                    subst: subst_of(&def.sig.generics, type_args),
                    type_args: type_args.clone(),
                }))
            }
            CallTarget::InherentMethod { owner, method, type_args } => {
                let Some(def) = self.decls.method(owner, method) else {
                    return Ok(None);
                };
                Ok(Some(Instance {
                    key: BodyKey::Method { owner: owner.clone(), method: method.clone() },
                    subst: subst_of(&def.sig.generics, type_args),
                    type_args: type_args.clone(),
                }))
            }
            CallTarget::TraitMethod { trait_name, method, self_ty, trait_args } => {
                let Some((impl_id, subst)) = self.decls.traits.find_ground(trait_name, self_ty, trait_args) else {
                    return Err(Error::UnsatisfiedConstraint {
                        ty: self_ty.to_string(),
                        trait_name: trait_name.clone(),
                        span,
                    });
                };
                let def = self.decls.traits.impl_def(impl_id);
                let type_args = def
                    .generics
                    .iter()
                    .map(|g| subst.get(&g.param.id).cloned().unwrap_or(Type::UNIT))
                    .collect();
                Ok(Some(Instance {
                    key: BodyKey::ImplMethod { impl_id, method: method.clone() },
                    subst,
                    type_args,
                }))
            }
            CallTarget::Builtin { .. } | CallTarget::Constructor { .. } => Ok(None),
        }
    }

    fn enqueue(&mut self, instance: Instance, span: Span) -> Result<()> {
        if !self.seen.insert((instance.key.clone(), instance.type_args.clone())) {
            return Ok(());
        }
        let name = self.display_name(&instance);
        let count = self.counts.entry(instance.key.clone()).or_default();
        *count += 1;
        if *count > self.limit {
            return Err(Error::PolymorphicRecursion { name, limit: self.limit, span });
        }
        self.plan.instances.push(InstanceRecord {
            name,
            type_args: instance.type_args.iter().map(Type::to_string).collect(),
        });
        self.queue.push_back(instance);
        Ok(())
    }

    fn display_name(&self, instance: &Instance) -> String {
        match &instance.key {
            BodyKey::Function(name) => name.clone(),
            BodyKey::Method { owner, method } => format!("{}::{}", owner, method),
            BodyKey::ImplMethod { impl_id, method } => {
                let def = self.decls.traits.impl_def(*impl_id);
                format!(
                    "<{} as {}>::{}",
                    def.head.subst(&instance.subst),
                    def.trait_ref.subst(&instance.subst),
                    method
                )
            }
        }
    }
}

fn subst_of(generics: &[GenericDef], type_args: &[Type]) -> ParamSubst {
    generics
        .iter()
        .map(|g| g.param.id)
        .zip(type_args.iter().cloned())
        .collect()
}

fn join(types: &[Type]) -> String {
    types.iter().map(Type::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use crate::utils::ErrorKind;
    use crate::{compile, CompileOptions};
    use pretty_assertions::assert_eq;

    fn plan_of(source: &str) -> super::MonoPlan {
        match compile(source, &CompileOptions::default()) {
            Ok(compilation) => compilation.analysis.plan,
            Err(err) => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn generic_functions_are_specialized_per_use() {
        let plan = plan_of(
            "fn id<T>(x: T) -> T { x }\n\
             fn twice<U>(x: U) -> U { id(id(x)) }\n\
             fn main() -> Bool { twice(1); twice(true) }",
        );
        assert!(plan.contains("main", &[]));
        assert!(plan.contains("twice", &["Int"]));
        assert!(plan.contains("twice", &["Bool"]));
        assert!(plan.contains("id", &["Int"]));
        assert!(plan.contains("id", &["Bool"]));
        assert_eq!(plan.instances.len(), 5);
    }

    #[test]
    fn trait_calls_bind_to_the_selected_impl() {
        let plan = plan_of(
            "trait Show { fn show(self) -> String; }\n\
             impl Show for Int { fn show(self) -> String { to_string(self) } }\n\
             impl<T: Show> Show for Option<T> { fn show(self) -> String { match self { Some(x) => x.show(), None => \"none\" } } }\n\
             fn render<T: Show>(x: T) -> String { x.show() }\n\
             fn main() -> String { render(Some(3)) }",
        );
        assert!(plan.contains("render", &["Option<Int>"]));
        assert!(plan.contains("<Option<Int> as Show>::show", &["Int"]));
        assert!(plan.contains("<Int as Show>::show", &[]));
    }

    #[test]
    fn inherent_methods_of_generic_types() {
        let plan = plan_of(
            "struct Pair<A, B> { first: A, second: B }\n\
             impl<A, B> Pair<A, B> { fn swap(self) -> Pair<B, A> { Pair { first: self.second, second: self.first } } }\n\
             fn main() -> Int { let p = Pair { first: true, second: 2 }; p.swap().first }",
        );
        assert!(plan.contains("Pair::swap", &["Bool", "Int"]));
    }

    #[test]
    fn unpinned_constructor_cannot_be_specialized() {
        let err = compile("fn main() { let x = None; }", &CompileOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CannotInferConcreteType);
        assert_eq!(err.to_string(), "cannot infer concrete type of call to constructor None");
    }

    #[test]
    fn unpinned_generic_function_is_named() {
        let err = compile(
            "fn make<T>() -> Array<T> { [] }\nfn main() -> Int { len(make()) }",
            &CompileOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "cannot infer concrete type of call to function make");
    }

    #[test]
    fn polymorphic_recursion_hits_the_limit() {
        let options = CompileOptions { instantiation_limit: 16, ..CompileOptions::default() };
        let err = compile(
            "fn grow<T>(x: T, n: Int) -> Int { if n == 0 { 0 } else { grow(Some(x), n - 1) } }\n\
             fn main() -> Int { grow(1, 3) }",
            &options,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolymorphicRecursion);
        assert_eq!(err.to_string(), "instantiation of grow exceeds the limit of 16 specializations");
    }

    #[test]
    fn generic_literals_are_range_checked_per_instance() {
        let src = "fn small<T: Num>() -> T { 300 }\nfn main() -> UInt8 { small() }";
        let err = compile(src, &CompileOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IntegerLiteralOutOfRange);
        assert_eq!(err.to_string(), "integer literal out of range: 300");
        assert_eq!(err.span().map(|s| (s.line, s.column)), Some((1, 27)));

        let plan = plan_of("fn small<T: Num>() -> T { 300 }\nfn main() -> Int16 { small() }");
        assert!(plan.contains("small", &["Int16"]));
    }

    #[test]
    fn main_must_be_callable_without_arguments() {
        let err = compile("fn main(x: Int) {}", &CompileOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgCountMismatch);
        let err = compile("fn main<T>() {}", &CompileOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "cannot infer concrete type of call to function main");
    }
}
