//! Built-in Functions Registry
//!
//! Native functions every program can call, plus the compiler-owned
//! traits and their fixed instances.

use crate::traits::{ImplDef, ImplId, ImplOrigin, TraitDef, TraitTable};
use crate::types::{FnSig, GenericDef, ParamAlloc, Prim, TraitRef, Type};
use crate::utils::{Result, Span};
use std::collections::{BTreeMap, HashMap};

/// Integer arithmetic and ordering
pub const NUM_TRAIT: &str = "Num";
/// `==` and `!=`
pub const EQ_TRAIT: &str = "Eq";

/// Native function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Println,
    Concat,
    ToString,
    Len,
    Push,
    Panic,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::Print,
        Builtin::Println,
        Builtin::Concat,
        Builtin::ToString,
        Builtin::Len,
        Builtin::Push,
        Builtin::Panic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Concat => "concat",
            Builtin::ToString => "to_string",
            Builtin::Len => "len",
            Builtin::Push => "push",
            Builtin::Panic => "panic",
        }
    }

    /// Declared signature; generic builtins draw their parameters from `params`
    fn signature(self, params: &mut ParamAlloc) -> FnSig {
        let mut generic = |bounds: Vec<TraitRef>| {
            let param = params.fresh("T");
            (Type::Param(param.clone()), GenericDef { param, bounds, span: Span::dummy() })
        };
        match self {
            Builtin::Print | Builtin::Println => FnSig::monomorphic(vec![Type::STRING], Type::UNIT),
            Builtin::Concat => FnSig::monomorphic(vec![Type::STRING, Type::STRING], Type::STRING),
            Builtin::ToString => {
                let (t, def) = generic(vec![TraitRef::new(NUM_TRAIT, vec![])]);
                FnSig { generics: vec![def], params: vec![t], ret: Type::STRING }
            }
            Builtin::Len => {
                let (t, def) = generic(vec![]);
                FnSig { generics: vec![def], params: vec![Type::array(t)], ret: Type::INT }
            }
            Builtin::Push => {
                let (t, def) = generic(vec![]);
                FnSig { generics: vec![def], params: vec![Type::array(t.clone()), t], ret: Type::UNIT }
            }
            Builtin::Panic => {
                let (t, def) = generic(vec![]);
                FnSig { generics: vec![def], params: vec![Type::STRING], ret: t }
            }
        }
    }
}

/// Built-in function signature
#[derive(Debug, Clone)]
pub struct BuiltinFunc {
    pub builtin: Builtin,
    pub sig: FnSig,
}

/// Registry of all built-in functions
#[derive(Debug, Clone, Default)]
pub struct BuiltinRegistry {
    functions: HashMap<String, BuiltinFunc>,
}

impl BuiltinRegistry {
    pub fn new(params: &mut ParamAlloc) -> Self {
        let functions = Builtin::ALL
            .iter()
            .map(|&builtin| {
                let sig = builtin.signature(params);
                (builtin.name().to_string(), BuiltinFunc { builtin, sig })
            })
            .collect();
        Self { functions }
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFunc> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

/// Define `Num` and `Eq` and register their primitive instances
pub fn register_builtin_traits(table: &mut TraitTable, params: &mut ParamAlloc) -> Result<()> {
    for name in [NUM_TRAIT, EQ_TRAIT] {
        table.define_trait(TraitDef {
            name: name.to_string(),
            self_param: params.fresh("Self"),
            params: Vec::new(),
            methods: Vec::new(),
            builtin: true,
            span: Span::dummy(),
        });
    }

    for prim in Prim::ALL {
        if prim.is_integer() {
            register_prim_impl(table, NUM_TRAIT, prim)?;
        }
        register_prim_impl(table, EQ_TRAIT, prim)?;
    }
    Ok(())
}

fn register_prim_impl(table: &mut TraitTable, trait_name: &str, prim: Prim) -> Result<ImplId> {
    table.register_impl(ImplDef {
        id: ImplId(0),
        trait_ref: TraitRef::new(trait_name, vec![]),
        generics: Vec::new(),
        head: Type::Prim(prim),
        methods: BTreeMap::new(),
        origin: ImplOrigin::Builtin,
        span: Span::dummy(),
    })
}
