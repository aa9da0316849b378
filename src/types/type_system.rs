//! Type terms for the Spl type checker

use crate::utils::Span;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Prim {
    Int,
    UInt,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    Bool,
    String,
    Unit,
}

impl Prim {
    pub const ALL: [Prim; 11] = [
        Prim::Int,
        Prim::UInt,
        Prim::Int8,
        Prim::Int16,
        Prim::Int32,
        Prim::UInt8,
        Prim::UInt16,
        Prim::UInt32,
        Prim::Bool,
        Prim::String,
        Prim::Unit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prim::Int => "Int",
            Prim::UInt => "UInt",
            Prim::Int8 => "Int8",
            Prim::Int16 => "Int16",
            Prim::Int32 => "Int32",
            Prim::UInt8 => "UInt8",
            Prim::UInt16 => "UInt16",
            Prim::UInt32 => "UInt32",
            Prim::Bool => "Bool",
            Prim::String => "String",
            Prim::Unit => "Unit",
        }
    }

    pub fn from_name(name: &str) -> Option<Prim> {
        Prim::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Type named by an integer literal suffix
    pub fn from_suffix(suffix: &str) -> Option<Prim> {
        match suffix {
            "i" => Some(Prim::Int),
            "u" => Some(Prim::UInt),
            "i8" => Some(Prim::Int8),
            "i16" => Some(Prim::Int16),
            "i32" => Some(Prim::Int32),
            "u8" => Some(Prim::UInt8),
            "u16" => Some(Prim::UInt16),
            "u32" => Some(Prim::UInt32),
            _ => None,
        }
    }

    pub fn is_integer(self) -> bool {
        self.bits().is_some()
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Prim::Int | Prim::Int8 | Prim::Int16 | Prim::Int32)
    }

    /// Width in bits for integer types
    pub fn bits(self) -> Option<u32> {
        match self {
            Prim::Int | Prim::UInt => Some(64),
            Prim::Int32 | Prim::UInt32 => Some(32),
            Prim::Int16 | Prim::UInt16 => Some(16),
            Prim::Int8 | Prim::UInt8 => Some(8),
            _ => None,
        }
    }

    /// Inclusive value range of an integer type
    pub fn range(self) -> Option<(i128, i128)> {
        let bits = self.bits()?;
        if self.is_signed() {
            let max = (1i128 << (bits - 1)) - 1;
            Some((-max - 1, max))
        } else {
            Some((0, (1i128 << bits) - 1))
        }
    }

    pub fn contains(self, value: i128) -> bool {
        self.range().map_or(false, |(lo, hi)| lo <= value && value <= hi)
    }

    /// Wrap an integer into this type's range (two's complement)
    pub fn wrap(self, value: i128) -> i128 {
        let Some(bits) = self.bits() else { return value };
        let modulus = 1i128 << bits;
        let mut v = value.rem_euclid(modulus);
        if self.is_signed() && v >= modulus / 2 {
            v -= modulus;
        }
        v
    }
}

/// Inference variable, an index into the per-body arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TyVarId(pub u32);

/// A declared (rigid) generic parameter; `id` is unique per compilation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParamRef {
    pub id: u32,
    pub name: String,
}

/// Hands out compilation-unique parameter ids
#[derive(Debug, Clone, Default)]
pub struct ParamAlloc {
    next: u32,
}

impl ParamAlloc {
    pub fn fresh(&mut self, name: impl Into<String>) -> ParamRef {
        let id = self.next;
        self.next += 1;
        ParamRef { id, name: name.into() }
    }
}

/// Head constructor of a generic application
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeHead {
    /// User or prelude struct/enum
    Adt(String),
    /// Built-in growable array
    Array,
}

/// Type term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Prim(Prim),
    Var(TyVarId),
    Param(ParamRef),
    App(TypeHead, Vec<Type>),
    Fn(Vec<Type>, Box<Type>),
}

/// Parameter -> type substitution, keyed by `ParamRef::id`
pub type ParamSubst = HashMap<u32, Type>;

impl Type {
    pub const INT: Type = Type::Prim(Prim::Int);
    pub const UINT: Type = Type::Prim(Prim::UInt);
    pub const BOOL: Type = Type::Prim(Prim::Bool);
    pub const STRING: Type = Type::Prim(Prim::String);
    pub const UNIT: Type = Type::Prim(Prim::Unit);

    pub fn adt(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::App(TypeHead::Adt(name.into()), args)
    }

    pub fn array(elem: Type) -> Self {
        Type::App(TypeHead::Array, vec![elem])
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Self {
        Type::Fn(params, Box::new(ret))
    }

    /// Name of the nominal head, if any (`Option` for `Option<Int>`)
    pub fn head_name(&self) -> Option<&str> {
        match self {
            Type::App(TypeHead::Adt(name), _) => Some(name),
            Type::App(TypeHead::Array, _) => Some("Array"),
            _ => None,
        }
    }

    /// Replace declared parameters according to `subst`
    pub fn subst(&self, subst: &ParamSubst) -> Type {
        match self {
            Type::Param(p) => subst.get(&p.id).cloned().unwrap_or_else(|| self.clone()),
            Type::App(head, args) => Type::App(head.clone(), args.iter().map(|a| a.subst(subst)).collect()),
            Type::Fn(params, ret) => Type::Fn(
                params.iter().map(|p| p.subst(subst)).collect(),
                Box::new(ret.subst(subst)),
            ),
            Type::Prim(_) | Type::Var(_) => self.clone(),
        }
    }

    /// Visit every subterm, outermost first
    pub fn walk(&self, f: &mut impl FnMut(&Type)) {
        f(self);
        match self {
            Type::App(_, args) => args.iter().for_each(|a| a.walk(f)),
            Type::Fn(params, ret) => {
                params.iter().for_each(|p| p.walk(f));
                ret.walk(f);
            }
            Type::Prim(_) | Type::Var(_) | Type::Param(_) => {}
        }
    }

    pub fn has_vars(&self) -> bool {
        let mut found = false;
        self.walk(&mut |t| found |= matches!(t, Type::Var(_)));
        found
    }

    pub fn has_params(&self) -> bool {
        let mut found = false;
        self.walk(&mut |t| found |= matches!(t, Type::Param(_)));
        found
    }

    /// No variables and no parameters
    pub fn is_ground(&self) -> bool {
        !self.has_vars() && !self.has_params()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(p) => write!(f, "{}", p.name()),
            Type::Var(v) => write!(f, "a{}", v.0),
            Type::Param(p) => write!(f, "{}", p.name),
            Type::App(head, args) => {
                match head {
                    TypeHead::Adt(name) => write!(f, "{}", name)?,
                    TypeHead::Array => write!(f, "Array")?,
                }
                if !args.is_empty() {
                    write!(f, "<{}>", join(args))?;
                }
                Ok(())
            }
            Type::Fn(params, ret) => write!(f, "fn({}) -> {}", join(params), ret),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

/// A trait applied to its non-self arguments: `Convert<Int>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TraitRef {
    pub name: String,
    pub args: Vec<Type>,
}

impl TraitRef {
    pub fn new(name: impl Into<String>, args: Vec<Type>) -> Self {
        Self { name: name.into(), args }
    }

    pub fn subst(&self, subst: &ParamSubst) -> TraitRef {
        TraitRef {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.subst(subst)).collect(),
        }
    }
}

impl fmt::Display for TraitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<{}>", join(&self.args))?;
        }
        Ok(())
    }
}

/// Declared generic parameter with its bounds
#[derive(Debug, Clone, PartialEq)]
pub struct GenericDef {
    pub param: ParamRef,
    pub bounds: Vec<TraitRef>,
    /// Where the parameter is declared
    pub span: Span,
}

/// Polymorphic function signature
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub generics: Vec<GenericDef>,
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FnSig {
    pub fn monomorphic(params: Vec<Type>, ret: Type) -> Self {
        Self { generics: Vec::new(), params, ret }
    }

    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn fn_type(&self) -> Type {
        Type::func(self.params.clone(), self.ret.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(id: u32, name: &str) -> Type {
        Type::Param(ParamRef { id, name: name.to_string() })
    }

    #[test]
    fn display_forms() {
        let ty = Type::func(vec![Type::adt("Option", vec![Type::INT])], Type::array(param(0, "T")));
        assert_eq!(ty.to_string(), "fn(Option<Int>) -> Array<T>");
        assert_eq!(Type::Var(TyVarId(3)).to_string(), "a3");
        assert_eq!(TraitRef::new("Convert", vec![Type::BOOL]).to_string(), "Convert<Bool>");
    }

    #[test]
    fn integer_ranges() {
        assert!(Prim::Int.contains(i64::MAX as i128));
        assert!(!Prim::Int.contains(1i128 << 63));
        assert!(Prim::UInt.contains(1i128 << 63));
        assert!(!Prim::UInt.contains(-1));
        assert_eq!(Prim::UInt8.range(), Some((0, 255)));
        assert_eq!(Prim::Bool.range(), None);
    }

    #[test]
    fn wrapping() {
        assert_eq!(Prim::Int8.wrap(128), -128);
        assert_eq!(Prim::UInt8.wrap(-1), 255);
        assert_eq!(Prim::Int.wrap(i64::MAX as i128 + 1), i64::MIN as i128);
    }

    #[test]
    fn substitution_replaces_params_only() {
        let mut subst = ParamSubst::new();
        subst.insert(0, Type::BOOL);
        let ty = Type::adt("Pair", vec![param(0, "A"), param(1, "B")]);
        assert_eq!(ty.subst(&subst), Type::adt("Pair", vec![Type::BOOL, param(1, "B")]));
        assert!(!ty.is_ground());
        assert!(Type::adt("Pair", vec![Type::INT, Type::BOOL]).is_ground());
    }
}
