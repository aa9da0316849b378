//! Runtime values of the reference evaluator

use crate::semantic::CallTarget;
use crate::types::Prim;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Storage shared by every copy of one array
pub type Elements = Arc<RwLock<Vec<Value>>>;

#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    /// Integer of any width; `value` is always inside `prim`'s range
    Int { value: i128, prim: Prim },
    Str(String),
    /// Enum value
    Adt { ctor: String, tag: usize, fields: Vec<Value> },
    /// Struct value, fields in declaration order
    Struct { name: String, fields: Vec<(String, Value)> },
    /// Arrays are shared and mutable
    Array(Elements),
    /// Function reference with its type arguments fixed
    Func(CallTarget),
}

impl Value {
    pub fn int(value: i128) -> Self {
        Value::Int { value, prim: Prim::Int }
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(elements)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "Unit",
            Value::Bool(_) => "Bool",
            Value::Int { prim, .. } => prim.name(),
            Value::Str(_) => "String",
            Value::Adt { .. } => "enum",
            Value::Struct { .. } => "struct",
            Value::Array(_) => "Array",
            Value::Func(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int { value: a, prim: p }, Value::Int { value: b, prim: q }) => a == b && p == q,
            (Value::Str(a), Value::Str(b)) => a == b,
            (
                Value::Adt { ctor: c1, tag: t1, fields: f1 },
                Value::Adt { ctor: c2, tag: t2, fields: f2 },
            ) => c1 == c2 && t1 == t2 && f1 == f2,
            (Value::Struct { name: n1, fields: f1 }, Value::Struct { name: n2, fields: f2 }) => {
                n1 == n2 && f1 == f2
            }
            // Arrays compare by contents; the same storage is trivially equal
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || *read(a) == *read(b),
            (Value::Func(a), Value::Func(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int { value, .. } => write!(f, "{}", value),
            Value::Str(s) => write!(f, "{}", s),
            Value::Adt { ctor, fields, .. } => {
                write!(f, "{}", ctor)?;
                if !fields.is_empty() {
                    write!(f, "({})", join(fields.iter()))?;
                }
                Ok(())
            }
            Value::Struct { name, fields } => {
                let fields: Vec<_> = fields.iter().map(|(n, v)| format!("{}: {}", n, v)).collect();
                write!(f, "{} {{ {} }}", name, fields.join(", "))
            }
            Value::Array(elements) => write!(f, "[{}]", join(read(elements).iter())),
            Value::Func(target) => write!(f, "<fn {}>", target.name()),
        }
    }
}

pub fn read(elements: &Elements) -> RwLockReadGuard<'_, Vec<Value>> {
    elements.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write(elements: &Elements) -> RwLockWriteGuard<'_, Vec<Value>> {
    elements.write().unwrap_or_else(PoisonError::into_inner)
}

fn join<'v>(values: impl Iterator<Item = &'v Value>) -> String {
    values.map(Value::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        let some = Value::Adt { ctor: "Some".into(), tag: 0, fields: vec![Value::int(5)] };
        assert_eq!(some.to_string(), "Some(5)");
        let pair = Value::Struct {
            name: "Pair".into(),
            fields: vec![("first".into(), Value::Bool(true)), ("second".into(), Value::Str("x".into()))],
        };
        assert_eq!(pair.to_string(), "Pair { first: true, second: x }");
        assert_eq!(Value::array(vec![Value::int(1), Value::int(2)]).to_string(), "[1, 2]");
    }

    #[test]
    fn arrays_share_storage() {
        let a = Value::array(Vec::new());
        let b = a.clone();
        if let Value::Array(cells) = &a {
            write(cells).push(Value::Unit);
        }
        assert_eq!(b.to_string(), "[()]");
    }
}
