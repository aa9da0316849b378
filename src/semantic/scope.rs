//! Symbol tables
//!
//! `SymbolTable` holds lexical scopes with separate value and type
//! namespaces. `MemberTable` holds the fields and inherent methods of one
//! type in a single namespace, so a method can never shadow a field.

use crate::types::{FnSig, Type};
use crate::utils::{Error, Result, Span};
use std::collections::{BTreeMap, HashMap};

// ==================== Symbol Table ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Kind of symbol; fixed when the symbol is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Builtin,
    Constructor,
    Type,
    Trait,
    TypeParameter,
}

impl SymbolKind {
    fn is_type_level(self) -> bool {
        matches!(self, SymbolKind::Type | SymbolKind::Trait | SymbolKind::TypeParameter)
    }
}

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type, span: Span) -> Self {
        Self { name: name.into(), kind, ty, span }
    }
}

/// A scope containing symbols
#[derive(Debug, Clone)]
struct Scope {
    parent: Option<ScopeId>,
    values: HashMap<String, Symbol>,
    types: HashMap<String, Symbol>,
}

impl Scope {
    fn new(parent: Option<ScopeId>) -> Self {
        Self { parent, values: HashMap::new(), types: HashMap::new() }
    }

    fn namespace(&self, kind: SymbolKind) -> &HashMap<String, Symbol> {
        if kind.is_type_level() {
            &self.types
        } else {
            &self.values
        }
    }
}

/// Symbol table with nested scopes
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None)],
            current: ScopeId(0),
        }
    }

    /// Enter a new scope
    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(Some(self.current)));
        self.current = id;
        id
    }

    /// Exit the current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    /// Define a symbol in the current scope. Outer scopes may be shadowed,
    /// the current one may not.
    pub fn define(&mut self, symbol: Symbol) -> Result<()> {
        let global = self.scopes[self.current.0].parent.is_none();
        let scope = &mut self.scopes[self.current.0];
        if let Some(existing) = scope.namespace(symbol.kind).get(&symbol.name) {
            let (name, span) = (symbol.name.clone(), symbol.span);
            return Err(match (existing.kind, symbol.kind) {
                (SymbolKind::TypeParameter, SymbolKind::TypeParameter) => {
                    Error::RepeatedTypeParameter { name, span }
                }
                _ if global => Error::DuplicateDefinition { name, span },
                _ => Error::DuplicateLocal { name, span },
            });
        }
        let namespace = if symbol.kind.is_type_level() { &mut scope.types } else { &mut scope.values };
        namespace.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    fn lookup_in(&self, name: &str, types: bool) -> Option<&Symbol> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            let scope = &self.scopes[id.0];
            let found = if types { scope.types.get(name) } else { scope.values.get(name) };
            if found.is_some() {
                return found;
            }
            scope_id = scope.parent;
        }
        None
    }

    /// Look up a value-level symbol, searching from current scope upward
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.lookup_in(name, false)
    }

    /// Look up a type-level symbol (type, trait or type parameter)
    pub fn lookup_type(&self, name: &str) -> Option<&Symbol> {
        self.lookup_in(name, true)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Member Table ====================

/// Inherent method of a type; `sig.params[0]` is the receiver and
/// `sig.generics` lists the impl's generics followed by the method's own
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub owner: String,
    pub name: String,
    pub sig: FnSig,
    /// Index of the `impl` item and of the method inside it
    pub item: usize,
    pub index: usize,
    pub span: Span,
}

/// Entry of a type's member table
#[derive(Debug, Clone)]
pub enum Member {
    /// Struct field; `ty` is in terms of the struct's parameters
    Field { index: usize, ty: Type, span: Span },
    Method(MethodDef),
}

impl Member {
    pub fn span(&self) -> Span {
        match self {
            Member::Field { span, .. } => *span,
            Member::Method(m) => m.span,
        }
    }
}

/// Fields and inherent methods of one type
#[derive(Debug, Clone, Default)]
pub struct MemberTable {
    entries: BTreeMap<String, Member>,
}

impl MemberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member; any existing member of the same name conflicts,
    /// whatever its kind
    pub fn insert(&mut self, name: &str, member: Member) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::DuplicateDefinition {
                name: name.to_string(),
                span: member.span(),
            });
        }
        self.entries.insert(name.to_string(), member);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.entries.get(name)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> Vec<(&str, &Type)> {
        let mut fields: Vec<_> = self
            .entries
            .iter()
            .filter_map(|(name, m)| match m {
                Member::Field { index, ty, .. } => Some((*index, name.as_str(), ty)),
                Member::Method(_) => None,
            })
            .collect();
        fields.sort_by_key(|(index, _, _)| *index);
        fields.into_iter().map(|(_, name, ty)| (name, ty)).collect()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.entries.values().filter_map(|m| match m {
            Member::Method(def) => Some(def),
            Member::Field { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ErrorKind;
    use pretty_assertions::assert_eq;

    fn var(name: &str, line: u32) -> Symbol {
        Symbol::new(name, SymbolKind::Variable, Type::INT, Span::new(0, 1, line, 1, 0))
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut table = SymbolTable::new();
        table.define(var("x", 1)).unwrap();
        table.enter_scope();
        table.define(Symbol::new("x", SymbolKind::Variable, Type::BOOL, Span::dummy())).unwrap();
        assert_eq!(table.lookup("x").unwrap().ty, Type::BOOL);
        table.exit_scope();
        assert_eq!(table.lookup("x").unwrap().ty, Type::INT);
    }

    #[test]
    fn same_scope_redefinition_fails() {
        let mut table = SymbolTable::new();
        let err = {
            table.define(var("f", 1)).unwrap();
            table.define(var("f", 2)).unwrap_err()
        };
        assert_eq!(err.to_string(), "symbol \"f\" is already defined");

        table.enter_scope();
        table.define(var("y", 3)).unwrap();
        let err = table.define(var("y", 4)).unwrap_err();
        assert_eq!(err.to_string(), "symbol \"y\" is already defined in this scope");
        assert_eq!(err.span().map(|s| s.line), Some(4));
    }

    #[test]
    fn values_and_types_live_apart() {
        let mut table = SymbolTable::new();
        table.define(Symbol::new("Pair", SymbolKind::Type, Type::UNIT, Span::dummy())).unwrap();
        table.define(Symbol::new("Pair", SymbolKind::Function, Type::UNIT, Span::dummy())).unwrap();
        assert_eq!(table.lookup_type("Pair").unwrap().kind, SymbolKind::Type);
        assert_eq!(table.lookup("Pair").unwrap().kind, SymbolKind::Function);
    }

    #[test]
    fn repeated_type_parameter() {
        let mut table = SymbolTable::new();
        table.enter_scope();
        let t = || Symbol::new("T", SymbolKind::TypeParameter, Type::UNIT, Span::dummy());
        table.define(t()).unwrap();
        assert_eq!(table.define(t()).unwrap_err().kind(), ErrorKind::RepeatedTypeParameter);
    }

    #[test]
    fn method_cannot_reuse_field_name() {
        let mut members = MemberTable::new();
        members
            .insert("first", Member::Field { index: 0, ty: Type::INT, span: Span::dummy() })
            .unwrap();
        let method = MethodDef {
            owner: "Pair".into(),
            name: "first".into(),
            sig: FnSig::monomorphic(vec![Type::adt("Pair", vec![])], Type::INT),
            item: 0,
            index: 0,
            span: Span::new(30, 35, 4, 8, 0),
        };
        let err = members.insert("first", Member::Method(method)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDefinition);
        assert_eq!(err.span().unwrap().line, 4);
    }

    #[test]
    fn fields_keep_declaration_order() {
        let mut members = MemberTable::new();
        for (index, name) in ["zeta", "alpha"].iter().enumerate() {
            members
                .insert(name, Member::Field { index, ty: Type::INT, span: Span::dummy() })
                .unwrap();
        }
        let names: Vec<_> = members.fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
