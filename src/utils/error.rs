//! Error handling for splc
//!
//! Every user-facing message is fixed by the `#[error]` templates below;
//! the passes only fill in names and rendered types.

use crate::utils::Span;
use serde::Serialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Syntax Errors ====================
    #[error("expected {expected}, but got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("expected identifier")]
    ExpectedIdent { span: Span },

    #[error("expected type")]
    ExpectedType { span: Span },

    #[error("expected expression")]
    ExpectedExpr { span: Span },

    #[error("expected pattern")]
    ExpectedPattern { span: Span },

    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("integer literal out of range: {literal}")]
    IntegerLiteralOutOfRange { literal: String, span: Span },

    // ==================== Name Resolution ====================
    #[error("symbol \"{name}\" is already defined")]
    DuplicateDefinition { name: String, span: Span },

    #[error("symbol \"{name}\" is already defined in this scope")]
    DuplicateLocal { name: String, span: Span },

    #[error("symbol \"{name}\" is not defined in this scope")]
    UndefinedSymbol { name: String, span: Span },

    #[error("type \"{name}\" is not defined")]
    UndefinedType { name: String, span: Span },

    #[error("type variable \"{name}\" is not defined")]
    UndefinedTypeVariable { name: String, span: Span },

    #[error("type parameter \"{name}\" is repeated")]
    RepeatedTypeParameter { name: String, span: Span },

    #[error("symbol \"{name}\" is not a variable")]
    NotAVariable { name: String, span: Span },

    #[error("symbol \"{name}\" is not a function")]
    NotAFunction { name: String, span: Span },

    #[error("left-hand side of assignment is not assignable")]
    NotAnLvalue { span: Span },

    #[error("{keyword} statement must be within a loop")]
    BreakOutsideLoop { keyword: String, span: Span },

    // ==================== Type Errors ====================
    #[error("cannot unify types {lhs} and {rhs}")]
    UnificationFailure { lhs: String, rhs: String, span: Span },

    #[error("variable {var} already occurs in {ty}")]
    InfiniteType { var: String, ty: String, span: Span },

    #[error("Expected {expected} parameter(s) to type constructor {name}, but got {got}")]
    TypeArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("function {name} expects {expected} argument(s), but got {got}")]
    ArgCountMismatch {
        name: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("struct literal for {name} is missing field {field}")]
    MissingField {
        name: String,
        field: String,
        span: Span,
    },

    // ==================== Traits ====================
    #[error("Type {ty} is not an instance of trait {trait_name}")]
    UnsatisfiedConstraint {
        ty: String,
        trait_name: String,
        span: Span,
    },

    #[error("type {ty} cannot be constrained by both {existing} and {new}")]
    ConflictingConstraint {
        ty: String,
        existing: String,
        new: String,
        span: Span,
    },

    #[error("cannot add new instances to built-in trait {trait_name}")]
    BuiltinTraitInstanceForbidden { trait_name: String, span: Span },

    #[error("overlapping impl of trait {trait_name} for type {ty}")]
    OverlappingInstance {
        trait_name: String,
        ty: String,
        previous_ty: String,
        span: Span,
        previous: Span,
    },

    #[error("impl of trait {trait_name} for type {ty} is missing method {method}")]
    MissingTraitMethod {
        trait_name: String,
        ty: String,
        method: String,
        span: Span,
    },

    #[error("method {method} is not a member of trait {trait_name}")]
    ExtraTraitMethod {
        trait_name: String,
        method: String,
        span: Span,
    },

    #[error("method {method} does not match trait {trait_name}: expected {expected}, but got {got}")]
    TraitMethodMismatch {
        trait_name: String,
        method: String,
        expected: String,
        got: String,
        span: Span,
    },

    // ==================== Members ====================
    #[error("ambiguous call to method {method}: candidates from traits {candidates}")]
    AmbiguousMethodCall {
        method: String,
        candidates: String,
        span: Span,
    },

    #[error("type {ty} has no method or member named \"{name}\"")]
    NoSuchMethodOrMember { name: String, ty: String, span: Span },

    #[error("{name} is a member variable, not a method")]
    MemberNotMethod { name: String, span: Span },

    #[error("{name} is a method, not a member variable")]
    MethodNotMember { name: String, span: Span },

    // ==================== Match ====================
    #[error("type \"{ty}\" has no value constructor named \"{name}\"")]
    NoSuchConstructor { ty: String, name: String, span: Span },

    #[error("constructor pattern \"{name}\" does not have the correct number of arguments")]
    ConstructorArity { name: String, span: Span },

    #[error("cannot repeat constructors in match statement")]
    RepeatedConstructor { span: Span },

    #[error("switch statement is not exhaustive")]
    NonExhaustiveMatch { span: Span },

    // ==================== Monomorphization ====================
    #[error("cannot infer concrete type of call to {kind} {name}")]
    CannotInferConcreteType {
        kind: String,
        name: String,
        span: Span,
    },

    #[error("instantiation of {name} exceeds the limit of {limit} specializations")]
    PolymorphicRecursion {
        name: String,
        limit: usize,
        span: Span,
    },

    #[error("program has no main function")]
    MissingMain,

    // ==================== Runtime ====================
    #[error("{message}")]
    Runtime { message: String },

    #[error("IO error: {0}")]
    Io(String),
}

/// Diagnostic category, one per taxonomy entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Syntax,
    DuplicateDefinition,
    UndefinedSymbol,
    UndefinedTypeVariable,
    RepeatedTypeParameter,
    NotAVariable,
    NotAFunction,
    NotAnLvalue,
    BreakOutsideLoop,
    UnificationFailure,
    TypeArityMismatch,
    ArgCountMismatch,
    MissingField,
    UnsatisfiedConstraint,
    ConflictingConstraint,
    BuiltinTraitInstanceForbidden,
    OverlappingInstance,
    MissingTraitMethod,
    ExtraTraitMethod,
    TraitMethodMismatch,
    AmbiguousMethodCall,
    NoSuchMethodOrMember,
    KindMismatch,
    NoSuchConstructor,
    ConstructorArity,
    RepeatedConstructor,
    NonExhaustiveMatch,
    CannotInferConcreteType,
    PolymorphicRecursion,
    IntegerLiteralOutOfRange,
    MissingMain,
    Runtime,
    Io,
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::ExpectedIdent { span }
            | Self::ExpectedType { span }
            | Self::ExpectedExpr { span }
            | Self::ExpectedPattern { span }
            | Self::UnexpectedChar { span, .. }
            | Self::UnterminatedString { span }
            | Self::IntegerLiteralOutOfRange { span, .. }
            | Self::DuplicateDefinition { span, .. }
            | Self::DuplicateLocal { span, .. }
            | Self::UndefinedSymbol { span, .. }
            | Self::UndefinedType { span, .. }
            | Self::UndefinedTypeVariable { span, .. }
            | Self::RepeatedTypeParameter { span, .. }
            | Self::NotAVariable { span, .. }
            | Self::NotAFunction { span, .. }
            | Self::NotAnLvalue { span }
            | Self::BreakOutsideLoop { span, .. }
            | Self::UnificationFailure { span, .. }
            | Self::InfiniteType { span, .. }
            | Self::TypeArityMismatch { span, .. }
            | Self::ArgCountMismatch { span, .. }
            | Self::MissingField { span, .. }
            | Self::UnsatisfiedConstraint { span, .. }
            | Self::ConflictingConstraint { span, .. }
            | Self::BuiltinTraitInstanceForbidden { span, .. }
            | Self::OverlappingInstance { span, .. }
            | Self::MissingTraitMethod { span, .. }
            | Self::ExtraTraitMethod { span, .. }
            | Self::TraitMethodMismatch { span, .. }
            | Self::AmbiguousMethodCall { span, .. }
            | Self::NoSuchMethodOrMember { span, .. }
            | Self::MemberNotMethod { span, .. }
            | Self::MethodNotMember { span, .. }
            | Self::NoSuchConstructor { span, .. }
            | Self::ConstructorArity { span, .. }
            | Self::RepeatedConstructor { span }
            | Self::NonExhaustiveMatch { span }
            | Self::CannotInferConcreteType { span, .. }
            | Self::PolymorphicRecursion { span, .. } => Some(*span),
            Self::MissingMain | Self::Runtime { .. } | Self::Io(_) => None,
        }
    }

    /// Taxonomy entry of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedToken { .. }
            | Self::ExpectedIdent { .. }
            | Self::ExpectedType { .. }
            | Self::ExpectedExpr { .. }
            | Self::ExpectedPattern { .. }
            | Self::UnexpectedChar { .. }
            | Self::UnterminatedString { .. } => ErrorKind::Syntax,
            Self::IntegerLiteralOutOfRange { .. } => ErrorKind::IntegerLiteralOutOfRange,
            Self::DuplicateDefinition { .. } | Self::DuplicateLocal { .. } => {
                ErrorKind::DuplicateDefinition
            }
            Self::UndefinedSymbol { .. } | Self::UndefinedType { .. } => ErrorKind::UndefinedSymbol,
            Self::UndefinedTypeVariable { .. } => ErrorKind::UndefinedTypeVariable,
            Self::RepeatedTypeParameter { .. } => ErrorKind::RepeatedTypeParameter,
            Self::NotAVariable { .. } => ErrorKind::NotAVariable,
            Self::NotAFunction { .. } => ErrorKind::NotAFunction,
            Self::NotAnLvalue { .. } => ErrorKind::NotAnLvalue,
            Self::BreakOutsideLoop { .. } => ErrorKind::BreakOutsideLoop,
            Self::UnificationFailure { .. } | Self::InfiniteType { .. } => {
                ErrorKind::UnificationFailure
            }
            Self::TypeArityMismatch { .. } => ErrorKind::TypeArityMismatch,
            Self::ArgCountMismatch { .. } => ErrorKind::ArgCountMismatch,
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::UnsatisfiedConstraint { .. } => ErrorKind::UnsatisfiedConstraint,
            Self::ConflictingConstraint { .. } => ErrorKind::ConflictingConstraint,
            Self::BuiltinTraitInstanceForbidden { .. } => ErrorKind::BuiltinTraitInstanceForbidden,
            Self::OverlappingInstance { .. } => ErrorKind::OverlappingInstance,
            Self::MissingTraitMethod { .. } => ErrorKind::MissingTraitMethod,
            Self::ExtraTraitMethod { .. } => ErrorKind::ExtraTraitMethod,
            Self::TraitMethodMismatch { .. } => ErrorKind::TraitMethodMismatch,
            Self::AmbiguousMethodCall { .. } => ErrorKind::AmbiguousMethodCall,
            Self::NoSuchMethodOrMember { .. } => ErrorKind::NoSuchMethodOrMember,
            Self::MemberNotMethod { .. } | Self::MethodNotMember { .. } => ErrorKind::KindMismatch,
            Self::NoSuchConstructor { .. } => ErrorKind::NoSuchConstructor,
            Self::ConstructorArity { .. } => ErrorKind::ConstructorArity,
            Self::RepeatedConstructor { .. } => ErrorKind::RepeatedConstructor,
            Self::NonExhaustiveMatch { .. } => ErrorKind::NonExhaustiveMatch,
            Self::CannotInferConcreteType { .. } => ErrorKind::CannotInferConcreteType,
            Self::PolymorphicRecursion { .. } => ErrorKind::PolymorphicRecursion,
            Self::MissingMain => ErrorKind::MissingMain,
            Self::Runtime { .. } => ErrorKind::Runtime,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime { message: message.into() }
    }
}
