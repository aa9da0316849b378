//! Abstract Syntax Tree definitions for the Spl language
//!
//! Every node carries the `Span` of the source text it was parsed from.

use crate::utils::Span;

/// A complete program (compilation unit)
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Item>,
}

/// Top-level items
#[derive(Debug, Clone)]
pub enum Item {
    Function(Function),
    Struct(StructDef),
    Enum(EnumDef),
    Trait(TraitDef),
    Impl(ImplBlock),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Function(f) => f.span,
            Item::Struct(s) => s.span,
            Item::Enum(e) => e.span,
            Item::Trait(t) => t.span,
            Item::Impl(i) => i.span,
        }
    }
}

/// Generic parameter with inline bounds: `T: Show + Eq`
#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: Ident,
    pub bounds: Vec<TraitBound>,
    pub span: Span,
}

/// A trait named with its arguments: `Convert<Int>`
#[derive(Debug, Clone)]
pub struct TraitBound {
    pub name: Ident,
    pub args: Vec<Type>,
    pub span: Span,
}

/// `where T: Bound` predicate
#[derive(Debug, Clone)]
pub struct WherePredicate {
    pub param: Ident,
    pub bounds: Vec<TraitBound>,
    pub span: Span,
}

/// Function signature, shared by functions, methods and trait items
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: Ident,
    pub generics: Vec<GenericParam>,
    pub params: Vec<Param>,
    pub ret_type: Option<Type>,
    pub where_clause: Vec<WherePredicate>,
    pub span: Span,
}

impl FunctionSig {
    /// True when the first parameter is a bare `self`
    pub fn has_self(&self) -> bool {
        self.params.first().map_or(false, Param::is_self)
    }
}

/// Function definition
#[derive(Debug, Clone)]
pub struct Function {
    pub sig: FunctionSig,
    pub body: Block,
    pub span: Span,
}

/// Function parameter; `ty` is `None` only for `self`
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<Type>,
    pub span: Span,
}

impl Param {
    pub fn is_self(&self) -> bool {
        self.name.name == "self" && self.ty.is_none()
    }
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Ident,
    pub generics: Vec<GenericParam>,
    pub fields: Vec<Field>,
    pub span: Span,
}

/// Struct field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Ident,
    pub ty: Type,
    pub span: Span,
}

/// Enum definition
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: Ident,
    pub generics: Vec<GenericParam>,
    pub variants: Vec<Variant>,
    pub span: Span,
}

/// Enum variant (value constructor)
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: Ident,
    pub fields: Vec<Type>,
    pub span: Span,
}

/// Trait definition
#[derive(Debug, Clone)]
pub struct TraitDef {
    pub name: Ident,
    pub generics: Vec<GenericParam>,
    pub methods: Vec<FunctionSig>,
    pub span: Span,
}

/// `impl<..> Head { .. }` or `impl<..> Trait<..> for Head { .. }`
#[derive(Debug, Clone)]
pub struct ImplBlock {
    pub generics: Vec<GenericParam>,
    pub trait_ref: Option<TraitBound>,
    pub target: Type,
    pub where_clause: Vec<WherePredicate>,
    pub methods: Vec<Function>,
    pub span: Span,
}

/// Code block
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// let name [: type] = expr;
    Let {
        name: Ident,
        ty: Option<Type>,
        value: Expr,
        span: Span,
    },
    /// Expression statement; `semi` records a trailing `;`
    Expr { expr: Expr, semi: bool },
    /// return [expr];
    Return { value: Option<Expr>, span: Span },
    Break { span: Span },
    Continue { span: Span },
}

/// Expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident),
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    /// `target = value` or compound `target op= value`
    Assign {
        target: Box<Expr>,
        op: Option<BinOp>,
        value: Box<Expr>,
        span: Span,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    /// Member access (expr.field)
    Field {
        expr: Box<Expr>,
        field: Ident,
        span: Span,
    },
    /// Method call (expr.method(args))
    MethodCall {
        expr: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
        span: Span,
    },
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Block(Block),
    /// `else` holds either a block or a chained `if`
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_branch: Option<Box<Expr>>,
        span: Span,
    },
    Match {
        expr: Box<Expr>,
        arms: Vec<MatchArm>,
        span: Span,
    },
    Loop {
        body: Block,
        span: Span,
    },
    While {
        cond: Box<Expr>,
        body: Block,
        span: Span,
    },
    StructLit {
        name: Ident,
        fields: Vec<(Ident, Expr)>,
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span(),
            Expr::Ident(ident) => ident.span,
            Expr::Block(block) => block.span,
            Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Call { span, .. }
            | Expr::Field { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::Index { span, .. }
            | Expr::If { span, .. }
            | Expr::Match { span, .. }
            | Expr::Loop { span, .. }
            | Expr::While { span, .. }
            | Expr::StructLit { span, .. }
            | Expr::Array { span, .. } => *span,
        }
    }

    /// Block-like expressions may stand as statements without `;`
    pub fn is_block_like(&self) -> bool {
        matches!(
            self,
            Expr::Block(_) | Expr::If { .. } | Expr::Match { .. } | Expr::Loop { .. } | Expr::While { .. }
        )
    }
}

/// Match arm: `Ctor(a, b) => body`
#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
    pub span: Span,
}

/// Constructor pattern; `_` bindings are ignored
#[derive(Debug, Clone)]
pub struct Pattern {
    pub constructor: Ident,
    pub bindings: Vec<Ident>,
    pub span: Span,
}

/// Literal value
#[derive(Debug, Clone)]
pub enum Literal {
    /// Integer with an optional suffix; unary minus is folded in
    Int {
        value: i128,
        suffix: Option<String>,
        span: Span,
    },
    String(String, Span),
    Bool(bool, Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Int { span, .. } => *span,
            Literal::String(_, s) => *s,
            Literal::Bool(_, s) => *s,
        }
    }
}

/// Identifier
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn is_ordering(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not (!)
    Not,
}

/// Type as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Named type with optional arguments (`Int`, `Option<T>`, `Self`)
    Named {
        name: String,
        args: Vec<Type>,
        span: Span,
    },
    /// Function type (fn(A, B) -> R)
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
        span: Span,
    },
}

impl Type {
    pub fn span(&self) -> Span {
        match self {
            Type::Named { span, .. } => *span,
            Type::Function { span, .. } => *span,
        }
    }
}
