//! Body type checking
//!
//! Each function or method body gets its own `InferCtx`. Expressions are
//! checked in evaluation order, unifying as they go and collecting trait
//! obligations; the solver discharges those once the whole body has been
//! walked. Integer literals without a suffix start out as `Num`-bounded
//! variables and default to `Int` (or `UInt` when they do not fit) at the
//! end.

use crate::frontend::ast::{self, BinOp, Block, Expr, Ident, Literal, MatchArm, Stmt, UnOp};
use crate::semantic::decls::{AdtDef, AdtKind, Decls};
use crate::semantic::exhaustive::MatchCoverage;
use crate::semantic::scope::{Member, Symbol, SymbolKind, SymbolTable};
use crate::semantic::targets::{CallTarget, CheckedBody, LiteralUse, Site};
use crate::stdlib::{Builtin, EQ_TRAIT, NUM_TRAIT};
use crate::traits::{GenericEnv, Solver};
use crate::types::{GenericDef, InferCtx, ParamSubst, Prim, TraitRef, Type, TypeHead};
use crate::utils::{Error, Result, Span};
use crate::CompileOptions;
use log::{debug, trace};

pub struct BodyChecker<'a> {
    pub(super) decls: &'a Decls,
    options: &'a CompileOptions,
    pub(super) ctx: InferCtx,
    pub(super) env: GenericEnv,
    locals: SymbolTable,
    self_ty: Option<Type>,
    ret_ty: Type,
    /// One entry per enclosing loop: has it seen a `break`?
    loops: Vec<bool>,
    pub(super) sites: Vec<Site>,
    literals: Vec<LiteralUse>,
    /// Types of expressions that never produce a value
    diverging: Vec<Type>,
}

impl<'a> BodyChecker<'a> {
    pub fn new(
        decls: &'a Decls,
        options: &'a CompileOptions,
        generics: &[GenericDef],
        self_ty: Option<Type>,
        ret_ty: Type,
    ) -> Result<Self> {
        let mut env = GenericEnv::new();
        env.declare(generics);

        let mut locals = SymbolTable::new();
        locals.enter_scope();
        for generic in generics {
            locals.define(Symbol::new(
                generic.param.name.clone(),
                SymbolKind::TypeParameter,
                Type::Param(generic.param.clone()),
                generic.span,
            ))?;
        }

        Ok(Self {
            decls,
            options,
            ctx: InferCtx::new(),
            env,
            locals,
            self_ty,
            ret_ty,
            loops: Vec::new(),
            sites: Vec::new(),
            literals: Vec::new(),
            diverging: Vec::new(),
        })
    }

    /// Check a body against its declared parameter and return types
    pub fn check(mut self, params: &[(Ident, Type)], body: &Block) -> Result<CheckedBody> {
        self.locals.enter_scope();
        for (name, ty) in params {
            self.define_local(name, ty.clone())?;
        }
        let body_ty = self.check_block(body)?;
        let ret_ty = self.ret_ty.clone();
        let span = tail_span(body);
        self.unify(&ret_ty, &body_ty, span)?;
        self.locals.exit_scope();
        self.finish()
    }

    // ==================== Helpers ====================

    pub(super) fn unify(&mut self, expected: &Type, actual: &Type, span: Span) -> Result<()> {
        self.ctx.unify(expected, actual, span)
    }

    pub(super) fn require(&mut self, ty: &Type, trait_name: &str, span: Span) -> Result<()> {
        self.ctx.require(ty, TraitRef::new(trait_name, vec![]), span)
    }

    fn define_local(&mut self, name: &Ident, ty: Type) -> Result<()> {
        if name.name == "_" {
            return Ok(());
        }
        self.locals
            .define(Symbol::new(name.name.clone(), SymbolKind::Variable, ty, name.span))
    }

    fn diverge(&mut self) -> Type {
        let ty = self.ctx.fresh_var();
        self.diverging.push(ty.clone());
        ty
    }

    /// Fresh variables for `generics`, with their bounds required at `span`
    pub(super) fn instantiate(&mut self, generics: &[GenericDef], span: Span) -> Result<(ParamSubst, Vec<Type>)> {
        let mut subst = ParamSubst::new();
        let mut args = Vec::with_capacity(generics.len());
        for generic in generics {
            let var = self.ctx.fresh_var();
            subst.insert(generic.param.id, var.clone());
            args.push(var);
        }
        for (generic, var) in generics.iter().zip(&args) {
            for bound in &generic.bounds {
                self.ctx.require(var, bound.subst(&subst), span)?;
            }
        }
        Ok((subst, args))
    }

    fn instantiate_adt(&mut self, adt: &AdtDef, span: Span) -> Result<(ParamSubst, Type)> {
        let (subst, args) = self.instantiate(&adt.generics, span)?;
        Ok((subst, Type::adt(adt.name.clone(), args)))
    }

    /// Check call arguments against already instantiated parameter types
    pub(super) fn check_args(&mut self, name: &str, params: &[Type], args: &[Expr], span: Span) -> Result<()> {
        if params.len() != args.len() {
            return Err(Error::ArgCountMismatch {
                name: name.to_string(),
                expected: params.len(),
                got: args.len(),
                span,
            });
        }
        for (param, arg) in params.iter().zip(args) {
            let ty = self.check_expr(arg)?;
            self.unify(param, &ty, arg.span())?;
        }
        Ok(())
    }

    pub(super) fn record(&mut self, target: CallTarget, span: Span) {
        trace!("site {} {} at {}:{}", target.kind(), target.name(), span.line, span.column);
        self.sites.push(Site { target, span });
    }

    // ==================== Statements ====================

    fn check_block(&mut self, block: &Block) -> Result<Type> {
        self.locals.enter_scope();
        let mut ty = Type::UNIT;
        for (i, stmt) in block.stmts.iter().enumerate() {
            let last = i + 1 == block.stmts.len();
            let stmt_ty = self.check_stmt(stmt)?;
            if last {
                ty = match stmt {
                    Stmt::Expr { semi: false, .. } => stmt_ty,
                    Stmt::Return { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => self.diverge(),
                    _ => Type::UNIT,
                };
            }
        }
        self.locals.exit_scope();
        Ok(ty)
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<Type> {
        match stmt {
            Stmt::Let { name, ty, value, .. } => {
                let value_ty = self.check_expr(value)?;
                let declared = match ty {
                    Some(annotation) => {
                        let declared =
                            self.decls
                                .resolve_type(annotation, &self.locals, self.self_ty.as_ref())?;
                        self.unify(&declared, &value_ty, value.span())?;
                        declared
                    }
                    None => value_ty,
                };
                self.define_local(name, declared)?;
                Ok(Type::UNIT)
            }
            Stmt::Expr { expr, .. } => self.check_expr(expr),
            Stmt::Return { value, span } => {
                let (ty, at) = match value {
                    Some(value) => (self.check_expr(value)?, value.span()),
                    None => (Type::UNIT, *span),
                };
                let ret_ty = self.ret_ty.clone();
                self.unify(&ret_ty, &ty, at)?;
                Ok(Type::UNIT)
            }
            Stmt::Break { span } => {
                match self.loops.last_mut() {
                    Some(seen_break) => *seen_break = true,
                    None => {
                        return Err(Error::BreakOutsideLoop { keyword: "break".into(), span: *span });
                    }
                }
                Ok(Type::UNIT)
            }
            Stmt::Continue { span } => {
                if self.loops.is_empty() {
                    return Err(Error::BreakOutsideLoop { keyword: "continue".into(), span: *span });
                }
                Ok(Type::UNIT)
            }
        }
    }

    // ==================== Expressions ====================

    pub(super) fn check_expr(&mut self, expr: &Expr) -> Result<Type> {
        match expr {
            Expr::Literal(lit) => self.check_literal(lit),
            Expr::Ident(ident) => self.check_ident(ident),
            Expr::Binary { left, op, right, span } => self.check_binary(left, *op, right, *span),
            Expr::Unary { op, expr, span } => {
                let ty = self.check_expr(expr)?;
                match op {
                    UnOp::Neg => self.require(&ty, NUM_TRAIT, *span)?,
                    UnOp::Not => self.unify(&Type::BOOL, &ty, expr.span())?,
                }
                Ok(ty)
            }
            Expr::Assign { target, op, value, span } => {
                self.check_lvalue(target)?;
                let target_ty = self.check_expr(target)?;
                let value_ty = self.check_expr(value)?;
                self.unify(&target_ty, &value_ty, value.span())?;
                if op.is_some() {
                    self.require(&target_ty, NUM_TRAIT, *span)?;
                }
                Ok(Type::UNIT)
            }
            Expr::Call { func, args, span } => self.check_call(func, args, *span),
            Expr::Field { expr, field, .. } => self.check_field_access(expr, field),
            Expr::MethodCall { expr, method, args, span } => self.check_method_call(expr, method, args, *span),
            Expr::Index { expr, index, .. } => {
                let elem = self.ctx.fresh_var();
                let array_ty = self.check_expr(expr)?;
                self.unify(&Type::array(elem.clone()), &array_ty, expr.span())?;
                let index_ty = self.check_expr(index)?;
                self.unify(&Type::INT, &index_ty, index.span())?;
                Ok(elem)
            }
            Expr::Block(block) => self.check_block(block),
            Expr::If { cond, then_block, else_branch, .. } => {
                let cond_ty = self.check_expr(cond)?;
                self.unify(&Type::BOOL, &cond_ty, cond.span())?;
                let then_ty = self.check_block(then_block)?;
                match else_branch {
                    Some(else_expr) => {
                        let else_ty = self.check_expr(else_expr)?;
                        self.unify(&then_ty, &else_ty, else_expr.span())?;
                        Ok(then_ty)
                    }
                    None => {
                        self.unify(&Type::UNIT, &then_ty, tail_span(then_block))?;
                        Ok(Type::UNIT)
                    }
                }
            }
            Expr::Match { expr, arms, span } => self.check_match(expr, arms, *span),
            Expr::Loop { body, .. } => {
                self.loops.push(false);
                self.check_block(body)?;
                let seen_break = self.loops.pop().unwrap_or(false);
                Ok(if seen_break { Type::UNIT } else { self.diverge() })
            }
            Expr::While { cond, body, .. } => {
                let cond_ty = self.check_expr(cond)?;
                self.unify(&Type::BOOL, &cond_ty, cond.span())?;
                self.loops.push(false);
                self.check_block(body)?;
                self.loops.pop();
                Ok(Type::UNIT)
            }
            Expr::StructLit { name, fields, span } => self.check_struct_literal(name, fields, *span),
            Expr::Array { elements, span } => {
                let elem = self.ctx.fresh_var();
                for element in elements {
                    let ty = self.check_expr(element)?;
                    self.unify(&elem, &ty, element.span())?;
                }
                if elements.is_empty() {
                    self.record(
                        CallTarget::Constructor {
                            adt: "Array".into(),
                            ctor: "[]".into(),
                            type_args: vec![elem.clone()],
                        },
                        *span,
                    );
                }
                Ok(Type::array(elem))
            }
        }
    }

    fn check_literal(&mut self, lit: &Literal) -> Result<Type> {
        match lit {
            Literal::Bool(..) => Ok(Type::BOOL),
            Literal::String(..) => Ok(Type::STRING),
            Literal::Int { value, suffix, span } => {
                let ty = match suffix.as_deref().and_then(Prim::from_suffix) {
                    Some(prim) => Type::Prim(prim),
                    None => {
                        let var = self.ctx.fresh_var();
                        self.require(&var, NUM_TRAIT, *span)?;
                        var
                    }
                };
                self.literals.push(LiteralUse { span: *span, ty: ty.clone(), value: *value });
                Ok(ty)
            }
        }
    }

    fn check_ident(&mut self, ident: &Ident) -> Result<Type> {
        if let Some(local) = self.locals.lookup(&ident.name) {
            return Ok(local.ty.clone());
        }
        let decls = self.decls;
        let kind = decls.globals.lookup(&ident.name).map(|s| s.kind);
        match kind {
            Some(SymbolKind::Function) => {
                let Some(def) = decls.functions.get(&ident.name) else {
                    return Err(Error::UndefinedSymbol { name: ident.name.clone(), span: ident.span });
                };
                let (subst, type_args) = self.instantiate(&def.sig.generics, ident.span)?;
                self.record(
                    CallTarget::Function { name: def.name.clone(), type_args },
                    ident.span,
                );
                Ok(def.sig.fn_type().subst(&subst))
            }
            Some(SymbolKind::Constructor) => {
                let ctor = &decls.ctors[&ident.name];
                if !ctor.fields.is_empty() {
                    return Err(Error::NotAVariable { name: ident.name.clone(), span: ident.span });
                }
                let (_, ty) = self.instantiate_adt(&decls.adts[&ctor.adt], ident.span)?;
                self.record(
                    CallTarget::Constructor {
                        adt: ctor.adt.clone(),
                        ctor: ctor.name.clone(),
                        type_args: type_args_of(&ty),
                    },
                    ident.span,
                );
                Ok(ty)
            }
            Some(_) => Err(Error::NotAVariable { name: ident.name.clone(), span: ident.span }),
            None => Err(Error::UndefinedSymbol { name: ident.name.clone(), span: ident.span }),
        }
    }

    fn check_lvalue(&self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Ident(ident) => {
                if self.locals.lookup(&ident.name).is_some() {
                    Ok(())
                } else if self.decls.globals.lookup(&ident.name).is_some() {
                    Err(Error::NotAVariable { name: ident.name.clone(), span: ident.span })
                } else {
                    Err(Error::UndefinedSymbol { name: ident.name.clone(), span: ident.span })
                }
            }
            Expr::Field { expr, .. } => self.check_lvalue(expr),
            Expr::Index { .. } => Ok(()),
            other => Err(Error::NotAnLvalue { span: other.span() }),
        }
    }

    fn check_binary(&mut self, left: &Expr, op: BinOp, right: &Expr, span: Span) -> Result<Type> {
        let lhs = self.check_expr(left)?;
        let rhs = self.check_expr(right)?;
        match op {
            BinOp::And | BinOp::Or => {
                self.unify(&Type::BOOL, &lhs, left.span())?;
                self.unify(&Type::BOOL, &rhs, right.span())?;
                Ok(Type::BOOL)
            }
            BinOp::Eq | BinOp::Ne => {
                self.unify(&lhs, &rhs, span)?;
                self.require(&lhs, EQ_TRAIT, span)?;
                Ok(Type::BOOL)
            }
            _ => {
                self.unify(&lhs, &rhs, span)?;
                self.require(&lhs, NUM_TRAIT, span)?;
                Ok(if op.is_ordering() { Type::BOOL } else { lhs })
            }
        }
    }

    fn check_call(&mut self, func: &Expr, args: &[Expr], span: Span) -> Result<Type> {
        let decls = self.decls;
        let global = match func {
            Expr::Ident(ident) if self.locals.lookup(&ident.name).is_none() => Some(ident),
            _ => None,
        };

        let Some(ident) = global else {
            let callee = self.check_expr(func)?;
            let callee = self.ctx.shallow_resolve(&callee);
            if !matches!(callee, Type::Var(_) | Type::Fn(..)) {
                let name = match func {
                    Expr::Ident(ident) => ident.name.clone(),
                    _ => self.ctx.describe(&callee),
                };
                return Err(Error::NotAFunction { name, span: func.span() });
            }
            let ret = self.ctx.fresh_var();
            let mut arg_tys = Vec::with_capacity(args.len());
            for arg in args {
                arg_tys.push(self.check_expr(arg)?);
            }
            self.unify(&callee, &Type::func(arg_tys, ret.clone()), span)?;
            return Ok(ret);
        };

        let kind = decls.globals.lookup(&ident.name).map(|s| s.kind);
        match kind {
            Some(SymbolKind::Function) => {
                let def = &decls.functions[&ident.name];
                let (subst, type_args) = self.instantiate(&def.sig.generics, span)?;
                let params: Vec<_> = def.sig.params.iter().map(|p| p.subst(&subst)).collect();
                self.check_args(&def.name, &params, args, span)?;
                self.record(CallTarget::Function { name: def.name.clone(), type_args }, span);
                Ok(def.sig.ret.subst(&subst))
            }
            Some(SymbolKind::Builtin) => {
                let Some(func) = decls.builtins.get(&ident.name) else {
                    return Err(Error::UndefinedSymbol { name: ident.name.clone(), span: ident.span });
                };
                let (subst, type_args) = self.instantiate(&func.sig.generics, span)?;
                let params: Vec<_> = func.sig.params.iter().map(|p| p.subst(&subst)).collect();
                self.check_args(&ident.name, &params, args, span)?;
                self.record(CallTarget::Builtin { builtin: func.builtin, type_args }, span);
                let ret = func.sig.ret.subst(&subst);
                if func.builtin == Builtin::Panic {
                    self.diverging.push(ret.clone());
                }
                Ok(ret)
            }
            Some(SymbolKind::Constructor) => {
                let ctor = &decls.ctors[&ident.name];
                let (subst, ty) = self.instantiate_adt(&decls.adts[&ctor.adt], span)?;
                let params: Vec<_> = ctor.fields.iter().map(|f| f.subst(&subst)).collect();
                self.check_args(&ctor.name, &params, args, span)?;
                self.record(
                    CallTarget::Constructor {
                        adt: ctor.adt.clone(),
                        ctor: ctor.name.clone(),
                        type_args: type_args_of(&ty),
                    },
                    span,
                );
                Ok(ty)
            }
            Some(_) => Err(Error::NotAFunction { name: ident.name.clone(), span: ident.span }),
            None => Err(Error::UndefinedSymbol { name: ident.name.clone(), span: ident.span }),
        }
    }

    fn check_struct_literal(&mut self, name: &Ident, fields: &[(Ident, Expr)], span: Span) -> Result<Type> {
        let decls = self.decls;
        let adt = match decls.adts.get(&name.name) {
            Some(adt) if adt.kind == AdtKind::Struct => adt,
            Some(_) => {
                return Err(Error::NoSuchConstructor {
                    ty: name.name.clone(),
                    name: name.name.clone(),
                    span: name.span,
                });
            }
            None => return Err(Error::UndefinedType { name: name.name.clone(), span: name.span }),
        };
        let (subst, ty) = self.instantiate_adt(adt, span)?;

        let mut seen: Vec<&str> = Vec::new();
        for (field, value) in fields {
            let field_ty = match decls.member(&adt.name, &field.name) {
                Some(Member::Field { ty, .. }) => ty.subst(&subst),
                Some(Member::Method(_)) => {
                    return Err(Error::MethodNotMember { name: field.name.clone(), span: field.span });
                }
                None => {
                    return Err(Error::NoSuchMethodOrMember {
                        name: field.name.clone(),
                        ty: adt.name.clone(),
                        span: field.span,
                    });
                }
            };
            if seen.contains(&field.name.as_str()) {
                return Err(Error::DuplicateDefinition { name: field.name.clone(), span: field.span });
            }
            seen.push(&field.name);
            let value_ty = self.check_expr(value)?;
            self.unify(&field_ty, &value_ty, value.span())?;
        }

        let declared = decls.members.get(&adt.name).map(|m| m.fields()).unwrap_or_default();
        if let Some((missing, _)) = declared.iter().find(|(f, _)| !seen.contains(f)) {
            return Err(Error::MissingField {
                name: adt.name.clone(),
                field: missing.to_string(),
                span,
            });
        }

        self.record(
            CallTarget::Constructor {
                adt: adt.name.clone(),
                ctor: adt.name.clone(),
                type_args: type_args_of(&ty),
            },
            span,
        );
        Ok(ty)
    }

    // ==================== Match ====================

    fn check_match(&mut self, scrutinee: &Expr, arms: &[MatchArm], span: Span) -> Result<Type> {
        let decls = self.decls;
        let scrutinee_ty = self.check_expr(scrutinee)?;
        let adt = self.scrutinee_adt(&scrutinee_ty, arms, span)?;
        let Some(ctors) = decls.enum_ctors(&adt.name) else {
            return Err(Error::NonExhaustiveMatch { span });
        };
        let args = type_args_of(&self.ctx.resolve(&scrutinee_ty));
        let subst = adt.subst_for(&args);

        let mut coverage = MatchCoverage::new(ctors);
        let result = self.ctx.fresh_var();
        for arm in arms {
            let pattern = &arm.pattern;
            let ctor = match decls.ctors.get(&pattern.constructor.name) {
                Some(ctor) if ctor.adt == adt.name => ctor,
                _ => {
                    return Err(Error::NoSuchConstructor {
                        ty: self.ctx.describe(&scrutinee_ty),
                        name: pattern.constructor.name.clone(),
                        span: pattern.constructor.span,
                    });
                }
            };
            coverage.record(&ctor.name, pattern.span)?;
            if ctor.fields.len() != pattern.bindings.len() {
                return Err(Error::ConstructorArity { name: ctor.name.clone(), span: pattern.span });
            }

            self.locals.enter_scope();
            for (binding, field) in pattern.bindings.iter().zip(&ctor.fields) {
                self.define_local(binding, field.subst(&subst))?;
            }
            let arm_ty = self.check_expr(&arm.body)?;
            self.unify(&result, &arm_ty, arm.body.span())?;
            self.locals.exit_scope();
        }
        coverage.finish(span)?;
        Ok(result)
    }

    /// The enum being matched on. An unknown scrutinee type is fixed by
    /// the constructor named in the first arm.
    fn scrutinee_adt(&mut self, scrutinee_ty: &Type, arms: &[MatchArm], span: Span) -> Result<&'a AdtDef> {
        let decls = self.decls;
        let first = arms.first().map(|arm| &arm.pattern.constructor);
        let resolved = self.ctx.shallow_resolve(scrutinee_ty);
        match &resolved {
            Type::App(TypeHead::Adt(name), _) if decls.enum_ctors(name).is_some() => Ok(&decls.adts[name]),
            Type::Var(_) => {
                let Some(first) = first else {
                    return Err(Error::NonExhaustiveMatch { span });
                };
                let Some(ctor) = decls.ctors.get(&first.name) else {
                    return Err(Error::NoSuchConstructor {
                        ty: self.ctx.describe(&resolved),
                        name: first.name.clone(),
                        span: first.span,
                    });
                };
                let adt = &decls.adts[&ctor.adt];
                let (_, ty) = self.instantiate_adt(adt, span)?;
                self.unify(&ty, &resolved, span)?;
                Ok(adt)
            }
            other => match first {
                Some(first) => Err(Error::NoSuchConstructor {
                    ty: self.ctx.describe(other),
                    name: first.name.clone(),
                    span: first.span,
                }),
                None => Err(Error::NonExhaustiveMatch { span }),
            },
        }
    }

    // ==================== Finishing ====================

    fn solve(&mut self) -> Result<()> {
        let solver = Solver::new(&self.decls.traits, &self.env);
        solver.solve(&mut self.ctx)
    }

    /// Solve, default leftover numeric variables, check literal ranges
    fn finish(mut self) -> Result<CheckedBody> {
        self.solve()?;

        if self.options.numeric_defaulting {
            let literals = self.literals.clone();
            for lit in &literals {
                if lit.value > i64::MAX as i128 && matches!(self.ctx.shallow_resolve(&lit.ty), Type::Var(_)) {
                    self.unify(&Type::UINT, &lit.ty, lit.span)?;
                }
            }
            self.solve()?;

            for root in self.ctx.unresolved_roots() {
                let numeric = self.ctx.bounds(root).iter().any(|b| b.name == NUM_TRAIT);
                if numeric {
                    let span = self.origin_of(root);
                    trace!("defaulting a{} to Int", root.0);
                    self.unify(&Type::INT, &Type::Var(root), span)?;
                }
            }
            self.solve()?;
        }

        for ty in self.diverging.clone() {
            if let Type::Var(v) = self.ctx.shallow_resolve(&ty) {
                if self.ctx.bounds(v).is_empty() {
                    self.unify(&Type::UNIT, &Type::Var(v), Span::dummy())?;
                }
            }
        }

        let mut literals = Vec::with_capacity(self.literals.len());
        for lit in std::mem::take(&mut self.literals) {
            let ty = self.ctx.resolve(&lit.ty);
            match ty {
                Type::Prim(prim) if !prim.contains(lit.value) => {
                    return Err(Error::IntegerLiteralOutOfRange {
                        literal: lit.value.to_string(),
                        span: lit.span,
                    });
                }
                Type::Var(_) => {
                    return Err(Error::CannotInferConcreteType {
                        kind: "integer literal".into(),
                        name: lit.value.to_string(),
                        span: lit.span,
                    });
                }
                _ => {}
            }
            literals.push(LiteralUse { ty, ..lit });
        }

        let sites = std::mem::take(&mut self.sites)
            .into_iter()
            .map(|site| Site {
                target: site.target.map_types(|t| self.ctx.resolve(t)),
                span: site.span,
            })
            .collect::<Vec<_>>();

        debug!(
            "body checked: {} type variables, {} call sites, {} literals",
            self.ctx.var_count(),
            sites.len(),
            literals.len()
        );
        Ok(CheckedBody { sites, literals })
    }

    /// Span of the first literal whose type is the class of `root`
    fn origin_of(&mut self, root: crate::types::TyVarId) -> Span {
        let literals = self.literals.clone();
        literals
            .iter()
            .find(|lit| self.ctx.shallow_resolve(&lit.ty) == Type::Var(root))
            .map_or(Span::dummy(), |lit| lit.span)
    }
}

fn type_args_of(ty: &Type) -> Vec<Type> {
    match ty {
        Type::App(_, args) => args.clone(),
        _ => Vec::new(),
    }
}

/// Where a block's value comes from, for error positions
fn tail_span(block: &Block) -> Span {
    match block.stmts.last() {
        Some(Stmt::Expr { expr, semi: false }) => expr.span(),
        _ => block.span,
    }
}

/// Parameter names paired with their declared types; `self` included
pub fn params_of(sig: &ast::FunctionSig, types: &[Type]) -> Vec<(Ident, Type)> {
    sig.params
        .iter()
        .map(|p| p.name.clone())
        .zip(types.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::utils::ErrorKind;
    use crate::{compile, CompileOptions};

    fn kind_of(source: &str) -> ErrorKind {
        match compile(source, &CompileOptions::default()) {
            Ok(_) => panic!("expected an error"),
            Err(err) => err.kind(),
        }
    }

    fn message_of(source: &str) -> String {
        compile(source, &CompileOptions::default()).err().map(|e| e.to_string()).unwrap_or_default()
    }

    fn ok(source: &str) {
        if let Err(err) = compile(source, &CompileOptions::default()) {
            panic!("unexpected error: {}", err);
        }
    }

    #[test]
    fn literals_default_to_int() {
        ok("fn main() -> Int { let x = 1; x + 2 }");
    }

    #[test]
    fn unification_failure_message() {
        assert_eq!(
            message_of("fn main() { let x: Int = true; }"),
            "cannot unify types Int and Bool"
        );
    }

    #[test]
    fn occurs_check_in_arrays() {
        let msg = message_of("fn main() { let a = []; push(a, a); }");
        assert!(msg.starts_with("variable a"), "{}", msg);
    }

    #[test]
    fn large_literal_defaults_to_uint() {
        ok("fn main() -> UInt { 9223372036854775808 }");
        assert_eq!(kind_of("fn main() -> Int { 9223372036854775808 }"), ErrorKind::IntegerLiteralOutOfRange);
        assert_eq!(kind_of("fn main() -> UInt8 { 256 }"), ErrorKind::IntegerLiteralOutOfRange);
    }

    #[test]
    fn rigid_parameters_only_meet_their_bounds() {
        ok("fn double<T: Num>(x: T) -> T { x + x } fn main() -> Int { double(4) }");
        assert_eq!(
            message_of("fn double<T>(x: T) -> T { x + x } fn main() -> Int { double(4) }"),
            "Type T is not an instance of trait Num"
        );
        assert_eq!(
            kind_of("fn id<T>(x: T) -> T { 5 } fn main() {}"),
            ErrorKind::UnsatisfiedConstraint
        );
    }

    #[test]
    fn numeric_trait_rejects_strings() {
        assert_eq!(
            message_of("fn main() { let s = \"a\" + \"b\"; }"),
            "Type String is not an instance of trait Num"
        );
    }

    #[test]
    fn break_outside_loop() {
        assert_eq!(kind_of("fn main() { break; }"), ErrorKind::BreakOutsideLoop);
        ok("fn main() { loop { break; } }");
        ok("fn main() { while true { continue; } }");
    }

    #[test]
    fn lvalues() {
        assert_eq!(kind_of("fn main() { 1 = 2; }"), ErrorKind::NotAnLvalue);
        assert_eq!(kind_of("fn f() {} fn main() { f = 2; }"), ErrorKind::NotAVariable);
        assert_eq!(kind_of("fn main() { x = 2; }"), ErrorKind::UndefinedSymbol);
        ok("fn main() { let x = 1; x += 2; }");
    }

    #[test]
    fn calls_check_arity_and_callee() {
        assert_eq!(
            message_of("fn f(a: Int) -> Int { a } fn main() -> Int { f(1, 2) }"),
            "function f expects 1 argument(s), but got 2"
        );
        assert_eq!(kind_of("fn main() { let x = 1; x(2); }"), ErrorKind::NotAFunction);
        ok("fn twice(f: fn(Int) -> Int, x: Int) -> Int { f(f(x)) } fn inc(x: Int) -> Int { x + 1 } fn main() -> Int { twice(inc, 1) }");
    }

    #[test]
    fn local_redefinition_in_same_scope() {
        assert_eq!(
            message_of("fn main() { let x = 1; let x = 2; }"),
            "symbol \"x\" is already defined in this scope"
        );
        ok("fn main() { let x = 1; { let x = true; } }");
    }

    #[test]
    fn struct_literals() {
        let pair = "struct Pair<A, B> { first: A, second: B }\n";
        ok(&format!("{}fn main() -> Int {{ let p = Pair {{ first: 1, second: true }}; p.first }}", pair));
        assert_eq!(
            kind_of(&format!("{}fn main() {{ let p = Pair {{ first: 1 }}; }}", pair)),
            ErrorKind::MissingField
        );
        assert_eq!(
            kind_of(&format!("{}fn main() {{ let p = Pair {{ first: 1, second: 2, third: 3 }}; }}", pair)),
            ErrorKind::NoSuchMethodOrMember
        );
    }

    #[test]
    fn match_on_unknown_scrutinee_uses_first_arm() {
        ok("fn get(o: Option<Int>) -> Int { match o { None => 0, Some(x) => x } } fn main() -> Int { get(Some(2)) }");
        assert_eq!(
            kind_of("fn main() -> Int { match true { Some(x) => x, None => 0 } }"),
            ErrorKind::NoSuchConstructor
        );
        assert_eq!(
            kind_of("fn main() -> Int { match Some(1) { Some(x, y) => x, None => 0 } }"),
            ErrorKind::ConstructorArity
        );
    }

    #[test]
    fn if_without_else_is_unit() {
        assert_eq!(kind_of("fn main() -> Int { if true { 1 } }"), ErrorKind::UnificationFailure);
        ok("fn main() { if true { println(\"x\"); } }");
    }

    #[test]
    fn panic_in_statement_position() {
        ok("fn main() { panic(\"boom\"); }");
        ok("fn pick(b: Bool) -> Int { if b { 1 } else { panic(\"no\") } } fn main() -> Int { pick(true) }");
    }
}
