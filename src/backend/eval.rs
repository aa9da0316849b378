//! Reference evaluator
//!
//! Walks the checked AST directly. Every call goes through the target the
//! analysis recorded for its span, with the caller's type arguments
//! substituted, so generic code runs exactly as its specializations would.

use crate::backend::value::{self, Elements, Value};
use crate::frontend::ast::{self, BinOp, Block, Expr, Item, Literal, Program, Stmt, UnOp};
use crate::semantic::{Analysis, CallTarget};
use crate::stdlib::Builtin;
use crate::traits::ImplOrigin;
use crate::types::{GenericDef, ParamSubst, Prim, Type};
use crate::utils::{Error, Result, Span};
use log::{debug, trace};
use std::collections::HashMap;
use std::io::Write;

/// Nested calls allowed before the program is stopped
pub const DEFAULT_CALL_DEPTH: usize = 10_000;

/// Native stack reserved per nested call, sized for unoptimized builds
pub const STACK_PER_CALL: usize = 64 * 1024;

/// Non-local exits
#[derive(Debug)]
enum Unwind {
    Break,
    Continue,
    Return(Value),
    Error(Error),
}

impl From<Error> for Unwind {
    fn from(err: Error) -> Self {
        Unwind::Error(err)
    }
}

type Flow<T> = std::result::Result<T, Unwind>;

/// Locals and type arguments of one call
struct Frame {
    scopes: Vec<HashMap<String, Value>>,
    subst: ParamSubst,
}

impl Frame {
    fn new(subst: ParamSubst) -> Self {
        Self { scopes: vec![HashMap::new()], subst }
    }

    fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name))
    }
}

pub struct Interpreter<'a> {
    program: &'a Program,
    analysis: &'a Analysis,
    out: &'a mut dyn Write,
    depth: usize,
    max_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(program: &'a Program, analysis: &'a Analysis, out: &'a mut dyn Write) -> Self {
        Self {
            program,
            analysis,
            out,
            depth: 0,
            max_depth: DEFAULT_CALL_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run `main` and return its value
    pub fn run_main(&mut self) -> Result<Value> {
        let analysis = self.analysis;
        let main = analysis.decls.functions.get("main").ok_or(Error::MissingMain)?;
        let func = self.function_item(main.item)?;
        debug!("running main");
        let value = self.call_body(&func.sig, &func.body, Vec::new(), ParamSubst::new())?;
        self.out.flush().map_err(|e| Error::Io(e.to_string()))?;
        Ok(value)
    }

    // ==================== Calls ====================

    fn call_body(&mut self, sig: &ast::FunctionSig, body: &Block, args: Vec<Value>, subst: ParamSubst) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(Error::runtime("stack overflow"));
        }
        self.depth += 1;
        let mut frame = Frame::new(subst);
        for (param, arg) in sig.params.iter().zip(args) {
            frame.define(&param.name.name, arg);
        }
        let result = self.eval_block(&mut frame, body);
        self.depth -= 1;
        match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            // loops catch these before they leave a body
            Err(Unwind::Break) | Err(Unwind::Continue) => Ok(Value::Unit),
        }
    }

    fn call(&mut self, target: &CallTarget, args: Vec<Value>) -> Result<Value> {
        trace!("call {}", target.name());
        let analysis = self.analysis;
        let decls = &analysis.decls;
        match target {
            CallTarget::Function { name, type_args } => {
                let def = decls
                    .functions
                    .get(name)
                    .ok_or_else(|| Error::runtime(format!("unknown function {}", name)))?;
                let func = self.function_item(def.item)?;
                let subst = subst_of(&def.sig.generics, type_args);
                self.call_body(&func.sig, &func.body, args, subst)
            }
            CallTarget::Builtin { builtin, .. } => self.call_builtin(*builtin, args),
            CallTarget::Constructor { ctor, .. } => {
                let tag = decls.ctors.get(ctor).map_or(0, |c| c.tag);
                Ok(Value::Adt { ctor: ctor.clone(), tag, fields: args })
            }
            CallTarget::InherentMethod { owner, method, type_args } => {
                let def = decls
                    .method(owner, method)
                    .ok_or_else(|| Error::runtime(format!("unknown method {}::{}", owner, method)))?;
                let func = self.impl_items(def.item)?.get(def.index).ok_or_else(|| {
                    Error::runtime(format!("unknown method {}::{}", owner, method))
                })?;
                let subst = subst_of(&def.sig.generics, type_args);
                self.call_body(&func.sig, &func.body, args, subst)
            }
            CallTarget::TraitMethod { trait_name, method, self_ty, trait_args } => {
                let (id, subst) = decls
                    .traits
                    .find_ground(trait_name, self_ty, trait_args)
                    .ok_or_else(|| Error::runtime(format!("no impl of {} for {}", trait_name, self_ty)))?;
                let ImplOrigin::Item(item) = decls.traits.impl_def(id).origin else {
                    return Err(Error::runtime(format!("{} has no body for {}", trait_name, method)));
                };
                let func = self
                    .impl_items(item)?
                    .iter()
                    .find(|m| m.sig.name.name == *method)
                    .ok_or_else(|| Error::runtime(format!("no method {} in impl of {}", method, trait_name)))?;
                self.call_body(&func.sig, &func.body, args, subst)
            }
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value> {
        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or(Value::Unit);
        match builtin {
            Builtin::Print | Builtin::Println => {
                let text = next();
                let newline = if builtin == Builtin::Println { "\n" } else { "" };
                write!(self.out, "{}{}", text, newline).map_err(|e| Error::Io(e.to_string()))?;
                Ok(Value::Unit)
            }
            Builtin::Concat => {
                let (a, b) = (next(), next());
                Ok(Value::Str(format!("{}{}", a, b)))
            }
            Builtin::ToString => Ok(Value::Str(next().to_string())),
            Builtin::Len => match next() {
                Value::Array(elements) => Ok(Value::int(value::read(&elements).len() as i128)),
                other => Err(type_fault("Array", &other)),
            },
            Builtin::Push => match next() {
                Value::Array(elements) => {
                    value::write(&elements).push(next());
                    Ok(Value::Unit)
                }
                other => Err(type_fault("Array", &other)),
            },
            Builtin::Panic => Err(Error::runtime(next().to_string())),
        }
    }

    fn function_item(&self, index: usize) -> Result<&'a ast::Function> {
        match self.program.items.get(index) {
            Some(Item::Function(func)) => Ok(func),
            _ => Err(Error::runtime(format!("item {} is not a function", index))),
        }
    }

    fn impl_items(&self, index: usize) -> Result<&'a [ast::Function]> {
        match self.program.items.get(index) {
            Some(Item::Impl(block)) => Ok(&block.methods),
            _ => Err(Error::runtime(format!("item {} is not an impl", index))),
        }
    }

    /// Recorded target at `span`, specialized to the current frame
    fn target(&self, frame: &Frame, span: Span) -> Result<CallTarget> {
        let target = self
            .analysis
            .targets
            .get(&span)
            .ok_or_else(|| Error::runtime(format!("no call target at {}:{}", span.line, span.column)))?;
        Ok(target.map_types(|t| t.subst(&frame.subst)))
    }

    // ==================== Statements ====================

    fn eval_block(&mut self, frame: &mut Frame, block: &Block) -> Flow<Value> {
        frame.scopes.push(HashMap::new());
        let result = self.eval_stmts(frame, &block.stmts);
        frame.scopes.pop();
        result
    }

    fn eval_stmts(&mut self, frame: &mut Frame, stmts: &[Stmt]) -> Flow<Value> {
        let mut value = Value::Unit;
        for stmt in stmts {
            value = Value::Unit;
            match stmt {
                Stmt::Let { name, value: init, .. } => {
                    let v = self.eval(frame, init)?;
                    frame.define(&name.name, v);
                }
                Stmt::Expr { expr, semi } => {
                    let v = self.eval(frame, expr)?;
                    if !semi {
                        value = v;
                    }
                }
                Stmt::Return { value: result, .. } => {
                    let v = match result {
                        Some(expr) => self.eval(frame, expr)?,
                        None => Value::Unit,
                    };
                    return Err(Unwind::Return(v));
                }
                Stmt::Break { .. } => return Err(Unwind::Break),
                Stmt::Continue { .. } => return Err(Unwind::Continue),
            }
        }
        Ok(value)
    }

    // ==================== Expressions ====================

    fn eval(&mut self, frame: &mut Frame, expr: &Expr) -> Flow<Value> {
        match expr {
            Expr::Literal(lit) => Ok(self.literal(frame, lit)),
            Expr::Ident(ident) => {
                if let Some(value) = frame.get(&ident.name) {
                    return Ok(value.clone());
                }
                match self.target(frame, ident.span)? {
                    CallTarget::Constructor { ctor, .. } => {
                        let tag = self.analysis.decls.ctors.get(&ctor).map_or(0, |c| c.tag);
                        Ok(Value::Adt { ctor, tag, fields: Vec::new() })
                    }
                    target => Ok(Value::Func(target)),
                }
            }
            Expr::Binary { left, op, right, .. } => self.binary(frame, left, *op, right),
            Expr::Unary { op, expr, .. } => match (op, self.eval(frame, expr)?) {
                (UnOp::Neg, Value::Int { value, prim }) => Ok(Value::Int { value: prim.wrap(-value), prim }),
                (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (_, other) => Err(type_fault("operand", &other).into()),
            },
            Expr::Assign { target, op, value, .. } => {
                let mut new_value = self.eval(frame, value)?;
                if let Some(op) = op {
                    let current = self.eval(frame, target)?;
                    new_value = arithmetic(*op, current, new_value)?;
                }
                self.store(frame, target, new_value)?;
                Ok(Value::Unit)
            }
            Expr::Call { func, args, span } => {
                let target = match func.as_ref() {
                    Expr::Ident(ident) if frame.get(&ident.name).is_none() => self.target(frame, *span)?,
                    other => match self.eval(frame, other)? {
                        Value::Func(target) => target,
                        value => return Err(type_fault("function", &value).into()),
                    },
                };
                let args = self.eval_all(frame, args)?;
                Ok(self.call(&target, args)?)
            }
            Expr::MethodCall { expr, args, span, .. } => {
                let receiver = self.eval(frame, expr)?;
                let target = self.target(frame, *span)?;
                let mut values = Vec::with_capacity(args.len() + 1);
                values.push(receiver);
                values.extend(self.eval_all(frame, args)?);
                Ok(self.call(&target, values)?)
            }
            Expr::Field { expr, field, .. } => match self.eval(frame, expr)? {
                Value::Struct { fields, .. } => fields
                    .into_iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, v)| v)
                    .ok_or_else(|| Unwind::from(Error::runtime(format!("no field {}", field.name)))),
                other => Err(type_fault("struct", &other).into()),
            },
            Expr::Index { expr, index, .. } => {
                let (elements, i) = self.element(frame, expr, index)?;
                let element = value::read(&elements)[i].clone();
                Ok(element)
            }
            Expr::Block(block) => self.eval_block(frame, block),
            Expr::If { cond, then_block, else_branch, .. } => {
                if self.condition(frame, cond)? {
                    self.eval_block(frame, then_block)
                } else {
                    match else_branch {
                        Some(else_expr) => self.eval(frame, else_expr),
                        None => Ok(Value::Unit),
                    }
                }
            }
            Expr::Match { expr, arms, .. } => {
                let (ctor, fields) = match self.eval(frame, expr)? {
                    Value::Adt { ctor, fields, .. } => (ctor, fields),
                    other => return Err(type_fault("enum", &other).into()),
                };
                let arm = arms
                    .iter()
                    .find(|arm| arm.pattern.constructor.name == ctor)
                    .ok_or_else(|| Error::runtime(format!("no arm for {}", ctor)))?;
                frame.scopes.push(HashMap::new());
                for (binding, value) in arm.pattern.bindings.iter().zip(fields) {
                    if binding.name != "_" {
                        frame.define(&binding.name, value);
                    }
                }
                let result = self.eval(frame, &arm.body);
                frame.scopes.pop();
                result
            }
            Expr::Loop { body, .. } => loop {
                match self.eval_block(frame, body) {
                    Ok(_) | Err(Unwind::Continue) => {}
                    Err(Unwind::Break) => return Ok(Value::Unit),
                    Err(other) => return Err(other),
                }
            },
            Expr::While { cond, body, .. } => {
                while self.condition(frame, cond)? {
                    match self.eval_block(frame, body) {
                        Ok(_) | Err(Unwind::Continue) => {}
                        Err(Unwind::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(Value::Unit)
            }
            Expr::StructLit { name, fields, .. } => {
                let mut given = HashMap::with_capacity(fields.len());
                for (field, expr) in fields {
                    given.insert(field.name.as_str(), self.eval(frame, expr)?);
                }
                let order = self
                    .analysis
                    .decls
                    .members
                    .get(&name.name)
                    .map(|m| m.fields())
                    .unwrap_or_default();
                let fields = order
                    .into_iter()
                    .map(|(field, _)| (field.to_string(), given.remove(field).unwrap_or(Value::Unit)))
                    .collect();
                Ok(Value::Struct { name: name.name.clone(), fields })
            }
            Expr::Array { elements, .. } => Ok(Value::array(self.eval_all(frame, elements)?)),
        }
    }

    fn eval_all(&mut self, frame: &mut Frame, exprs: &[Expr]) -> Flow<Vec<Value>> {
        exprs.iter().map(|e| self.eval(frame, e)).collect()
    }

    fn condition(&mut self, frame: &mut Frame, cond: &Expr) -> Flow<bool> {
        match self.eval(frame, cond)? {
            Value::Bool(b) => Ok(b),
            other => Err(type_fault("Bool", &other).into()),
        }
    }

    /// The literal's type after substituting the frame's type arguments
    fn literal(&self, frame: &Frame, lit: &Literal) -> Value {
        match lit {
            Literal::Int { value, span, .. } => {
                let prim = match self.analysis.literals.get(span).map(|t| t.subst(&frame.subst)) {
                    Some(Type::Prim(prim)) => prim,
                    _ => Prim::Int,
                };
                Value::Int { value: prim.wrap(*value), prim }
            }
            Literal::String(s, _) => Value::Str(s.clone()),
            Literal::Bool(b, _) => Value::Bool(*b),
        }
    }

    fn binary(&mut self, frame: &mut Frame, left: &Expr, op: BinOp, right: &Expr) -> Flow<Value> {
        if matches!(op, BinOp::And | BinOp::Or) {
            let lhs = self.condition(frame, left)?;
            if lhs == (op == BinOp::Or) {
                return Ok(Value::Bool(lhs));
            }
            return Ok(Value::Bool(self.condition(frame, right)?));
        }
        let lhs = self.eval(frame, left)?;
        let rhs = self.eval(frame, right)?;
        match op {
            BinOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinOp::Ne => Ok(Value::Bool(lhs != rhs)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let (a, b) = (int_of(&lhs)?, int_of(&rhs)?);
                Ok(Value::Bool(match op {
                    BinOp::Lt => a < b,
                    BinOp::Le => a <= b,
                    BinOp::Gt => a > b,
                    _ => a >= b,
                }))
            }
            _ => Ok(arithmetic(op, lhs, rhs)?),
        }
    }

    /// Array and in-bounds index of `expr[index]`
    fn element(&mut self, frame: &mut Frame, expr: &Expr, index: &Expr) -> Flow<(Elements, usize)> {
        let elements = match self.eval(frame, expr)? {
            Value::Array(elements) => elements,
            other => return Err(type_fault("Array", &other).into()),
        };
        let i = int_of(&self.eval(frame, index)?)?;
        let len = value::read(&elements).len();
        match usize::try_from(i) {
            Ok(i) if i < len => Ok((elements, i)),
            _ => Err(Error::runtime(format!("index out of bounds: the length is {} but the index is {}", len, i)).into()),
        }
    }

    /// Write through an assignable place. Fields are updated by rebuilding
    /// the enclosing value; array slots are updated in place.
    fn store(&mut self, frame: &mut Frame, target: &Expr, value: Value) -> Flow<()> {
        match target {
            Expr::Ident(ident) => {
                let slot = frame
                    .get_mut(&ident.name)
                    .ok_or_else(|| Error::runtime(format!("no variable {}", ident.name)))?;
                *slot = value;
                Ok(())
            }
            Expr::Field { expr, field, .. } => {
                let mut base = self.eval(frame, expr)?;
                match &mut base {
                    Value::Struct { fields, .. } => {
                        if let Some((_, slot)) = fields.iter_mut().find(|(name, _)| *name == field.name) {
                            *slot = value;
                        }
                    }
                    other => return Err(type_fault("struct", other).into()),
                }
                self.store(frame, expr, base)
            }
            Expr::Index { expr, index, .. } => {
                let (elements, i) = self.element(frame, expr, index)?;
                value::write(&elements)[i] = value;
                Ok(())
            }
            other => Err(Error::NotAnLvalue { span: other.span() }.into()),
        }
    }
}

/// `+ - * / %` at the operands' width
fn arithmetic(op: BinOp, lhs: Value, rhs: Value) -> Result<Value> {
    let (Value::Int { value: a, prim }, Value::Int { value: b, .. }) = (&lhs, &rhs) else {
        return Err(type_fault("integer", if matches!(lhs, Value::Int { .. }) { &rhs } else { &lhs }));
    };
    let (a, b, prim) = (*a, *b, *prim);
    let value = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Mod if b == 0 => return Err(Error::runtime("division by zero")),
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        other => return Err(Error::runtime(format!("{:?} is not an arithmetic operator", other))),
    };
    Ok(Value::Int { value: prim.wrap(value), prim })
}

fn int_of(value: &Value) -> Result<i128> {
    match value {
        Value::Int { value, .. } => Ok(*value),
        other => Err(type_fault("integer", other)),
    }
}

fn type_fault(expected: &str, got: &Value) -> Error {
    Error::runtime(format!("expected {}, found {}", expected, got.type_name()))
}

fn subst_of(generics: &[GenericDef], type_args: &[Type]) -> ParamSubst {
    generics
        .iter()
        .map(|g| g.param.id)
        .zip(type_args.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, CompileOptions};
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> (Result<Value>, String) {
        let compilation = match compile(source, &CompileOptions::default()) {
            Ok(c) => c,
            Err(err) => panic!("unexpected error: {}", err),
        };
        let mut out = Vec::new();
        let result = Interpreter::new(&compilation.program, &compilation.analysis, &mut out).run_main();
        (result, String::from_utf8_lossy(&out).into_owned())
    }

    fn value_of(source: &str) -> String {
        match run(source).0 {
            Ok(value) => value.to_string(),
            Err(err) => panic!("runtime error: {}", err),
        }
    }

    #[test]
    fn arithmetic_wraps_at_the_type_width() {
        assert_eq!(value_of("fn main() -> UInt8 { let x: UInt8 = 250; x + 10 }"), "4");
        assert_eq!(value_of("fn main() -> Int32 { let x: Int32 = 2147483647; x + 1 }"), "-2147483648");
        assert_eq!(value_of("fn main() -> Int { -7 / 2 }"), "-3");
        assert_eq!(value_of("fn main() -> Int { -7 % 2 }"), "-1");
    }

    #[test]
    fn loops_and_assignment() {
        let src = "fn main() -> Int {\n\
                     let total = 0; let i = 0;\n\
                     while i < 10 { i += 1; if i % 2 == 0 { continue; } total += i; }\n\
                     loop { if total > 100 { break; } total = total * 2; }\n\
                     total\n\
                   }";
        assert_eq!(value_of(src), "200");
    }

    #[test]
    fn struct_fields_and_arrays_are_assignable() {
        let src = "struct Point { x: Int, y: Int }\n\
                   fn main() -> Int {\n\
                     let p = Point { y: 2, x: 1 };\n\
                     p.x = 10;\n\
                     let xs = [1, 2, 3];\n\
                     xs[1] = 20;\n\
                     push(xs, 300);\n\
                     p.x + p.y + xs[1] + xs[3] + len(xs)\n\
                   }";
        assert_eq!(value_of(src), "336");
    }

    #[test]
    fn generic_literals_take_the_instantiated_width() {
        let src = "fn bump<T: Num>(x: T) -> T { x + 1 }\n\
                   fn main() -> UInt8 { let a: UInt8 = 255; bump(a) }";
        assert_eq!(value_of(src), "0");
    }

    #[test]
    fn trait_dispatch_follows_the_receiver_type() {
        let src = "trait Show { fn show(self) -> String; }\n\
                   impl Show for Int { fn show(self) -> String { to_string(self) } }\n\
                   impl Show for Bool { fn show(self) -> String { if self { \"yes\" } else { \"no\" } } }\n\
                   impl<T: Show> Show for Option<T> { fn show(self) -> String { match self { Some(x) => concat(\"Some \", x.show()), None => \"None\" } } }\n\
                   fn main() { println(Some(true).show()); println(Some(42).show()); print(false.show()); }";
        let (result, out) = run(src);
        assert!(result.is_ok());
        assert_eq!(out, "Some yes\nSome 42\nno");
    }

    #[test]
    fn function_values_and_early_return() {
        let src = "fn double(x: Int) -> Int { return x * 2; }\n\
                   fn apply(f: fn(Int) -> Int, x: Int) -> Int { f(x) }\n\
                   fn main() -> Int { apply(double, 21) }";
        assert_eq!(value_of(src), "42");
    }

    #[test]
    fn runtime_faults() {
        let message = |src: &str| run(src).0.unwrap_err().to_string();
        assert_eq!(message("fn main() -> Int { let z = 0; 1 / z }"), "division by zero");
        assert_eq!(
            message("fn main() -> Int { let xs = [1]; xs[3] }"),
            "index out of bounds: the length is 1 but the index is 3"
        );
        assert_eq!(message("fn main() -> Int { panic(\"boom\") }"), "boom");
    }

    #[test]
    fn unbounded_recursion_overflows() {
        let compilation = compile("fn f(n: Int) -> Int { f(n + 1) }\nfn main() -> Int { f(0) }", &CompileOptions::default())
            .unwrap();
        let mut out = Vec::new();
        let err = Interpreter::new(&compilation.program, &compilation.analysis, &mut out)
            .with_max_depth(32)
            .run_main()
            .unwrap_err();
        assert_eq!(err.to_string(), "stack overflow");
    }
}
