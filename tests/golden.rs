//! End-to-end golden tests: rendered diagnostics and program results

use pretty_assertions::assert_eq;
use splc::utils::ErrorKind;
use splc::{CompileOptions, Session};

/// Rendered diagnostic for a program that must fail to compile
fn diagnostic(name: &str, source: &str) -> String {
    let mut session = Session::new(CompileOptions::default());
    match session.compile(name, source) {
        Ok(_) => panic!("{} compiled without errors", name),
        Err(err) => session.render(&err).to_string(),
    }
}

fn kind(source: &str) -> ErrorKind {
    match splc::compile(source, &CompileOptions::default()) {
        Ok(_) => panic!("expected a compile error"),
        Err(err) => err.kind(),
    }
}

/// Program output followed by the rendered value of `main`
fn run(source: &str) -> String {
    let mut session = Session::new(CompileOptions::default());
    let compilation = match session.compile("main.spl", source) {
        Ok(compilation) => compilation,
        Err(err) => panic!("unexpected error: {}", session.render(&err)),
    };
    let mut out = Vec::new();
    let result = splc::run(&compilation, &mut out);
    let mut text = String::from_utf8_lossy(&out).into_owned();
    match result {
        Ok(value) => text.push_str(&value.to_string()),
        Err(err) => text.push_str(&session.render(&err).to_string()),
    }
    text
}

#[test]
fn option_match_evaluates() {
    assert_eq!(run("fn main() -> Int { match Some(5) { Some(x) => x, None => 0 } }"), "5");
}

#[test]
fn overlapping_impls_cite_the_earlier_impl() {
    let src = "trait Show { fn show(self) -> String; }\n\
               impl<T> Show for Option<T> { fn show(self) -> String { \"any\" } }\n\
               impl Show for Option<Int> { fn show(self) -> String { \"int\" } }\n\
               fn main() {}\n";
    assert_eq!(
        diagnostic("overlap.spl", src),
        "Error: overlap.spl:3:1: overlapping impl of trait Show for type Option<Int>\n\
         Previous impl for type `Option<T>` at overlap.spl:2:1"
    );
}

#[test]
fn impls_guarded_by_disjoint_bounds_do_not_overlap() {
    let src = "trait Show { fn show(self) -> String; }\n\
               trait Tag { fn tag(self) -> Int; }\n\
               impl Tag for Bool { fn tag(self) -> Int { 1 } }\n\
               impl<T: Tag> Show for Option<T> { fn show(self) -> String { \"tagged\" } }\n\
               impl Show for Option<Int> { fn show(self) -> String { \"int\" } }\n\
               fn main() { println(Some(1).show()); println(Some(true).show()); }\n";
    assert_eq!(run(src), "int\ntagged\n()");
}

#[test]
fn literal_past_int_range() {
    assert_eq!(
        diagnostic("big.spl", "fn main() -> Int {\n  9223372036854775808\n}\n"),
        "Error: big.spl:2:3: integer literal out of range: 9223372036854775808"
    );
    assert_eq!(run("fn main() -> UInt { 9223372036854775808 }"), "9223372036854775808");
    assert_eq!(run("fn main() -> UInt { let big = 9223372036854775808; big }"), "9223372036854775808");
}

#[test]
fn empty_constructor_needs_context() {
    assert_eq!(
        diagnostic("none.spl", "fn main() {\n  let x = None;\n}\n"),
        "Error: none.spl:2:11: cannot infer concrete type of call to constructor None"
    );
    assert_eq!(run("fn pick() -> Option<Int> { None }\nfn main() -> Int { match pick() { Some(x) => x, None => 7 } }"), "7");
}

#[test]
fn undefined_symbol_position() {
    assert_eq!(
        diagnostic("undef.spl", "fn main() -> Int {\n  let a = 1;\n  a + b\n}\n"),
        "Error: undef.spl:3:7: symbol \"b\" is not defined in this scope"
    );
}

#[test]
fn duplicate_and_shadowed_locals() {
    assert_eq!(
        diagnostic("dup.spl", "fn main() {\n  let a = 1;\n  let a = 2;\n}\n"),
        "Error: dup.spl:3:7: symbol \"a\" is already defined in this scope"
    );
    assert_eq!(run("fn main() -> Bool { let a = 1; { let a = true; a } }"), "true");
}

#[test]
fn match_coverage() {
    let missing = "enum Color { Red, Green, Blue }\n\
                   fn main() -> Int {\n  match Red { Red => 1, Green => 2 }\n}\n";
    assert_eq!(diagnostic("m.spl", missing), "Error: m.spl:3:3: switch statement is not exhaustive");

    let repeated = "enum Color { Red, Green, Blue }\n\
                    fn main() -> Int {\n  match Red { Red => 1, Green => 2, Red => 3, Blue => 4 }\n}\n";
    assert_eq!(diagnostic("m.spl", repeated), "Error: m.spl:3:37: cannot repeat constructors in match statement");

    let shuffled = "enum Color { Red, Green, Blue }\n\
                    fn main() -> Int { match Blue { Blue => 3, Red => 1, Green => 2 } }\n";
    assert_eq!(run(shuffled), "3");
}

#[test]
fn type_errors() {
    assert_eq!(
        diagnostic("t.spl", "fn main() -> Int { true }"),
        "Error: t.spl:1:20: cannot unify types Int and Bool"
    );
    assert_eq!(kind("fn main() -> Bool { true + false }"), ErrorKind::UnsatisfiedConstraint);
    assert_eq!(kind("fn twice<T>(x: T) -> T { x + x }\nfn main() {}"), ErrorKind::UnsatisfiedConstraint);
    assert_eq!(kind("fn main() { let xs = []; push(xs, xs); }"), ErrorKind::UnificationFailure);
}

#[test]
fn builtin_trait_is_closed() {
    assert_eq!(
        diagnostic("num.spl", "struct Money { cents: Int }\nimpl Num for Money {}\nfn main() {}\n"),
        "Error: num.spl:2:1: cannot add new instances to built-in trait Num"
    );
}

#[test]
fn member_kind_mismatch() {
    let src = "struct Counter { count: Int }\n\
               impl Counter { fn get(self) -> Int { self.count } }\n\
               fn main() -> Int {\n  let c = Counter { count: 1 };\n  c.get\n}\n";
    assert_eq!(diagnostic("k.spl", src), "Error: k.spl:5:5: get is a method, not a member variable");
}

#[test]
fn generic_program_runs_through_traits_and_methods() {
    let src = "trait Show { fn show(self) -> String; }\n\
               impl Show for Int { fn show(self) -> String { to_string(self) } }\n\
               impl<T: Show> Show for Option<T> {\n\
                 fn show(self) -> String { match self { Some(x) => concat(\"Some(\", concat(x.show(), \")\")), None => \"None\" } }\n\
               }\n\
               struct Stack<T> { items: Array<T> }\n\
               impl<T> Stack<T> {\n\
                 fn push(self, x: T) { push(self.items, x); }\n\
                 fn top(self) -> Option<T> { let n = len(self.items); if n == 0 { None } else { Some(self.items[n - 1]) } }\n\
               }\n\
               fn largest<T: Num>(a: T, b: T) -> T where T: Eq { if a > b { a } else { b } }\n\
               fn main() {\n\
                 let s = Stack { items: [] };\n\
                 println(s.top().show());\n\
                 s.push(largest(3, 9));\n\
                 println(s.top().show());\n\
               }\n";
    assert_eq!(run(src), "None\nSome(9)\n()");
}

#[test]
fn runtime_exceptions_are_rendered() {
    assert_eq!(run("fn main() -> Int { let d = 0; 10 / d }"), "*** Exception: division by zero");
    assert_eq!(
        run("fn main() { println(\"before\"); panic(\"gave up\"); }"),
        "before\n*** Exception: gave up"
    );
}

#[test]
fn polymorphic_recursion_is_rejected() {
    let src = "fn nest<T>(x: T, n: Int) -> Int { if n == 0 { 0 } else { nest(Some(x), n - 1) } }\n\
               fn main() -> Int { nest(0, 2) }\n";
    let mut session = Session::new(CompileOptions { instantiation_limit: 8, ..CompileOptions::default() });
    let err = match session.compile("rec.spl", src) {
        Ok(_) => panic!("expected polymorphic recursion"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::PolymorphicRecursion);
    assert_eq!(
        session.render(&err).to_string(),
        "Error: rec.spl:1:58: instantiation of nest exceeds the limit of 8 specializations"
    );
}

#[test]
fn json_diagnostics_carry_the_kind() {
    let mut session = Session::new(CompileOptions::default());
    let err = match session.compile("j.spl", "fn main() -> Int { nope }") {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    let json: serde_json::Value = serde_json::from_str(&session.render(&err).to_json()).unwrap();
    assert_eq!(json["kind"], "UndefinedSymbol");
    assert_eq!(json["location"]["line"], 1);
}

#[test]
fn overlap_found_when_the_enabling_impl_comes_last() {
    let src = "trait Show { fn show(self) -> String; }\n\
               trait Tr { fn go(self) -> Int; }\n\
               impl<T: Show> Tr for T { fn go(self) -> Int { 1 } }\n\
               impl Tr for Bool { fn go(self) -> Int { 2 } }\n\
               impl Show for Bool { fn show(self) -> String { \"b\" } }\n\
               fn main() -> Int { true.go() }\n";
    assert_eq!(
        diagnostic("late.spl", src),
        "Error: late.spl:4:1: overlapping impl of trait Tr for type Bool\n\
         Previous impl for type `T` at late.spl:3:1"
    );
}

#[test]
fn repeated_method_type_parameter_position() {
    let src = "struct Cell<T> { x: T }\nimpl<T> Cell<T> {\n  fn get<T>(self) -> Int { 1 }\n}\nfn main() {}\n";
    assert_eq!(
        diagnostic("rep.spl", src),
        "Error: rep.spl:3:10: type parameter \"T\" is repeated"
    );
}

#[test]
fn deep_recursion_runs_up_to_the_call_limit() {
    let count = "fn count(n: Int) -> Int { if n == 0 { 0 } else { 1 + count(n - 1) } }\n";
    assert_eq!(run(&format!("{}fn main() -> Int {{ count(9000) }}", count)), "9000");
    assert_eq!(
        run(&format!("{}fn main() -> Int {{ count(20000) }}", count)),
        "*** Exception: stack overflow"
    );
}
