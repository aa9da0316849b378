//! splc - static semantic core for a small language with traits
//!
//! Source goes through the lexer and parser, two-phase semantic analysis
//! (declarations, then bodies) and a monomorphization feasibility pass.
//! A reference evaluator runs checked programs.

pub mod backend;
pub mod frontend;
pub mod semantic;
pub mod stdlib;
pub mod traits;
pub mod types;
pub mod utils;

use crate::backend::{Interpreter, Value, DEFAULT_CALL_DEPTH, STACK_PER_CALL};
use crate::frontend::ast::Program;
use crate::semantic::Analysis;
use crate::utils::{Diagnostic, Error, Result, SourceMap};
use log::{debug, info};
use std::io::Write;
use std::thread;

/// Knobs of one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Specializations allowed per generic definition
    pub instantiation_limit: usize,
    /// Default unconstrained integer literals to `Int`
    pub numeric_defaulting: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            instantiation_limit: 4096,
            numeric_defaulting: true,
        }
    }
}

/// A program that passed every check
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Prelude items followed by the user's items
    pub program: Program,
    pub analysis: Analysis,
}

/// Compiles one file and renders its diagnostics
#[derive(Debug, Clone, Default)]
pub struct Session {
    options: CompileOptions,
    sources: SourceMap,
}

impl Session {
    pub fn new(options: CompileOptions) -> Self {
        Self { options, sources: SourceMap::new() }
    }

    pub fn compile(&mut self, name: &str, source: &str) -> Result<Compilation> {
        self.sources = SourceMap::new();
        let file = self.sources.add(name);
        let prelude_file = self.sources.add(stdlib::PRELUDE_NAME);

        let prelude = frontend::parse_source(stdlib::PRELUDE, prelude_file)?;
        let user = frontend::parse_source(source, file)?;
        info!("parsed {} with {} item(s)", name, user.items.len());

        let mut program = prelude;
        program.items.extend(user.items);
        let analysis = semantic::analyze(&program, &self.options)?;
        Ok(Compilation { program, analysis })
    }

    pub fn render(&self, error: &Error) -> Diagnostic {
        Diagnostic::new(error, &self.sources)
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }
}

/// Compile `source` as a file named `main.spl`
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compilation> {
    Session::new(options.clone()).compile("main.spl", source)
}

/// Evaluate `main`, writing program output to `out`
///
/// Evaluation runs on its own thread whose stack covers
/// `DEFAULT_CALL_DEPTH` nested calls, so the call limit is reported as a
/// runtime exception before the native stack runs out.
pub fn run(compilation: &Compilation, out: &mut (dyn Write + Send)) -> Result<Value> {
    let stack_size = DEFAULT_CALL_DEPTH * STACK_PER_CALL;
    debug!("evaluating with a {} MiB stack", stack_size >> 20);
    thread::scope(|scope| -> Result<Value> {
        let worker = thread::Builder::new()
            .name("splc-eval".into())
            .stack_size(stack_size)
            .spawn_scoped(scope, move || {
                Interpreter::new(&compilation.program, &compilation.analysis, out).run_main()
            })
            .map_err(|err| Error::Io(format!("failed to spawn evaluation thread: {}", err)))?;
        match worker.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    })
}
