//! Ahead-of-time compiler for the Vela language.
//!
//! Pipeline: source text → lexer → parser → type annotation → AST-to-IR
//! lowering → LLVM textual IR.

pub mod ast;
pub mod frontend;
pub mod ir;
pub mod trace;

use thiserror::Error;

pub use trace::{StderrTrace, TraceSink};

/// What went wrong during lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerErrorKind {
    /// A name lookup failed at expression or assignment time.
    UnknownIdentifier,
    /// A call target is not bound in module scope.
    UnknownFunction,
    /// The (float, operator) pair has no instruction mapping.
    UnsupportedBinaryOperator,
    /// A function block was left without a terminator on a reached path.
    MissingTerminator,
    /// A declared type and a produced value disagree past a cast.
    TypeMismatch,
    /// An upstream-contract violation (malformed or unannotated AST).
    Internal,
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Parse error at line {line}, column {col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("Lowering error at line {line}, column {col}: {message}")]
    Lower {
        kind: LowerErrorKind,
        line: usize,
        col: usize,
        message: String,
        /// Captured call stack, present on `LowerErrorKind::Internal`.
        backtrace: Option<String>,
    },
}

/// Parse and annotate source text into the typed AST.
pub fn compile_to_ast(source: &str) -> Result<ast::Program, CompileError> {
    let mut program = frontend::parse(source)?;
    frontend::annotate::annotate(&mut program);
    Ok(program)
}

/// Compile source text to the IR module.
pub fn compile_to_ir(source: &str) -> Result<ir::Module, CompileError> {
    let program = compile_to_ast(source)?;
    ir::ir_generator::lower(&program, source)
}

/// Compile source text directly to LLVM textual IR.
pub fn compile_to_llvm(source: &str) -> Result<String, CompileError> {
    Ok(compile_to_ir(source)?.to_string())
}

/// Like [`compile_to_llvm`], with lowering traces routed to the given sink.
pub fn compile_to_llvm_traced(
    source: &str,
    sink: &mut dyn TraceSink,
) -> Result<String, CompileError> {
    let program = compile_to_ast(source)?;
    let module = ir::ir_generator::lower_traced(&program, source, Some(sink))?;
    Ok(module.to_string())
}
