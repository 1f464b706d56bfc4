//! AST to IR lowering module.
//!
//! Walks the typed AST once and builds the basic-block IR module; the
//! module's textual rendering is LLVM assembly.

pub mod context;
pub mod expr;
pub mod stmt;

use crate::ast::Program;
use crate::ir::ir::Module;
use crate::trace::TraceSink;
use crate::CompileError;

/// The main Gen struct that orchestrates the lowering process.
pub use context::Gen;

/// Entry point for lowering an annotated Program to an IR Module.
pub fn lower(program: &Program, source: &str) -> Result<Module, CompileError> {
    lower_traced(program, source, None)
}

/// Like [`lower`], with per-node traces routed to the given sink.
pub fn lower_traced<'a>(
    program: &Program,
    source: &'a str,
    trace: Option<&'a mut dyn TraceSink>,
) -> Result<Module, CompileError> {
    let mut g = Gen::new(source, trace);
    g.lower_program(program)?;
    Ok(g.finish())
}
