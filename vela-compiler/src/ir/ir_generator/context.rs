use std::backtrace::Backtrace;

use crate::ast::Type;
use crate::frontend::lexer::{position_to_line_col, Span};
use crate::ir::ir::{IrType, Module, Value};
use crate::ir::scope::Scope;
use crate::trace::TraceSink;
use crate::{CompileError, LowerErrorKind};

/// Per-function state while its body is being lowered.
#[derive(Debug, Clone)]
pub struct FunctionCtx {
    pub name: String,
    pub return_ty: IrType,
}

pub struct Gen<'a> {
    pub out: Module,
    pub scope: Scope,
    pub fn_ctx: Option<FunctionCtx>,
    source: &'a str,
    trace: Option<&'a mut dyn TraceSink>,
}

impl<'a> Gen<'a> {
    pub fn new(source: &'a str, trace: Option<&'a mut dyn TraceSink>) -> Self {
        Self {
            out: Module::new(),
            scope: Scope::new(),
            fn_ctx: None,
            source,
            trace,
        }
    }

    pub fn finish(self) -> Module {
        self.out
    }

    /// Emits a trace line; the message is only built when a sink is present.
    pub fn trace(&mut self, message: impl FnOnce() -> String) {
        if let Some(sink) = self.trace.as_mut() {
            sink.trace(&message());
        }
    }

    pub fn make_error(&self, kind: LowerErrorKind, span: Span, message: String) -> CompileError {
        let (line, col) = position_to_line_col(self.source, span.start);
        CompileError::Lower {
            kind,
            line,
            col,
            message,
            backtrace: None,
        }
    }

    /// An upstream-contract violation; carries a captured call stack.
    pub fn make_internal(&self, span: Span, message: String) -> CompileError {
        let (line, col) = position_to_line_col(self.source, span.start);
        CompileError::Lower {
            kind: LowerErrorKind::Internal,
            line,
            col,
            message,
            backtrace: Some(Backtrace::force_capture().to_string()),
        }
    }

    /// Maps a semantic type onto its IR representation.
    pub fn ir_type(&self, ty: &Type, span: Span) -> Result<IrType, CompileError> {
        match ty {
            Type::Int { width, .. } => Ok(IrType::Int(*width)),
            Type::Float { width } => Ok(IrType::Float(*width)),
            Type::Bool => Ok(IrType::Int(1)),
            Type::Array { elem, len } => Ok(IrType::Array {
                elem: Box::new(self.ir_type(elem, span)?),
                len: *len,
            }),
            Type::Unknown => {
                Err(self.make_internal(span, "unresolved type reached lowering".to_string()))
            }
        }
    }

    /// Conditions feeding branches must already be `i1`.
    pub fn expect_bool(&self, value: &Value, span: Span) -> Result<(), CompileError> {
        if value.ty() == &IrType::BOOL {
            Ok(())
        } else {
            Err(self.make_error(
                LowerErrorKind::TypeMismatch,
                span,
                format!("condition has type {}, expected bool", value.ty()),
            ))
        }
    }
}
