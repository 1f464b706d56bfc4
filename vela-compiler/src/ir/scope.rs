//! Lexical scope for the lowering pass.

use std::collections::HashMap;

use super::ir::{IrType, Value};

/// What a name resolves to: a stack slot holding a value of `ty`, or a
/// function handle usable as a call target.
#[derive(Debug, Clone)]
pub enum Binding {
    Slot { ptr: Value, ty: IrType },
    Func { name: String, ret: IrType },
}

/// A stack of frames. The bottom frame is the module scope holding function
/// handles; it is never popped. Lookup walks innermost to outermost, so
/// inner bindings shadow outer ones.
#[derive(Debug)]
pub struct Scope {
    frames: Vec<HashMap<String, Binding>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn bind(&mut self, name: String, binding: Binding) {
        if let Some(top) = self.frames.last_mut() {
            top.insert(name, binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
