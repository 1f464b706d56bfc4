use super::context::{FunctionCtx, Gen};
use crate::ast::{Block as AstBlock, Expr, ForStmt, Function as AstFunction, IfStmt, Program, Stmt};
use crate::frontend::lexer::Span;
use crate::ir::builder::FunctionBuilder;
use crate::ir::ir::Value;
use crate::ir::scope::Binding;
use crate::{CompileError, LowerErrorKind};

impl<'a> Gen<'a> {
    pub fn lower_program(&mut self, p: &Program) -> Result<(), CompileError> {
        // First pass: bind every function handle in the module scope so that
        // calls to later-declared functions resolve.
        for f in &p.functions {
            let ret = self.ir_type(&f.return_ty, f.span)?;
            self.scope.bind(
                f.name.clone(),
                Binding::Func {
                    name: f.name.clone(),
                    ret,
                },
            );
        }

        // Second pass: lower the bodies.
        for f in &p.functions {
            self.lower_function(f)?;
        }
        Ok(())
    }

    pub fn lower_function(&mut self, f: &AstFunction) -> Result<(), CompileError> {
        self.trace(|| format!("function '{}'", f.name));

        let return_ty = self.ir_type(&f.return_ty, f.span)?;
        let mut params = Vec::with_capacity(f.params.len());
        for p in &f.params {
            params.push((p.name.clone(), self.ir_type(&p.ty, p.span)?));
        }
        let mut b = FunctionBuilder::new(&f.name, &params, return_ty.clone());

        let prev_ctx = self.fn_ctx.take();
        self.fn_ctx = Some(FunctionCtx {
            name: f.name.clone(),
            return_ty,
        });
        self.scope.push();

        // Every parameter gets an entry-block slot before any user statement;
        // reads and writes then go through loads and stores like any local.
        for (name, ty) in &params {
            let incoming = Value::Reg {
                name: name.clone(),
                ty: ty.clone(),
            };
            let slot = b.alloca(ty.clone());
            b.store(incoming, slot.clone());
            self.scope.bind(
                name.clone(),
                Binding::Slot {
                    ptr: slot,
                    ty: ty.clone(),
                },
            );
        }

        self.lower_block(&mut b, &f.body)?;

        b.prune_dead_blocks();
        if b.unterminated_label().is_some() {
            return Err(self.make_error(
                LowerErrorKind::MissingTerminator,
                f.span,
                format!("function '{}' does not return on every path", f.name),
            ));
        }

        self.scope.pop();
        self.fn_ctx = prev_ctx;
        self.out.functions.push(b.finish());
        Ok(())
    }

    /// A source block opens a scope frame, not a basic block; new basic
    /// blocks only come from control flow.
    pub fn lower_block(
        &mut self,
        b: &mut FunctionBuilder,
        block: &AstBlock,
    ) -> Result<(), CompileError> {
        self.scope.push();
        for s in &block.stmts {
            self.lower_stmt(b, s)?;
        }
        self.scope.pop();
        Ok(())
    }

    pub fn lower_stmt(&mut self, b: &mut FunctionBuilder, s: &Stmt) -> Result<(), CompileError> {
        self.trace(|| format!("statement {}", stmt_name(s)));
        match s {
            Stmt::Declare {
                name,
                ty,
                init,
                span,
            } => {
                if let Expr::ArrayList { .. } = init {
                    // The initializer list stores through the slot, so the
                    // slot has to exist and be bound first.
                    let slot_ty = self.ir_type(ty, *span)?;
                    let slot = b.alloca(slot_ty.clone());
                    self.scope.bind(
                        name.clone(),
                        Binding::Slot {
                            ptr: slot,
                            ty: slot_ty,
                        },
                    );
                    self.lower_array_list(b, init)
                } else {
                    let value = self.lower_expr(b, init)?;
                    let declared = self.ir_type(ty, *span)?;
                    if value.ty() != &declared {
                        return Err(self.make_error(
                            LowerErrorKind::TypeMismatch,
                            *span,
                            format!(
                                "'{name}' is declared as {declared} but its initializer has type {}",
                                value.ty()
                            ),
                        ));
                    }
                    let slot = b.alloca(declared.clone());
                    b.store(value, slot.clone());
                    self.scope.bind(
                        name.clone(),
                        Binding::Slot {
                            ptr: slot,
                            ty: declared,
                        },
                    );
                    Ok(())
                }
            }
            Stmt::Assign {
                name,
                value,
                declare,
                span,
            } => self.lower_assign(b, name, value, *declare, *span),
            Stmt::Return { value, span } => {
                let return_ty = match &self.fn_ctx {
                    Some(ctx) => ctx.return_ty.clone(),
                    None => {
                        return Err(
                            self.make_internal(*span, "return outside of a function".to_string())
                        )
                    }
                };
                let v = self.lower_expr(b, value)?;
                let v = b.cast(v, return_ty).map_err(|c| {
                    self.make_error(
                        LowerErrorKind::TypeMismatch,
                        *span,
                        format!("cannot return {} as {}", c.from, c.to),
                    )
                })?;
                b.ret(v);
                Ok(())
            }
            Stmt::If(node) => self.lower_if(b, node),
            Stmt::For(node) => self.lower_for(b, node),
            Stmt::Expr { expr, .. } => {
                // Lowered for its effects; the value is discarded.
                self.lower_expr(b, expr)?;
                Ok(())
            }
            Stmt::Block(block) => self.lower_block(b, block),
        }
    }

    fn lower_assign(
        &mut self,
        b: &mut FunctionBuilder,
        name: &str,
        value: &Expr,
        declare: bool,
        span: Span,
    ) -> Result<(), CompileError> {
        if declare {
            let v = self.lower_expr(b, value)?;
            let ty = v.ty().clone();
            let slot = b.alloca(ty.clone());
            b.store(v, slot.clone());
            self.scope
                .bind(name.to_string(), Binding::Slot { ptr: slot, ty });
            return Ok(());
        }

        // Re-assignment: the target has to be bound already.
        let binding = match self.scope.lookup(name) {
            Some(binding) => binding.clone(),
            None => {
                return Err(self.make_error(
                    LowerErrorKind::UnknownIdentifier,
                    span,
                    format!("'{name}' is not defined"),
                ))
            }
        };
        let v = self.lower_expr(b, value)?;
        match binding {
            Binding::Slot { ptr, ty } => {
                if v.ty() != &ty {
                    return Err(self.make_error(
                        LowerErrorKind::TypeMismatch,
                        span,
                        format!("cannot assign {} to '{name}' of type {ty}", v.ty()),
                    ));
                }
                b.store(v, ptr);
                Ok(())
            }
            Binding::Func { .. } => Err(self.make_error(
                LowerErrorKind::TypeMismatch,
                span,
                format!("cannot assign to function '{name}'"),
            )),
        }
    }

    /// Lowers an if/else-if chain. All arms funnel into one join block,
    /// which becomes the current block afterwards.
    fn lower_if(&mut self, b: &mut FunctionBuilder, node: &IfStmt) -> Result<(), CompileError> {
        let join = b.add_block("if.end");
        self.lower_if_arm(b, node, &join)?;
        b.switch_to(&join);
        Ok(())
    }

    fn lower_if_arm(
        &mut self,
        b: &mut FunctionBuilder,
        node: &IfStmt,
        join: &str,
    ) -> Result<(), CompileError> {
        let Some(cond) = &node.cond else {
            // Plain else arm: lowered straight into the chain's false target.
            self.lower_block(b, &node.then)?;
            if !b.is_terminated() {
                b.br(join);
            }
            return Ok(());
        };

        let body = b.add_block("if.then");
        // The false edge goes to the next arm's test block, or to the join
        // when the chain ends here.
        let false_target = match &node.else_branch {
            Some(_) => b.add_block("if.else"),
            None => join.to_string(),
        };

        let c = self.lower_expr(b, cond)?;
        self.expect_bool(&c, cond.span())?;
        b.cond_br(c, &body, &false_target);

        b.switch_to(&body);
        self.lower_block(b, &node.then)?;
        if !b.is_terminated() {
            b.br(join);
        }

        if let Some(els) = &node.else_branch {
            b.switch_to(&false_target);
            self.lower_if_arm(b, els, join)?;
        }
        Ok(())
    }

    /// Lowers a for loop as header/body/exit with a single condition site in
    /// the header; the back-edge branches to the header.
    fn lower_for(&mut self, b: &mut FunctionBuilder, node: &ForStmt) -> Result<(), CompileError> {
        self.scope.push();
        self.lower_stmt(b, &node.init)?;

        let header = b.add_block("for.header");
        let body = b.add_block("for.body");
        let exit = b.add_block("for.exit");
        b.br(&header);

        b.switch_to(&header);
        let c = self.lower_expr(b, &node.cond)?;
        self.expect_bool(&c, node.cond.span())?;
        b.cond_br(c, &body, &exit);

        b.switch_to(&body);
        self.lower_block(b, &node.body)?;
        if !b.is_terminated() {
            self.lower_stmt(b, &node.post)?;
            b.br(&header);
        }

        b.switch_to(&exit);
        self.scope.pop();
        Ok(())
    }
}

fn stmt_name(s: &Stmt) -> &'static str {
    match s {
        Stmt::Declare { .. } => "declare",
        Stmt::Assign { declare: true, .. } => "declare-assign",
        Stmt::Assign { .. } => "assign",
        Stmt::Return { .. } => "return",
        Stmt::If(_) => "if",
        Stmt::For(_) => "for",
        Stmt::Expr { .. } => "expression",
        Stmt::Block(_) => "block",
    }
}
