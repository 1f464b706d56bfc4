use super::context::Gen;
use crate::ast::{BinOp, Expr};
use crate::frontend::lexer::Span;
use crate::ir::builder::FunctionBuilder;
use crate::ir::ir::{ArithOp, FloatCond, IntCond, IrType, Value};
use crate::ir::scope::Binding;
use crate::{CompileError, LowerErrorKind};

impl<'a> Gen<'a> {
    pub fn lower_expr(&mut self, b: &mut FunctionBuilder, e: &Expr) -> Result<Value, CompileError> {
        match e {
            Expr::Int { value, .. } => Ok(Value::ConstInt {
                value: *value,
                ty: IrType::Int(64),
            }),
            Expr::Float { value, .. } => Ok(Value::ConstFloat {
                value: *value,
                ty: IrType::Float(64),
            }),
            Expr::Ident { name, span, .. } => {
                if name == "true" {
                    return Ok(Value::ConstInt {
                        value: 1,
                        ty: IrType::BOOL,
                    });
                }
                if name == "false" {
                    return Ok(Value::ConstInt {
                        value: 0,
                        ty: IrType::BOOL,
                    });
                }
                match self.scope.lookup(name) {
                    Some(Binding::Slot { ptr, ty }) => {
                        let (ptr, ty) = (ptr.clone(), ty.clone());
                        Ok(b.load(ty, ptr))
                    }
                    Some(Binding::Func { .. }) => Err(self.make_error(
                        LowerErrorKind::TypeMismatch,
                        *span,
                        format!("function '{name}' used as a value"),
                    )),
                    None => Err(self.make_error(
                        LowerErrorKind::UnknownIdentifier,
                        *span,
                        format!("'{name}' is not defined"),
                    )),
                }
            }
            Expr::Binary {
                op,
                lhs,
                rhs,
                is_float,
                span,
                ..
            } => {
                self.trace(|| format!("binary {op} (float: {is_float})"));
                // Strict left-to-right evaluation, no short-circuiting.
                let l = self.lower_expr(b, lhs)?;
                let r = self.lower_expr(b, rhs)?;
                if *is_float {
                    self.lower_float_binary(b, *op, l, r, *span)
                } else {
                    self.lower_int_binary(b, *op, l, r, *span)
                }
            }
            Expr::Cast {
                target,
                inner,
                span,
            } => {
                self.trace(|| format!("cast to {target}"));
                let v = self.lower_expr(b, inner)?;
                let to = self.ir_type(target, *span)?;
                b.cast(v, to).map_err(|c| {
                    self.make_error(
                        LowerErrorKind::TypeMismatch,
                        *span,
                        format!("cannot cast {} to {}", c.from, c.to),
                    )
                })
            }
            Expr::Call {
                callee, args, span, ..
            } => {
                self.trace(|| format!("call '{callee}'"));
                let (name, ret) = match self.scope.lookup(callee) {
                    Some(Binding::Func { name, ret }) => (name.clone(), ret.clone()),
                    _ => {
                        return Err(self.make_error(
                            LowerErrorKind::UnknownFunction,
                            *span,
                            format!("'{callee}' is not a known function"),
                        ))
                    }
                };
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.lower_expr(b, a)?);
                }
                Ok(b.call(&name, ret, values))
            }
            Expr::ArrayIndex {
                array,
                index,
                span,
                ..
            } => self.lower_array_index(b, array, index, *span),
            Expr::ArrayList { span, .. } => Err(self.make_internal(
                *span,
                "array initializer used as a value".to_string(),
            )),
        }
    }

    fn lower_int_binary(
        &mut self,
        b: &mut FunctionBuilder,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        span: Span,
    ) -> Result<Value, CompileError> {
        if let Some(arith) = map_int_arith(op) {
            return Ok(b.binary(arith, lhs, rhs));
        }
        if let Some(cond) = map_int_cmp(op) {
            return Ok(b.icmp(cond, lhs, rhs));
        }
        Err(self.make_error(
            LowerErrorKind::UnsupportedBinaryOperator,
            span,
            format!("operator {op} is not supported on integers"),
        ))
    }

    fn lower_float_binary(
        &mut self,
        b: &mut FunctionBuilder,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        span: Span,
    ) -> Result<Value, CompileError> {
        if let Some(arith) = map_float_arith(op) {
            return Ok(b.binary(arith, lhs, rhs));
        }
        if let Some(cond) = map_float_cmp(op) {
            return Ok(b.fcmp(cond, lhs, rhs));
        }
        // REM lands here: there is no float remainder instruction.
        Err(self.make_error(
            LowerErrorKind::UnsupportedBinaryOperator,
            span,
            format!("operator {op} is not supported on floats"),
        ))
    }

    fn lower_array_index(
        &mut self,
        b: &mut FunctionBuilder,
        array: &str,
        index: &Expr,
        span: Span,
    ) -> Result<Value, CompileError> {
        let (ptr, array_ty) = match self.scope.lookup(array) {
            Some(Binding::Slot { ptr, ty }) => (ptr.clone(), ty.clone()),
            Some(Binding::Func { .. }) => {
                return Err(self.make_error(
                    LowerErrorKind::TypeMismatch,
                    span,
                    format!("function '{array}' indexed as an array"),
                ))
            }
            None => {
                return Err(self.make_error(
                    LowerErrorKind::UnknownIdentifier,
                    span,
                    format!("'{array}' is not defined"),
                ))
            }
        };
        let (elem_ty, len) = match &array_ty {
            IrType::Array { elem, len } => ((**elem).clone(), *len),
            other => {
                return Err(self.make_error(
                    LowerErrorKind::TypeMismatch,
                    span,
                    format!("'{array}' has type {other}, expected an array"),
                ))
            }
        };

        let idx = self.lower_expr(b, index)?;
        if let Some(i) = idx.as_const_int() {
            if i < 0 || i as usize >= len {
                return Err(self.make_error(
                    LowerErrorKind::TypeMismatch,
                    span,
                    format!("index {i} is out of bounds for {array_ty}"),
                ));
            }
            // Constant index: read the whole aggregate and extract.
            let agg = b.load(array_ty, ptr);
            match b.extract_value(agg, i as usize) {
                Some(v) => Ok(v),
                None => Err(self.make_internal(
                    span,
                    "extractvalue from a non-aggregate value".to_string(),
                )),
            }
        } else {
            // Computed index: extractvalue needs a static index, so address
            // the element and load it instead.
            let elem_ptr = b.element_ptr(array_ty, ptr, idx);
            Ok(b.load(elem_ty, elem_ptr))
        }
    }

    /// Stores each initializer into its element of the target array slot.
    /// The list yields no value.
    pub(crate) fn lower_array_list(
        &mut self,
        b: &mut FunctionBuilder,
        e: &Expr,
    ) -> Result<(), CompileError> {
        let Expr::ArrayList {
            target,
            elems,
            span,
        } = e
        else {
            return Err(self.make_internal(e.span(), "expected an array initializer".to_string()));
        };

        let (ptr, array_ty) = match self.scope.lookup(target) {
            Some(Binding::Slot { ptr, ty }) => (ptr.clone(), ty.clone()),
            _ => {
                return Err(self.make_error(
                    LowerErrorKind::UnknownIdentifier,
                    *span,
                    format!("'{target}' is not defined"),
                ))
            }
        };
        let (elem_ty, len) = match &array_ty {
            IrType::Array { elem, len } => ((**elem).clone(), *len),
            other => {
                return Err(self.make_error(
                    LowerErrorKind::TypeMismatch,
                    *span,
                    format!("'{target}' has type {other}, expected an array"),
                ))
            }
        };
        if elems.len() != len {
            return Err(self.make_error(
                LowerErrorKind::TypeMismatch,
                *span,
                format!("{} initializers for an array of length {len}", elems.len()),
            ));
        }

        for (i, elem) in elems.iter().enumerate() {
            let v = self.lower_expr(b, elem)?;
            if v.ty() != &elem_ty {
                return Err(self.make_error(
                    LowerErrorKind::TypeMismatch,
                    elem.span(),
                    format!("element {i} has type {}, expected {elem_ty}", v.ty()),
                ));
            }
            let elem_ptr = b.element_ptr(
                array_ty.clone(),
                ptr.clone(),
                Value::ConstInt {
                    value: i as i64,
                    ty: IrType::Int(64),
                },
            );
            b.store(v, elem_ptr);
        }
        Ok(())
    }
}

fn map_int_arith(op: BinOp) -> Option<ArithOp> {
    match op {
        BinOp::Add => Some(ArithOp::Add),
        BinOp::Sub => Some(ArithOp::Sub),
        BinOp::Mul => Some(ArithOp::Mul),
        BinOp::Quo => Some(ArithOp::Sdiv),
        BinOp::Rem => Some(ArithOp::Srem),
        _ => None,
    }
}

fn map_int_cmp(op: BinOp) -> Option<IntCond> {
    match op {
        BinOp::Eql => Some(IntCond::Eq),
        BinOp::Neq => Some(IntCond::Ne),
        BinOp::Gtr => Some(IntCond::Sgt),
        BinOp::Lss => Some(IntCond::Slt),
        _ => None,
    }
}

fn map_float_arith(op: BinOp) -> Option<ArithOp> {
    match op {
        BinOp::Add => Some(ArithOp::Fadd),
        BinOp::Sub => Some(ArithOp::Fsub),
        BinOp::Mul => Some(ArithOp::Fmul),
        BinOp::Quo => Some(ArithOp::Fdiv),
        _ => None,
    }
}

fn map_float_cmp(op: BinOp) -> Option<FloatCond> {
    match op {
        BinOp::Eql => Some(FloatCond::Oeq),
        BinOp::Neq => Some(FloatCond::One),
        BinOp::Gtr => Some(FloatCond::Ogt),
        BinOp::Lss => Some(FloatCond::Olt),
        _ => None,
    }
}
