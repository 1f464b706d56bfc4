//! Builder facade over the IR data model.
//!
//! The lowerer drives a `FunctionBuilder`: it decides which block is
//! current, and every emit call appends to that block and hands back a
//! typed value for the result.

use std::collections::HashSet;

use super::ir::{
    ArithOp, Block, CastOp, FloatCond, Function, Instr, IntCond, IrType, Terminator, Value,
};

/// Returned when no cast opcode connects the two types.
#[derive(Debug)]
pub struct UnsupportedCast {
    pub from: IrType,
    pub to: IrType,
}

pub struct FunctionBuilder {
    func: Function,
    current: usize,
    temp_count: u32,
    label_count: u32,
}

impl FunctionBuilder {
    /// Creates the function shell with an empty entry block as the current
    /// block.
    pub fn new(name: &str, params: &[(String, IrType)], return_ty: IrType) -> Self {
        Self {
            func: Function {
                name: name.to_string(),
                params: params.to_vec(),
                return_ty,
                blocks: vec![Block::new("entry".to_string())],
            },
            current: 0,
            temp_count: 0,
            label_count: 0,
        }
    }

    pub fn return_ty(&self) -> &IrType {
        &self.func.return_ty
    }

    /// Adds a new empty, unterminated block and returns its label. Does not
    /// change the current block.
    pub fn add_block(&mut self, hint: &str) -> String {
        let label = format!("{hint}{}", self.label_count);
        self.label_count += 1;
        self.func.blocks.push(Block::new(label.clone()));
        label
    }

    pub fn switch_to(&mut self, label: &str) {
        if let Some(i) = self.func.blocks.iter().position(|b| b.label == label) {
            self.current = i;
        }
    }

    /// Whether the current block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.func.blocks[self.current].is_terminated()
    }

    fn fresh(&mut self) -> String {
        let name = format!("t{}", self.temp_count);
        self.temp_count += 1;
        name
    }

    fn push(&mut self, instr: Instr) {
        self.func.blocks[self.current].instrs.push(instr);
    }

    // ── Instructions ─────────────────────────────────────────────────────

    pub fn alloca(&mut self, ty: IrType) -> Value {
        let dst = self.fresh();
        self.push(Instr::Alloca {
            dst: dst.clone(),
            ty,
        });
        Value::Reg {
            name: dst,
            ty: IrType::Ptr,
        }
    }

    pub fn load(&mut self, ty: IrType, ptr: Value) -> Value {
        let dst = self.fresh();
        self.push(Instr::Load {
            dst: dst.clone(),
            ty: ty.clone(),
            ptr,
        });
        Value::Reg { name: dst, ty }
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.push(Instr::Store { value, ptr });
    }

    pub fn binary(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Value {
        let ty = lhs.ty().clone();
        let dst = self.fresh();
        self.push(Instr::Binary {
            dst: dst.clone(),
            op,
            lhs,
            rhs,
        });
        Value::Reg { name: dst, ty }
    }

    pub fn icmp(&mut self, cond: IntCond, lhs: Value, rhs: Value) -> Value {
        let dst = self.fresh();
        self.push(Instr::Icmp {
            dst: dst.clone(),
            cond,
            lhs,
            rhs,
        });
        Value::Reg {
            name: dst,
            ty: IrType::BOOL,
        }
    }

    pub fn fcmp(&mut self, cond: FloatCond, lhs: Value, rhs: Value) -> Value {
        let dst = self.fresh();
        self.push(Instr::Fcmp {
            dst: dst.clone(),
            cond,
            lhs,
            rhs,
        });
        Value::Reg {
            name: dst,
            ty: IrType::BOOL,
        }
    }

    /// Emits the widening/narrowing/converting cast the source and target
    /// types call for. A cast to the value's own type emits nothing.
    pub fn cast(&mut self, value: Value, to: IrType) -> Result<Value, UnsupportedCast> {
        if value.ty() == &to {
            return Ok(value);
        }
        let op = match (value.ty(), &to) {
            (IrType::Int(a), IrType::Int(b)) if b > a => CastOp::Sext,
            (IrType::Int(_), IrType::Int(_)) => CastOp::Trunc,
            (IrType::Float(a), IrType::Float(b)) if b > a => CastOp::Fpext,
            (IrType::Float(_), IrType::Float(_)) => CastOp::Fptrunc,
            (IrType::Int(_), IrType::Float(_)) => CastOp::Sitofp,
            (IrType::Float(_), IrType::Int(_)) => CastOp::Fptosi,
            (from, _) => {
                return Err(UnsupportedCast {
                    from: from.clone(),
                    to,
                })
            }
        };
        let dst = self.fresh();
        self.push(Instr::Cast {
            dst: dst.clone(),
            op,
            value,
            to: to.clone(),
        });
        Ok(Value::Reg { name: dst, ty: to })
    }

    pub fn call(&mut self, callee: &str, ret: IrType, args: Vec<Value>) -> Value {
        let dst = self.fresh();
        self.push(Instr::Call {
            dst: dst.clone(),
            ret: ret.clone(),
            callee: callee.to_string(),
            args,
        });
        Value::Reg { name: dst, ty: ret }
    }

    /// Pointer to element `index` of the array behind `base`, addressed as
    /// `(0, index)`.
    pub fn element_ptr(&mut self, agg: IrType, base: Value, index: Value) -> Value {
        let dst = self.fresh();
        self.push(Instr::ElementPtr {
            dst: dst.clone(),
            agg,
            base,
            index,
        });
        Value::Reg {
            name: dst,
            ty: IrType::Ptr,
        }
    }

    /// Extracts element `index` from an aggregate value. Returns `None` when
    /// the value is not an array.
    pub fn extract_value(&mut self, agg: Value, index: usize) -> Option<Value> {
        let ty = agg.ty().element()?.clone();
        let dst = self.fresh();
        self.push(Instr::ExtractValue {
            dst: dst.clone(),
            agg,
            index,
        });
        Some(Value::Reg { name: dst, ty })
    }

    // ── Terminators ──────────────────────────────────────────────────────

    fn terminate(&mut self, t: Terminator) {
        let block = &mut self.func.blocks[self.current];
        if block.terminator.is_none() {
            block.terminator = Some(t);
        }
    }

    pub fn br(&mut self, target: &str) {
        self.terminate(Terminator::Br {
            target: target.to_string(),
        });
    }

    pub fn cond_br(&mut self, cond: Value, then_to: &str, else_to: &str) {
        self.terminate(Terminator::CondBr {
            cond,
            then_to: then_to.to_string(),
            else_to: else_to.to_string(),
        });
    }

    pub fn ret(&mut self, value: Value) {
        self.terminate(Terminator::Ret { value });
    }

    // ── Finishing ────────────────────────────────────────────────────────

    /// Drops continuation blocks that ended up empty, unterminated, and
    /// unreferenced: join blocks whose every predecessor returned.
    pub fn prune_dead_blocks(&mut self) {
        let referenced: HashSet<&str> = self
            .func
            .blocks
            .iter()
            .filter_map(|b| b.terminator.as_ref())
            .flat_map(|t| match t {
                Terminator::Br { target } => vec![target.as_str()],
                Terminator::CondBr {
                    then_to, else_to, ..
                } => vec![then_to.as_str(), else_to.as_str()],
                Terminator::Ret { .. } => vec![],
            })
            .collect();
        let keep: Vec<bool> = self
            .func
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| {
                i == 0
                    || b.is_terminated()
                    || !b.instrs.is_empty()
                    || referenced.contains(b.label.as_str())
            })
            .collect();
        let current_label = self.func.blocks[self.current].label.clone();
        let mut keep_iter = keep.into_iter();
        self.func.blocks.retain(|_| keep_iter.next().unwrap_or(true));
        self.current = self
            .func
            .blocks
            .iter()
            .position(|b| b.label == current_label)
            .unwrap_or(0);
    }

    /// The label of some block still lacking a terminator, if any.
    pub fn unterminated_label(&self) -> Option<&str> {
        self.func
            .blocks
            .iter()
            .find(|b| !b.is_terminated())
            .map(|b| b.label.as_str())
    }

    pub fn finish(self) -> Function {
        self.func
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Value {
        Value::ConstInt {
            value: v,
            ty: IrType::Int(64),
        }
    }

    #[test]
    fn cast_chooses_opcode_from_widths() {
        let mut b = FunctionBuilder::new("f", &[], IrType::Int(64));
        let narrow = b
            .cast(int(5), IrType::Int(32))
            .unwrap();
        assert_eq!(narrow.ty(), &IrType::Int(32));
        let wide = b.cast(narrow, IrType::Int(64)).unwrap();
        assert_eq!(wide.ty(), &IrType::Int(64));
        let converted = b.cast(wide, IrType::Float(64)).unwrap();
        assert_eq!(converted.ty(), &IrType::Float(64));

        let func = b.finish();
        let ops: Vec<String> = func.blocks[0]
            .instrs
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert!(ops[0].contains("trunc i64 5 to i32"), "{ops:?}");
        assert!(ops[1].contains("sext i32"), "{ops:?}");
        assert!(ops[2].contains("sitofp i64"), "{ops:?}");
    }

    #[test]
    fn cast_to_same_type_is_a_no_op() {
        let mut b = FunctionBuilder::new("f", &[], IrType::Int(64));
        let v = b.cast(int(1), IrType::Int(64)).unwrap();
        assert_eq!(v, int(1));
        assert!(b.finish().blocks[0].instrs.is_empty());
    }

    #[test]
    fn cast_between_aggregates_is_rejected() {
        let mut b = FunctionBuilder::new("f", &[], IrType::Int(64));
        let slot = b.alloca(IrType::Int(64));
        assert!(b.cast(slot, IrType::Int(64)).is_err());
    }

    #[test]
    fn first_terminator_wins() {
        let mut b = FunctionBuilder::new("f", &[], IrType::Int(64));
        b.ret(int(1));
        b.ret(int(2));
        let func = b.finish();
        let term = func.blocks[0].terminator.as_ref().unwrap();
        assert_eq!(term.to_string(), "ret i64 1");
    }

    #[test]
    fn prune_drops_only_unreferenced_empty_blocks() {
        let mut b = FunctionBuilder::new("f", &[], IrType::Int(64));
        let reached = b.add_block("if.end");
        let orphan = b.add_block("if.end");
        b.br(&reached);
        b.switch_to(&reached);
        b.ret(int(0));
        b.prune_dead_blocks();
        let func = b.finish();
        assert!(func.blocks.iter().any(|blk| blk.label == reached));
        assert!(!func.blocks.iter().any(|blk| blk.label == orphan));
    }

    #[test]
    fn unterminated_label_reports_open_blocks() {
        let mut b = FunctionBuilder::new("f", &[], IrType::Int(64));
        assert_eq!(b.unterminated_label(), Some("entry"));
        b.ret(int(0));
        assert_eq!(b.unterminated_label(), None);
    }
}
