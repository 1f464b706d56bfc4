// A block-structured IR rendered as LLVM textual assembly (opaque pointers).
use std::fmt;

/// An IR-level type. Booleans are `i1`; pointers are untyped (`ptr`).
#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    Int(u8),
    Float(u8),
    Ptr,
    Array { elem: Box<IrType>, len: usize },
}

impl IrType {
    pub const BOOL: IrType = IrType::Int(1);

    /// The element type, when this is an array.
    pub fn element(&self) -> Option<&IrType> {
        if let IrType::Array { elem, .. } = self {
            Some(elem)
        } else {
            None
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Int(width) => write!(f, "i{width}"),
            IrType::Float(32) => write!(f, "float"),
            IrType::Float(_) => write!(f, "double"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Array { elem, len } => write!(f, "[{len} x {elem}]"),
        }
    }
}

/// A typed operand: a named register or a constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Reg { name: String, ty: IrType },
    ConstInt { value: i64, ty: IrType },
    ConstFloat { value: f64, ty: IrType },
}

impl Value {
    pub fn ty(&self) -> &IrType {
        match self {
            Value::Reg { ty, .. } | Value::ConstInt { ty, .. } | Value::ConstFloat { ty, .. } => ty,
        }
    }

    pub fn as_const_int(&self) -> Option<i64> {
        if let Value::ConstInt { value, .. } = self {
            Some(*value)
        } else {
            None
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Reg { name, .. } => write!(f, "%{name}"),
            Value::ConstInt { value, .. } => write!(f, "{value}"),
            Value::ConstFloat { value, .. } => write!(f, "{}", fmt_float(*value)),
        }
    }
}

/// LLVM only accepts decimal float constants it can represent exactly, so
/// keep the shortest round-trip form and force a trailing `.0`.
fn fmt_float(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Sdiv,
    Srem,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Sdiv => "sdiv",
            ArithOp::Srem => "srem",
            ArithOp::Fadd => "fadd",
            ArithOp::Fsub => "fsub",
            ArithOp::Fmul => "fmul",
            ArithOp::Fdiv => "fdiv",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntCond {
    Eq,
    Ne,
    Sgt,
    Slt,
}

impl fmt::Display for IntCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntCond::Eq => "eq",
            IntCond::Ne => "ne",
            IntCond::Sgt => "sgt",
            IntCond::Slt => "slt",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatCond {
    Oeq,
    One,
    Ogt,
    Olt,
}

impl fmt::Display for FloatCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FloatCond::Oeq => "oeq",
            FloatCond::One => "one",
            FloatCond::Ogt => "ogt",
            FloatCond::Olt => "olt",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Sext,
    Trunc,
    Fpext,
    Fptrunc,
    Sitofp,
    Fptosi,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastOp::Sext => "sext",
            CastOp::Trunc => "trunc",
            CastOp::Fpext => "fpext",
            CastOp::Fptrunc => "fptrunc",
            CastOp::Sitofp => "sitofp",
            CastOp::Fptosi => "fptosi",
        };
        write!(f, "{s}")
    }
}

/// A non-terminator instruction.
#[derive(Debug, Clone)]
pub enum Instr {
    Alloca {
        dst: String,
        ty: IrType,
    },
    Load {
        dst: String,
        ty: IrType,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Binary {
        dst: String,
        op: ArithOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        dst: String,
        cond: IntCond,
        lhs: Value,
        rhs: Value,
    },
    Fcmp {
        dst: String,
        cond: FloatCond,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        dst: String,
        op: CastOp,
        value: Value,
        to: IrType,
    },
    Call {
        dst: String,
        ret: IrType,
        callee: String,
        args: Vec<Value>,
    },
    /// Address of element `index` of the array pointed to by `base`.
    ElementPtr {
        dst: String,
        agg: IrType,
        base: Value,
        index: Value,
    },
    ExtractValue {
        dst: String,
        agg: Value,
        index: usize,
    },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Alloca { dst, ty } => write!(f, "%{dst} = alloca {ty}"),
            Instr::Load { dst, ty, ptr } => write!(f, "%{dst} = load {ty}, ptr {ptr}"),
            Instr::Store { value, ptr } => {
                write!(f, "store {} {}, ptr {}", value.ty(), value, ptr)
            }
            Instr::Binary { dst, op, lhs, rhs } => {
                write!(f, "%{dst} = {op} {} {}, {}", lhs.ty(), lhs, rhs)
            }
            Instr::Icmp { dst, cond, lhs, rhs } => {
                write!(f, "%{dst} = icmp {cond} {} {}, {}", lhs.ty(), lhs, rhs)
            }
            Instr::Fcmp { dst, cond, lhs, rhs } => {
                write!(f, "%{dst} = fcmp {cond} {} {}, {}", lhs.ty(), lhs, rhs)
            }
            Instr::Cast { dst, op, value, to } => {
                write!(f, "%{dst} = {op} {} {} to {}", value.ty(), value, to)
            }
            Instr::Call {
                dst,
                ret,
                callee,
                args,
            } => write!(f, "%{dst} = call {ret} @{callee}({})", CallArgs(args)),
            Instr::ElementPtr {
                dst,
                agg,
                base,
                index,
            } => write!(
                f,
                "%{dst} = getelementptr inbounds {agg}, ptr {base}, i64 0, {} {}",
                index.ty(),
                index
            ),
            Instr::ExtractValue { dst, agg, index } => {
                write!(f, "%{dst} = extractvalue {} {}, {index}", agg.ty(), agg)
            }
        }
    }
}

struct CallArgs<'a>(&'a [Value]);

impl fmt::Display for CallArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", v.ty(), v)?;
        }
        Ok(())
    }
}

/// The single legal last instruction of a basic block.
#[derive(Debug, Clone)]
pub enum Terminator {
    Br {
        target: String,
    },
    CondBr {
        cond: Value,
        then_to: String,
        else_to: String,
    },
    Ret {
        value: Value,
    },
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Br { target } => write!(f, "br label %{target}"),
            Terminator::CondBr {
                cond,
                then_to,
                else_to,
            } => write!(f, "br i1 {cond}, label %{then_to}, label %{else_to}"),
            Terminator::Ret { value } => write!(f, "ret {} {}", value.ty(), value),
        }
    }
}

/// A basic block: instructions plus at most one terminator. A block without
/// a terminator is still under construction.
#[derive(Debug, Clone)]
pub struct Block {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

impl Block {
    pub fn new(label: String) -> Self {
        Self {
            label,
            instrs: Vec::new(),
            terminator: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IrType)>,
    pub return_ty: IrType,
    /// The entry block is always `blocks[0]`.
    pub blocks: Vec<Block>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|(name, ty)| format!("{ty} %{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "define {} @{}({}) {{", self.return_ty, self.name, params)?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for instr in &block.instrs {
                writeln!(f, "  {instr}")?;
            }
            if let Some(term) = &block.terminator {
                writeln!(f, "  {term}")?;
            }
        }
        writeln!(f, "}}")
    }
}

/// The finished IR module; its `Display` form is the compiler's output.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_constants_keep_a_decimal_point() {
        assert_eq!(fmt_float(1.5), "1.5");
        assert_eq!(fmt_float(1.0), "1.0");
        assert_eq!(fmt_float(123.0), "123.0");
    }

    #[test]
    fn instruction_rendering() {
        let load = Instr::Load {
            dst: "t1".into(),
            ty: IrType::Int(64),
            ptr: Value::Reg {
                name: "t0".into(),
                ty: IrType::Ptr,
            },
        };
        assert_eq!(load.to_string(), "%t1 = load i64, ptr %t0");

        let gep = Instr::ElementPtr {
            dst: "t2".into(),
            agg: IrType::Array {
                elem: Box::new(IrType::Int(64)),
                len: 3,
            },
            base: Value::Reg {
                name: "t0".into(),
                ty: IrType::Ptr,
            },
            index: Value::ConstInt {
                value: 1,
                ty: IrType::Int(64),
            },
        };
        assert_eq!(
            gep.to_string(),
            "%t2 = getelementptr inbounds [3 x i64], ptr %t0, i64 0, i64 1"
        );
    }

    #[test]
    fn terminator_rendering() {
        let t = Terminator::CondBr {
            cond: Value::Reg {
                name: "t0".into(),
                ty: IrType::BOOL,
            },
            then_to: "if.then0".into(),
            else_to: "if.else1".into(),
        };
        assert_eq!(t.to_string(), "br i1 %t0, label %if.then0, label %if.else1");
    }

    #[test]
    fn float_width_names() {
        assert_eq!(IrType::Float(32).to_string(), "float");
        assert_eq!(IrType::Float(64).to_string(), "double");
    }
}
