//! Mechanical type annotation for the parsed AST.
//!
//! Resolves declared types through a scope stack, fills every expression's
//! resolved type, and computes the float flag on binary nodes. The pass
//! never rejects a program: names it cannot resolve keep `Type::Unknown`
//! and are reported by the lowering core, which owns the error surface.

use std::collections::HashMap;

use crate::ast::{Block, Expr, IfStmt, Program, Stmt, Type};

pub fn annotate(program: &mut Program) {
    let sigs: HashMap<String, Type> = program
        .functions
        .iter()
        .map(|f| (f.name.clone(), f.return_ty.clone()))
        .collect();

    for f in &mut program.functions {
        let mut env = Env::new(&sigs);
        for p in &f.params {
            env.bind(p.name.clone(), p.ty.clone());
        }
        annotate_block(&mut env, &mut f.body);
    }
}

struct Env<'a> {
    sigs: &'a HashMap<String, Type>,
    scopes: Vec<HashMap<String, Type>>,
}

impl<'a> Env<'a> {
    fn new(sigs: &'a HashMap<String, Type>) -> Self {
        Self {
            sigs,
            scopes: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: String, ty: Type) {
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name, ty);
        }
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

fn annotate_block(env: &mut Env, block: &mut Block) {
    env.push();
    for s in &mut block.stmts {
        annotate_stmt(env, s);
    }
    env.pop();
}

fn annotate_stmt(env: &mut Env, s: &mut Stmt) {
    match s {
        Stmt::Declare { name, ty, init, .. } => {
            annotate_expr(env, init);
            if matches!(ty, Type::Unknown) {
                *ty = if let Expr::ArrayList { elems, .. } = init {
                    let elem = elems
                        .first()
                        .map(|e| e.ty().clone())
                        .unwrap_or(Type::Unknown);
                    Type::Array {
                        elem: Box::new(elem),
                        len: elems.len(),
                    }
                } else {
                    init.ty().clone()
                };
            }
            env.bind(name.clone(), ty.clone());
        }
        Stmt::Assign {
            name,
            value,
            declare,
            ..
        } => {
            annotate_expr(env, value);
            if *declare {
                env.bind(name.clone(), value.ty().clone());
            }
        }
        Stmt::Return { value, .. } => annotate_expr(env, value),
        Stmt::If(node) => annotate_if(env, node),
        Stmt::For(node) => {
            env.push();
            annotate_stmt(env, &mut node.init);
            annotate_expr(env, &mut node.cond);
            annotate_stmt(env, &mut node.post);
            annotate_block(env, &mut node.body);
            env.pop();
        }
        Stmt::Expr { expr, .. } => annotate_expr(env, expr),
        Stmt::Block(b) => annotate_block(env, b),
    }
}

fn annotate_if(env: &mut Env, node: &mut IfStmt) {
    if let Some(cond) = &mut node.cond {
        annotate_expr(env, cond);
    }
    annotate_block(env, &mut node.then);
    if let Some(els) = &mut node.else_branch {
        annotate_if(env, els);
    }
}

fn annotate_expr(env: &mut Env, e: &mut Expr) {
    match e {
        // Literal widths follow the language default regardless of context;
        // narrower uses take an explicit cast.
        Expr::Int { ty, .. } => *ty = Type::I64,
        Expr::Float { ty, .. } => *ty = Type::F64,
        Expr::Ident { name, ty, .. } => {
            *ty = if name == "true" || name == "false" {
                Type::Bool
            } else {
                env.lookup(name).cloned().unwrap_or(Type::Unknown)
            };
        }
        Expr::Binary {
            op,
            lhs,
            rhs,
            is_float,
            ty,
            ..
        } => {
            annotate_expr(env, lhs);
            annotate_expr(env, rhs);
            *is_float = lhs.ty().is_float();
            *ty = if op.is_comparison() {
                Type::Bool
            } else {
                lhs.ty().clone()
            };
        }
        Expr::Cast { inner, .. } => annotate_expr(env, inner),
        Expr::Call { callee, args, ty, .. } => {
            for a in args.iter_mut() {
                annotate_expr(env, a);
            }
            *ty = env.sigs.get(callee).cloned().unwrap_or(Type::Unknown);
        }
        Expr::ArrayList { elems, .. } => {
            for el in elems.iter_mut() {
                annotate_expr(env, el);
            }
        }
        Expr::ArrayIndex {
            array, index, ty, ..
        } => {
            annotate_expr(env, index);
            *ty = match env.lookup(array) {
                Some(Type::Array { elem, .. }) => (**elem).clone(),
                _ => Type::Unknown,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse;

    fn annotated(source: &str) -> Program {
        let mut p = parse(source).unwrap();
        annotate(&mut p);
        p
    }

    #[test]
    fn float_flag_follows_operand_type() {
        let p = annotated("proc f() -> i64 { let x = 1.5 + 2.0 let y = 1 + 2 return y }");
        let Stmt::Declare { init, .. } = &p.functions[0].body.stmts[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(init, Expr::Binary { is_float: true, .. }));
        let Stmt::Declare { init, .. } = &p.functions[0].body.stmts[1] else {
            panic!("expected declaration");
        };
        assert!(matches!(init, Expr::Binary { is_float: false, .. }));
    }

    #[test]
    fn declaration_infers_from_initializer() {
        let p = annotated("proc f() -> i64 { let x = 1.5 return 0 }");
        let Stmt::Declare { ty, .. } = &p.functions[0].body.stmts[0] else {
            panic!("expected declaration");
        };
        assert_eq!(*ty, Type::F64);
    }

    #[test]
    fn comparison_is_boolean() {
        let p = annotated("proc f() -> i64 { let b = 1 < 2 return 0 }");
        let Stmt::Declare { ty, .. } = &p.functions[0].body.stmts[0] else {
            panic!("expected declaration");
        };
        assert_eq!(*ty, Type::Bool);
    }

    #[test]
    fn call_type_comes_from_signature() {
        let p = annotated(
            "proc g() -> f64 { return 1.0 } proc f() -> i64 { let x = g() return 0 }",
        );
        let Stmt::Declare { ty, .. } = &p.functions[1].body.stmts[0] else {
            panic!("expected declaration");
        };
        assert_eq!(*ty, Type::F64);
    }

    #[test]
    fn unknown_name_stays_unknown() {
        let p = annotated("proc f() -> i64 { return missing }");
        let Stmt::Return { value, .. } = &p.functions[0].body.stmts[0] else {
            panic!("expected return");
        };
        assert_eq!(*value.ty(), Type::Unknown);
    }
}
