use vela_compiler::compile_to_llvm;

// ── End-to-end lowering scenarios ────────────────────────────────────────
// Each test compiles a small program and checks the structure of the
// emitted LLVM IR.

#[test]
fn integer_return() {
    let ll = compile_to_llvm("proc main() -> i64 { return 123 }").unwrap();
    assert!(ll.contains("define i64 @main()"), "{ll}");
    assert!(ll.contains("ret i64 123"), "{ll}");
    assert_eq!(block_labels(&ll), vec!["entry"], "{ll}");
}

#[test]
fn locals_and_arithmetic() {
    let src = "proc main() -> i64 { let a = 100; let b = 23; return a + b }";
    let ll = compile_to_llvm(src).unwrap();
    assert_eq!(ll.matches("alloca i64").count(), 2, "{ll}");
    assert_eq!(ll.matches("store i64").count(), 2, "{ll}");
    assert_eq!(ll.matches("load i64").count(), 2, "{ll}");
    assert_eq!(ll.matches("add i64").count(), 1, "{ll}");
    assert!(ll.contains("ret i64 %"), "{ll}");
}

#[test]
fn if_else_produces_three_blocks() {
    let src = "proc main() -> i64 { let x = 50; if x < 100 { return 123 } else { return 7 } }";
    let ll = compile_to_llvm(src).unwrap();
    assert!(ll.contains("icmp slt i64"), "{ll}");
    assert!(ll.contains("br i1 %"), "{ll}");
    assert_eq!(block_labels(&ll).len(), 3, "{ll}");
    assert!(ll.contains("ret i64 123"), "{ll}");
    assert!(ll.contains("ret i64 7"), "{ll}");
    assert_blocks_terminated(&ll);
}

#[test]
fn for_loop_header_body_exit() {
    let src =
        "proc main() -> i64 { let s = 0; for i := 0; i < 123; i = i + 1 { s = s + 1 }; return s }";
    let ll = compile_to_llvm(src).unwrap();
    let labels = block_labels(&ll);
    assert!(labels.iter().any(|l| l.starts_with("for.header")), "{ll}");
    assert!(labels.iter().any(|l| l.starts_with("for.body")), "{ll}");
    assert!(labels.iter().any(|l| l.starts_with("for.exit")), "{ll}");

    let header = block_text(&ll, "for.header");
    assert!(header.contains("icmp slt i64"), "{ll}");
    assert!(header.contains("br i1 %"), "{ll}");
    // The condition is evaluated in the header only.
    assert_eq!(ll.matches("icmp slt").count(), 1, "{ll}");

    let body = block_text(&ll, "for.body");
    assert!(body.contains("br label %for.header"), "{ll}");

    let exit = block_text(&ll, "for.exit");
    assert!(exit.contains("ret i64 %"), "{ll}");
    assert_blocks_terminated(&ll);
}

#[test]
fn float_compare_selects_fcmp() {
    let src = "proc main() -> i64 { let f = 1.5; if f > 1.0 { return 123 } else { return 0 } }";
    let ll = compile_to_llvm(src).unwrap();
    assert!(ll.contains("store double 1.5"), "{ll}");
    assert!(ll.contains("fcmp ogt double"), "{ll}");
    assert!(ll.contains("ret i64 123"), "{ll}");
    assert!(ll.contains("ret i64 0"), "{ll}");
    assert!(!ll.contains("icmp"), "{ll}");
}

#[test]
fn array_init_and_constant_indexing() {
    let src = "proc main() -> i64 { let a: [3]i64 = {121, 1, 1}; return a[0] + a[1] + a[2] }";
    let ll = compile_to_llvm(src).unwrap();
    assert!(ll.contains("alloca [3 x i64]"), "{ll}");
    assert_eq!(ll.matches("getelementptr inbounds [3 x i64]").count(), 3, "{ll}");
    assert_eq!(ll.matches("extractvalue [3 x i64]").count(), 3, "{ll}");
    assert_eq!(ll.matches("add i64").count(), 2, "{ll}");
    assert!(ll.contains("ret i64 %"), "{ll}");
}

// ── Structural properties ────────────────────────────────────────────────

#[test]
fn parameters_keep_declaration_order() {
    let src = "proc sub2(a: i64, b: i64) -> i64 { return a - b }\n\
               proc main() -> i64 { return sub2(146, 23) }";
    let ll = compile_to_llvm(src).unwrap();
    assert!(ll.contains("define i64 @sub2(i64 %a, i64 %b)"), "{ll}");
    assert!(ll.contains("call i64 @sub2(i64 146, i64 23)"), "{ll}");
}

#[test]
fn parameter_slots_precede_user_statements() {
    let src = "proc f(a: i64, b: f64) -> i64 { let c = a; return c }";
    let ll = compile_to_llvm(src).unwrap();
    let entry = block_text(&ll, "entry");
    let store_a = entry.find("store i64 %a").expect("parameter a spilled");
    let store_b = entry.find("store double %b").expect("parameter b spilled");
    let user = entry.find("load i64").expect("user code present");
    assert!(store_a < user && store_b < user, "{ll}");
}

#[test]
fn lowering_is_idempotent() {
    let src = "proc main() -> i64 { let s = 0; for i := 0; i < 10; i = i + 1 { s = s + i }; if s > 3 { return s } else { return 0 } }";
    let first = compile_to_llvm(src).unwrap();
    let second = compile_to_llvm(src).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_block_ends_with_one_terminator() {
    let sources = [
        "proc main() -> i64 { return 1 }",
        "proc main() -> i64 { if 1 < 2 { return 1 } else { return 2 } }",
        "proc main() -> i64 { let x = 0 if x < 1 { x = 2 } else if x < 3 { x = 4 } else { x = 5 } return x }",
        "proc main() -> i64 { let s = 0 for i := 0; i < 4; i = i + 1 { if s > 1 { s = s - 1 } else { s = s + 2 } } return s }",
    ];
    for src in sources {
        let ll = compile_to_llvm(src).unwrap();
        assert_blocks_terminated(&ll);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn block_labels(ll: &str) -> Vec<&str> {
    ll.lines()
        .filter(|l| !l.starts_with(' ') && l.ends_with(':'))
        .map(|l| l.trim_end_matches(':'))
        .collect()
}

/// The instructions of the first block whose label starts with the prefix.
fn block_text(ll: &str, label_prefix: &str) -> String {
    let mut collecting = false;
    let mut out = String::new();
    for line in ll.lines() {
        if !line.starts_with(' ') && line.ends_with(':') {
            if collecting {
                break;
            }
            collecting = line.trim_end_matches(':').starts_with(label_prefix);
            continue;
        }
        if collecting && line.starts_with(' ') {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn assert_blocks_terminated(ll: &str) {
    let mut current: Vec<&str> = Vec::new();
    let mut in_function = false;
    for line in ll.lines() {
        if line.starts_with("define ") {
            in_function = true;
            current.clear();
            continue;
        }
        if !in_function {
            continue;
        }
        if line == "}" || (!line.starts_with(' ') && line.ends_with(':')) {
            if let Some(last) = current.last() {
                let t = last.trim_start();
                assert!(
                    t.starts_with("ret ") || t.starts_with("br "),
                    "block does not end with a terminator: '{last}'\n{ll}"
                );
            }
            current.clear();
            if line == "}" {
                in_function = false;
            }
            continue;
        }
        if !line.trim().is_empty() {
            current.push(line);
        }
    }
}
