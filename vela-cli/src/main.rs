use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use vela_compiler::{compile_to_ast, compile_to_llvm, compile_to_llvm_traced, StderrTrace};

#[derive(Parser)]
#[command(name = "velac")]
#[command(about = "An ahead-of-time compiler for the Vela language")]
struct Args {
    /// Path to the source file to compile
    file: PathBuf,

    /// Write the output here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, value_enum, default_value_t = Emit::Llvm)]
    emit: Emit,

    /// Print per-node lowering traces to standard error
    #[arg(long)]
    trace: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Emit {
    /// LLVM textual IR
    Llvm,
    /// The annotated AST (debug form)
    Ast,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("reading '{}'", args.file.display()))?;

    let out = match args.emit {
        Emit::Ast => {
            let program = compile_to_ast(&source)?;
            format!("{program:#?}\n")
        }
        Emit::Llvm => {
            if args.trace {
                let mut sink = StderrTrace;
                compile_to_llvm_traced(&source, &mut sink)?
            } else {
                compile_to_llvm(&source)?
            }
        }
    };

    match &args.output {
        Some(path) => fs::write(path, out)
            .with_context(|| format!("writing '{}'", path.display()))?,
        None => print!("{out}"),
    }
    Ok(())
}
