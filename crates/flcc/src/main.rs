//! The compiler driver: reads a parsed program from JSON, type-checks it,
//! lowers it to the locally-nameless IR, generates a WASM module, and
//! writes the result to disk.

mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use error::DriverError;
use flc_syntax::{Expr, TypeDecl};

#[derive(Parser)]
#[command(name = "flcc", about = "Compile a parsed program to a WASM module")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check, lower, and codegen an input program to a `.wasm` file.
    Build {
        /// Path to a JSON document: `{"type_decls": [...], "expr": ...}`.
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct ProgramInput {
    #[serde(default)]
    type_decls: Vec<TypeDecl>,
    expr: Expr,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Build { input, output } => build(&input, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn build(input: &Path, output: Option<&Path>) -> Result<(), DriverError> {
    tracing::info!(path = %input.display(), "reading input");
    let source = std::fs::read_to_string(input)?;
    let program: ProgramInput = serde_json::from_str(&source)?;

    tracing::debug!("type-checking");
    let (check_state, scheme) = flc_typeck::check_program(&program.type_decls, &program.expr)?;
    tracing::info!(%scheme, "inferred principal type");

    tracing::debug!("lowering");
    let lowered = flc_lower::lower_program(&check_state.type_map, &program.expr)?;
    tracing::info!(declarations = lowered.declarations.len(), "hoisted declarations");

    tracing::debug!("generating code");
    let bytes = flc_codegen::compile(&lowered.declarations, &lowered.body)?;

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("wasm"));
    std::fs::write(&output_path, &bytes)?;
    tracing::info!(path = %output_path.display(), bytes = bytes.len(), "wrote module");

    Ok(())
}
