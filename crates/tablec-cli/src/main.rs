mod logging;

use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tablec_codegen::{CodegenConfig, CodegenError, GeneratedFiles};
use tablec_core::{Diagnostic, Top};

/// Exit status for unreadable input, bad configuration and schema diagnostics.
const EXIT_INPUT_ERROR: i32 = 1;
/// Exit status when generation or writing the artifacts fails.
const EXIT_OUTPUT_ERROR: i32 = 2;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Entity component table schema compiler.
#[derive(Parser)]
#[command(
    name = "tablec",
    version,
    about = "Entity component table schema compiler"
)]
struct Cli {
    /// Directory the generated files are written to
    output_directory: PathBuf,

    /// Path to the schema file
    schema_file_path: PathBuf,

    /// Name of the generated declarations module
    module_name: String,

    /// TOML file with code generator settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log each compiler phase
    #[arg(long, short)]
    verbose: bool,

    /// Print the parsed schema model as JSON before generating
    #[arg(long)]
    dump_model: bool,
}

enum Failure {
    Schema(Diagnostic),
    Config(CodegenError),
    Codegen(CodegenError),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Schema(_) | Failure::Config(_) => EXIT_INPUT_ERROR,
            Failure::Codegen(_) => EXIT_OUTPUT_ERROR,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            process::exit(EXIT_INPUT_ERROR);
        }
    };
    logging::init(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(files) => report_success(&files, cli.output, cli.quiet),
        Err(failure) => {
            report_failure(&failure, cli.output, cli.quiet);
            process::exit(failure.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<GeneratedFiles, Failure> {
    let config = match &cli.config {
        Some(path) => CodegenConfig::load(path).map_err(Failure::Config)?,
        None => CodegenConfig::default(),
    };

    let top = tablec_core::compile_file(&cli.schema_file_path).map_err(Failure::Schema)?;
    tracing::debug!(
        tables = top.tables.len(),
        aliases = top.aliases.len(),
        "schema compiled"
    );
    if cli.dump_model {
        dump_model(&top);
    }

    tablec_codegen::generate(&top, &cli.output_directory, &cli.module_name, &config)
        .map_err(Failure::Codegen)
}

fn dump_model(top: &Top) {
    match serde_json::to_string_pretty(top) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::warn!("cannot serialize schema model: {}", e),
    }
}

fn report_success(files: &GeneratedFiles, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => {
            println!("Generated {}", files.declarations.display());
            println!("Generated {}", files.codec.display());
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "declarations": files.declarations.display().to_string(),
                "codec": files.codec.display().to_string(),
            });
            println!("{}", value);
        }
    }
}

fn report_failure(failure: &Failure, output: OutputFormat, quiet: bool) {
    match failure {
        Failure::Schema(diagnostic) => match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&diagnostic.to_json_value())
                    .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", diagnostic));
                eprintln!("{}", json);
            }
            OutputFormat::Text => {
                if !quiet {
                    eprintln!("error: {}", diagnostic);
                }
            }
        },
        Failure::Config(e) => report_error(&format!("config error: {}", e), output, quiet),
        Failure::Codegen(e) => {
            report_error(&format!("code generation error: {}", e), output, quiet)
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
