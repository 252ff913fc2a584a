use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use docxide_pm::{ImportOptions, Package, create_document_json_with, to_json};

/// Import a DOCX file into a ProseMirror-style JSON document.
#[derive(Parser)]
#[command(name = "docxide-pm", version, about)]
struct Cli {
    /// Input .docx file
    input: PathBuf,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,

    /// Skip header and footer parts
    #[arg(long)]
    no_headers: bool,

    /// Do not infer comment threads from range markers
    #[arg(long)]
    no_thread_inference: bool,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<(), docxide_pm::Error> {
    let options = ImportOptions {
        include_headers_footers: !cli.no_headers,
        infer_comment_threads: !cli.no_thread_inference,
    };

    match &cli.output {
        Some(output) => docxide_pm::convert_docx_to_json(&cli.input, output, options, cli.pretty),
        None => {
            let package = Package::open(&cli.input)?;
            let result = create_document_json_with(&package, options)?;
            let bytes = to_json(&result, cli.pretty)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.write_all(b"\n")?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
