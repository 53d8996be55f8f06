use anyhow::Context;
use tracing_subscriber::EnvFilter;

use validate_gml::cli::{Cli, VerbosityLevel};
use validate_gml::output::Output;
use validate_gml::pipeline::DocumentPipeline;

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbosity());

    match run(&cli) {
        Ok(conformant) => {
            if !conformant {
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            std::process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    cli.validate()?;
    let config = cli.pipeline_config()?;
    let pipeline = DocumentPipeline::new(config)?;

    let outcome = match cli.subject_url() {
        Some(url) => pipeline
            .run_url(&url)
            .with_context(|| format!("failed to validate {}", url))?,
        None => {
            let path = std::path::Path::new(&cli.subject);
            pipeline
                .run(path)
                .with_context(|| format!("failed to validate {}", path.display()))?
        }
    };

    print!("{}", Output::new(cli.verbosity()).format_outcome(&outcome));
    Ok(outcome.is_conformant())
}

fn init_tracing(verbosity: VerbosityLevel) {
    let default_filter = match verbosity {
        VerbosityLevel::Quiet => "error",
        VerbosityLevel::Normal => "warn",
        VerbosityLevel::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
