use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use typeinfer::{infer_module, load_module, read_config, Diagnostic, InferConfig, InferError};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(InferError::Types { errors, suppressed }) => {
            let diagnostics: Vec<Diagnostic> =
                errors.iter().map(|error| error.to_diagnostic()).collect();
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(output) => println!("{output}"),
                Err(err) => eprintln!("{err}"),
            }
            if suppressed > 0 {
                eprintln!("{suppressed} more type error(s) not shown (solver.max_errors)");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), InferError> {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        print_help();
        return Ok(());
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "-h" | "--help" => {
            print_help();
            Ok(())
        }
        "check" => cmd_check(&rest),
        other => Err(InferError::InvalidCommand(format!(
            "unknown command {other}"
        ))),
    }
}

fn cmd_check(args: &[String]) -> Result<(), InferError> {
    let mut module_path = None;
    let mut config_path = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = iter.next() else {
                    return Err(InferError::InvalidCommand(
                        "--config expects a path".to_string(),
                    ));
                };
                config_path = Some(PathBuf::from(path));
            }
            value if !value.starts_with('-') && module_path.is_none() => {
                module_path = Some(PathBuf::from(value));
            }
            other => {
                return Err(InferError::InvalidCommand(format!(
                    "unexpected check argument {other}"
                )));
            }
        }
    }
    let Some(module_path) = module_path else {
        print_help();
        return Ok(());
    };
    let config = match config_path {
        Some(path) => read_config(&path)?,
        None => InferConfig::default(),
    };
    let module = load_module(&module_path)?;
    let typed = infer_module(&module, &config)?;
    let output = serde_json::to_string_pretty(&typed)?;
    println!("{output}");
    Ok(())
}

fn print_help() {
    println!(
        "typeinfer\n\nUSAGE:\n  typeinfer <COMMAND>\n\nCOMMANDS:\n  check <module.json> [--config <infer.toml>]\n\n  -h, --help\n\nLogging is controlled by RUST_LOG, e.g. RUST_LOG=typeinfer::solve=debug"
    );
}
