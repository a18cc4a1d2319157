use std::path::PathBuf;
use std::process::ExitCode;

use cmedit_lib::command::execute_json_batch;
use cmedit_lib::harness::EditorHarness;
use cmedit_lib::state::AppSettings;

#[derive(Debug, Default)]
struct Args {
    cm: Option<PathBuf>,
    script: Option<PathBuf>,
    settings: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cmedit=info".into()),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            tracing::error!("{msg}");
            eprintln!("usage: cmedit [--cm <file.cm>] [--script <commands.json>] [--settings <settings.json>]");
            return ExitCode::FAILURE;
        }
    };

    let settings = match &args.settings {
        Some(path) => match AppSettings::load_from(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Failed to read settings {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => AppSettings::load(),
    };

    let mut harness = EditorHarness::with_settings(settings);

    if let Some(path) = &args.cm {
        match harness.load_file(path) {
            Ok(rows) => tracing::info!("Loaded {} ({rows} soundings)", path.display()),
            Err(e) => {
                tracing::error!("Failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(script) = &args.script else {
        return ExitCode::SUCCESS;
    };
    let json = match std::fs::read_to_string(script) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to read script {}: {e}", script.display());
            return ExitCode::FAILURE;
        }
    };
    match execute_json_batch(&mut harness, &json) {
        Ok(responses) => {
            let failed = responses.iter().filter(|r| !r.success).count();
            match serde_json::to_string_pretty(&responses) {
                Ok(out) => println!("{out}"),
                Err(e) => tracing::error!("Failed to encode responses: {e}"),
            }
            if failed > 0 {
                tracing::warn!("{failed} of {} commands failed", responses.len());
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let slot = match flag.as_str() {
            "--cm" => &mut args.cm,
            "--script" => &mut args.script,
            "--settings" => &mut args.settings,
            other => return Err(format!("unknown argument {other}")),
        };
        let value = it.next().ok_or_else(|| format!("{flag} needs a value"))?;
        *slot = Some(PathBuf::from(value));
    }
    Ok(args)
}
