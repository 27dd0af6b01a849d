use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use relq::io::DEFAULT_DELIMITER;
use relq::{Database, EngineConfig};
use tracing_subscriber::EnvFilter;

/// Runs relational commands against an in-memory database, from a script or
/// interactively from stdin.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script to run, one command per line. Reads stdin when omitted.
    script: Option<PathBuf>,

    /// Delimiter used by `outputtofile` when the command gives none
    #[arg(
        short,
        long,
        env = "RELQ_DELIMITER",
        default_value = DEFAULT_DELIMITER,
        value_parser = NonEmptyStringValueParser::new()
    )]
    delimiter: String,

    /// Directory that relative file paths are resolved against
    #[arg(long, env = "RELQ_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Stop at the first failing command instead of carrying on
    #[arg(long, overrides_with = "keep_going")]
    stop_on_error: bool,

    /// Carry on after a failing command (default)
    #[arg(long, overrides_with = "stop_on_error")]
    keep_going: bool,
}

impl Args {
    /// The last of `--stop-on-error`/`--keep-going` wins.
    fn stops_on_error(&self) -> bool {
        self.stop_on_error && !self.keep_going
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut config = match EngineConfig::default().with_delimiter(args.delimiter.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = &args.base_dir {
        config = config.with_base_dir(dir);
    }
    let mut db = Database::with_config(config);

    let result = match &args.script {
        Some(path) => match fs::read_to_string(path) {
            Ok(script) => run_lines(&mut db, script.lines().map(str::to_string), &args, false),
            Err(err) => {
                eprintln!("error: cannot read {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            let lines = stdin.lock().lines().map_while(Result::ok);
            run_lines(&mut db, lines, &args, interactive)
        }
    };

    if result { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Returns `false` if any command failed.
fn run_lines(
    db: &mut Database,
    lines: impl Iterator<Item = String>,
    args: &Args,
    interactive: bool,
) -> bool {
    let mut ok = true;
    prompt(interactive);

    for (idx, line) in lines.enumerate() {
        let line = line.trim();
        if matches!(line, "quit" | "exit") {
            break;
        }
        if let Some(entry) = db.execute_line(idx + 1, line) {
            match entry.result {
                Ok(outcome) => println!("{outcome}"),
                Err(err) => {
                    ok = false;
                    eprintln!("error (line {}): {err}", entry.line_no);
                    if args.stops_on_error() {
                        return false;
                    }
                }
            }
        }
        prompt(interactive);
    }

    ok
}

fn prompt(interactive: bool) {
    if interactive {
        print!("relq> ");
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_defaults_and_rejects_empty() {
        let args = Args::try_parse_from(["relq"]).unwrap();
        assert_eq!(args.delimiter, DEFAULT_DELIMITER);

        assert!(Args::try_parse_from(["relq", "--delimiter", ""]).is_err());
    }

    #[test]
    fn test_last_error_flag_wins() {
        let args = Args::try_parse_from(["relq", "--keep-going", "--stop-on-error"]).unwrap();
        assert!(args.stops_on_error());

        let args = Args::try_parse_from(["relq", "--stop-on-error", "--keep-going"]).unwrap();
        assert!(!args.stops_on_error());
    }
}
