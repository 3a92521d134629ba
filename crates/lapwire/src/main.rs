mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lapwire", version, about = "Live-timing capture decoder")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Directory for cached tables. Tables are rebuilt on every run when unset.
    #[arg(long, value_name = "DIR", env = "LAPWIRE_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format, cli.cache_dir);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decode_subcommand() {
        let cli = Cli::try_parse_from([
            "lapwire",
            "decode",
            "/tmp/capture",
            "--channel",
            "timing_data",
            "--limit",
            "5",
        ])
        .expect("decode args should parse");

        match cli.command {
            Command::Decode(args) => {
                assert_eq!(args.channel, "timing_data");
                assert_eq!(args.limit, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["lapwire", "laps", "/tmp/capture", "--format", "json"])
            .expect("laps args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Command::Laps(_)));
    }

    #[test]
    fn parses_grace_window() {
        let cli = Cli::try_parse_from(["lapwire", "summary", "/tmp/capture", "--grace-ms", "2500"])
            .expect("summary args should parse");
        match cli.command {
            Command::Summary(args) => assert_eq!(args.grace_ms, Some(2500)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decode_requires_channel() {
        let err = Cli::try_parse_from(["lapwire", "decode", "/tmp/capture"])
            .expect_err("missing --channel should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
