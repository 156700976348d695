mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "trigno", version, about = "Delsys Trigno client and mock station")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

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
    fn parses_acquire_subcommand() {
        let cli = Cli::try_parse_from([
            "trigno",
            "acquire",
            "--host",
            "127.0.0.1",
            "--duration",
            "2s",
            "--pair",
            "1",
            "--pair",
            "2",
        ])
        .expect("acquire args should parse");

        match cli.command {
            Command::Acquire(args) => {
                assert_eq!(args.pair, vec![1, 2]);
                assert_eq!(args.station.host, "127.0.0.1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_mock_subcommand() {
        let cli = Cli::try_parse_from(["trigno", "mock", "--rate", "2000", "--command-port", "0"])
            .expect("mock args should parse");
        assert!(matches!(cli.command, Command::Mock(_)));
    }

    #[test]
    fn parses_info_subcommand() {
        let cli = Cli::try_parse_from(["trigno", "info", "--timeout", "3s", "--sensor", "4"])
            .expect("info args should parse");
        assert!(matches!(cli.command, Command::Info(_)));
    }

    #[test]
    fn rejects_unknown_format() {
        let err = Cli::try_parse_from(["trigno", "--format", "xml", "version"])
            .expect_err("unknown format should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
