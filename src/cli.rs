use crate::tools::fetch::{fetch_report, FetchOptions};
use crate::tools::normalize::Parser as HtmlParser;
use anyhow::Context;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "pagegrab",
    version,
    about = "Fetch HTML from a local path or URL with retries"
)]
pub struct Cli {
    /// Local path or http(s) URL
    source: String,

    /// Per-attempt timeout in seconds
    #[arg(long, env = "PAGEGRAB_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Maximum remote attempts
    #[arg(long, env = "PAGEGRAB_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Seconds multiplied by the attempt number between attempts
    #[arg(long, env = "PAGEGRAB_BACKOFF_FACTOR", default_value_t = 1.0)]
    backoff_factor: f64,

    /// HTML parser: fragment or document
    #[arg(long, env = "PAGEGRAB_PARSER", default_value = "fragment")]
    parser: HtmlParser,

    /// PEM trust bundle used to verify servers
    #[arg(long, env = "PAGEGRAB_CA_FILE")]
    ca_file: Option<PathBuf>,

    /// Retry once without certificate verification after a certificate error
    #[arg(long, env = "PAGEGRAB_ALLOW_INSECURE_FALLBACK")]
    allow_insecure_fallback: bool,

    /// Print the fetch result as JSON instead of raw HTML
    #[arg(long)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    pub fn options(&self) -> FetchOptions {
        let mut opts = FetchOptions::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.max_retries)
            .with_backoff_factor(self.backoff_factor)
            .with_parser(self.parser)
            .with_insecure_fallback(self.allow_insecure_fallback);
        if let Some(path) = &self.ca_file {
            opts = opts.with_ca_file(path.clone());
        }
        opts
    }
}

pub fn run() {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    if let Err(e) = run_with_args(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// Exposed for callers embedding the CLI

pub fn run_with_args(cli: &Cli) -> anyhow::Result<()> {
    let result = fetch_report(&cli.source, &cli.options())
        .with_context(|| format!("fetching {}", cli.source))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.html);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["pagegrab", "https://example.test/"]).unwrap();
        let opts = cli.options();
        let lib = FetchOptions::default();
        assert_eq!(opts.timeout, lib.timeout);
        assert_eq!(opts.max_retries, lib.max_retries);
        assert_eq!(opts.backoff_factor, lib.backoff_factor);
        assert_eq!(opts.parser, lib.parser);
        assert!(opts.ca_file.is_none());
        assert!(!opts.allow_insecure_fallback);
        assert!(!cli.json);
    }

    #[test]
    fn flags_flow_into_options() {
        let cli = Cli::try_parse_from([
            "pagegrab",
            "https://example.test/",
            "--timeout",
            "5",
            "--max-retries",
            "7",
            "--backoff-factor",
            "0.5",
            "--parser",
            "document",
            "--ca-file",
            "/etc/ca.pem",
            "--allow-insecure-fallback",
            "-vv",
        ])
        .unwrap();
        let opts = cli.options();
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert_eq!(opts.max_retries, 7);
        assert_eq!(opts.backoff_factor, 0.5);
        assert_eq!(opts.parser, HtmlParser::Document);
        assert_eq!(opts.ca_file, Some(PathBuf::from("/etc/ca.pem")));
        assert!(opts.allow_insecure_fallback);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn rejects_unknown_parser() {
        let res = Cli::try_parse_from(["pagegrab", "x", "--parser", "lxml"]);
        assert!(res.is_err());
    }

    #[test]
    fn local_file_round_trip_through_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.html");
        std::fs::write(&path, "<p>hi</p>").unwrap();
        let cli = Cli::try_parse_from(["pagegrab", path.to_str().unwrap(), "--json"]).unwrap();
        assert!(run_with_args(&cli).is_ok());
    }
}
