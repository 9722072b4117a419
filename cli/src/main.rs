use anyhow::Context;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use disclosure_archiver_core::{
    ArchiveConfig, ConsoleSink, HttpClient, Pipeline, RunSummary, SinkRef,
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_BASE_URL,
};

#[derive(Parser, Debug)]
#[command(
    name = "disclosure-archiver",
    version,
    about = "Archive publicly disclosed bug-bounty reports as text documents",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Latest 10 disclosures:          disclosure-archiver
  Latest 50 disclosures:          disclosure-archiver 50
  Custom output directory:        disclosure-archiver 25 -o ./archive
  Faster, with verbose logging:   disclosure-archiver 25 --delay 0 -v
  Only markdown attachments:      disclosure-archiver --allow-content-type text/markdown
  Dry-run:                        disclosure-archiver 5 --dry-run"
)]
pub struct Args {
    #[arg(default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..),
        help = "Number of disclosed reports to request")]
    pub count: u64,

    #[arg(long, default_value = DEFAULT_BASE_URL, help = "Platform base URL")]
    pub base_url: String,

    #[arg(short = 'o', long, default_value = "downloads", help = "Root directory for reports and attachments")]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = 1, help = "Seconds to wait after each report detail request")]
    pub delay: u64,

    #[arg(long, default_value_t = 30, help = "Request timeout in seconds")]
    pub timeout: u64,

    #[arg(long = "allow-content-type", value_name = "MIME",
        help = "Attachment content type to embed (repeatable; default: text/markdown, text/x-diff)")]
    pub allowed_content_types: Vec<String>,

    #[arg(short = 'v', long, default_value_t = false, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(long, help = "Print the run plan without sending any requests")]
    pub dry_run: bool,
}

impl Args {
    fn to_config(&self) -> ArchiveConfig {
        let allowed_content_types = if self.allowed_content_types.is_empty() {
            DEFAULT_ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect()
        } else {
            self.allowed_content_types.clone()
        };

        ArchiveConfig {
            base_url: self.base_url.clone(),
            downloads_dir: self.output_dir.clone(),
            count: self.count as usize,
            rate_limit_delay_ms: self.delay.saturating_mul(1000),
            timeout_secs: self.timeout,
            allowed_content_types,
        }
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.to_config();
    log::debug!("Resolved configuration: {:?}", config);
    print_banner();
    print_run_config(&config);

    if args.dry_run {
        println!(
            "[DRY RUN] Would request {} report(s) from {}/graphql",
            config.count,
            config.base_url_trimmed()
        );
        return;
    }

    let sink = ConsoleSink::new_ref();
    match run_archive(config, Arc::clone(&sink)).await {
        Ok(summary) => summary.report_summary(&sink),
        Err(e) => {
            eprintln!("{}", format!("[!] Error during execution: {:#}", e).red());
            process::exit(1);
        }
    }
}

async fn run_archive(config: ArchiveConfig, sink: SinkRef) -> anyhow::Result<RunSummary> {
    let source = config.base_url_trimmed().to_string();
    let transport = Arc::new(HttpClient::new(config.timeout_secs));
    let pipeline = Pipeline::new(config, transport, sink);

    pipeline
        .run()
        .await
        .with_context(|| format!("archiving disclosures from {} failed", source))
}

/// `RUST_LOG` wins over the verbosity flag when set.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

fn print_banner() {
    println!("{}", "disclosure-archiver".bright_cyan().bold());
    println!("{}", "──────────────────────────────────────────────────".dimmed());
}

fn print_run_config(config: &ArchiveConfig) {
    println!("{}", format!("[+] Source:     {}", config.base_url_trimmed()).green().bold());
    println!("{}", format!("[+] Reports:    {}", config.count).blue());
    println!("{}", format!("[+] Output:     {}", config.downloads_dir.display()).blue());
    println!("{}", format!("[+] Delay:      {}ms", config.rate_limit_delay_ms).blue());
    println!("{}", format!("[+] Timeout:    {}s", config.timeout_secs).blue());
    println!(
        "{}",
        format!("[+] Embedding:  {}", config.allowed_content_types.join(", ")).magenta()
    );
    println!("{}", "──────────────────────────────────────────────────".dimmed());
}
