use clap::{CommandFactory, Parser};
use colored::*;
use std::io::Write;
use std::process;
use std::sync::Arc;

use bountytab_core::{
    adapters, read_lines, ApiAdapter, BatchRunner, BrowserAdapter, CancelToken, CollectConfig,
    ConsoleSink, Credentials, Reporter, SourceAdapter,
};

#[derive(Parser, Debug)]
#[command(
    name = "BOUNTYTAB",
    version,
    about = "Bug bounty reward-tier collector",
    override_usage = "bountytab <program>  <options>",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Single program (API platform):  bountytab ifood-og --csrf-token TOKEN --cookie \"_session=abc\"
  Batch from file:                bountytab -l programs.txt --csrf-token TOKEN --cookie \"_session=abc\"
  Rendered-page platform:         bountytab -P hackerone -l handles.txt
  Wider worker pool:              bountytab -l programs.txt -t 16
  Retry transient failures:       bountytab -l programs.txt --retries 2
  Save rows to a file:            bountytab -l programs.txt -o rewards.txt
  Dry-run test:                   bountytab -l programs.txt --dry-run"
)]
pub struct Args {
    #[arg(required_unless_present = "list")]
    pub program: Option<String>,

    #[arg(short = 'P', long, default_value = "bugcrowd",
        value_parser = clap::builder::PossibleValuesParser::new(["bugcrowd", "hackerone"]),
        help = "Platform to collect from")]
    pub platform: String,

    #[arg(short = 'l', long = "list", help = "File containing program handles (one per line)")]
    pub list: Option<String>,

    #[arg(short = 't', long, default_value_t = 0, help = "Concurrent workers (0 = platform default)")]
    pub concurrency: usize,

    #[arg(long, default_value_t = 15, help = "Request/navigation timeout in seconds")]
    pub timeout: u64,

    #[arg(long, default_value_t = 4, help = "Browser render-settle window in seconds")]
    pub render_timeout: u64,

    #[arg(long, default_value_t = 0, help = "Retries per target on transient failures")]
    pub retries: u32,

    #[arg(short = 'o', long, help = "Also append rows to this file")]
    pub output: Option<String>,

    #[arg(short = 'H', long = "header", help = "Custom header (e.g. \"X-Api-Key: VALUE\")")]
    pub headers: Vec<String>,

    #[arg(long, help = "Pre-obtained CSRF token (API platform)")]
    pub csrf_token: Option<String>,

    #[arg(long, help = "Pre-obtained session cookie (API platform)")]
    pub cookie: Option<String>,

    #[arg(long, help = "Referer header value")]
    pub referer: Option<String>,

    #[arg(long, help = "User-Agent override")]
    pub user_agent: Option<String>,

    #[arg(long, help = "Base URL override (defaults to the platform's public host)")]
    pub base_url: Option<String>,

    #[arg(short = 'v', long, default_value_t = false, help = "Verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "List targets without sending any request")]
    pub dry_run: bool,
}

impl Args {
    fn to_config(&self) -> CollectConfig {
        CollectConfig {
            platform: self.platform.clone(),
            list_file: self.list.clone().unwrap_or_default(),
            concurrency: self.concurrency,
            timeout: self.timeout,
            render_timeout: self.render_timeout,
            max_retries: self.retries,
            output: self.output.clone().unwrap_or_default(),
            base_url: self.base_url.clone().unwrap_or_default(),
            headers: self.headers.clone(),
            credentials: Credentials {
                user_agent: self.user_agent.clone().unwrap_or_default(),
                referer: self.referer.clone().unwrap_or_default(),
                csrf_token: self.csrf_token.clone().unwrap_or_default(),
                cookie: self.cookie.clone().unwrap_or_default(),
            },
            verbose: self.verbose,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    let config = args.to_config();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if config.verbose { "debug" } else { "warn" }),
    )
    .init();

    print_banner();

    let mut targets: Vec<String> = Vec::new();

    if !config.list_file.is_empty() {
        match read_lines(&config.list_file) {
            Ok(lines) => {
                print!(
                    "{}\r\n",
                    format!("[+] Loaded {} target(s) from {}", lines.len(), config.list_file)
                        .green().bold()
                );
                std::io::stdout().flush().ok();
                targets.extend(lines);
            }
            Err(e) => {
                eprint!(
                    "{}\r\n",
                    format!("[!] Failed to read '{}': {}", config.list_file, e).red()
                );
                process::exit(1);
            }
        }
    }

    if let Some(ref program) = args.program {
        targets.push(program.clone());
    }

    if targets.is_empty() {
        eprint!("{}\r\n", "[!] No targets specified. Provide a handle or use -l <file>.".red());
        let mut cmd = Args::command();
        cmd.print_help().ok();
        process::exit(1);
    }

    if config.dry_run {
        for target in &targets {
            println!("[DRY RUN] Would collect: {} ({})", target, config.platform);
        }
        return;
    }

    print_run_config(&config, targets.len());

    let adapter = match build_adapter(&config) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprint!("{}\r\n", format!("[!] {}", e).red());
            process::exit(1);
        }
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprint!(
                    "{}\r\n",
                    "[!] Interrupt received; letting in-flight targets drain...".yellow()
                );
                cancel.cancel();
            }
        });
    }

    let runner = match BatchRunner::new(Arc::clone(&adapter), config.concurrency_ref()) {
        Ok(runner) => runner.with_max_retries(config.max_retries).with_cancel(cancel),
        Err(e) => {
            eprint!("{}\r\n", format!("[!] {}", e).red());
            process::exit(1);
        }
    };

    print!(
        "{}\r\n",
        format!("[*] Collecting with {} worker(s)...", runner.concurrency())
            .bright_cyan().bold()
    );
    std::io::stdout().flush().ok();

    let sink = ConsoleSink::new_ref();
    let results = runner.run(&targets, &sink).await;

    Reporter::new(config.output_ref().map(String::from)).report(&results, &sink);
}

fn build_adapter(config: &CollectConfig) -> anyhow::Result<Arc<dyn SourceAdapter>> {
    match config.platform.as_str() {
        "hackerone" => {
            let base = config
                .base_url_ref()
                .unwrap_or(adapters::browser::DEFAULT_BASE_URL);
            Ok(Arc::new(BrowserAdapter::new(
                base,
                config.render_timeout,
                config.timeout,
            )))
        }
        _ => {
            let base = config.base_url_ref().unwrap_or(adapters::api::DEFAULT_BASE_URL);
            let adapter = ApiAdapter::new(
                base,
                &config.credentials,
                &config.parsed_headers(),
                config.timeout,
            )?;
            Ok(Arc::new(adapter))
        }
    }
}

/// Prints the BOUNTYTAB ASCII banner.
fn print_banner() {
    let banner = r#"
     ____   ___  _   _ _   _ _______   _______  _    ____
    | __ ) / _ \| | | | \ | |_   _\ \ / /_   _|/ \  | __ )
    |  _ \| | | | | | |  \| | | |  \ V /  | | / _ \ |  _ \
    | |_) | |_| | |_| | |\  | | |   | |   | |/ ___ \| |_) |
    |____/ \___/ \___/|_| \_| |_|   |_|   |_/_/   \_\____/
    "#;
    print!("{}\r\n", banner.bright_cyan().bold());
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}

/// Prints the run configuration summary. Credential values never hit the
/// terminal; only their presence does.
fn print_run_config(config: &CollectConfig, total: usize) {
    let workers = match config.concurrency_ref() {
        Some(n) => n.to_string(),
        None => "platform default".to_string(),
    };

    print!("{}\r\n", format!("[+] Platform:    {}", config.platform).green().bold());
    print!("{}\r\n", format!("[+] Targets:     {}", total).blue());
    print!("{}\r\n", format!("[+] Workers:     {}", workers).blue());
    print!("{}\r\n", format!("[+] Timeout:     {}s", config.timeout).blue());
    if config.platform == "hackerone" {
        print!("{}\r\n", format!("[+] Render wait: {}s", config.render_timeout).blue());
    }
    if config.max_retries > 0 {
        print!("{}\r\n", format!("[+] Retries:     {}", config.max_retries).blue());
    }
    if let Some(output) = config.output_ref() {
        print!("{}\r\n", format!("[+] Output:      {}", output).blue());
    }
    if !config.headers.is_empty() {
        print!("{}\r\n", format!("[+] Headers:     {} custom", config.headers.len()).yellow());
    }
    if !config.credentials.csrf_token.is_empty() {
        print!("{}\r\n", "[+] Credential:  CSRF token set".yellow());
    }
    if !config.credentials.cookie.is_empty() {
        print!("{}\r\n", "[+] Credential:  cookie set".yellow());
    }
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}
