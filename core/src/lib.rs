pub mod adapters;
pub mod browser;
pub mod core;
pub mod http;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use crate::adapters::api::{ApiAdapter, TierMap};
pub use crate::adapters::browser::{BrowserAdapter, TierSelectors};
pub use crate::adapters::SourceAdapter;
pub use crate::browser::SessionManager;
pub use crate::core::reporter::{Reporter, RunSummary};
pub use crate::core::reward::{CollectionResult, FailureKind, RewardTier};
pub use crate::core::runner::{BatchRunner, CancelToken};
pub use crate::core::Severity;
pub use crate::http::HttpClient;
pub use crate::utils::read_lines;

/// Shared collection configuration used by the CLI front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectConfig {
    pub platform: String,
    pub list_file: String,
    /// Worker-pool width; 0 means "whatever the adapter considers sane".
    pub concurrency: usize,
    pub timeout: u64,
    pub render_timeout: u64,
    pub max_retries: u32,
    pub output: String,
    /// Empty means the platform's public host.
    pub base_url: String,
    pub headers: Vec<String>,
    pub credentials: Credentials,
    pub verbose: bool,
    pub dry_run: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            platform: "bugcrowd".to_string(),
            list_file: String::new(),
            concurrency: 0,
            timeout: 15,
            render_timeout: 4,
            max_retries: 0,
            output: String::new(),
            base_url: String::new(),
            headers: Vec::new(),
            credentials: Credentials::default(),
            verbose: false,
            dry_run: false,
        }
    }
}

impl CollectConfig {
    pub fn parsed_headers(&self) -> Vec<(String, String)> {
        parse_custom_headers(&self.headers)
    }

    pub fn concurrency_ref(&self) -> Option<usize> {
        if self.concurrency == 0 { None } else { Some(self.concurrency) }
    }

    pub fn output_ref(&self) -> Option<&str> {
        if self.output.is_empty() { None } else { Some(&self.output) }
    }

    pub fn base_url_ref(&self) -> Option<&str> {
        if self.base_url.is_empty() { None } else { Some(&self.base_url) }
    }
}

/// Opaque, caller-provided platform credentials (pass-through only).
/// Login and token refresh are someone else's problem; empty fields mean
/// the header is simply not sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub user_agent: String,
    pub referer: String,
    pub csrf_token: String,
    pub cookie: String,
}

pub fn parse_custom_headers(raw: &[String]) -> Vec<(String, String)> {
    raw.iter().filter_map(|h| {
        let mut parts = h.splitn(2, ':');
        let key = parts.next()?.trim().to_string();
        let val = parts.next().unwrap_or("").trim().to_string();
        if key.is_empty() { return None; }
        Some((key, val))
    }).collect()
}

/// Output abstraction for the collection pipeline.
/// CLI implements this with colored terminal output; tests record events.
pub trait RunEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_row(&self, tier: &RewardTier);
    fn on_progress(&self, phase: &str, current: usize, total: usize);
}

pub type SinkRef = Arc<dyn RunEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl RunEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        use std::io::Write;
        let colored = match level {
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        print!("{}\r\n", colored);
        std::io::stdout().flush().ok();
    }

    fn on_row(&self, tier: &RewardTier) {
        use std::io::Write;
        // Rows stay uncolored so the table can be piped or redirected.
        print!("{}\r\n", Reporter::render_row(tier));
        std::io::stdout().flush().ok();
    }

    fn on_progress(&self, phase: &str, current: usize, total: usize) {
        use colored::*;
        use std::io::Write;
        if total > 0 {
            print!("{}\r\n", format!("[*] {} ({}/{})", phase, current, total).bright_cyan());
        } else {
            print!("{}\r\n", format!("[*] {}", phase).bright_cyan());
        }
        std::io::stdout().flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_custom_headers_splits_on_first_colon() {
        let raw = vec![
            "X-Csrf-Token: abc123".to_string(),
            "Cookie: a=b; c=d".to_string(),
            "   ".to_string(),
        ];
        let parsed = parse_custom_headers(&raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ("X-Csrf-Token".to_string(), "abc123".to_string()));
        assert_eq!(parsed[1], ("Cookie".to_string(), "a=b; c=d".to_string()));
    }

    #[test]
    fn config_defaults_match_platform_expectations() {
        let config = CollectConfig::default();
        assert_eq!(config.platform, "bugcrowd");
        assert_eq!(config.timeout, 15);
        assert_eq!(config.render_timeout, 4);
        assert!(config.concurrency_ref().is_none());
        assert!(config.output_ref().is_none());
        assert!(config.base_url_ref().is_none());
    }

    #[test]
    fn explicit_config_values_surface_through_accessors() {
        let config = CollectConfig {
            concurrency: 16,
            output: "rewards.txt".to_string(),
            headers: vec!["A: 1".to_string(), "B: 2".to_string()],
            ..Default::default()
        };
        assert_eq!(config.concurrency_ref(), Some(16));
        assert_eq!(config.output_ref(), Some("rewards.txt"));
        assert_eq!(config.parsed_headers().len(), 2);
    }
}
