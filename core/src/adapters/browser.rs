use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::Page;
use log::debug;
use tokio::time::{sleep, timeout, Instant};

use crate::adapters::SourceAdapter;
use crate::browser::SessionManager;
use crate::core::reward::{CollectionResult, FailureKind, RewardTier};
use crate::core::Severity;
use crate::utils::parse_money;

pub const DEFAULT_BASE_URL: &str = "https://hackerone.com";
const PROFILE_QUERY: &str = "?type=team";
const SETTLE_POLL_MS: u64 = 250;

/// CSS selectors for the four bounty-table cells on a program profile.
#[derive(Debug, Clone)]
pub struct TierSelectors {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub critical: String,
}

impl Default for TierSelectors {
    fn default() -> Self {
        Self {
            low: "td.spec-bounty-table-low".to_string(),
            medium: "td.spec-bounty-table-medium".to_string(),
            high: "td.spec-bounty-table-high".to_string(),
            critical: "td.spec-bounty-table-critical".to_string(),
        }
    }
}

impl TierSelectors {
    fn get(&self, severity: Severity) -> &str {
        match severity {
            Severity::Low => &self.low,
            Severity::Medium => &self.medium,
            Severity::High => &self.high,
            Severity::Critical => &self.critical,
        }
    }
}

/// Collects reward tiers from the platform's server-rendered profile pages.
///
/// The bounty table is populated client-side some time after navigation, so
/// the adapter polls for it instead of trusting the load event. One shared
/// browser process serves the whole batch; each target gets its own page.
pub struct BrowserAdapter {
    session: Arc<SessionManager>,
    base_url: String,
    selectors: TierSelectors,
    render_timeout: Duration,
    nav_timeout: Duration,
}

impl BrowserAdapter {
    pub fn new(base_url: &str, render_timeout_seconds: u64, nav_timeout_seconds: u64) -> Self {
        Self {
            session: Arc::new(SessionManager::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            selectors: TierSelectors::default(),
            render_timeout: Duration::from_secs(render_timeout_seconds),
            nav_timeout: Duration::from_secs(nav_timeout_seconds),
        }
    }

    pub fn with_selectors(mut self, selectors: TierSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    fn profile_url(&self, handle: &str) -> String {
        format!("{}/{}{}", self.base_url, handle.trim_matches('/'), PROFILE_QUERY)
    }

    /// Reads one tier cell in-page. Any evaluation error (element detached,
    /// bad selector) means the tier is unreadable right now and counts as
    /// not published, never a whole-target failure.
    async fn read_tier(page: &Page, selector: &str) -> Option<f64> {
        let script = format!(
            r#"(() => {{
                const cell = document.querySelector({selector:?});
                if (!cell) return null;
                const span = cell.querySelector('span');
                return span ? span.innerText : cell.innerText;
            }})()"#
        );
        let text: Option<String> = page.evaluate(script.as_str()).await.ok()?.into_value().ok()?;
        parse_money(&text?)
    }

    /// Polls the four cells until each carries readable numeric text or the
    /// render window closes. Tiers still missing at the deadline stay
    /// absent, mirroring the API adapter's optional-field semantics.
    async fn settle(&self, page: &Page, target: &str) -> RewardTier {
        let deadline = Instant::now() + self.render_timeout;
        loop {
            let mut tier = RewardTier::empty(target);
            for severity in Severity::ALL {
                tier.set(severity, Self::read_tier(page, self.selectors.get(severity)).await);
            }

            if Severity::ALL.iter().all(|s| tier.get(*s).is_some()) {
                return tier;
            }
            let now = Instant::now();
            if now >= deadline {
                return tier;
            }
            sleep(Duration::from_millis(SETTLE_POLL_MS).min(deadline - now)).await;
        }
    }
}

#[async_trait]
impl SourceAdapter for BrowserAdapter {
    async fn fetch(&self, target: &str) -> Vec<CollectionResult> {
        let page = match self.session.acquire_page().await {
            Ok(page) => page,
            Err(e) => {
                // A dead process poisons every later acquire; drop it so the
                // next target gets a relaunch.
                self.session.invalidate().await;
                return vec![CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Session(e.to_string()),
                }];
            }
        };

        let url = self.profile_url(target);
        debug!("navigating to {}", url);

        match timeout(self.nav_timeout, page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                let _ = page.close().await;
                return vec![CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Network(e.to_string()),
                }];
            }
            Err(_) => {
                let _ = page.close().await;
                return vec![CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Network(format!(
                        "navigation to {} timed out after {}s",
                        url,
                        self.nav_timeout.as_secs()
                    )),
                }];
            }
        }

        let tier = self.settle(&page, target).await;
        let _ = page.close().await;

        vec![CollectionResult::Collected(tier)]
    }

    fn default_concurrency(&self) -> usize {
        1
    }

    async fn close(&self) {
        self.session.shutdown().await;
    }

    fn name(&self) -> &'static str {
        "hackerone-browser"
    }
}
