//! Headless-browser session ownership for the rendered-page platform.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use log::{debug, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Locates a Chromium/Chrome executable.
/// Search order: `BOUNTYTAB_CHROMIUM_PATH` env override, then system PATH.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("BOUNTYTAB_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    None
}

struct LiveSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Owns at most one headless browser process per batch.
///
/// Pages are handed out one per in-flight target; the underlying process is
/// launched at most once, under the mutex, so concurrent workers never see a
/// half-initialized browser. A crashed session is discarded with
/// `invalidate` and relaunched lazily on the next acquire.
pub struct SessionManager {
    session: Mutex<Option<LiveSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self { session: Mutex::new(None) }
    }

    /// Returns a fresh page, launching the browser on first use.
    pub async fn acquire_page(&self) -> Result<Page> {
        let mut slot = self.session.lock().await;
        if slot.is_none() {
            info!("launching headless browser");
            *slot = Some(launch().await?);
        }
        let live = slot.as_ref().expect("session populated above");
        live.browser
            .new_page("about:blank")
            .await
            .context("failed to open a page")
    }

    /// Drops a broken session so the next acquire relaunches from scratch.
    pub async fn invalidate(&self) {
        let mut slot = self.session.lock().await;
        if let Some(live) = slot.take() {
            debug!("discarding browser session");
            teardown(live).await;
        }
    }

    /// Terminates the browser process. Safe to call any number of times,
    /// including when no browser was ever launched.
    pub async fn shutdown(&self) {
        let mut slot = self.session.lock().await;
        if let Some(live) = slot.take() {
            teardown(live).await;
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn launch() -> Result<LiveSession> {
    let executable = find_chromium()
        .context("no Chromium/Chrome executable found (set BOUNTYTAB_CHROMIUM_PATH)")?;

    let config = BrowserConfig::builder()
        .chrome_executable(executable)
        .arg("--headless=new")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch browser")?;

    // The CDP message stream must keep draining for the session to stay alive.
    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let _ = event;
        }
    });

    Ok(LiveSession { browser, handler_task })
}

async fn teardown(mut live: LiveSession) {
    let _ = live.browser.close().await;
    live.handler_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_is_idempotent_without_a_launch() {
        let manager = SessionManager::new();
        manager.shutdown().await;
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn invalidate_on_cold_manager_is_a_noop() {
        let manager = SessionManager::new();
        manager.invalidate().await;
        manager.shutdown().await;
    }

    #[tokio::test]
    #[ignore] // Requires a Chromium install
    async fn acquire_navigate_and_shutdown() {
        let manager = SessionManager::new();
        let page = manager.acquire_page().await.expect("failed to acquire page");

        page.goto("data:text/html,<h1>hello</h1>")
            .await
            .expect("navigation failed");
        let text: String = page
            .evaluate("document.querySelector('h1').textContent")
            .await
            .expect("evaluation failed")
            .into_value()
            .expect("conversion failed");
        assert_eq!(text, "hello");

        let _ = page.close().await;
        manager.shutdown().await;
        manager.shutdown().await;
    }
}
