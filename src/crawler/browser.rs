//! Headless Chrome renderer
//!
//! Used when the archive only fills in a letter's detail view after its
//! JavaScript runs. Chrome is launched on the first render and killed on
//! shutdown; every render opens and closes its own tab.

use crate::crawler::fetcher::{FetchError, Renderer};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct BrowserRenderer {
    user_agent: Option<String>,
    browser: Mutex<Option<Arc<Browser>>>,
}

impl BrowserRenderer {
    pub fn new(user_agent: Option<String>) -> Self {
        Self {
            user_agent,
            browser: Mutex::new(None),
        }
    }

    async fn session(&self) -> Result<Arc<Browser>, FetchError> {
        let mut browser = self.browser.lock().await;

        if let Some(running) = browser.as_ref() {
            return Ok(running.clone());
        }

        tracing::info!("Launching headless browser");
        let user_agent = self.user_agent.clone();
        let launched = tokio::task::spawn_blocking(move || launch(user_agent.as_deref()))
            .await
            .map_err(|e| FetchError::Session(e.to_string()))??;

        let launched = Arc::new(launched);
        *browser = Some(launched.clone());
        Ok(launched)
    }
}

fn launch(user_agent: Option<&str>) -> Result<Browser, FetchError> {
    let user_agent_arg = user_agent.map(|ua| format!("--user-agent={}", ua));

    let mut args: Vec<&OsStr> = vec![OsStr::new("--disable-dev-shm-usage")];
    if let Some(ref ua) = user_agent_arg {
        args.push(OsStr::new(ua));
    }

    let options = LaunchOptions::default_builder()
        .headless(true)
        .args(args)
        .build()
        .map_err(|e| FetchError::Session(e.to_string()))?;

    Browser::new(options).map_err(|e| FetchError::Session(e.to_string()))
}

fn render_error(url: &str, error: impl std::fmt::Display) -> FetchError {
    FetchError::Render {
        url: url.to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let browser = self.session().await?;
        let target = url.to_string();

        tracing::debug!("Navigating to URL: {}", url);
        tokio::task::spawn_blocking(move || {
            let tab = browser.new_tab().map_err(|e| render_error(&target, e))?;
            tab.set_default_timeout(timeout);

            let content = tab
                .navigate_to(&target)
                .and_then(|tab| tab.wait_until_navigated())
                .and_then(|tab| tab.get_content())
                .map_err(|e| render_error(&target, e));

            if let Err(e) = tab.close(true) {
                tracing::debug!("Failed to close tab for {}: {}", target, e);
            }

            content
        })
        .await
        .map_err(|e| render_error(url, e))?
    }

    async fn shutdown(&self) {
        if self.browser.lock().await.take().is_some() {
            tracing::info!("Headless browser closed");
        }
    }
}
