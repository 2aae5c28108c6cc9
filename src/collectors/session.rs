use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};

use crate::error::AppError;

/// Loads listing pages. One session serves one run.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Load `url` and return the page's HTML.
    async fn load(&self, url: &str) -> Result<String, AppError>;
}

/// Plain HTTP page session. Dropping it closes the underlying client.
pub struct HttpSession {
    client: reqwest::Client,
}

impl HttpSession {
    /// Open a session whose page loads give up after `timeout`.
    pub fn open(timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| AppError::Setup(format!("Failed to build HTTP client: {e}")))?;
        tracing::debug!("Page session opened");
        Ok(Self { client })
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        tracing::debug!("Page session closed");
    }
}

#[async_trait]
impl PageSource for HttpSession {
    async fn load(&self, url: &str) -> Result<String, AppError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Navigation(format!("Timed out loading {url}"))
                } else {
                    AppError::Navigation(format!("Request to {url} failed: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(AppError::Navigation(format!(
                "{url} returned {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Navigation(format!("Failed to read {url}: {e}")))?;

        ensure_html(url, content_type.as_deref(), body)
    }
}

/// Headless Chrome session for listings rendered by script. The browser
/// process exits when the session is dropped.
pub struct BrowserSession {
    browser: Browser,
    timeout: Duration,
}

impl BrowserSession {
    pub fn open(timeout: Duration) -> Result<Self, AppError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .idle_browser_timeout(timeout.max(Duration::from_secs(30)))
            .build()
            .map_err(|e| AppError::Setup(format!("Invalid browser options: {e}")))?;
        let browser = Browser::new(options)
            .map_err(|e| AppError::Setup(format!("Failed to launch browser: {e}")))?;
        tracing::debug!("Browser session opened");
        Ok(Self { browser, timeout })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        tracing::debug!("Browser session closed");
    }
}

#[async_trait]
impl PageSource for BrowserSession {
    async fn load(&self, url: &str) -> Result<String, AppError> {
        let browser = self.browser.clone();
        let timeout = self.timeout;
        let target = url.to_string();

        let html = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let tab = browser.new_tab()?;
            tab.set_default_timeout(timeout);
            tab.navigate_to(&target)?.wait_until_navigated()?;
            tab.wait_for_element("body")?;
            let html = tab.get_content()?;
            if let Err(e) = tab.close(true) {
                tracing::debug!("Failed to close tab: {e}");
            }
            Ok(html)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Browser task failed: {e}")))?
        .map_err(|e| AppError::Navigation(format!("Failed to load {url} in browser: {e}")))?;

        ensure_html(url, None, html)
    }
}

/// Open the session a run loads its pages through.
pub fn open_session(browser: bool, timeout: Duration) -> Result<Box<dyn PageSource>, AppError> {
    if browser {
        Ok(Box::new(BrowserSession::open(timeout)?))
    } else {
        Ok(Box::new(HttpSession::open(timeout)?))
    }
}

/// A page counts as loaded when it is a non-empty HTML document. The parser
/// supplies `<html>` and `<body>` when the markup leaves them out.
fn ensure_html(url: &str, content_type: Option<&str>, html: String) -> Result<String, AppError> {
    if let Some(content_type) = content_type
        && !content_type.contains("html")
    {
        return Err(AppError::Navigation(format!(
            "{url} is not an HTML page ({content_type})"
        )));
    }
    if html.trim().is_empty() {
        return Err(AppError::Navigation(format!("{url} returned an empty document")));
    }
    Ok(html)
}

/// Serves a fixed page, or fails every load with the given message.
#[cfg(test)]
pub(crate) struct StaticPage(pub Result<String, String>);

#[cfg(test)]
#[async_trait]
impl PageSource for StaticPage {
    async fn load(&self, _url: &str) -> Result<String, AppError> {
        self.0.clone().map_err(AppError::Navigation)
    }
}
