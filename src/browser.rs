use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::Settings;

const NAV_TIMEOUT: Duration = Duration::from_secs(30);
const HEADING_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const MAX_STABILITY_POLLS: u32 = 20;

/// Load the source page in a headless browser, wait for client-side
/// rendering to settle, and return the rendered document HTML. The browser
/// is torn down on every exit path.
pub async fn fetch_rendered(settings: &Settings) -> Result<String> {
    let config = BrowserConfig::builder()
        .build()
        .map_err(|e| anyhow!("invalid browser configuration: {e}"))?;
    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch headless browser (is Chromium installed?)")?;

    // The handler must be polled for the whole session or CDP stalls.
    let driver = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    let result = render(&browser, settings).await;

    if let Err(e) = browser.close().await {
        warn!("Error closing browser: {}", e);
    }
    let _ = browser.wait().await;
    driver.abort();

    result
}

async fn render(browser: &Browser, settings: &Settings) -> Result<String> {
    info!("Loading {}", settings.source_url);
    let page = timeout(NAV_TIMEOUT, browser.new_page(settings.source_url.as_str()))
        .await
        .context("timed out opening the source page")?
        .context("failed to open the source page")?;
    timeout(NAV_TIMEOUT, page.wait_for_navigation())
        .await
        .context("timed out loading the source page")?
        .context("navigation to the source page failed")?;

    wait_for_heading(&page, &settings.selectors.heading).await;
    wait_for_stable_rows(&page, &settings.selectors.row).await?;

    page.content()
        .await
        .context("failed to read the rendered document")
}

/// Bounded wait for the first section heading to render. Absence is only a
/// warning: a page with no headings legitimately yields an empty catalog.
async fn wait_for_heading(page: &Page, heading_selector: &str) {
    let deadline = Instant::now() + HEADING_WAIT;
    loop {
        if page.find_element(heading_selector).await.is_ok() {
            return;
        }
        if Instant::now() >= deadline {
            warn!(
                "No {:?} element appeared within {:?}, reading the page as-is",
                heading_selector, HEADING_WAIT
            );
            return;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Readiness check for client-side rendering: poll the row count until two
/// consecutive reads agree. Bounded; after MAX_STABILITY_POLLS reads the
/// page is taken as-is.
async fn wait_for_stable_rows(page: &Page, row_selector: &str) -> Result<()> {
    let expr = format!(
        "document.querySelectorAll({}).length",
        serde_json::to_string(row_selector)?
    );
    let mut last: Option<i64> = None;
    for _ in 0..MAX_STABILITY_POLLS {
        let count: i64 = page
            .evaluate(expr.as_str())
            .await
            .context("failed to count rows in the page")?
            .into_value()
            .context("row count did not come back as a number")?;
        if last == Some(count) {
            debug!("Row count stable at {}", count);
            return Ok(());
        }
        last = Some(count);
        sleep(POLL_INTERVAL).await;
    }
    warn!(
        "Row count still changing after {} polls, reading the page as-is",
        MAX_STABILITY_POLLS
    );
    Ok(())
}
