//! Browser session — owns the eoka browser and exposes the primitives the
//! agent loop needs, behind the [`PageDriver`] trait so the loop is
//! testable with a scripted double.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use eoka::{Browser, Page, StealthConfig};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::observe::{self, ClickOutcome, ClickableElement, CLICK_BY_INDEX_JS};
use crate::verify::Snapshot;
use crate::Result;

/// Pause after a text-entry action before the loop moves on.
const TYPE_SETTLE_MS: u64 = 300;
/// Pause after a scroll so the next screenshot sees the final paint.
const SCROLL_SETTLE_MS: u64 = 250;

/// Sends text to whatever control has focus, through the native value
/// setter so framework-managed inputs observe the change.
const TYPE_INTO_FOCUSED_JS: &str = r#"
((text) => {
    const el = document.activeElement;
    if (!el || el === document.body) return false;
    if (el.isContentEditable) {
        el.textContent += text;
    } else if ('value' in el) {
        const proto = el.tagName === 'TEXTAREA'
            ? window.HTMLTextAreaElement.prototype
            : window.HTMLInputElement.prototype;
        const setter = Object.getOwnPropertyDescriptor(proto, 'value');
        if (setter && setter.set) {
            setter.set.call(el, (el.value || '') + text);
        } else {
            el.value = (el.value || '') + text;
        }
    } else {
        return false;
    }
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
})
"#;

/// Coordinate-fallback click: element at point, promoted to its nearest
/// clickable ancestor.
const CLICK_AT_POINT_JS: &str = r#"
((x, y) => {
    let el = document.elementFromPoint(x, y);
    if (!el) return { ok: false, tag: '', text: '', href: null,
                      reason: 'no element at (' + x + ', ' + y + ')' };

    const CLICKABLE = ['A', 'BUTTON', 'INPUT', 'SELECT', 'TEXTAREA', 'LABEL', 'SUMMARY'];
    let node = el;
    while (node && node !== document.body) {
        if (CLICKABLE.includes(node.tagName) || node.getAttribute('role') === 'button') {
            el = node;
            break;
        }
        node = node.parentElement;
    }

    el.scrollIntoView({ block: 'center', inline: 'center' });
    el.click();
    return { ok: true, tag: el.tagName.toLowerCase(),
             text: (el.innerText || '').substring(0, 80),
             href: el.getAttribute('href'), reason: null };
})
"#;

/// The browser surface the agent loop drives. One implementation wraps a
/// live eoka page; tests substitute a scripted fake.
#[async_trait]
pub trait PageDriver: Send {
    /// Current address plus rendered-pixel fingerprint.
    async fn snapshot(&self) -> Result<Snapshot>;

    /// Screenshot encoded for transport to the vision model.
    async fn screenshot_b64(&self) -> Result<String>;

    /// Enumerate clickable elements (rebuilds the index→element map).
    async fn observe(&self) -> Result<Vec<ClickableElement>>;

    /// Click the element at `index` in the most recent [`observe`] map.
    async fn click_index(&self, index: usize) -> Result<()>;

    /// Send text to the focused control.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Press Enter in the focused control.
    async fn press_enter(&self) -> Result<()>;

    async fn scroll_down(&self) -> Result<()>;
    async fn scroll_up(&self) -> Result<()>;
    async fn scroll_top(&self) -> Result<()>;

    /// Release the browser. Called exactly once, on every exit path.
    async fn close(self) -> Result<()>;
}

/// A live browser session: one browser, one page, exclusively owned by
/// one agent run.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
}

impl BrowserSession {
    /// Launch a browser and navigate to the starting address.
    pub async fn launch(url: &str, headless: bool) -> Result<Self> {
        let stealth = StealthConfig {
            headless,
            viewport_width: 1280,
            viewport_height: 720,
            ..Default::default()
        };

        debug!("launching browser (headless: {})", headless);
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        page.goto(url).await?;
        Self::settle(&page).await;

        Ok(Self { browser, page })
    }

    /// The underlying page, for callers that need raw access.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Click at raw viewport coordinates. Secondary path only: reaches
    /// elements outside the extractor's filter set. The agent loop never
    /// calls this on its own; index-resolved clicking is the contract.
    pub async fn click_at(&self, x: i32, y: i32) -> Result<()> {
        let js = format!("{}({}, {})", CLICK_AT_POINT_JS, x, y);
        let outcome: ClickOutcome = self.page.evaluate(&js).await?;
        if outcome.ok {
            debug!("clicked <{}> {:?} at ({}, {})", outcome.tag, outcome.text, x, y);
        } else {
            warn!(
                "click_at failed: {}",
                outcome.reason.as_deref().unwrap_or("unknown")
            );
        }
        Self::settle(&self.page).await;
        Ok(())
    }

    /// Best-effort wait for the page to stop moving: network idle if it
    /// ever arrives (some sites poll forever), then a short paint delay.
    async fn settle(page: &Page) {
        let _ = page.wait_for_network_idle(200, 2000).await;
        page.wait(100).await;
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn snapshot(&self) -> Result<Snapshot> {
        let url = self.page.url().await?;
        let png = self.page.screenshot().await?;
        let fingerprint = format!("{:x}", Sha256::digest(&png));
        Ok(Snapshot { url, fingerprint })
    }

    async fn screenshot_b64(&self) -> Result<String> {
        let png = self.page.screenshot().await?;
        Ok(BASE64.encode(png))
    }

    async fn observe(&self) -> Result<Vec<ClickableElement>> {
        observe::observe(&self.page).await
    }

    async fn click_index(&self, index: usize) -> Result<()> {
        let js = format!("{}({})", CLICK_BY_INDEX_JS, index);
        let outcome: ClickOutcome = self.page.evaluate(&js).await?;
        if outcome.ok {
            debug!(
                "clicked [{}] <{}> {:?} href={:?}",
                index, outcome.tag, outcome.text, outcome.href
            );
        } else {
            // Stale map entry; the change verifier will surface the no-op.
            warn!(
                "click [{}] failed: {}",
                index,
                outcome.reason.as_deref().unwrap_or("unknown")
            );
        }
        Self::settle(&self.page).await;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let js = format!(
            "{}({})",
            TYPE_INTO_FOCUSED_JS,
            serde_json::to_string(text)?
        );
        let accepted: bool = self.page.evaluate(&js).await?;
        if !accepted {
            warn!("type_text: no focused editable control");
        }
        self.page.wait(TYPE_SETTLE_MS).await;
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        self.page.human().press_key("Enter").await?;
        Self::settle(&self.page).await;
        Ok(())
    }

    async fn scroll_down(&self) -> Result<()> {
        self.page
            .execute("window.scrollBy(0, window.innerHeight * 0.8)")
            .await?;
        self.page.wait(SCROLL_SETTLE_MS).await;
        Ok(())
    }

    async fn scroll_up(&self) -> Result<()> {
        self.page
            .execute("window.scrollBy(0, -window.innerHeight * 0.8)")
            .await?;
        self.page.wait(SCROLL_SETTLE_MS).await;
        Ok(())
    }

    async fn scroll_top(&self) -> Result<()> {
        self.page.execute("window.scrollTo(0, 0)").await?;
        self.page.wait(SCROLL_SETTLE_MS).await;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
