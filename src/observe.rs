//! DOM enumeration — finds visible interactive elements and numbers them.
//!
//! The same script pass that builds the descriptor list also stores the
//! element references in `window.__wayfarer_targets__`, so the index the
//! resolver picks always addresses the element the list described. Keep
//! [`OBSERVE_JS`] and [`CLICK_BY_INDEX_JS`] in this file together: they
//! share the lookup array and must not drift apart.

use std::fmt;

use eoka::Page;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Extracted text is clipped to this many characters to keep the resolver
/// prompt small.
pub const TEXT_LIMIT: usize = 120;

/// Viewport-relative bounding box, integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One visible interactive element, identified by a dense zero-based index.
///
/// Indices are assigned in document traversal order over the elements that
/// survive the visibility filter, and are valid until the next
/// [`observe`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickableElement {
    pub index: usize,
    /// Lowercased tag name.
    pub tag: String,
    /// Visible text, whitespace-collapsed, clipped to [`TEXT_LIMIT`].
    pub text: String,
    /// Link target, if any.
    pub href: Option<String>,
    pub rect: Rect,
}

impl fmt::Display for ClickableElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] <{}> text={:?}", self.index, self.tag, self.text)?;
        if let Some(ref href) = self.href {
            write!(f, " href={}", href)?;
        }
        Ok(())
    }
}

/// What [`OBSERVE_JS`] emits per element; numbering happens on the Rust
/// side so a dense `0..n` sequence is structural, not scripted.
#[derive(Deserialize)]
struct RawElement {
    tag: String,
    text: String,
    href: Option<String>,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

/// Enumerates interactive elements and mirrors the survivors into
/// `window.__wayfarer_targets__` in the same filtered pass.
const OBSERVE_JS: &str = r#"
(() => {
    const CANDIDATES =
        'a, button, [role="button"], [role="link"], '
        + 'input[type="submit"], input[type="button"], '
        + 'select, textarea, input:not([type="hidden"]), '
        + '[tabindex="0"], summary';
    const results = [];
    const targets = [];
    const seen = new Set();

    for (const el of document.querySelectorAll(CANDIDATES)) {
        if (seen.has(el)) continue;
        seen.add(el);

        const rect = el.getBoundingClientRect();
        if (rect.width < 1 || rect.height < 1) continue;
        if (rect.bottom < 0 || rect.top > window.innerHeight) continue;
        if (rect.right < 0 || rect.left > window.innerWidth) continue;

        const text = (el.innerText || el.textContent || '').replace(/\s+/g, ' ').trim();
        if (text.length === 0 && el.tagName !== 'INPUT') continue;

        targets.push(el);
        results.push({
            tag: el.tagName.toLowerCase(),
            text: text.substring(0, 120),
            href: el.getAttribute('href'),
            x: Math.round(rect.x),
            y: Math.round(rect.y),
            width: Math.round(rect.width),
            height: Math.round(rect.height),
        });
    }

    window.__wayfarer_targets__ = targets;
    return JSON.stringify(results);
})()
"#;

/// Looks an element up in the array populated by [`OBSERVE_JS`], scrolls
/// it into view and clicks it. Invoked as `CLICK_BY_INDEX_JS(idx)`.
pub(crate) const CLICK_BY_INDEX_JS: &str = r#"
((idx) => {
    const el = window.__wayfarer_targets__ && window.__wayfarer_targets__[idx];
    if (!el) {
        return { ok: false, tag: '', text: '', href: null,
                 reason: 'element index ' + idx + ' not in target map' };
    }
    el.scrollIntoView({ block: 'center', inline: 'center' });
    el.click();
    return {
        ok: true,
        tag: el.tagName.toLowerCase(),
        text: (el.innerText || '').substring(0, 80),
        href: el.getAttribute('href'),
        reason: null,
    };
})
"#;

/// Result of a click-by-index attempt, reported from the page.
#[derive(Debug, Deserialize)]
pub struct ClickOutcome {
    pub ok: bool,
    pub tag: String,
    pub text: String,
    pub href: Option<String>,
    pub reason: Option<String>,
}

/// Run the observe script and return the numbered element list.
pub async fn observe(page: &Page) -> Result<Vec<ClickableElement>> {
    let json_str: String = page.evaluate(OBSERVE_JS).await?;
    parse_elements(&json_str)
}

fn parse_elements(json_str: &str) -> Result<Vec<ClickableElement>> {
    let raw: Vec<RawElement> = serde_json::from_str(json_str)
        .map_err(|e| eoka::Error::CdpSimple(format!("observe parse error: {}", e)))?;

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(i, r)| ClickableElement {
            index: i,
            tag: r.tag,
            text: r.text,
            href: r.href,
            rect: Rect {
                x: r.x,
                y: r.y,
                width: r.width,
                height: r.height,
            },
        })
        .collect())
}
