//! Target resolution — maps a semantic description to an element index.
//!
//! Second phase of the click protocol. The vision model says *what* to
//! click ("the Releases link"); this pass decides *which DOM node that is*
//! by matching the description against the extractor's numbered list with
//! a text-only model call. No screenshot, no coordinates — exact lookup
//! against elements actually present, so stale-coordinate clicks cannot
//! happen. A description that matches nothing resolves to -1 and the loop
//! replans; it is never an error.

use serde_json::Value;
use tracing::debug;

use crate::model::{extract_first_json, ChatRequest, ModelClient};
use crate::observe::ClickableElement;
use crate::Result;

const RESOLVE_MAX_TOKENS: u32 = 200;

/// Index meaning "nothing matches".
pub const NO_MATCH: i64 = -1;

/// The resolver's verdict.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Index into the element list this call was given, or [`NO_MATCH`].
    pub index: i64,
    /// Free-text justification, advisory only.
    pub reason: Option<String>,
}

impl Resolution {
    /// Whether `index` addresses a real entry in a list of `len` elements.
    pub fn is_valid_for(&self, len: usize) -> bool {
        self.index >= 0 && (self.index as usize) < len
    }
}

const SYSTEM_PROMPT: &str = r#"You match a description of a UI element against a numbered list of interactive elements extracted from a live webpage.

Reply with EXACTLY ONE JSON object and nothing else:
{"index": <number>, "reason": "<short justification>"}

Pick the single best-matching element's index. If no element matches the description, use -1."#;

/// Serialize the element list the way the resolver prompt expects,
/// one `[index] <tag> text="..." href=...` line per element.
pub fn element_list(elements: &[ClickableElement]) -> String {
    let mut out = String::with_capacity(elements.len() * 48);
    for el in elements {
        out.push_str(&el.to_string());
        out.push('\n');
    }
    out
}

/// Resolve a semantic target against the current element list.
///
/// An empty list short-circuits to [`NO_MATCH`] without spending a model
/// call. A reply whose JSON carries no usable index also degrades to
/// [`NO_MATCH`]; only a reply with no JSON at all is a protocol error.
pub async fn resolve(
    client: &dyn ModelClient,
    model: &str,
    target: &str,
    elements: &[ClickableElement],
) -> Result<Resolution> {
    if elements.is_empty() {
        return Ok(Resolution {
            index: NO_MATCH,
            reason: Some("no interactive elements on page".into()),
        });
    }

    let request = ChatRequest {
        model: model.to_string(),
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "Element to find: {}\n\nElements:\n{}",
            target,
            element_list(elements)
        ),
        image_png_b64: None,
        max_tokens: RESOLVE_MAX_TOKENS,
    };

    let text = client.complete(request).await?;
    let raw = extract_first_json(&text)?;
    let resolution = from_reply(&raw);
    debug!(
        "resolved {:?} -> {} ({})",
        target,
        resolution.index,
        resolution.reason.as_deref().unwrap_or("no reason given")
    );
    Ok(resolution)
}

fn from_reply(raw: &Value) -> Resolution {
    Resolution {
        index: raw["index"].as_i64().unwrap_or(NO_MATCH),
        reason: raw["reason"].as_str().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::Rect;
    use serde_json::json;

    fn element(index: usize, tag: &str, text: &str, href: Option<&str>) -> ClickableElement {
        ClickableElement {
            index,
            tag: tag.into(),
            text: text.into(),
            href: href.map(str::to_string),
            rect: Rect { x: 0, y: 0, width: 100, height: 20 },
        }
    }

    #[test]
    fn element_list_one_line_per_element() {
        let elements = vec![
            element(0, "a", "Home", Some("/")),
            element(1, "button", "Search", None),
        ];
        assert_eq!(
            element_list(&elements),
            "[0] <a> text=\"Home\" href=/\n[1] <button> text=\"Search\"\n"
        );
    }

    #[test]
    fn reply_with_index_and_reason() {
        let r = from_reply(&json!({"index": 3, "reason": "exact text match"}));
        assert_eq!(r.index, 3);
        assert_eq!(r.reason.as_deref(), Some("exact text match"));
    }

    #[test]
    fn reply_without_usable_index_degrades_to_no_match() {
        assert_eq!(from_reply(&json!({"reason": "confused"})).index, NO_MATCH);
        assert_eq!(from_reply(&json!({"index": "two"})).index, NO_MATCH);
    }

    #[test]
    fn validity_bounds() {
        let hit = Resolution { index: 4, reason: None };
        assert!(hit.is_valid_for(5));
        assert!(!hit.is_valid_for(4));

        let miss = Resolution { index: NO_MATCH, reason: None };
        assert!(!miss.is_valid_for(5));
    }

    #[tokio::test]
    async fn empty_list_short_circuits_without_model_call() {
        struct Unreachable;

        #[async_trait::async_trait]
        impl ModelClient for Unreachable {
            async fn complete(&self, _request: ChatRequest) -> crate::Result<String> {
                panic!("resolver must not call the model for an empty element list");
            }
        }

        let r = resolve(&Unreachable, "gpt-4.1-mini", "the Releases link", &[])
            .await
            .unwrap();
        assert_eq!(r.index, NO_MATCH);
    }
}
