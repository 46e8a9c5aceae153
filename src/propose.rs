//! Next-action planning — one vision call, one JSON decision.
//!
//! The system prompt pins the action vocabulary and embeds the caller's
//! output schema verbatim, so the `finish` result arrives already shaped.
//! Click targets are natural-language descriptions, never coordinates:
//! guessing pixels from a static image breaks as soon as the page scrolls
//! or re-renders, which is why resolution to a concrete element happens in
//! a separate text-only pass (see [`crate::resolve`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{extract_first_json, ChatRequest, ModelClient};
use crate::Result;

const PROPOSE_MAX_TOKENS: u32 = 400;

/// The single next action the vision model wants taken.
///
/// `reason` is advisory everywhere — logged, never acted on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Click the element best matching a natural-language description.
    Click {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Type into whatever control currently has focus.
    Type {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Enter {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Scroll {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ScrollUp {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ScrollTop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// The goal is met; `result` must match the caller's schema.
    Finish {
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Decision {
    /// Typed view of a raw decision object. `None` for an unrecognized
    /// `action` value or a recognized action missing required fields —
    /// both are planner defects the loop records and survives.
    pub fn parse(raw: &Value) -> Option<Decision> {
        serde_json::from_value(raw.clone()).ok()
    }
}

/// Build the system instruction with the caller's schema embedded.
fn system_prompt(schema: &Value) -> String {
    format!(
        r#"You are an autonomous web navigation agent.

You are given:
- A screenshot of the current webpage
- A user goal
- The history of previous actions, including ones that failed

Decide the SINGLE next action. You MUST respond with EXACTLY ONE valid
JSON object. No explanations, no markdown, no extra text.

Valid actions:

CLICK — describe the element in natural language. NEVER guess pixel
coordinates; name what you see, e.g. "the Releases link":
{{"action": "click", "target": "<element description>", "reason": "<short reason>"}}

TYPE — type into the currently focused input:
{{"action": "type", "text": "<text to type>", "reason": "<short reason>"}}

ENTER — press Enter in the focused control:
{{"action": "enter"}}

SCROLL — scroll down one screen:
{{"action": "scroll"}}

SCROLL_UP — scroll up one screen:
{{"action": "scroll_up"}}

SCROLL_TOP — jump back to the top of the page:
{{"action": "scroll_top"}}

FINISH — the goal is complete. "result" MUST conform to this JSON schema:
{schema}

{{"action": "finish", "result": {{ ... }}}}"#,
        schema = schema
    )
}

/// Ask the vision model for the next action.
///
/// Returns the raw decision object (recorded in history verbatim) together
/// with its typed parse. A reply with no JSON object at all is fatal; an
/// unknown action inside valid JSON is not.
pub async fn propose(
    client: &dyn ModelClient,
    model: &str,
    screenshot_png_b64: &str,
    goal: &str,
    schema: &Value,
    history_json: &str,
) -> Result<(Value, Option<Decision>)> {
    let request = ChatRequest {
        model: model.to_string(),
        system: system_prompt(schema),
        user: format!("Goal: {}\nPrevious actions: {}", goal, history_json),
        image_png_b64: Some(screenshot_png_b64.to_string()),
        max_tokens: PROPOSE_MAX_TOKENS,
    };

    let text = client.complete(request).await?;
    let raw = extract_first_json(&text)?;
    let decision = Decision::parse(&raw);
    Ok((raw, decision))
}
