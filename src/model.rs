//! Hosted-model client — one chat call in, free-form text out.
//!
//! The agent talks to the model through the [`ModelClient`] trait so the
//! proposer, resolver and loop can all run against scripted doubles in
//! tests. The production implementation speaks the OpenAI-compatible
//! chat-completions protocol; images travel as base64 data URLs.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::{Error, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// One model invocation.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier, e.g. `gpt-4.1-mini`.
    pub model: String,
    /// System instruction.
    pub system: String,
    /// User turn text.
    pub user: String,
    /// Optional PNG screenshot, base64-encoded, attached to the user turn.
    pub image_png_b64: Option<String>,
    /// Token budget for the reply.
    pub max_tokens: u32,
}

/// A request/response model endpoint. Implementations must be constructed
/// explicitly and passed in; there is no process-wide client.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one request and return the raw reply text.
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            api_base: api_base.into(),
        }
    }

    /// Build a client from `OPENAI_API_KEY` and optional `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Model("OPENAI_API_KEY not set in environment".into()))?;
        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self::new(api_key, api_base))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let user_content = match request.image_png_b64 {
            Some(ref b64) => json!([
                { "type": "text", "text": request.user },
                { "type": "image_url",
                  "image_url": { "url": format!("data:image/png;base64,{}", b64) } },
            ]),
            None => json!(request.user),
        };

        let body = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": user_content },
            ],
            "max_tokens": request.max_tokens,
            "temperature": 0.2,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let reply: Value = response.json().await?;

        if !status.is_success() {
            let message = reply["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error");
            return Err(Error::Model(format!("{}: {}", status, message)));
        }

        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| Error::Model(format!("no content in model reply: {}", reply)))?;

        debug!("model reply: {}", content);
        Ok(content.to_string())
    }
}

/// Extract the first syntactically valid top-level JSON object from text.
///
/// Models are told to emit exactly one JSON object and nothing else; they
/// still wrap it in prose or fences often enough that we scan for every
/// `{` and attempt a strict decode at each, returning the first success.
pub fn extract_first_json(text: &str) -> Result<Value> {
    for (pos, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if value.is_object() {
                return Ok(value);
            }
        }
    }
    Err(Error::Protocol(text.trim().chars().take(200).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_surrounded_by_noise() {
        let value = extract_first_json(r#"noise {"a":1} trailing"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn extracts_bare_object() {
        let value = extract_first_json(r#"{"action":"scroll"}"#).unwrap();
        assert_eq!(value["action"], "scroll");
    }

    #[test]
    fn extracts_from_markdown_fence() {
        let text = "```json\n{\"action\": \"enter\"}\n```";
        let value = extract_first_json(text).unwrap();
        assert_eq!(value["action"], "enter");
    }

    #[test]
    fn skips_invalid_brace_then_finds_object() {
        let value = extract_first_json(r#"weights {1,2} then {"ok":true}"#).unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn takes_first_of_several_objects() {
        let value = extract_first_json(r#"{"first":1} {"second":2}"#).unwrap();
        assert_eq!(value, json!({"first": 1}));
    }

    #[test]
    fn nested_objects_come_back_whole() {
        let value = extract_first_json(r#"{"outer":{"inner":[1,2]}}"#).unwrap();
        assert_eq!(value["outer"]["inner"][1], 2);
    }

    #[test]
    fn no_brace_is_a_protocol_error() {
        let err = extract_first_json("the model had opinions instead").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn unclosed_brace_is_a_protocol_error() {
        let err = extract_first_json(r#"{"a": 1"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
