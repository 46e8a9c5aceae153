//! # wayfarer
//!
//! Vision-driven autonomous web browsing agent. A vision model looks at a
//! screenshot and proposes the next action as JSON; a text model resolves
//! semantic click targets ("the Releases link") to concrete element indices;
//! the browser executes; a before/after diff verifies the action did
//! something. The loop runs until a `finish` action delivers a JSON result
//! matching the caller's schema, or the step budget runs out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wayfarer::agent::{Agent, AgentConfig, RunOutcome};
//! use wayfarer::browser::BrowserSession;
//! use wayfarer::model::OpenAiClient;
//!
//! # #[tokio::main]
//! # async fn main() -> wayfarer::Result<()> {
//! let client = OpenAiClient::from_env()?;
//! let session = BrowserSession::launch("https://example.com", true).await?;
//! let config = AgentConfig::new(
//!     "find the latest release version",
//!     serde_json::json!({ "version": null }),
//! );
//!
//! match Agent::new(session, client, config).run().await? {
//!     RunOutcome::Finished(result) => println!("{result}"),
//!     RunOutcome::Exhausted => eprintln!("gave up"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod browser;
pub mod model;
pub mod observe;
pub mod propose;
pub mod resolve;
pub mod verify;

/// Result type for wayfarer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a run. Recoverable conditions (a target that
/// resolves to nothing, an action with no visible effect, an action word
/// the loop doesn't know) are not errors — they are recorded in the run
/// history so the planner can route around them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model's reply contained no parseable JSON object anywhere.
    #[error("no JSON object in model output: {0}")]
    Protocol(String),

    /// The model endpoint rejected the request or replied with garbage.
    #[error("model request failed: {0}")]
    Model(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// The caller-supplied output schema was not valid JSON.
    #[error("invalid output schema: {0}")]
    Schema(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
