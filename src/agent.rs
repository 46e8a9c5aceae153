//! The decision/verification loop.
//!
//! Each step: screenshot → propose → dispatch → (for click) resolve →
//! execute → verify → record. History is the only memory carried between
//! steps and is serialized verbatim into the next proposal, failures
//! included — a failed step steers the planner away from repeating it.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::browser::PageDriver;
use crate::model::ModelClient;
use crate::propose::{self, Decision};
use crate::resolve;
use crate::verify::{self, Snapshot};
use crate::Result;

/// Default step budget before a run is abandoned.
pub const DEFAULT_MAX_STEPS: usize = 25;
/// Default chat model for both the proposer and the resolver.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Default result file, relative to the working directory.
pub const OUTPUT_FILE: &str = "result.json";

/// Terminal state of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// A `finish` decision arrived; its result matched the output file.
    Finished(Value),
    /// The step budget ran out first. No result was produced.
    Exhausted,
}

/// One remembered step. Serialized into every subsequent proposal prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    /// A decision that executed and, where verified, had effect.
    Executed(Value),
    /// A decision that didn't take; the planner reads the reason.
    Failed { failed_action: Value, reason: String },
    /// A reply the loop couldn't interpret as any known action.
    Error { error: String, decision: Value },
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Natural-language goal.
    pub goal: String,
    /// Schema the `finish` result must match; opaque to the loop.
    pub schema: Value,
    /// Vision model for action proposals.
    pub model: String,
    /// Text model for target resolution.
    pub resolver_model: String,
    /// Step budget.
    pub max_steps: usize,
    /// Where the `finish` result is written.
    pub output_path: PathBuf,
}

impl AgentConfig {
    pub fn new(goal: impl Into<String>, schema: Value) -> Self {
        Self {
            goal: goal.into(),
            schema,
            model: DEFAULT_MODEL.into(),
            resolver_model: DEFAULT_MODEL.into(),
            max_steps: DEFAULT_MAX_STEPS,
            output_path: OUTPUT_FILE.into(),
        }
    }
}

/// Drives one browser through one goal. Owns the browser for the lifetime
/// of the run and releases it on every exit path.
pub struct Agent<D: PageDriver, M: ModelClient> {
    driver: D,
    client: M,
    config: AgentConfig,
    history: Vec<HistoryEntry>,
}

impl<D: PageDriver, M: ModelClient> Agent<D, M> {
    pub fn new(driver: D, client: M, config: AgentConfig) -> Self {
        Self {
            driver,
            client,
            config,
            history: Vec::new(),
        }
    }

    /// Run to a terminal state. The browser is closed before this returns,
    /// whether the loop finished, exhausted its budget, or failed.
    pub async fn run(mut self) -> Result<RunOutcome> {
        let outcome = self.drive().await;
        let Agent { driver, .. } = self;
        if let Err(e) = driver.close().await {
            warn!("browser close failed: {}", e);
        }
        outcome
    }

    async fn drive(&mut self) -> Result<RunOutcome> {
        for step in 0..self.config.max_steps {
            let screenshot = self.driver.screenshot_b64().await?;
            let history_json = serde_json::to_string(&self.history)?;
            let (raw, decision) = propose::propose(
                &self.client,
                &self.config.model,
                &screenshot,
                &self.config.goal,
                &self.config.schema,
                &history_json,
            )
            .await?;
            info!("step {}/{}: {}", step + 1, self.config.max_steps, raw);

            let Some(decision) = decision else {
                warn!("unrecognized action in {}", raw);
                self.history.push(HistoryEntry::Error {
                    error: "unrecognized_action".into(),
                    decision: raw,
                });
                continue;
            };

            match decision {
                Decision::Type { text, .. } => {
                    // Text entry has no reliable before/after signal;
                    // recorded unconditionally.
                    self.driver.type_text(&text).await?;
                    self.history.push(HistoryEntry::Executed(raw));
                }
                Decision::Click { target, .. } => {
                    let elements = self.driver.observe().await?;
                    let resolution = resolve::resolve(
                        &self.client,
                        &self.config.resolver_model,
                        &target,
                        &elements,
                    )
                    .await?;
                    if !resolution.is_valid_for(elements.len()) {
                        warn!(
                            "no element for {:?} (index {}, {} candidates)",
                            target,
                            resolution.index,
                            elements.len()
                        );
                        self.history.push(HistoryEntry::Failed {
                            failed_action: raw,
                            reason: "resolve failed".into(),
                        });
                        continue;
                    }
                    let before = self.driver.snapshot().await?;
                    self.driver.click_index(resolution.index as usize).await?;
                    self.record_outcome(raw, before).await?;
                }
                Decision::Enter { .. } => {
                    let before = self.driver.snapshot().await?;
                    self.driver.press_enter().await?;
                    self.record_outcome(raw, before).await?;
                }
                Decision::Scroll { .. } => {
                    let before = self.driver.snapshot().await?;
                    self.driver.scroll_down().await?;
                    self.record_outcome(raw, before).await?;
                }
                Decision::ScrollUp { .. } => {
                    let before = self.driver.snapshot().await?;
                    self.driver.scroll_up().await?;
                    self.record_outcome(raw, before).await?;
                }
                Decision::ScrollTop { .. } => {
                    let before = self.driver.snapshot().await?;
                    self.driver.scroll_top().await?;
                    self.record_outcome(raw, before).await?;
                }
                Decision::Finish { result, .. } => {
                    self.persist(&result)?;
                    info!("finished in {} steps", step + 1);
                    return Ok(RunOutcome::Finished(result));
                }
            }
        }

        warn!(
            "step budget ({}) exhausted without a finish",
            self.config.max_steps
        );
        Ok(RunOutcome::Exhausted)
    }

    /// Compare against `before` and record the step as executed or failed.
    async fn record_outcome(&mut self, raw: Value, before: Snapshot) -> Result<()> {
        let after = self.driver.snapshot().await?;
        if verify::changed(&before, &after) {
            self.history.push(HistoryEntry::Executed(raw));
        } else {
            warn!("action caused no visible change — replanning");
            self.history.push(HistoryEntry::Failed {
                failed_action: raw,
                reason: "no visible change".into(),
            });
        }
        Ok(())
    }

    fn persist(&self, result: &Value) -> Result<()> {
        std::fs::write(
            &self.config.output_path,
            serde_json::to_string_pretty(result)?,
        )?;
        info!("result written to {}", self.config.output_path.display());
        Ok(())
    }
}
