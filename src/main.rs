use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use wayfarer::agent::{self, Agent, AgentConfig, RunOutcome};
use wayfarer::browser::BrowserSession;
use wayfarer::model::OpenAiClient;
use wayfarer::Error;

#[derive(Parser)]
#[command(name = "wayfarer")]
#[command(about = "Vision-driven autonomous web browsing agent")]
#[command(version)]
struct Cli {
    /// Address to start from
    url: String,

    /// Natural-language goal
    goal: String,

    /// JSON schema the finish result must match (inline JSON text)
    #[arg(long)]
    schema: String,

    /// Vision model for action proposals
    #[arg(long, default_value = agent::DEFAULT_MODEL)]
    model: String,

    /// Text model for target resolution (defaults to --model)
    #[arg(long)]
    resolver_model: Option<String>,

    /// Step budget before the run is abandoned
    #[arg(long, default_value_t = agent::DEFAULT_MAX_STEPS)]
    max_steps: usize,

    /// Where to write the finish result
    #[arg(long, default_value = agent::OUTPUT_FILE)]
    output: PathBuf,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> wayfarer::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // Fail fast on a bad schema, before any browser or network resource.
    let schema: Value = serde_json::from_str(&cli.schema)
        .map_err(|e| Error::Schema(format!("--schema is not valid JSON: {}", e)))?;

    let client = OpenAiClient::from_env()?;

    println!("Goal: {}", cli.goal);
    println!("Start: {}", cli.url);

    let session = BrowserSession::launch(&cli.url, cli.headless).await?;

    let mut config = AgentConfig::new(cli.goal, schema);
    config.resolver_model = cli.resolver_model.unwrap_or_else(|| cli.model.clone());
    config.model = cli.model;
    config.max_steps = cli.max_steps;
    config.output_path = cli.output.clone();

    match Agent::new(session, client, config).run().await? {
        RunOutcome::Finished(result) => {
            println!();
            println!("✓ Finished");
            println!("{}", serde_json::to_string_pretty(&result)?);
            println!("  Written to: {}", cli.output.display());
        }
        RunOutcome::Exhausted => {
            println!();
            println!("✗ Step budget exhausted without finishing");
            std::process::exit(1);
        }
    }

    Ok(())
}
