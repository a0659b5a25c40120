//! Replay a recorded agent trace (JSONL) through the response transform.

mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use genai_agent_stream::{Pricing, TracingSink, TransformConfig};

use crate::replay::{ReplayOptions, read_trace, render_transcript, replay};

#[derive(Debug, Parser)]
#[command(
    name = "genai-trace-replay",
    about = "Replay an agent trace and print the resulting chat stream"
)]
struct Cli {
    /// Trace file with one trace event JSON object per line.
    trace: PathBuf,
    /// Session id for the response (defaults to a random UUID).
    #[arg(long)]
    session_id: Option<String>,
    /// User prompt shown before the response in transcript mode.
    #[arg(long)]
    prompt: Option<String>,
    /// Print the folded transcript instead of one chat event per line.
    #[arg(long)]
    transcript: bool,
    /// Input token price in USD per 1000 tokens.
    #[arg(long)]
    input_price: Option<f64>,
    /// Output token price in USD per 1000 tokens.
    #[arg(long)]
    output_price: Option<f64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    genai_core::config::load_dotenv();
    genai_core::init_observability();
    let cli = Cli::parse();

    let config = TransformConfig::from_env();
    let pricing = Pricing {
        input_per_1k: cli.input_price.unwrap_or(config.pricing.input_per_1k),
        output_per_1k: cli.output_price.unwrap_or(config.pricing.output_per_1k),
    };
    let options = ReplayOptions {
        session_id: cli
            .session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        pricing,
        stream_buffer_capacity: config.stream_buffer_capacity,
        prompt: cli.prompt,
    };

    let trace = read_trace(&cli.trace)?;
    tracing::info!(path = %cli.trace.display(), records = trace.len(), "replaying trace");
    let outcome = replay(trace, options, Arc::new(TracingSink)).await?;

    if cli.transcript {
        print!("{}", render_transcript(&outcome.transcript));
    } else {
        for event in &outcome.events {
            println!("{}", serde_json::to_string(event)?);
        }
    }

    outcome.result?;
    Ok(())
}
