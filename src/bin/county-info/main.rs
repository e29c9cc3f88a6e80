use anyhow::{Context, Result};
use censusmap::{
  config::Config,
  info::{GeminiProvider, RetryPolicy, fetch_region_info},
};
use clap::Parser as CliParser;

/// Prints what the dashboard would show for a county.
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Name of the county, e.g. "Taita Taveta".
  county: String,

  /// Retries after the first failed request.
  #[arg(short, long)]
  retries: Option<u32>,

  /// Gemini model to ask.
  #[arg(short, long)]
  model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  env_logger::init();

  let mut config = Config::new();
  config.gemini.model = args.model.or(config.gemini.model);
  let mut policy = RetryPolicy::from(&config.timings);
  if let Some(retries) = args.retries {
    policy.max_retries = retries;
  }

  let provider = GeminiProvider::new(&config.gemini);
  let info = fetch_region_info(&provider, &args.county, policy)
    .await
    .with_context(|| format!("no information about {}", args.county))?;
  println!("{}", serde_json::to_string_pretty(&info)?);
  Ok(())
}
