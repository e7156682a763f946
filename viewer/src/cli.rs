use std::path::PathBuf;

use clap::Parser;
use lifefeed::prelude::*;

#[derive(Debug, Parser, Clone)]
#[command(name = "lifefeed-viewer")]
#[command(about = "Terminal viewer for a Game of Life server feed")]
pub struct Cli {
    /// YAML config file. Environment variables and flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address of the world endpoint.
    #[arg(long)]
    pub url: Option<String>,

    /// Response format: html or json.
    #[arg(long)]
    pub format: Option<FeedFormat>,

    #[arg(long)]
    pub period_ms: Option<u64>,

    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Start the feed right away instead of waiting for Enter.
    #[arg(long)]
    pub auto_update: bool,

    /// Continue after this generation on the first start.
    #[arg(long)]
    pub resume_after: Option<u64>,

    /// Pick up the mode and generation of the last saved session.
    #[arg(long)]
    pub resume: bool,

    /// Append frames instead of redrawing the screen.
    #[arg(long)]
    pub no_clear: bool,
}

impl Cli {
    /// File, then environment, then flags.
    pub fn load_config(&self) -> Result<FeedConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::load(path)?,
            None => FeedConfig::default(),
        };

        config.apply_env_overrides()?;
        self.apply_to(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn apply_to(&self, config: &mut FeedConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(period_ms) = self.period_ms {
            config.period_ms = period_ms;
        }
        if let Some(queue_capacity) = self.queue_capacity {
            config.queue_capacity = queue_capacity;
        }
        if self.auto_update {
            config.auto_update = true;
        }
        if self.resume_after.is_some() {
            config.resume_after = self.resume_after;
        }
    }
}

/// Maps one line of keyboard input to a command. Unknown input is ignored.
pub fn parse_command(line: &str) -> Option<FeedCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(FeedCommand::Toggle),
        "q" | "quit" | "exit" => Some(FeedCommand::Quit),
        "start" => Some(FeedCommand::Start),
        "stop" => Some(FeedCommand::Stop),
        _ => None,
    }
}
