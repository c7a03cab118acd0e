//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use verification_gate::config::{default_config_path, CheckerConfig, Settings};
use verification_gate::{FlyerConfig, SubGramConfig};

/// Verify bot users against channel, bot and sponsor-service tasks.
#[derive(Parser, Debug)]
#[command(name = "verification-gate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, global = true, env = "VERIFICATION_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level.
    #[arg(long, global = true, env = "RUST_LOG")]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, global = true, default_value = "text")]
    pub log_format: CliLogFormat,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify a single subject against the configured checker.
    Check {
        /// Subject identifier.
        #[arg(long)]
        user_id: i64,

        /// Originating chat (defaults to the subject's private chat).
        #[arg(long)]
        chat_id: Option<i64>,

        /// Subject language tag.
        #[arg(long)]
        language: Option<String>,

        /// Subject username.
        #[arg(long)]
        username: Option<String>,

        /// Block the subject if verification errors.
        #[arg(long)]
        fail_closed: bool,
    },

    /// Initialize the configured checker, probing its credential, and exit.
    Probe,

    /// Write a starter configuration file.
    InitConfig {
        /// Destination (defaults to the per-user config location).
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Sponsor service to configure.
        #[arg(long, value_enum, default_value = "subgram")]
        kind: CliCheckerKind,

        /// Service API key.
        #[arg(long, env = "VERIFICATION_GATE_KEY", default_value = "")]
        key: String,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Log format CLI enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Sponsor service CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliCheckerKind {
    /// SubGram.
    Subgram,
    /// Flyer.
    Flyer,
}

impl CliCheckerKind {
    /// Default checker configuration for this service.
    pub fn into_config(self, key: String) -> CheckerConfig {
        match self {
            Self::Subgram => CheckerConfig::SubGram(SubGramConfig::new(key)),
            Self::Flyer => CheckerConfig::Flyer(FlyerConfig::new(key)),
        }
    }
}

impl Cli {
    /// Resolve the configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }

    /// Load settings from the configuration file. Defaults are used when
    /// writing a new file, or when no file was given and none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a required config file cannot be loaded.
    pub fn settings(&self) -> color_eyre::Result<Settings> {
        let path = self.config_path();
        let writing = matches!(self.command, Command::InitConfig { .. });
        let mut settings = if writing || (self.config.is_none() && !path.exists()) {
            Settings::default()
        } else {
            Settings::from_file(&path)?
        };

        // Override with CLI arguments
        if let Some(log_level) = &self.log_level {
            settings.log_level.clone_from(log_level);
        }
        Ok(settings)
    }
}
