//! Node command-line interface.
//!
//! Most runtime inputs come from the environment (see [`crate::env`]); the
//! CLI only selects the configuration file and the subcommand.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};

use vladiator_core::Config;

pub const DEFAULT_CONFIG_FILE: &str = "networks.json";

#[derive(Parser, Clone, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug, Default)]
pub enum Commands {
    /// Write a sample configuration and a fresh overlay identity
    Init,
    /// Start the validator
    #[default]
    Start,
}

impl Args {
    pub fn new() -> Args {
        Args::parse()
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_file_path();

        let file = File::open(&path)
            .wrap_err_with(|| format!("failed to open config file {}", path.display()))?;

        serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))
    }
}
