//! CLI definitions for the `tierconf` inspector.
//!
//! Loads a configuration with the same options a program would use and
//! prints what it resolves to.

use crate::env::EnvKeyReplacer;
use crate::options::{self, ConfigOption};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect layered configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read exactly this config file instead of searching
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to search for the config file (repeatable, in order)
    #[arg(short = 'p', long = "path", global = true)]
    pub paths: Vec<PathBuf>,

    /// Config file name without extension
    #[arg(short, long, default_value = "config", global = true)]
    pub name: String,

    /// Format hint: yaml, json, toml, properties, env, ini
    #[arg(short = 't', long = "type", default_value = "yaml", global = true)]
    pub config_type: String,

    /// Resolve every key from the environment
    #[arg(short = 'e', long, global = true)]
    pub automatic_env: bool,

    /// Prefix for derived environment variable names
    #[arg(long, global = true)]
    pub env_prefix: Option<String>,

    /// Rewrite derived env names, as FROM=TO (repeatable)
    #[arg(long = "env-replace", value_parser = parse_replacement, global = true)]
    pub env_replace: Vec<(String, String)>,

    /// Log every key resolution
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the value of one key
    Get {
        key: String,

        /// Also print which layer supplied the value
        #[arg(long)]
        layer: bool,
    },

    /// List every known key
    Keys,

    /// Print all settings in a config format
    Dump {
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Write all settings to a file
    Write {
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Stream config file change events until interrupted
    Watch,
}

fn parse_replacement(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .ok_or_else(|| format!("expected FROM=TO, got \"{s}\""))
}

impl Cli {
    /// Store options described by the flags.
    pub fn options(&self) -> Vec<ConfigOption> {
        let mut opts = vec![
            options::with_config_name(self.name.clone()),
            options::with_config_type(&self.config_type),
            options::with_automatic_env(self.automatic_env),
            options::with_debug(self.debug),
        ];
        if !self.paths.is_empty() {
            opts.push(options::with_config_paths(self.paths.clone()));
        }
        if let Some(ref file) = self.config {
            opts.push(options::with_config_file(file));
        }
        if let Some(ref prefix) = self.env_prefix {
            opts.push(options::with_env_prefix(prefix.clone()));
        }
        if let Some(((from, to), rest)) = self.env_replace.split_first() {
            let replacer = rest
                .iter()
                .fold(EnvKeyReplacer::new(from.clone(), to.clone()), |r, (from, to)| {
                    r.and(from.clone(), to.clone())
                });
            opts.push(options::with_env_replacer(replacer));
        }
        if matches!(self.command, Command::Watch) {
            opts.push(options::with_watch_config(true));
        }
        opts
    }
}
