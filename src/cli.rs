// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stockade")]
#[command(about = "Deploys a security-operations stack in dependency order on a single host")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output (CI-friendly)
    #[arg(long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON-lines output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a stockade.yml configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Provision shared resources and deploy the stack
    Deploy {
        /// Which slice of the catalog to deploy
        #[arg(long, value_enum, default_value_t = ModeArg::Full)]
        mode: ModeArg,

        /// Services to deploy in custom mode (dependencies are pulled in
        /// automatically)
        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,

        /// Skip pre-flight host checks
        #[arg(long)]
        skip_preflight: bool,

        /// Break a live session lock instead of failing
        #[arg(long)]
        force_lock: bool,

        /// Override the deploy root from configuration
        #[arg(long)]
        deploy_root: Option<PathBuf>,
    },

    /// Classify the current readiness of every catalog service
    Status,

    /// Stop and remove the stack's containers and network
    Teardown {
        /// Leave the isolated network in place
        #[arg(long)]
        keep_network: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// The whole catalog
    Full,
    /// The reduced incident-response subset
    Simple,
    /// An explicit service list (--services)
    Custom,
}
