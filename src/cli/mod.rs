//! CLI module for the storefront gateway

pub mod serve;

use clap::{Parser, Subcommand};

/// Storefront Gateway - admission control and trust gating for the storefront API
#[derive(Parser)]
#[command(name = "storefront-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve,
}
