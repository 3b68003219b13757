//! CLI module for chainer

pub mod serve;

use clap::{Parser, Subcommand};

/// chainer - named, redirectable handler chains served over HTTP
#[derive(Parser)]
#[command(name = "chainer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the demo pipeline over HTTP
    Serve(serve::ServeArgs),
}
