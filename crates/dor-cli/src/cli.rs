use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dor", about = "Digital object repository", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository configuration file (TOML). Defaults apply when absent.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as a new object
    Store(StoreArgs),
    /// Write an object's payload to stdout or a file
    Get(GetArgs),
    /// Delete an object and its content-type record
    Delete(DeleteArgs),
    /// Store a Dublin Core record describing an object
    Describe(DescribeArgs),
    /// List the registered content types
    Types,
    /// Serve the repository over HTTP
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct StoreArgs {
    /// File to store; `-` reads stdin.
    pub file: PathBuf,
    /// Content-type token, e.g. BINARY or DUBLIN_CORE_METADATA.
    #[arg(short = 't', long, default_value = "BINARY")]
    pub content_type: String,
    /// Store at this identifier instead of generating one.
    #[arg(long)]
    pub id: Option<String>,
    #[arg(short, long, default_value = "")]
    pub message: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
    /// Write the payload here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub id: String,
    #[arg(short, long, default_value = "")]
    pub message: String,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Identifier of the described object; becomes the record's `identifier`.
    pub id: String,
    /// Element values as `element=value`, e.g. `title=Annual report`.
    /// Repeat for more values.
    #[arg(short, long = "element", value_name = "ELEMENT=VALUE")]
    pub elements: Vec<String>,
    #[arg(short, long, default_value = "")]
    pub message: String,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
