use std::path::PathBuf;

use clap::Parser;

/// Chat with a language model that can call the tools of a local MCP server.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tether", version, about)]
pub struct CliArgs {
    /// Path to the tool server script (.py or .js).
    pub server_script: PathBuf,

    /// Model identifier sent to the provider.
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum output tokens per model call.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Maximum model calls per query (0 = unbounded).
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Seconds to wait for a single tool call.
    #[arg(long, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Env file read at startup; a missing file is ignored.
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Log filter override (error, warn, info, debug, trace, or a full directive).
    #[arg(long)]
    pub log_level: Option<String>,
}
