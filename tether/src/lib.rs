//! Interactive MCP client that bridges a stdio tool server to Anthropic models.
//!
//! This crate is the binary's library half: configuration resolution, provider
//! construction, the prompt loop, and ordered shutdown. The protocol and query
//! machinery live in the re-exported member crates.
//!
//! ```rust,no_run
//! use tether::{CliArgs, ClientConfig, InteractiveDriver, run_client};
//! use tokio::io::BufReader;
//!
//! # async fn run(cli: CliArgs) -> Result<(), tether::ClientError> {
//! let file = tether::load_env_file(&cli.env_file)?;
//! let process = tether::process_env();
//! let config = ClientConfig::resolve(&cli, &file, &process)?;
//!
//! let mut driver = InteractiveDriver::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
//! let exit = run_client(config, &mut driver).await?;
//! std::process::exit(i32::from(exit.exit_code()));
//! # }
//! ```

mod cli;
mod client;
mod config;
mod driver;
mod env_file;
mod error;
mod lifecycle;
mod logging;
mod providers;

pub mod prelude;

pub use tchat;
pub use tcommon;
pub use tobserve;
pub use tprovider;
pub use tsession;

pub use cli::CliArgs;
pub use client::run_client;
pub use config::{
    ClientConfig, ENV_API_KEY, ENV_BASE_URL, ENV_HANDSHAKE_TIMEOUT, ENV_MAX_TOKENS, ENV_MAX_TURNS,
    ENV_MODEL, ENV_NODE, ENV_PYTHON, ENV_TOOL_TIMEOUT,
};
pub use driver::{DriverExit, InteractiveDriver};
pub use env_file::{EnvMap, load_env_file, parse_env_file, process_env};
pub use error::{ClientError, ClientErrorKind};
pub use lifecycle::{ReleaseReport, ResourceStack};
pub use logging::{init_tracing, log_filter};
pub use providers::{ProviderBuildConfig, build_anthropic_provider};
