use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use updelegate_common::{
    config::VERSION,
    prompt::{LogLevel, ModuleConfig},
};

// wallet agent endpoint by default when no specified
pub const DEFAULT_PROVIDER_ADDRESS: &str = "ws://127.0.0.1:8546";
// How often a pending delegation polls the wallet for its receipt
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);
// Capacity of provider event subscription channels
pub const EVENTS_CHANNEL_CAPACITY: usize = 64;

// Functions Helpers
fn default_provider_address() -> String {
    DEFAULT_PROVIDER_ADDRESS.to_owned()
}

fn default_log_filename() -> String {
    String::from("updelegate.log")
}

fn default_logs_path() -> String {
    String::from("logs/")
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Wallet provider endpoint to use
    #[clap(long, default_value_t = String::from(DEFAULT_PROVIDER_ADDRESS))]
    #[serde(default = "default_provider_address")]
    pub provider_address: String,
    /// Do not connect to the wallet provider at startup
    #[clap(long)]
    #[serde(default)]
    pub offline_mode: bool,
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct LogConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[clap(long, value_enum)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[clap(long)]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the log filename date based
    /// If disabled, the log file will be named updelegate.log instead of YYYY-MM-DD.updelegate.log
    #[clap(long)]
    #[serde(default)]
    pub disable_file_log_date_based: bool,
    /// Disable the usage of colors in log
    #[clap(long)]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Disable terminal interactive mode
    /// You will not be able to write CLI commands in it or to have an updated prompt
    #[clap(long)]
    #[serde(default)]
    pub disable_interactive_mode: bool,
    /// Log filename
    ///
    /// By default filename is updelegate.log.
    /// File will be stored in logs directory, this is only the filename, not the full path.
    /// Log file is rotated every day and has the format YYYY-MM-DD.updelegate.log.
    #[clap(long, default_value_t = default_log_filename())]
    #[serde(default = "default_log_filename")]
    pub filename_log: String,
    /// Logs directory
    ///
    /// By default it will be logs/ of the current directory.
    /// It must end with a / to be a valid folder.
    #[clap(long, default_value_t = default_logs_path())]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Module configuration for logs
    #[clap(long)]
    #[serde(default)]
    pub logs_modules: Vec<ModuleConfig>,
}

#[derive(Parser, Serialize, Deserialize, Clone)]
#[clap(
    version = VERSION,
    about = "UP Voting Delegation - delegate your voting rights to yourself, a steward or any address on Base"
)]
#[command(styles = updelegate_common::get_cli_styles())]
pub struct Config {
    /// Network Configuration
    #[clap(flatten)]
    pub network_handler: NetworkConfig,
    /// Log configuration
    #[clap(flatten)]
    pub log: LogConfig,
    /// JSON File to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub generate_config_template: bool,
    /// Execute a command and exit
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub exec: Option<String>,
}

impl Config {
    /// Check if we're in exec mode
    pub fn is_exec_mode(&self) -> bool {
        self.exec.is_some()
    }

    /// Get the command to execute (from --exec)
    pub fn get_exec_command(&self) -> Option<&String> {
        self.exec.as_ref()
    }
}
