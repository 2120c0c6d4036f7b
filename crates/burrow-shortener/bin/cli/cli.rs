use burrow_shortener::settings::{DEFAULT_ALLOCATION_ATTEMPTS, DEFAULT_CLICK_ATTEMPTS};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "BURROW_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "BURROW_REDIS_URL";
pub const REDIS_KEY_PREFIX_ENV: &str = "BURROW_REDIS_KEY_PREFIX";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";
pub const ALLOCATION_ATTEMPTS_ENV: &str = "BURROW_ALLOCATION_ATTEMPTS";
pub const CLICK_ATTEMPTS_ENV: &str = "BURROW_CLICK_ATTEMPTS";

pub const DEFAULT_REDIS_KEY_PREFIX: &str = "burrow:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "burrow", about = "Shorten links and count their clicks")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = REDIS_KEY_PREFIX_ENV, default_value = DEFAULT_REDIS_KEY_PREFIX)]
    pub redis_key_prefix: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[arg(long, env = ALLOCATION_ATTEMPTS_ENV, default_value_t = DEFAULT_ALLOCATION_ATTEMPTS)]
    pub allocation_attempts: u32,

    #[arg(long, env = CLICK_ATTEMPTS_ENV, default_value_t = DEFAULT_CLICK_ATTEMPTS)]
    pub click_attempts: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a short link
    Shorten {
        url: String,
        #[arg(long)]
        owner: String,
    },
    /// Print the link behind a short code
    Resolve { code: String },
    /// List links, optionally only those of one owner
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Record a click on a short code
    Click {
        code: String,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    /// List the click events of a short code
    Clicks { code: String },
    /// Print updates of a link as they happen
    Watch {
        code: String,
        /// Stop after this many updates
        #[arg(long)]
        count: Option<usize>,
    },
}
