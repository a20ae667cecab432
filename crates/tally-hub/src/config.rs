use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_DB_PATH: &str = ".tally/traffic.sqlite3";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite(PathBuf),
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub store: StoreBackend,
    pub debug: bool,
    pub log_dir: String,
}

#[derive(Parser, Debug)]
#[command(name = "tally-hub", about = "Page-view ingestion and traffic summary service")]
pub struct Args {
    #[arg(long, default_value = "")]
    pub addr: String,
    #[arg(long, default_value = "")]
    pub db: String,
    #[arg(long, default_value_t = false)]
    pub memory: bool,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    #[arg(long, default_value = "")]
    pub log_dir: String,
}

impl Config {
    pub fn load() -> Self {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Self {
        let store = if args.memory || env_true("TALLY_MEMORY") {
            StoreBackend::Memory
        } else {
            StoreBackend::Sqlite(PathBuf::from(resolve_flag_or_env(
                &args.db,
                "TALLY_DB",
                DEFAULT_DB_PATH,
            )))
        };
        Config {
            addr: resolve_flag_or_env(&args.addr, "TALLY_ADDR", DEFAULT_ADDR),
            store,
            debug: args.debug || env_true("TALLY_DEBUG"),
            log_dir: resolve_flag_or_env(&args.log_dir, "TALLY_LOG_DIR", ""),
        }
    }
}

pub fn env_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => is_truthy(&value),
        Err(_) => false,
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn resolve_flag_or_env(flag: &str, env_key: &str, default: &str) -> String {
    if !flag.trim().is_empty() {
        return flag.to_string();
    }
    if let Ok(value) = std::env::var(env_key) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    default.to_string()
}
