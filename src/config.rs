use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const CACHE_DIR: &str = "ipl_matches";
const DB_FILE: &str = "ipl_matches.sqlite";
const DEFAULT_DATA_DIR: &str = "match_info";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path().unwrap_or_else(|| PathBuf::from(DB_FILE)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            enable_cors: true,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `IPL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| nonempty(lookup(key));
        let mut cfg = Self::default();
        if let Some(path) = var("IPL_DB_PATH") {
            cfg.db_path = PathBuf::from(path);
        }
        if let Some(dir) = var("IPL_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = var("IPL_HOST") {
            cfg.host = host;
        }
        if let Some(port) = var("IPL_PORT") {
            cfg.port = port
                .parse::<u16>()
                .with_context(|| format!("invalid IPL_PORT value {port:?}"))?;
        }
        if let Some(raw) = var("IPL_CORS") {
            cfg.enable_cors = parse_flag(&raw);
        }
        Ok(cfg)
    }

    /// Applies `--db`, `--dir`, `--host` and `--port` flags.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(path) = arg_value(args, "--db") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(dir) = arg_value(args, "--dir") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = arg_value(args, "--host") {
            self.host = host;
        }
        if let Some(port) = arg_value(args, "--port") {
            self.port = port
                .parse::<u16>()
                .with_context(|| format!("invalid --port value {port:?}"))?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Some(base) = env_nonempty("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
    }
    let home = env_nonempty("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(DB_FILE))
}

fn env_nonempty(key: &str) -> Option<String> {
    nonempty(std::env::var(key).ok())
}

fn nonempty(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}

/// Finds `--name value` or `--name=value`.
fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
