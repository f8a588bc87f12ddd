use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Service settings, read from the environment (and `.env`) at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub json_limit: usize,
    pub model_size_limit: usize,
    pub upload_dir: PathBuf,
    pub cbc_path: PathBuf,
    pub scip_path: PathBuf,
    pub highs_log_file: PathBuf,
    pub kill_grace: Duration,
    pub run_cache_size: usize,
    pub sentry_dsn: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 9000,
            json_limit: 2 * 1024 * 1024, // 2 MB
            model_size_limit: 64 * 1024 * 1024,
            upload_dir: PathBuf::from("uploads"),
            cbc_path: PathBuf::from("cbc"),
            scip_path: PathBuf::from("scip"),
            highs_log_file: PathBuf::from("highs.log"),
            kill_grace: Duration::from_secs(30),
            run_cache_size: 16,
            sentry_dsn: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            port: parsed("PORT").unwrap_or(defaults.port),
            json_limit: parsed("JSON_PAYLOAD_LIMIT").unwrap_or(defaults.json_limit),
            model_size_limit: parsed("MODEL_SIZE_LIMIT").unwrap_or(defaults.model_size_limit),
            upload_dir: path("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            cbc_path: path("CBC_PATH").unwrap_or(defaults.cbc_path),
            scip_path: path("SCIP_PATH").unwrap_or(defaults.scip_path),
            highs_log_file: path("HIGHS_LOG_FILE").unwrap_or(defaults.highs_log_file),
            kill_grace: parsed("SOLVER_KILL_GRACE")
                .map(Duration::from_secs)
                .unwrap_or(defaults.kill_grace),
            run_cache_size: parsed("RUN_CACHE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.run_cache_size),
            sentry_dsn: env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty()),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}

fn path(key: &str) -> Option<PathBuf> {
    env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}
