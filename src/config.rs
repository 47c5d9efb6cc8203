use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

const SNAPSHOT_PATH: &str = "SNAPSHOT_PATH";
const APP_ID: &str = "APP_ID";

/// Runtime configuration for the binary, loaded from the environment.
#[derive(Clone)]
pub struct Config {
    /// Optional JSON snapshot to prime the in-memory store with.
    pub snapshot_path: Option<PathBuf>,
    pub app_id: String,
}

impl Config {
    pub fn from_env() -> Config {
        // Load .env file
        dotenv().ok();

        let snapshot_path = env::var(SNAPSHOT_PATH).ok().map(PathBuf::from);
        let app_id = env::var(APP_ID).unwrap_or_else(|_| "equity-matching".to_string());

        Config {
            snapshot_path,
            app_id,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            snapshot_path: None,
            app_id: "equity-matching".to_string(),
        }
    }
}
