use crate::utils::{get_env, get_env_or};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_IMAGE_DIRECTORY: &str = "public/img";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_ORPHAN_SWEEP_CRON: &str = "0 0 * * * *";
const DEFAULT_ORPHAN_GRACE_MINUTES: u64 = 60;

pub struct Config {
    pub database_url: String,
    pub server_address: String,
    pub image_directory: PathBuf,
    pub max_upload_bytes: usize,
    pub orphan_sweep_cron: String,
    pub orphan_grace: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        _ = dotenv();
        Self {
            database_url: get_env("DATABASE_URL"),
            server_address: get_env("SERVER_ADDRESS"),
            image_directory: get_env_or("IMAGE_DIRECTORY", DEFAULT_IMAGE_DIRECTORY.into()),
            max_upload_bytes: get_env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            orphan_sweep_cron: get_env_or("ORPHAN_SWEEP_CRON", DEFAULT_ORPHAN_SWEEP_CRON.into()),
            orphan_grace: Duration::from_secs(
                60 * get_env_or("ORPHAN_GRACE_MINUTES", DEFAULT_ORPHAN_GRACE_MINUTES),
            ),
        }
    }
}
