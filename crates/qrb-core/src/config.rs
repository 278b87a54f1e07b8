use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (with `.env` support).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Upload limits
    pub max_image_bytes: u64,

    // Telegram limits
    pub telegram_safe_limit: usize,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let max_image_bytes = env_u64("MAX_IMAGE_BYTES").unwrap_or(10 * 1024 * 1024);

        // Telegram hard limit is 4096; leave headroom for markup.
        let telegram_safe_limit = env_usize("TELEGRAM_SAFE_LIMIT").unwrap_or(4000);

        let rate_limit_enabled = env_bool("RATE_LIMIT_ENABLED").unwrap_or(true);
        let rate_limit_requests = env_u32("RATE_LIMIT_REQUESTS").unwrap_or(20);
        let rate_limit_window = Duration::from_secs(env_u64("RATE_LIMIT_WINDOW").unwrap_or(60));

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/qrb-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            max_image_bytes,
            telegram_safe_limit,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_window,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_strips_quotes_and_keeps_existing_env() {
        let path = PathBuf::from(format!("/tmp/qrb-dotenv-{}.env", std::process::id()));
        fs::write(
            &path,
            "# comment\nQRB_TEST_QUOTED=\"abc\"\nQRB_TEST_EXISTING=from_file\n",
        )
        .unwrap();

        env::set_var("QRB_TEST_EXISTING", "from_env");
        load_dotenv_if_present(&path);

        assert_eq!(env::var("QRB_TEST_QUOTED").unwrap(), "abc");
        assert_eq!(env::var("QRB_TEST_EXISTING").unwrap(), "from_env");

        let _ = fs::remove_file(&path);
    }
}
