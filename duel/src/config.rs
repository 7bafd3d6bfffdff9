//! Configuration for the chessduel runtime.
//!
//! Every tunable has a compile-time default and can be overridden via a
//! dedicated environment variable. Command-line flags override both.

use std::path::PathBuf;

use crate::session::commands::{DEFAULT_TIME_BUDGET_SECS, MAX_SKILL_LEVEL};

/// Default time allowed for a handshake with a freshly started engine (in seconds).
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Default directory for the rolling log files.
const DEFAULT_LOG_DIR: &str = "logs";

const DEFAULT_DATA_DIR: &str = ".config/chessduel/games";
const DEV_DATA_DIR: &str = "./games";

/// Get the engine binary path, if one is configured.
///
/// `CHESSDUEL_ENGINE_PATH` if set; otherwise the usual install locations are
/// searched when the engine starts.
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("CHESSDUEL_ENGINE_PATH").ok().map(PathBuf::from)
}

/// Get the default per-move time budget in seconds.
///
/// Priority:
/// 1. `CHESSDUEL_TIME_BUDGET_SECS` env variable if set (falls back to default
///    if the value cannot be parsed as an `f64`)
/// 2. `2.0` seconds as fallback
pub fn get_time_budget_secs() -> f64 {
    if let Ok(secs) = std::env::var("CHESSDUEL_TIME_BUDGET_SECS") {
        return secs.parse().unwrap_or(DEFAULT_TIME_BUDGET_SECS);
    }

    DEFAULT_TIME_BUDGET_SECS
}

/// Get the default skill level (`CHESSDUEL_SKILL_LEVEL`, else full strength).
pub fn get_skill_level() -> u8 {
    if let Ok(level) = std::env::var("CHESSDUEL_SKILL_LEVEL") {
        return level.parse().unwrap_or(MAX_SKILL_LEVEL);
    }

    MAX_SKILL_LEVEL
}

/// Get the engine handshake timeout in seconds.
///
/// Priority:
/// 1. `CHESSDUEL_HANDSHAKE_TIMEOUT_SECS` env variable if set (falls back to
///    default if the value cannot be parsed as a `u64`)
/// 2. `10` seconds as fallback
pub fn get_handshake_timeout_secs() -> u64 {
    if let Ok(timeout) = std::env::var("CHESSDUEL_HANDSHAKE_TIMEOUT_SECS") {
        return timeout.parse().unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
    }

    DEFAULT_HANDSHAKE_TIMEOUT_SECS
}

pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSDUEL_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

/// Get the directory saved games are resolved against.
///
/// Priority:
/// 1. `CHESSDUEL_DATA_DIR` env variable if set
/// 2. `$HOME/.config/chessduel/games` if HOME is set
/// 3. `./games` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSDUEL_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_DATA_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: these assume the CHESSDUEL_* variables are not set in the test
    // environment. Setting them from tests would race with other tests.

    #[test]
    fn test_time_budget_default() {
        if std::env::var("CHESSDUEL_TIME_BUDGET_SECS").is_err() {
            assert_eq!(get_time_budget_secs(), 2.0);
        }
    }

    #[test]
    fn test_skill_level_default() {
        if std::env::var("CHESSDUEL_SKILL_LEVEL").is_err() {
            assert_eq!(get_skill_level(), 20);
        }
    }

    #[test]
    fn test_handshake_timeout_default() {
        if std::env::var("CHESSDUEL_HANDSHAKE_TIMEOUT_SECS").is_err() {
            assert_eq!(get_handshake_timeout_secs(), 10);
        }
    }

    #[test]
    fn test_get_data_dir_is_not_empty() {
        let dir = get_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
