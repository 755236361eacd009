//! Environment variable overrides for [`WorkerPoolOptions`].
//!
//! Values set programmatically before the call are replaced by any variable
//! present in the environment; unset variables leave the option unchanged.
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `SUBSCRIBE_ON_POOL_MIN_THREADS` | `usize` | `min_threads` |
//! | `SUBSCRIBE_ON_POOL_MAX_THREADS` | `usize` | `max_threads` |
//! | `SUBSCRIBE_ON_POOL_IDLE_TIMEOUT_MS` | `u64` | `idle_timeout` |
//! | `SUBSCRIBE_ON_POOL_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |

use std::time::Duration;

use super::WorkerPoolOptions;
use crate::error::{Error, Result};

/// Environment variable name for the pool's minimum thread count.
pub const ENV_POOL_MIN_THREADS: &str = "SUBSCRIBE_ON_POOL_MIN_THREADS";
/// Environment variable name for the pool's maximum thread count.
pub const ENV_POOL_MAX_THREADS: &str = "SUBSCRIBE_ON_POOL_MAX_THREADS";
/// Environment variable name for the idle timeout in milliseconds.
pub const ENV_POOL_IDLE_TIMEOUT_MS: &str = "SUBSCRIBE_ON_POOL_IDLE_TIMEOUT_MS";
/// Environment variable name for the worker thread name prefix.
pub const ENV_POOL_THREAD_NAME_PREFIX: &str = "SUBSCRIBE_ON_POOL_THREAD_NAME_PREFIX";

/// Apply environment variable overrides to `options`.
///
/// Returns a [`Config`](crate::error::ErrorKind::Config) error if a variable
/// is set but cannot be parsed.
pub fn apply_env_overrides(options: &mut WorkerPoolOptions) -> Result<()> {
    if let Some(val) = read_env(ENV_POOL_MIN_THREADS) {
        options.min_threads = parse_usize(ENV_POOL_MIN_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_POOL_MAX_THREADS) {
        options.max_threads = parse_usize(ENV_POOL_MAX_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_POOL_IDLE_TIMEOUT_MS) {
        options.idle_timeout = Duration::from_millis(parse_u64(ENV_POOL_IDLE_TIMEOUT_MS, &val)?);
    }
    if let Some(val) = read_env(ENV_POOL_THREAD_NAME_PREFIX) {
        options.thread_name_prefix = val;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize> {
    val.trim().parse::<usize>().map_err(|e| {
        Error::config(format!(
            "invalid value for {var_name}: expected unsigned integer, got {val:?} ({e})"
        ))
    })
}

fn parse_u64(var_name: &str, val: &str) -> Result<u64> {
    val.trim().parse::<u64>().map_err(|e| {
        Error::config(format!(
            "invalid value for {var_name}: expected u64, got {val:?} ({e})"
        ))
    })
}
