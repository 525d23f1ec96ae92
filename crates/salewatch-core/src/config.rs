use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("SALEWATCH_ENV", "development"))?;

    let bind_addr = parse_addr("SALEWATCH_BIND_ADDR", "0.0.0.0:4000")?;
    let log_level = or_default("SALEWATCH_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default("SALEWATCH_CATALOG_PATH", "./config/catalog.yaml"));
    let cache_dir = PathBuf::from(or_default("SALEWATCH_CACHE_DIR", "./data"));

    let refresh_cron = or_default("SALEWATCH_REFRESH_CRON", "0 0 * * * *");
    if refresh_cron.split_whitespace().count() < 6 {
        return Err(invalid(
            "SALEWATCH_REFRESH_CRON",
            format!("expected a six-field cron expression, got \"{refresh_cron}\""),
        ));
    }

    let rate_limit_max_requests = parse_positive_usize("SALEWATCH_RATE_LIMIT_MAX_REQUESTS", "20")?;
    let rate_limit_window_secs = parse_u64("SALEWATCH_RATE_LIMIT_WINDOW_SECS", "60")?;
    if rate_limit_window_secs == 0 {
        return Err(invalid(
            "SALEWATCH_RATE_LIMIT_WINDOW_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let scraper_request_timeout_secs = parse_u64("SALEWATCH_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default(
        "SALEWATCH_SCRAPER_USER_AGENT",
        "salewatch/0.1 (catalog-monitor)",
    );
    let scraper_max_concurrent_fetches =
        parse_positive_usize("SALEWATCH_SCRAPER_MAX_CONCURRENT_FETCHES", "16")?;
    let scraper_max_retries = parse_u32("SALEWATCH_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("SALEWATCH_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        catalog_path,
        cache_dir,
        refresh_cron,
        rate_limit_max_requests,
        rate_limit_window_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_concurrent_fetches,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SALEWATCH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
