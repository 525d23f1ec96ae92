use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_test() {
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "SALEWATCH_ENV"));
}

#[test]
fn build_app_config_uses_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:4000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.catalog_path, PathBuf::from("./config/catalog.yaml"));
    assert_eq!(cfg.cache_dir, PathBuf::from("./data"));
    assert_eq!(cfg.refresh_cron, "0 0 * * * *");
    assert_eq!(cfg.rate_limit_max_requests, 20);
    assert_eq!(cfg.rate_limit_window_secs, 60);
    assert_eq!(cfg.scraper_request_timeout_secs, 30);
    assert_eq!(cfg.scraper_user_agent, "salewatch/0.1 (catalog-monitor)");
    assert_eq!(cfg.scraper_max_concurrent_fetches, 16);
    assert_eq!(cfg.scraper_max_retries, 2);
    assert_eq!(cfg.scraper_retry_backoff_base_secs, 2);
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("SALEWATCH_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALEWATCH_BIND_ADDR"),
        "expected InvalidEnvVar(SALEWATCH_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("SALEWATCH_ENV", "production");
    map.insert("SALEWATCH_CACHE_DIR", "/var/lib/salewatch");
    map.insert("SALEWATCH_REFRESH_CRON", "0 */30 * * * *");
    map.insert("SALEWATCH_SCRAPER_MAX_CONCURRENT_FETCHES", "4");
    map.insert("SALEWATCH_SCRAPER_MAX_RETRIES", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.cache_dir, PathBuf::from("/var/lib/salewatch"));
    assert_eq!(cfg.refresh_cron, "0 */30 * * * *");
    assert_eq!(cfg.scraper_max_concurrent_fetches, 4);
    assert_eq!(cfg.scraper_max_retries, 0);
}

#[test]
fn build_app_config_rejects_zero_fan_out() {
    let mut map = HashMap::new();
    map.insert("SALEWATCH_SCRAPER_MAX_CONCURRENT_FETCHES", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALEWATCH_SCRAPER_MAX_CONCURRENT_FETCHES"),
        "expected InvalidEnvVar(SALEWATCH_SCRAPER_MAX_CONCURRENT_FETCHES), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_rate_limit() {
    let mut map = HashMap::new();
    map.insert("SALEWATCH_RATE_LIMIT_WINDOW_SECS", "a-minute");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALEWATCH_RATE_LIMIT_WINDOW_SECS"),
        "expected InvalidEnvVar(SALEWATCH_RATE_LIMIT_WINDOW_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_five_field_cron() {
    let mut map = HashMap::new();
    map.insert("SALEWATCH_REFRESH_CRON", "0 * * * *");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALEWATCH_REFRESH_CRON"),
        "expected InvalidEnvVar(SALEWATCH_REFRESH_CRON), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_rate_limit_window() {
    let mut map = HashMap::new();
    map.insert("SALEWATCH_RATE_LIMIT_WINDOW_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "SALEWATCH_RATE_LIMIT_WINDOW_SECS"),
        "expected InvalidEnvVar(SALEWATCH_RATE_LIMIT_WINDOW_SECS), got: {result:?}"
    );
}
