use std::collections::HashMap;
use std::env::VarError;

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
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "CONDUCTDB_ENV"));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults are valid");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.api_keys.is_empty());
    assert_eq!(cfg.sweep_window_days, 14);
    assert_eq!(cfg.sweep_cron, "0 */15 * * * *");
    assert_eq!(cfg.recompute_top_n_brands, 500);
    assert_eq!(cfg.recompute_max_concurrent_brands, 4);
    assert!((cfg.corroboration_threshold - 0.80).abs() < f64::EPSILON);
    assert!((cfg.fallback_threshold - 0.60).abs() < f64::EPSILON);
    assert!((cfg.dedup_threshold - 0.75).abs() < f64::EPSILON);
    assert!((cfg.dealbreaker_cap - 25.0).abs() < f64::EPSILON);
    assert_eq!(cfg.dealbreaker_label, "dealbreaker");
    assert_eq!(cfg.rate_limit_capacity, 60);
}

#[test]
fn build_app_config_splits_api_keys() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_API_KEYS", " key-a, ,key-b ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_keys, vec!["key-a".to_string(), "key-b".to_string()]);
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONDUCTDB_BIND_ADDR"),
        "expected InvalidEnvVar(CONDUCTDB_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_threshold_above_one() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_CORROBORATION_THRESHOLD", "1.2");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONDUCTDB_CORROBORATION_THRESHOLD"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_fallback_above_corroboration() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_CORROBORATION_THRESHOLD", "0.7");
    map.insert("CONDUCTDB_FALLBACK_THRESHOLD", "0.75");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONDUCTDB_FALLBACK_THRESHOLD"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_sweep_window() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_SWEEP_WINDOW_DAYS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONDUCTDB_SWEEP_WINDOW_DAYS"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_window() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_SWEEP_WINDOW_DAYS", "two-weeks");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn build_app_config_rejects_nan_dealbreaker_cap() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_DEALBREAKER_CAP", "NaN");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CONDUCTDB_DEALBREAKER_CAP"),
        "got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_refill_rate() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_RATE_LIMIT_REFILL_PER_SEC", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
}

#[test]
fn build_app_config_clamps_concurrency_to_one() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_RECOMPUTE_MAX_CONCURRENT_BRANDS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.recompute_max_concurrent_brands, 1);
}

#[test]
fn app_config_debug_redacts_api_keys() {
    let mut map = HashMap::new();
    map.insert("CONDUCTDB_API_KEYS", "super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("1 redacted"));
}
