use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
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
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(invalid(var, "must be a finite number".to_string()))
        }
    };

    let parse_unit = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = parse_f64(var, default)?;
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(invalid(var, format!("{value} is outside [0, 1]")))
        }
    };

    let env = parse_environment(&or_default("CONDUCTDB_ENV", "development"))?;
    let bind_addr = parse_addr("CONDUCTDB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CONDUCTDB_LOG_LEVEL", "info");
    let reference_path = PathBuf::from(or_default(
        "CONDUCTDB_REFERENCE_PATH",
        "./config/reference.yaml",
    ));
    let api_keys = or_default("CONDUCTDB_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    let sweep_window_days = parse_u32("CONDUCTDB_SWEEP_WINDOW_DAYS", "14")?;
    if sweep_window_days == 0 {
        return Err(invalid(
            "CONDUCTDB_SWEEP_WINDOW_DAYS",
            "must be at least 1".to_string(),
        ));
    }
    let sweep_cron = or_default("CONDUCTDB_SWEEP_CRON", "0 */15 * * * *");
    let recompute_cron = or_default("CONDUCTDB_RECOMPUTE_CRON", "0 5 * * * *");
    let recompute_top_n_brands = parse_usize("CONDUCTDB_RECOMPUTE_TOP_N_BRANDS", "500")?;
    let recompute_max_concurrent_brands =
        parse_usize("CONDUCTDB_RECOMPUTE_MAX_CONCURRENT_BRANDS", "4")?.max(1);

    let corroboration_threshold = parse_unit("CONDUCTDB_CORROBORATION_THRESHOLD", "0.80")?;
    let fallback_threshold = parse_unit("CONDUCTDB_FALLBACK_THRESHOLD", "0.60")?;
    if fallback_threshold > corroboration_threshold {
        return Err(invalid(
            "CONDUCTDB_FALLBACK_THRESHOLD",
            format!(
                "{fallback_threshold} exceeds the corroboration threshold {corroboration_threshold}"
            ),
        ));
    }
    let dedup_threshold = parse_unit("CONDUCTDB_DEDUP_THRESHOLD", "0.75")?;

    let dealbreaker_cap = parse_f64("CONDUCTDB_DEALBREAKER_CAP", "25")?;
    if !(0.0..=100.0).contains(&dealbreaker_cap) {
        return Err(invalid(
            "CONDUCTDB_DEALBREAKER_CAP",
            format!("{dealbreaker_cap} is outside [0, 100]"),
        ));
    }
    let dealbreaker_label = or_default("CONDUCTDB_DEALBREAKER_LABEL", "dealbreaker");

    let rate_limit_capacity = parse_u32("CONDUCTDB_RATE_LIMIT_CAPACITY", "60")?;
    let rate_limit_refill_per_sec = parse_f64("CONDUCTDB_RATE_LIMIT_REFILL_PER_SEC", "1.0")?;
    if rate_limit_refill_per_sec <= 0.0 {
        return Err(invalid(
            "CONDUCTDB_RATE_LIMIT_REFILL_PER_SEC",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        reference_path,
        api_keys,
        sweep_window_days,
        sweep_cron,
        recompute_cron,
        recompute_top_n_brands,
        recompute_max_concurrent_brands,
        corroboration_threshold,
        fallback_threshold,
        dedup_threshold,
        dealbreaker_cap,
        dealbreaker_label,
        rate_limit_capacity,
        rate_limit_refill_per_sec,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CONDUCTDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
