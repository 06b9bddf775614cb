use std::env;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected compact or json")),
        }
    }
}

/// Matching and pricing policy shared by the pairing, booking and quote paths.
#[derive(Debug, Clone)]
pub struct PairingSettings {
    pub max_radius_km: f64,
    pub candidate_limit: usize,
    pub schedule_lead_minutes: i64,
    pub apply_vat: bool,
    pub currency: String,
    pub quote_ttl_secs: i64,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            max_radius_km: 6.0,
            candidate_limit: 10,
            schedule_lead_minutes: 15,
            apply_vat: true,
            currency: "PHP".to_string(),
            quote_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub interval_secs: u64,
    pub window_minutes: i64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            window_minutes: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub api_token: Option<String>,
    pub pairing: PairingSettings,
    pub scheduler: SchedulerSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let pairing_defaults = PairingSettings::default();
        let scheduler_defaults = SchedulerSettings::default();

        let pairing = PairingSettings {
            max_radius_km: parse_or_default("MAX_MATCH_RADIUS_KM", pairing_defaults.max_radius_km)?,
            candidate_limit: parse_or_default(
                "DRIVER_CANDIDATE_LIMIT",
                pairing_defaults.candidate_limit,
            )?,
            schedule_lead_minutes: parse_or_default(
                "SCHEDULE_LEAD_MINUTES",
                pairing_defaults.schedule_lead_minutes,
            )?,
            apply_vat: parse_or_default("APPLY_VAT", pairing_defaults.apply_vat)?,
            currency: env::var("CURRENCY").unwrap_or(pairing_defaults.currency),
            quote_ttl_secs: parse_or_default("QUOTE_TTL_SECS", pairing_defaults.quote_ttl_secs)?,
        };

        if pairing.max_radius_km.is_nan() || pairing.max_radius_km <= 0.0 {
            return Err(AppError::Configuration(
                "MAX_MATCH_RADIUS_KM must be > 0".to_string(),
            ));
        }
        if pairing.candidate_limit == 0 {
            return Err(AppError::Configuration(
                "DRIVER_CANDIDATE_LIMIT must be > 0".to_string(),
            ));
        }

        let scheduler = SchedulerSettings {
            enabled: parse_or_default("SCHEDULER_ENABLED", scheduler_defaults.enabled)?,
            interval_secs: parse_or_default(
                "SCHEDULER_INTERVAL_SECS",
                scheduler_defaults.interval_secs,
            )?,
            window_minutes: parse_or_default(
                "SCHEDULER_WINDOW_MINUTES",
                scheduler_defaults.window_minutes,
            )?,
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_or_default("LOG_FORMAT", LogFormat::Compact)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            api_token: env::var("API_TOKEN").ok().filter(|token| !token.is_empty()),
            pairing,
            scheduler,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Configuration(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
