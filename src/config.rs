use crate::domain::Decimal;
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_QUOTE_API_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: StoreBackend,
    pub quote_api_url: String,
    pub quote_timeout_ms: u64,
    pub holding_period_policy: HoldingPeriodPolicy,
    pub zero_notional_fee: ZeroNotionalFee,
    pub default_discount_rate: Decimal,
}

/// Where the lot sheet lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite { database_path: String },
    Csv { path: String },
}

/// How same-day (or anomalous negative) holding periods are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldingPeriodPolicy {
    /// Anything below one day counts as one day.
    #[default]
    ClampToOneDay,
    /// Report the raw day difference, possibly zero or negative.
    Raw,
}

/// Whether the minimum commission applies to a leg with zero notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroNotionalFee {
    #[default]
    Floor,
    Waive,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let backend = match env_map
            .get("LEDGER_BACKEND")
            .map(|s| s.as_str())
            .unwrap_or("sqlite")
        {
            "sqlite" => StoreBackend::Sqlite {
                database_path: env_map
                    .get("DATABASE_PATH")
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?,
            },
            "csv" => StoreBackend::Csv {
                path: env_map
                    .get("LEDGER_CSV_PATH")
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingEnv("LEDGER_CSV_PATH".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "LEDGER_BACKEND".to_string(),
                    format!("must be sqlite or csv, got {}", other),
                ))
            }
        };

        let quote_api_url = env_map
            .get("QUOTE_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_QUOTE_API_URL.to_string());

        let quote_timeout_ms = env_map
            .get("QUOTE_TIMEOUT_MS")
            .map(|s| s.as_str())
            .unwrap_or("3000")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "QUOTE_TIMEOUT_MS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let holding_period_policy = match env_map
            .get("HOLDING_PERIOD_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("clamp")
        {
            "clamp" => HoldingPeriodPolicy::ClampToOneDay,
            "raw" => HoldingPeriodPolicy::Raw,
            other => {
                return Err(ConfigError::InvalidValue(
                    "HOLDING_PERIOD_POLICY".to_string(),
                    format!("must be clamp or raw, got {}", other),
                ))
            }
        };

        let zero_notional_fee = match env_map
            .get("ZERO_NOTIONAL_FEE")
            .map(|s| s.as_str())
            .unwrap_or("floor")
        {
            "floor" => ZeroNotionalFee::Floor,
            "waive" => ZeroNotionalFee::Waive,
            other => {
                return Err(ConfigError::InvalidValue(
                    "ZERO_NOTIONAL_FEE".to_string(),
                    format!("must be floor or waive, got {}", other),
                ))
            }
        };

        let default_discount_rate = env_map
            .get("DEFAULT_DISCOUNT_RATE")
            .map(|s| s.as_str())
            .unwrap_or("2.8")
            .parse::<Decimal>()
            .ok()
            .filter(|rate| rate.is_positive())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_DISCOUNT_RATE".to_string(),
                    "must be a positive decimal".to_string(),
                )
            })?;

        Ok(Config {
            port,
            backend,
            quote_api_url,
            quote_timeout_ms,
            holding_period_policy,
            zero_notional_fee,
            default_discount_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/ledger.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.backend,
            StoreBackend::Sqlite {
                database_path: "/tmp/ledger.db".to_string()
            }
        );
        assert_eq!(config.quote_api_url, DEFAULT_QUOTE_API_URL);
        assert_eq!(config.quote_timeout_ms, 3000);
        assert_eq!(
            config.holding_period_policy,
            HoldingPeriodPolicy::ClampToOneDay
        );
        assert_eq!(config.zero_notional_fee, ZeroNotionalFee::Floor);
        assert_eq!(config.default_discount_rate.to_string(), "2.8");
    }

    #[test]
    fn test_missing_database_path() {
        let result = Config::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_csv_backend_requires_path() {
        let mut env_map = HashMap::new();
        env_map.insert("LEDGER_BACKEND".to_string(), "csv".to_string());
        match Config::from_env_map(env_map.clone()) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "LEDGER_CSV_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }

        env_map.insert("LEDGER_CSV_PATH".to_string(), "trades.csv".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.backend,
            StoreBackend::Csv {
                path: "trades.csv".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_backend() {
        let mut env_map = setup_required_env();
        env_map.insert("LEDGER_BACKEND".to_string(), "sheets".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "LEDGER_BACKEND"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_policies_parse() {
        let mut env_map = setup_required_env();
        env_map.insert("HOLDING_PERIOD_POLICY".to_string(), "raw".to_string());
        env_map.insert("ZERO_NOTIONAL_FEE".to_string(), "waive".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.holding_period_policy, HoldingPeriodPolicy::Raw);
        assert_eq!(config.zero_notional_fee, ZeroNotionalFee::Waive);
    }

    #[test]
    fn test_invalid_holding_period_policy() {
        let mut env_map = setup_required_env();
        env_map.insert("HOLDING_PERIOD_POLICY".to_string(), "round".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "HOLDING_PERIOD_POLICY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_discount_rate() {
        let mut env_map = setup_required_env();
        env_map.insert("DEFAULT_DISCOUNT_RATE".to_string(), "-1".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DEFAULT_DISCOUNT_RATE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
