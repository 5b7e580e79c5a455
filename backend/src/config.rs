use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::reconciler::ReconcileMode;

const DEFAULT_DATABASE_URL: &str = "sqlite://pricewatch.db?mode=rwc";
const DEFAULT_API_URL: &str = "https://api.livecoinwatch.com/coins/list";

#[derive(Clone)]
pub struct AppConfig {
    /// Database connection string. `memory://` keeps snapshots in process.
    pub database_url: String,

    // =========================
    // Upstream pricing API
    // =========================
    /// Endpoint of the coins list call.
    pub api_url: String,

    /// Credential sent as `x-api-key`. Never logged.
    pub api_key: String,

    /// How many top-ranked assets are requested per cycle.
    pub fetch_limit: usize,

    /// Reference currency all rates are quoted in.
    pub currency: String,

    /// Upper bound on a single upstream call.
    ///
    /// A call that runs past this is treated as a failed fetch; the
    /// store keeps serving the previous batch.
    pub fetch_timeout: Duration,

    // =========================
    // Scheduling
    // =========================
    /// Wall-clock period between cycles.
    pub fetch_interval: Duration,

    /// How a fetched batch is applied to the store.
    pub reconcile_mode: ReconcileMode,

    // =========================
    // Read endpoint
    // =========================
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("fetch_limit", &self.fetch_limit)
            .field("currency", &self.currency)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("fetch_interval", &self.fetch_interval)
            .field("reconcile_mode", &self.reconcile_mode)
            .field("listen_addr", &self.listen_addr)
            .field("cors_allow", &self.cors_allow)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let api_url = get("LCW_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let parsed = reqwest::Url::parse(&api_url).map_err(|e| ConfigError::Invalid {
            key: "LCW_API_URL",
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "LCW_API_URL",
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let api_key = get("LCW_API_KEY").ok_or(ConfigError::Missing("LCW_API_KEY"))?;

        let fetch_limit: usize = parse_or(&get, "FETCH_LIMIT", 20)?;
        if fetch_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "FETCH_LIMIT",
                reason: "must be positive".into(),
            });
        }

        let currency = get("FETCH_CURRENCY")
            .map(|c| c.trim().to_ascii_uppercase())
            .unwrap_or_else(|| "USD".to_string());

        let fetch_interval = positive_secs(&get, "FETCH_INTERVAL_SECS", 5)?;
        let fetch_timeout = positive_secs(&get, "FETCH_TIMEOUT_SECS", 10)?;

        let reconcile_mode = match get("RECONCILE_MODE") {
            None => ReconcileMode::default(),
            Some(raw) => raw.parse::<ReconcileMode>().map_err(|reason| ConfigError::Invalid {
                key: "RECONCILE_MODE",
                reason,
            })?,
        };

        let port: u16 = parse_or(&get, "PORT", 3000)?;
        let listen_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let cors_allow = get("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            api_url,
            api_key,
            fetch_limit,
            currency,
            fetch_timeout,
            fetch_interval,
            reconcile_mode,
            listen_addr,
            cors_allow,
            request_timeout: Duration::from_secs(30),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

fn positive_secs<G>(get: &G, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, key, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be positive".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let cfg = AppConfig::from_lookup(lookup(&[("LCW_API_KEY", "k")])).unwrap();

        assert_eq!(cfg.fetch_interval, Duration::from_secs(5));
        assert_eq!(cfg.fetch_limit, 20);
        assert_eq!(cfg.currency, "USD");
        assert_eq!(cfg.listen_addr.port(), 3000);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.reconcile_mode, ReconcileMode::Swap);
        assert_eq!(cfg.cors_allow, vec!["*".to_string()]);
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("LCW_API_KEY"));

        let err = AppConfig::from_lookup(lookup(&[("LCW_API_KEY", "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("LCW_API_KEY"));
    }

    #[test]
    fn rejects_zero_interval_and_bad_port() {
        let err = AppConfig::from_lookup(lookup(&[
            ("LCW_API_KEY", "k"),
            ("FETCH_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FETCH_INTERVAL_SECS", .. }));

        let err = AppConfig::from_lookup(lookup(&[("LCW_API_KEY", "k"), ("PORT", "99999")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = AppConfig::from_lookup(lookup(&[
            ("LCW_API_KEY", "k"),
            ("LCW_API_URL", "ftp://example.com/list"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LCW_API_URL", .. }));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("LCW_API_KEY", "k"),
            ("FETCH_CURRENCY", "eur"),
            ("FETCH_LIMIT", "50"),
            ("RECONCILE_MODE", "clear-upsert"),
            ("CORS_ALLOW_ORIGINS", "http://a.test, http://b.test,"),
            ("PORT", "8081"),
        ]))
        .unwrap();

        assert_eq!(cfg.currency, "EUR");
        assert_eq!(cfg.fetch_limit, 50);
        assert_eq!(cfg.reconcile_mode, ReconcileMode::ClearThenUpsert);
        assert_eq!(cfg.cors_allow, vec!["http://a.test", "http://b.test"]);
        assert_eq!(cfg.listen_addr.port(), 8081);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = AppConfig::from_lookup(lookup(&[("LCW_API_KEY", "super-secret")])).unwrap();
        let out = format!("{cfg:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("<redacted>"));
    }
}
