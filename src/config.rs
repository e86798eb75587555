use std::env;
use std::path::PathBuf;

use dotenv::dotenv;

use crate::error::{Error, Result};

pub const DEFAULT_DATA_FILE: &str = "jalon.json";
pub const DEFAULT_LENGTH_PER_UNIT: f64 = 2.0;

/// Settings shared by the command-line tools.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// JSON file backing the store.
    pub data_file: PathBuf,
    pub event_id: Option<String>,
    /// Metres covered by one equipment unit.
    pub length_per_unit: f64,
}

impl Settings {
    /// Reads `JALON_DATA`, `JALON_EVENT` and `JALON_LENGTH_PER_UNIT`, after
    /// loading a `.env` file if there is one.
    pub fn from_env() -> Result<Settings> {
        dotenv().ok();
        Settings::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_file = var("JALON_DATA")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));
        let event_id = var("JALON_EVENT").filter(|v| !v.is_empty());
        let length_per_unit = match var("JALON_LENGTH_PER_UNIT") {
            Some(raw) => parse_length_per_unit(&raw)?,
            None => DEFAULT_LENGTH_PER_UNIT,
        };

        Ok(Settings {
            data_file,
            event_id,
            length_per_unit,
        })
    }
}

pub fn parse_length_per_unit(raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(Error::Config(format!(
            "length per unit must be a positive number, got {:?}",
            raw
        ))),
    }
}

/// Installs the fmt subscriber. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let settings = Settings::from_vars(vars(&[])).unwrap();
        assert_eq!(settings.data_file, PathBuf::from("jalon.json"));
        assert_eq!(settings.event_id, None);
        assert_eq!(settings.length_per_unit, 2.0);
    }

    #[test]
    fn reads_values() {
        let settings = Settings::from_vars(vars(&[
            ("JALON_DATA", "/tmp/fete.json"),
            ("JALON_EVENT", "ev1"),
            ("JALON_LENGTH_PER_UNIT", " 3.5 "),
        ]))
        .unwrap();
        assert_eq!(settings.data_file, PathBuf::from("/tmp/fete.json"));
        assert_eq!(settings.event_id.as_deref(), Some("ev1"));
        assert_eq!(settings.length_per_unit, 3.5);
    }

    #[test]
    fn rejects_bad_length() {
        for raw in ["0", "-1", "abc", "inf"] {
            let result = Settings::from_vars(vars(&[("JALON_LENGTH_PER_UNIT", raw)]));
            assert!(matches!(result, Err(Error::Config(_))), "{}", raw);
        }
    }

    #[test]
    fn logging_init_is_idempotent() {
        init_logging();
        init_logging();
    }
}
