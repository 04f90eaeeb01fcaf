//! Configuration models for namer.
//!
//! The config file is a JSON object read once at startup. Everything the
//! scoring run depends on is parameterized here and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default scoring endpoint (Baidu naming test).
pub const DEFAULT_ENDPOINT: &str =
    "https://sp0.baidu.com/5LMDcjW6BwF3otqbppnN2DJv/qiming.pae.baidu.com/data/namedetail";

/// Top-level configuration for namer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Surname shared by every candidate
    pub last_name: String,

    /// Birth date and time sent with every query
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,

    /// Gender code understood by the scoring service
    #[serde(default)]
    pub gender: i32,

    /// Comma-separated keywords; the first character of each forms the alphabet
    pub first_name_key_words: String,

    /// Lowest score offered for curation
    #[serde(default)]
    pub min_candidate_score: i64,

    /// Scoring endpoint base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Pause before every request, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Which two-character combinations get scored
    #[serde(default)]
    pub pair_rule: PairRule,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_delay_ms() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}

/// Enumeration of ordered character pairs for the two-character pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PairRule {
    /// Every ordered pair, including a character paired with itself
    #[default]
    Full,
    /// Every ordered pair of two different positions
    Distinct,
    /// First position over the whole alphabet, second from index 1 onwards
    Legacy,
}

impl PairRule {
    /// Ordered alphabet index pairs `(i, j)` for an alphabet of `len` symbols.
    pub fn pairs(self, len: usize) -> impl Iterator<Item = (usize, usize)> {
        let start = match self {
            Self::Legacy => 1,
            Self::Full | Self::Distinct => 0,
        };
        (0..len)
            .flat_map(move |i| (start..len).map(move |j| (i, j)))
            .filter(move |(i, j)| self != Self::Distinct || i != j)
    }
}

impl Config {
    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check field ranges and that an alphabet can be derived.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.last_name.trim().is_empty() {
            return Err(ConfigError::Invalid("last_name is empty".to_string()));
        }
        if !(1..=12).contains(&self.month) {
            return Err(ConfigError::Invalid(format!("month {} out of range", self.month)));
        }
        if !(1..=31).contains(&self.day) {
            return Err(ConfigError::Invalid(format!("day {} out of range", self.day)));
        }
        if self.hour > 23 {
            return Err(ConfigError::Invalid(format!("hour {} out of range", self.hour)));
        }
        if self.minute > 59 {
            return Err(ConfigError::Invalid(format!(
                "minute {} out of range",
                self.minute
            )));
        }
        if self.alphabet().is_empty() {
            return Err(ConfigError::Invalid(
                "first_name_key_words yields no characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Candidate alphabet in configured order.
    ///
    /// Only the first character of each comma-separated token counts. Blank
    /// tokens are ignored and repeated characters keep their first position.
    pub fn alphabet(&self) -> Vec<char> {
        let mut alphabet = Vec::new();
        for token in self.first_name_key_words.split(',') {
            if let Some(c) = token.trim().chars().next() {
                if !alphabet.contains(&c) {
                    alphabet.push(c);
                }
            }
        }
        alphabet
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_json() -> &'static str {
        r#"{
            "last_name": "王",
            "year": 2019, "month": 3, "day": 7, "hour": 8, "minute": 5,
            "first_name_key_words": "明亮,华,强大"
        }"#
    }

    #[test]
    fn test_defaults_applied() {
        let config: Config = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(config.gender, 0);
        assert_eq!(config.min_candidate_score, 0);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_delay_ms, 300);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.pair_rule, PairRule::Full);
    }

    #[test]
    fn test_alphabet_uses_first_char_of_each_token() {
        let config: Config = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(config.alphabet(), vec!['明', '华', '强']);
    }

    #[test]
    fn test_alphabet_skips_blank_and_repeated_tokens() {
        let mut config: Config = serde_json::from_str(minimal_json()).unwrap();
        config.first_name_key_words = "明, ,华,明月,,强".to_string();
        assert_eq!(config.alphabet(), vec!['明', '华', '强']);
    }

    #[test]
    fn test_from_file_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(minimal_json().as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.last_name, "王");
        assert_eq!(config.month, 3);
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file(Path::new("/nonexistent/namer.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config: Config = serde_json::from_str(minimal_json()).unwrap();
        config.month = 13;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config: Config = serde_json::from_str(minimal_json()).unwrap();
        config.first_name_key_words = " , ,".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_pair_rules() {
        let full: Vec<_> = PairRule::Full.pairs(3).collect();
        assert_eq!(full.len(), 9);
        assert!(full.contains(&(1, 1)));

        let distinct: Vec<_> = PairRule::Distinct.pairs(3).collect();
        assert_eq!(
            distinct,
            vec![(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]
        );

        let legacy: Vec<_> = PairRule::Legacy.pairs(3).collect();
        assert_eq!(
            legacy,
            vec![(0, 1), (0, 2), (1, 1), (1, 2), (2, 1), (2, 2)]
        );
    }

    #[test]
    fn test_pair_rule_parses_lowercase() {
        let rule: PairRule = serde_json::from_str(r#""distinct""#).unwrap();
        assert_eq!(rule, PairRule::Distinct);
    }
}
