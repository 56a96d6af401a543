pub mod analysis;
pub mod domain;
pub mod error;
pub mod llm;
pub mod notes;
pub mod prompt;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    const DEFAULT_NOTES_API_URL: &str = "http://localhost:3000";
    const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;
    const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
    const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 90;
    const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub gemini_api_key: Option<String>,
        pub gemini_base_url: String,
        pub gemini_model: String,
        pub gemini_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
        pub notes_api_url: String,
        pub analysis_timeout_secs: u64,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from any key lookup. Blank values count as unset.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

            Ok(Self {
                database_url: var("DATABASE_URL"),
                gemini_api_key: var("GEMINI_API_KEY"),
                gemini_base_url: var("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                gemini_timeout_secs: parse_var(
                    "GEMINI_TIMEOUT_SECS",
                    var("GEMINI_TIMEOUT_SECS"),
                    DEFAULT_GEMINI_TIMEOUT_SECS,
                )?,
                sentry_dsn: var("SENTRY_DSN"),
                notes_api_url: var("NOTES_API_URL")
                    .unwrap_or_else(|| DEFAULT_NOTES_API_URL.to_string()),
                analysis_timeout_secs: parse_var(
                    "ANALYSIS_TIMEOUT_SECS",
                    var("ANALYSIS_TIMEOUT_SECS"),
                    DEFAULT_ANALYSIS_TIMEOUT_SECS,
                )?,
                port: parse_var("PORT", var("PORT"), DEFAULT_PORT)?,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn analysis_timeout(&self) -> Duration {
            Duration::from_secs(self.analysis_timeout_secs)
        }

        pub fn gemini_timeout(&self) -> Duration {
            Duration::from_secs(self.gemini_timeout_secs)
        }
    }

    fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match raw {
            Some(s) => s
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} is not valid: {s}")),
            None => Ok(default),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|key| map.get(key).cloned())
        }

        #[test]
        fn defaults_apply_when_unset_or_blank() {
            let s = settings(&[("GEMINI_BASE_URL", "  "), ("PORT", "")]).unwrap();
            assert_eq!(s.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
            assert_eq!(s.gemini_model, DEFAULT_GEMINI_MODEL);
            assert_eq!(s.gemini_timeout_secs, DEFAULT_GEMINI_TIMEOUT_SECS);
            assert_eq!(s.port, DEFAULT_PORT);
            assert!(s.require_gemini_api_key().is_err());
        }

        #[test]
        fn reads_overrides() {
            let s = settings(&[
                ("GEMINI_MODEL", "gemini-2.5-pro"),
                ("GEMINI_TIMEOUT_SECS", "30"),
                ("PORT", "8080"),
                ("GEMINI_API_KEY", "k"),
            ])
            .unwrap();
            assert_eq!(s.gemini_model, "gemini-2.5-pro");
            assert_eq!(s.gemini_timeout(), Duration::from_secs(30));
            assert_eq!(s.port, 8080);
            assert_eq!(s.require_gemini_api_key().unwrap(), "k");
        }

        #[test]
        fn invalid_numbers_are_errors() {
            for (key, value) in [
                ("GEMINI_TIMEOUT_SECS", "soon"),
                ("PORT", "70000"),
                ("ANALYSIS_TIMEOUT_SECS", "-1"),
            ] {
                let err = settings(&[(key, value)]).unwrap_err();
                assert!(err.to_string().contains(key));
            }
        }
    }
}
