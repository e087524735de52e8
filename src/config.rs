//! Configuration of the url alias resolution

use anyhow::Context;
use anyhow::Result;
use url::Url;

use crate::utils::env_var;

/// Origin used when `APP_ORIGIN` is not set
pub const DEFAULT_ORIGIN: &str = "http://localhost:6000";

/// Prefixes exempt from resolution when `URL_ALIAS_PUBLIC_PREFIXES` is not set
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &["/health", "/public"];

/// Locale used when `URL_ALIAS_DEFAULT_LOCALE` is not set
pub const DEFAULT_LOCALE: &str = "pt_BR";

/// Configuration for resolving url aliases
///
/// Loaded once and passed along explicitly, never read from the environment afterwards
#[derive(Clone, Debug)]
pub struct Config {
    /// Resolve aliases at all?
    pub enabled: bool,

    /// Origin used to build the permanent link of an alias
    pub origin: Url,

    /// Requests with a path starting with one of these prefixes are never resolved
    pub public_prefixes: Vec<String>,

    /// Locale of aliases registered without one
    pub default_locale: String,
}

impl Default for Config {
    /// Disabled resolution with all the defaults
    fn default() -> Self {
        Self {
            enabled: false,
            origin: Url::parse(DEFAULT_ORIGIN).expect("Valid default origin"),
            public_prefixes: DEFAULT_PUBLIC_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl Config {
    /// Load the configuration from the environment
    ///
    /// # Errors
    ///
    /// Will return `Err` when `APP_ORIGIN` is not a valid URL
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_var)
    }

    /// Load the configuration with a custom variable lookup
    ///
    /// # Errors
    ///
    /// Will return `Err` when `APP_ORIGIN` is not a valid URL
    pub fn from_lookup<L>(lookup: L) -> Result<Self>
    where
        L: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = lookup("URL_ALIAS_ENABLE").is_some_and(|value| parse_flag(&value));

        let origin = match lookup("APP_ORIGIN") {
            Some(origin) => Url::parse(&origin).context("`APP_ORIGIN` is not a valid URL")?,
            None => defaults.origin,
        };

        let public_prefixes = lookup("URL_ALIAS_PUBLIC_PREFIXES").map_or(
            defaults.public_prefixes,
            |prefixes| {
                prefixes
                    .split(',')
                    .map(str::trim)
                    .filter(|prefix| !prefix.is_empty())
                    .map(ToString::to_string)
                    .collect()
            },
        );

        let default_locale = lookup("URL_ALIAS_DEFAULT_LOCALE").unwrap_or(defaults.default_locale);

        Ok(Self {
            enabled,
            origin,
            public_prefixes,
            default_locale,
        })
    }

    /// Is the path exempt from resolution?
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Parse a boolean-like flag
///
/// Any non-empty value turns the flag on, except the usual ways of saying "no"
fn parse_flag(value: &str) -> bool {
    let value = value.trim();

    !(value.is_empty()
        || value == "0"
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("off"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&'static str, &str)]) -> Result<Config> {
        let vars = vars
            .iter()
            .map(|(name, value)| (*name, (*value).to_string()))
            .collect::<HashMap<&'static str, String>>();

        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert!(!config.enabled);
        assert_eq!("http://localhost:6000/", config.origin.as_str());
        assert_eq!(vec!["/health", "/public"], config.public_prefixes);
        assert_eq!("pt_BR", config.default_locale);
    }

    #[test]
    fn test_enable_flag() {
        assert!(config_from(&[("URL_ALIAS_ENABLE", "1")]).unwrap().enabled);
        assert!(config_from(&[("URL_ALIAS_ENABLE", "true")]).unwrap().enabled);
        assert!(config_from(&[("URL_ALIAS_ENABLE", "yes")]).unwrap().enabled);
        assert!(config_from(&[("URL_ALIAS_ENABLE", "on")]).unwrap().enabled);

        assert!(!config_from(&[("URL_ALIAS_ENABLE", "0")]).unwrap().enabled);
        assert!(!config_from(&[("URL_ALIAS_ENABLE", "FALSE")]).unwrap().enabled);
        assert!(!config_from(&[("URL_ALIAS_ENABLE", "off")]).unwrap().enabled);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("APP_ORIGIN", "https://www.example.com"),
            ("URL_ALIAS_PUBLIC_PREFIXES", " /static, /favicon.ico ,,"),
            ("URL_ALIAS_DEFAULT_LOCALE", "en"),
        ])
        .unwrap();

        assert_eq!("https://www.example.com/", config.origin.as_str());
        assert_eq!(vec!["/static", "/favicon.ico"], config.public_prefixes);
        assert_eq!("en", config.default_locale);

        assert!(config.is_public_path("/static/app.css"));
        assert!(!config.is_public_path("/health"));
    }

    #[test]
    fn test_invalid_origin() {
        assert!(config_from(&[("APP_ORIGIN", "not a url")]).is_err());
    }
}
