//! Key/value configuration for the content accessor.
//!
//! # Responsibility
//! - Load repository properties from a properties file, the environment or
//!   caller-provided pairs.
//! - Expose typed accessors for the fallback locale, the supported locale
//!   list, the repository location and logging settings.
//!
//! # Invariants
//! - Blank values are treated as unset.
//! - The fallback locale is always a member of the effective locale set.

use crate::locale::{self, LocaleSet};
use crate::logging::default_log_level;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const FALLBACK_LOCALE_KEY: &str = "locale.properties.fallback";
pub const AVAILABLE_LOCALES_KEY: &str = "locales.available";
pub const REPOSITORY_PATH_KEY: &str = "content.repository.path";
pub const LOG_LEVEL_KEY: &str = "content.log.level";
pub const LOG_DIR_KEY: &str = "content.log.dir";

const DEFAULT_FALLBACK_LOCALE: &str = "en";

const ENV_KEYS: [(&str, &str); 5] = [
    ("CONTENTREPO_FALLBACK_LOCALE", FALLBACK_LOCALE_KEY),
    ("CONTENTREPO_AVAILABLE_LOCALES", AVAILABLE_LOCALES_KEY),
    ("CONTENTREPO_DB", REPOSITORY_PATH_KEY),
    ("CONTENTREPO_LOG_LEVEL", LOG_LEVEL_KEY),
    ("CONTENTREPO_LOG_DIR", LOG_DIR_KEY),
];

#[derive(Debug)]
pub enum ConfigError {
    /// Properties file cannot be read or parsed.
    Properties {
        path: PathBuf,
        source: dotenvy::Error,
    },
    /// `locales.available` holds a malformed identifier.
    MalformedLocale(String),
    /// Fallback locale is not part of the effective locale set.
    UnsupportedFallbackLocale(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Properties { path, source } => write!(
                f,
                "failed to load properties `{}`: {source}",
                path.display()
            ),
            Self::MalformedLocale(value) => write!(
                f,
                "`{AVAILABLE_LOCALES_KEY}` contains malformed locale `{value}`"
            ),
            Self::UnsupportedFallbackLocale(value) => write!(
                f,
                "`{FALLBACK_LOCALE_KEY}` value `{value}` is not an available locale"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Properties { source, .. } => Some(source),
            Self::MalformedLocale(_) | Self::UnsupportedFallbackLocale(_) => None,
        }
    }
}

/// Validated configuration snapshot.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    properties: BTreeMap<String, String>,
    fallback_locale: String,
    available_locales: Option<LocaleSet>,
}

impl ContentConfig {
    /// Builds configuration from key/value pairs; later pairs win.
    pub fn from_properties<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let properties: BTreeMap<String, String> = pairs
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value.as_ref().trim();
                (!value.is_empty()).then(|| (key.into(), value.to_string()))
            })
            .collect();

        let available_locales = match properties.get(AVAILABLE_LOCALES_KEY) {
            Some(list) => Some(
                LocaleSet::from_identifiers(list.split(','))
                    .map_err(ConfigError::MalformedLocale)?,
            ),
            None => None,
        };

        let fallback_locale = properties
            .get(FALLBACK_LOCALE_KEY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_FALLBACK_LOCALE.to_string());
        let supported = match &available_locales {
            Some(set) => set.contains(&fallback_locale),
            None => LocaleSet::builtin().contains(&fallback_locale),
        };
        if !supported {
            return Err(ConfigError::UnsupportedFallbackLocale(fallback_locale));
        }

        Ok(Self {
            properties,
            fallback_locale,
            available_locales,
        })
    }

    /// Loads a `key=value` properties file.
    pub fn from_properties_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let to_error = |source| ConfigError::Properties {
            path: path.to_path_buf(),
            source,
        };

        let pairs = dotenvy::from_path_iter(path)
            .map_err(to_error)?
            .collect::<Result<Vec<(String, String)>, _>>()
            .map_err(to_error)?;
        Self::from_properties(pairs)
    }

    /// Loads configuration from `CONTENTREPO_*` environment variables.
    ///
    /// A `.env` file in the working directory is honored when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let pairs = ENV_KEYS.iter().filter_map(|(env_key, property_key)| {
            std::env::var(env_key)
                .ok()
                .map(|value| (*property_key, value))
        });
        Self::from_properties(pairs)
    }

    /// Raw key/value lookup.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Language used when a requested one is missing or not supplied.
    pub fn fallback_locale(&self) -> &str {
        &self.fallback_locale
    }

    /// Locale list from `locales.available`, if configured.
    pub fn available_locales(&self) -> Option<&LocaleSet> {
        self.available_locales.as_ref()
    }

    /// Installs the configured locale list as the process-wide set.
    ///
    /// No-op when `locales.available` is unset.
    pub fn install_locales(&self) -> Result<(), String> {
        match &self.available_locales {
            Some(set) => locale::init_available_locales(set.clone()),
            None => Ok(()),
        }
    }

    pub fn repository_path(&self) -> Option<PathBuf> {
        self.property(REPOSITORY_PATH_KEY).map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.property(LOG_LEVEL_KEY).unwrap_or(default_log_level())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.property(LOG_DIR_KEY).map(PathBuf::from)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            fallback_locale: DEFAULT_FALLBACK_LOCALE.to_string(),
            available_locales: None,
        }
    }
}
