//! Supported locale identifiers.
//!
//! # Responsibility
//! - Hold the process-wide set of locale identifiers recognized as language
//!   path segments (`en`, `fr_FR`, ...).
//! - Answer membership tests for path segments and child node names.
//!
//! # Invariants
//! - The process-wide set is built once and never mutated afterwards.
//! - Identifiers use the `language[_COUNTRY]` shape.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::BTreeSet;

static LOCALE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(?:_[A-Z]{2}|_[0-9]{3})?$").expect("valid locale regex"));

static AVAILABLE_LOCALES: OnceCell<LocaleSet> = OnceCell::new();

const BUILTIN_LOCALES: &[&str] = &[
    "ar", "ar_AE", "ar_EG", "ar_SA", "be", "be_BY", "bg", "bg_BG", "ca", "ca_ES", "cs", "cs_CZ",
    "da", "da_DK", "de", "de_AT", "de_CH", "de_DE", "de_LU", "el", "el_CY", "el_GR", "en",
    "en_AU", "en_CA", "en_GB", "en_IE", "en_IN", "en_MT", "en_NZ", "en_PH", "en_SG", "en_US",
    "en_ZA", "es", "es_AR", "es_BO", "es_CL", "es_CO", "es_CR", "es_DO", "es_EC", "es_ES",
    "es_GT", "es_HN", "es_MX", "es_NI", "es_PA", "es_PE", "es_PR", "es_PY", "es_SV", "es_US",
    "es_UY", "es_VE", "et", "et_EE", "fi", "fi_FI", "fr", "fr_BE", "fr_CA", "fr_CH", "fr_FR",
    "fr_LU", "ga", "ga_IE", "hi", "hi_IN", "hr", "hr_HR", "hu", "hu_HU", "in", "in_ID", "is",
    "is_IS", "it", "it_CH", "it_IT", "iw", "iw_IL", "ja", "ja_JP", "ko", "ko_KR", "lt", "lt_LT",
    "lv", "lv_LV", "mk", "mk_MK", "ms", "ms_MY", "mt", "mt_MT", "nl", "nl_BE", "nl_NL", "no",
    "no_NO", "pl", "pl_PL", "pt", "pt_BR", "pt_PT", "ro", "ro_RO", "ru", "ru_RU", "sk", "sk_SK",
    "sl", "sl_SI", "sq", "sq_AL", "sr", "sr_BA", "sr_ME", "sr_RS", "sv", "sv_SE", "th", "th_TH",
    "tr", "tr_TR", "uk", "uk_UA", "vi", "vi_VN", "zh", "zh_CN", "zh_HK", "zh_SG", "zh_TW",
];

/// Immutable set of locale identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSet {
    identifiers: BTreeSet<String>,
}

impl LocaleSet {
    /// Builds the set shipped with this crate.
    pub fn builtin() -> Self {
        Self {
            identifiers: BUILTIN_LOCALES.iter().map(|id| (*id).to_string()).collect(),
        }
    }

    /// Builds a set from caller-provided identifiers.
    ///
    /// Entries are trimmed; blank entries are skipped.
    ///
    /// # Errors
    /// - Returns the first malformed identifier.
    pub fn from_identifiers<I, S>(identifiers: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for identifier in identifiers {
            let trimmed = identifier.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            if !is_well_formed(trimmed) {
                return Err(trimmed.to_string());
            }
            set.insert(trimmed.to_string());
        }
        Ok(Self { identifiers: set })
    }

    /// Returns whether `candidate` is a recognized locale identifier.
    pub fn contains(&self, candidate: &str) -> bool {
        self.identifiers.contains(candidate)
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Iterates identifiers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identifiers.iter().map(String::as_str)
    }
}

/// Returns whether `value` has the `language[_COUNTRY]` shape.
pub fn is_well_formed(value: &str) -> bool {
    LOCALE_ID_RE.is_match(value)
}

/// Installs the process-wide locale set.
///
/// Must run before the first [`available_locales`] call to take effect.
///
/// # Errors
/// - Returns an error when a different set is already installed.
pub fn init_available_locales(locales: LocaleSet) -> Result<(), String> {
    let installed = AVAILABLE_LOCALES.get_or_init(|| locales.clone());
    if *installed != locales {
        return Err(format!(
            "available locales already initialized with {} identifiers; refusing to replace",
            installed.len()
        ));
    }
    Ok(())
}

/// Returns the process-wide locale set, defaulting to [`LocaleSet::builtin`].
pub fn available_locales() -> &'static LocaleSet {
    AVAILABLE_LOCALES.get_or_init(LocaleSet::builtin)
}
