use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;

use super::ext::HostApp;

pub const DDC_LANG_KEY: &str = "VOCABULARIES_EXTRA_SUBJECTS_DDC_LANG";
pub const MESH_LANG_KEY: &str = "VOCABULARIES_EXTRA_SUBJECTS_MESH_LANG";
pub const DDC_FILE_KEY: &str = "VOCABULARIES_EXTRA_SUBJECTS_DDC_FILE";
pub const GND_FILE_URL_KEY: &str = "VOCABULARIES_EXTRA_SUBJECTS_GND_FILE_URL";
pub const MESH_FILE_URL_KEY: &str = "VOCABULARIES_EXTRA_SUBJECTS_MESH_FILE_URL";
pub const GND_OAI_URL_KEY: &str = "VOCABULARIES_EXTRA_SUBJECTS_GND_OAI_URL";

/// Host i18n keys, owned by the host application
pub const LANGUAGES_KEY: &str = "I18N_LANGUAGES";
pub const DEFAULT_LOCALE_KEY: &str = "BABEL_DEFAULT_LOCALE";

pub const DEFAULT_LANG: &str = "de";
pub const DEFAULT_DDC_FILE: &str = "ddc.yaml";
pub const DEFAULT_GND_FILE_URL: &str =
    "https://data.dnb.de/opendata/authorities-gnd-sachbegriff_dnbmarc.mrc.xml.gz";
pub const DEFAULT_GND_OAI_URL: &str = "https://services.dnb.de/oai/repository";

/// Language used whenever a configured default is not enabled
pub const FALLBACK_LANGUAGE: &str = "en";

/// An enabled language of the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub title: String,
}

impl Language {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubjectsConfig {
    pub ddc_lang: String,
    pub mesh_lang: String,
    pub ddc_file: String,
    pub gnd_file_url: String,
    pub mesh_file_url: Option<String>,
    pub gnd_oai_url: String,
    /// Enabled languages, default locale first
    pub languages: Vec<Language>,
}

impl Default for SubjectsConfig {
    fn default() -> Self {
        Self {
            ddc_lang: DEFAULT_LANG.to_string(),
            mesh_lang: DEFAULT_LANG.to_string(),
            ddc_file: DEFAULT_DDC_FILE.to_string(),
            gnd_file_url: DEFAULT_GND_FILE_URL.to_string(),
            mesh_file_url: None,
            gnd_oai_url: DEFAULT_GND_OAI_URL.to_string(),
            languages: vec![Language::new(FALLBACK_LANGUAGE, "English")],
        }
    }
}

impl SubjectsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_locale =
            env::var(DEFAULT_LOCALE_KEY).unwrap_or_else(|_| FALLBACK_LANGUAGE.to_string());
        let extra = env::var(LANGUAGES_KEY)
            .map(|s| parse_languages(&s))
            .unwrap_or_default();

        Self {
            ddc_lang: env::var(DDC_LANG_KEY).unwrap_or(defaults.ddc_lang),
            mesh_lang: env::var(MESH_LANG_KEY).unwrap_or(defaults.mesh_lang),
            ddc_file: env::var(DDC_FILE_KEY).unwrap_or(defaults.ddc_file),
            gnd_file_url: env::var(GND_FILE_URL_KEY).unwrap_or(defaults.gnd_file_url),
            mesh_file_url: env::var(MESH_FILE_URL_KEY)
                .ok()
                .filter(|s| !s.trim().is_empty()),
            gnd_oai_url: env::var(GND_OAI_URL_KEY).unwrap_or(defaults.gnd_oai_url),
            languages: with_default_locale(&default_locale, extra),
        }
    }

    /// Read the values the extension registered in the host config namespace.
    pub fn from_host(app: &HostApp) -> Self {
        let defaults = Self::default();
        let string = |key: &str| app.config.get(key).and_then(Value::as_str).map(str::to_string);

        let default_locale =
            string(DEFAULT_LOCALE_KEY).unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());
        let extra = app
            .config
            .get(LANGUAGES_KEY)
            .map(languages_from_value)
            .unwrap_or_default();

        Self {
            ddc_lang: string(DDC_LANG_KEY).unwrap_or(defaults.ddc_lang),
            mesh_lang: string(MESH_LANG_KEY).unwrap_or(defaults.mesh_lang),
            ddc_file: string(DDC_FILE_KEY).unwrap_or(defaults.ddc_file),
            gnd_file_url: string(GND_FILE_URL_KEY).unwrap_or(defaults.gnd_file_url),
            mesh_file_url: string(MESH_FILE_URL_KEY).filter(|s| !s.trim().is_empty()),
            gnd_oai_url: string(GND_OAI_URL_KEY).unwrap_or(defaults.gnd_oai_url),
            languages: with_default_locale(&default_locale, extra),
        }
    }

    /// Replace the enabled languages with `(code, title)` pairs.
    pub fn with_languages(mut self, languages: &[(&str, &str)]) -> Self {
        self.languages = languages
            .iter()
            .map(|(code, title)| Language::new(*code, *title))
            .collect();
        self
    }
}

/// Resolve a configured default language against the enabled languages.
///
/// A preference matches a language by code or by display title and resolves
/// to that language's code. Anything else falls back to English.
pub fn resolve_default_language(preferred: &str, supported: &[Language]) -> String {
    if let Some(language) = supported
        .iter()
        .find(|l| l.code == preferred || l.title == preferred)
    {
        language.code.clone()
    } else {
        tracing::debug!(
            "Default language '{}' is not enabled, falling back to '{}'",
            preferred,
            FALLBACK_LANGUAGE
        );
        FALLBACK_LANGUAGE.to_string()
    }
}

/// Parse `de:Deutsch,fr:Français` into languages. A bare code is its own title.
fn parse_languages(s: &str) -> Vec<Language> {
    s.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((code, title)) => Language::new(code.trim(), title.trim()),
            None => Language::new(entry, entry),
        })
        .collect()
}

/// Accepts `[["de", "Deutsch"], ...]` or `["de", ...]`.
fn languages_from_value(value: &Value) -> Vec<Language> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(code) => Some(Language::new(code.as_str(), code.as_str())),
            Value::Array(pair) => {
                let code = pair.first()?.as_str()?;
                let title = pair.get(1).and_then(Value::as_str).unwrap_or(code);
                Some(Language::new(code, title))
            }
            _ => None,
        })
        .collect()
}

fn with_default_locale(default_locale: &str, extra: Vec<Language>) -> Vec<Language> {
    let title = if default_locale == FALLBACK_LANGUAGE {
        "English"
    } else {
        default_locale
    };

    let mut languages = vec![Language::new(default_locale, title)];
    for language in extra {
        match languages.iter_mut().find(|l| l.code == language.code) {
            // A bare code is only a placeholder title.
            Some(known) if known.title == known.code => known.title = language.title,
            Some(_) => {}
            None => languages.push(language),
        }
    }
    languages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> Vec<Language> {
        vec![Language::new("en", "English"), Language::new("de", "Deutsch")]
    }

    #[test]
    fn test_resolve_enabled_language() {
        assert_eq!(resolve_default_language("de", &languages()), "de");
    }

    #[test]
    fn test_resolve_matches_display_title() {
        assert_eq!(resolve_default_language("Deutsch", &languages()), "de");
    }

    #[test]
    fn test_resolve_falls_back_to_english() {
        assert_eq!(resolve_default_language("fr", &languages()), "en");
        assert_eq!(resolve_default_language("de", &[]), "en");
    }

    #[test]
    fn test_default_locale_takes_configured_title() {
        let languages = with_default_locale(
            "de",
            vec![Language::new("de", "Deutsch"), Language::new("en", "English")],
        );
        assert_eq!(
            languages,
            vec![Language::new("de", "Deutsch"), Language::new("en", "English")]
        );
        assert_eq!(resolve_default_language("Deutsch", &languages), "de");
    }

    #[test]
    fn test_default_locale_keeps_english_title() {
        let languages = with_default_locale("en", vec![Language::new("en", "en")]);
        assert_eq!(languages, vec![Language::new("en", "English")]);
    }

    #[test]
    fn test_parse_languages() {
        let parsed = parse_languages("de:Deutsch, fr:Français,,it");
        assert_eq!(
            parsed,
            vec![
                Language::new("de", "Deutsch"),
                Language::new("fr", "Français"),
                Language::new("it", "it"),
            ]
        );
    }

    #[test]
    fn test_default_locale_comes_first_without_duplicates() {
        let languages = with_default_locale(
            "en",
            vec![Language::new("de", "Deutsch"), Language::new("en", "Englisch")],
        );
        assert_eq!(
            languages,
            vec![Language::new("en", "English"), Language::new("de", "Deutsch")]
        );
    }

    #[test]
    fn test_languages_from_host_value() {
        let value = serde_json::json!([["de", "Deutsch"], "fr", 42]);
        assert_eq!(
            languages_from_value(&value),
            vec![Language::new("de", "Deutsch"), Language::new("fr", "fr")]
        );
    }
}
