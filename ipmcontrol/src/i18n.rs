//! Traductions de l'interface web, embarquées dans le binaire.

use std::collections::{BTreeMap, HashMap};

use rust_embed::RustEmbed;
use tracing::{debug, warn};

/// Cookie mémorisant la langue choisie
pub const LANGUAGE_COOKIE: &str = "ipmpv_language";
/// Durée de vie du cookie de langue (1 an)
pub const LANGUAGE_COOKIE_MAX_AGE: u64 = 31_536_000;

#[derive(RustEmbed)]
#[folder = "locales/"]
struct Locales;

pub struct Localization {
    default_language: String,
    catalogs: BTreeMap<String, HashMap<String, String>>,
}

impl Localization {
    /// Charge les catalogues embarqués (`locales/<code>.json`)
    pub fn load(default_language: &str) -> Self {
        let mut catalogs = BTreeMap::new();

        for file in Locales::iter() {
            let Some(code) = file.strip_suffix(".json") else {
                continue;
            };
            let Some(content) = Locales::get(&file) else {
                continue;
            };
            match serde_json::from_slice::<HashMap<String, String>>(&content.data) {
                Ok(catalog) => {
                    debug!(language = code, keys = catalog.len(), "Loaded translations");
                    catalogs.insert(code.to_string(), catalog);
                }
                Err(e) => warn!("Invalid translation file {}: {}", file, e),
            }
        }

        Self::from_catalogs(default_language, catalogs)
    }

    pub fn from_catalogs(
        default_language: &str,
        mut catalogs: BTreeMap<String, HashMap<String, String>>,
    ) -> Self {
        catalogs.entry(default_language.to_string()).or_default();
        Self {
            default_language: default_language.to_string(),
            catalogs,
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn is_available(&self, language: &str) -> bool {
        self.catalogs.contains_key(language)
    }

    /// Codes des langues disponibles et leur nom affiché
    pub fn languages(&self) -> Vec<(&str, &str)> {
        self.catalogs
            .iter()
            .map(|(code, catalog)| {
                let name = catalog
                    .get("language_name")
                    .map(String::as_str)
                    .unwrap_or(code.as_str());
                (code.as_str(), name)
            })
            .collect()
    }

    /// Langue demandée → langue par défaut → la clé elle-même
    pub fn translate(&self, language: &str, key: &str) -> String {
        [language, self.default_language.as_str()]
            .iter()
            .filter_map(|lang| self.catalogs.get(*lang))
            .find_map(|catalog| catalog.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Choisit la langue d'une requête : cookie, puis `Accept-Language`,
    /// puis langue par défaut.
    pub fn resolve(&self, cookie: Option<&str>, accept_language: Option<&str>) -> String {
        if let Some(lang) = cookie.filter(|l| self.is_available(l)) {
            return lang.to_string();
        }

        accept_language
            .map(preferred_languages)
            .unwrap_or_default()
            .into_iter()
            .find(|lang| self.is_available(lang))
            .unwrap_or_else(|| self.default_language.clone())
    }
}

/// Étiquettes primaires d'un en-tête `Accept-Language`, par qualité décroissante
fn preferred_languages(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = pieces
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            let primary: String = tag.chars().take(2).collect::<String>().to_lowercase();
            Some((primary, quality))
        })
        .collect();

    // tri stable : à qualité égale l'ordre de l'en-tête est conservé
    tags.sort_by(|a, b| b.1.total_cmp(&a.1));
    tags.into_iter().map(|(tag, _)| tag).collect()
}
