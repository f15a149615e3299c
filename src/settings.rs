use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lookup::{OPEN_LIBRARY_BASE_URL, OPEN_LIBRARY_LIMIT, OpenLibrary};
use crate::ocr::TesseractOptions;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ocr_languages: String,
    pub ocr_psm: u32,
    pub ocr_upscale: bool,
    pub min_relative_size: f32,
    pub lookup_enabled: bool,
    pub lookup_base_url: String,
    pub lookup_limit: usize,
    pub catalog_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let ocr = TesseractOptions::default();
        Self {
            ocr_languages: ocr.languages,
            ocr_psm: ocr.psm,
            ocr_upscale: ocr.upscale,
            min_relative_size: ocr.min_relative_size,
            lookup_enabled: true,
            lookup_base_url: OPEN_LIBRARY_BASE_URL.to_string(),
            lookup_limit: OPEN_LIBRARY_LIMIT,
            catalog_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSettings>,
    filter: Option<FilterSettings>,
    lookup: Option<LookupSettings>,
    catalog: Option<CatalogSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    languages: Option<String>,
    psm: Option<u32>,
    upscale: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterSettings {
    min_relative_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct LookupSettings {
    enabled: Option<bool>,
    base_url: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogSettings {
    path: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse built-in settings")?;
    settings.merge(defaults);
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn tesseract_options(&self) -> TesseractOptions {
        TesseractOptions {
            languages: self.ocr_languages.clone(),
            psm: self.ocr_psm,
            upscale: self.ocr_upscale,
            min_relative_size: self.min_relative_size,
        }
    }

    pub fn open_library(&self) -> OpenLibrary {
        OpenLibrary::new()
            .with_base_url(self.lookup_base_url.clone())
            .with_limit(self.lookup_limit)
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = ocr.languages {
                if !languages.trim().is_empty() {
                    self.ocr_languages = languages.trim().to_string();
                }
            }
            if let Some(psm) = ocr.psm {
                if psm <= 13 {
                    self.ocr_psm = psm;
                }
            }
            if let Some(upscale) = ocr.upscale {
                self.ocr_upscale = upscale;
            }
        }
        if let Some(filter) = incoming.filter {
            if let Some(ratio) = filter.min_relative_size {
                if ratio > 0.0 && ratio <= 1.0 {
                    self.min_relative_size = ratio;
                }
            }
        }
        if let Some(lookup) = incoming.lookup {
            if let Some(enabled) = lookup.enabled {
                self.lookup_enabled = enabled;
            }
            if let Some(url) = lookup.base_url {
                if !url.trim().is_empty() {
                    self.lookup_base_url = url.trim().to_string();
                }
            }
            if let Some(limit) = lookup.limit {
                if limit > 0 {
                    self.lookup_limit = limit;
                }
            }
        }
        if let Some(catalog) = incoming.catalog {
            if let Some(path) = catalog.path {
                if !path.trim().is_empty() {
                    self.catalog_path = Some(path);
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".book-cover-match"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_come_from_builtin_file() {
        with_temp_home(|home| {
            let settings = load_settings(None).expect("settings");
            assert_eq!(settings.ocr_languages, "eng");
            assert_eq!(settings.min_relative_size, 0.5);
            assert!(settings.lookup_enabled);
            assert!(settings.catalog_path.is_none());
            assert!(home.join(".book-cover-match/settings.toml").exists());
        });
    }

    #[test]
    fn extra_file_overrides_and_ignores_invalid_values() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(
                &extra,
                r#"
[filter]
min_relative_size = 0.7

[lookup]
enabled = false
limit = 0

[catalog]
path = "books.toml"
"#,
            )
            .expect("write extra");
            let settings = load_settings(Some(&extra)).expect("settings");
            assert_eq!(settings.min_relative_size, 0.7);
            assert!(!settings.lookup_enabled);
            assert_eq!(settings.lookup_limit, 10);
            assert_eq!(settings.catalog_path.as_deref(), Some("books.toml"));
        });
    }

    #[test]
    fn out_of_range_ratio_is_ignored() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str("[filter]\nmin_relative_size = 1.5").unwrap();
        settings.merge(parsed);
        assert_eq!(settings.min_relative_size, 0.5);
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|home| {
            assert!(load_settings(Some(&home.join("nope.toml"))).is_err());
        });
    }
}
