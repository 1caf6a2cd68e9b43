use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Everything the generation client needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Settings {
    /// Credential precedence: explicit override, `GEMINI_API_KEY`, `API_KEY`,
    /// the settings file, then the empty string.
    pub fn resolve(
        &self,
        api_key_override: Option<String>,
        model_override: Option<String>,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> GeminiConfig {
        // Empty values count as unset at every level.
        let present = |k: &String| !k.is_empty();
        let api_key = api_key_override
            .filter(present)
            .or_else(|| lookup_env("GEMINI_API_KEY").filter(present))
            .or_else(|| lookup_env("API_KEY").filter(present))
            .or_else(|| self.gemini_api_key.clone().filter(present))
            .unwrap_or_default();

        let model = model_override
            .or_else(|| self.gemini_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = self
            .gemini_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        GeminiConfig {
            api_key,
            model,
            base_url,
        }
    }

    /// Copy with the credential masked, for display.
    pub fn redacted(&self) -> Settings {
        let mut out = self.clone();
        if let Some(key) = &out.gemini_api_key {
            let skip = key.chars().count().saturating_sub(4);
            let tail: String = key.chars().skip(skip).collect();
            out.gemini_api_key = Some(format!("****{tail}"));
        }
        out
    }
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join("settings.json")
}

pub fn load_settings_from_dir(config_dir: &Path) -> Settings {
    let path = settings_path(config_dir);
    if let Ok(bytes) = fs::read(&path) {
        if let Ok(s) = serde_json::from_slice::<Settings>(&bytes) {
            return s;
        }
        tracing::warn!(path = %path.display(), "ignoring unreadable settings file");
    }
    Settings::default()
}

pub fn save_settings_to_dir(config_dir: &Path, s: &Settings) -> Result<()> {
    fs::create_dir_all(config_dir).context("create config dir")?;
    let path = settings_path(config_dir);
    let json = serde_json::to_vec_pretty(s)?;
    fs::write(path, json).context("write settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_settings_from_dir(dir.path()), Settings::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(settings_path(dir.path()), b"{not json").unwrap();
        assert_eq!(load_settings_from_dir(dir.path()), Settings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let s = Settings {
            gemini_api_key: Some("abc".into()),
            gemini_model: Some("m".into()),
            gemini_base_url: None,
            output_dir: Some(PathBuf::from("/tmp/out")),
        };
        save_settings_to_dir(&nested, &s).unwrap();
        assert_eq!(load_settings_from_dir(&nested), s);
    }

    #[test]
    fn empty_credential_is_a_valid_default() {
        let cfg = Settings::default().resolve(None, None, no_env);
        assert_eq!(cfg.api_key, "");
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn credential_precedence() {
        let s = Settings {
            gemini_api_key: Some("from-file".into()),
            ..Default::default()
        };
        let env = |k: &str| match k {
            "API_KEY" => Some("from-api-key".to_string()),
            _ => None,
        };
        assert_eq!(s.resolve(None, None, env).api_key, "from-api-key");
        assert_eq!(s.resolve(Some("flag".into()), None, env).api_key, "flag");
        assert_eq!(s.resolve(None, None, no_env).api_key, "from-file");

        let both = |k: &str| Some(format!("env-{k}"));
        assert_eq!(s.resolve(None, None, both).api_key, "env-GEMINI_API_KEY");
    }

    #[test]
    fn empty_credentials_fall_through() {
        let s = Settings {
            gemini_api_key: Some("file-key".into()),
            ..Default::default()
        };
        let blank_gemini = |k: &str| match k {
            "GEMINI_API_KEY" => Some(String::new()),
            "API_KEY" => Some("api-key".to_string()),
            _ => None,
        };
        assert_eq!(s.resolve(None, None, blank_gemini).api_key, "api-key");

        let all_blank = |_: &str| Some(String::new());
        assert_eq!(s.resolve(Some(String::new()), None, all_blank).api_key, "file-key");

        let blank_file = Settings {
            gemini_api_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank_file.resolve(None, None, all_blank).api_key, "");
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let cfg = GeminiConfig {
            api_key: String::new(),
            model: "gemini-2.5-flash-image".into(),
            base_url: "http://localhost:1234/".into(),
        };
        assert_eq!(
            cfg.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn redacted_masks_all_but_tail() {
        let s = Settings {
            gemini_api_key: Some("secret-1234".into()),
            ..Default::default()
        };
        assert_eq!(s.redacted().gemini_api_key.as_deref(), Some("****1234"));
    }
}
