//! Dashboard configuration: a JSON file plus environment overrides.

use anyhow::{Context, Result};
use platewatch_client::{LiveSettings, RecognitionSettings, StoreSettings};
use platewatch_core::Dimensions;
use platewatch_cv::OverlayStyle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_URL: &str = "PLATEWATCH_API_URL";
pub const ENV_STORE_URL: &str = "SUPABASE_URL";
pub const ENV_STORE_KEY: &str = "SUPABASE_KEY";
pub const ENV_ACCESS_TOKEN: &str = "SUPABASE_ACCESS_TOKEN";
pub const ENV_USER_ID: &str = "PLATEWATCH_USER_ID";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub recognition: RecognitionSettings,
    pub store: StoreSettings,
    pub live: LiveSettings,
    pub overlay: OverlayStyle,
    /// TrueType/OpenType font for plate labels; labels are skipped without one
    pub font_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Display container the media is contain-scaled into
    pub container: Dimensions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recognition: RecognitionSettings::default(),
            store: StoreSettings::default(),
            live: LiveSettings::default(),
            overlay: OverlayStyle::default(),
            font_path: None,
            output_dir: "outputs".into(),
            container: Dimensions::new(1280.0, 720.0),
        }
    }
}

impl DashboardConfig {
    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config {:?}", path))
    }

    /// Overwrite connection settings from `lookup`; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.recognition.api_url = url;
        }
        if let Some(url) = get(ENV_STORE_URL) {
            self.store.url = url;
        }
        if let Some(key) = get(ENV_STORE_KEY) {
            self.store.api_key = key;
        }
        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.store.access_token = Some(token);
        }
        if let Some(user_id) = get(ENV_USER_ID) {
            self.store.user_id = Some(user_id);
        }
    }
}
