//! Appearance store: process-wide cosmetic settings, independent of login.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{info, warn};
use ts_rs::TS;
use utils::local_store::{LocalStore, LocalStoreError};

/// Local storage key of the appearance record
pub const APPEARANCE_KEY: &str = "op_appearance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum BannerStyle {
    #[default]
    Default,
    Sunset,
    Ocean,
    Forest,
    Monochrome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    #[default]
    Mesh,
    Solid,
    Dots,
    Stars,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
pub enum FontFamily {
    #[default]
    Raleway,
    Poppins,
    Inter,
    #[serde(rename = "JetBrains Mono")]
    JetBrainsMono,
}

impl FontFamily {
    pub fn css_name(&self) -> &'static str {
        match self {
            Self::Raleway => "Raleway",
            Self::Poppins => "Poppins",
            Self::Inter => "Inter",
            Self::JetBrainsMono => "JetBrains Mono",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    #[default]
    Blue,
    Purple,
    Emerald,
    Rose,
    Amber,
}

impl ThemeColor {
    /// "r, g, b" triple used for gradients
    pub fn rgb(&self) -> &'static str {
        match self {
            Self::Blue => "0, 167, 238",
            Self::Purple => "139, 92, 246",
            Self::Emerald => "16, 185, 129",
            Self::Rose => "244, 63, 94",
            Self::Amber => "245, 158, 11",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum TableStyle {
    #[default]
    Glass,
    Solid,
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceSettings {
    pub banner_style: BannerStyle,
    pub background_type: BackgroundType,
    pub font_family: FontFamily,
    pub theme_color: ThemeColor,
    pub table_style: TableStyle,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
pub struct AppearancePatch {
    pub banner_style: Option<BannerStyle>,
    pub background_type: Option<BackgroundType>,
    pub font_family: Option<FontFamily>,
    pub theme_color: Option<ThemeColor>,
    pub table_style: Option<TableStyle>,
}

/// Presentation variables derived from the settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct PresentationVars {
    pub font_main: String,
    pub primary_rgb: String,
    pub primary: String,
    pub background_class: String,
}

impl AppearanceSettings {
    pub fn merged(self, patch: &AppearancePatch) -> Self {
        Self {
            banner_style: patch.banner_style.unwrap_or(self.banner_style),
            background_type: patch.background_type.unwrap_or(self.background_type),
            font_family: patch.font_family.unwrap_or(self.font_family),
            theme_color: patch.theme_color.unwrap_or(self.theme_color),
            table_style: patch.table_style.unwrap_or(self.table_style),
        }
    }

    /// Rebuild from a stored record field by field. Missing or unknown
    /// values fall back to the default for that field only.
    pub fn from_stored(value: &serde_json::Value) -> Self {
        let defaults = Self::default();
        Self {
            banner_style: stored_field(value, "bannerStyle").unwrap_or(defaults.banner_style),
            background_type: stored_field(value, "backgroundType")
                .unwrap_or(defaults.background_type),
            font_family: stored_field(value, "fontFamily").unwrap_or(defaults.font_family),
            theme_color: stored_field(value, "themeColor").unwrap_or(defaults.theme_color),
            table_style: stored_field(value, "tableStyle").unwrap_or(defaults.table_style),
        }
    }

    pub fn presentation(&self) -> PresentationVars {
        let background = serde_json::to_value(self.background_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "mesh".to_string());

        PresentationVars {
            font_main: format!("'{}', sans-serif", self.font_family.css_name()),
            primary_rgb: self.theme_color.rgb().to_string(),
            primary: format!("rgb({})", self.theme_color.rgb()),
            background_class: format!("bg-{background}"),
        }
    }
}

fn stored_field<T: DeserializeOwned>(value: &serde_json::Value, key: &str) -> Option<T> {
    let raw = value.get(key)?;
    match serde_json::from_value(raw.clone()) {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(field = key, value = %raw, "Unknown appearance value, using default");
            None
        }
    }
}

pub struct AppearanceStore {
    local: LocalStore,
    current: RwLock<AppearanceSettings>,
}

impl AppearanceStore {
    /// Load persisted settings, merged with defaults.
    pub fn load(local: LocalStore) -> Self {
        let settings = match local.get::<serde_json::Value>(APPEARANCE_KEY) {
            Ok(Some(value)) => AppearanceSettings::from_stored(&value),
            Ok(None) => AppearanceSettings::default(),
            Err(e) => {
                warn!("Unreadable appearance settings, using defaults: {}", e);
                AppearanceSettings::default()
            }
        };

        Self {
            local,
            current: RwLock::new(settings),
        }
    }

    pub async fn get(&self) -> AppearanceSettings {
        *self.current.read().await
    }

    /// Merge `patch` into the current settings and persist before returning.
    pub async fn update(
        &self,
        patch: &AppearancePatch,
    ) -> Result<AppearanceSettings, LocalStoreError> {
        let mut current = self.current.write().await;
        let updated = current.merged(patch);
        self.local.set(APPEARANCE_KEY, &updated)?;
        *current = updated;

        info!(
            theme = ?updated.theme_color,
            font = updated.font_family.css_name(),
            "Appearance updated"
        );
        Ok(updated)
    }
}
