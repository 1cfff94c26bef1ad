//! Target profiles. A profile describes one platform flavour of the assets: how its
//! textures are compressed and which suffix its derived assets carry.

use std::fmt::{self, Formatter};

use serde::{Deserialize, Serialize};

use crate::{naming, Error, Result, SlotKind};

pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_PLATFORM: &str = "WebGL";

/// Compressed texture formats a profile can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    #[serde(rename = "DXT1")]
    Dxt1,
    #[serde(rename = "DXT5")]
    Dxt5,
    #[serde(rename = "ASTC_4x4")]
    Astc4x4,
    #[serde(rename = "ASTC_6x6")]
    Astc6x6,
    #[serde(rename = "ASTC_8x8")]
    Astc8x8,
    #[serde(rename = "ETC2_RGBA8")]
    Etc2Rgba8,
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureFormat::Dxt1 => "DXT1",
            TextureFormat::Dxt5 => "DXT5",
            TextureFormat::Astc4x4 => "ASTC_4x4",
            TextureFormat::Astc6x6 => "ASTC_6x6",
            TextureFormat::Astc8x8 => "ASTC_8x8",
            TextureFormat::Etc2Rgba8 => "ETC2_RGBA8",
        };
        write!(f, "{name}")
    }
}

/// Patterns that mark a material slot as holding a normal map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRules {
    pub normal_map_patterns: Vec<String>,
}

impl SlotRules {
    pub fn classify(&self, slot_name: &str) -> SlotKind {
        naming::classify_slot(slot_name, self)
    }
}

impl Default for SlotRules {
    fn default() -> Self {
        Self {
            normal_map_patterns: vec!["bump".to_owned(), "normal".to_owned()],
        }
    }
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_owned()
}

/// A named target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantProfile {
    pub name: String,
    pub suffix: String,
    pub format: TextureFormat,
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Distribution group the variants are registered in. Defaults to the name of the profile.
    #[serde(default)]
    pub group: Option<String>,
    /// Label the variants receive. Defaults to the name of the profile.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub slot_rules: SlotRules,
}

impl VariantProfile {
    /// Creates a new [`VariantProfile`] with the default platform and max dimension.
    ///
    /// # Example
    ///
    /// ```rust
    /// use prism_content::{TextureFormat, VariantProfile};
    /// let profile = VariantProfile::new("Console", "_BC7", TextureFormat::Dxt5).unwrap();
    /// assert_eq!(profile.group(), "Console");
    /// assert!(VariantProfile::new("Broken", "BC7", TextureFormat::Dxt5).is_err());
    /// ```
    pub fn new(name: impl Into<String>, suffix: impl Into<String>, format: TextureFormat) -> Result<Self> {
        let profile = Self {
            name: name.into(),
            suffix: suffix.into(),
            format,
            max_dimension: DEFAULT_MAX_DIMENSION,
            platform: DEFAULT_PLATFORM.to_owned(),
            group: None,
            label: None,
            slot_rules: SlotRules::default(),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_slot_rules(mut self, slot_rules: SlotRules) -> Self {
        self.slot_rules = slot_rules;
        self
    }

    /// Name of the distribution group that receives the variants.
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.name)
    }

    /// Label that every variant of this profile carries.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Checks the values that can't be enforced by the type system. Needed for profiles read from a config file.
    pub fn validate(&self) -> Result<()> {
        validate_suffix(&self.suffix)?;
        if self.max_dimension == 0 || !self.max_dimension.is_power_of_two() {
            return Err(Error::Other(
                format!("max dimension {} of profile '{}' is not a power of two", self.max_dimension, self.name).into(),
            ));
        }
        Ok(())
    }
}

/// A suffix is `_` followed by ASCII letters, digits or underscores and contains at least one letter or digit.
pub fn validate_suffix(suffix: &str) -> Result<()> {
    let Some(rest) = suffix.strip_prefix('_') else {
        return Err(Error::InvalidSuffix(suffix.to_owned()));
    };
    let valid_chars = rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let has_alphanumeric = rest.chars().any(|c| c.is_ascii_alphanumeric());
    if !valid_chars || !has_alphanumeric {
        return Err(Error::InvalidSuffix(suffix.to_owned()));
    }
    Ok(())
}

/// High fidelity profile with DXT5 textures.
pub fn desktop() -> VariantProfile {
    VariantProfile {
        name: "Desktop".to_owned(),
        suffix: "_DXT".to_owned(),
        format: TextureFormat::Dxt5,
        max_dimension: DEFAULT_MAX_DIMENSION,
        platform: DEFAULT_PLATFORM.to_owned(),
        group: None,
        label: None,
        slot_rules: SlotRules::default(),
    }
}

/// Low bandwidth profile with ASTC 4x4 textures.
pub fn mobile() -> VariantProfile {
    VariantProfile {
        name: "Mobile".to_owned(),
        suffix: "_ASTC".to_owned(),
        format: TextureFormat::Astc4x4,
        max_dimension: DEFAULT_MAX_DIMENSION,
        platform: DEFAULT_PLATFORM.to_owned(),
        group: None,
        label: None,
        slot_rules: SlotRules::default(),
    }
}

pub fn default_profiles() -> Vec<VariantProfile> {
    vec![desktop(), mobile()]
}
