use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::tables::{self, SafeTable};

/// How much of an attribute kind is let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowLevel {
    /// Everything passes unchanged.
    All,
    /// Only values recognized by the safe tables pass.
    Safe,
    /// Nothing passes.
    None,
}

impl fmt::Display for AllowLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowLevel::All => write!(f, "all"),
            AllowLevel::Safe => write!(f, "safe"),
            AllowLevel::None => write!(f, "none"),
        }
    }
}

/// The attribute kinds guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Url,
    Class,
    CssId,
    Style,
    FontSize,
    Require,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 6] = [
        AttributeKind::Url,
        AttributeKind::Class,
        AttributeKind::CssId,
        AttributeKind::Style,
        AttributeKind::FontSize,
        AttributeKind::Require,
    ];
}

/// Allow level per attribute kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowConfig {
    #[serde(rename = "URLs")]
    pub urls: AllowLevel,
    pub classes: AllowLevel,
    #[serde(rename = "cssIDs")]
    pub css_ids: AllowLevel,
    pub styles: AllowLevel,
    pub fontsize: AllowLevel,
    pub require: AllowLevel,
}

impl Default for AllowConfig {
    fn default() -> Self {
        Self {
            urls: AllowLevel::Safe,
            classes: AllowLevel::Safe,
            css_ids: AllowLevel::Safe,
            styles: AllowLevel::Safe,
            fontsize: AllowLevel::All,
            require: AllowLevel::Safe,
        }
    }
}

impl AllowConfig {
    pub fn level(&self, kind: AttributeKind) -> AllowLevel {
        match kind {
            AttributeKind::Url => self.urls,
            AttributeKind::Class => self.classes,
            AttributeKind::CssId => self.css_ids,
            AttributeKind::Style => self.styles,
            AttributeKind::FontSize => self.fontsize,
            AttributeKind::Require => self.require,
        }
    }

    fn slot_mut(&mut self, kind: AttributeKind) -> &mut AllowLevel {
        match kind {
            AttributeKind::Url => &mut self.urls,
            AttributeKind::Class => &mut self.classes,
            AttributeKind::CssId => &mut self.css_ids,
            AttributeKind::Style => &mut self.styles,
            AttributeKind::FontSize => &mut self.fontsize,
            AttributeKind::Require => &mut self.require,
        }
    }

    fn merge(&mut self, overrides: &AllowOverrides) {
        for kind in AttributeKind::ALL {
            if let Some(level) = overrides.level(kind) {
                *self.slot_mut(kind) = level;
            }
        }
    }
}

/// Partial allow levels; omitted kinds keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowOverrides {
    #[serde(default, rename = "URLs", skip_serializing_if = "Option::is_none")]
    pub urls: Option<AllowLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<AllowLevel>,
    #[serde(default, rename = "cssIDs", skip_serializing_if = "Option::is_none")]
    pub css_ids: Option<AllowLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<AllowLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fontsize: Option<AllowLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<AllowLevel>,
}

impl AllowOverrides {
    pub fn level(&self, kind: AttributeKind) -> Option<AllowLevel> {
        match kind {
            AttributeKind::Url => self.urls,
            AttributeKind::Class => self.classes,
            AttributeKind::CssId => self.css_ids,
            AttributeKind::Style => self.styles,
            AttributeKind::FontSize => self.fontsize,
            AttributeKind::Require => self.require,
        }
    }
}

/// Caller-supplied policy overrides, merged over the defaults by [`build_config`].
///
/// Unknown keys are ignored so that newer configuration files still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverrides {
    #[serde(default)]
    pub allow: AllowOverrides,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_max: Option<f64>,
    #[serde(default)]
    pub safe_protocols: BTreeMap<String, bool>,
    #[serde(default)]
    pub safe_styles: BTreeMap<String, bool>,
    #[serde(default)]
    pub safe_require: BTreeMap<String, bool>,
}

impl PolicyOverrides {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| anyhow::anyhow!("Invalid policy configuration: {}", e))
    }
}

/// The effective policy. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    pub allow: AllowConfig,
    pub size_min: f64,
    pub size_max: f64,
    pub safe_protocols: SafeTable,
    pub safe_styles: SafeTable,
    pub safe_require: SafeTable,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        build_config(&PolicyOverrides::default())
    }
}

impl PolicyConfig {
    pub fn level(&self, kind: AttributeKind) -> AllowLevel {
        self.allow.level(kind)
    }

    /// Correct size bounds that would make clamping meaningless.
    pub fn validate(&mut self) {
        if !self.size_min.is_finite() || self.size_min <= 0.0 {
            log::warn!("Invalid sizeMin: {}, using default", self.size_min);
            self.size_min = tables::DEFAULT_SIZE_MIN;
        }

        if !self.size_max.is_finite() || self.size_max <= 0.0 {
            log::warn!("Invalid sizeMax: {}, using default", self.size_max);
            self.size_max = tables::DEFAULT_SIZE_MAX;
        }

        if self.size_min > self.size_max {
            log::warn!(
                "sizeMin {} is larger than sizeMax {}, swapping",
                self.size_min,
                self.size_max
            );
            std::mem::swap(&mut self.size_min, &mut self.size_max);
        }
    }

    fn apply_font_size_interlock(&mut self) {
        if self.allow.fontsize != AllowLevel::All {
            log::debug!(
                "fontsize allow level is {}, disabling {} in safe styles",
                self.allow.fontsize,
                tables::FONT_SIZE_PROPERTY
            );
            self.safe_styles
                .insert(tables::FONT_SIZE_PROPERTY.to_string(), false);
        }
    }
}

/// Merge `overrides` onto the default policy.
pub fn build_config(overrides: &PolicyOverrides) -> PolicyConfig {
    // Allow levels merge per kind
    let mut allow = AllowConfig::default();
    allow.merge(&overrides.allow);

    // Tables merge per entry, keys normalized
    let mut safe_protocols = tables::default_protocols();
    tables::merge_table(&mut safe_protocols, &overrides.safe_protocols, tables::protocol_key);

    let mut safe_styles = tables::default_styles();
    tables::merge_table(&mut safe_styles, &overrides.safe_styles, tables::style_key);

    let mut safe_require = tables::default_require();
    tables::merge_table(&mut safe_require, &overrides.safe_require, tables::require_key);

    let mut config = PolicyConfig {
        allow,
        size_min: overrides.size_min.unwrap_or(tables::DEFAULT_SIZE_MIN),
        size_max: overrides.size_max.unwrap_or(tables::DEFAULT_SIZE_MAX),
        safe_protocols,
        safe_styles,
        safe_require,
    };
    config.validate();
    // Font size only through the numeric filter unless fully open
    config.apply_font_size_interlock();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = PolicyConfig::default();

        assert_eq!(config.level(AttributeKind::Url), AllowLevel::Safe);
        assert_eq!(config.level(AttributeKind::Class), AllowLevel::Safe);
        assert_eq!(config.level(AttributeKind::CssId), AllowLevel::Safe);
        assert_eq!(config.level(AttributeKind::Style), AllowLevel::Safe);
        assert_eq!(config.level(AttributeKind::FontSize), AllowLevel::All);
        assert_eq!(config.level(AttributeKind::Require), AllowLevel::Safe);
        assert_eq!(config.size_min, 0.7);
        assert_eq!(config.size_max, 1.44);
        assert_eq!(config.safe_styles.get("font-size"), Some(&true));
    }

    #[test]
    fn test_allow_override_is_per_kind() {
        let overrides = PolicyOverrides::from_json(r#"{"allow": {"URLs": "none"}}"#).unwrap();
        let config = build_config(&overrides);

        assert_eq!(config.allow.urls, AllowLevel::None);
        assert_eq!(config.allow.classes, AllowLevel::Safe);
        assert_eq!(config.allow.fontsize, AllowLevel::All);
        assert_eq!(config.allow.require, AllowLevel::Safe);
    }

    #[test]
    fn test_font_size_interlock() {
        let overrides =
            PolicyOverrides::from_json(r#"{"allow": {"fontsize": "safe"}, "safeStyles": {"fontSize": true}}"#)
                .unwrap();
        let config = build_config(&overrides);

        assert_eq!(config.safe_styles.get("font-size"), Some(&false));
        assert_eq!(config.safe_styles.get("color"), Some(&true));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let overrides = PolicyOverrides::from_json(
            r#"{"futureOption": 3, "allow": {"URLs": "all", "widgets": "none"}, "sizeMax": 2.0}"#,
        )
        .unwrap();
        let config = build_config(&overrides);

        assert_eq!(config.allow.urls, AllowLevel::All);
        assert_eq!(config.size_max, 2.0);
        assert_eq!(config.size_min, 0.7);
    }

    #[test]
    fn test_invalid_level_is_an_error() {
        let result = PolicyOverrides::from_json(r#"{"allow": {"URLs": "sometimes"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_size_bounds_are_validated() {
        let swapped = build_config(&PolicyOverrides {
            size_min: Some(2.0),
            size_max: Some(1.0),
            ..Default::default()
        });
        assert_eq!((swapped.size_min, swapped.size_max), (1.0, 2.0));

        let broken = build_config(&PolicyOverrides {
            size_min: Some(f64::NAN),
            size_max: Some(-1.0),
            ..Default::default()
        });
        assert_eq!((broken.size_min, broken.size_max), (0.7, 1.44));
    }

    #[test]
    fn test_table_keys_are_normalized() {
        let overrides = PolicyOverrides::from_json(
            r#"{"safeProtocols": {"FTP": true}, "safeRequire": {"AutoBold": true}, "safeStyles": {"border-radius": true}}"#,
        )
        .unwrap();
        let config = build_config(&overrides);

        assert_eq!(config.safe_protocols.get("ftp"), Some(&true));
        assert_eq!(config.safe_require.get("autobold"), Some(&true));
        assert_eq!(config.safe_styles.get("border-radius"), Some(&true));
        assert_eq!(config.safe_protocols.get("http"), Some(&true));
    }

    #[test]
    fn test_capitalized_style_keys() {
        let overrides =
            PolicyOverrides::from_json(r#"{"safeStyles": {"FontSize": false, "BorderRadius": true}}"#)
                .unwrap();
        let config = build_config(&overrides);

        assert_eq!(config.safe_styles.get("font-size"), Some(&false));
        assert_eq!(config.safe_styles.get("border-radius"), Some(&true));
        assert!(!config.safe_styles.keys().any(|k| k.starts_with('-')));
    }

    #[test]
    fn test_allow_level_serialization() {
        assert_eq!(serde_json::to_string(&AllowLevel::Safe).unwrap(), "\"safe\"");
        let level: AllowLevel = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(level, AllowLevel::None);
        assert_eq!(AllowLevel::All.to_string(), "all");
    }
}
