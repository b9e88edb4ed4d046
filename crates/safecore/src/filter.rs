use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::config::{AllowLevel, AttributeKind, PolicyConfig};
use crate::style::{CssDeclarations, Declaration, DeclarationParser};
use crate::tables::{self, FRAMEWORK_PREFIX};

lazy_static! {
    static ref URL_PROTOCOL: Regex = Regex::new(r"^\s*([A-Za-z]+):")
        .expect("Invalid URL_PROTOCOL regex pattern");
    static ref CSS_EXPRESSION: Regex = Regex::new(r"^\s*expression")
        .expect("Invalid CSS_EXPRESSION regex pattern");
}

/// Applies a [`PolicyConfig`] to attribute values taken from math markup.
///
/// Every filter returns `Some` with the accepted value or `None` when the
/// value must be dropped. Filters never fail and never log.
#[derive(Debug, Clone)]
pub struct PolicyFilter<P = CssDeclarations> {
    config: PolicyConfig,
    parser: P,
}

impl PolicyFilter<CssDeclarations> {
    pub fn new(config: PolicyConfig) -> Self {
        Self::with_parser(config, CssDeclarations::new())
    }
}

impl Default for PolicyFilter<CssDeclarations> {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl<P: DeclarationParser> PolicyFilter<P> {
    pub fn with_parser(config: PolicyConfig, parser: P) -> Self {
        Self { config, parser }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn level(&self, kind: AttributeKind) -> AllowLevel {
        self.config.level(kind)
    }

    /// Filter a link target by its protocol.
    pub fn filter_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        match self.level(AttributeKind::Url) {
            AllowLevel::None => None,
            AllowLevel::All => Some(url),
            AllowLevel::Safe => {
                let protocol = URL_PROTOCOL
                    .captures(url)
                    .and_then(|caps| caps.get(1))
                    .map(|m| tables::protocol_key(m.as_str()))
                    .unwrap_or_default();
                tables::is_enabled(&self.config.safe_protocols, &protocol).then_some(url)
            }
        }
    }

    pub fn filter_class<'a>(&self, class: &'a str) -> Option<&'a str> {
        self.filter_prefixed(AttributeKind::Class, class)
    }

    pub fn filter_id<'a>(&self, id: &'a str) -> Option<&'a str> {
        self.filter_prefixed(AttributeKind::CssId, id)
    }

    fn filter_prefixed<'a>(&self, kind: AttributeKind, value: &'a str) -> Option<&'a str> {
        match self.level(kind) {
            AllowLevel::None => None,
            AllowLevel::All => Some(value),
            AllowLevel::Safe => value.starts_with(FRAMEWORK_PREFIX).then_some(value),
        }
    }

    /// Filter inline style text.
    ///
    /// At the safe level the result is rebuilt from the declarations that
    /// survive [`filter_style`](Self::filter_style); it is never the raw
    /// text. Text the parser cannot read is rejected whole.
    pub fn filter_styles(&self, styles: &str) -> Option<String> {
        match self.level(AttributeKind::Style) {
            AllowLevel::None => None,
            AllowLevel::All => Some(styles.to_string()),
            AllowLevel::Safe => {
                // Unreadable text is rejected whole, never partially kept
                let parsed = self.parser.parse(styles).ok()?;

                // Keep properties from the safe table; later declarations
                // of a property replace earlier ones in place.
                let mut positions: HashMap<String, usize> = HashMap::new();
                let mut effective: Vec<Declaration> = Vec::new();
                for decl in parsed {
                    if !self.config.safe_styles.contains_key(&tables::style_key(&decl.name)) {
                        continue;
                    }
                    match positions.get(&decl.name) {
                        Some(&index) => effective[index].value = decl.value,
                        None => {
                            positions.insert(decl.name.clone(), effective.len());
                            effective.push(decl);
                        }
                    }
                }

                // Check each surviving value and rebuild the block
                let kept: Vec<Declaration> = effective
                    .into_iter()
                    .filter(|d| self.filter_style(&d.name, &d.value).is_some())
                    .collect();
                Some(self.parser.serialize(&kept))
            }
        }
    }

    /// Filter one property value; `name` may use either CSS or camelCase spelling.
    pub fn filter_style<'a>(&self, name: &str, value: &'a str) -> Option<&'a str> {
        // Script-bearing values are refused whatever the property
        if CSS_EXPRESSION.is_match(value) || value.contains("javascript:") {
            return None;
        }
        tables::is_enabled(&self.config.safe_styles, &tables::style_key(name)).then_some(value)
    }

    /// Filter a font size in ems coming from a size macro.
    pub fn filter_size(&self, size: f64) -> Option<f64> {
        match self.level(AttributeKind::FontSize) {
            AllowLevel::None => None,
            AllowLevel::All => Some(size),
            AllowLevel::Safe => Some(size.max(self.config.size_min).min(self.config.size_max)),
        }
    }

    /// Filter a font size given directly as an attribute. There is no
    /// clamping path: only the `all` level lets it through.
    pub fn filter_font_size<T>(&self, size: T) -> Option<T> {
        (self.level(AttributeKind::FontSize) == AllowLevel::All).then_some(size)
    }

    /// Filter an extension name. Callers strip paths and unexpected
    /// characters first.
    pub fn filter_require<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self.level(AttributeKind::Require) {
            AllowLevel::None => None,
            AllowLevel::All => Some(name),
            AllowLevel::Safe => {
                tables::is_enabled(&self.config.safe_require, &tables::require_key(name))
                    .then_some(name)
            }
        }
    }
}
