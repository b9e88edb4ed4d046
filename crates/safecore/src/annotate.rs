//! Applies a [`PolicyFilter`] to the attributes a math parser attaches to
//! its nodes: `\href`, `\class`, `\style`, `\cssId`, `\require`, size
//! macros, `\bbox` styles and raw MathML attributes.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::config::{AllowLevel, AttributeKind};
use crate::filter::PolicyFilter;
use crate::style::{CssDeclarations, DeclarationParser};

lazy_static! {
    static ref EXTENSION_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]")
        .expect("Invalid EXTENSION_CHARS regex pattern");
}

/// Attribute map of a single markup node.
pub type Attributes = BTreeMap<String, String>;

/// Result of a size macro that survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeChange {
    /// New environment size in ems.
    pub size: f64,
    /// Value for the `mathsize` style of the pushed style item.
    pub mathsize: String,
}

/// Token attributes a `\mmlToken` may set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPermissions {
    pub fontsize: bool,
    pub id: bool,
    pub class: bool,
    pub style: bool,
}

pub struct Annotator<'a, P = CssDeclarations> {
    filter: &'a PolicyFilter<P>,
}

impl<'a, P: DeclarationParser> Annotator<'a, P> {
    pub fn new(filter: &'a PolicyFilter<P>) -> Self {
        Self { filter }
    }

    pub fn href(&self, attrs: &mut Attributes, url: &str) {
        if let Some(url) = self.filter.filter_url(url) {
            attrs.insert("href".to_string(), url.to_string());
        }
    }

    /// Adds a class, keeping any classes the node already has.
    pub fn class(&self, attrs: &mut Attributes, class: &str) {
        let Some(class) = self.filter.filter_class(class) else {
            return;
        };
        if class.is_empty() {
            return;
        }
        match attrs.get_mut("class") {
            Some(existing) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(class);
            }
            _ => {
                attrs.insert("class".to_string(), class.to_string());
            }
        }
    }

    /// Adds style text after any style the node already has.
    pub fn style(&self, attrs: &mut Attributes, style: &str) {
        let Some(style) = self.filter.filter_styles(style) else {
            return;
        };
        let style = style.trim();
        if style.is_empty() {
            return;
        }
        match attrs.get_mut("style") {
            Some(existing) if !existing.trim().is_empty() => {
                let trimmed_len = existing.trim_end().len();
                existing.truncate(trimmed_len);
                if !existing.ends_with(';') {
                    existing.push(';');
                }
                existing.push(' ');
                existing.push_str(style);
            }
            _ => {
                attrs.insert("style".to_string(), style.to_string());
            }
        }
    }

    pub fn css_id(&self, attrs: &mut Attributes, id: &str) {
        if let Some(id) = self.filter.filter_id(id) {
            attrs.insert("id".to_string(), id.to_string());
        }
    }

    /// Turns the argument of `\require` into an extension name to load.
    ///
    /// Anything up to the last `/` is dropped along with characters outside
    /// `[A-Za-z0-9_.-]` before the require filter sees the name.
    pub fn require(&self, raw: &str) -> Option<String> {
        let file = raw.rsplit('/').next().unwrap_or(raw);
        let file = EXTENSION_CHARS.replace_all(file, "");
        if file.is_empty() {
            return None;
        }
        self.filter.filter_require(&file).map(str::to_string)
    }

    pub fn set_size(&self, size: f64) -> Option<SizeChange> {
        let size = self.filter.filter_size(size)?;
        (size > 0.0).then(|| SizeChange {
            size,
            mathsize: format!("{}em", size),
        })
    }

    pub fn bbox_style(&self, style: &str) -> Option<String> {
        self.filter.filter_styles(style)
    }

    pub fn token_permissions(&self) -> TokenPermissions {
        let open = |kind| self.filter.level(kind) == AllowLevel::All;
        TokenPermissions {
            fontsize: open(AttributeKind::FontSize),
            id: open(AttributeKind::CssId),
            class: open(AttributeKind::Class),
            style: open(AttributeKind::Style),
        }
    }

    /// Filter a MathML attribute by name. Attributes the policy does not
    /// guard are returned unchanged.
    pub fn filter_attribute<'v>(&self, name: &str, value: &'v str) -> Option<Cow<'v, str>> {
        match name {
            "href" => self.filter.filter_url(value).map(Cow::Borrowed),
            "class" => self.filter.filter_class(value).map(Cow::Borrowed),
            "id" => self.filter.filter_id(value).map(Cow::Borrowed),
            "fontsize" => self.filter.filter_font_size(value).map(Cow::Borrowed),
            "style" => self.filter.filter_styles(value).map(Cow::Owned),
            _ => Some(Cow::Borrowed(value)),
        }
    }

    /// Filter every attribute of a MathML element, dropping rejected ones.
    pub fn filter_attributes(&self, attrs: &Attributes) -> Attributes {
        attrs
            .iter()
            .filter_map(|(name, value)| {
                self.filter_attribute(name, value)
                    .map(|v| (name.clone(), v.into_owned()))
            })
            .collect()
    }
}
