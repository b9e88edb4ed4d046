use std::collections::BTreeMap;

/// Prefix reserved for class names and ids owned by the renderer.
pub const FRAMEWORK_PREFIX: &str = "MJX-";

/// CSS name of the property guarded by the font-size interlock.
pub const FONT_SIZE_PROPERTY: &str = "font-size";

pub const DEFAULT_SIZE_MIN: f64 = 0.7; // \scriptsize
pub const DEFAULT_SIZE_MAX: f64 = 1.44; // \large

const SAFE_PROTOCOLS: &[(&str, bool)] = &[
    ("http", true),
    ("https", true),
    ("file", true),
    ("javascript", false),
];

const SAFE_STYLES: &[(&str, bool)] = &[
    ("color", true),
    ("backgroundColor", true),
    ("border", true),
    ("cursor", true),
    ("margin", true),
    ("padding", true),
    ("textShadow", true),
    ("fontFamily", true),
    ("fontSize", true),
    ("fontStyle", true),
    ("fontWeight", true),
    ("opacity", true),
    ("outline", true),
];

const SAFE_REQUIRE: &[(&str, bool)] = &[
    ("action", true),
    ("amscd", true),
    ("amsmath", true),
    ("amssymbols", true),
    ("autobold", false),
    ("autoload-all", false),
    ("bbox", true),
    ("begingroup", true),
    ("boldsymbol", true),
    ("cancel", true),
    ("color", true),
    ("enclose", true),
    ("extpfeil", true),
    ("HTML", true),
    ("mathchoice", true),
    ("mhchem", true),
    ("newcommand", true),
    ("noErrors", false),
    ("noUndefined", false),
    ("unicode", true),
    ("verb", true),
];

/// Lookup table from a normalized name to its enabled flag.
pub type SafeTable = BTreeMap<String, bool>;

pub fn default_protocols() -> SafeTable {
    build_table(SAFE_PROTOCOLS, protocol_key)
}

pub fn default_styles() -> SafeTable {
    build_table(SAFE_STYLES, style_key)
}

pub fn default_require() -> SafeTable {
    build_table(SAFE_REQUIRE, require_key)
}

fn build_table(entries: &[(&str, bool)], key: fn(&str) -> String) -> SafeTable {
    entries
        .iter()
        .map(|(name, enabled)| (key(name), *enabled))
        .collect()
}

/// Merge `overrides` entry by entry into `table`, normalizing each key.
pub fn merge_table(table: &mut SafeTable, overrides: &BTreeMap<String, bool>, key: fn(&str) -> String) {
    for (name, enabled) in overrides {
        table.insert(key(name), *enabled);
    }
}

/// True when `name` is present in `table` and enabled.
pub fn is_enabled(table: &SafeTable, name: &str) -> bool {
    table.get(name).copied().unwrap_or(false)
}

pub fn protocol_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub fn require_key(name: &str) -> String {
    name.to_lowercase()
}

/// Canonical CSS spelling of a style property name.
///
/// Accepts both the scripting spelling (`backgroundColor`) and the
/// stylesheet spelling (`background-color`, any case) and yields the
/// lower-case hyphenated form.
pub fn style_key(name: &str) -> String {
    let name = name.trim();
    // Already hyphenated, or no word breaks to recover
    if name.contains('-') || !name.chars().any(|c| c.is_ascii_lowercase()) {
        return name.to_ascii_lowercase();
    }

    let mut key = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i == 0 {
            key.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_uppercase() {
            key.push('-');
            key.push(ch.to_ascii_lowercase());
        } else {
            key.push(ch);
        }
    }
    key
}
