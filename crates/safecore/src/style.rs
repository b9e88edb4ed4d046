use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PROPERTY_NAME: Regex = Regex::new(r"^-?[A-Za-z][A-Za-z0-9-]*$")
        .expect("Invalid PROPERTY_NAME regex pattern");
}

/// A single `property: value` pair of a declaration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Splits inline style text into declarations and joins them back.
///
/// Implementations must be stateless or synchronize internally: the style
/// filter calls them through a shared reference from any thread.
pub trait DeclarationParser {
    /// Decompose `text` into declarations in source order. Malformed input
    /// is an error, never a partial result.
    fn parse(&self, text: &str) -> Result<Vec<Declaration>>;

    /// Render declarations as inline style text.
    fn serialize(&self, declarations: &[Declaration]) -> String;
}

/// Built-in declaration-block parser.
///
/// Property names are lower-cased. Comments are removed without leaving a
/// separator, so `col/**/or` reads as `color` and `java/**/script:` as
/// `javascript:`; values are always checked in that joined form. Quoted strings and
/// parenthesized groups may contain `;`. Backslash escapes, braces, stray
/// closing parentheses, unterminated strings or comments, and declarations
/// without a name or value are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssDeclarations;

impl CssDeclarations {
    pub fn new() -> Self {
        Self
    }

    fn split_segments(text: &str) -> Result<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut depth = 0usize;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            // Escapes could spell out blocked keywords
            if ch == '\\' {
                return Err(anyhow::anyhow!("Escape sequences are not supported in style text"));
            }

            // Inside a string everything is literal
            if let Some(q) = quote {
                if ch == '\n' {
                    return Err(anyhow::anyhow!("Unterminated string in style text"));
                }
                if ch == q {
                    quote = None;
                }
                current.push(ch);
                continue;
            }

            match ch {
                '/' if chars.peek() == Some(&'*') => {
                    // Skip the comment body
                    chars.next();
                    let mut closed = false;
                    let mut prev = '\0';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            closed = true;
                            break;
                        }
                        prev = c;
                    }
                    if !closed {
                        return Err(anyhow::anyhow!("Unterminated comment in style text"));
                    }
                }
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| anyhow::anyhow!("Unbalanced ')' in style text"))?;
                    current.push(ch);
                }
                '{' | '}' => {
                    return Err(anyhow::anyhow!("Braces are not allowed in style text"));
                }
                // Only top-level semicolons end a declaration
                ';' if depth == 0 => {
                    segments.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
        }

        if quote.is_some() {
            return Err(anyhow::anyhow!("Unterminated string in style text"));
        }
        if depth != 0 {
            return Err(anyhow::anyhow!("Unbalanced '(' in style text"));
        }
        segments.push(current);
        Ok(segments)
    }
}

impl DeclarationParser for CssDeclarations {
    fn parse(&self, text: &str) -> Result<Vec<Declaration>> {
        let mut declarations = Vec::new();

        for segment in Self::split_segments(text)? {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (name, value) = segment
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Missing ':' in declaration '{}'", segment))?;
            let name = name.trim();
            let value = value.trim();

            if !PROPERTY_NAME.is_match(name) {
                return Err(anyhow::anyhow!("Invalid property name '{}'", name));
            }
            if value.is_empty() {
                return Err(anyhow::anyhow!("Empty value for property '{}'", name));
            }

            declarations.push(Declaration::new(name.to_ascii_lowercase(), value));
        }

        Ok(declarations)
    }

    fn serialize(&self, declarations: &[Declaration]) -> String {
        declarations
            .iter()
            .map(|d| format!("{}: {};", d.name, d.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Declaration>> {
        CssDeclarations::new().parse(text)
    }

    #[test]
    fn test_parse_basic_block() {
        let decls = parse("color: red; Background-Color:#fff;").unwrap();
        assert_eq!(
            decls,
            vec![
                Declaration::new("color", "red"),
                Declaration::new("background-color", "#fff"),
            ]
        );
    }

    #[test]
    fn test_parse_keeps_semicolons_in_strings_and_groups() {
        let decls = parse(r#"font-family: "A;B", serif; cursor: url(a;b), auto"#).unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, r#""A;B", serif"#);
        assert_eq!(decls[1].value, "url(a;b), auto");
    }

    #[test]
    fn test_parse_strips_comments() {
        let decls = parse("color: /* note */ blue; cursor: java/**/script:x").unwrap();
        assert_eq!(decls[0].value, "blue");
        assert_eq!(decls[1].value, "javascript:x");
    }

    #[test]
    fn test_comment_inside_name_joins_tokens() {
        let decls = parse("col/**/or: red").unwrap();
        assert_eq!(decls, vec![Declaration::new("color", "red")]);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse("color red").is_err());
        assert!(parse(": red").is_err());
        assert!(parse("color:").is_err());
        assert!(parse("color: 'red").is_err());
        assert!(parse("color: rgb(1,2,3").is_err());
        assert!(parse("color: red)").is_err());
        assert!(parse("color: red /* open").is_err());
        assert!(parse("color: \\72 ed").is_err());
        assert!(parse("} body { color: red").is_err());
        assert!(parse("co lor: red").is_err());
    }

    #[test]
    fn test_parse_empty_block() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse(" ; ;").unwrap().is_empty());
    }

    #[test]
    fn test_serialize() {
        let parser = CssDeclarations::new();
        let text = parser.serialize(&[
            Declaration::new("color", "red"),
            Declaration::new("margin", "1px 2px"),
        ]);
        insta::assert_snapshot!(text, @"color: red; margin: 1px 2px;");
        assert_eq!(parser.serialize(&[]), "");
    }
}
