use anyhow::Result;
use safecore::{Annotator, PolicyFilter};

/// Outcome of checking a value against the policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(String),
    Rejected,
    Report(String),
}

pub struct CommandProcessor {
    filter: PolicyFilter,
}

impl CommandProcessor {
    pub fn new(filter: PolicyFilter) -> Self {
        Self { filter }
    }

    pub fn execute_command(&self, args: &[String]) -> Result<Verdict> {
        let Some((command, rest)) = args.split_first() else {
            return Err(anyhow::anyhow!("No command specified"));
        };

        let verdict = match command.as_str() {
            "url" => accepted(self.filter.filter_url(single(command, rest)?)),
            "class" => accepted(self.filter.filter_class(single(command, rest)?)),
            "id" => accepted(self.filter.filter_id(single(command, rest)?)),
            "style" => self
                .filter
                .filter_styles(single(command, rest)?)
                .map_or(Verdict::Rejected, Verdict::Accepted),
            "fontsize" => accepted(self.filter.filter_font_size(single(command, rest)?)),
            "require" => Annotator::new(&self.filter)
                .require(single(command, rest)?)
                .map_or(Verdict::Rejected, Verdict::Accepted),
            "size" => {
                let raw = single(command, rest)?;
                let size: f64 = raw
                    .trim()
                    .trim_end_matches("em")
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid size '{}': {}", raw, e))?;
                self.filter
                    .filter_size(size)
                    .map_or(Verdict::Rejected, |s| Verdict::Accepted(format!("{}em", s)))
            }
            "attr" => match rest {
                [name, value] => Annotator::new(&self.filter)
                    .filter_attribute(name, value)
                    .map_or(Verdict::Rejected, |v| Verdict::Accepted(v.into_owned())),
                _ => return Err(anyhow::anyhow!("Usage: attr <name> <value>")),
            },
            "show-config" => {
                Verdict::Report(serde_json::to_string_pretty(self.filter.config())?)
            }
            _ => {
                return Err(anyhow::anyhow!("Unknown command: {}", command));
            }
        };

        Ok(verdict)
    }
}

fn single<'a>(command: &str, rest: &'a [String]) -> Result<&'a str> {
    match rest {
        [value] => Ok(value.as_str()),
        _ => Err(anyhow::anyhow!("Usage: {} <value>", command)),
    }
}

fn accepted(value: Option<&str>) -> Verdict {
    value.map_or(Verdict::Rejected, |v| Verdict::Accepted(v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Result<Verdict> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        CommandProcessor::new(PolicyFilter::default()).execute_command(&args)
    }

    #[test]
    fn test_url_command() {
        assert_eq!(
            run(&["url", "https://example.com"]).unwrap(),
            Verdict::Accepted("https://example.com".to_string())
        );
        assert_eq!(run(&["url", "javascript:alert(1)"]).unwrap(), Verdict::Rejected);
    }

    #[test]
    fn test_style_command() {
        assert_eq!(
            run(&["style", "color: red; position: fixed"]).unwrap(),
            Verdict::Accepted("color: red;".to_string())
        );
        assert_eq!(run(&["style", "color red"]).unwrap(), Verdict::Rejected);
    }

    #[test]
    fn test_require_and_size_commands() {
        assert_eq!(
            run(&["require", "extensions/verb"]).unwrap(),
            Verdict::Accepted("verb".to_string())
        );
        assert_eq!(run(&["require", "AUTOBOLD"]).unwrap(), Verdict::Rejected);
        assert_eq!(
            run(&["size", "3em"]).unwrap(),
            Verdict::Accepted("3em".to_string())
        );
        assert!(run(&["size", "large"]).is_err());
    }

    #[test]
    fn test_attr_command() {
        assert_eq!(
            run(&["attr", "id", "main"]).unwrap(),
            Verdict::Rejected
        );
        assert_eq!(
            run(&["attr", "mathcolor", "red"]).unwrap(),
            Verdict::Accepted("red".to_string())
        );
        assert!(run(&["attr", "id"]).is_err());
    }

    #[test]
    fn test_show_config() {
        match run(&["show-config"]).unwrap() {
            Verdict::Report(json) => {
                assert!(json.contains("\"allow\""));
                assert!(json.contains("\"safeRequire\""));
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_commands() {
        assert!(run(&[]).is_err());
        assert!(run(&["url"]).is_err());
        assert!(run(&["launch", "x"]).is_err());
    }
}
