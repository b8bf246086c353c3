use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A driver dialect a fixture case can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "py")]
    Python,
    #[serde(alias = "js")]
    JavaScript,
    #[serde(alias = "rb")]
    Ruby,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Python, Language::JavaScript, Language::Ruby];

    /// The key used for overrides in fixture files.
    pub fn key(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::Ruby => "rb",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Ruby => "ruby",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}' (expected one of py, js, rb)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "py" | "python" => Ok(Language::Python),
            "js" | "javascript" => Ok(Language::JavaScript),
            "rb" | "ruby" => Ok(Language::Ruby),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// Parses a comma separated list such as `py,rb`.
pub fn parse_list(s: &str) -> Result<Vec<Language>, UnknownLanguage> {
    let mut langs = Vec::new();
    for part in s.split(',').filter(|p| !p.trim().is_empty()) {
        let lang: Language = part.parse()?;
        if !langs.contains(&lang) {
            langs.push(lang);
        }
    }
    Ok(langs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("py".parse::<Language>(), Ok(Language::Python));
        assert_eq!("JavaScript".parse::<Language>(), Ok(Language::JavaScript));
        assert_eq!(" rb ".parse::<Language>(), Ok(Language::Ruby));
        assert!("go".parse::<Language>().is_err());
    }

    #[test]
    fn test_parse_list_dedupes() {
        assert_eq!(
            parse_list("rb,py,rb").unwrap(),
            vec![Language::Ruby, Language::Python]
        );
        assert!(parse_list("").unwrap().is_empty());
    }
}
