//! Locale tags

use std::fmt;
use std::str::FromStr;

use crate::error::L10nError;

/// A language with an optional region, e.g. `de` or `pt_BR`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    pub fn new(language: &str, region: Option<&str>) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            region: region.map(str::to_ascii_uppercase),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Same locale without the region
    pub fn without_region(&self) -> Self {
        Self {
            language: self.language.clone(),
            region: None,
        }
    }

    /// Catalog tag, e.g. `de_DE`
    pub fn tag(&self) -> String {
        self.to_string()
    }
}

impl FromStr for Locale {
    type Err = L10nError;

    /// Accepts `de`, `de-DE`, `de_DE` and ignores encodings such as `.UTF-8`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.split(['.', '@']).next().unwrap_or_default().trim();
        let mut parts = tag.split(['-', '_']);

        let language = parts.next().unwrap_or_default();
        let region = parts.next();
        let valid = |p: &str, len: std::ops::RangeInclusive<usize>| {
            len.contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric())
        };

        if !valid(language, 2..=3)
            || !language.chars().all(|c| c.is_ascii_alphabetic())
            || region.is_some_and(|r| !valid(r, 2..=3))
            || parts.next().is_some()
        {
            return Err(L10nError::InvalidLocale(s.to_string()));
        }

        Ok(Self::new(language, region))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}_{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        for tag in ["de_DE", "de-DE", "DE-de", "de_DE.UTF-8"] {
            let locale: Locale = tag.parse().unwrap();
            assert_eq!(locale.tag(), "de_DE", "{}", tag);
        }

        let pt: Locale = "pt-br".parse().unwrap();
        assert_eq!(pt.language(), "pt");
        assert_eq!(pt.region(), Some("BR"));

        let de: Locale = "de".parse().unwrap();
        assert_eq!(de.region(), None);
        assert_eq!(de.to_string(), "de");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for tag in ["", "x", "german", "de_DE_x", "12"] {
            assert!(tag.parse::<Locale>().is_err(), "{}", tag);
        }
    }

    #[test]
    fn test_without_region() {
        let locale = Locale::new("pt", Some("BR"));
        assert_eq!(locale.without_region(), Locale::new("pt", None));
    }
}
