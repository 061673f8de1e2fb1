//! Plural-forms rules
//!
//! Catalog headers carry a gettext-style `nplurals=N; plural=EXPR;` line. Only
//! the expressions used by the bundled languages are understood.

use crate::error::{L10nError, L10nResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expr {
    /// `n != 1`
    NotOne,
    /// `n > 1`
    GreaterThanOne,
    /// `0`, languages without plurals
    Zero,
}

/// Chooses the plural form for a count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluralRule {
    nplurals: usize,
    expr: Expr,
}

impl Default for PluralRule {
    /// English rule
    fn default() -> Self {
        Self {
            nplurals: 2,
            expr: Expr::NotOne,
        }
    }
}

impl PluralRule {
    /// Parse a `nplurals=2; plural=(n != 1);` header
    pub fn parse(header: &str) -> L10nResult<Self> {
        let unsupported = || L10nError::UnsupportedPluralRule(header.to_string());
        let mut nplurals = None;
        let mut expr = None;

        for part in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(unsupported)?;
            match name.trim() {
                "nplurals" => nplurals = value.trim().parse::<usize>().ok(),
                "plural" => {
                    let normalized: String = value
                        .chars()
                        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
                        .collect();
                    expr = match normalized.as_str() {
                        "n!=1" => Some(Expr::NotOne),
                        "n>1" => Some(Expr::GreaterThanOne),
                        "0" => Some(Expr::Zero),
                        _ => return Err(unsupported()),
                    };
                }
                _ => return Err(unsupported()),
            }
        }

        match (nplurals, expr) {
            (Some(nplurals), Some(expr)) if nplurals >= 1 => Ok(Self { nplurals, expr }),
            _ => Err(unsupported()),
        }
    }

    pub fn nplurals(&self) -> usize {
        self.nplurals
    }

    /// Index of the plural form to use for `n`
    pub fn plural_index(&self, n: u64) -> usize {
        let index = match self.expr {
            Expr::NotOne => usize::from(n != 1),
            Expr::GreaterThanOne => usize::from(n > 1),
            Expr::Zero => 0,
        };
        index.min(self.nplurals - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_german_rule() {
        let rule = PluralRule::parse("nplurals=2; plural=(n != 1);").unwrap();
        assert_eq!(rule.nplurals(), 2);
        assert_eq!(rule.plural_index(0), 1);
        assert_eq!(rule.plural_index(1), 0);
        assert_eq!(rule.plural_index(2), 1);
    }

    #[test]
    fn test_portuguese_rule() {
        let rule = PluralRule::parse("nplurals=2; plural=(n > 1);").unwrap();
        assert_eq!(rule.plural_index(0), 0);
        assert_eq!(rule.plural_index(1), 0);
        assert_eq!(rule.plural_index(5), 1);
    }

    #[test]
    fn test_single_form_rule() {
        let rule = PluralRule::parse("nplurals=1; plural=0;").unwrap();
        assert_eq!(rule.plural_index(1), 0);
        assert_eq!(rule.plural_index(42), 0);
    }

    #[test]
    fn test_rejects_unknown_expressions() {
        assert!(PluralRule::parse("nplurals=3; plural=(n%10==1 ? 0 : 1);").is_err());
        assert!(PluralRule::parse("plural=(n != 1);").is_err());
        assert!(PluralRule::parse("").is_err());
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(PluralRule::default().plural_index(1), 0);
        assert_eq!(PluralRule::default().plural_index(0), 1);
    }
}
