//! Translation catalogs

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;
use tracing::warn;

use crate::error::{L10nError, L10nResult};
use crate::locale::Locale;
use crate::plural::PluralRule;

const BUNDLES: &[(&str, &str)] = &[
    ("de_DE", include_str!("../l10n/de_DE.js")),
    ("pt_BR", include_str!("../l10n/pt_BR.js")),
];

static BUNDLED: LazyLock<Catalogs> = LazyLock::new(|| {
    let mut catalogs = Catalogs::default();
    for (tag, source) in BUNDLES {
        match (tag.parse::<Locale>(), Catalog::parse(source)) {
            (Ok(locale), Ok(catalog)) => catalogs.insert(locale, catalog),
            (Err(e), _) | (_, Err(e)) => warn!(locale = *tag, error = %e, "Skipping translation bundle"),
        }
    }
    catalogs
});

/// A translated message; plural messages carry one string per plural form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Single(String),
    Plural(Vec<String>),
}

/// Translations of one app into one language
#[derive(Debug, Clone)]
pub struct Catalog {
    app: String,
    messages: HashMap<String, Message>,
    plural_rule: PluralRule,
}

impl Catalog {
    /// Parse an `OC.L10N.register("app", {...}, "nplurals=..");` bundle
    pub fn parse(source: &str) -> L10nResult<Self> {
        const MARKER: &str = "OC.L10N.register(";

        let start = source
            .find(MARKER)
            .ok_or_else(|| L10nError::MalformedBundle("missing register call".into()))?
            + MARKER.len();
        let end = source
            .rfind(')')
            .filter(|end| *end >= start)
            .ok_or_else(|| L10nError::MalformedBundle("unterminated register call".into()))?;

        let args = format!("[{}]", &source[start..end]);
        let (app, messages, plural_forms): (String, HashMap<String, Message>, String) =
            serde_json::from_str(&args)?;

        Ok(Self {
            app,
            messages,
            plural_rule: PluralRule::parse(&plural_forms)?,
        })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn plural_rule(&self) -> PluralRule {
        self.plural_rule
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Translated message for a source string, if any
    pub fn get(&self, key: &str) -> Option<&Message> {
        self.messages.get(key)
    }
}

/// Catalogs keyed by locale
#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    catalogs: HashMap<Locale, Catalog>,
}

impl Catalogs {
    /// Catalogs shipped with the crate
    pub fn bundled() -> &'static Catalogs {
        &BUNDLED
    }

    pub fn insert(&mut self, locale: Locale, catalog: Catalog) {
        self.catalogs.insert(locale, catalog);
    }

    /// Exact match first, then any catalog of the same language
    pub fn get(&self, locale: &Locale) -> Option<&Catalog> {
        self.catalogs.get(locale).or_else(|| {
            self.catalogs
                .iter()
                .filter(|(l, _)| l.language() == locale.language())
                .min_by_key(|(l, _)| l.tag())
                .map(|(_, c)| c)
        })
    }

    /// Available locale tags, sorted
    pub fn locales(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.catalogs.keys().map(Locale::tag).collect();
        tags.sort();
        tags
    }

    pub fn translator(&self, locale: &Locale) -> Translator<'_> {
        Translator {
            catalog: self.get(locale),
        }
    }
}

/// Looks up strings in one catalog, falling back to the source string
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    catalog: Option<&'a Catalog>,
}

impl<'a> Translator<'a> {
    /// Translator that always returns the source string
    pub fn source() -> Self {
        Self { catalog: None }
    }

    pub fn translate(&self, key: &str) -> String {
        match self.catalog.and_then(|c| c.get(key)) {
            Some(Message::Single(text)) => text.clone(),
            Some(Message::Plural(forms)) => forms.first().cloned().unwrap_or_else(|| key.to_string()),
            None => key.to_string(),
        }
    }

    /// Translate and substitute each `%s` in order
    pub fn translate_with(&self, key: &str, args: &[&str]) -> String {
        let text = self.translate(key);
        let mut out = String::with_capacity(text.len());
        let mut args = args.iter();
        let mut pieces = text.split("%s");

        if let Some(first) = pieces.next() {
            out.push_str(first);
        }
        for piece in pieces {
            match args.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("%s"),
            }
            out.push_str(piece);
        }
        out
    }

    /// Translate and substitute `{name}` placeholders
    pub fn translate_named(&self, key: &str, params: &[(&str, &str)]) -> String {
        params
            .iter()
            .fold(self.translate(key), |text, (name, value)| {
                text.replace(&format!("{{{}}}", name), value)
            })
    }

    /// Translate a countable message, substituting `%n`
    pub fn translate_plural(&self, singular: &str, plural: &str, n: u64) -> String {
        let key = format!("_{}_::_{}_", singular, plural);
        let fallback = || (if n == 1 { singular } else { plural }).to_string();

        let text = match self.catalog.and_then(|c| c.get(&key).map(|m| (c, m))) {
            Some((catalog, Message::Plural(forms))) => forms
                .get(catalog.plural_rule().plural_index(n))
                .cloned()
                .unwrap_or_else(fallback),
            Some((_, Message::Single(text))) => text.clone(),
            None => fallback(),
        };
        text.replace("%n", &n.to_string())
    }
}
