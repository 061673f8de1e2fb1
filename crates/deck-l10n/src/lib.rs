//! # deck-l10n
//!
//! Translation catalogs for Deck RS.
//!
//! Catalogs are the `OC.L10N.register(...)` bundles shipped with the web
//! frontend, embedded at compile time and parsed on first use. Lookups that
//! miss fall back to the English source string.
//!
//! ```rust,ignore
//! use deck_l10n::{Catalogs, Locale};
//!
//! let de = Catalogs::bundled().translator(&"de-DE".parse::<Locale>()?);
//! assert_eq!(de.translate("Archive"), "Archivieren");
//! ```

pub mod catalog;
pub mod error;
pub mod locale;
pub mod plural;

pub use catalog::{Catalog, Catalogs, Message, Translator};
pub use error::{L10nError, L10nResult};
pub use locale::Locale;
pub use plural::PluralRule;
