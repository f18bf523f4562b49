//! URL slug type used for products, categories and tags.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidCharacters,
}

/// A URL-safe identifier: lowercase ASCII letters and digits separated by
/// single hyphens, no leading or trailing hyphen.
///
/// ```
/// use printshop_core::Slug;
///
/// assert_eq!(Slug::from_title("Café Crew-Neck  Tee!").as_str(), "cafe-crew-neck-tee");
/// assert!(Slug::parse("crew-neck-tee").is_ok());
/// assert!(Slug::parse("Crew Neck").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 120;

    /// Validate an existing slug.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] if the input is empty, too long, or not in
    /// canonical form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let valid_chars = s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid_chars || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::InvalidCharacters);
        }

        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from free text such as a product title.
    ///
    /// Common Latin accents are folded, every other non-alphanumeric run
    /// becomes a single hyphen. Falls back to `"item"` when nothing usable
    /// remains.
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let mut out = String::with_capacity(title.len());
        let mut pending_hyphen = false;

        for c in title.chars().flat_map(char::to_lowercase) {
            let folded = fold_accent(c);
            if folded.is_ascii_alphanumeric() {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push(folded);
            } else {
                pending_hyphen = true;
            }
        }

        out.truncate(Self::MAX_LENGTH);
        while out.ends_with('-') {
            out.pop();
        }

        if out.is_empty() {
            return Self("item".to_owned());
        }
        Self(out)
    }

    /// Append a numeric suffix, used to make a slug unique.
    #[must_use]
    pub fn with_suffix(&self, suffix: impl fmt::Display) -> Self {
        let suffix = format!("-{suffix}");
        let mut base = self.0.clone();
        base.truncate(Self::MAX_LENGTH.saturating_sub(suffix.len()));
        while base.ends_with('-') {
            base.pop();
        }
        Self(format!("{base}{suffix}"))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_non_canonical() {
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("-tee"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("tee-"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("crew--neck"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("Tee"), Err(SlugError::InvalidCharacters));
        assert!(matches!(
            Slug::parse(&"a".repeat(121)),
            Err(SlugError::TooLong { .. })
        ));
    }

    #[test]
    fn test_from_title() {
        assert_eq!(Slug::from_title("Organic Hoodie").as_str(), "organic-hoodie");
        assert_eq!(Slug::from_title("  --Mug (11oz)-- ").as_str(), "mug-11oz");
        assert_eq!(Slug::from_title("Señor Niño").as_str(), "senor-nino");
        assert_eq!(Slug::from_title("!!!").as_str(), "item");
    }

    #[test]
    fn test_from_title_is_always_parseable() {
        for title in ["A  B", "x", "Über-Cool Tee #2", &"long title ".repeat(40)] {
            let slug = Slug::from_title(title);
            assert!(Slug::parse(slug.as_str()).is_ok(), "{slug} from {title}");
        }
    }

    #[test]
    fn test_with_suffix() {
        let slug = Slug::parse("classic-tee").unwrap();
        assert_eq!(slug.with_suffix(1042).as_str(), "classic-tee-1042");

        let long = Slug::from_title(&"a".repeat(200));
        let suffixed = long.with_suffix(7);
        assert!(suffixed.as_str().len() <= Slug::MAX_LENGTH);
        assert!(suffixed.as_str().ends_with("-7"));
    }
}
