//! Identifier and category key value types

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An item name plus optional blockstate/metadata qualifier
///
/// The qualifier keeps its delimiter, so `minecraft:stone_wall:north` is
/// base `minecraft:stone_wall` with qualifier `:north`, and
/// `oak_log[axis=y]` is base `oak_log` with qualifier `[axis=y]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    base: String,
    qualifier: String,
}

impl Identifier {
    /// Build from parts; `qualifier` may be empty
    ///
    /// The parts are re-split the way [`Identifier::parse`] splits the joined
    /// token, so `new("granite_wall", ":north")` equals
    /// `parse("granite_wall:north")`. Parts that do not form a valid token
    /// are kept as given.
    pub fn new(base: impl Into<String>, qualifier: impl Into<String>) -> Self {
        let base = base.into();
        let qualifier = qualifier.into();
        Self::parse(&format!("{base}{qualifier}")).unwrap_or(Self { base, qualifier })
    }

    /// Parse a single whitespace-free token
    ///
    /// The base is the leading colon segments, at most two
    /// (`namespace:name`), that contain no `=`. Everything after that is the
    /// qualifier, including a trailing bracketed `[...]` group.
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::new(token, "empty identifier"));
        }
        if token.chars().any(char::is_whitespace) {
            return Err(ValidationError::new(token, "contains whitespace"));
        }
        if token.contains('\\') || token.starts_with('#') {
            return Err(ValidationError::new(token, "contains a reserved character"));
        }

        let (head, bracket) = match token.find('[') {
            Some(idx) => {
                let bracket = &token[idx..];
                if !bracket.ends_with(']') || bracket[1..].contains('[') || bracket.len() < 3 {
                    return Err(ValidationError::new(token, "unbalanced '[...]' qualifier"));
                }
                (&token[..idx], bracket)
            }
            None => {
                if token.contains(']') {
                    return Err(ValidationError::new(token, "unbalanced '[...]' qualifier"));
                }
                (token, "")
            }
        };

        let segments: Vec<&str> = head.split(':').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ValidationError::new(token, "empty ':' segment"));
        }
        if segments[0].contains('=') {
            return Err(ValidationError::new(token, "base name must not contain '='"));
        }

        let base_len = segments
            .iter()
            .take(2)
            .take_while(|s| !s.contains('='))
            .count();
        let base = segments[..base_len].join(":");
        let mut qualifier = String::new();
        for segment in &segments[base_len..] {
            qualifier.push(':');
            qualifier.push_str(segment);
        }
        qualifier.push_str(bracket);

        Ok(Self { base, qualifier })
    }

    /// Parse a token that must be a bare base name (no bracket qualifier)
    pub fn parse_base(name: &str) -> Result<String, ValidationError> {
        let id = Self::parse(name)?;
        if id.qualifier.starts_with('[') || id.qualifier.contains('=') {
            return Err(ValidationError::new(name, "expected a base name without qualifier"));
        }
        Ok(id.to_string())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn is_bare(&self) -> bool {
        self.qualifier.is_empty()
    }

    /// Namespace part of the base, if any (`minecraft` in `minecraft:stone`)
    pub fn namespace(&self) -> Option<&str> {
        self.base.split_once(':').map(|(ns, _)| ns)
    }

    /// Base without its namespace
    pub fn path(&self) -> &str {
        base_path(&self.base)
    }

    /// Same qualifier on a different base
    pub fn with_base(&self, base: impl Into<String>) -> Self {
        Self::new(base, self.qualifier.clone())
    }
}

/// Strip the namespace from a base name
pub fn base_path(base: &str) -> &str {
    base.rsplit_once(':').map_or(base, |(_, path)| path)
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.qualifier)
    }
}

impl FromStr for Identifier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A category key of the form `<kind>.<number>` (e.g. `block.42`)
///
/// Ordering is by kind, then numerically by number, so `block.8` sorts
/// before `block.54`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    kind: String,
    number: u32,
}

impl CategoryKey {
    pub fn new(kind: impl Into<String>, number: u32) -> Self {
        Self {
            kind: kind.into(),
            number,
        }
    }

    /// Parse `<kind>.<number>`, tolerating surrounding whitespace
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        let (kind, number) = trimmed
            .rsplit_once('.')
            .ok_or_else(|| ValidationError::new(trimmed, "expected '<kind>.<number>'"))?;

        if kind.is_empty()
            || !kind
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::new(trimmed, "invalid category kind"));
        }
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::new(trimmed, "category number must be digits"));
        }
        let number = number
            .parse::<u32>()
            .map_err(|_| ValidationError::new(trimmed, "category number out of range"))?;

        Ok(Self::new(kind, number))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.number)
    }
}

impl FromStr for CategoryKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("minecraft:stone_wall", "minecraft:stone_wall", "")]
    #[case("minecraft:stone_wall:north", "minecraft:stone_wall", ":north")]
    #[case("granite_wall", "granite_wall", "")]
    #[case("oak_log[axis=y]", "oak_log", "[axis=y]")]
    #[case("minecraft:oak_log[axis=y]", "minecraft:oak_log", "[axis=y]")]
    #[case("wall_torch:facing=east", "wall_torch", ":facing=east")]
    #[case("minecraft:wool:14", "minecraft:wool", ":14")]
    fn test_identifier_parse(#[case] token: &str, #[case] base: &str, #[case] qualifier: &str) {
        let id = Identifier::parse(token).unwrap();
        assert_eq!(id.base(), base);
        assert_eq!(id.qualifier(), qualifier);
        assert_eq!(id.to_string(), token);
    }

    #[rstest]
    #[case("")]
    #[case("stone wall")]
    #[case("oak_log[axis=y")]
    #[case("oak_log]")]
    #[case("a::b")]
    #[case("axis=y:oak")]
    #[case("back\\slash")]
    fn test_identifier_rejects(#[case] token: &str) {
        assert!(Identifier::parse(token).is_err());
    }

    #[test]
    fn test_identifier_namespace_and_path() {
        let id = Identifier::parse("minecraft:stone_wall:north").unwrap();
        assert_eq!(id.namespace(), Some("minecraft"));
        assert_eq!(id.path(), "stone_wall");

        let bare = Identifier::parse("granite_wall").unwrap();
        assert_eq!(bare.namespace(), None);
        assert_eq!(bare.path(), "granite_wall");
    }

    #[test]
    fn test_with_base_keeps_qualifier() {
        let template = Identifier::parse("minecraft:stone_wall:north").unwrap();
        let id = template.with_base("granite_wall");
        assert_eq!(id.to_string(), "granite_wall:north");
        assert_eq!(id, Identifier::parse("granite_wall:north").unwrap());

        let namespaced = template.with_base("mymod:granite_wall");
        assert_eq!(namespaced.base(), "mymod:granite_wall");
        assert_eq!(namespaced.qualifier(), ":north");
    }

    #[rstest]
    #[case("granite_wall", ":north")]
    #[case("a:b", ":c")]
    #[case("oak_log", "[axis=y]")]
    #[case("minecraft:wool", ":14")]
    fn test_new_matches_parsed_token(#[case] base: &str, #[case] qualifier: &str) {
        let built = Identifier::new(base, qualifier);
        let parsed = Identifier::parse(&format!("{base}{qualifier}")).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_parse_base_rejects_blockstate() {
        assert_eq!(Identifier::parse_base("mymod:granite_wall").unwrap(), "mymod:granite_wall");
        assert!(Identifier::parse_base("granite_wall[up=true]").is_err());
    }

    #[test]
    fn test_category_key_parse_and_order() {
        let a = CategoryKey::parse("block.8").unwrap();
        let b = CategoryKey::parse(" block.54 ").unwrap();
        assert_eq!(a.kind(), "block");
        assert_eq!(b.number(), 54);
        assert!(a < b);
        assert_eq!(b.to_string(), "block.54");
    }

    #[rstest]
    #[case("block")]
    #[case("block.")]
    #[case(".12")]
    #[case("block.x1")]
    #[case("my block.1")]
    fn test_category_key_rejects(#[case] text: &str) {
        assert!(CategoryKey::parse(text).is_err());
    }
}
