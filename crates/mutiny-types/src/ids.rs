//! Identifier newtypes for the simulation.
//!
//! Actor and object identifiers travel inside wire frames and goal tokens,
//! so both are string-backed and validated on construction: they may not
//! be empty and may not contain the field separator `:`, whitespace, or
//! parentheses. Run identifiers are UUID v7 (time-ordered) so result
//! records sort by start time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors raised when an identifier string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier was empty.
    #[error("identifier is empty")]
    Empty,

    /// The identifier contains a reserved character.
    #[error("identifier {0:?} contains a reserved character")]
    ReservedCharacter(String),

    /// An object identifier did not have the `<tag>-<hex>` shape.
    #[error("malformed object identifier {0:?}")]
    MalformedObjectId(String),
}

const fn is_reserved(c: char) -> bool {
    matches!(c, ':' | '(' | ')' | ',') || c.is_ascii_whitespace() || c == '\u{4}'
}

fn validate(raw: &str) -> Result<(), IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }
    if raw.chars().any(is_reserved) {
        return Err(IdError::ReservedCharacter(raw.to_owned()));
    }
    Ok(())
}

/// Generates a validated string newtype with standard derives.
macro_rules! define_name_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl core::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_from(s.to_owned())
            }
        }
    };
}

define_name_id! {
    /// Name of an agent or operator, e.g. `agent1` or `op`.
    ActorId
}

define_name_id! {
    /// Content-derived identity of a world object, e.g. `door-9f2c01ab33e4d5f6`.
    ObjectId
}

impl TryFrom<String> for ActorId {
    type Error = IdError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        validate(&raw)?;
        Ok(Self(raw))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = IdError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        validate(&raw)?;
        let Some((tag, digest)) = raw.rsplit_once('-') else {
            return Err(IdError::MalformedObjectId(raw));
        };
        let well_formed = !tag.is_empty()
            && tag.chars().all(|c| c.is_ascii_lowercase())
            && digest.len() == ObjectId::DIGEST_HEX_LEN
            && digest.chars().all(|c| c.is_ascii_hexdigit());
        if !well_formed {
            return Err(IdError::MalformedObjectId(raw));
        }
        Ok(Self(raw))
    }
}

impl ObjectId {
    /// Number of hex characters in the digest part of an object identifier.
    pub const DIGEST_HEX_LEN: usize = 16;

    /// Assemble an identifier from a type tag and a hex digest.
    ///
    /// Only the first [`Self::DIGEST_HEX_LEN`] characters of `digest_hex`
    /// are kept.
    pub fn from_digest(tag: &str, digest_hex: &str) -> Self {
        let short: String = digest_hex.chars().take(Self::DIGEST_HEX_LEN).collect();
        Self(format!("{tag}-{short}"))
    }

    /// The type tag portion (`door`, `npc`, ...).
    pub fn tag(&self) -> &str {
        self.0.rsplit_once('-').map_or(self.0.as_str(), |(tag, _)| tag)
    }
}

/// Identifier of a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_rejects_separator() {
        assert!("agent1".parse::<ActorId>().is_ok());
        assert_eq!("".parse::<ActorId>(), Err(IdError::Empty));
        assert!("agent:1".parse::<ActorId>().is_err());
        assert!("agent 1".parse::<ActorId>().is_err());
    }

    #[test]
    fn object_id_shape() {
        let id = ObjectId::from_digest("door", "0123456789abcdef0123");
        assert_eq!(id.as_str(), "door-0123456789abcdef");
        assert_eq!(id.tag(), "door");
        assert!("door-0123456789abcdef".parse::<ObjectId>().is_ok());
        assert!("door-xyz".parse::<ObjectId>().is_err());
        assert!("0123456789abcdef".parse::<ObjectId>().is_err());
    }

    #[test]
    fn actor_id_serde_validates() {
        let ok: Result<ActorId, _> = serde_json::from_str("\"op\"");
        assert!(ok.is_ok());
        let bad: Result<ActorId, _> = serde_json::from_str("\"o:p\"");
        assert!(bad.is_err());
    }
}
