//! Content-addressed object identifiers
//!
//! Every object in the repository is named by a fixed-width digest plus a
//! one-byte type suffix. The suffix is part of the identity: two identifiers
//! with the same digest but different suffixes name different objects.
//!
//! The textual form is lowercase hex followed by `-<suffix>`, e.g.
//! `d01c7fa072d3957ea5dd323f79fa435b33375c06-C` for a catalog. Plain
//! (suffix-free) objects render as bare hex.

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest width in bytes (40 hex characters)
pub const DIGEST_LEN: usize = 20;

/// Object type, encoded as the identifier suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ObjectKind {
    /// Plain data object, no suffix
    #[default]
    Plain,

    /// Catalog (directory-listing fragment), suffix `C`
    Catalog,

    /// History database (named snapshots), suffix `H`
    History,
}

impl ObjectKind {
    /// The suffix character, if any
    pub fn suffix(self) -> Option<char> {
        match self {
            ObjectKind::Plain => None,
            ObjectKind::Catalog => Some('C'),
            ObjectKind::History => Some('H'),
        }
    }

    /// Parse a suffix character
    pub fn from_suffix(c: char) -> Result<Self, HashError> {
        match c {
            'C' => Ok(ObjectKind::Catalog),
            'H' => Ok(ObjectKind::History),
            other => Err(HashError::BadSuffix(other)),
        }
    }
}

/// A content hash with its object-type suffix
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId {
    digest: [u8; DIGEST_LEN],
    kind: ObjectKind,
}

impl ObjectId {
    /// Build an identifier from a raw digest
    pub fn new(digest: [u8; DIGEST_LEN], kind: ObjectKind) -> Self {
        Self { digest, kind }
    }

    /// Parse a bare hex digest (no suffix) into an identifier of `kind`
    pub fn from_hex(hex: &str, kind: ObjectKind) -> Result<Self, HashError> {
        if hex.len() != DIGEST_LEN * 2 {
            return Err(HashError::BadLength {
                expected: DIGEST_LEN * 2,
                actual: hex.len(),
            });
        }

        let mut digest = [0u8; DIGEST_LEN];
        let bytes = hex.as_bytes();
        for (i, slot) in digest.iter_mut().enumerate() {
            let hi = hex_val(bytes[2 * i] as char)?;
            let lo = hex_val(bytes[2 * i + 1] as char)?;
            *slot = (hi << 4) | lo;
        }

        Ok(Self { digest, kind })
    }

    /// The raw digest bytes
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// The object type encoded in the suffix
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Same digest, different suffix
    pub fn with_kind(&self, kind: ObjectKind) -> Self {
        Self {
            digest: self.digest,
            kind,
        }
    }

    /// Lowercase hex form of the digest, without the suffix
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(DIGEST_LEN * 2);
        for b in &self.digest {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }
}

fn hex_val(c: char) -> Result<u8, HashError> {
    c.to_digit(16).map(|v| v as u8).ok_or(HashError::BadHex(c))
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())?;
        if let Some(suffix) = self.kind.suffix() {
            write!(f, "-{}", suffix)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl FromStr for ObjectId {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((hex, suffix)) => {
                let mut chars = suffix.chars();
                let c = chars.next().ok_or(HashError::BadSuffix(' '))?;
                if chars.next().is_some() {
                    return Err(HashError::BadSuffix(c));
                }
                Self::from_hex(hex, ObjectKind::from_suffix(c)?)
            }
            None => Self::from_hex(s, ObjectKind::Plain),
        }
    }
}

impl TryFrom<String> for ObjectId {
    type Error = HashError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> String {
        id.to_string()
    }
}
