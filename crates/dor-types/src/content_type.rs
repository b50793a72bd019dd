use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-type tag attached to every stored object.
///
/// The registry is closed: the repository only knows the members below. The
/// token form (`BINARY`, `DUBLIN_CORE_METADATA`) is what the content-type
/// sidecar persists, so it must stay stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Opaque bytes. The fallback for anything without a richer type.
    Binary,
    /// Dublin Core metadata record, serialized as XML.
    DublinCoreMetadata,
}

impl ContentType {
    /// Every registered content type, in declaration order.
    pub const ALL: [ContentType; 2] = [ContentType::Binary, ContentType::DublinCoreMetadata];

    /// The stable string token written to the sidecar.
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Binary => "BINARY",
            Self::DublinCoreMetadata => "DUBLIN_CORE_METADATA",
        }
    }

    /// The MIME type adapters advertise for this content type.
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Binary => "application/octet-stream",
            Self::DublinCoreMetadata => "text/xml",
        }
    }

    /// Resolve a token to exactly one registered content type.
    ///
    /// Matching ignores ASCII case. Unknown tokens are an error; there is no
    /// default member.
    pub fn from_token(token: &str) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|ct| ct.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| TypeError::UnknownContentType(token.to_string()))
    }

    /// Decode sidecar bytes back into a content type.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let token =
            std::str::from_utf8(bytes).map_err(|e| TypeError::InvalidEncoding(e.to_string()))?;
        Self::from_token(token)
    }

    /// Encode as sidecar bytes (the UTF-8 token).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.token().as_bytes().to_vec()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ContentType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}
