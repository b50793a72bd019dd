use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TypeError;

/// Location-bearing reference to a stored object.
///
/// An `Identifier` wraps an absolute locator (a URL whose scheme selects the
/// storage backend) together with two values derived from it:
///
/// - `name`: the last path segment. Payload and content-type sidecar share
///   this name; it is the only join key between them.
/// - `raw_id`: the locator's path component, for display and logging.
///
/// Both are computed from the locator on construction, so they can never
/// disagree with the address the backend resolves.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    locator: Url,
    name: String,
    raw_id: String,
}

impl Identifier {
    /// Build an identifier from an absolute locator.
    ///
    /// Fails if the locator has no hierarchical path or its last path
    /// segment is empty.
    pub fn from_locator(locator: Url) -> Result<Self, TypeError> {
        let name = locator
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| TypeError::MissingName(locator.to_string()))?
            .to_string();
        let raw_id = locator.path().to_string();
        Ok(Self {
            locator,
            name,
            raw_id,
        })
    }

    /// Parse an identifier from its string form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let locator = Url::parse(s).map_err(|e| TypeError::InvalidLocator {
            locator: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_locator(locator)
    }

    /// The absolute locator.
    pub fn locator(&self) -> &Url {
        &self.locator
    }

    /// The locator scheme, which selects the storage backend.
    pub fn scheme(&self) -> &str {
        self.locator.scheme()
    }

    /// The object name (last path segment of the locator).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The locator's path component.
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    /// The locator as a string slice.
    pub fn as_str(&self) -> &str {
        self.locator.as_str()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.locator)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locator)
    }
}

impl FromStr for Identifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<Url> for Identifier {
    type Error = TypeError;

    fn try_from(value: Url) -> Result<Self, Self::Error> {
        Self::from_locator(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.locator.into()
    }
}
