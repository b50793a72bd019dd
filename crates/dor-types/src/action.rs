use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened to an object. Tags every lifecycle notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryAction {
    /// The object has been persisted together with its content-type sidecar.
    Add,
    /// An existing object has been rewritten in place.
    Modify,
    /// The object and its sidecar have been removed from storage.
    Delete,
    /// The object was read by a client. Sent immediately before the payload
    /// is handed back; never sent if the request failed.
    Request,
}

impl fmt::Display for RepositoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "ADD",
            Self::Modify => "MODIFY",
            Self::Delete => "DELETE",
            Self::Request => "REQUEST",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{}", RepositoryAction::Add), "ADD");
        assert_eq!(format!("{}", RepositoryAction::Request), "REQUEST");
    }

    #[test]
    fn serde_matches_display() {
        for action in [
            RepositoryAction::Add,
            RepositoryAction::Modify,
            RepositoryAction::Delete,
            RepositoryAction::Request,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{action}\""));
        }
    }
}
