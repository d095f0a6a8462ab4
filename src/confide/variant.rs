//! Application variants.
//!
//! Each variant mounts a different slice of the HTTP surface and decides how a
//! successful login is expressed: the hashing variant renders the protected
//! page in the same response, the session variants start a session and redirect.

use serde::Serialize;
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Salted password hashes, no sessions.
    Hashing,
    /// Sessions, local and Google login, shared secrets.
    Federated,
    /// Sessions with local login only.
    Session,
}

impl Variant {
    #[must_use]
    pub const fn uses_sessions(self) -> bool {
        !matches!(self, Self::Hashing)
    }

    #[must_use]
    pub const fn federated_login(self) -> bool {
        matches!(self, Self::Federated)
    }

    #[must_use]
    pub const fn shares_secrets(self) -> bool {
        matches!(self, Self::Federated)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hashing => "hashing",
            Self::Federated => "federated",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "hashing" | "1" => Ok(Self::Hashing),
            "federated" | "2" => Ok(Self::Federated),
            "session" | "3" => Ok(Self::Session),
            other => Err(format!(
                "invalid variant '{other}', expected one of: hashing, federated, session"
            )),
        }
    }
}
