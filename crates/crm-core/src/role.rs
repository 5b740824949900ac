//! Resource roles.

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// The role a resource instance is in or is headed to.
///
/// Variants are declared in increasing order, so `role > Role::Unpromoted`
/// reads as "promoted".
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Role {
    /// Matches any role when used as a filter. Never parsed from text.
    #[default]
    Unknown,
    Stopped,
    Started,
    #[serde(alias = "Slave")]
    Unpromoted,
    #[serde(alias = "Master")]
    Promoted,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unknown => "Unknown",
            Role::Stopped => "Stopped",
            Role::Started => "Started",
            Role::Unpromoted => "Unpromoted",
            Role::Promoted => "Promoted",
        }
    }

    /// Parse an optional role filter where absence and `Started` mean "any".
    pub fn parse_filter(raw: Option<&str>) -> CoreResult<Role> {
        match raw {
            None => Ok(Role::Unknown),
            Some(text) => match text.parse::<Role>()? {
                Role::Started => Ok(Role::Unknown),
                role => Ok(role),
            },
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.trim().to_ascii_lowercase().as_str() {
            "stopped" => Role::Stopped,
            "started" => Role::Started,
            "unpromoted" | "slave" => Role::Unpromoted,
            "promoted" | "master" => Role::Promoted,
            _ => return Err(CoreError::InvalidRole(s.to_string())),
        };
        Ok(role)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
