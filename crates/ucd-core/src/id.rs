//! Strongly-typed identifiers for UrbanCode Deploy objects.
//!
//! The server hands out UUIDs for every object it stores. Wrapping them per
//! object kind keeps a component id from being passed where an environment id
//! is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed UUID wrapper types.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps a [`Uuid`].
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parses an identifier as returned by the server.
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidId`] if the string is not a UUID.
            pub fn parse_str(input: &str) -> Result<Self> {
                Uuid::parse_str(input)
                    .map(Self)
                    .map_err(|_| Error::InvalidId(format!("{}: {input}", stringify!($name))))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(ApplicationId, "Application identifier");
id_type!(ApplicationProcessId, "Application process identifier");
id_type!(ComponentId, "Component identifier");
id_type!(EnvironmentId, "Environment identifier");
id_type!(ResourceId, "Resource tree node identifier");
id_type!(ResourceRoleId, "Resource role identifier");
id_type!(VersionId, "Component version identifier");
id_type!(ProcessRequestId, "Process request identifier");
id_type!(SnapshotId, "Snapshot identifier");
id_type!(PropDefId, "Property definition identifier");
