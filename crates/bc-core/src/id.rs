// SPDX-License-Identifier: MIT

//! Opaque 128-bit identifiers for every entity in the data model.
//!
//! All identifiers are UUIDs (`spec.md` §3: "all identifiers are opaque
//! 128-bit UUIDs"). [`define_entity_id!`] generates a newtype around
//! [`uuid::Uuid`] with `Display`, `FromStr`, serde, and `sqlx` bindings so
//! the ID can be used directly as a SQLite `TEXT` primary key.

use std::str::FromStr;

use uuid::Uuid;

/// Generate a newtype ID wrapper around [`uuid::Uuid`].
///
/// ```ignore
/// define_entity_id!(ServerId);
/// ```
#[macro_export]
macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID (used when hydrating from storage).
            pub const fn from_uuid(id: uuid::Uuid) -> Self {
                Self(id)
            }

            pub const fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Ok(Self(uuid::Uuid::deserialize(deserializer)?))
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(id: uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.to_string(), buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
                let raw = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
                Ok(Self(uuid::Uuid::parse_str(raw)?))
            }
        }
    };
}

define_entity_id!(
    /// Identifies a managed remote [`crate::Server`].
    ServerId
);
define_entity_id!(
    /// Identifies a backup [`crate::Job`] bound to a server.
    JobId
);
define_entity_id!(
    /// Identifies one snapshot attempt ([`crate::Version`]) of a job.
    VersionId
);
define_entity_id!(
    /// Identifies a per-run audit record ([`crate::Log`]).
    LogId
);

/// Opaque id format used on the wire for a `request_id` correlating an
/// outbound agent RPC with its response (`spec.md` §4.3).
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse a request id produced by [`new_request_id`]. Kept as a thin
/// wrapper (rather than exposing `Uuid` directly) so the wire format can
/// change independently of entity ids.
pub fn parse_request_id(s: &str) -> Option<Uuid> {
    Uuid::from_str(s).ok()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
