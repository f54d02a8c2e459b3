//! Validated string types that enforce invariants at construction time

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Validation errors for string types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("hostname cannot be empty or whitespace")]
    EmptyHostName,

    #[error("node name cannot be empty or whitespace")]
    EmptyNodeName,

    #[error("bucket name cannot be empty or whitespace")]
    EmptyBucketName,

    #[error("scope name cannot be empty or whitespace")]
    EmptyScopeName,

    #[error("collection name cannot be empty or whitespace")]
    EmptyCollectionName,

    #[error("port cannot be 0")]
    InvalidPort,
}

/// Macro to generate validated string newtypes.
///
/// Each type gets:
/// - A `new()` constructor that validates
/// - `as_str()` getter
/// - `AsRef<str>`, `Deref`, `Display`, `TryFrom<String>` impls
/// - Serde `Serialize` and `Deserialize` with validation
macro_rules! validated_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(String) {
            error_variant: $error_variant:ident,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " after validation")]
            pub fn new(value: String) -> Result<Self, ValidationError> {
                if value.trim().is_empty() {
                    Err(ValidationError::$error_variant)
                } else {
                    Ok(Self(value))
                }
            }

            #[doc = concat!("Get the ", stringify!($name), " as a string slice")]
            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

validated_string! {
    /// A validated hostname that cannot be empty or whitespace-only
    ///
    /// # Examples
    /// ```
    /// use kvlink::types::HostName;
    ///
    /// let host = HostName::new("kv1.example.com".to_string()).unwrap();
    /// assert_eq!(host.as_str(), "kv1.example.com");
    ///
    /// // Empty strings are rejected
    /// assert!(HostName::new("".to_string()).is_err());
    /// assert!(HostName::new("   ".to_string()).is_err());
    /// ```
    #[doc(alias = "host")]
    pub struct HostName(String) {
        error_variant: EmptyHostName,
    }
}

validated_string! {
    /// A validated node name used in logs and pool identification
    pub struct NodeName(String) {
        error_variant: EmptyNodeName,
    }
}

validated_string! {
    /// A validated bucket name
    pub struct BucketName(String) {
        error_variant: EmptyBucketName,
    }
}

validated_string! {
    /// A validated scope name
    pub struct ScopeName(String) {
        error_variant: EmptyScopeName,
    }
}

validated_string! {
    /// A validated collection name
    pub struct CollectionName(String) {
        error_variant: EmptyCollectionName,
    }
}

impl ScopeName {
    /// The default scope every bucket exposes
    #[must_use]
    pub fn default_scope() -> Self {
        Self("_default".to_string())
    }
}

impl CollectionName {
    /// The default collection every scope exposes
    #[must_use]
    pub fn default_collection() -> Self {
        Self("_default".to_string())
    }
}
