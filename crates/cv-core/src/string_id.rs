//! Validated string identifiers.
//!
//! Conversation and history ids land in VARCHAR/TEXT key columns and are
//! handed to `psql` and the CLI verbatim. A usable id is non-empty, has no
//! leading or trailing whitespace and contains no control characters.

/// Why `value` cannot be used as an id, or `None` when it can.
pub(crate) fn id_problem(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("must not be empty")
    } else if value.trim() != value {
        Some("must not start or end with whitespace")
    } else if value.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    }
}

/// Declare an id newtype. The literal after the name is the human-readable
/// kind used in [`CoreError::InvalidId`](crate::error::CoreError::InvalidId).
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident($kind:literal);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        $vis struct $Name(String);

        impl $Name {
            /// Validate and wrap `value`.
            pub fn parse(value: impl Into<String>) -> $crate::error::CoreResult<Self> {
                let value = value.into();
                match $crate::string_id::id_problem(&value) {
                    None => Ok(Self(value)),
                    Some(reason) => Err($crate::error::CoreError::InvalidId {
                        kind: $kind,
                        value,
                        reason,
                    }),
                }
            }

            /// Wrap a value that is known to be a valid id.
            ///
            /// # Panics
            ///
            /// Panics when [`parse`](Self::parse) would reject `value`.
            pub fn new(value: impl Into<String>) -> Self {
                match Self::parse(value) {
                    Ok(id) => id,
                    Err(e) => panic!("{e}"),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $Name {
            type Error = $crate::error::CoreError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$Name> for String {
            fn from(id: $Name) -> String {
                id.0
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

pub(crate) use define_string_id;
