use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        // Backend ids and node keys show up both as JSON strings and as bare
        // integers depending on who wrote the document.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Int(i64),
                    Text(String),
                }

                Ok(match Raw::deserialize(deserializer)? {
                    Raw::Int(n) => Self(n.to_string()),
                    Raw::Text(s) => Self(s),
                })
            }
        }
    };
}

// Backend-issued job identifier
define_string_id!(PromptId);

// Key of a node inside a workflow graph
define_string_id!(NodeKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_accepts_integers_and_strings() {
        let from_int: NodeKey = serde_json::from_str("9").unwrap();
        let from_text: NodeKey = serde_json::from_str("\"9\"").unwrap();
        assert_eq!(from_int, from_text);
        assert_eq!(from_int.as_str(), "9");
    }

    #[test]
    fn prompt_id_serializes_as_plain_string() {
        let id = PromptId::new("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
        assert_eq!(id.to_string(), "abc-123");
    }
}
