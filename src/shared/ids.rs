use crate::shared::serde_ext::parse_via_string;
use serde::{Deserialize, Deserializer, Serialize};

const CHANNEL_NAME_MAX_LEN: usize = 249;

pub fn validate_channel_name_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value.len() > CHANNEL_NAME_MAX_LEN {
        return Err(format!(
            "{kind} must be at most {CHANNEL_NAME_MAX_LEN} characters"
        ));
    }
    let mut chars = value.chars();
    if !chars.next().is_some_and(|ch| ch.is_ascii_lowercase()) {
        return Err(format!("{kind} must start with a lowercase letter"));
    }
    if chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '.' || ch == '-') {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only lowercase ASCII letters, digits, '.' or '-'"
    ))
}

pub fn validate_capability_value(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{kind} must be non-empty"));
    }
    if value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
    {
        return Ok(());
    }
    Err(format!(
        "{kind} must use only ASCII letters, digits, '_' or '.'"
    ))
}

macro_rules! define_id_type {
    ($name:ident, $kind:literal, $validator:path) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                $validator($kind, raw)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                parse_via_string(deserializer, $kind, Self::parse)
            }
        }
    };
}

define_id_type!(ChannelName, "channel name", validate_channel_name_value);
define_id_type!(CapabilityId, "capability id", validate_capability_value);
