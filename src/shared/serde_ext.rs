use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

pub fn parse_via_string<'de, D, T, F>(deserializer: D, kind: &str, parser: F) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    F: FnOnce(&str) -> Result<T, String>,
{
    let raw = String::deserialize(deserializer)?;
    parser(&raw).map_err(|err| D::Error::custom(format!("invalid {kind} `{raw}`: {err}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Number(u64),
    Text(String),
}

/// Accepts `7050`, `"7050"` or `""` (absent) for numeric form fields.
pub fn optional_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(StringOrNumber::Number(n)) => u32::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("number `{n}` is out of range"))),
        Some(StringOrNumber::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<u32>()
                .map(Some)
                .map_err(|err| D::Error::custom(format!("invalid number `{raw}`: {err}")))
        }
    }
}

/// Accepts numbers or strings and keeps the textual form, as form inputs are stored.
pub fn optional_text_from_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(StringOrNumber::Number(n)) => Some(n.to_string()),
        Some(StringOrNumber::Text(raw)) if raw.trim().is_empty() => None,
        Some(StringOrNumber::Text(raw)) => Some(raw),
    })
}
