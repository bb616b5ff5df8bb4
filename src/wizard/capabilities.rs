use crate::config::CapabilityCatalog;
use crate::shared::ids::CapabilityId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;

pub const USE_DEFAULT: &str = "use_default";

/// Version triple pulled out of a capability id such as `V1_4_2` or `V2_0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapabilityVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CapabilityVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Loose coercion: underscores become dots, the first numeric run is taken
    /// and missing components are zero. `V1_4_2` -> 1.4.2, `V2_0` -> 2.0.0.
    pub fn coerce(raw: &str) -> Option<Self> {
        let normalized = raw.replace('_', ".");
        let start = normalized.find(|ch: char| ch.is_ascii_digit())?;
        let mut parts = [0u32; 3];
        let mut seen = 0usize;
        for piece in normalized[start..].split('.') {
            if seen == parts.len() {
                break;
            }
            let digits: String = piece.chars().take_while(|ch| ch.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            parts[seen] = digits.parse().ok()?;
            seen += 1;
            if digits.len() != piece.len() {
                break;
            }
        }
        Some(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl std::fmt::Display for CapabilityVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub const CHANNEL_2_0: CapabilityVersion = CapabilityVersion::new(2, 0, 0);
pub const MIN_CONSENTER_UPDATE_VERSION: CapabilityVersion = CapabilityVersion::new(1, 4, 2);

pub fn capability_version(id: &CapabilityId) -> Option<CapabilityVersion> {
    CapabilityVersion::coerce(id.as_str())
}

pub fn compare_capabilities(left: &CapabilityId, right: &CapabilityId) -> Option<Ordering> {
    Some(capability_version(left)?.cmp(&capability_version(right)?))
}

/// A capability dropdown value: either "leave the default" or a concrete id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CapabilitySelection {
    #[default]
    UseDefault,
    Explicit(CapabilityId),
}

impl CapabilitySelection {
    pub fn explicit(&self) -> Option<&CapabilityId> {
        match self {
            Self::UseDefault => None,
            Self::Explicit(id) => Some(id),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }

    /// True when an explicit choice differs from `baseline`; an absent baseline counts as different.
    pub fn differs_from(&self, baseline: Option<&CapabilityId>) -> bool {
        match (self.explicit(), baseline) {
            (None, _) => false,
            (Some(selected), Some(baseline)) => selected != baseline,
            (Some(_), None) => true,
        }
    }
}

impl Serialize for CapabilitySelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::UseDefault => serializer.serialize_str(USE_DEFAULT),
            Self::Explicit(id) => serializer.serialize_str(id.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for CapabilitySelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") | Some(USE_DEFAULT) => Ok(Self::UseDefault),
            Some(value) => CapabilityId::parse(value)
                .map(Self::Explicit)
                .map_err(|err| D::Error::custom(format!("invalid capability `{value}`: {err}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySelections {
    pub channel: CapabilitySelection,
    pub orderer: CapabilitySelection,
    pub application: CapabilitySelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableCapabilities {
    pub channel: Vec<CapabilityId>,
    pub orderer: Vec<CapabilityId>,
    pub application: Vec<CapabilityId>,
}

impl AvailableCapabilities {
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty() && self.orderer.is_empty() && self.application.is_empty()
    }
}

/// Capabilities the channel currently runs with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExistingCapabilities {
    pub channel: Option<CapabilityId>,
    pub orderer: Option<CapabilityId>,
    pub application: Option<CapabilityId>,
}

/// Keeps only candidates at or above `current`. Upgrades are monotonic.
pub fn filter_capabilities(
    candidates: &[CapabilityId],
    current: Option<&CapabilityId>,
) -> Vec<CapabilityId> {
    let Some(current) = current.and_then(capability_version) else {
        return candidates.to_vec();
    };
    candidates
        .iter()
        .filter(|candidate| capability_version(candidate).is_some_and(|version| version >= current))
        .cloned()
        .collect()
}

/// Lists offered in the capabilities step. Update mode filters against the baseline.
pub fn available_capabilities(
    catalog: &CapabilityCatalog,
    existing: Option<&ExistingCapabilities>,
) -> AvailableCapabilities {
    match existing {
        None => AvailableCapabilities {
            channel: catalog.channel.clone(),
            orderer: catalog.orderer.clone(),
            application: catalog.application.clone(),
        },
        Some(existing) => AvailableCapabilities {
            channel: filter_capabilities(&catalog.channel, existing.channel.as_ref()),
            orderer: filter_capabilities(&catalog.orderer, existing.orderer.as_ref()),
            application: filter_capabilities(&catalog.application, existing.application.as_ref()),
        },
    }
}

/// Update mode starts every dropdown on the channel's current value.
pub fn selections_from_existing(existing: &ExistingCapabilities) -> CapabilitySelections {
    let pick = |id: &Option<CapabilityId>| {
        id.clone()
            .map(CapabilitySelection::Explicit)
            .unwrap_or_default()
    };
    CapabilitySelections {
        channel: pick(&existing.channel),
        orderer: pick(&existing.orderer),
        application: pick(&existing.application),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> CapabilityId {
        CapabilityId::parse(raw).expect("capability id")
    }

    #[test]
    fn coerce_reads_underscored_and_dotted_ids() {
        assert_eq!(
            CapabilityVersion::coerce("V1_4_2"),
            Some(CapabilityVersion::new(1, 4, 2))
        );
        assert_eq!(
            CapabilityVersion::coerce("V2_0"),
            Some(CapabilityVersion::new(2, 0, 0))
        );
        assert_eq!(
            CapabilityVersion::coerce("V1.3"),
            Some(CapabilityVersion::new(1, 3, 0))
        );
        assert_eq!(CapabilityVersion::coerce("none"), None);
    }

    #[test]
    fn selection_deserializes_sentinel_and_null_as_default() {
        let parsed: Vec<CapabilitySelection> =
            serde_json::from_str(r#"[null, "use_default", "V2_0"]"#).expect("parse selections");
        assert_eq!(
            parsed,
            vec![
                CapabilitySelection::UseDefault,
                CapabilitySelection::UseDefault,
                CapabilitySelection::Explicit(id("V2_0")),
            ]
        );
    }

    #[test]
    fn differs_from_ignores_default_selection() {
        assert!(!CapabilitySelection::UseDefault.differs_from(Some(&id("V1_4_2"))));
        assert!(CapabilitySelection::Explicit(id("V2_0")).differs_from(Some(&id("V1_4_2"))));
        assert!(!CapabilitySelection::Explicit(id("V2_0")).differs_from(Some(&id("V2_0"))));
    }
}
