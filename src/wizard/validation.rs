//! Form bookkeeping that turns raw selections into state-field errors.
//!
//! Nothing here returns `Err`: validation problems are recorded on the state
//! and block step completion instead.

use super::capabilities::{capability_version, CapabilitySelection, CHANNEL_2_0};
use super::model::{
    AclEntry, AclError, ChaincodePolicy, ChannelMember, Consenter, MspDefinition, Organization,
    PolicySelection, PolicyType, RaftNode,
};
use super::state::WizardState;
use super::units::parse_duration_ms;
use crate::config::TimeoutBounds;
use crate::shared::ids::ChannelName;
use std::collections::BTreeSet;

pub const ACL_POLICY_MARKER: &str = "/Channel/Application/";
pub const ADMIN_ROLE: &str = "admin";
/// Raft nodes hosted here get their signed TLS certs from the deployer.
pub const DEPLOYER_LOCATION: &str = "ibm_saas";

pub fn validate_channel_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    ChannelName::parse(trimmed).err()
}

/// MSP segment of `.../Channel/Application/<MSP>/<Role>`.
pub fn acl_policy_msp(definition: &str) -> Option<&str> {
    let start = definition.rfind(ACL_POLICY_MARKER)? + ACL_POLICY_MARKER.len();
    let rest = &definition[start..];
    let end = rest.rfind('/')?;
    let msp = &rest[..end];
    (!msp.is_empty()).then_some(msp)
}

pub fn verify_acl_policy_validity(org_ids: &[String], acls: &[AclEntry]) -> Vec<AclError> {
    acls.iter()
        .filter_map(|acl| {
            let msp = acl_policy_msp(&acl.definition)?;
            (!org_ids.iter().any(|org| org == msp)).then(|| AclError {
                definition: acl.definition.clone(),
                org: msp.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrganizationErrors {
    pub duplicate_msp: Option<String>,
    pub no_operator: Option<String>,
}

pub fn validate_organizations(orgs: &[Organization]) -> OrganizationErrors {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for org in orgs.iter().filter(|org| !org.msp.trim().is_empty()) {
        if !seen.insert(org.msp.as_str()) {
            duplicates.insert(org.msp.as_str());
        }
    }
    let duplicate_msp = (!duplicates.is_empty()).then(|| {
        format!(
            "organization listed more than once: {}",
            duplicates.into_iter().collect::<Vec<_>>().join(",")
        )
    });
    let no_operator = (!orgs.iter().any(Organization::is_admin))
        .then(|| "at least one organization needs the operator role".to_string());
    OrganizationErrors {
        duplicate_msp,
        no_operator,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopulatedOrgs {
    pub orgs: Vec<Organization>,
    pub missing_definitions: Vec<String>,
}

impl PopulatedOrgs {
    pub fn missing_definition_error(&self) -> Option<String> {
        if self.missing_definitions.is_empty() {
            return None;
        }
        Some(format!(
            "no msp definition found for: {}",
            self.missing_definitions.join(",")
        ))
    }
}

/// Turns existing channel members into editable orgs, borrowing host url and
/// node OU support from the MSP directory.
pub fn populate_channel_orgs(members: &[ChannelMember], msps: &[MspDefinition]) -> PopulatedOrgs {
    let mut populated = PopulatedOrgs::default();
    for member in members {
        let definition = msps.iter().find(|msp| msp.msp_id == member.id);
        if definition.is_none() {
            populated.missing_definitions.push(member.id.clone());
        }
        populated.orgs.push(Organization {
            msp: member.id.clone(),
            roles: member.roles.clone(),
            admins: member.admins.clone(),
            root_certs: member.root_certs.clone(),
            host_url: definition.and_then(|msp| msp.host_url.clone()),
            node_ou: definition.is_some_and(|msp| msp.node_ou),
        });
    }
    populated
}

/// `n of total` choices, one per admin org count.
pub fn update_policy_options(orgs: &[Organization]) -> Vec<PolicySelection> {
    let admins = orgs.iter().filter(|org| org.is_admin()).count() as u32;
    (1..=admins)
        .map(|n| PolicySelection { n, out_of: admins })
        .collect()
}

/// Policy preselected after the org list changes. During update initialisation
/// the channel's current policy wins; otherwise a single option is auto-picked.
pub fn initial_policy(
    options: &[PolicySelection],
    baseline: Option<PolicySelection>,
    during_init: bool,
) -> Option<PolicySelection> {
    if during_init {
        return baseline;
    }
    match options {
        [only] => Some(*only),
        _ => None,
    }
}

pub fn set_policy_type(policy: &ChaincodePolicy, policy_type: PolicyType) -> ChaincodePolicy {
    if policy_type == PolicyType::Specific {
        return ChaincodePolicy {
            policy_type,
            members: Vec::new(),
            n: None,
        };
    }
    ChaincodePolicy {
        policy_type,
        ..policy.clone()
    }
}

/// `n` stays within `1..=members`, defaults to 1 once members appear and is
/// cleared when the member list empties.
pub fn set_policy_members(
    policy: &ChaincodePolicy,
    members: Option<Vec<String>>,
    n: Option<u32>,
) -> ChaincodePolicy {
    let members = members.unwrap_or_else(|| policy.members.clone());
    let count = members.len() as u32;
    let n = match n.or(policy.n) {
        _ if count == 0 => None,
        Some(n) => Some(n.clamp(1, count)),
        None => Some(1),
    };
    ChaincodePolicy {
        policy_type: policy.policy_type,
        members,
        n,
    }
}

/// Empty input is valid; anything else must parse and fall inside the bounds.
pub fn validate_timeout(value: &str, bounds: &TimeoutBounds) -> bool {
    if value.trim().is_empty() {
        return true;
    }
    let (Some(timeout), Some(min), Some(max)) = (
        parse_duration_ms(value),
        parse_duration_ms(&bounds.min),
        parse_duration_ms(&bounds.max),
    ) else {
        return false;
    };
    (min..=max).contains(&timeout)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RaftConsenters {
    pub consenters: Vec<Consenter>,
    pub needs_deployer_certs: bool,
    pub outdated_definition: bool,
}

/// Consenter candidates from an orderer's raft list. Nodes missing a TLS cert
/// either need the deployer or mark the imported definition as outdated.
pub fn consenters_from_raft(nodes: &[RaftNode]) -> RaftConsenters {
    let mut result = RaftConsenters::default();
    for node in nodes {
        let has_cert = node
            .client_tls_cert
            .as_deref()
            .is_some_and(|cert| !cert.is_empty());
        if !has_cert {
            if node.location.as_deref() == Some(DEPLOYER_LOCATION) {
                result.needs_deployer_certs = true;
            } else {
                result.outdated_definition = true;
            }
        }
        result.consenters.push(node.to_consenter());
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeployerCerts {
    pub consenters: Vec<Consenter>,
    pub tls_unavailable: bool,
}

/// Copies deployer-signed certs onto matching consenters. Nodes the deployer
/// could not sign a server cert for are dropped.
pub fn apply_deployer_certs(mut consenters: Vec<Consenter>, signed: &[RaftNode]) -> DeployerCerts {
    let mut tls_unavailable = false;
    for node in signed {
        let Some(index) = consenters
            .iter()
            .position(|consenter| consenter.name == node.display_name)
        else {
            continue;
        };
        if node.client_tls_cert.is_some() {
            consenters[index].client_tls_cert = node.client_tls_cert.clone();
            consenters[index].server_tls_cert = node.server_tls_cert.clone();
        }
        if node.server_tls_cert.is_none() {
            consenters.retain(|consenter| consenter.address() != node.backend_addr);
            tls_unavailable = true;
        }
    }
    DeployerCerts {
        consenters,
        tls_unavailable,
    }
}

/// Whether the creator's MSP is an admin member of the channel as originally loaded.
pub fn is_channel_admin(original_orgs: &[Organization], creator: &MspDefinition) -> bool {
    original_orgs.iter().any(|org| {
        org.msp == creator.msp_id && creator.shares_root_cert(&org.root_certs) && org.is_admin()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityWarnings {
    pub channel_warning_20: bool,
    pub nodeou_warning: bool,
}

fn selection_at_least_2_0(selection: &CapabilitySelection) -> bool {
    selection
        .explicit()
        .and_then(capability_version)
        .is_some_and(|version| version >= CHANNEL_2_0)
}

/// Channel 2.0 needs an orderer at 2.0; application 2.0 needs node OUs on every org.
pub fn capability_warnings(state: &WizardState) -> CapabilityWarnings {
    let selected = &state.selected_capabilities;
    let orderer_2_0 = match selected.orderer.explicit() {
        Some(id) => capability_version(id).is_some_and(|version| version >= CHANNEL_2_0),
        None => state
            .baseline
            .capabilities
            .orderer
            .as_ref()
            .and_then(capability_version)
            .is_some_and(|version| version >= CHANNEL_2_0),
    };
    CapabilityWarnings {
        channel_warning_20: selection_at_least_2_0(&selected.channel) && !orderer_2_0,
        nodeou_warning: selection_at_least_2_0(&selected.application)
            && state
                .orgs
                .iter()
                .any(|org| !org.msp.is_empty() && !org.node_ou),
    }
}

/// Warning for an out-of-bounds batch timeout while the block defaults are
/// overridden. Does not gate completion.
pub fn block_timeout_error(state: &WizardState, bounds: &TimeoutBounds) -> Option<String> {
    let timeout = state.block_params.timeout.as_deref().unwrap_or_default();
    if !state.override_defaults || validate_timeout(timeout, bounds) {
        return None;
    }
    Some(format!(
        "timeout must be between {} and {}",
        bounds.min, bounds.max
    ))
}

/// Re-runs every form check and writes the results onto `state`.
pub fn refresh_validation(state: &mut WizardState, bounds: &TimeoutBounds) {
    state.channel_name_error = validate_channel_name(&state.channel_name);
    state.block_timeout_error = block_timeout_error(state, bounds);
    let org_errors = validate_organizations(&state.orgs);
    state.duplicate_msp_error = org_errors.duplicate_msp;
    state.no_operator_error = org_errors.no_operator;
    let org_ids: Vec<String> = state.orgs.iter().map(|org| org.msp.clone()).collect();
    state.acl_errors = verify_acl_policy_validity(&org_ids, &state.acls);
    let warnings = capability_warnings(state);
    state.channel_warning_20 = warnings.channel_warning_20;
    state.nodeou_warning = warnings.nodeou_warning;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acl(resource: &str, definition: &str) -> AclEntry {
        AclEntry {
            resource: resource.to_string(),
            definition: definition.to_string(),
        }
    }

    #[test]
    fn acl_policy_msp_takes_segment_before_role() {
        assert_eq!(
            acl_policy_msp("/Channel/Application/Org1MSP/Admins"),
            Some("Org1MSP")
        );
        assert_eq!(acl_policy_msp("/Channel/Application/Writers"), None);
        assert_eq!(acl_policy_msp("/Channel/Orderer/Admins"), None);
    }

    #[test]
    fn acl_referencing_non_member_is_an_error() {
        let errors = verify_acl_policy_validity(
            &["Org1MSP".to_string()],
            &[
                acl("lscc/Deploy", "/Channel/Application/Org1MSP/Admins"),
                acl("qscc/GetBlockByNumber", "/Channel/Application/Org2MSP/Readers"),
                acl("peer/Propose", "/Channel/Application/Writers"),
            ],
        );
        assert_eq!(
            errors,
            vec![AclError {
                definition: "/Channel/Application/Org2MSP/Readers".to_string(),
                org: "Org2MSP".to_string(),
            }]
        );
    }

    #[test]
    fn members_clamp_and_default_n() {
        let policy = ChaincodePolicy {
            policy_type: PolicyType::Specific,
            members: vec!["A".into(), "B".into(), "C".into()],
            n: Some(3),
        };
        let clamped = set_policy_members(&policy, Some(vec!["A".into()]), None);
        assert_eq!(clamped.n, Some(1));

        let fresh = set_policy_type(&policy, PolicyType::Specific);
        assert!(fresh.members.is_empty());
        let defaulted = set_policy_members(&fresh, Some(vec!["A".into(), "B".into()]), None);
        assert_eq!(defaulted.n, Some(1));
    }

    #[test]
    fn requested_n_never_exceeds_member_count() {
        let fresh = set_policy_type(&ChaincodePolicy::default(), PolicyType::Specific);
        let capped = set_policy_members(&fresh, Some(vec!["A".into(), "B".into()]), Some(5));
        assert_eq!(capped.n, Some(2));
        assert!(capped.is_satisfiable());

        let raised = set_policy_members(&capped, None, Some(0));
        assert_eq!(raised.n, Some(1));

        let emptied = set_policy_members(&capped, Some(Vec::new()), Some(2));
        assert_eq!(emptied.n, None);
        assert!(!emptied.is_satisfiable());
    }

    #[test]
    fn timeout_must_sit_inside_bounds() {
        let bounds = TimeoutBounds::default();
        assert!(validate_timeout("", &bounds));
        assert!(validate_timeout("2s", &bounds));
        assert!(!validate_timeout("100ms", &bounds));
        assert!(!validate_timeout("11s", &bounds));
        assert!(!validate_timeout("soon", &bounds));
    }
}
