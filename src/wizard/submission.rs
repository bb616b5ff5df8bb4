//! Request payloads for the channel transaction backend.
//!
//! Field names are fixed by the backend's JSON schema, so the structs below
//! serialize exactly as the backend expects them (including `isAdmin`).

use super::capabilities::{capability_version, CapabilitySelection, CHANNEL_2_0};
use super::model::{
    ChaincodePolicy, Consenter, MspDefinition, Organization, OrdererOrg, PolicyType,
};
use super::predicates::{
    is_any_block_param_modified, is_any_raft_param_modified, is_capability_at_least_2_0,
    is_consenter_set_modified,
};
use super::state::WizardState;
use super::units::{parse_byte_size, parse_leading_integer};
use super::validation::is_channel_admin;
use crate::config::Settings;
use crate::shared::ids::CapabilityId;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("no orderer selected")]
    MissingOrderer,
    #[error("no channel creator msp selected")]
    MissingChannelCreator,
    #[error("channel review is not complete")]
    ReviewIncomplete,
    #[error("default application capability `{value}` is invalid: {reason}")]
    InvalidDefaultCapability { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MspEntry {
    pub msp_id: String,
    pub roles: Vec<String>,
    pub host_url: Option<String>,
    pub admins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msp_definition: Option<MspDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrdererMspEntry {
    pub msp_id: String,
    pub admins: Vec<String>,
    pub host_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockParamsPayload {
    pub absolute_max_bytes: Option<u64>,
    pub max_message_count: Option<u64>,
    pub preferred_max_bytes: Option<u64>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaftParamsPayload {
    pub snapshot_interval_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChaincodePolicyPayload {
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub members: Vec<String>,
    pub n: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateChannelRequest {
    pub channel_id: String,
    pub org_msp_id: String,
    pub application_msps: BTreeMap<String, MspEntry>,
    pub orderer_url: String,
    pub all_orderer_urls: Vec<String>,
    pub orderer_msp: String,
    pub client_cert_b64pem: Option<String>,
    pub client_prv_key_b64pem: Option<String>,
    pub configtxlator_url: Option<String>,
    pub acls: BTreeMap<String, String>,
    pub n_out_of: u32,
    pub orderer_msps: Vec<OrdererMspEntry>,
    pub block_params: Option<BlockParamsPayload>,
    pub raft_params: Option<RaftParamsPayload>,
    pub consenters: Vec<Consenter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_capabilities: Option<Vec<CapabilityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_capabilities: Option<Vec<CapabilityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderer_capabilities: Option<Vec<CapabilityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_policy: Option<ChaincodePolicyPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endorsement_policy: Option<ChaincodePolicyPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateChannelRequest {
    pub channel_id: String,
    pub msp_id: String,
    pub existing_application_msps: BTreeMap<String, MspEntry>,
    pub updated_application_msps: BTreeMap<String, MspEntry>,
    pub existing_orderer_msps: BTreeMap<String, MspEntry>,
    pub updated_orderer_msps: BTreeMap<String, MspEntry>,
    pub orderer_msps: Vec<OrdererMspEntry>,
    pub orderer_host: String,
    pub acls: BTreeMap<String, String>,
    pub client_cert_b64pem: Option<String>,
    pub client_prv_key_b64pem: Option<String>,
    pub configtxlator_url: Option<String>,
    pub n_out_of: u32,
    pub block_params: Option<BlockParamsPayload>,
    pub raft_params: Option<RaftParamsPayload>,
    pub channel_capabilities: Option<Vec<CapabilityId>>,
    pub application_capabilities: Option<Vec<CapabilityId>>,
    pub orderer_capabilities: Option<Vec<CapabilityId>>,
    pub consenters: Vec<Consenter>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_policy: Option<ChaincodePolicyPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endorsement_policy: Option<ChaincodePolicyPayload>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn block_params_payload(state: &WizardState) -> Option<BlockParamsPayload> {
    if !is_any_block_param_modified(state) {
        return None;
    }
    let params = &state.block_params;
    Some(BlockParamsPayload {
        absolute_max_bytes: non_empty(params.absolute_max_bytes.as_deref())
            .and_then(parse_byte_size),
        max_message_count: non_empty(params.max_message_count.as_deref())
            .and_then(parse_leading_integer),
        preferred_max_bytes: non_empty(params.preferred_max_bytes.as_deref())
            .and_then(parse_byte_size),
        timeout: non_empty(params.timeout.as_deref()).map(str::to_string),
    })
}

pub fn raft_params_payload(state: &WizardState) -> Option<RaftParamsPayload> {
    if !is_any_raft_param_modified(state) {
        return None;
    }
    Some(RaftParamsPayload {
        snapshot_interval_size: non_empty(state.raft_params.snapshot_interval_size.as_deref())
            .and_then(parse_byte_size),
    })
}

/// A SPECIFIC policy with nobody in it is sent as MAJORITY.
pub fn chaincode_policy_payload(policy: &ChaincodePolicy) -> ChaincodePolicyPayload {
    if policy.policy_type != PolicyType::Specific || policy.members.is_empty() {
        return ChaincodePolicyPayload {
            policy_type: PolicyType::Majority,
            members: Vec::new(),
            n: String::new(),
        };
    }
    ChaincodePolicyPayload {
        policy_type: PolicyType::Specific,
        members: policy.members.clone(),
        n: policy.n.map(|n| n.to_string()).unwrap_or_default(),
    }
}

fn acl_map(state: &WizardState) -> BTreeMap<String, String> {
    state
        .acls
        .iter()
        .map(|acl| (acl.resource.clone(), acl.definition.clone()))
        .collect()
}

fn orderer_msps(state: &WizardState) -> Vec<OrdererMspEntry> {
    state
        .selected_orderer_msp
        .iter()
        .filter_map(|msp| {
            let host_url = msp.host_url.as_deref().filter(|url| !url.is_empty())?;
            Some(OrdererMspEntry {
                msp_id: msp.msp_id.clone(),
                admins: msp.admins.clone(),
                host_url: host_url.to_string(),
            })
        })
        .collect()
}

fn matching_definition(
    msps: &[MspDefinition],
    msp_id: &str,
    root_certs: &[String],
) -> Option<MspDefinition> {
    msps.iter()
        .find(|msp| msp.msp_id == msp_id && msp.shares_root_cert(root_certs))
        .cloned()
}

fn org_entry(org: &Organization) -> MspEntry {
    MspEntry {
        msp_id: org.msp.clone(),
        roles: org.roles.clone(),
        host_url: org.host_url.clone(),
        admins: org.admins.clone(),
        msp_definition: None,
    }
}

fn application_msps(orgs: &[Organization]) -> BTreeMap<String, MspEntry> {
    orgs.iter()
        .filter(|org| !org.msp.is_empty())
        .map(|org| (org.msp.clone(), org_entry(org)))
        .collect()
}

fn explicit_list(selection: &CapabilitySelection) -> Option<Vec<CapabilityId>> {
    selection.explicit().map(|id| vec![id.clone()])
}

/// Explicit selections that differ from what the channel already runs.
fn changed_list(
    selection: &CapabilitySelection,
    baseline: Option<&CapabilityId>,
) -> Option<Vec<CapabilityId>> {
    selection
        .differs_from(baseline)
        .then(|| explicit_list(selection))
        .flatten()
}

/// Raft addresses the new channel should know about. When the consenter set
/// was edited, only advertised nodes that are still selected are kept.
fn create_orderer_urls(state: &WizardState) -> Vec<String> {
    let Some(orderer) = &state.selected_orderer else {
        return Vec::new();
    };
    let Some(raft) = &orderer.raft else {
        return vec![orderer.backend_addr.clone()];
    };
    if !is_consenter_set_modified(state) {
        return raft.iter().map(|node| node.backend_addr.clone()).collect();
    }
    raft.iter()
        .filter(|node| {
            state.consenters.iter().any(|consenter| {
                consenter.address() == node.backend_addr && consenter.name == node.display_name
            })
        })
        .map(|node| node.backend_addr.clone())
        .collect()
}

fn default_application_capability(settings: &Settings) -> Result<CapabilityId, SubmissionError> {
    CapabilityId::parse(&settings.default_application_capability).map_err(|reason| {
        SubmissionError::InvalidDefaultCapability {
            value: settings.default_application_capability.clone(),
            reason,
        }
    })
}

pub fn build_create_request(
    state: &WizardState,
    settings: &Settings,
) -> Result<CreateChannelRequest, SubmissionError> {
    let orderer = state
        .selected_orderer
        .as_ref()
        .ok_or(SubmissionError::MissingOrderer)?;
    let creator = state
        .selected_channel_creator
        .as_ref()
        .ok_or(SubmissionError::MissingChannelCreator)?;
    let application = match state.selected_capabilities.application.explicit() {
        Some(id) => id.clone(),
        None => default_application_capability(settings)?,
    };
    let channel_2_0 = capability_version(&application).is_some_and(|version| version >= CHANNEL_2_0);

    Ok(CreateChannelRequest {
        channel_id: state.channel_name.trim().to_string(),
        org_msp_id: creator.msp_id.clone(),
        application_msps: application_msps(&state.orgs),
        orderer_url: orderer.url2use.clone(),
        all_orderer_urls: create_orderer_urls(state),
        orderer_msp: orderer.msp_id.clone(),
        client_cert_b64pem: state.selected_identity.as_ref().map(|id| id.cert.clone()),
        client_prv_key_b64pem: state
            .selected_identity
            .as_ref()
            .and_then(|id| id.private_key.clone()),
        configtxlator_url: settings.configtxlator_url.clone(),
        acls: acl_map(state),
        n_out_of: state.custom_policy.map_or(1, |policy| policy.n),
        orderer_msps: orderer_msps(state),
        block_params: block_params_payload(state),
        raft_params: raft_params_payload(state),
        consenters: if state.use_default_consenters {
            Vec::new()
        } else {
            state.consenters.clone()
        },
        application_capabilities: Some(vec![application]),
        channel_capabilities: explicit_list(&state.selected_capabilities.channel),
        orderer_capabilities: explicit_list(&state.selected_capabilities.orderer),
        lifecycle_policy: channel_2_0.then(|| chaincode_policy_payload(&state.lifecycle_policy)),
        endorsement_policy: channel_2_0
            .then(|| chaincode_policy_payload(&state.endorsement_policy)),
    })
}

fn existing_entry(
    msps: &[MspDefinition],
    id: &str,
    roles: &[String],
    admins: &[String],
    root_certs: &[String],
    host_url: &Option<String>,
) -> MspEntry {
    let host_url = matching_definition(msps, id, root_certs)
        .map(|msp| msp.host_url)
        .unwrap_or_else(|| host_url.clone());
    MspEntry {
        msp_id: id.to_string(),
        roles: roles.to_vec(),
        host_url,
        admins: admins.to_vec(),
        msp_definition: None,
    }
}

fn updated_orderer_entry(msps: &[MspDefinition], org: &OrdererOrg) -> MspEntry {
    MspEntry {
        msp_id: org.msp_id.clone(),
        roles: org.roles.clone(),
        host_url: org.host_url.clone(),
        admins: org.admins.clone(),
        msp_definition: matching_definition(msps, &org.msp_id, &org.root_certs),
    }
}

/// `orderer_host` comes from the orderer registry, see
/// [`crate::wizard::collaborators::OrdererRegistry::resolve_orderer_url`].
pub fn build_update_request(
    state: &WizardState,
    settings: &Settings,
    orderer_host: &str,
) -> Result<UpdateChannelRequest, SubmissionError> {
    let creator = state
        .selected_channel_creator
        .as_ref()
        .ok_or(SubmissionError::MissingChannelCreator)?;
    let baseline = &state.baseline;
    let existing = &baseline.capabilities;
    let selected = &state.selected_capabilities;

    let existing_application_msps = baseline
        .members
        .iter()
        .map(|member| {
            let entry = existing_entry(
                &state.msps,
                &member.id,
                &member.roles,
                &member.admins,
                &member.root_certs,
                &member.host_url,
            );
            (member.id.clone(), entry)
        })
        .collect();
    let existing_orderer_msps = baseline
        .orderer_orgs
        .iter()
        .map(|org| {
            let entry = existing_entry(
                &state.msps,
                &org.msp_id,
                &org.roles,
                &org.admins,
                &org.root_certs,
                &org.host_url,
            );
            (org.msp_id.clone(), entry)
        })
        .collect();
    let updated_application_msps = state
        .orgs
        .iter()
        .filter(|org| !org.msp.is_empty())
        .map(|org| {
            let mut entry = org_entry(org);
            entry.msp_definition = matching_definition(&state.msps, &org.msp, &org.root_certs);
            (org.msp.clone(), entry)
        })
        .collect();
    let updated_orderer_msps = state
        .orderer_orgs
        .iter()
        .filter(|org| !org.msp_id.is_empty())
        .map(|org| (org.msp_id.clone(), updated_orderer_entry(&state.msps, org)))
        .collect();

    let include_policies = selected
        .application
        .explicit()
        .is_some_and(|id| is_capability_at_least_2_0(Some(id)))
        || is_capability_at_least_2_0(existing.application.as_ref());

    Ok(UpdateChannelRequest {
        channel_id: state.channel_name.trim().to_string(),
        msp_id: creator.msp_id.clone(),
        existing_application_msps,
        updated_application_msps,
        existing_orderer_msps,
        updated_orderer_msps,
        orderer_msps: orderer_msps(state),
        orderer_host: orderer_host.to_string(),
        acls: acl_map(state),
        client_cert_b64pem: state.selected_identity.as_ref().map(|id| id.cert.clone()),
        client_prv_key_b64pem: state
            .selected_identity
            .as_ref()
            .and_then(|id| id.private_key.clone()),
        configtxlator_url: settings.configtxlator_url.clone(),
        n_out_of: state
            .custom_policy
            .or(baseline.n_out_of)
            .map_or(1, |policy| policy.n),
        block_params: block_params_payload(state),
        raft_params: raft_params_payload(state),
        channel_capabilities: changed_list(&selected.channel, existing.channel.as_ref()),
        application_capabilities: changed_list(
            &selected.application,
            existing.application.as_ref(),
        ),
        orderer_capabilities: changed_list(&selected.orderer, existing.orderer.as_ref()),
        consenters: if is_consenter_set_modified(state) {
            state.consenters.clone()
        } else {
            Vec::new()
        },
        is_admin: is_channel_admin(&state.original_orgs, creator),
        lifecycle_policy: include_policies
            .then(|| chaincode_policy_payload(&state.lifecycle_policy)),
        endorsement_policy: include_policies
            .then(|| chaincode_policy_payload(&state.endorsement_policy)),
    })
}
