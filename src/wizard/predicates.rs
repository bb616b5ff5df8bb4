//! Derived flags computed from the wizard state.
//!
//! Every function here is pure. Navigation and completion call them afresh on
//! each decision; nothing is cached between state changes.

use super::capabilities::{
    capability_version, CapabilitySelection, CHANNEL_2_0, MIN_CONSENTER_UPDATE_VERSION,
};
use super::state::WizardState;
use super::units::{parse_byte_size, parse_duration_ms};
use crate::shared::ids::CapabilityId;
use std::collections::BTreeSet;

pub fn is_any_capability_modified(state: &WizardState) -> bool {
    let selected = &state.selected_capabilities;
    if !state.is_update() {
        return selected.orderer.is_explicit() || selected.channel.is_explicit();
    }
    let existing = &state.baseline.capabilities;
    selected.orderer.differs_from(existing.orderer.as_ref())
        || selected.channel.differs_from(existing.channel.as_ref())
}

fn byte_field_changed(current: Option<&str>, baseline: Option<&str>) -> bool {
    match current.filter(|value| !value.trim().is_empty()) {
        None => false,
        Some(current) => parse_byte_size(current) != baseline.and_then(parse_byte_size),
    }
}

fn duration_field_changed(current: Option<&str>, baseline: Option<&str>) -> bool {
    match current.filter(|value| !value.trim().is_empty()) {
        None => false,
        Some(current) => parse_duration_ms(current) != baseline.and_then(parse_duration_ms),
    }
}

fn count_field_changed(current: Option<&str>, baseline: Option<&str>) -> bool {
    match current.map(str::trim).filter(|value| !value.is_empty()) {
        None => false,
        Some(current) => {
            let baseline = baseline.map(str::trim);
            match (current.parse::<u64>(), baseline.map(str::parse::<u64>)) {
                (Ok(current), Some(Ok(baseline))) => current != baseline,
                _ => Some(current) != baseline,
            }
        }
    }
}

pub fn is_any_block_param_modified(state: &WizardState) -> bool {
    if !state.is_update() {
        return state.override_defaults;
    }
    let current = &state.block_params;
    let baseline = &state.baseline.block_params;
    byte_field_changed(
        current.absolute_max_bytes.as_deref(),
        baseline.absolute_max_bytes.as_deref(),
    ) || count_field_changed(
        current.max_message_count.as_deref(),
        baseline.max_message_count.as_deref(),
    ) || byte_field_changed(
        current.preferred_max_bytes.as_deref(),
        baseline.preferred_max_bytes.as_deref(),
    ) || duration_field_changed(current.timeout.as_deref(), baseline.timeout.as_deref())
}

pub fn is_any_raft_param_modified(state: &WizardState) -> bool {
    if !state.is_update() {
        return !state.use_default_consenters && state.override_raft_defaults;
    }
    byte_field_changed(
        state.raft_params.snapshot_interval_size.as_deref(),
        state.baseline.raft_params.snapshot_interval_size.as_deref(),
    )
}

/// Adds plus removals between the selected and baseline consenter sets, keyed by `host:port`.
pub fn consenter_update_count(state: &WizardState) -> usize {
    let selected: BTreeSet<String> = state.consenters.iter().map(|c| c.address()).collect();
    let existing: BTreeSet<String> = state
        .baseline
        .consenters
        .iter()
        .map(|c| c.address())
        .collect();
    selected.symmetric_difference(&existing).count()
}

pub fn is_consenter_set_modified(state: &WizardState) -> bool {
    if state.use_default_consenters {
        return false;
    }
    consenter_update_count(state) > 0
}

pub fn is_admins_modified(state: &WizardState) -> bool {
    if !state.is_update() {
        return false;
    }
    let existing = &state.baseline.orderer_orgs;
    let current = &state.orderer_orgs;
    if existing.len() != current.len() {
        return true;
    }
    existing
        .iter()
        .any(|admin| !current.iter().any(|org| org.msp_id == admin.msp_id))
}

pub fn can_modify_consenters(state: &WizardState) -> bool {
    if !state.features.scale_raft_nodes_enabled {
        return false;
    }
    if !state.is_update() {
        return true;
    }
    state
        .baseline
        .capabilities
        .orderer
        .as_ref()
        .and_then(capability_version)
        .is_some_and(|version| version >= MIN_CONSENTER_UPDATE_VERSION)
}

pub fn is_higher_capability_available(state: &WizardState) -> bool {
    state.features.capabilities_enabled && !state.available_capabilities.is_empty()
}

/// Application capability in effect: the baseline when updating, the selection when creating.
pub fn effective_application_capability(state: &WizardState) -> Option<&CapabilityId> {
    if state.is_update() {
        return state.baseline.capabilities.application.as_ref();
    }
    match &state.selected_capabilities.application {
        CapabilitySelection::Explicit(id) => Some(id),
        CapabilitySelection::UseDefault => None,
    }
}

pub fn is_capability_at_least_2_0(id: Option<&CapabilityId>) -> bool {
    id.and_then(capability_version)
        .is_some_and(|version| version >= CHANNEL_2_0)
}

pub fn is_channel_2_0(state: &WizardState) -> bool {
    is_capability_at_least_2_0(effective_application_capability(state))
}

pub fn is_orderer_signature_needed(state: &WizardState) -> bool {
    is_any_capability_modified(state)
        || is_any_block_param_modified(state)
        || is_consenter_set_modified(state)
        || is_admins_modified(state)
        || is_any_raft_param_modified(state)
}

/// The four predicates that gate navigation, derived in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatingFlags {
    pub higher_capability_available: bool,
    pub channel_2_0: bool,
    pub can_modify_consenters: bool,
    pub orderer_signature_needed: bool,
}

impl GatingFlags {
    pub fn derive(state: &WizardState) -> Self {
        Self {
            higher_capability_available: is_higher_capability_available(state),
            channel_2_0: is_channel_2_0(state),
            can_modify_consenters: can_modify_consenters(state),
            orderer_signature_needed: is_orderer_signature_needed(state),
        }
    }
}
