use super::predicates::{consenter_update_count, is_orderer_signature_needed};
use super::state::WizardState;
use super::step::WizardStep;
use std::collections::BTreeSet;

pub type CompletedSteps = BTreeSet<WizardStep>;

fn channel_details_complete(state: &WizardState) -> bool {
    !state.channel_name.trim().is_empty()
        && state.channel_name_error.is_none()
        && !state.is_orderer_unavailable
        && !state.checking_orderer_status
        && state.selected_orderer.is_some()
}

fn organizations_complete(state: &WizardState) -> bool {
    state.no_operator_error.is_none()
        && state.duplicate_msp_error.is_none()
        && state.missing_definition_error.is_none()
        && state.orgs.iter().all(|org| !org.msp.trim().is_empty())
}

pub fn org_signature_ready(state: &WizardState) -> bool {
    state
        .selected_identity
        .as_ref()
        .is_some_and(|identity| identity.can_sign())
        && state.selected_channel_creator.is_some()
}

fn orderer_signature_complete(state: &WizardState) -> bool {
    !is_orderer_signature_needed(state) || state.selected_orderer_msp.is_some()
}

fn consenter_set_complete(state: &WizardState) -> bool {
    if state.invalid_consenter {
        return false;
    }
    if state.is_update() {
        consenter_update_count(state) < 2 && !state.consenters.is_empty()
    } else {
        state.use_default_consenters || !state.consenters.is_empty()
    }
}

fn update_capabilities_selected(state: &WizardState) -> bool {
    let selected = &state.selected_capabilities;
    selected.orderer.is_explicit()
        && selected.channel.is_explicit()
        && selected.application.is_explicit()
}

/// Whether `step` has everything it needs. Pure; bookkeeping lives in
/// [`reconcile_completed_steps`].
pub fn is_step_complete(step: WizardStep, state: &WizardState) -> bool {
    match step {
        WizardStep::Prerequisites => true,
        WizardStep::ChannelDetails => channel_details_complete(state),
        WizardStep::ChannelOrganizations => organizations_complete(state),
        WizardStep::ChannelUpdatePolicy => state.custom_policy.is_some(),
        WizardStep::OrganizationCreatingChannel | WizardStep::OrganizationUpdatingChannel => {
            org_signature_ready(state)
        }
        WizardStep::Capabilities => !state.channel_warning_20 && !state.nodeou_warning,
        WizardStep::BlockCuttingParams => true,
        WizardStep::OrdererAdminSet => !state.is_update() || !state.orderer_orgs.is_empty(),
        WizardStep::ConsenterSet => consenter_set_complete(state),
        WizardStep::OrderingServiceOrganization => orderer_signature_complete(state),
        WizardStep::ChannelAcls => state.acl_errors.is_empty(),
        WizardStep::LifecyclePolicy => state.lifecycle_policy.is_satisfiable(),
        WizardStep::EndorsementPolicy => state.endorsement_policy.is_satisfiable(),
        WizardStep::ReviewChannelInfo => review_complete(state),
    }
}

fn review_complete(state: &WizardState) -> bool {
    channel_details_complete(state)
        && organizations_complete(state)
        && state.custom_policy.is_some()
        && org_signature_ready(state)
        && (!state.is_update() || consenter_update_count(state) < 2)
        && orderer_signature_complete(state)
        && state.acl_errors.is_empty()
        && (!state.is_update() || update_capabilities_selected(state))
}

/// Re-derives the completed set over the steps the user has visited.
/// Called after every state change instead of mutating on query.
pub fn reconcile_completed_steps<'a, I>(visited: I, state: &WizardState) -> CompletedSteps
where
    I: IntoIterator<Item = &'a WizardStep>,
{
    visited
        .into_iter()
        .copied()
        .filter(|step| is_step_complete(*step, state))
        .collect()
}

/// First step in `order` that is not complete.
pub fn first_incomplete_step<I>(order: I, state: &WizardState) -> Option<WizardStep>
where
    I: IntoIterator<Item = WizardStep>,
{
    order
        .into_iter()
        .find(|step| !is_step_complete(*step, state))
}
