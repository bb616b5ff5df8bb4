use chanwiz::config::FeatureFlags;
use chanwiz::shared::ids::CapabilityId;
use chanwiz::wizard::capabilities::CapabilitySelection;
use chanwiz::wizard::completion::first_incomplete_step;
use chanwiz::wizard::model::{
    ChaincodePolicy, Consenter, Identity, MspDefinition, Orderer, OrdererOrg, Organization,
    PolicySelection, PolicyType,
};
use chanwiz::wizard::predicates::{
    can_modify_consenters, consenter_update_count, is_any_block_param_modified,
    is_any_capability_modified, is_consenter_set_modified, is_orderer_signature_needed,
};
use chanwiz::wizard::{
    is_step_complete, reconcile_completed_steps, WizardMode, WizardState, WizardStep,
};

fn cap(raw: &str) -> CapabilityId {
    CapabilityId::parse(raw).expect("capability id")
}

fn consenter(host: &str, port: &str) -> Consenter {
    Consenter {
        name: host.to_string(),
        host: host.to_string(),
        port: port.to_string(),
        ..Consenter::default()
    }
}

fn update_state() -> WizardState {
    let mut state = WizardState::new(WizardMode::Update, FeatureFlags::default());
    state.baseline.capabilities.orderer = Some(cap("V1_4_2"));
    state.baseline.consenters = vec![consenter("a", "1"), consenter("b", "1")];
    state.consenters = state.baseline.consenters.clone();
    state
}

#[test]
fn wizard_completion_module_counts_consenter_changes_by_address() {
    let mut state = update_state();
    assert_eq!(consenter_update_count(&state), 0);
    assert!(is_step_complete(WizardStep::ConsenterSet, &state));

    state.consenters = vec![consenter("a", "1"), consenter("c", "1")];
    assert_eq!(consenter_update_count(&state), 2);
    assert!(!is_step_complete(WizardStep::ConsenterSet, &state));

    state.consenters = vec![
        consenter("a", "1"),
        consenter("b", "1"),
        consenter("c", "1"),
    ];
    assert_eq!(consenter_update_count(&state), 1);
    assert!(is_step_complete(WizardStep::ConsenterSet, &state));

    state.invalid_consenter = true;
    assert!(!is_step_complete(WizardStep::ConsenterSet, &state));
}

#[test]
fn wizard_completion_module_empty_consenter_set_is_incomplete_when_updating() {
    let mut state = update_state();
    state.baseline.consenters = vec![consenter("a", "1")];
    state.consenters.clear();
    assert_eq!(consenter_update_count(&state), 1);
    assert!(!is_step_complete(WizardStep::ConsenterSet, &state));
}

#[test]
fn wizard_completion_module_default_consenters_are_never_modified() {
    let mut state = WizardState::new(WizardMode::Create, FeatureFlags::default());
    state.consenters = vec![consenter("x", "7050")];
    assert!(state.use_default_consenters);
    assert!(!is_consenter_set_modified(&state));

    state.use_default_consenters = false;
    assert!(is_consenter_set_modified(&state));
    assert!(is_orderer_signature_needed(&state));
}

#[test]
fn wizard_completion_module_chaincode_policy_needs_members_for_specific() {
    let mut state = WizardState::new(WizardMode::Create, FeatureFlags::default());
    assert!(is_step_complete(WizardStep::LifecyclePolicy, &state));

    state.lifecycle_policy = ChaincodePolicy {
        policy_type: PolicyType::Specific,
        members: Vec::new(),
        n: Some(1),
    };
    assert!(!is_step_complete(WizardStep::LifecyclePolicy, &state));

    state.lifecycle_policy.members = vec!["Org1MSP".to_string()];
    assert!(is_step_complete(WizardStep::LifecyclePolicy, &state));

    state.lifecycle_policy.n = Some(0);
    assert!(!is_step_complete(WizardStep::LifecyclePolicy, &state));
    assert!(is_step_complete(WizardStep::EndorsementPolicy, &state));
}

#[test]
fn wizard_completion_module_orderer_signature_step_waits_for_msp() {
    let mut state = update_state();
    assert!(is_step_complete(
        WizardStep::OrderingServiceOrganization,
        &state
    ));

    state.orderer_orgs = vec![OrdererOrg {
        msp_id: "OrdererMSP".to_string(),
        ..OrdererOrg::default()
    }];
    assert!(is_orderer_signature_needed(&state));
    assert!(!is_step_complete(
        WizardStep::OrderingServiceOrganization,
        &state
    ));
}

#[test]
fn wizard_completion_module_block_params_compare_normalized_values() {
    let mut state = update_state();
    state.baseline.block_params.absolute_max_bytes = Some("10485760".to_string());
    state.baseline.block_params.timeout = Some("2s".to_string());
    state.block_params.absolute_max_bytes = Some("10 MB".to_string());
    state.block_params.timeout = Some("2000ms".to_string());
    assert!(!is_any_block_param_modified(&state));

    state.block_params.timeout = Some("3s".to_string());
    assert!(is_any_block_param_modified(&state));
}

#[test]
fn wizard_completion_module_capability_changes_ignore_use_default() {
    let mut state = update_state();
    state.selected_capabilities.orderer = CapabilitySelection::UseDefault;
    assert!(!is_any_capability_modified(&state));

    state.selected_capabilities.orderer = CapabilitySelection::Explicit(cap("V1_4_2"));
    assert!(!is_any_capability_modified(&state));

    state.selected_capabilities.orderer = CapabilitySelection::Explicit(cap("V2_0"));
    assert!(is_any_capability_modified(&state));
}

#[test]
fn wizard_completion_module_consenter_edits_follow_orderer_capability() {
    let mut state = update_state();
    assert!(can_modify_consenters(&state));
    state.baseline.capabilities.orderer = Some(cap("V1_4_1"));
    assert!(!can_modify_consenters(&state));

    let mut create = WizardState::new(WizardMode::Create, FeatureFlags::default());
    assert!(can_modify_consenters(&create));
    create.features.scale_raft_nodes_enabled = false;
    assert!(!can_modify_consenters(&create));
}

#[test]
fn wizard_completion_module_reconciles_only_visited_steps() {
    let mut state = WizardState::new(WizardMode::Create, FeatureFlags::default());
    let visited = [WizardStep::Prerequisites, WizardStep::ChannelDetails];

    let completed = reconcile_completed_steps(&visited, &state);
    assert!(completed.contains(&WizardStep::Prerequisites));
    assert!(!completed.contains(&WizardStep::ChannelDetails));
    assert!(!completed.contains(&WizardStep::BlockCuttingParams));

    state.channel_name = "   ".to_string();
    assert_eq!(
        first_incomplete_step(visited, &state),
        Some(WizardStep::ChannelDetails)
    );
}

fn reviewed(mode: WizardMode) -> WizardState {
    let mut state = match mode {
        WizardMode::Create => WizardState::new(WizardMode::Create, FeatureFlags::default()),
        WizardMode::Update => {
            let mut state = update_state();
            let existing = &mut state.baseline.capabilities;
            existing.channel = Some(cap("V1_4_3"));
            existing.application = Some(cap("V1_4_2"));
            state.selected_capabilities.orderer = CapabilitySelection::Explicit(cap("V1_4_2"));
            state.selected_capabilities.channel = CapabilitySelection::Explicit(cap("V1_4_3"));
            state.selected_capabilities.application =
                CapabilitySelection::Explicit(cap("V1_4_2"));
            state
        }
    };
    state.channel_name = "mychannel".to_string();
    state.selected_orderer = Some(Orderer {
        id: "orderer1".to_string(),
        msp_id: "OrdererMSP".to_string(),
        url2use: "grpcs://orderer1:7050".to_string(),
        ..Orderer::default()
    });
    state.orgs = vec![Organization {
        msp: "Org1MSP".to_string(),
        roles: vec!["admin".to_string()],
        node_ou: true,
        ..Organization::default()
    }];
    state.custom_policy = Some(PolicySelection { n: 1, out_of: 1 });
    state.selected_identity = Some(Identity {
        name: "org1admin".to_string(),
        cert: "cert".to_string(),
        private_key: Some("key".to_string()),
    });
    state.selected_channel_creator = Some(MspDefinition {
        msp_id: "Org1MSP".to_string(),
        ..MspDefinition::default()
    });
    state
}

#[test]
fn wizard_completion_module_review_needs_every_create_input() {
    let state = reviewed(WizardMode::Create);
    assert!(is_step_complete(WizardStep::ReviewChannelInfo, &state));

    let mut no_creator = state.clone();
    no_creator.selected_channel_creator = None;
    assert!(!is_step_complete(WizardStep::ReviewChannelInfo, &no_creator));

    let mut unsigned = state.clone();
    if let Some(identity) = unsigned.selected_identity.as_mut() {
        identity.private_key = None;
    }
    assert!(!is_step_complete(WizardStep::ReviewChannelInfo, &unsigned));

    let mut checking = state;
    checking.checking_orderer_status = true;
    assert!(!is_step_complete(WizardStep::ReviewChannelInfo, &checking));
}

#[test]
fn wizard_completion_module_review_rejects_two_consenter_changes() {
    let mut state = reviewed(WizardMode::Update);
    assert!(is_step_complete(WizardStep::ReviewChannelInfo, &state));

    state.consenters = vec![consenter("a", "1"), consenter("b", "1"), consenter("c", "1")];
    state.selected_orderer_msp = Some(MspDefinition {
        msp_id: "OrdererMSP".to_string(),
        ..MspDefinition::default()
    });
    assert!(is_step_complete(WizardStep::ReviewChannelInfo, &state));

    state.consenters = vec![consenter("a", "1"), consenter("c", "1")];
    assert_eq!(consenter_update_count(&state), 2);
    assert!(!is_step_complete(WizardStep::ReviewChannelInfo, &state));
}

#[test]
fn wizard_completion_module_review_needs_explicit_update_capabilities() {
    let mut state = reviewed(WizardMode::Update);
    state.selected_capabilities.application = CapabilitySelection::UseDefault;
    assert!(!is_step_complete(WizardStep::ReviewChannelInfo, &state));

    let mut create = reviewed(WizardMode::Create);
    create.selected_capabilities.application = CapabilitySelection::UseDefault;
    assert!(is_step_complete(WizardStep::ReviewChannelInfo, &create));
}

#[test]
fn wizard_completion_module_review_waits_for_orderer_signing_msp() {
    let mut state = reviewed(WizardMode::Create);
    state.override_defaults = true;
    assert!(is_orderer_signature_needed(&state));
    assert!(!is_step_complete(WizardStep::ReviewChannelInfo, &state));

    state.selected_orderer_msp = Some(MspDefinition {
        msp_id: "OrdererMSP".to_string(),
        ..MspDefinition::default()
    });
    assert!(is_step_complete(WizardStep::ReviewChannelInfo, &state));
}
