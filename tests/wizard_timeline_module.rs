use chanwiz::config::FeatureFlags;
use chanwiz::shared::ids::CapabilityId;
use chanwiz::wizard::capabilities::AvailableCapabilities;
use chanwiz::wizard::completion::CompletedSteps;
use chanwiz::wizard::predicates::GatingFlags;
use chanwiz::wizard::timeline::{
    build_timeline, LinkScope, PruneInputs, ADVANCED_GROUP, REVIEW_GROUP,
};
use chanwiz::wizard::{WizardMode, WizardState, WizardStep};

fn cap(raw: &str) -> CapabilityId {
    CapabilityId::parse(raw).expect("capability id")
}

fn create_state_with_capabilities() -> WizardState {
    let mut state = WizardState::new(WizardMode::Create, FeatureFlags::default());
    state.available_capabilities = AvailableCapabilities {
        channel: vec![cap("V2_0")],
        orderer: vec![cap("V2_0")],
        application: vec![cap("V2_0")],
    };
    state
}

#[test]
fn wizard_timeline_module_create_mode_keeps_every_applicable_step() {
    let state = create_state_with_capabilities();
    let mut timeline = build_timeline(WizardMode::Create);
    assert!(!timeline.ready);

    let removed = timeline.prune(&PruneInputs::from_state(&state));

    assert!(removed.is_empty());
    assert!(timeline.ready);
    assert_eq!(
        timeline.order(),
        vec![
            WizardStep::Prerequisites,
            WizardStep::ChannelDetails,
            WizardStep::ChannelOrganizations,
            WizardStep::ChannelUpdatePolicy,
            WizardStep::OrganizationCreatingChannel,
            WizardStep::Capabilities,
            WizardStep::LifecyclePolicy,
            WizardStep::EndorsementPolicy,
            WizardStep::BlockCuttingParams,
            WizardStep::ConsenterSet,
            WizardStep::OrderingServiceOrganization,
            WizardStep::ChannelAcls,
            WizardStep::ReviewChannelInfo,
        ]
    );
    assert_eq!(timeline.groups.last().and_then(|g| g.title), Some(REVIEW_GROUP));
}

#[test]
fn wizard_timeline_module_prunes_capabilities_without_higher_versions() {
    let state = WizardState::new(WizardMode::Create, FeatureFlags::default());
    let mut timeline = build_timeline(WizardMode::Create);

    let removed = timeline.prune(&PruneInputs::from_state(&state));

    assert_eq!(removed, vec![WizardStep::Capabilities]);
    assert!(!timeline.contains(WizardStep::Capabilities));
}

#[test]
fn wizard_timeline_module_update_prunes_consenter_steps_on_old_orderers() {
    let mut state = WizardState::new(WizardMode::Update, FeatureFlags::default());
    state.baseline.capabilities.orderer = Some(cap("V1_4_1"));
    let mut timeline = build_timeline(WizardMode::Update);

    let removed = timeline.prune(&PruneInputs::from_state(&state));

    assert!(removed.contains(&WizardStep::OrdererAdminSet));
    assert!(removed.contains(&WizardStep::ConsenterSet));
    assert!(removed.contains(&WizardStep::Capabilities));
    assert_eq!(
        timeline.order().first(),
        Some(&WizardStep::OrganizationUpdatingChannel)
    );
    assert!(timeline.contains(WizardStep::BlockCuttingParams));
}

#[test]
fn wizard_timeline_module_update_keeps_consenter_steps_from_1_4_2() {
    let mut state = WizardState::new(WizardMode::Update, FeatureFlags::default());
    state.baseline.capabilities.orderer = Some(cap("V1_4_2"));
    let mut timeline = build_timeline(WizardMode::Update);

    timeline.prune(&PruneInputs::from_state(&state));

    assert!(timeline.contains(WizardStep::OrdererAdminSet));
    assert!(timeline.contains(WizardStep::ConsenterSet));
}

#[test]
fn wizard_timeline_module_disables_advanced_group_outside_advanced_mode() {
    let mut timeline = build_timeline(WizardMode::Create);
    timeline.set_advanced(true);
    timeline.refresh_disabled(
        true,
        &GatingFlags {
            channel_2_0: false,
            orderer_signature_needed: true,
            ..GatingFlags::default()
        },
    );
    let disabled = |timeline: &chanwiz::wizard::Timeline, step| {
        timeline.get(step).map(|entry| entry.disabled)
    };
    assert_eq!(disabled(&timeline, WizardStep::Capabilities), Some(false));
    assert_eq!(disabled(&timeline, WizardStep::LifecyclePolicy), Some(true));
    assert_eq!(disabled(&timeline, WizardStep::EndorsementPolicy), Some(true));
    assert_eq!(
        disabled(&timeline, WizardStep::OrderingServiceOrganization),
        Some(false)
    );

    timeline.set_advanced(false);
    for group in &timeline.groups {
        if group.title == Some(ADVANCED_GROUP) {
            assert!(group.steps.iter().all(|entry| entry.disabled));
        }
    }
    assert_eq!(disabled(&timeline, WizardStep::ReviewChannelInfo), Some(false));
}

#[test]
fn wizard_timeline_module_never_links_past_first_incomplete_step() {
    let mut timeline = build_timeline(WizardMode::Create);
    let completed: CompletedSteps = [WizardStep::Prerequisites, WizardStep::ChannelDetails]
        .into_iter()
        .collect();

    timeline.refresh_links(
        LinkScope::UpTo(WizardStep::ChannelUpdatePolicy),
        &completed,
        Some(WizardStep::ChannelOrganizations),
    );

    let link = |step| timeline.get(step).is_some_and(|entry| entry.is_link);
    assert!(link(WizardStep::Prerequisites));
    assert!(link(WizardStep::ChannelDetails));
    assert!(link(WizardStep::ChannelOrganizations));
    assert!(!link(WizardStep::ChannelUpdatePolicy));
    assert!(!link(WizardStep::ReviewChannelInfo));
}

#[test]
fn wizard_timeline_module_locked_scope_clears_every_link() {
    let mut timeline = build_timeline(WizardMode::Update);
    timeline.refresh_links(LinkScope::None, &CompletedSteps::new(), None);
    assert!(timeline.steps().all(|entry| !entry.is_link));
}
