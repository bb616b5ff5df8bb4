use super::completion::{first_incomplete_step, org_signature_ready, CompletedSteps};
use super::predicates::{can_modify_consenters, is_higher_capability_available, GatingFlags};
use super::state::WizardState;
use super::step::{WizardMode, WizardStep};
use serde::Serialize;

pub const REQUIRED_GROUP: &str = "required_step";
pub const CHANNEL_CONFIGURATION_GROUP: &str = "channel_configuration";
pub const ADVANCED_GROUP: &str = "advanced_configuration";
pub const REVIEW_GROUP: &str = "review";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub step: WizardStep,
    pub label: &'static str,
    pub is_link: bool,
    pub disabled: bool,
}

impl TimelineStep {
    fn new(step: WizardStep, is_link: bool, disabled: bool) -> Self {
        Self {
            step,
            label: step.label(),
            is_link,
            disabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepGroup {
    pub title: Option<&'static str>,
    pub steps: Vec<TimelineStep>,
}

/// Ordered step groups plus the "ready" signal raised once pruning is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub mode: WizardMode,
    pub groups: Vec<StepGroup>,
    pub ready: bool,
}

fn group(title: Option<&'static str>, steps: Vec<TimelineStep>) -> StepGroup {
    StepGroup { title, steps }
}

pub fn build_timeline(mode: WizardMode) -> Timeline {
    let groups = match mode {
        WizardMode::Create => vec![
            group(
                None,
                vec![TimelineStep::new(WizardStep::Prerequisites, true, false)],
            ),
            group(
                Some(REQUIRED_GROUP),
                vec![
                    TimelineStep::new(WizardStep::ChannelDetails, false, false),
                    TimelineStep::new(WizardStep::ChannelOrganizations, false, false),
                    TimelineStep::new(WizardStep::ChannelUpdatePolicy, false, false),
                    TimelineStep::new(WizardStep::OrganizationCreatingChannel, false, false),
                ],
            ),
            group(
                Some(ADVANCED_GROUP),
                [
                    WizardStep::Capabilities,
                    WizardStep::LifecyclePolicy,
                    WizardStep::EndorsementPolicy,
                    WizardStep::BlockCuttingParams,
                    WizardStep::ConsenterSet,
                    WizardStep::OrderingServiceOrganization,
                    WizardStep::ChannelAcls,
                ]
                .into_iter()
                .map(|step| TimelineStep::new(step, false, true))
                .collect(),
            ),
            group(
                Some(REVIEW_GROUP),
                vec![TimelineStep::new(WizardStep::ReviewChannelInfo, false, false)],
            ),
        ],
        WizardMode::Update => vec![
            group(
                None,
                vec![TimelineStep::new(
                    WizardStep::OrganizationUpdatingChannel,
                    true,
                    false,
                )],
            ),
            group(
                Some(CHANNEL_CONFIGURATION_GROUP),
                vec![
                    TimelineStep::new(WizardStep::ChannelOrganizations, false, false),
                    TimelineStep::new(WizardStep::ChannelUpdatePolicy, false, false),
                ],
            ),
            group(
                Some(ADVANCED_GROUP),
                vec![
                    TimelineStep::new(WizardStep::Capabilities, false, false),
                    TimelineStep::new(WizardStep::LifecyclePolicy, false, false),
                    TimelineStep::new(WizardStep::EndorsementPolicy, false, false),
                    TimelineStep::new(WizardStep::BlockCuttingParams, false, false),
                    TimelineStep::new(WizardStep::OrdererAdminSet, false, false),
                    TimelineStep::new(WizardStep::ConsenterSet, false, false),
                    TimelineStep::new(WizardStep::OrderingServiceOrganization, false, true),
                    TimelineStep::new(WizardStep::ChannelAcls, false, false),
                ],
            ),
            group(
                Some(REVIEW_GROUP),
                vec![TimelineStep::new(WizardStep::ReviewChannelInfo, false, false)],
            ),
        ],
    };
    Timeline {
        mode,
        groups,
        ready: false,
    }
}

/// Inputs that decide which advanced steps are inapplicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneInputs {
    pub mode: WizardMode,
    pub capabilities_enabled: bool,
    pub higher_capability_available: bool,
    pub can_modify_consenters: bool,
}

impl PruneInputs {
    pub fn from_state(state: &WizardState) -> Self {
        Self {
            mode: state.mode,
            capabilities_enabled: state.features.capabilities_enabled,
            higher_capability_available: is_higher_capability_available(state),
            can_modify_consenters: can_modify_consenters(state),
        }
    }

    fn removes(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::ConsenterSet => !self.can_modify_consenters,
            WizardStep::OrdererAdminSet => {
                !self.can_modify_consenters || self.mode == WizardMode::Create
            }
            WizardStep::Capabilities => {
                !self.capabilities_enabled || !self.higher_capability_available
            }
            _ => false,
        }
    }
}

/// Which steps may become links, before the completion invariant is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkScope {
    None,
    UpTo(WizardStep),
    All,
}

impl LinkScope {
    /// Update mode locks the timeline until a signing identity is chosen, and
    /// only opens it fully once any needed orderer signature is arranged.
    pub fn for_state(state: &WizardState, current: WizardStep, flags: &GatingFlags) -> Self {
        if !state.is_update() {
            return Self::UpTo(current);
        }
        if !org_signature_ready(state) {
            return Self::None;
        }
        if !flags.orderer_signature_needed || state.selected_orderer_msp.is_some() {
            Self::All
        } else {
            Self::UpTo(current)
        }
    }
}

impl Timeline {
    pub fn steps(&self) -> impl Iterator<Item = &TimelineStep> {
        self.groups.iter().flat_map(|group| group.steps.iter())
    }

    pub fn order(&self) -> Vec<WizardStep> {
        self.steps().map(|entry| entry.step).collect()
    }

    pub fn contains(&self, step: WizardStep) -> bool {
        self.steps().any(|entry| entry.step == step)
    }

    pub fn get(&self, step: WizardStep) -> Option<&TimelineStep> {
        self.steps().find(|entry| entry.step == step)
    }

    /// `(group index, index inside group)` of `step`.
    pub fn position(&self, step: WizardStep) -> Option<(usize, usize)> {
        self.groups.iter().enumerate().find_map(|(group_idx, group)| {
            group
                .steps
                .iter()
                .position(|entry| entry.step == step)
                .map(|step_idx| (group_idx, step_idx))
        })
    }

    fn flat_index(&self, step: WizardStep) -> Option<usize> {
        self.steps().position(|entry| entry.step == step)
    }

    /// Drops inapplicable advanced steps and marks the timeline ready.
    pub fn prune(&mut self, inputs: &PruneInputs) -> Vec<WizardStep> {
        let mut removed = Vec::new();
        for group in &mut self.groups {
            if group.title != Some(ADVANCED_GROUP) {
                continue;
            }
            group.steps.retain(|entry| {
                let drop = entry.step.is_prunable() && inputs.removes(entry.step);
                if drop {
                    removed.push(entry.step);
                }
                !drop
            });
        }
        self.ready = true;
        removed
    }

    pub fn set_advanced(&mut self, advanced: bool) {
        for group in &mut self.groups {
            if group.title == Some(ADVANCED_GROUP) {
                for entry in &mut group.steps {
                    entry.disabled = !advanced;
                }
            }
        }
    }

    /// Disables the orderer-signature step when no signature is needed and the
    /// chaincode policy steps below application capability 2.0.
    pub fn refresh_disabled(&mut self, advanced: bool, flags: &GatingFlags) {
        if !advanced {
            return;
        }
        for group in &mut self.groups {
            if group.title != Some(ADVANCED_GROUP) {
                continue;
            }
            for entry in &mut group.steps {
                match entry.step {
                    WizardStep::OrderingServiceOrganization => {
                        entry.disabled = !flags.orderer_signature_needed;
                    }
                    WizardStep::LifecyclePolicy | WizardStep::EndorsementPolicy => {
                        entry.disabled = !flags.channel_2_0;
                    }
                    _ => entry.disabled = false,
                }
            }
        }
    }

    /// First enabled step, in timeline order, that is not complete.
    pub fn first_incomplete(&self, state: &WizardState) -> Option<WizardStep> {
        let enabled = self
            .steps()
            .filter(|entry| !entry.disabled)
            .map(|entry| entry.step);
        first_incomplete_step(enabled, state)
    }

    /// Recomputes `is_link`. A step after the first incomplete step is never a
    /// link unless it is already in `completed`.
    pub fn refresh_links(
        &mut self,
        scope: LinkScope,
        completed: &CompletedSteps,
        first_incomplete: Option<WizardStep>,
    ) {
        let limit = first_incomplete.and_then(|step| self.flat_index(step));
        let current = match scope {
            LinkScope::UpTo(step) => self.flat_index(step),
            _ => None,
        };
        let mut flat = 0usize;
        for group in &mut self.groups {
            for entry in &mut group.steps {
                let done = completed.contains(&entry.step);
                let in_scope = match scope {
                    LinkScope::None => false,
                    LinkScope::All => true,
                    LinkScope::UpTo(_) => current.is_some_and(|current| flat <= current) || done,
                };
                let allowed = done || limit.map_or(true, |limit| flat <= limit);
                entry.is_link = in_scope && allowed && !entry.disabled;
                flat += 1;
            }
        }
    }
}
