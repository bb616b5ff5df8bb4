use super::completion::is_step_complete;
use super::predicates::GatingFlags;
use super::state::WizardState;
use super::step::{initial_step, WizardMode, WizardStep};
use super::timeline::Timeline;
use crossterm::event::{KeyCode, KeyEventKind, KeyModifiers};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Step(WizardStep),
    Submit,
}

/// Everything a routing decision depends on. Built fresh for every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteContext {
    pub mode: WizardMode,
    pub advanced: bool,
    pub flags: GatingFlags,
}

impl RouteContext {
    pub fn derive(state: &WizardState) -> Self {
        Self {
            mode: state.mode,
            advanced: state.advanced,
            flags: GatingFlags::derive(state),
        }
    }

    fn update(&self) -> bool {
        self.mode.is_update()
    }
}

/// Where the signing step hands over in create mode, and where the policy
/// step hands over in update mode.
fn first_advanced_step(ctx: &RouteContext) -> WizardStep {
    if ctx.flags.higher_capability_available {
        WizardStep::Capabilities
    } else if ctx.flags.channel_2_0 {
        WizardStep::LifecyclePolicy
    } else {
        WizardStep::BlockCuttingParams
    }
}

/// Step before the advanced group when walking backwards.
fn last_required_step(ctx: &RouteContext) -> WizardStep {
    if ctx.update() {
        WizardStep::ChannelUpdatePolicy
    } else {
        WizardStep::OrganizationCreatingChannel
    }
}

fn after_consenters(ctx: &RouteContext) -> WizardStep {
    if ctx.flags.orderer_signature_needed {
        WizardStep::OrderingServiceOrganization
    } else {
        WizardStep::ChannelAcls
    }
}

fn back_target(step: WizardStep, ctx: &RouteContext) -> Option<WizardStep> {
    let flags = &ctx.flags;
    let target = match step {
        WizardStep::Prerequisites => return None,
        WizardStep::ChannelDetails => WizardStep::Prerequisites,
        WizardStep::ChannelOrganizations if ctx.update() => {
            WizardStep::OrganizationUpdatingChannel
        }
        WizardStep::ChannelOrganizations => WizardStep::ChannelDetails,
        WizardStep::ChannelUpdatePolicy => WizardStep::ChannelOrganizations,
        WizardStep::OrganizationCreatingChannel | WizardStep::OrganizationUpdatingChannel => {
            if ctx.update() {
                return None;
            }
            WizardStep::ChannelUpdatePolicy
        }
        WizardStep::Capabilities => last_required_step(ctx),
        WizardStep::LifecyclePolicy if flags.higher_capability_available => {
            WizardStep::Capabilities
        }
        WizardStep::LifecyclePolicy => last_required_step(ctx),
        WizardStep::EndorsementPolicy => WizardStep::LifecyclePolicy,
        WizardStep::BlockCuttingParams if flags.channel_2_0 => WizardStep::EndorsementPolicy,
        WizardStep::BlockCuttingParams if flags.higher_capability_available => {
            WizardStep::Capabilities
        }
        WizardStep::BlockCuttingParams => last_required_step(ctx),
        WizardStep::OrdererAdminSet => WizardStep::BlockCuttingParams,
        WizardStep::ConsenterSet if ctx.update() => WizardStep::OrdererAdminSet,
        WizardStep::ConsenterSet => WizardStep::BlockCuttingParams,
        WizardStep::OrderingServiceOrganization if flags.can_modify_consenters => {
            WizardStep::ConsenterSet
        }
        WizardStep::OrderingServiceOrganization => WizardStep::BlockCuttingParams,
        WizardStep::ChannelAcls if flags.orderer_signature_needed => {
            WizardStep::OrderingServiceOrganization
        }
        WizardStep::ChannelAcls if !flags.can_modify_consenters => WizardStep::BlockCuttingParams,
        WizardStep::ChannelAcls => WizardStep::ConsenterSet,
        WizardStep::ReviewChannelInfo if ctx.advanced => WizardStep::ChannelAcls,
        WizardStep::ReviewChannelInfo => last_required_step(ctx),
    };
    Some(target)
}

fn next_target(step: WizardStep, ctx: &RouteContext) -> Route {
    let flags = &ctx.flags;
    let target = match step {
        WizardStep::Prerequisites => WizardStep::ChannelDetails,
        WizardStep::ChannelDetails => WizardStep::ChannelOrganizations,
        WizardStep::ChannelOrganizations => WizardStep::ChannelUpdatePolicy,
        WizardStep::ChannelUpdatePolicy if ctx.update() => first_advanced_step(ctx),
        WizardStep::ChannelUpdatePolicy => WizardStep::OrganizationCreatingChannel,
        WizardStep::OrganizationCreatingChannel | WizardStep::OrganizationUpdatingChannel => {
            if ctx.update() {
                WizardStep::ChannelOrganizations
            } else if ctx.advanced {
                first_advanced_step(ctx)
            } else {
                WizardStep::ReviewChannelInfo
            }
        }
        WizardStep::Capabilities if flags.channel_2_0 => WizardStep::LifecyclePolicy,
        WizardStep::Capabilities => WizardStep::BlockCuttingParams,
        WizardStep::LifecyclePolicy => WizardStep::EndorsementPolicy,
        WizardStep::EndorsementPolicy => WizardStep::BlockCuttingParams,
        WizardStep::BlockCuttingParams if flags.can_modify_consenters && ctx.update() => {
            WizardStep::OrdererAdminSet
        }
        WizardStep::BlockCuttingParams if flags.can_modify_consenters => WizardStep::ConsenterSet,
        WizardStep::BlockCuttingParams => after_consenters(ctx),
        WizardStep::OrdererAdminSet => WizardStep::ConsenterSet,
        WizardStep::ConsenterSet => after_consenters(ctx),
        WizardStep::OrderingServiceOrganization => WizardStep::ChannelAcls,
        WizardStep::ChannelAcls => WizardStep::ReviewChannelInfo,
        WizardStep::ReviewChannelInfo => return Route::Submit,
    };
    Route::Step(target)
}

/// Transition table: `(step, direction, derived predicates) -> target`.
pub fn route(step: WizardStep, direction: Direction, ctx: &RouteContext) -> Option<Route> {
    match direction {
        Direction::Back => back_target(step, ctx).map(Route::Step),
        Direction::Next => Some(next_target(step, ctx)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Back,
    Next,
    Jump(WizardStep),
    Submit,
    Cancel,
}

impl WizardAction {
    fn as_str(self) -> &'static str {
        match self {
            WizardAction::Back => "back",
            WizardAction::Next => "next",
            WizardAction::Jump(_) => "jump",
            WizardAction::Submit => "submit",
            WizardAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    pub viewing: WizardStep,
    pub visited: BTreeSet<WizardStep>,
}

impl NavState {
    pub fn new(mode: WizardMode) -> Self {
        let start = initial_step(mode);
        Self {
            viewing: start,
            visited: BTreeSet::from([start]),
        }
    }

    pub fn show(&mut self, step: WizardStep) {
        self.viewing = step;
        self.visited.insert(step);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardNavEffect {
    None,
    ShowStep(WizardStep),
    SubmitCreate,
    SubmitUpdate,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardTransition {
    pub effect: WizardNavEffect,
    pub feedback: Option<String>,
}

impl WizardTransition {
    fn effect(effect: WizardNavEffect) -> Self {
        Self {
            effect,
            feedback: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardNavError {
    InvalidTransition {
        step: WizardStep,
        action: WizardAction,
    },
    StepIncomplete {
        step: WizardStep,
    },
    StepNotLinked {
        step: WizardStep,
    },
    Submitting,
}

impl std::fmt::Display for WizardNavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardNavError::InvalidTransition { step, action } => write!(
                f,
                "invalid wizard transition: step={} action={}",
                step.as_str(),
                action.as_str()
            ),
            WizardNavError::StepIncomplete { step } => {
                write!(f, "step `{}` is not complete", step.as_str())
            }
            WizardNavError::StepNotLinked { step } => {
                write!(f, "step `{}` is not reachable yet", step.as_str())
            }
            WizardNavError::Submitting => write!(f, "a submission is already in flight"),
        }
    }
}

impl std::error::Error for WizardNavError {}

fn submit_effect(mode: WizardMode) -> WizardNavEffect {
    match mode {
        WizardMode::Create => WizardNavEffect::SubmitCreate,
        WizardMode::Update => WizardNavEffect::SubmitUpdate,
    }
}

pub fn wizard_transition(
    nav: &mut NavState,
    action: WizardAction,
    state: &WizardState,
    timeline: &Timeline,
) -> Result<WizardTransition, WizardNavError> {
    let step = nav.viewing;
    let ctx = RouteContext::derive(state);
    match action {
        WizardAction::Cancel => Ok(WizardTransition::effect(WizardNavEffect::Close)),
        WizardAction::Back => match route(step, Direction::Back, &ctx) {
            Some(Route::Step(target)) => {
                nav.show(target);
                Ok(WizardTransition::effect(WizardNavEffect::ShowStep(target)))
            }
            _ => Err(WizardNavError::InvalidTransition { step, action }),
        },
        WizardAction::Next | WizardAction::Submit => {
            if state.submitting {
                return Err(WizardNavError::Submitting);
            }
            if !is_step_complete(step, state) {
                return Err(WizardNavError::StepIncomplete { step });
            }
            match (route(step, Direction::Next, &ctx), action) {
                (Some(Route::Submit), _) => Ok(WizardTransition::effect(submit_effect(ctx.mode))),
                (Some(Route::Step(target)), WizardAction::Next) => {
                    nav.show(target);
                    Ok(WizardTransition::effect(WizardNavEffect::ShowStep(target)))
                }
                _ => Err(WizardNavError::InvalidTransition { step, action }),
            }
        }
        WizardAction::Jump(target) => {
            if target == step {
                return Ok(WizardTransition {
                    effect: WizardNavEffect::None,
                    feedback: Some("Already on this step.".to_string()),
                });
            }
            match timeline.get(target) {
                Some(entry) if entry.is_link && !entry.disabled => {
                    nav.show(target);
                    Ok(WizardTransition::effect(WizardNavEffect::ShowStep(target)))
                }
                _ => Err(WizardNavError::StepNotLinked { step: target }),
            }
        }
    }
}

/// Back/next buttons for the step being viewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavButtons {
    pub back: Option<WizardStep>,
    pub next: Option<Route>,
    pub next_label: &'static str,
    pub next_enabled: bool,
}

pub fn nav_buttons(nav: &NavState, state: &WizardState) -> NavButtons {
    let ctx = RouteContext::derive(state);
    let back = match route(nav.viewing, Direction::Back, &ctx) {
        Some(Route::Step(step)) => Some(step),
        _ => None,
    };
    let next = route(nav.viewing, Direction::Next, &ctx);
    let next_label = match (next, state.mode) {
        (Some(Route::Submit), WizardMode::Create) => "create_channel",
        (Some(Route::Submit), WizardMode::Update) => "update_channel",
        _ => "next",
    };
    NavButtons {
        back,
        next,
        next_label,
        next_enabled: is_step_complete(nav.viewing, state) && !state.submitting,
    }
}

pub fn wizard_action_from_key(key: crossterm::event::KeyEvent) -> Option<WizardAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(WizardAction::Cancel);
    }
    match key.code {
        KeyCode::Left | KeyCode::Char('b') => Some(WizardAction::Back),
        KeyCode::Right | KeyCode::Enter | KeyCode::Char('n') => Some(WizardAction::Next),
        KeyCode::Char('s') => Some(WizardAction::Submit),
        KeyCode::Esc => Some(WizardAction::Cancel),
        _ => None,
    }
}

pub fn parse_scripted_wizard_keys(raw: &str) -> Result<Vec<crossterm::event::KeyEvent>, String> {
    let mut keys = Vec::new();
    for token in raw.split(',') {
        let normalized = token.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            continue;
        }
        let key = match normalized.as_str() {
            "left" => crossterm::event::KeyEvent::new(KeyCode::Left, KeyModifiers::NONE),
            "right" => crossterm::event::KeyEvent::new(KeyCode::Right, KeyModifiers::NONE),
            "enter" => crossterm::event::KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
            "esc" => crossterm::event::KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
            "ctrl-c" => crossterm::event::KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            "b" => crossterm::event::KeyEvent::new(KeyCode::Char('b'), KeyModifiers::NONE),
            "n" => crossterm::event::KeyEvent::new(KeyCode::Char('n'), KeyModifiers::NONE),
            "s" => crossterm::event::KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE),
            other => {
                return Err(format!(
                    "invalid wizard key token `{other}`; valid tokens: left,right,enter,esc,ctrl-c,b,n,s"
                ));
            }
        };
        keys.push(key);
    }
    Ok(keys)
}
