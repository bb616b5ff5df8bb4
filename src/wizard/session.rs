//! A running wizard: the store, the timeline and the navigation cursor, plus
//! the background collaborator calls that feed results back into them.
//!
//! Collaborator calls run on worker threads. Their results come back over an
//! mpsc channel and are only applied on the session's own thread, inside
//! [`WizardSession::pump`] or [`WizardSession::pump_blocking`]. Every task is
//! tied to the session's [`Lifetime`]; once the session is closed, late
//! results are dropped instead of touching the state.

use super::capabilities::{available_capabilities, selections_from_existing};
use super::collaborators::{
    AnalyticsEvent, ChannelResponse, ChannelTransactions, Collaborators, OrdererRegistry,
};
use super::completion::{is_step_complete, reconcile_completed_steps, CompletedSteps};
use super::model::{
    ChaincodePolicy, ChannelBaseline, Consenter, Identity, MspDefinition, Orderer, Organization,
    PolicyType, RaftNode, SubmissionFailure,
};
use super::navigation::{
    nav_buttons, wizard_transition, NavButtons, NavState, WizardAction, WizardNavEffect,
    WizardNavError, WizardTransition,
};
use super::outcome::{map_submission_error, BackendError, ERROR_CREATE_CHANNEL, ERROR_UPDATE_CHANNEL};
use super::predicates::GatingFlags;
use super::state::{StoreError, WizardState, WizardStore};
use super::step::{WizardMode, WizardStep};
use super::submission::{build_create_request, build_update_request, SubmissionError};
use super::timeline::{build_timeline, LinkScope, PruneInputs, Timeline};
use super::units::{format_byte_size, parse_byte_size};
use super::validation::{
    apply_deployer_certs, consenters_from_raft, initial_policy, populate_channel_orgs,
    refresh_validation, set_policy_members, set_policy_type, update_policy_options,
};
use crate::config::Settings;
use crate::shared::errors::ApiError;
use crate::shared::logging::WizardLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared liveness flag for a session and the tasks it started.
#[derive(Debug, Clone)]
pub struct Lifetime {
    alive: Arc<AtomicBool>,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn end(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }
}

#[derive(Debug)]
enum TaskCompletion {
    Msps(Result<Vec<MspDefinition>, ApiError>),
    Identities(Result<Vec<Identity>, ApiError>),
    Orderers(Result<Vec<Orderer>, ApiError>),
    Health {
        orderer_id: String,
        result: Result<(), ApiError>,
    },
    OrdererDetails {
        orderer_id: String,
        result: Result<Orderer, ApiError>,
    },
    DeployerCerts {
        consenters: Vec<Consenter>,
        result: Result<Vec<RaftNode>, ApiError>,
    },
    Submitted {
        mode: WizardMode,
        channel_id: String,
        orderer_url: Option<String>,
        result: Result<ChannelResponse, BackendError>,
    },
}

impl TaskCompletion {
    fn name(&self) -> &'static str {
        match self {
            Self::Msps(_) => "msps",
            Self::Identities(_) => "identities",
            Self::Orderers(_) => "orderers",
            Self::Health { .. } => "orderer.health",
            Self::OrdererDetails { .. } => "orderer.details",
            Self::DeployerCerts { .. } => "deployer.tls_certs",
            Self::Submitted { .. } => "channel.submit",
        }
    }
}

/// Handed to the completion callback after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCompletion {
    pub mode: WizardMode,
    pub channel_id: String,
    pub orderer_signature_needed: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaincodePolicyKind {
    Lifecycle,
    Endorsement,
}

/// An existing channel opened for editing.
#[derive(Debug, Clone, Default)]
pub struct UpdateTarget {
    pub channel_name: String,
    pub baseline: ChannelBaseline,
    /// Orderers serving the channel. With exactly one it is preselected.
    pub orderers: Vec<Orderer>,
}

type CompletionCallback = Box<dyn FnMut(&ChannelCompletion)>;

pub struct WizardSession {
    store: WizardStore,
    timeline: Timeline,
    nav: NavState,
    completed: CompletedSteps,
    settings: Settings,
    collaborators: Collaborators,
    log: WizardLog,
    lifetime: Lifetime,
    tx: Sender<TaskCompletion>,
    rx: Receiver<TaskCompletion>,
    pending: usize,
    closed: bool,
    on_complete: Option<CompletionCallback>,
}

fn display_size(raw: &str) -> String {
    parse_byte_size(raw).map_or_else(|| raw.to_string(), format_byte_size)
}

fn create_state(settings: &Settings) -> WizardState {
    let mut state = WizardState::new(WizardMode::Create, settings.features);
    let defaults = &settings.block_defaults;
    state.block_params.absolute_max_bytes = Some(display_size(&defaults.absolute_max_bytes));
    state.block_params.max_message_count = Some(defaults.max_message_count.to_string());
    state.block_params.preferred_max_bytes = Some(display_size(&defaults.preferred_max_bytes));
    state.block_params.timeout = Some(defaults.timeout.clone());
    state.raft_params.snapshot_interval_size = Some(display_size(&defaults.snapshot_interval_size));
    if settings.features.capabilities_enabled {
        state.available_capabilities = available_capabilities(&settings.capability_catalog, None);
    }
    state
}

fn update_state(target: &UpdateTarget, settings: &Settings) -> WizardState {
    let mut state =
        WizardState::for_update(&target.channel_name, target.baseline.clone(), settings.features);
    let existing = &target.baseline.capabilities;
    if settings.features.capabilities_enabled {
        state.available_capabilities =
            available_capabilities(&settings.capability_catalog, Some(existing));
        state.selected_capabilities = selections_from_existing(existing);
    }
    if let Some(policy) = &target.baseline.lifecycle_policy {
        state.lifecycle_policy = policy.clone();
    }
    if let Some(policy) = &target.baseline.endorsement_policy {
        state.endorsement_policy = policy.clone();
    }
    match target.orderers.as_slice() {
        [only] => state.selected_orderer = Some(only.clone()),
        many => state.orderers = many.to_vec(),
    }
    state
}

impl WizardSession {
    fn with_state(
        state: WizardState,
        settings: Settings,
        collaborators: Collaborators,
        log: WizardLog,
    ) -> Self {
        let mut timeline = build_timeline(state.mode);
        let removed = timeline.prune(&PruneInputs::from_state(&state));
        if !removed.is_empty() {
            let names: Vec<&str> = removed.iter().map(|step| step.as_str()).collect();
            log.debug("timeline.pruned", &names.join(","));
        }
        let (tx, rx) = mpsc::channel::<TaskCompletion>();
        let mut session = Self {
            nav: NavState::new(state.mode),
            store: WizardStore::new(state),
            timeline,
            completed: CompletedSteps::new(),
            settings,
            collaborators,
            log,
            lifetime: Lifetime::new(),
            tx,
            rx,
            pending: 0,
            closed: false,
            on_complete: None,
        };
        session.after_change();
        session
    }

    /// Starts a create wizard and kicks off the orderer and MSP loads.
    pub fn create(settings: Settings, collaborators: Collaborators, log: WizardLog) -> Self {
        let state = create_state(&settings);
        let mut session = Self::with_state(state, settings, collaborators, log);
        session.start_loads(true);
        session
    }

    /// Starts an update wizard for an existing channel.
    pub fn update(
        target: UpdateTarget,
        settings: Settings,
        collaborators: Collaborators,
        log: WizardLog,
    ) -> Self {
        let state = update_state(&target, &settings);
        let mut session = Self::with_state(state, settings, collaborators, log);
        session.start_loads(false);
        session
    }

    /// Wraps an already-filled state without loading anything.
    pub fn resume(
        state: WizardState,
        settings: Settings,
        collaborators: Collaborators,
        log: WizardLog,
    ) -> Self {
        Self::with_state(state, settings, collaborators, log)
    }

    /// Puts the cursor back where a saved draft left it.
    pub fn restore_nav(&mut self, nav: NavState) {
        self.nav = nav;
        self.after_change();
    }

    pub fn on_complete<F>(&mut self, callback: F)
    where
        F: FnMut(&ChannelCompletion) + 'static,
    {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn state(&self) -> &WizardState {
        self.store.state()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn completed(&self) -> &CompletedSteps {
        &self.completed
    }

    pub fn buttons(&self) -> NavButtons {
        nav_buttons(&self.nav, self.store.state())
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending_tasks(&self) -> usize {
        self.pending
    }

    fn start_loads(&mut self, fetch_orderers: bool) {
        self.store.update(|state| state.loading = true);
        if fetch_orderers {
            let orderers = self.collaborators.orderers.clone();
            self.spawn(move || TaskCompletion::Orderers(orderers.list_orderers()));
        }
        let msps = self.collaborators.msps.clone();
        self.spawn(move || TaskCompletion::Msps(msps.list_msps()));
        if let Some(orderer) = self.store.state().selected_orderer.clone() {
            self.check_health(orderer);
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: FnOnce() -> TaskCompletion + Send + 'static,
    {
        if self.closed {
            return;
        }
        let tx = self.tx.clone();
        let lifetime = self.lifetime.clone();
        self.pending += 1;
        thread::spawn(move || {
            let completion = task();
            if lifetime.is_alive() {
                let _ = tx.send(completion);
            }
        });
    }

    /// Applies whatever completions have already arrived. Never blocks.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for outstanding tasks, including ones chained by earlier results,
    /// until none remain or `timeout` passes.
    pub fn pump_blocking(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = self.pump();
        while self.pending > 0 && !self.closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining.min(Duration::from_millis(200))) {
                Ok(completion) => {
                    self.pending = self.pending.saturating_sub(1);
                    if self.apply(completion) {
                        applied += 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        applied
    }

    /// Ends the session. Results still in flight are discarded when they land.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.lifetime.end();
        self.log.info(
            "wizard.closed",
            &format!(
                "channel={} pending={}",
                self.store.state().channel_name,
                self.pending
            ),
        );
    }

    pub fn dispatch(&mut self, action: WizardAction) -> Result<WizardTransition, WizardNavError> {
        let transition = wizard_transition(
            &mut self.nav,
            action,
            self.store.state(),
            &self.timeline,
        )?;
        match transition.effect {
            WizardNavEffect::ShowStep(_) => self.after_change(),
            WizardNavEffect::SubmitCreate | WizardNavEffect::SubmitUpdate => self.submit(),
            WizardNavEffect::Close => self.close(),
            WizardNavEffect::None => {}
        }
        Ok(transition)
    }

    pub fn edit<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut WizardState),
    {
        self.store.update(apply);
        self.after_change();
    }

    pub fn merge(&mut self, patch: serde_json::Value) -> Result<(), StoreError> {
        self.store.merge(patch)?;
        self.after_change();
        Ok(())
    }

    pub fn set_channel_name(&mut self, name: &str) {
        let name = name.to_string();
        self.edit(|state| state.channel_name = name);
    }

    /// Selecting an orderer checks its health and loads its raft nodes.
    pub fn select_orderer(&mut self, orderer: Orderer) {
        self.edit(|state| state.selected_orderer = Some(orderer.clone()));
        self.check_health(orderer.clone());
        self.load_orderer_details(orderer.id);
    }

    pub fn set_orgs(&mut self, orgs: Vec<Organization>) {
        let options = update_policy_options(&orgs);
        let policy = initial_policy(&options, None, false);
        self.edit(|state| {
            state.orgs = orgs;
            state.member_counts = options;
            state.custom_policy = policy;
        });
    }

    /// Create mode only; update mode is always advanced.
    pub fn set_advanced(&mut self, advanced: bool) {
        if self.store.state().is_update() {
            return;
        }
        self.edit(|state| state.advanced = advanced);
    }

    pub fn select_identity(&mut self, identity: Option<Identity>) {
        self.edit(|state| state.selected_identity = identity);
    }

    pub fn select_channel_creator(&mut self, msp: Option<MspDefinition>) {
        self.edit(|state| state.selected_channel_creator = msp);
    }

    pub fn select_orderer_msp(&mut self, msp: Option<MspDefinition>) {
        self.edit(|state| state.selected_orderer_msp = msp);
    }

    pub fn set_consenters(&mut self, consenters: Vec<Consenter>, use_defaults: bool) {
        self.edit(|state| {
            state.consenters = consenters;
            state.use_default_consenters = use_defaults;
        });
    }

    pub fn set_policy_type(&mut self, kind: ChaincodePolicyKind, policy_type: PolicyType) {
        self.edit(|state| {
            let policy = chaincode_policy_mut(state, kind);
            *policy = set_policy_type(policy, policy_type);
        });
    }

    pub fn set_policy_members(
        &mut self,
        kind: ChaincodePolicyKind,
        members: Option<Vec<String>>,
        n: Option<u32>,
    ) {
        self.edit(|state| {
            let policy = chaincode_policy_mut(state, kind);
            *policy = set_policy_members(policy, members, n);
        });
    }

    fn check_health(&mut self, orderer: Orderer) {
        self.store.update(|state| {
            state.is_orderer_unavailable = false;
            state.checking_orderer_status = true;
        });
        let registry = self.collaborators.orderers.clone();
        self.spawn(move || TaskCompletion::Health {
            orderer_id: orderer.id.clone(),
            result: registry.check_health(&orderer),
        });
    }

    fn load_orderer_details(&mut self, orderer_id: String) {
        if orderer_id.is_empty() {
            return;
        }
        let registry = self.collaborators.orderers.clone();
        self.spawn(move || TaskCompletion::OrdererDetails {
            result: registry.orderer_details(&orderer_id),
            orderer_id,
        });
    }

    /// Builds the request for the current mode and sends it in the background.
    /// Nothing is sent unless the review step is complete.
    pub fn submit(&mut self) {
        if self.closed || self.store.state().submitting {
            return;
        }
        let mode = self.store.state().mode;
        if !is_step_complete(WizardStep::ReviewChannelInfo, self.store.state()) {
            return self.fail_submission(mode, &SubmissionError::ReviewIncomplete);
        }
        self.store.update(|state| {
            state.submitting = true;
            state.submission_error = None;
        });
        let snapshot = self.store.state().clone();
        let settings = self.settings.clone();
        let channels = self.collaborators.channels.clone();
        match mode {
            WizardMode::Create => {
                let request = match build_create_request(&snapshot, &settings) {
                    Ok(request) => request,
                    Err(err) => return self.fail_submission(mode, &err),
                };
                self.log.info(
                    "channel.create.request",
                    &format!(
                        "channel={} orderer={}",
                        request.channel_id, request.orderer_url
                    ),
                );
                let channel_id = request.channel_id.clone();
                let orderer_url = Some(request.orderer_url.clone());
                self.spawn(move || TaskCompletion::Submitted {
                    mode,
                    channel_id,
                    orderer_url,
                    result: channels.create_channel(&request),
                });
            }
            WizardMode::Update => {
                self.log.info(
                    "channel.update.request",
                    &format!("channel={}", snapshot.channel_name),
                );
                let registry = self.collaborators.orderers.clone();
                self.spawn(move || {
                    let (orderer_url, result) =
                        run_update(&snapshot, &settings, registry.as_ref(), channels.as_ref());
                    TaskCompletion::Submitted {
                        mode,
                        channel_id: snapshot.channel_name.trim().to_string(),
                        orderer_url,
                        result,
                    }
                });
            }
        }
        self.after_change();
    }

    fn fail_submission(&mut self, mode: WizardMode, err: &SubmissionError) {
        let title = match mode {
            WizardMode::Create => ERROR_CREATE_CHANNEL,
            WizardMode::Update => ERROR_UPDATE_CHANNEL,
        };
        self.log.error("channel.submit.invalid", &err.to_string());
        self.edit(|state| {
            state.submitting = false;
            state.submission_error = Some(SubmissionFailure {
                title: title.to_string(),
                details: Some(err.to_string()),
            });
        });
    }

    fn apply(&mut self, completion: TaskCompletion) -> bool {
        if !self.lifetime.is_alive() {
            self.log
                .debug("task.dropped", &format!("{} after close", completion.name()));
            return false;
        }
        match completion {
            TaskCompletion::Msps(result) => self.on_msps(result),
            TaskCompletion::Identities(result) => self.on_identities(result),
            TaskCompletion::Orderers(result) => match result {
                Ok(orderers) => self.store.update(|state| state.orderers = orderers),
                Err(err) => self.log.error("orderers.failed", &err.to_string()),
            },
            TaskCompletion::Health { orderer_id, result } => self.on_health(orderer_id, result),
            TaskCompletion::OrdererDetails { orderer_id, result } => {
                self.on_orderer_details(orderer_id, result)
            }
            TaskCompletion::DeployerCerts { consenters, result } => {
                self.on_deployer_certs(consenters, result)
            }
            TaskCompletion::Submitted {
                mode,
                channel_id,
                orderer_url,
                result,
            } => self.on_submitted(mode, channel_id, orderer_url, result),
        }
        if !self.closed {
            self.after_change();
        }
        true
    }

    fn on_msps(&mut self, result: Result<Vec<MspDefinition>, ApiError>) {
        match result {
            Ok(msps) => {
                let msps: Vec<MspDefinition> = msps
                    .into_iter()
                    .map(|mut msp| {
                        msp.display_name = format!("{} ({})", msp.display_name, msp.msp_id);
                        msp
                    })
                    .collect();
                self.log.debug("msps.loaded", &format!("count={}", msps.len()));
                self.store.update(|state| state.msps = msps);
                let identities = self.collaborators.identities.clone();
                self.spawn(move || TaskCompletion::Identities(identities.list_identities()));
            }
            Err(err) => {
                self.log.error("msps.failed", &err.to_string());
                self.store.update(|state| state.loading = false);
            }
        }
    }

    fn on_identities(&mut self, result: Result<Vec<Identity>, ApiError>) {
        let identities = match result {
            Ok(identities) => identities,
            Err(err) => {
                self.log.error("identities.failed", &err.to_string());
                self.store.update(|state| state.loading = false);
                return;
            }
        };
        self.store.update(|state| state.identities = identities);
        if !self.store.state().is_update() {
            self.store.update(|state| state.loading = false);
            return;
        }

        let state = self.store.state();
        let populated = populate_channel_orgs(&state.baseline.members, &state.msps);
        let mut orgs = state.orgs.clone();
        orgs.extend(populated.orgs.iter().cloned());
        let options = update_policy_options(&orgs);
        let policy = initial_policy(&options, state.baseline.n_out_of, true);
        let acls = state.baseline.acls.clone();
        let missing = populated.missing_definition_error();
        if let Some(message) = &missing {
            self.log.info("orgs.missing_definitions", message);
        }
        self.store.update(|state| {
            state.original_orgs = orgs.clone();
            state.orgs = orgs;
            state.missing_definition_error = missing;
            state.member_counts = options;
            state.custom_policy = policy;
            state.acls = acls;
        });
        match self.store.state().selected_orderer.clone() {
            Some(orderer) => self.load_orderer_details(orderer.id),
            None => self.store.update(|state| state.loading = false),
        }
    }

    fn on_health(&mut self, orderer_id: String, result: Result<(), ApiError>) {
        let current = self
            .store
            .state()
            .selected_orderer
            .as_ref()
            .is_some_and(|orderer| orderer.id == orderer_id);
        if !current {
            return;
        }
        match &result {
            Ok(()) => self.log.info("orderer.health", &format!("{orderer_id} ok")),
            Err(err) => self
                .log
                .error("orderer.health", &format!("{orderer_id} unavailable: {err}")),
        }
        self.store.update(|state| {
            state.is_orderer_unavailable = result.is_err();
            state.checking_orderer_status = false;
        });
    }

    fn on_orderer_details(&mut self, orderer_id: String, result: Result<Orderer, ApiError>) {
        let orderer = match result {
            Ok(orderer) => orderer,
            Err(err) => {
                self.log.error(
                    "orderer.details.failed",
                    &format!("{orderer_id}: {err}"),
                );
                self.store.update(|state| state.loading = false);
                return;
            }
        };
        let Some(raft) = orderer.raft.clone() else {
            self.store.update(|state| state.loading = false);
            return;
        };
        let candidates = consenters_from_raft(&raft);
        self.store.update(|state| {
            if state
                .selected_orderer
                .as_ref()
                .is_some_and(|selected| selected.id == orderer.id)
            {
                state.selected_orderer = Some(orderer.clone());
            }
            state.loading_consenters = true;
            if candidates.outdated_definition {
                state.update_orderer_def_error = true;
            }
        });
        if candidates.needs_deployer_certs {
            self.log.info(
                "deployer.tls_certs.request",
                &format!("orderer={} nodes={}", orderer.id, raft.len()),
            );
            let registry = self.collaborators.orderers.clone();
            let consenters = candidates.consenters;
            self.spawn(move || TaskCompletion::DeployerCerts {
                result: registry.deployer_tls_certs(&raft),
                consenters,
            });
            return;
        }
        self.store.update(|state| {
            state.raft_nodes = candidates.consenters;
            state.loading_consenters = false;
            state.loading = false;
        });
    }

    fn on_deployer_certs(
        &mut self,
        consenters: Vec<Consenter>,
        result: Result<Vec<RaftNode>, ApiError>,
    ) {
        match result {
            Ok(signed) => {
                let applied = apply_deployer_certs(consenters, &signed);
                if applied.tls_unavailable {
                    self.log
                        .info("deployer.tls_certs", "dropped nodes without server certs");
                }
                self.store.update(|state| {
                    state.raft_nodes = applied.consenters;
                    state.is_tls_unavailable |= applied.tls_unavailable;
                    state.loading_consenters = false;
                    state.loading = false;
                });
            }
            Err(err) => {
                self.log.info("deployer.tls_certs.failed", &err.to_string());
                self.store.update(|state| {
                    state.raft_nodes = Vec::new();
                    state.is_tls_unavailable = true;
                    state.loading_consenters = false;
                    state.loading = false;
                });
            }
        }
    }

    fn on_submitted(
        &mut self,
        mode: WizardMode,
        channel_id: String,
        orderer_url: Option<String>,
        result: Result<ChannelResponse, BackendError>,
    ) {
        match result {
            Ok(response) => {
                self.log
                    .info("channel.submit.succeeded", &format!("{} {channel_id}", mode.as_str()));
                self.store.update(|state| state.submitting = false);
                self.close();
                let completion = ChannelCompletion {
                    mode,
                    channel_id: channel_id.clone(),
                    orderer_signature_needed: match mode {
                        WizardMode::Create => response.is_orderer_signature_needed,
                        WizardMode::Update => None,
                    },
                };
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(&completion);
                }
                self.collaborators
                    .analytics
                    .trigger(&AnalyticsEvent::channel_submitted(
                        mode,
                        &channel_id,
                        orderer_url.as_deref(),
                    ));
            }
            Err(err) => {
                let failure = map_submission_error(mode, &err);
                self.log.error(
                    "channel.submit.failed",
                    &format!("{} {channel_id}: {} ({err})", mode.as_str(), failure.title),
                );
                self.store.update(|state| {
                    state.submitting = false;
                    state.submission_error = Some(failure);
                });
            }
        }
    }

    /// Re-derives validation errors, completed steps and timeline links.
    fn after_change(&mut self) {
        let bounds = self.settings.block_timeout.clone();
        self.store.update(|state| refresh_validation(state, &bounds));
        let state = self.store.state();
        let flags = GatingFlags::derive(state);
        self.timeline.set_advanced(state.advanced);
        self.timeline.refresh_disabled(state.advanced, &flags);
        self.completed = reconcile_completed_steps(&self.nav.visited, state);
        let first_incomplete = self.timeline.first_incomplete(state);
        let scope = LinkScope::for_state(state, self.nav.viewing, &flags);
        self.timeline
            .refresh_links(scope, &self.completed, first_incomplete);
    }
}

impl Drop for WizardSession {
    fn drop(&mut self) {
        self.lifetime.end();
    }
}

fn chaincode_policy_mut(state: &mut WizardState, kind: ChaincodePolicyKind) -> &mut ChaincodePolicy {
    match kind {
        ChaincodePolicyKind::Lifecycle => &mut state.lifecycle_policy,
        ChaincodePolicyKind::Endorsement => &mut state.endorsement_policy,
    }
}

fn run_update(
    snapshot: &WizardState,
    settings: &Settings,
    registry: &dyn OrdererRegistry,
    channels: &dyn ChannelTransactions,
) -> (Option<String>, Result<ChannelResponse, BackendError>) {
    let Some(orderer) = snapshot.selected_orderer.as_ref() else {
        return (
            None,
            Err(BackendError::message(SubmissionError::MissingOrderer.to_string())),
        );
    };
    let host = match registry.resolve_orderer_url(orderer, &snapshot.baseline.consenters) {
        Ok(host) => host,
        Err(err) => return (None, Err(BackendError::from(err))),
    };
    let request = match build_update_request(snapshot, settings, &host) {
        Ok(request) => request,
        Err(err) => return (Some(host), Err(BackendError::message(err.to_string()))),
    };
    (Some(host), channels.update_channel(&request))
}
