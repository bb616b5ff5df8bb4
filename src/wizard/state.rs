use super::capabilities::{AvailableCapabilities, CapabilitySelections};
use super::model::{
    AclEntry, AclError, BlockParamInputs, ChaincodePolicy, ChannelBaseline, Consenter, Identity,
    MspDefinition, Orderer, OrdererOrg, Organization, PolicySelection, RaftParamInputs,
    SubmissionFailure,
};
use super::step::WizardMode;
use crate::config::FeatureFlags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the user has selected so far, plus flags the loaders maintain.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WizardState {
    pub mode: WizardMode,
    pub advanced: bool,
    pub features: FeatureFlags,
    pub loading: bool,

    pub channel_name: String,
    pub channel_name_error: Option<String>,
    pub orderers: Vec<Orderer>,
    pub selected_orderer: Option<Orderer>,
    pub is_orderer_unavailable: bool,
    pub checking_orderer_status: bool,

    pub msps: Vec<MspDefinition>,
    pub orgs: Vec<Organization>,
    pub original_orgs: Vec<Organization>,
    pub no_operator_error: Option<String>,
    pub duplicate_msp_error: Option<String>,
    pub missing_definition_error: Option<String>,

    pub custom_policy: Option<PolicySelection>,
    pub member_counts: Vec<PolicySelection>,

    pub identities: Vec<Identity>,
    pub selected_identity: Option<Identity>,
    pub selected_channel_creator: Option<MspDefinition>,

    pub available_capabilities: AvailableCapabilities,
    pub selected_capabilities: CapabilitySelections,
    pub channel_warning_20: bool,
    pub nodeou_warning: bool,

    pub lifecycle_policy: ChaincodePolicy,
    pub endorsement_policy: ChaincodePolicy,

    pub block_params: BlockParamInputs,
    pub block_timeout_error: Option<String>,
    pub override_defaults: bool,
    pub raft_params: RaftParamInputs,
    pub override_raft_defaults: bool,

    pub orderer_orgs: Vec<OrdererOrg>,
    pub consenters: Vec<Consenter>,
    pub use_default_consenters: bool,
    pub invalid_consenter: bool,
    pub raft_nodes: Vec<Consenter>,
    pub loading_consenters: bool,
    pub is_tls_unavailable: bool,
    pub update_orderer_def_error: bool,

    pub selected_orderer_msp: Option<MspDefinition>,

    pub acls: Vec<AclEntry>,
    pub acl_errors: Vec<AclError>,

    pub baseline: ChannelBaseline,

    pub submitting: bool,
    pub submission_error: Option<SubmissionFailure>,
}

impl WizardState {
    pub fn new(mode: WizardMode, features: FeatureFlags) -> Self {
        Self {
            mode,
            advanced: mode.is_update(),
            features,
            override_defaults: mode.is_update(),
            override_raft_defaults: mode.is_update(),
            use_default_consenters: !mode.is_update(),
            ..Self::default()
        }
    }

    /// Opens an update against an existing channel; selections start from the baseline.
    pub fn for_update(channel_name: &str, baseline: ChannelBaseline, features: FeatureFlags) -> Self {
        let mut state = Self::new(WizardMode::Update, features);
        state.channel_name = channel_name.to_string();
        state.consenters = baseline.consenters.clone();
        state.orderer_orgs = baseline.orderer_orgs.clone();
        state.block_params = baseline.block_params.clone();
        state.raft_params = baseline.raft_params.clone();
        state.baseline = baseline;
        state
    }

    pub fn is_update(&self) -> bool {
        self.mode.is_update()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state patch must be a json object, got {kind}")]
    PatchNotObject { kind: &'static str },
    #[error("state patch field `{field}` is not part of the wizard state")]
    UnknownField { field: String },
    #[error("state patch does not fit the wizard state: {source}")]
    Shape {
        #[source]
        source: serde_json::Error,
    },
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Owner of the wizard state. Reads borrow; writes are closures or partial merges.
#[derive(Debug, Clone, Default)]
pub struct WizardStore {
    state: WizardState,
    revision: u64,
}

impl WizardStore {
    pub fn new(state: WizardState) -> Self {
        Self { state, revision: 0 }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Bumped on every write, so observers can tell whether to re-derive.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn update<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut WizardState),
    {
        apply(&mut self.state);
        self.revision += 1;
    }

    /// Shallow merge: each top-level key in `patch` replaces the field wholesale.
    /// Last writer wins; a failed merge leaves the state untouched.
    pub fn merge(&mut self, patch: Value) -> Result<(), StoreError> {
        let Value::Object(fields) = patch else {
            return Err(StoreError::PatchNotObject {
                kind: json_kind(&patch),
            });
        };
        let mut current =
            serde_json::to_value(&self.state).map_err(|source| StoreError::Shape { source })?;
        let Value::Object(current_fields) = &mut current else {
            return Err(StoreError::PatchNotObject {
                kind: json_kind(&current),
            });
        };
        for (field, value) in fields {
            if !current_fields.contains_key(&field) {
                return Err(StoreError::UnknownField { field });
            }
            current_fields.insert(field, value);
        }
        self.state =
            serde_json::from_value(current).map_err(|source| StoreError::Shape { source })?;
        self.revision += 1;
        Ok(())
    }
}
