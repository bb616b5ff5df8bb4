use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardMode {
    #[default]
    Create,
    Update,
}

impl WizardMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            _ => Err("mode must be one of: create, update".to_string()),
        }
    }

    pub fn is_update(self) -> bool {
        self == Self::Update
    }
}

impl std::fmt::Display for WizardMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Prerequisites,
    ChannelDetails,
    ChannelOrganizations,
    ChannelUpdatePolicy,
    OrganizationCreatingChannel,
    OrganizationUpdatingChannel,
    Capabilities,
    LifecyclePolicy,
    EndorsementPolicy,
    BlockCuttingParams,
    OrdererAdminSet,
    ConsenterSet,
    OrderingServiceOrganization,
    ChannelAcls,
    ReviewChannelInfo,
}

pub const ALL_WIZARD_STEPS: [WizardStep; 15] = [
    WizardStep::Prerequisites,
    WizardStep::ChannelDetails,
    WizardStep::ChannelOrganizations,
    WizardStep::ChannelUpdatePolicy,
    WizardStep::OrganizationCreatingChannel,
    WizardStep::OrganizationUpdatingChannel,
    WizardStep::Capabilities,
    WizardStep::LifecyclePolicy,
    WizardStep::EndorsementPolicy,
    WizardStep::BlockCuttingParams,
    WizardStep::OrdererAdminSet,
    WizardStep::ConsenterSet,
    WizardStep::OrderingServiceOrganization,
    WizardStep::ChannelAcls,
    WizardStep::ReviewChannelInfo,
];

impl WizardStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prerequisites => "prerequisites",
            Self::ChannelDetails => "channel_details",
            Self::ChannelOrganizations => "channel_organizations",
            Self::ChannelUpdatePolicy => "channel_update_policy",
            Self::OrganizationCreatingChannel => "organization_creating_channel",
            Self::OrganizationUpdatingChannel => "organization_updating_channel",
            Self::Capabilities => "capabilities",
            Self::LifecyclePolicy => "lifecycle_policy",
            Self::EndorsementPolicy => "endorsement_policy",
            Self::BlockCuttingParams => "block_cutting_params",
            Self::OrdererAdminSet => "orderer_admin_set",
            Self::ConsenterSet => "consenter_set",
            Self::OrderingServiceOrganization => "ordering_service_organization",
            Self::ChannelAcls => "channel_acls",
            Self::ReviewChannelInfo => "review_channel_info",
        }
    }

    /// Message key shown in the timeline. Differs from the id for the chaincode policy steps.
    pub fn label(self) -> &'static str {
        match self {
            Self::LifecyclePolicy => "channel_lifecycle_policy",
            Self::EndorsementPolicy => "channel_endorsement_policy",
            other => other.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_ascii_lowercase();
        ALL_WIZARD_STEPS
            .iter()
            .copied()
            .find(|step| step.as_str() == normalized || step.label() == normalized)
            .ok_or_else(|| format!("unknown wizard step `{raw}`"))
    }

    /// Steps that can be pruned from the advanced group.
    pub fn is_prunable(self) -> bool {
        matches!(
            self,
            Self::Capabilities | Self::ConsenterSet | Self::OrdererAdminSet
        )
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First step shown when the wizard opens.
pub fn initial_step(mode: WizardMode) -> WizardStep {
    match mode {
        WizardMode::Create => WizardStep::Prerequisites,
        WizardMode::Update => WizardStep::OrganizationUpdatingChannel,
    }
}
