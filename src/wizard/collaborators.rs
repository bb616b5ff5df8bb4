use super::model::{Consenter, Identity, MspDefinition, Orderer, RaftNode};
use super::outcome::BackendError;
use super::step::WizardMode;
use super::submission::{CreateChannelRequest, UpdateChannelRequest};
use crate::shared::errors::ApiError;
use crate::shared::logging::WizardLog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub trait MspDirectory: Send + Sync {
    fn list_msps(&self) -> Result<Vec<MspDefinition>, ApiError>;
}

pub trait IdentityStore: Send + Sync {
    fn list_identities(&self) -> Result<Vec<Identity>, ApiError>;
}

pub trait OrdererRegistry: Send + Sync {
    fn list_orderers(&self) -> Result<Vec<Orderer>, ApiError>;

    /// Fresh details, bypassing any cache, including the raft node list.
    fn orderer_details(&self, orderer_id: &str) -> Result<Orderer, ApiError>;

    /// Signed TLS certs for nodes whose definitions lack them.
    fn deployer_tls_certs(&self, nodes: &[RaftNode]) -> Result<Vec<RaftNode>, ApiError>;

    fn check_health(&self, orderer: &Orderer) -> Result<(), ApiError>;

    /// Address a channel update is sent to: the orderer's advertised url, or
    /// the first consenter the channel already has.
    fn resolve_orderer_url(
        &self,
        orderer: &Orderer,
        existing_consenters: &[Consenter],
    ) -> Result<String, ApiError> {
        if !orderer.url2use.is_empty() {
            return Ok(orderer.url2use.clone());
        }
        existing_consenters
            .first()
            .map(Consenter::address)
            .ok_or_else(|| ApiError::NoOrdererAddress {
                orderer_id: orderer.id.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelResponse {
    #[serde(rename = "isOrdererSignatureNeeded")]
    pub is_orderer_signature_needed: Option<bool>,
}

pub trait ChannelTransactions: Send + Sync {
    fn create_channel(&self, request: &CreateChannelRequest)
        -> Result<ChannelResponse, BackendError>;
    fn update_channel(&self, request: &UpdateChannelRequest)
        -> Result<ChannelResponse, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub kind: &'static str,
    pub channel_id: String,
    pub orderer_url: Option<String>,
}

impl AnalyticsEvent {
    pub fn channel_submitted(mode: WizardMode, channel_id: &str, orderer_url: Option<&str>) -> Self {
        Self {
            kind: match mode {
                WizardMode::Create => "channel.created",
                WizardMode::Update => "channel.updated",
            },
            channel_id: channel_id.to_string(),
            orderer_url: orderer_url.map(str::to_string),
        }
    }
}

/// Fire-and-forget; implementations must not fail the caller.
pub trait Analytics: Send + Sync {
    fn trigger(&self, event: &AnalyticsEvent);
}

/// Records analytics events in the wizard log.
#[derive(Debug, Clone, Default)]
pub struct LogAnalytics {
    log: WizardLog,
}

impl LogAnalytics {
    pub fn new(log: WizardLog) -> Self {
        Self { log }
    }
}

impl Analytics for LogAnalytics {
    fn trigger(&self, event: &AnalyticsEvent) {
        let message = serde_json::to_string(event).unwrap_or_else(|_| event.channel_id.clone());
        self.log.info(event.kind, &message);
    }
}

/// Everything a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub msps: Arc<dyn MspDirectory>,
    pub identities: Arc<dyn IdentityStore>,
    pub orderers: Arc<dyn OrdererRegistry>,
    pub channels: Arc<dyn ChannelTransactions>,
    pub analytics: Arc<dyn Analytics>,
}

impl Collaborators {
    /// One backend serving every role.
    pub fn from_backend<B>(backend: Arc<B>, analytics: Arc<dyn Analytics>) -> Self
    where
        B: MspDirectory + IdentityStore + OrdererRegistry + ChannelTransactions + 'static,
    {
        Self {
            msps: backend.clone(),
            identities: backend.clone(),
            orderers: backend.clone(),
            channels: backend,
            analytics,
        }
    }
}
