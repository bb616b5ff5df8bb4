use super::capabilities::ExistingCapabilities;
use super::validation::ADMIN_ROLE;
use crate::shared::serde_ext::{
    optional_text_from_string_or_number, optional_u32_from_string_or_number,
};
use serde::{Deserialize, Deserializer, Serialize};

fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text_from_string_or_number(deserializer)?.unwrap_or_default())
}

/// A channel member with governance roles. Unique by `msp`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Organization {
    pub msp: String,
    pub roles: Vec<String>,
    pub admins: Vec<String>,
    pub root_certs: Vec<String>,
    pub host_url: Option<String>,
    pub node_ou: bool,
}

impl Organization {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

/// A raft ordering node. Set comparisons use `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Consenter {
    pub name: String,
    pub host: String,
    #[serde(deserialize_with = "port_from_string_or_number")]
    pub port: String,
    pub client_tls_cert: Option<String>,
    pub server_tls_cert: Option<String>,
    pub msp_id: Option<String>,
}

impl Consenter {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum PolicyType {
    #[default]
    #[serde(rename = "MAJORITY")]
    Majority,
    #[serde(rename = "SPECIFIC")]
    Specific,
}

impl PolicyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Majority => "MAJORITY",
            Self::Specific => "SPECIFIC",
        }
    }
}

/// Lifecycle or endorsement rule. `n` only matters for `SPECIFIC`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChaincodePolicy {
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub members: Vec<String>,
    #[serde(deserialize_with = "optional_u32_from_string_or_number")]
    pub n: Option<u32>,
}

impl ChaincodePolicy {
    pub fn is_satisfiable(&self) -> bool {
        self.policy_type != PolicyType::Specific
            || (!self.members.is_empty() && self.n.is_some_and(|n| n > 0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Identity {
    pub name: String,
    pub cert: String,
    pub private_key: Option<String>,
}

impl Identity {
    pub fn can_sign(&self) -> bool {
        self.private_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MspDefinition {
    pub msp_id: String,
    pub display_name: String,
    pub host_url: Option<String>,
    pub root_certs: Vec<String>,
    pub admins: Vec<String>,
    pub node_ou: bool,
}

impl MspDefinition {
    pub fn shares_root_cert(&self, root_certs: &[String]) -> bool {
        self.root_certs.iter().any(|cert| root_certs.contains(cert))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RaftNode {
    pub display_name: String,
    pub backend_addr: String,
    pub msp_id: Option<String>,
    pub client_tls_cert: Option<String>,
    pub server_tls_cert: Option<String>,
    pub location: Option<String>,
}

impl RaftNode {
    pub fn to_consenter(&self) -> Consenter {
        let (host, port) = self
            .backend_addr
            .split_once(':')
            .unwrap_or((self.backend_addr.as_str(), ""));
        Consenter {
            name: self.display_name.clone(),
            host: host.to_string(),
            port: port.to_string(),
            client_tls_cert: self.client_tls_cert.clone(),
            // Replaced by the deployer's server cert when one is issued.
            server_tls_cert: self.client_tls_cert.clone(),
            msp_id: self.msp_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Orderer {
    pub id: String,
    pub display_name: String,
    pub msp_id: String,
    pub url2use: String,
    pub backend_addr: String,
    pub raft: Option<Vec<RaftNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AclEntry {
    pub resource: String,
    pub definition: String,
}

/// An ACL policy that references an org which is not a channel member.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AclError {
    pub definition: String,
    pub org: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrdererOrg {
    #[serde(alias = "id")]
    pub msp_id: String,
    pub roles: Vec<String>,
    pub root_certs: Vec<String>,
    pub admins: Vec<String>,
    pub host_url: Option<String>,
}

/// Existing channel member as reported by the channel config.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelMember {
    pub id: String,
    pub roles: Vec<String>,
    pub admins: Vec<String>,
    pub root_certs: Vec<String>,
    pub host_url: Option<String>,
}

/// "n of out_of" admin signatures for channel updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PolicySelection {
    pub n: u32,
    pub out_of: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockParamInputs {
    #[serde(deserialize_with = "optional_text_from_string_or_number")]
    pub absolute_max_bytes: Option<String>,
    #[serde(deserialize_with = "optional_text_from_string_or_number")]
    pub max_message_count: Option<String>,
    #[serde(deserialize_with = "optional_text_from_string_or_number")]
    pub preferred_max_bytes: Option<String>,
    #[serde(deserialize_with = "optional_text_from_string_or_number")]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RaftParamInputs {
    #[serde(deserialize_with = "optional_text_from_string_or_number")]
    pub snapshot_interval_size: Option<String>,
}

/// Configuration the channel already has. Empty when creating a channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelBaseline {
    pub capabilities: ExistingCapabilities,
    pub block_params: BlockParamInputs,
    pub raft_params: RaftParamInputs,
    pub consenters: Vec<Consenter>,
    pub orderer_orgs: Vec<OrdererOrg>,
    pub members: Vec<ChannelMember>,
    pub acls: Vec<AclEntry>,
    pub n_out_of: Option<PolicySelection>,
    pub lifecycle_policy: Option<ChaincodePolicy>,
    pub endorsement_policy: Option<ChaincodePolicy>,
}

/// A failed submission as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionFailure {
    pub title: String,
    pub details: Option<String>,
}
