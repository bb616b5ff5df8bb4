//! Wire shapes of the backend responses that differ from the wizard model.

use crate::wizard::model::{MspDefinition, RaftNode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOusDto {
    #[serde(default)]
    pub enable: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MspDto {
    pub msp_id: String,
    pub display_name: String,
    pub host_url: Option<String>,
    pub root_certs: Vec<String>,
    pub admins: Vec<String>,
    pub fabric_node_ous: Option<NodeOusDto>,
}

impl From<MspDto> for MspDefinition {
    fn from(dto: MspDto) -> Self {
        Self {
            display_name: if dto.display_name.is_empty() {
                dto.msp_id.clone()
            } else {
                dto.display_name
            },
            msp_id: dto.msp_id,
            host_url: dto.host_url,
            root_certs: dto.root_certs,
            admins: dto.admins,
            node_ou: dto.fabric_node_ous.is_some_and(|ous| ous.enable),
        }
    }
}

/// Listings come back either bare or wrapped in a named field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Msps { msps: Vec<T> },
    Identities { identities: Vec<T> },
    Orderers { orderers: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items)
            | Self::Msps { msps: items }
            | Self::Identities { identities: items }
            | Self::Orderers { orderers: items } => items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TlsCertRequest<'a> {
    pub nodes: &'a [RaftNode],
}
