use super::types::{Listing, MspDto, TlsCertRequest};
use super::ApiError;
use crate::config::Settings;
use crate::wizard::collaborators::{
    ChannelResponse, ChannelTransactions, IdentityStore, MspDirectory, OrdererRegistry,
};
use crate::wizard::model::{Identity, MspDefinition, Orderer, RaftNode};
use crate::wizard::outcome::BackendError;
use crate::wizard::submission::{CreateChannelRequest, UpdateChannelRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Blocking JSON client for the channel backend.
#[derive(Debug, Clone)]
pub struct RestClient {
    api_base: String,
    agent: ureq::Agent,
}

impl RestClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base: api_base.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.api_base.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn with_query(url: String, query: &[(&str, String)]) -> String {
        if query.is_empty() {
            return url;
        }
        let encoded = query
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{url}?{encoded}")
    }

    fn read_body(url: &str, result: Result<ureq::Response, ureq::Error>) -> Result<String, ApiError> {
        match result {
            Ok(response) => response.into_string().map_err(|e| ApiError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(ureq::Error::Status(status, response)) => Err(ApiError::Status {
                url: url.to_string(),
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(ApiError::Request {
                url: url.to_string(),
                reason: transport.to_string(),
            }),
        }
    }

    fn decode<T: for<'de> Deserialize<'de>>(url: &str, body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = Self::with_query(self.endpoint(path), query);
        let body = Self::read_body(&url, self.agent.get(&url).call())?;
        Self::decode(&url, &body)
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let url = self.endpoint(path);
        let payload = serde_json::to_value(body).map_err(|source| ApiError::Encode {
            url: url.clone(),
            source,
        })?;
        Self::read_body(&url, self.agent.post(&url).send_json(payload))
    }

    fn post_channel<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ChannelResponse, BackendError> {
        let body = self.post_json(path, body)?;
        if body.trim().is_empty() {
            return Ok(ChannelResponse::default());
        }
        let url = self.endpoint(path);
        Ok(Self::decode(&url, &body)?)
    }
}

impl MspDirectory for RestClient {
    fn list_msps(&self) -> Result<Vec<MspDefinition>, ApiError> {
        let listing: Listing<MspDto> = self.get_json("msps", &[])?;
        Ok(listing
            .into_items()
            .into_iter()
            .map(MspDefinition::from)
            .collect())
    }
}

impl IdentityStore for RestClient {
    fn list_identities(&self) -> Result<Vec<Identity>, ApiError> {
        let listing: Listing<Identity> = self.get_json("identities", &[])?;
        Ok(listing.into_items())
    }
}

impl OrdererRegistry for RestClient {
    fn list_orderers(&self) -> Result<Vec<Orderer>, ApiError> {
        let listing: Listing<Orderer> = self.get_json("orderers", &[])?;
        Ok(listing.into_items())
    }

    fn orderer_details(&self, orderer_id: &str) -> Result<Orderer, ApiError> {
        let path = format!("orderers/{}", urlencoding::encode(orderer_id));
        self.get_json(&path, &[("cache", "skip".to_string())])
    }

    fn deployer_tls_certs(&self, nodes: &[RaftNode]) -> Result<Vec<RaftNode>, ApiError> {
        let url = self.endpoint("deployer/tls_certs");
        let body = self.post_json("deployer/tls_certs", &TlsCertRequest { nodes })?;
        Self::decode(&url, &body)
    }

    fn check_health(&self, orderer: &Orderer) -> Result<(), ApiError> {
        let path = format!("orderers/{}/health", urlencoding::encode(&orderer.id));
        let url = self.endpoint(&path);
        Self::read_body(&url, self.agent.get(&url).call()).map(|_| ())
    }
}

impl ChannelTransactions for RestClient {
    fn create_channel(
        &self,
        request: &CreateChannelRequest,
    ) -> Result<ChannelResponse, BackendError> {
        self.post_channel("channels/create", request)
    }

    fn update_channel(
        &self,
        request: &UpdateChannelRequest,
    ) -> Result<ChannelResponse, BackendError> {
        let path = format!("channels/{}/update", urlencoding::encode(&request.channel_id));
        self.post_channel(&path, request)
    }
}
