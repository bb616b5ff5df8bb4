use super::model::SubmissionFailure;
use super::step::WizardMode;
use crate::shared::errors::ApiError;
use serde::{Deserialize, Serialize};

pub const ERROR_CREATE_CHANNEL: &str = "error_create_channel";
pub const ERROR_UPDATE_CHANNEL: &str = "error_update_channel";
pub const CHANNEL_ERROR_EXISTS: &str = "channel_error_exists";
pub const CHANNEL_ERROR_NOMEMBER: &str = "channel_error_nomember";
pub const ERROR_NO_RAFT_LEADER: &str = "error_no_raft_leader";
pub const ORDERER_UNAVAILABLE_CONSENTER_UPDATE: &str = "orderer_unavailable_consenter_update";
pub const NO_CHANGES: &str = "no_changes";

const VERSION_MISMATCH: [&str; 2] = [
    "but got version",
    "be at version 0, but it is currently at version 1",
];
const NOT_A_MEMBER: [&str; 2] = [
    "existing config does not contain element for",
    "Attempted to include a member which is not in the consortium",
];
const NO_RAFT_LEADER: &str = "no Raft leader";
const UNABLE_TO_GET_BLOCK: &str = "unable to get block";
const NO_DIFFERENCES: &str = "no differences detected between original and updated config";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GrpcResponse {
    pub status: Option<u16>,
    #[serde(rename = "statusMessage")]
    pub status_message: Option<String>,
}

/// Failure body returned by the channel transaction backend.
///
/// `plain` holds the text when the backend answered with a bare string
/// instead of a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendError {
    pub grpc_resp: Option<GrpcResponse>,
    pub stitch_msg: Option<String>,
    pub message_key: Option<String>,
    pub message: Option<String>,
    #[serde(skip)]
    pub plain: Option<String>,
}

impl BackendError {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Self::default()
        }
    }

    /// Decodes an error response body: a JSON object, a JSON string, or raw text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::String(text)) => Self::plain(text),
            Ok(value @ serde_json::Value::Object(_)) => {
                serde_json::from_value(value).unwrap_or_else(|_| Self::plain(body))
            }
            _ => Self::plain(body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.grpc_resp.as_ref().and_then(|resp| resp.status)
    }

    pub fn status_message(&self) -> Option<&str> {
        self.grpc_resp
            .as_ref()
            .and_then(|resp| resp.status_message.as_deref())
            .filter(|message| !message.is_empty())
    }

    /// Best human-readable description of the failure.
    pub fn details(&self) -> Option<String> {
        if let Some(text) = &self.plain {
            return Some(text.clone());
        }
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        if let Some(message) = self.status_message() {
            return Some(message.to_string());
        }
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status(), self.details()) {
            (Some(status), Some(details)) => write!(f, "backend error (status {status}): {details}"),
            (None, Some(details)) => write!(f, "backend error: {details}"),
            (_, None) => write!(f, "backend error"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<ApiError> for BackendError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { body, .. } if !body.trim().is_empty() => Self::from_body(&body),
            other => Self::message(other.to_string()),
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

pub fn map_create_error(err: &BackendError) -> SubmissionFailure {
    let mut title = ERROR_CREATE_CHANNEL;
    if let Some(message) = err.status_message() {
        if contains_any(message, &VERSION_MISMATCH) {
            title = CHANNEL_ERROR_EXISTS;
        }
        if contains_any(message, &NOT_A_MEMBER) {
            title = CHANNEL_ERROR_NOMEMBER;
        }
        if message.contains(NO_RAFT_LEADER) {
            title = ERROR_NO_RAFT_LEADER;
        }
    } else if let Some(key) = err.message_key.as_deref().filter(|key| !key.is_empty()) {
        return SubmissionFailure {
            title: key.to_string(),
            details: err.details(),
        };
    } else if err
        .details()
        .is_some_and(|details| details.contains(NO_RAFT_LEADER))
    {
        title = ERROR_NO_RAFT_LEADER;
    }
    SubmissionFailure {
        title: title.to_string(),
        details: err.details(),
    }
}

pub fn map_update_error(err: &BackendError) -> SubmissionFailure {
    if let Some(text) = &err.plain {
        let title = if text.contains(NO_DIFFERENCES) {
            NO_CHANGES
        } else if text.contains(NO_RAFT_LEADER) {
            ERROR_NO_RAFT_LEADER
        } else {
            ERROR_UPDATE_CHANNEL
        };
        return SubmissionFailure {
            title: title.to_string(),
            details: Some(text.clone()),
        };
    }
    let mut title = ERROR_UPDATE_CHANNEL;
    let mut details = err.message.clone().or_else(|| err.details());
    if let Some(message) = err.status_message() {
        if contains_any(message, &NOT_A_MEMBER[..1]) {
            title = CHANNEL_ERROR_NOMEMBER;
        }
        if message.contains(NO_RAFT_LEADER) {
            title = ERROR_NO_RAFT_LEADER;
            details = Some(message.to_string());
        }
        let block_unavailable = err
            .stitch_msg
            .as_deref()
            .is_some_and(|stitch| stitch.contains(UNABLE_TO_GET_BLOCK));
        if err.status() == Some(503) && block_unavailable {
            title = ORDERER_UNAVAILABLE_CONSENTER_UPDATE;
            details = Some(message.to_string());
        }
        if err.status() == Some(403) {
            details = Some(message.to_string());
        }
    } else if err
        .message
        .as_deref()
        .is_some_and(|message| message.contains(NO_RAFT_LEADER))
    {
        title = ERROR_NO_RAFT_LEADER;
    }
    SubmissionFailure {
        title: title.to_string(),
        details,
    }
}

pub fn map_submission_error(mode: WizardMode, err: &BackendError) -> SubmissionFailure {
    match mode {
        WizardMode::Create => map_create_error(err),
        WizardMode::Update => map_update_error(err),
    }
}
