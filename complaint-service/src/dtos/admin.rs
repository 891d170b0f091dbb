use crate::models::ComplaintEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    #[serde(default)]
    pub complaint_id: String,
    /// Free-form; any string, including the empty one, is accepted.
    #[serde(default)]
    pub new_status: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingComplaintsResponse {
    pub pending_complaints: Vec<ComplaintEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
