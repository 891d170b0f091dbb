use serde::{Deserialize, Serialize};

/// Status every record starts in. Later statuses are free-form strings.
pub const PENDING_STATUS: &str = "Pending";

/// A submitted complaint, keyed by the caller-chosen PNR.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PnrRecord {
    #[serde(rename = "_id")]
    pub pnr: String,
    pub subject: String,
    pub image_url: String,
    pub query_generated: String,
    pub status: String,
}

impl PnrRecord {
    pub fn new(pnr: String, subject: String, image_url: String, query_generated: String) -> Self {
        Self {
            pnr,
            subject,
            image_url,
            query_generated,
            status: PENDING_STATUS.to_string(),
        }
    }
}
