use crate::models::PnrRecord;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Text fields of the multipart submission.
#[derive(Debug, Default, Validate)]
pub struct SubmitComplaintForm {
    #[validate(length(min = 1, message = "PNR is required"))]
    pub pnr: String,
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitComplaintResponse {
    pub message: String,
    pub pnr: String,
    pub subject: String,
    pub query_generated: String,
    pub image_url: String,
    pub status: String,
}

impl From<PnrRecord> for SubmitComplaintResponse {
    fn from(record: PnrRecord) -> Self {
        Self {
            message: "PNR submitted successfully".to_string(),
            pnr: record.pnr,
            subject: record.subject,
            query_generated: record.query_generated,
            image_url: record.image_url,
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub pnr: String,
    pub subject: String,
    pub query_generated: String,
    pub image_url: String,
    pub status: String,
}

impl From<PnrRecord> for ComplaintResponse {
    fn from(record: PnrRecord) -> Self {
        Self {
            pnr: record.pnr,
            subject: record.subject,
            query_generated: record.query_generated,
            image_url: record.image_url,
            status: record.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    pub expires: i64,
    pub signature: String,
}
