pub mod admin;
pub mod complaints;

pub use admin::{ChangeStatusRequest, MessageResponse, PendingComplaintsResponse};
pub use complaints::{ComplaintResponse, ImageParams, SubmitComplaintForm, SubmitComplaintResponse};
