//! Administrative endpoints.
//!
//! `list_pending` reads the separate `complaints` collection, while
//! `change_status` updates records of the `pnrs` collection.

use crate::dtos::{ChangeStatusRequest, MessageResponse, PendingComplaintsResponse};
use crate::services::{collect_pending, PendingComplaints};
use crate::startup::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use service_core::error::AppError;

pub async fn list_pending(State(state): State<AppState>) -> Result<Response, AppError> {
    let groups = state.store.list_complaint_groups().await.map_err(|e| {
        tracing::error!("Error fetching pending complaints: {}", e);
        e
    })?;

    let response = match collect_pending(groups) {
        PendingComplaints::NoComplaints => {
            Json(MessageResponse::new("No complaints found")).into_response()
        }
        PendingComplaints::NonePending => {
            Json(MessageResponse::new("No pending complaints found")).into_response()
        }
        PendingComplaints::Found(pending_complaints) => {
            tracing::debug!(count = pending_complaints.len(), "Pending complaints listed");
            Json(PendingComplaintsResponse { pending_complaints }).into_response()
        }
    };

    Ok(response)
}

pub async fn change_status(
    State(state): State<AppState>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let matched = state
        .store
        .update_pnr_status(&request.complaint_id, &request.new_status)
        .await
        .map_err(|e| {
            tracing::error!(
                complaint_id = %request.complaint_id,
                "Error updating complaint status: {}",
                e
            );
            AppError::StatusUpdateFailed(anyhow::Error::new(e))
        })?;

    if !matched {
        tracing::warn!(
            complaint_id = %request.complaint_id,
            "Status update for unknown complaint"
        );
        return Err(AppError::StatusUpdateFailed(anyhow::anyhow!(
            "No complaint found with id '{}'",
            request.complaint_id
        )));
    }

    counter!("complaint_status_updates_total").increment(1);
    tracing::info!(
        complaint_id = %request.complaint_id,
        new_status = %request.new_status,
        "Complaint status updated"
    );

    Ok(Json(MessageResponse::new(
        "Complaint status updated successfully",
    )))
}
