use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::services::report_service::RecentActivity;
use crate::AppState;

#[axum::debug_handler]
pub async fn recent_activity(
    State(state): State<AppState>,
    Path(candidate_external_id): Path<String>,
) -> crate::error::Result<Json<RecentActivity>> {
    let activity = state
        .report_service
        .recent_activity(&candidate_external_id)
        .await?;
    Ok(Json(activity))
}
