use super::Resource;
use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use core_types::{Group, GroupWithMembers};
use database::DbError;
use std::sync::Arc;

/// # GET /api/grupos/:id
/// The group and its members, or 404 if the group does not exist.
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<GroupWithMembers>, AppError> {
    match state.db_repo.get_group_with_members(id).await {
        Ok(group) => Ok(Json(group)),
        Err(DbError::NotFound) => Err(AppError::NotFound("El grupo no existe".to_string())),
        Err(e) => Err(AppError::database(Group::MESSAGES.find_failed, e)),
    }
}
