use super::{success, Success};
use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use core_types::Membership;
use std::sync::Arc;

/// Parses the `(group, user)` path segments. Both must be integers.
fn parse_pair(group_id: &str, user_id: &str) -> Result<Membership, AppError> {
    match (group_id.parse::<i32>(), user_id.parse::<i32>()) {
        (Ok(group_id), Ok(user_id)) => Ok(Membership { user_id, group_id }),
        _ => Err(AppError::Validation(
            "Los ids de grupo/usuario deben ser numéricos".to_string(),
        )),
    }
}

/// # POST /api/grupos/:id_grupo/:id_usuario
pub async fn add(
    State(state): State<Arc<AppState>>,
    WithRejection(Path((group_id, user_id)), _): WithRejection<Path<(String, String)>, AppError>,
) -> Result<(StatusCode, Json<Success>), AppError> {
    let membership = parse_pair(&group_id, &user_id)?;
    let inserted = state
        .db_repo
        .add_membership(membership)
        .await
        .map_err(|e| AppError::database("Ha habido un error al añadir el usuario al grupo", e))?;

    if !inserted {
        return Err(AppError::OperationFailed(
            "No se pudo añadir el usuario al grupo".to_string(),
        ));
    }
    tracing::info!(
        group_id = membership.group_id,
        user_id = membership.user_id,
        "User added to group."
    );
    Ok(success(StatusCode::CREATED, "Usuario añadido al grupo correctamente"))
}

/// # DELETE /api/grupos/:id_grupo/:id_usuario
/// 404 when the user was not in the group.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    WithRejection(Path((group_id, user_id)), _): WithRejection<Path<(String, String)>, AppError>,
) -> Result<(StatusCode, Json<Success>), AppError> {
    let membership = parse_pair(&group_id, &user_id)?;
    let removed = state
        .db_repo
        .remove_membership(membership)
        .await
        .map_err(|e| AppError::database("Ha habido un error al eliminar el usuario del grupo", e))?;

    if removed == 0 {
        return Err(AppError::NotFound(
            "La relación usuario-grupo no existe".to_string(),
        ));
    }
    Ok(success(StatusCode::OK, "Usuario eliminado del grupo correctamente"))
}
