//! List, get, create, rename and delete for users and groups.
//!
//! Both resources are `{id, name}` tables, so the handlers are generic over
//! [`Resource`] and only the client-facing messages differ.

use super::{success, NamePayload, Success};
use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use core_types::{EntityName, Group, User};
use database::Entity;
use serde::Serialize;
use std::sync::Arc;

/// Messages returned to clients for one resource.
pub struct Messages {
    pub list_failed: &'static str,
    pub find_failed: &'static str,
    pub create_failed: &'static str,
    pub delete_failed: &'static str,
    pub rename_failed: &'static str,
    pub renamed: &'static str,
}

const CREATED: &str = "Los datos se han insertado correctamente";
const DELETED: &str = "Los datos se han eliminado correctamente";

pub trait Resource: Entity + Serialize + 'static {
    const MESSAGES: Messages;
}

impl Resource for User {
    const MESSAGES: Messages = Messages {
        list_failed: "Ha habido un error al devolver los datos de los usuarios",
        find_failed: "Ha habido un error al devolver los datos del usuario",
        create_failed: "Ha habido un error al añadir el usuario a la base de datos",
        delete_failed: "Ha habido un error al eliminar el usuario de la base de datos",
        rename_failed: "Ha habido un error al modificar el usuario",
        renamed: "Se ha modificado correctamente el nombre del usuario",
    };
}

impl Resource for Group {
    const MESSAGES: Messages = Messages {
        list_failed: "Ha habido un error al devolver los datos de los grupos",
        find_failed: "Ha habido un error al devolver los datos del grupo",
        create_failed: "Ha habido un error al añadir el grupo a la base de datos",
        delete_failed: "Ha habido un error al eliminar el grupo de la base de datos",
        rename_failed: "Ha habido un error al modificar el nombre del grupo",
        renamed: "Se ha modificado correctamente el nombre del grupo",
    };
}

/// # GET /api/usuarios, GET /api/grupos
pub async fn list<R: Resource>(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<R>>, AppError> {
    let rows = state
        .db_repo
        .list::<R>()
        .await
        .map_err(|e| AppError::database(R::MESSAGES.list_failed, e))?;
    Ok(Json(rows))
}

/// # GET /api/usuarios/:id
/// Responds with the matching rows: a one-element array, or an empty one.
pub async fn find<R: Resource>(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<Vec<R>>, AppError> {
    let rows = state
        .db_repo
        .find::<R>(id)
        .await
        .map_err(|e| AppError::database(R::MESSAGES.find_failed, e))?;
    Ok(Json(rows))
}

/// # POST /api/usuarios, POST /api/grupos
pub async fn create<R: Resource>(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(payload), _): WithRejection<Json<NamePayload>, AppError>,
) -> Result<(StatusCode, Json<Success>), AppError> {
    let name = EntityName::parse(payload.name.as_deref())?;
    let id = state
        .db_repo
        .create::<R>(&name)
        .await
        .map_err(|e| AppError::database(R::MESSAGES.create_failed, e))?;
    tracing::info!(table = R::TABLE, id, "Row created.");
    Ok(success(StatusCode::CREATED, CREATED))
}

/// # DELETE /api/usuarios/:id, DELETE /api/grupos/:id
/// Succeeds whether or not a row matched.
pub async fn delete<R: Resource>(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<(StatusCode, Json<Success>), AppError> {
    let removed = state
        .db_repo
        .delete::<R>(id)
        .await
        .map_err(|e| AppError::database(R::MESSAGES.delete_failed, e))?;
    tracing::debug!(table = R::TABLE, id, removed, "Delete executed.");
    Ok(success(StatusCode::OK, DELETED))
}

/// # PUT /api/usuarios/:id, PUT /api/grupos/:id
/// Succeeds whether or not a row matched.
pub async fn rename<R: Resource>(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<NamePayload>, AppError>,
) -> Result<(StatusCode, Json<Success>), AppError> {
    let name = EntityName::parse(payload.name.as_deref())?;
    state
        .db_repo
        .rename::<R>(id, &name)
        .await
        .map_err(|e| AppError::database(R::MESSAGES.rename_failed, e))?;
    Ok(success(StatusCode::OK, R::MESSAGES.renamed))
}
