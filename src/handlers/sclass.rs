use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::cascade::Cascade;
use super::{require, Valid, Validate};
use crate::error::{ApiError, ApiResult, MessageBody};
use crate::models::{new_id, Sclass};
use crate::rest::AppState;
use crate::views::{SclassView, StudentView};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SclassCreate {
    pub sclass_name: String,
    #[serde(rename = "adminID")]
    pub admin_id: String,
}

impl Validate for SclassCreate {
    fn validate(&self) -> ApiResult<()> {
        require("sclassName", &self.sclass_name)?;
        require("adminID", &self.admin_id)
    }
}

pub async fn sclass_create(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<SclassCreate>,
) -> ApiResult<(StatusCode, Json<SclassView>)> {
    let storage = &state.storage;
    if storage.admins.get(&payload.admin_id)?.is_none() {
        return Err(ApiError::not_found("School not found"));
    }
    if storage
        .sclasses
        .find_one(|c| c.school == payload.admin_id && c.sclass_name == payload.sclass_name)?
        .is_some()
    {
        return Err(ApiError::conflict("Sorry this class name already exists"));
    }

    let sclass = Sclass {
        id: new_id(),
        sclass_name: payload.sclass_name,
        school: payload.admin_id,
    };
    storage.sclasses.put(&sclass)?;

    info!(sclass_id = %sclass.id, school = %sclass.school, "class created");
    Ok((StatusCode::CREATED, Json(storage.sclass_view(sclass)?)))
}

pub async fn sclass_list(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<Vec<SclassView>>> {
    let sclasses = state.storage.sclasses.find(|c| c.school == school_id)?;
    if sclasses.is_empty() {
        return Err(ApiError::not_found("No sclasses found"));
    }
    let views = sclasses
        .into_iter()
        .map(|c| state.storage.sclass_view(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

pub async fn get_sclass_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SclassView>> {
    let sclass = state
        .storage
        .sclasses
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("No class found"))?;
    Ok(Json(state.storage.sclass_view(sclass)?))
}

pub async fn get_sclass_students(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<StudentView>>> {
    let students = state.storage.students.find(|s| s.sclass_name == id)?;
    if students.is_empty() {
        return Err(ApiError::not_found("No students found"));
    }
    let views = students
        .into_iter()
        .map(|s| state.storage.student_view(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// Removes the class together with its students, subjects and teachers.
pub async fn delete_sclass(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SclassView>> {
    let removed = Cascade::default().sclasses([id]).apply(&state.storage)?;
    let sclass = removed
        .sclasses
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Class not found"))?;
    Ok(Json(state.storage.sclass_view(sclass)?))
}

pub async fn delete_sclasses(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    let ids: Vec<String> = state
        .storage
        .sclasses
        .find(|c| c.school == school_id)?
        .into_iter()
        .map(|c| c.id)
        .collect();
    if ids.is_empty() {
        return Err(ApiError::not_found("No classes found to delete"));
    }
    Cascade::default().sclasses(ids).apply(&state.storage)?;
    Ok(Json(MessageBody::new("Classes deleted successfully")))
}
