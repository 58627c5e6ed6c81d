use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::cascade::Cascade;
use super::{require, Valid, Validate};
use crate::error::{ApiError, ApiResult, MessageBody};
use crate::models::{new_id, Subject};
use crate::rest::AppState;
use crate::storage::{tx_put, Storage, TxResult};
use crate::views::SubjectView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub sub_name: String,
    pub sub_code: String,
    pub sessions: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCreate {
    pub subjects: Vec<NewSubject>,
    pub sclass_name: String,
    #[serde(rename = "adminID")]
    pub admin_id: String,
}

impl Validate for SubjectCreate {
    fn validate(&self) -> ApiResult<()> {
        require("sclassName", &self.sclass_name)?;
        require("adminID", &self.admin_id)?;
        if self.subjects.is_empty() {
            return Err(ApiError::validation("subjects is required"));
        }
        let mut codes = HashSet::new();
        for subject in &self.subjects {
            require("subName", &subject.sub_name)?;
            require("subCode", &subject.sub_code)?;
            if subject.sessions == 0 {
                return Err(ApiError::validation("sessions must be at least 1"));
            }
            if !codes.insert(subject.sub_code.as_str()) {
                return Err(ApiError::validation(format!(
                    "subCode {} is repeated",
                    subject.sub_code
                )));
            }
        }
        Ok(())
    }
}

fn views(storage: &Storage, subjects: Vec<Subject>) -> ApiResult<Json<Vec<SubjectView>>> {
    if subjects.is_empty() {
        return Err(ApiError::not_found("No subjects found"));
    }
    let views = subjects
        .into_iter()
        .map(|s| storage.subject_view(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

/// Creates every subject in the body or none of them.
pub async fn subject_create(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<SubjectCreate>,
) -> ApiResult<(StatusCode, Json<Vec<SubjectView>>)> {
    let storage = &state.storage;
    if storage.sclasses.get(&payload.sclass_name)?.is_none() {
        return Err(ApiError::not_found("Class not found"));
    }
    let codes: HashSet<&str> = payload.subjects.iter().map(|s| s.sub_code.as_str()).collect();
    if storage
        .subjects
        .find_one(|s| s.school == payload.admin_id && codes.contains(s.sub_code.as_str()))?
        .is_some()
    {
        return Err(ApiError::conflict(
            "Sorry this subcode must be unique as it already exists",
        ));
    }

    let subjects: Vec<Subject> = payload
        .subjects
        .iter()
        .map(|s| Subject {
            id: new_id(),
            sub_name: s.sub_name.clone(),
            sub_code: s.sub_code.clone(),
            sessions: s.sessions,
            sclass_name: payload.sclass_name.clone(),
            school: payload.admin_id.clone(),
            teacher: None,
        })
        .collect();

    storage.subjects.tree().transaction(|tree| -> TxResult<()> {
        for subject in &subjects {
            tx_put(tree, subject)?;
        }
        Ok(())
    })?;

    info!(count = subjects.len(), sclass = %payload.sclass_name, "subjects created");
    let created = subjects
        .into_iter()
        .map(|s| storage.subject_view(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn all_subjects(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<Vec<SubjectView>>> {
    let subjects = state.storage.subjects.find(|s| s.school == school_id)?;
    views(&state.storage, subjects)
}

pub async fn class_subjects(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<Vec<SubjectView>>> {
    let subjects = state.storage.subjects.find(|s| s.sclass_name == class_id)?;
    views(&state.storage, subjects)
}

/// Subjects of a class that nobody teaches yet.
pub async fn free_subject_list(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<Vec<SubjectView>>> {
    let subjects = state
        .storage
        .subjects
        .find(|s| s.sclass_name == class_id && s.teacher.is_none())?;
    views(&state.storage, subjects)
}

pub async fn get_subject_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SubjectView>> {
    let subject = state
        .storage
        .subjects
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("No subject found"))?;
    Ok(Json(state.storage.subject_view(subject)?))
}

pub async fn delete_subject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SubjectView>> {
    let removed = Cascade::default().subjects([id]).apply(&state.storage)?;
    let subject = removed
        .subjects
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Subject not found"))?;
    Ok(Json(state.storage.subject_view(subject)?))
}

fn delete_subjects_where<F>(storage: &Storage, pred: F) -> ApiResult<Json<MessageBody>>
where
    F: Fn(&Subject) -> bool,
{
    let ids: Vec<String> = storage
        .subjects
        .find(pred)?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if ids.is_empty() {
        return Err(ApiError::not_found("No subjects found to delete"));
    }
    Cascade::default().subjects(ids).apply(storage)?;
    Ok(Json(MessageBody::new("Subjects deleted successfully")))
}

pub async fn delete_subjects(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    delete_subjects_where(&state.storage, |s| s.school == school_id)
}

pub async fn delete_subjects_by_class(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    delete_subjects_where(&state.storage, |s| s.sclass_name == class_id)
}
