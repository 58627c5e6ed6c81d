use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sled::transaction::TransactionalTree;
use sled::Transactional;
use std::sync::Arc;
use tracing::info;

use super::cascade::Cascade;
use super::{calendar_date, require, require_email, LoginRequest, Valid, Validate};
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult, MessageBody};
use crate::models::{new_id, AttendanceStatus, Role, Subject, Teacher};
use crate::rest::AppState;
use crate::storage::{abort, tx_get, tx_modify, tx_put, TxResult};
use crate::views::TeacherView;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRegister {
    pub name: String,
    pub email: String,
    pub password: String,
    pub school: String,
    pub teach_subject: String,
    pub teach_sclass: String,
}

impl Validate for TeacherRegister {
    fn validate(&self) -> ApiResult<()> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("password", &self.password)?;
        require("school", &self.school)?;
        require("teachSubject", &self.teach_subject)?;
        require("teachSclass", &self.teach_sclass)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSubjectUpdate {
    pub teacher_id: String,
    pub teach_subject: String,
}

impl Validate for TeacherSubjectUpdate {
    fn validate(&self) -> ApiResult<()> {
        require("teacherId", &self.teacher_id)?;
        require("teachSubject", &self.teach_subject)
    }
}

#[derive(Deserialize)]
pub struct AttendanceInput {
    pub status: AttendanceStatus,
    #[serde(deserialize_with = "calendar_date")]
    pub date: NaiveDate,
}

impl Validate for AttendanceInput {
    fn validate(&self) -> ApiResult<()> {
        Ok(())
    }
}

/// Point `subject` at `teacher_id` and clear whichever teacher held it before.
fn claim_subject(
    teachers: &TransactionalTree,
    subject: &mut Subject,
    teacher_id: &str,
) -> TxResult<()> {
    if let Some(previous) = subject.teacher.as_deref().filter(|p| *p != teacher_id) {
        let subject_id = subject.id.clone();
        tx_modify::<Teacher, _>(teachers, previous, |t| {
            if t.teach_subject.as_deref() == Some(subject_id.as_str()) {
                t.teach_subject = None;
                return true;
            }
            false
        })?;
    }
    subject.teacher = Some(teacher_id.to_string());
    Ok(())
}

pub async fn teacher_register(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<TeacherRegister>,
) -> ApiResult<(StatusCode, Json<TeacherView>)> {
    let storage = &state.storage;
    if storage
        .teachers
        .find_one(|t| t.email == payload.email)?
        .is_some()
    {
        return Err(ApiError::conflict("Email already exists"));
    }
    if storage.admins.get(&payload.school)?.is_none() {
        return Err(ApiError::not_found("School not found"));
    }
    if storage.sclasses.get(&payload.teach_sclass)?.is_none() {
        return Err(ApiError::not_found("Class not found"));
    }

    let subject_id = payload.teach_subject.clone();
    let teacher = Teacher {
        id: new_id(),
        name: payload.name,
        email: payload.email,
        password: hash_password(&payload.password, state.bcrypt_cost)?,
        role: Role::Teacher,
        school: payload.school,
        teach_subject: Some(payload.teach_subject),
        teach_sclass: Some(payload.teach_sclass),
        attendance: vec![],
    };

    (storage.teachers.tree(), storage.subjects.tree()).transaction(|(teachers, subjects)| {
        let Some(mut subject) = tx_get::<Subject>(subjects, &subject_id)? else {
            return abort(ApiError::not_found("Subject not found"));
        };
        claim_subject(teachers, &mut subject, &teacher.id)?;
        tx_put(teachers, &teacher)?;
        tx_put(subjects, &subject)?;
        Ok(())
    })?;

    info!(teacher_id = %teacher.id, school = %teacher.school, "teacher registered");
    Ok((StatusCode::CREATED, Json(storage.teacher_view(teacher)?)))
}

pub async fn teacher_login(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<LoginRequest>,
) -> ApiResult<Json<TeacherView>> {
    let teacher = state
        .storage
        .teachers
        .find_one(|t| t.email == payload.email)?
        .ok_or_else(|| ApiError::not_found("Teacher not found"))?;
    if !verify_password(&payload.password, &teacher.password)? {
        return Err(ApiError::BadCredentials);
    }
    info!(teacher_id = %teacher.id, "teacher logged in");
    Ok(Json(state.storage.teacher_view(teacher)?))
}

pub async fn get_teachers(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<Vec<TeacherView>>> {
    let teachers = state.storage.teachers.find(|t| t.school == school_id)?;
    if teachers.is_empty() {
        return Err(ApiError::not_found("No teachers found"));
    }
    let views = teachers
        .into_iter()
        .map(|t| state.storage.teacher_view(t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

pub async fn get_teacher_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TeacherView>> {
    let teacher = state
        .storage
        .teachers
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("No teacher found"))?;
    Ok(Json(state.storage.teacher_view(teacher)?))
}

/// Reassign a teacher's subject. The teacher, the old subject and the new
/// subject change together or not at all. These are deliberately not three
/// independent writes, so a failure part way never leaves them disagreeing.
pub async fn update_teacher_subject(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<TeacherSubjectUpdate>,
) -> ApiResult<Json<TeacherView>> {
    let storage = &state.storage;
    let updated = (storage.teachers.tree(), storage.subjects.tree()).transaction(
        |(teachers, subjects)| {
            let Some(mut teacher) = tx_get::<Teacher>(teachers, &payload.teacher_id)? else {
                return abort(ApiError::not_found("Teacher not found"));
            };
            let Some(mut subject) = tx_get::<Subject>(subjects, &payload.teach_subject)? else {
                return abort(ApiError::not_found("Subject not found"));
            };

            if let Some(old) = teacher
                .teach_subject
                .as_deref()
                .filter(|old| *old != subject.id)
            {
                tx_modify::<Subject, _>(subjects, old, |s| {
                    if s.teacher.as_deref() == Some(teacher.id.as_str()) {
                        s.teacher = None;
                        return true;
                    }
                    false
                })?;
            }

            claim_subject(teachers, &mut subject, &teacher.id)?;
            teacher.teach_subject = Some(subject.id.clone());
            tx_put(teachers, &teacher)?;
            tx_put(subjects, &subject)?;
            Ok(teacher)
        },
    )?;

    info!(teacher_id = %updated.id, subject_id = %payload.teach_subject, "teacher subject reassigned");
    Ok(Json(storage.teacher_view(updated)?))
}

pub async fn delete_teacher(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TeacherView>> {
    let removed = Cascade::default().teachers([id]).apply(&state.storage)?;
    let teacher = removed
        .teachers
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Teacher not found"))?;
    Ok(Json(state.storage.teacher_view(teacher)?))
}

pub async fn delete_teachers(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    let ids: Vec<String> = state
        .storage
        .teachers
        .find(|t| t.school == school_id)?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if ids.is_empty() {
        return Err(ApiError::not_found("No teachers found to delete"));
    }
    Cascade::default().teachers(ids).apply(&state.storage)?;
    Ok(Json(MessageBody::new("Teachers deleted successfully")))
}

pub async fn delete_teachers_by_class(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    let ids: Vec<String> = state
        .storage
        .teachers
        .find(|t| t.teach_sclass.as_deref() == Some(class_id.as_str()))?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if ids.is_empty() {
        return Err(ApiError::not_found("No teachers found to delete for the class"));
    }
    Cascade::default().teachers(ids).apply(&state.storage)?;
    Ok(Json(MessageBody::new("Teachers deleted successfully")))
}

pub async fn teacher_attendance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Valid(payload): Valid<AttendanceInput>,
) -> ApiResult<Json<TeacherView>> {
    let mut teacher = state
        .storage
        .teachers
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("Teacher not found"))?;
    teacher.record_attendance(payload.date, payload.status);
    state.storage.teachers.put(&teacher)?;
    Ok(Json(state.storage.teacher_view(teacher)?))
}

#[cfg(test)]
mod tests {
    use crate::rest::testing::{call, seed_school, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_register_sets_back_reference_and_hides_password() {
        let app = TestApp::new();
        let school = seed_school(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/TeacherReg",
            Some(json!({
                "name": "Ada",
                "email": "a@x.com",
                "password": "pw",
                "school": school.admin_id,
                "teachSubject": school.math_id,
                "teachSclass": school.class_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.get("password").is_none());
        let teacher_id = body["_id"].as_str().unwrap().to_string();

        let stored = app.state.storage.teachers.get(&teacher_id).unwrap().unwrap();
        assert_ne!(stored.password, "pw");

        let (_, subject) = call(&app, Method::GET, &format!("/Subject/{}", school.math_id), None).await;
        assert_eq!(subject["teacher"]["_id"], teacher_id.as_str());

        let (status, body) = call(
            &app,
            Method::POST,
            "/TeacherReg",
            Some(json!({
                "name": "Ada again",
                "email": "a@x.com",
                "password": "pw2",
                "school": school.admin_id,
                "teachSubject": school.art_id,
                "teachSclass": school.class_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already exists");
        assert_eq!(app.state.storage.teachers.find(|_| true).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let teacher_id = school.register_teacher(&app, "t@x.com", "secret").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/TeacherLogin",
            Some(json!({"email": "t@x.com", "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_id"], teacher_id.as_str());
        assert_eq!(body["teachSubject"]["subName"], "Math");
        assert_eq!(body["school"]["schoolName"], "Hill School");
        assert!(body.get("password").is_none());

        let (status, body) = call(
            &app,
            Method::POST,
            "/TeacherLogin",
            Some(json!({"email": "t@x.com", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid password");

        let (status, _) = call(
            &app,
            Method::POST,
            "/TeacherLogin",
            Some(json!({"email": "ghost@x.com", "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // No format check on login: any unknown address is simply not found.
        let (status, body) = call(
            &app,
            Method::POST,
            "/TeacherLogin",
            Some(json!({"email": "ghost", "password": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Teacher not found");
    }

    #[tokio::test]
    async fn test_reassign_subject_moves_both_references() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let teacher_id = school.register_teacher(&app, "t@x.com", "pw").await;

        let (status, body) = call(
            &app,
            Method::PUT,
            "/TeacherSubject",
            Some(json!({"teacherId": teacher_id, "teachSubject": school.art_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["teachSubject"]["_id"], school.art_id.as_str());

        let storage = &app.state.storage;
        let art = storage.subjects.get(&school.art_id).unwrap().unwrap();
        let math = storage.subjects.get(&school.math_id).unwrap().unwrap();
        assert_eq!(art.teacher.as_deref(), Some(teacher_id.as_str()));
        assert!(math.teacher.is_none());
    }

    #[tokio::test]
    async fn test_failed_reassignment_rolls_back_teacher() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let teacher_id = school.register_teacher(&app, "t@x.com", "pw").await;

        let (status, body) = call(
            &app,
            Method::PUT,
            "/TeacherSubject",
            Some(json!({"teacherId": teacher_id, "teachSubject": "missing-subject"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Subject not found");

        let storage = &app.state.storage;
        let teacher = storage.teachers.get(&teacher_id).unwrap().unwrap();
        assert_eq!(teacher.teach_subject.as_deref(), Some(school.math_id.as_str()));
        let math = storage.subjects.get(&school.math_id).unwrap().unwrap();
        assert_eq!(math.teacher.as_deref(), Some(teacher_id.as_str()));

        let (status, _) = call(
            &app,
            Method::PUT,
            "/TeacherSubject",
            Some(json!({"teacherId": "missing-teacher", "teachSubject": school.art_id})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_twice_then_not_found() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let teacher_id = school.register_teacher(&app, "t@x.com", "pw").await;
        let uri = format!("/Teacher/{teacher_id}");

        let (status, body) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("password").is_none());
        let math = app.state.storage.subjects.get(&school.math_id).unwrap().unwrap();
        assert!(math.teacher.is_none());

        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bulk_deletes_by_school_and_class() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        school.register_teacher(&app, "t1@x.com", "pw").await;

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/TeachersClass/{}", school.class_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::DELETE,
            &format!("/Teachers/{}", school.admin_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No teachers found to delete");

        let (status, _) = call(&app, Method::GET, &format!("/Teachers/{}", school.admin_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_attendance_upserts_by_date() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let teacher_id = school.register_teacher(&app, "t@x.com", "pw").await;
        let uri = format!("/TeacherAttendance/{teacher_id}");

        call(&app, Method::PUT, &uri, Some(json!({"status": "Present", "date": "2024-05-01"}))).await;
        let (status, body) = call(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"status": "Absent", "date": "2024-05-01T15:00:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["attendance"].as_array().unwrap().len(), 1);
        assert_eq!(body["attendance"][0]["status"], "Absent");

        let (_, body) =
            call(&app, Method::PUT, &uri, Some(json!({"status": "Present", "date": "2024-05-02"}))).await;
        assert_eq!(body["attendance"].as_array().unwrap().len(), 2);

        let (status, _) =
            call(&app, Method::PUT, &uri, Some(json!({"status": "Late", "date": "2024-05-02"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
