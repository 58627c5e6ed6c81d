use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::cascade::Cascade;
use super::{calendar_date, require, require_email, LoginRequest, Valid, Validate};
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult, MessageBody};
use crate::models::{new_id, AttendanceLimitReached, AttendanceStatus, Role, Student};
use crate::rest::AppState;
use crate::storage::{tx_modify, Storage, TxResult};
use crate::views::StudentView;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegister {
    pub name: String,
    pub email: String,
    pub roll_num: u32,
    pub password: String,
    pub sclass_name: String,
    #[serde(alias = "adminID")]
    pub school: String,
}

impl Validate for StudentRegister {
    fn validate(&self) -> ApiResult<()> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("password", &self.password)?;
        require("sclassName", &self.sclass_name)?;
        require("school", &self.school)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultInput {
    pub sub_name: String,
    pub marks_obtained: u32,
}

impl Validate for ExamResultInput {
    fn validate(&self) -> ApiResult<()> {
        require("subName", &self.sub_name)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceInput {
    pub sub_name: String,
    pub status: AttendanceStatus,
    #[serde(deserialize_with = "calendar_date")]
    pub date: NaiveDate,
}

impl Validate for StudentAttendanceInput {
    fn validate(&self) -> ApiResult<()> {
        require("subName", &self.sub_name)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSubjectAttendance {
    pub sub_id: String,
}

impl Validate for RemoveSubjectAttendance {
    fn validate(&self) -> ApiResult<()> {
        require("subId", &self.sub_id)
    }
}

fn load_student(storage: &Storage, id: &str) -> ApiResult<Student> {
    storage
        .students
        .get(id)?
        .ok_or_else(|| ApiError::not_found("Student not found"))
}

fn views(storage: &Storage, students: Vec<Student>) -> ApiResult<Vec<StudentView>> {
    Ok(students
        .into_iter()
        .map(|s| storage.student_view(s))
        .collect::<Result<Vec<_>, _>>()?)
}

pub async fn student_register(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<StudentRegister>,
) -> ApiResult<(StatusCode, Json<StudentView>)> {
    let storage = &state.storage;
    if storage.sclasses.get(&payload.sclass_name)?.is_none() {
        return Err(ApiError::not_found("Class not found"));
    }
    if storage
        .students
        .find_one(|s| s.email == payload.email)?
        .is_some()
    {
        return Err(ApiError::conflict("Email already exists"));
    }
    if storage
        .students
        .find_one(|s| {
            s.roll_num == payload.roll_num
                && s.school == payload.school
                && s.sclass_name == payload.sclass_name
        })?
        .is_some()
    {
        return Err(ApiError::conflict("Roll Number already exists"));
    }

    let student = Student {
        id: new_id(),
        name: payload.name,
        email: payload.email,
        roll_num: payload.roll_num,
        password: hash_password(&payload.password, state.bcrypt_cost)?,
        role: Role::Student,
        sclass_name: payload.sclass_name,
        school: payload.school,
        exam_result: vec![],
        attendance: vec![],
    };
    storage.students.put(&student)?;

    info!(student_id = %student.id, sclass = %student.sclass_name, "student registered");
    Ok((StatusCode::CREATED, Json(storage.student_view(student)?)))
}

pub async fn student_login(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<LoginRequest>,
) -> ApiResult<Json<StudentView>> {
    let student = state
        .storage
        .students
        .find_one(|s| s.email == payload.email)?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    if !verify_password(&payload.password, &student.password)? {
        return Err(ApiError::BadCredentials);
    }
    info!(student_id = %student.id, "student logged in");
    Ok(Json(state.storage.student_view(student)?))
}

pub async fn get_students(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<Vec<StudentView>>> {
    let students = state.storage.students.find(|s| s.school == school_id)?;
    if students.is_empty() {
        return Err(ApiError::not_found("No students found"));
    }
    Ok(Json(views(&state.storage, students)?))
}

pub async fn get_student_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentView>> {
    let student = state
        .storage
        .students
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("No student found"))?;
    Ok(Json(state.storage.student_view(student)?))
}

pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentView>> {
    let removed = Cascade::default().students([id]).apply(&state.storage)?;
    let student = removed
        .students
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(Json(state.storage.student_view(student)?))
}

fn delete_students_where<F>(storage: &Storage, pred: F) -> ApiResult<Json<MessageBody>>
where
    F: Fn(&Student) -> bool,
{
    let ids: Vec<String> = storage
        .students
        .find(pred)?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if ids.is_empty() {
        return Err(ApiError::not_found("No students found to delete"));
    }
    let removed = Cascade::default().students(ids).apply(storage)?;
    Ok(Json(MessageBody::new(format!(
        "{} students deleted successfully",
        removed.students.len()
    ))))
}

pub async fn delete_students(
    State(state): State<Arc<AppState>>,
    Path(school_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    delete_students_where(&state.storage, |s| s.school == school_id)
}

pub async fn delete_students_by_class(
    State(state): State<Arc<AppState>>,
    Path(class_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    delete_students_where(&state.storage, |s| s.sclass_name == class_id)
}

pub async fn update_exam_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Valid(payload): Valid<ExamResultInput>,
) -> ApiResult<Json<StudentView>> {
    let storage = &state.storage;
    let mut student = load_student(storage, &id)?;
    if storage.subjects.get(&payload.sub_name)?.is_none() {
        return Err(ApiError::not_found("Subject not found"));
    }
    student.upsert_exam_result(&payload.sub_name, payload.marks_obtained);
    storage.students.put(&student)?;
    Ok(Json(storage.student_view(student)?))
}

pub async fn student_attendance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Valid(payload): Valid<StudentAttendanceInput>,
) -> ApiResult<Json<StudentView>> {
    let storage = &state.storage;
    let mut student = load_student(storage, &id)?;
    let subject = storage
        .subjects
        .get(&payload.sub_name)?
        .ok_or_else(|| ApiError::not_found("Subject not found"))?;

    student
        .record_attendance(&subject.id, subject.sessions, payload.date, payload.status)
        .map_err(|AttendanceLimitReached| {
            ApiError::validation("Maximum attendance limit reached")
        })?;
    storage.students.put(&student)?;
    Ok(Json(storage.student_view(student)?))
}

pub async fn remove_student_subject_attendance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Valid(payload): Valid<RemoveSubjectAttendance>,
) -> ApiResult<Json<StudentView>> {
    let storage = &state.storage;
    let mut student = load_student(storage, &id)?;
    student.remove_subject_attendance(&payload.sub_id);
    storage.students.put(&student)?;
    Ok(Json(storage.student_view(student)?))
}

/// Clear one subject's attendance from every student, in one transaction.
pub async fn remove_all_students_subject_attendance(
    State(state): State<Arc<AppState>>,
    Path(subject_id): Path<String>,
) -> ApiResult<Json<MessageBody>> {
    let storage = &state.storage;
    let ids: Vec<String> = storage
        .students
        .find(|s| s.attendance.iter().any(|a| a.sub_name == subject_id))?
        .into_iter()
        .map(|s| s.id)
        .collect();

    let cleared = storage.students.tree().transaction(|students| -> TxResult<usize> {
        let mut cleared = 0usize;
        for id in &ids {
            if tx_modify::<Student, _>(students, id, |s| s.remove_subject_attendance(&subject_id))? {
                cleared += 1;
            }
        }
        Ok(cleared)
    })?;

    Ok(Json(MessageBody::new(format!(
        "Attendance cleared for {cleared} students"
    ))))
}

#[cfg(test)]
mod tests {
    use crate::rest::testing::{call, seed_school, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_duplicates() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let student_id = school.register_student(&app, "s@x.com", 7).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/StudentReg",
            Some(json!({
                "name": "Copy",
                "email": "other@x.com",
                "rollNum": 7,
                "password": "pw",
                "sclassName": school.class_id,
                "adminID": school.admin_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Roll Number already exists");

        let (status, body) = call(
            &app,
            Method::POST,
            "/StudentLogin",
            Some(json!({"email": "s@x.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_id"], student_id.as_str());
        assert_eq!(body["sclassName"]["sclassName"], "7A");
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_creates_nothing() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        school.register_student(&app, "s@x.com", 1).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/StudentReg",
            Some(json!({
                "name": "Twin",
                "email": "s@x.com",
                "rollNum": 2,
                "password": "pw",
                "sclassName": school.class_id,
                "adminID": school.admin_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email already exists");
        assert_eq!(app.state.storage.students.find(|_| true).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_login_unknown_email_and_wrong_password() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        school.register_student(&app, "s@x.com", 1).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/StudentLogin",
            Some(json!({"email": "ghost@x.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Student not found");

        let (status, body) = call(
            &app,
            Method::POST,
            "/StudentLogin",
            Some(json!({"email": "s@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid password");
    }

    #[tokio::test]
    async fn test_attendance_limit_and_exam_results() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let student_id = school.register_student(&app, "s@x.com", 1).await;
        let uri = format!("/StudentAttendance/{student_id}");

        // Art has two sessions.
        for day in ["2024-05-01", "2024-05-02"] {
            let (status, _) = call(
                &app,
                Method::PUT,
                &uri,
                Some(json!({"subName": school.art_id, "status": "Present", "date": day})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = call(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"subName": school.art_id, "status": "Present", "date": "2024-05-03"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Maximum attendance limit reached");

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/UpdateExamResult/{student_id}"),
            Some(json!({"subName": school.math_id, "marksObtained": 88})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["examResult"][0]["subName"]["subName"], "Math");
        assert_eq!(body["examResult"][0]["marksObtained"], 88);

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/RemoveStudentSubAtten/{student_id}"),
            Some(json!({"subId": school.art_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["attendance"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_subject_attendance_for_all() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let a = school.register_student(&app, "a@x.com", 1).await;
        let b = school.register_student(&app, "b@x.com", 2).await;
        for id in [&a, &b] {
            call(
                &app,
                Method::PUT,
                &format!("/StudentAttendance/{id}"),
                Some(json!({"subName": school.math_id, "status": "Absent", "date": "2024-05-01"})),
            )
            .await;
        }

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/RemoveAllStudentsSubAtten/{}", school.math_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Attendance cleared for 2 students");
        let stored = app.state.storage.students.get(&a).unwrap().unwrap();
        assert!(stored.attendance.is_empty());
    }

    #[tokio::test]
    async fn test_deletes() {
        let app = TestApp::new();
        let school = seed_school(&app).await;
        let a = school.register_student(&app, "a@x.com", 1).await;
        school.register_student(&app, "b@x.com", 2).await;

        let (status, _) = call(&app, Method::DELETE, &format!("/Student/{a}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::DELETE, &format!("/Student/{a}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/StudentsClass/{}", school.class_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/Students/{}", school.admin_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
