//! REST API layer using Axum.
//!
//! One route per resource operation; handlers live in `handlers::*` and share
//! `AppState` (the document store plus the bcrypt work factor). Every request
//! is logged with its status and latency.

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::MessageBody;
use crate::handlers::{admin, sclass, student, subject, teacher};
use crate::storage::Storage;

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
pub struct AppState {
    pub storage: Storage,
    pub bcrypt_cost: u32,
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(req).await;
    tracing::info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Create the Axum router with every resource endpoint.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Admin (school)
        .route("/AdminReg", post(admin::admin_register))
        .route("/AdminLogin", post(admin::admin_login))
        .route("/Admin/:id", get(admin::get_admin_detail))
        // Class
        .route("/SclassCreate", post(sclass::sclass_create))
        .route("/SclassList/:id", get(sclass::sclass_list))
        .route(
            "/Sclass/:id",
            get(sclass::get_sclass_detail).delete(sclass::delete_sclass),
        )
        .route("/Sclass/Students/:id", get(sclass::get_sclass_students))
        .route("/Sclasses/:id", delete(sclass::delete_sclasses))
        // Subject
        .route("/SubjectCreate", post(subject::subject_create))
        .route("/AllSubjects/:id", get(subject::all_subjects))
        .route("/ClassSubjects/:id", get(subject::class_subjects))
        .route("/FreeSubjectList/:id", get(subject::free_subject_list))
        .route(
            "/Subject/:id",
            get(subject::get_subject_detail).delete(subject::delete_subject),
        )
        .route("/Subjects/:id", delete(subject::delete_subjects))
        .route("/SubjectsClass/:id", delete(subject::delete_subjects_by_class))
        // Teacher
        .route("/TeacherReg", post(teacher::teacher_register))
        .route("/TeacherLogin", post(teacher::teacher_login))
        .route(
            "/Teachers/:id",
            get(teacher::get_teachers).delete(teacher::delete_teachers),
        )
        .route(
            "/Teacher/:id",
            get(teacher::get_teacher_detail).delete(teacher::delete_teacher),
        )
        .route("/TeachersClass/:id", delete(teacher::delete_teachers_by_class))
        .route("/TeacherSubject", put(teacher::update_teacher_subject))
        .route("/TeacherAttendance/:id", put(teacher::teacher_attendance))
        // Student
        .route("/StudentReg", post(student::student_register))
        .route("/StudentLogin", post(student::student_login))
        .route(
            "/Students/:id",
            get(student::get_students).delete(student::delete_students),
        )
        .route(
            "/Student/:id",
            get(student::get_student_detail).delete(student::delete_student),
        )
        .route("/StudentsClass/:id", delete(student::delete_students_by_class))
        .route("/UpdateExamResult/:id", put(student::update_exam_result))
        .route("/StudentAttendance/:id", put(student::student_attendance))
        .route(
            "/RemoveStudentSubAtten/:id",
            put(student::remove_student_subject_attendance),
        )
        .route(
            "/RemoveAllStudentsSubAtten/:id",
            put(student::remove_all_students_subject_attendance),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Health check handler
async fn health_handler() -> Json<MessageBody> {
    Json(MessageBody::new("school_desk REST API healthy"))
}
