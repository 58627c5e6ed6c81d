//! One async function per user intent. Each marks its slot as loading,
//! makes exactly one API call and ends in exactly one of: loaded, soft
//! failure (the call worked but returned nothing useful) or error.

use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::api::{Api, ErrorInfo};
use super::state::{ClientState, Remote, Session, Store};
use crate::handlers::student::StudentRegister;
use crate::handlers::subject::NewSubject;
use crate::handlers::teacher::TeacherRegister;
use crate::models::{AttendanceStatus, Role};
use crate::views::{AdminView, SclassView, StudentView, SubjectView, TeacherView};

type Slot<T> = fn(&mut ClientState) -> &mut Remote<T>;

/// Null, `false`, empty strings and empty arrays count as "nothing found".
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Number(_) | Value::Object(_) => false,
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ErrorInfo> {
    serde_json::from_value(value).map_err(|e| ErrorInfo::new(e.to_string(), "ERR_DECODE"))
}

/// Fetch into `slot`; an empty body is a soft failure carrying `empty`.
async fn fetch<A, T>(
    api: &A,
    store: &Store,
    slot: Slot<T>,
    path: &str,
    empty: &str,
) where
    A: Api + ?Sized,
    T: DeserializeOwned,
{
    store.dispatch(|s| slot(s).start());
    let outcome = api.send(Method::GET, path, None).await;
    finish(store, slot, outcome, empty);
}

fn finish<T: DeserializeOwned>(
    store: &Store,
    slot: Slot<T>,
    outcome: Result<Value, ErrorInfo>,
    empty: &str,
) {
    match outcome {
        Ok(body) if is_empty_payload(&body) => {
            debug!(reason = empty, "soft failure");
            store.dispatch(|s| slot(s).soft_fail(empty));
        }
        Ok(body) => match decode::<T>(body) {
            Ok(value) => store.dispatch(|s| slot(s).succeed(value)),
            Err(e) => store.dispatch(|s| slot(s).fail(e)),
        },
        Err(e) => store.dispatch(|s| slot(s).fail(e)),
    }
}

/// Write call whose only interest is whether it succeeded.
async fn mutate<A>(api: &A, store: &Store, slot: Slot<()>, method: Method, path: &str, body: Option<Value>)
where
    A: Api + ?Sized,
{
    store.dispatch(|s| slot(s).start());
    match api.send(method, path, body).await {
        Ok(_) => store.dispatch(|s| slot(s).succeed(())),
        Err(e) => store.dispatch(|s| slot(s).fail(e)),
    }
}

/// Write call that returns the updated document into `slot`.
async fn update<A, T>(api: &A, store: &Store, slot: Slot<T>, path: &str, body: Value, empty: &str)
where
    A: Api + ?Sized,
    T: DeserializeOwned,
{
    store.dispatch(|s| slot(s).start());
    let outcome = api.send(Method::PUT, path, Some(body)).await;
    finish(store, slot, outcome, empty);
}

/// POST that creates a document; the echoed document lands in `user.added`.
async fn create<A>(api: &A, store: &Store, path: &str, body: Value, empty: &str)
where
    A: Api + ?Sized,
{
    let slot: Slot<Value> = |s| &mut s.user.added;
    store.dispatch(|s| slot(s).start());
    let outcome = api.send(Method::POST, path, Some(body)).await;
    finish(store, slot, outcome, empty);
}

// -- user --------------------------------------------------------------

fn sign_in_from(store: &Store, body: Value) {
    if body.get("role").is_none() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Login failed")
            .to_string();
        store.dispatch(|s| s.user.auth.soft_fail(message));
        return;
    }
    match Session::from_user(body) {
        Ok(session) => store.sign_in(session),
        Err(e) => store.dispatch(|s| s.user.auth.fail(ErrorInfo::new(e.to_string(), "ERR_DECODE"))),
    }
}

pub async fn login<A: Api + ?Sized>(api: &A, store: &Store, role: Role, email: &str, password: &str) {
    store.dispatch(|s| s.user.auth.start());
    let path = match role {
        Role::Admin => "/AdminLogin",
        Role::Student => "/StudentLogin",
        Role::Teacher => "/TeacherLogin",
    };
    let body = json!({"email": email, "password": password});
    match api.send(Method::POST, path, Some(body)).await {
        Ok(body) => sign_in_from(store, body),
        Err(e) => store.dispatch(|s| s.user.auth.fail(e)),
    }
}

/// Registers a school and signs its admin in.
pub async fn register_admin<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    name: &str,
    email: &str,
    password: &str,
    school_name: &str,
) {
    store.dispatch(|s| s.user.auth.start());
    let body = json!({
        "name": name,
        "email": email,
        "password": password,
        "schoolName": school_name,
    });
    match api.send(Method::POST, "/AdminReg", Some(body)).await {
        Ok(body) => sign_in_from(store, body),
        Err(e) => store.dispatch(|s| s.user.auth.fail(e)),
    }
}

pub fn logout(store: &Store) {
    store.sign_out();
}

pub async fn get_admin_details<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let slot: Slot<AdminView> = |s| &mut s.user.details;
    fetch(api, store, slot, &format!("/Admin/{id}"), "No admin found").await;
}

// -- teachers ----------------------------------------------------------

pub async fn get_all_teachers<A: Api + ?Sized>(api: &A, store: &Store, school_id: &str) {
    let slot: Slot<Vec<TeacherView>> = |s| &mut s.teacher.list;
    fetch(api, store, slot, &format!("/Teachers/{school_id}"), "No teachers found").await;
}

pub async fn get_teacher_details<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let slot: Slot<TeacherView> = |s| &mut s.teacher.details;
    fetch(api, store, slot, &format!("/Teacher/{id}"), "No teacher found").await;
}

pub async fn update_teach_subject<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    teacher_id: &str,
    subject_id: &str,
) {
    let body = json!({"teacherId": teacher_id, "teachSubject": subject_id});
    mutate(api, store, |s| &mut s.teacher.mutation, Method::PUT, "/TeacherSubject", Some(body)).await;
}

pub async fn record_teacher_attendance<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    teacher_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
) {
    let slot: Slot<TeacherView> = |s| &mut s.teacher.details;
    let body = json!({"date": date, "status": status});
    let path = format!("/TeacherAttendance/{teacher_id}");
    update(api, store, slot, &path, body, "No teacher found").await;
}

/// Admin registers a teacher for one subject of one class.
pub async fn register_teacher<A: Api + ?Sized>(api: &A, store: &Store, teacher: &TeacherRegister) {
    match serde_json::to_value(teacher) {
        Ok(body) => create(api, store, "/TeacherReg", body, "Teacher was not created").await,
        Err(e) => store.dispatch(|s| s.user.added.fail(ErrorInfo::new(e.to_string(), "ERR_ENCODE"))),
    }
}

pub async fn delete_teacher<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let path = format!("/Teacher/{id}");
    mutate(api, store, |s| &mut s.teacher.mutation, Method::DELETE, &path, None).await;
}

// -- students ----------------------------------------------------------

pub async fn get_all_students<A: Api + ?Sized>(api: &A, store: &Store, school_id: &str) {
    let slot: Slot<Vec<StudentView>> = |s| &mut s.student.list;
    fetch(api, store, slot, &format!("/Students/{school_id}"), "No students found").await;
}

pub async fn get_student_details<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let slot: Slot<StudentView> = |s| &mut s.student.details;
    fetch(api, store, slot, &format!("/Student/{id}"), "No student found").await;
}

pub async fn record_student_attendance<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    student_id: &str,
    subject_id: &str,
    date: NaiveDate,
    status: AttendanceStatus,
) {
    let slot: Slot<StudentView> = |s| &mut s.student.details;
    let body = json!({"subName": subject_id, "status": status, "date": date});
    let path = format!("/StudentAttendance/{student_id}");
    update(api, store, slot, &path, body, "No student found").await;
}

pub async fn update_exam_result<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    student_id: &str,
    subject_id: &str,
    marks_obtained: u32,
) {
    let slot: Slot<StudentView> = |s| &mut s.student.details;
    let body = json!({"subName": subject_id, "marksObtained": marks_obtained});
    let path = format!("/UpdateExamResult/{student_id}");
    update(api, store, slot, &path, body, "No student found").await;
}

pub async fn register_student<A: Api + ?Sized>(api: &A, store: &Store, student: &StudentRegister) {
    match serde_json::to_value(student) {
        Ok(body) => create(api, store, "/StudentReg", body, "Student was not created").await,
        Err(e) => store.dispatch(|s| s.user.added.fail(ErrorInfo::new(e.to_string(), "ERR_ENCODE"))),
    }
}

pub async fn delete_student<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let path = format!("/Student/{id}");
    mutate(api, store, |s| &mut s.student.mutation, Method::DELETE, &path, None).await;
}

// -- classes -----------------------------------------------------------

pub async fn get_all_sclasses<A: Api + ?Sized>(api: &A, store: &Store, school_id: &str) {
    let slot: Slot<Vec<SclassView>> = |s| &mut s.sclass.list;
    fetch(api, store, slot, &format!("/SclassList/{school_id}"), "No classes found").await;
}

pub async fn get_sclass_details<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let slot: Slot<SclassView> = |s| &mut s.sclass.details;
    fetch(api, store, slot, &format!("/Sclass/{id}"), "No class found").await;
}

pub async fn get_class_students<A: Api + ?Sized>(api: &A, store: &Store, class_id: &str) {
    let slot: Slot<Vec<StudentView>> = |s| &mut s.sclass.students;
    fetch(api, store, slot, &format!("/Sclass/Students/{class_id}"), "No students found").await;
}

pub async fn add_sclass<A: Api + ?Sized>(api: &A, store: &Store, admin_id: &str, name: &str) {
    let body = json!({"sclassName": name, "adminID": admin_id});
    create(api, store, "/SclassCreate", body, "Class was not created").await;
}

/// Deleting a class also removes its students, subjects and teachers.
pub async fn delete_sclass<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let path = format!("/Sclass/{id}");
    mutate(api, store, |s| &mut s.sclass.mutation, Method::DELETE, &path, None).await;
}

// -- subjects ----------------------------------------------------------

pub async fn get_school_subjects<A: Api + ?Sized>(api: &A, store: &Store, school_id: &str) {
    let slot: Slot<Vec<SubjectView>> = |s| &mut s.subject.list;
    fetch(api, store, slot, &format!("/AllSubjects/{school_id}"), "No subjects found").await;
}

pub async fn get_class_subjects<A: Api + ?Sized>(api: &A, store: &Store, class_id: &str) {
    let slot: Slot<Vec<SubjectView>> = |s| &mut s.subject.list;
    fetch(api, store, slot, &format!("/ClassSubjects/{class_id}"), "No subjects found").await;
}

pub async fn get_free_subjects<A: Api + ?Sized>(api: &A, store: &Store, class_id: &str) {
    let slot: Slot<Vec<SubjectView>> = |s| &mut s.subject.free;
    fetch(api, store, slot, &format!("/FreeSubjectList/{class_id}"), "No free subjects found").await;
}

pub async fn get_subject_details<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let slot: Slot<SubjectView> = |s| &mut s.subject.details;
    fetch(api, store, slot, &format!("/Subject/{id}"), "No subject found").await;
}

/// Creates a batch of subjects for one class; the server stores all or none.
pub async fn add_subjects<A: Api + ?Sized>(
    api: &A,
    store: &Store,
    admin_id: &str,
    class_id: &str,
    subjects: &[NewSubject],
) {
    let body = json!({"subjects": subjects, "sclassName": class_id, "adminID": admin_id});
    create(api, store, "/SubjectCreate", body, "No subjects were created").await;
}

pub async fn delete_subject<A: Api + ?Sized>(api: &A, store: &Store, id: &str) {
    let path = format!("/Subject/{id}");
    mutate(api, store, |s| &mut s.subject.mutation, Method::DELETE, &path, None).await;
}
