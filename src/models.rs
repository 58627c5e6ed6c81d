//! Stored documents. Each type lives in its own sled tree keyed by `_id`.
//!
//! These carry the password hash and are never serialized into a response;
//! see `views` for the response shapes.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// A record kept in the document store.
pub trait Document: Serialize + DeserializeOwned + Clone {
    /// Name of the sled tree holding this document type.
    const TREE: &'static str;

    fn id(&self) -> &str;
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Student,
    Teacher,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttendanceEntry {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Student attendance is kept per subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendance {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub sub_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub sub_name: String,
    pub marks_obtained: u32,
}

/// The school account; other documents point at it through `school`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub school_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub school: String,
    pub teach_subject: Option<String>,
    pub teach_sclass: Option<String>,
    #[serde(default)]
    pub attendance: Vec<AttendanceEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub roll_num: u32,
    pub password: String,
    pub role: Role,
    pub sclass_name: String,
    pub school: String,
    #[serde(default)]
    pub exam_result: Vec<ExamResult>,
    #[serde(default)]
    pub attendance: Vec<SubjectAttendance>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(rename = "_id")]
    pub id: String,
    pub sub_name: String,
    pub sub_code: String,
    pub sessions: u32,
    pub sclass_name: String,
    pub school: String,
    pub teacher: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Sclass {
    #[serde(rename = "_id")]
    pub id: String,
    pub sclass_name: String,
    pub school: String,
}

macro_rules! document {
    ($ty:ty, $tree:literal) => {
        impl Document for $ty {
            const TREE: &'static str = $tree;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

document!(Admin, "admins");
document!(Teacher, "teachers");
document!(Student, "students");
document!(Subject, "subjects");
document!(Sclass, "sclasses");

impl Teacher {
    /// One entry per calendar date: overwrite the status of an existing
    /// entry for `date`, otherwise append.
    pub fn record_attendance(&mut self, date: NaiveDate, status: AttendanceStatus) {
        match self.attendance.iter_mut().find(|a| a.date == date) {
            Some(existing) => existing.status = status,
            None => self.attendance.push(AttendanceEntry { date, status }),
        }
    }
}

/// Returned when a subject's session count is already used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceLimitReached;

impl Student {
    /// Upsert keyed by (date, subject). A new entry is refused once the
    /// student has `sessions` entries for that subject.
    pub fn record_attendance(
        &mut self,
        subject_id: &str,
        sessions: u32,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<(), AttendanceLimitReached> {
        if let Some(existing) = self
            .attendance
            .iter_mut()
            .find(|a| a.date == date && a.sub_name == subject_id)
        {
            existing.status = status;
            return Ok(());
        }

        let attended = self
            .attendance
            .iter()
            .filter(|a| a.sub_name == subject_id)
            .count();
        if attended >= sessions as usize {
            return Err(AttendanceLimitReached);
        }

        self.attendance.push(SubjectAttendance {
            date,
            status,
            sub_name: subject_id.to_string(),
        });
        Ok(())
    }

    pub fn upsert_exam_result(&mut self, subject_id: &str, marks: u32) {
        match self.exam_result.iter_mut().find(|r| r.sub_name == subject_id) {
            Some(existing) => existing.marks_obtained = marks,
            None => self.exam_result.push(ExamResult {
                sub_name: subject_id.to_string(),
                marks_obtained: marks,
            }),
        }
    }

    /// Drop attendance for a subject; true if anything was removed.
    pub fn remove_subject_attendance(&mut self, subject_id: &str) -> bool {
        let before = self.attendance.len();
        self.attendance.retain(|a| a.sub_name != subject_id);
        self.attendance.len() != before
    }

    /// Drop everything tied to a deleted subject.
    pub fn forget_subject(&mut self, subject_id: &str) -> bool {
        let before = self.exam_result.len();
        self.exam_result.retain(|r| r.sub_name != subject_id);
        let removed_attendance = self.remove_subject_attendance(subject_id);
        removed_attendance || self.exam_result.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn teacher() -> Teacher {
        Teacher {
            id: new_id(),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            password: "hash".into(),
            role: Role::Teacher,
            school: "s".into(),
            teach_subject: None,
            teach_sclass: None,
            attendance: vec![],
        }
    }

    fn student() -> Student {
        Student {
            id: new_id(),
            name: "Bo".into(),
            email: "bo@x.com".into(),
            roll_num: 1,
            password: "hash".into(),
            role: Role::Student,
            sclass_name: "c".into(),
            school: "s".into(),
            exam_result: vec![],
            attendance: vec![],
        }
    }

    #[test]
    fn test_teacher_attendance_same_date_overwrites() {
        let mut t = teacher();
        t.record_attendance(date("2024-05-01"), AttendanceStatus::Present);
        t.record_attendance(date("2024-05-01"), AttendanceStatus::Absent);
        assert_eq!(t.attendance.len(), 1);
        assert_eq!(t.attendance[0].status, AttendanceStatus::Absent);

        t.record_attendance(date("2024-05-02"), AttendanceStatus::Present);
        assert_eq!(t.attendance.len(), 2);
    }

    #[test]
    fn test_student_attendance_respects_session_limit() {
        let mut s = student();
        s.record_attendance("math", 2, date("2024-05-01"), AttendanceStatus::Present)
            .unwrap();
        s.record_attendance("math", 2, date("2024-05-02"), AttendanceStatus::Present)
            .unwrap();
        // Updating an existing date is still allowed at the limit.
        s.record_attendance("math", 2, date("2024-05-02"), AttendanceStatus::Absent)
            .unwrap();
        assert_eq!(
            s.record_attendance("math", 2, date("2024-05-03"), AttendanceStatus::Present),
            Err(AttendanceLimitReached)
        );
        // Other subjects have their own budget.
        s.record_attendance("art", 1, date("2024-05-03"), AttendanceStatus::Present)
            .unwrap();
        assert_eq!(s.attendance.len(), 3);
    }

    #[test]
    fn test_forget_subject_drops_results_and_attendance() {
        let mut s = student();
        s.upsert_exam_result("math", 50);
        s.upsert_exam_result("math", 70);
        s.upsert_exam_result("art", 90);
        assert_eq!(s.exam_result.len(), 2);
        assert_eq!(s.exam_result[0].marks_obtained, 70);
        s.record_attendance("math", 5, date("2024-05-01"), AttendanceStatus::Present)
            .unwrap();

        assert!(s.forget_subject("math"));
        assert_eq!(s.exam_result.len(), 1);
        assert!(s.attendance.is_empty());
        assert!(!s.forget_subject("math"));
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(teacher()).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json.get("teachSubject").is_some());
        assert_eq!(json["role"], "Teacher");
    }
}
