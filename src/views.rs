//! Response shapes. None of these types has a password field, so a hash can
//! never reach a response body. References are joined to their display
//! subset; a dangling reference renders as `null`.
//!
//! The client deserializes the same types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{Admin, AttendanceEntry, AttendanceStatus, Role, Sclass, Student, Subject, Teacher};
use crate::storage::Storage;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub school_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SclassRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub sclass_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub sub_name: String,
    pub sessions: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeacherRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub school_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeacherView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub school: Option<SchoolRef>,
    pub teach_subject: Option<SubjectRef>,
    pub teach_sclass: Option<SclassRef>,
    pub attendance: Vec<AttendanceEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultView {
    pub sub_name: Option<SubjectRef>,
    pub marks_obtained: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceView {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub sub_name: Option<SubjectRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub roll_num: u32,
    pub role: Role,
    pub school: Option<SchoolRef>,
    pub sclass_name: Option<SclassRef>,
    pub exam_result: Vec<ExamResultView>,
    pub attendance: Vec<StudentAttendanceView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectView {
    #[serde(rename = "_id")]
    pub id: String,
    pub sub_name: String,
    pub sub_code: String,
    pub sessions: u32,
    pub school: String,
    pub sclass_name: Option<SclassRef>,
    pub teacher: Option<TeacherRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SclassView {
    #[serde(rename = "_id")]
    pub id: String,
    pub sclass_name: String,
    pub school: Option<SchoolRef>,
}

impl From<Admin> for AdminView {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: admin.role,
            school_name: admin.school_name,
        }
    }
}

impl Storage {
    fn school_ref(&self, id: &str) -> Result<Option<SchoolRef>, StoreError> {
        Ok(self.admins.get(id)?.map(|a| SchoolRef {
            id: a.id,
            school_name: a.school_name,
        }))
    }

    fn sclass_ref(&self, id: &str) -> Result<Option<SclassRef>, StoreError> {
        Ok(self.sclasses.get(id)?.map(|c| SclassRef {
            id: c.id,
            sclass_name: c.sclass_name,
        }))
    }

    fn subject_ref(&self, id: &str) -> Result<Option<SubjectRef>, StoreError> {
        Ok(self.subjects.get(id)?.map(|s| SubjectRef {
            id: s.id,
            sub_name: s.sub_name,
            sessions: s.sessions,
        }))
    }

    fn teacher_ref(&self, id: &str) -> Result<Option<TeacherRef>, StoreError> {
        Ok(self.teachers.get(id)?.map(|t| TeacherRef { id: t.id, name: t.name }))
    }

    pub fn teacher_view(&self, teacher: Teacher) -> Result<TeacherView, StoreError> {
        let teach_subject = match &teacher.teach_subject {
            Some(id) => self.subject_ref(id)?,
            None => None,
        };
        let teach_sclass = match &teacher.teach_sclass {
            Some(id) => self.sclass_ref(id)?,
            None => None,
        };
        Ok(TeacherView {
            school: self.school_ref(&teacher.school)?,
            teach_subject,
            teach_sclass,
            id: teacher.id,
            name: teacher.name,
            email: teacher.email,
            role: teacher.role,
            attendance: teacher.attendance,
        })
    }

    pub fn student_view(&self, student: Student) -> Result<StudentView, StoreError> {
        let mut exam_result = Vec::with_capacity(student.exam_result.len());
        for r in student.exam_result {
            exam_result.push(ExamResultView {
                sub_name: self.subject_ref(&r.sub_name)?,
                marks_obtained: r.marks_obtained,
            });
        }
        let mut attendance = Vec::with_capacity(student.attendance.len());
        for a in student.attendance {
            attendance.push(StudentAttendanceView {
                date: a.date,
                status: a.status,
                sub_name: self.subject_ref(&a.sub_name)?,
            });
        }
        Ok(StudentView {
            school: self.school_ref(&student.school)?,
            sclass_name: self.sclass_ref(&student.sclass_name)?,
            id: student.id,
            name: student.name,
            email: student.email,
            roll_num: student.roll_num,
            role: student.role,
            exam_result,
            attendance,
        })
    }

    pub fn subject_view(&self, subject: Subject) -> Result<SubjectView, StoreError> {
        let teacher = match &subject.teacher {
            Some(id) => self.teacher_ref(id)?,
            None => None,
        };
        Ok(SubjectView {
            sclass_name: self.sclass_ref(&subject.sclass_name)?,
            teacher,
            id: subject.id,
            sub_name: subject.sub_name,
            sub_code: subject.sub_code,
            sessions: subject.sessions,
            school: subject.school,
        })
    }

    pub fn sclass_view(&self, sclass: Sclass) -> Result<SclassView, StoreError> {
        Ok(SclassView {
            school: self.school_ref(&sclass.school)?,
            id: sclass.id,
            sclass_name: sclass.sclass_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::new_id;

    #[test]
    fn test_teacher_view_joins_and_hides_password() {
        let storage = Storage::temporary().unwrap();
        let admin = Admin {
            id: new_id(),
            name: "Head".into(),
            email: "head@x.com".into(),
            password: "secret-hash".into(),
            role: Role::Admin,
            school_name: "Hill School".into(),
        };
        storage.admins.put(&admin).unwrap();
        let teacher = Teacher {
            id: new_id(),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            password: "secret-hash".into(),
            role: Role::Teacher,
            school: admin.id.clone(),
            teach_subject: Some("gone".into()),
            teach_sclass: None,
            attendance: vec![],
        };

        let view = storage.teacher_view(teacher).unwrap();
        assert_eq!(view.school.as_ref().unwrap().school_name, "Hill School");
        assert!(view.teach_subject.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password").is_none());
        assert!(json["teachSubject"].is_null());
        assert_eq!(json["school"]["schoolName"], "Hill School");

        let admin_json = serde_json::to_value(AdminView::from(admin)).unwrap();
        assert!(admin_json.get("password").is_none());
    }
}
