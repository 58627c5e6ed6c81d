//! Deletes that touch more than one collection.
//!
//! A `Cascade` names what to remove, expands class removals to the class's
//! students, subjects and teachers, finds every surviving document that
//! points at something being removed, and applies all of it in one sled
//! transaction. Either every write lands or none does.

use sled::Transactional;
use std::collections::HashSet;

use crate::error::ApiResult;
use crate::models::{Sclass, Student, Subject, Teacher};
use crate::storage::{tx_modify, tx_remove, Storage, TxResult};

#[derive(Debug, Default, Clone)]
pub struct Cascade {
    sclasses: HashSet<String>,
    students: HashSet<String>,
    subjects: HashSet<String>,
    teachers: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct Removed {
    pub sclasses: Vec<Sclass>,
    pub students: Vec<Student>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
}

/// Surviving documents whose references must be cleared.
#[derive(Debug, Default)]
struct Unsets {
    subjects: Vec<String>,
    teachers: Vec<String>,
    students: Vec<String>,
}

impl Cascade {
    pub fn sclasses<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.sclasses.extend(ids);
        self
    }

    pub fn students<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.students.extend(ids);
        self
    }

    pub fn subjects<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.subjects.extend(ids);
        self
    }

    pub fn teachers<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.teachers.extend(ids);
        self
    }

    /// Pull in everything owned by the classes being removed.
    fn expand(&mut self, storage: &Storage) -> ApiResult<()> {
        if self.sclasses.is_empty() {
            return Ok(());
        }
        let classes = &self.sclasses;
        let students = storage.students.find(|s| classes.contains(&s.sclass_name))?;
        let subjects = storage.subjects.find(|s| classes.contains(&s.sclass_name))?;
        let teachers = storage.teachers.find(|t| {
            t.teach_sclass
                .as_ref()
                .is_some_and(|c| classes.contains(c))
        })?;
        self.students.extend(students.into_iter().map(|s| s.id));
        self.subjects.extend(subjects.into_iter().map(|s| s.id));
        self.teachers.extend(teachers.into_iter().map(|t| t.id));
        Ok(())
    }

    fn plan_unsets(&self, storage: &Storage) -> ApiResult<Unsets> {
        let subjects = storage
            .subjects
            .find(|s| {
                !self.subjects.contains(&s.id)
                    && s.teacher.as_ref().is_some_and(|t| self.teachers.contains(t))
            })?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let teachers = storage
            .teachers
            .find(|t| {
                !self.teachers.contains(&t.id)
                    && t.teach_subject
                        .as_ref()
                        .is_some_and(|s| self.subjects.contains(s))
            })?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let students = if self.subjects.is_empty() {
            vec![]
        } else {
            storage
                .students
                .find(|s| {
                    !self.students.contains(&s.id)
                        && (s.exam_result.iter().any(|r| self.subjects.contains(&r.sub_name))
                            || s.attendance.iter().any(|a| self.subjects.contains(&a.sub_name)))
                })?
                .into_iter()
                .map(|s| s.id)
                .collect()
        };
        Ok(Unsets {
            subjects,
            teachers,
            students,
        })
    }

    pub fn apply(mut self, storage: &Storage) -> ApiResult<Removed> {
        self.expand(storage)?;
        let unsets = self.plan_unsets(storage)?;

        let removed = (
            storage.sclasses.tree(),
            storage.students.tree(),
            storage.subjects.tree(),
            storage.teachers.tree(),
        )
            .transaction(|(sclasses, students, subjects, teachers)| -> TxResult<Removed> {
                let mut removed = Removed::default();
                for id in &self.sclasses {
                    if let Some(doc) = tx_remove::<Sclass>(sclasses, id)? {
                        removed.sclasses.push(doc);
                    }
                }
                for id in &self.students {
                    if let Some(doc) = tx_remove::<Student>(students, id)? {
                        removed.students.push(doc);
                    }
                }
                for id in &self.subjects {
                    if let Some(doc) = tx_remove::<Subject>(subjects, id)? {
                        removed.subjects.push(doc);
                    }
                }
                for id in &self.teachers {
                    if let Some(doc) = tx_remove::<Teacher>(teachers, id)? {
                        removed.teachers.push(doc);
                    }
                }

                for id in &unsets.subjects {
                    tx_modify::<Subject, _>(subjects, id, |s| {
                        if s.teacher.as_ref().is_some_and(|t| self.teachers.contains(t)) {
                            s.teacher = None;
                            return true;
                        }
                        false
                    })?;
                }
                for id in &unsets.teachers {
                    tx_modify::<Teacher, _>(teachers, id, |t| {
                        if t.teach_subject.as_ref().is_some_and(|s| self.subjects.contains(s)) {
                            t.teach_subject = None;
                            return true;
                        }
                        false
                    })?;
                }
                for id in &unsets.students {
                    tx_modify::<Student, _>(students, id, |s| {
                        let mut changed = false;
                        for subject in &self.subjects {
                            changed |= s.forget_subject(subject);
                        }
                        changed
                    })?;
                }
                Ok(removed)
            })?;

        tracing::info!(
            sclasses = removed.sclasses.len(),
            students = removed.students.len(),
            subjects = removed.subjects.len(),
            teachers = removed.teachers.len(),
            unset_subjects = unsets.subjects.len(),
            unset_teachers = unsets.teachers.len(),
            unset_students = unsets.students.len(),
            "cascade applied"
        );
        Ok(removed)
    }
}
