//! Role-based screen routing and plain-text dashboards.
//!
//! A signed-in session always lands on its own dashboard. Anonymous users
//! may visit the public routes only; anything else falls back to `/`.

use std::fmt::{self, Write};

use super::state::{ClientState, Remote, Session};
use crate::models::{AttendanceStatus, Role};
use crate::views::{StudentView, TeacherView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicRoute {
    Home,
    Choose,
    ChooseAsGuest,
    Login(Role),
    AdminRegister,
}

impl PublicRoute {
    pub fn from_path(path: &str) -> Option<Self> {
        Some(match path {
            "/" => PublicRoute::Home,
            "/choose" => PublicRoute::Choose,
            "/chooseasguest" => PublicRoute::ChooseAsGuest,
            "/Adminlogin" => PublicRoute::Login(Role::Admin),
            "/Studentlogin" => PublicRoute::Login(Role::Student),
            "/Teacherlogin" => PublicRoute::Login(Role::Teacher),
            "/Adminregister" => PublicRoute::AdminRegister,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Public(PublicRoute),
    Dashboard(Role),
}

impl Screen {
    pub fn resolve(session: &Session, path: &str) -> Screen {
        match session.role() {
            Some(role) => Screen::Dashboard(role),
            None => Screen::Public(PublicRoute::from_path(path).unwrap_or(PublicRoute::Home)),
        }
    }
}

/// Present sessions over all recorded sessions, as a percentage.
pub fn attendance_percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    present as f64 * 100.0 / total as f64
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin",
        Role::Student => "Student",
        Role::Teacher => "Teacher",
    }
}

/// Loaded lists render through `line`; other states render their status.
fn remote_lines<T>(
    out: &mut String,
    title: &str,
    remote: &Remote<Vec<T>>,
    line: impl Fn(&T) -> String,
) -> fmt::Result {
    writeln!(out, "{title}:")?;
    match remote {
        Remote::Idle => writeln!(out, "  (not loaded)"),
        Remote::Loading => writeln!(out, "  loading..."),
        Remote::SoftFailed(message) => writeln!(out, "  {message}"),
        Remote::Errored(e) => writeln!(out, "  error: {} ({})", e.message, e.code),
        Remote::Loaded(items) => items.iter().try_for_each(|item| writeln!(out, "  - {}", line(item))),
    }
}

pub fn render(screen: Screen, state: &ClientState) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, screen, state);
    out
}

fn render_into(out: &mut String, screen: Screen, state: &ClientState) -> fmt::Result {
    match screen {
        Screen::Public(route) => render_public(out, route, &state.user.auth)?,
        Screen::Dashboard(_) => match &state.user.session {
            Session::Admin(admin) => {
                let admin = state.user.details.loaded().unwrap_or(admin);
                writeln!(out, "Admin dashboard: {} ({})", admin.name, admin.school_name)?;
                render_admin(out, state)?;
            }
            Session::Teacher(teacher) => render_teacher(out, teacher, state)?,
            Session::Student(student) => {
                render_student(out, state.student.details.loaded().unwrap_or(student))?
            }
            Session::Anonymous => render_public(out, PublicRoute::Home, &state.user.auth)?,
        },
    }
    let theme = if state.user.dark_mode { "dark" } else { "light" };
    writeln!(out, "[theme: {theme}]")
}

fn render_public(out: &mut String, route: PublicRoute, auth: &Remote<()>) -> fmt::Result {
    match route {
        PublicRoute::Home => writeln!(out, "Welcome to school_desk. Visit /choose to sign in.")?,
        PublicRoute::Choose | PublicRoute::ChooseAsGuest => {
            writeln!(out, "Sign in as: /Adminlogin  /Studentlogin  /Teacherlogin")?;
            writeln!(out, "New school? /Adminregister")?;
        }
        PublicRoute::Login(role) => writeln!(out, "{} login: email and password required.", role_name(role))?,
        PublicRoute::AdminRegister => {
            writeln!(out, "Register a school: name, email, password and school name.")?
        }
    }
    match auth {
        Remote::SoftFailed(message) => writeln!(out, "{message}"),
        Remote::Errored(e) => writeln!(out, "error: {} ({})", e.message, e.code),
        _ => Ok(()),
    }
}

fn render_admin(out: &mut String, state: &ClientState) -> fmt::Result {
    remote_lines(out, "Classes", &state.sclass.list, |c| c.sclass_name.clone())?;
    remote_lines(out, "Subjects", &state.subject.list, |s| {
        let class = s.sclass_name.as_ref().map_or("-", |c| c.sclass_name.as_str());
        let teacher = s.teacher.as_ref().map_or("unassigned", |t| t.name.as_str());
        format!("{} [{}] class {class}, {teacher}", s.sub_name, s.sub_code)
    })?;
    remote_lines(out, "Teachers", &state.teacher.list, |t| {
        let subject = t.teach_subject.as_ref().map_or("-", |s| s.sub_name.as_str());
        format!("{} <{}> teaches {subject}", t.name, t.email)
    })?;
    remote_lines(out, "Students", &state.student.list, |s| {
        let class = s.sclass_name.as_ref().map_or("-", |c| c.sclass_name.as_str());
        format!("#{} {} ({class})", s.roll_num, s.name)
    })
}

fn render_teacher(out: &mut String, session: &TeacherView, state: &ClientState) -> fmt::Result {
    let teacher = state.teacher.details.loaded().unwrap_or(session);
    let subject = teacher.teach_subject.as_ref().map_or("-", |s| s.sub_name.as_str());
    let class = teacher.teach_sclass.as_ref().map_or("-", |c| c.sclass_name.as_str());
    writeln!(out, "Teacher dashboard: {} teaches {subject} in {class}", teacher.name)?;
    let present = teacher
        .attendance
        .iter()
        .filter(|a| a.status == AttendanceStatus::Present)
        .count();
    writeln!(
        out,
        "Own attendance: {present}/{} days present",
        teacher.attendance.len()
    )?;
    remote_lines(out, "Class students", &state.sclass.students, |s| {
        format!("#{} {}", s.roll_num, s.name)
    })
}

fn render_student(out: &mut String, student: &StudentView) -> fmt::Result {
    let class = student.sclass_name.as_ref().map_or("-", |c| c.sclass_name.as_str());
    writeln!(out, "Student dashboard: {} (roll {}, {class})", student.name, student.roll_num)?;

    let present = student
        .attendance
        .iter()
        .filter(|a| a.status == AttendanceStatus::Present)
        .count();
    writeln!(
        out,
        "Overall attendance: {:.1}%",
        attendance_percentage(present, student.attendance.len())
    )?;

    writeln!(out, "Exam results:")?;
    if student.exam_result.is_empty() {
        writeln!(out, "  none yet")?;
    }
    for result in &student.exam_result {
        let subject = result.sub_name.as_ref().map_or("(removed subject)", |s| s.sub_name.as_str());
        writeln!(out, "  - {subject}: {}", result.marks_obtained)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::ErrorInfo;
    use serde_json::json;

    fn student_session() -> Session {
        Session::from_user(json!({
            "_id": "s1",
            "name": "Sam",
            "email": "sam@x.com",
            "rollNum": 4,
            "role": "Student",
            "school": {"_id": "a1", "schoolName": "Hill School"},
            "sclassName": {"_id": "c1", "sclassName": "7A"},
            "examResult": [
                {"subName": {"_id": "m1", "subName": "Math", "sessions": 10}, "marksObtained": 88}
            ],
            "attendance": [
                {"date": "2024-03-01", "status": "Present", "subName": null},
                {"date": "2024-03-02", "status": "Present", "subName": null},
                {"date": "2024-03-03", "status": "Absent", "subName": null},
                {"date": "2024-03-04", "status": "Present", "subName": null}
            ],
        }))
        .unwrap()
    }

    #[test]
    fn test_anonymous_routes_and_redirect() {
        let anon = Session::Anonymous;
        assert_eq!(
            Screen::resolve(&anon, "/Teacherlogin"),
            Screen::Public(PublicRoute::Login(Role::Teacher))
        );
        assert_eq!(
            Screen::resolve(&anon, "/Admin/dashboard"),
            Screen::Public(PublicRoute::Home)
        );
        assert_eq!(Screen::resolve(&anon, "/choose"), Screen::Public(PublicRoute::Choose));
    }

    #[test]
    fn test_signed_in_always_sees_own_dashboard() {
        let session = student_session();
        for path in ["/", "/Adminlogin", "/Teacher/dashboard", "/nowhere"] {
            assert_eq!(Screen::resolve(&session, path), Screen::Dashboard(Role::Student));
        }
    }

    #[test]
    fn test_student_dashboard_text() {
        let mut state = ClientState::default();
        state.user.session = student_session();
        let text = render(Screen::Dashboard(Role::Student), &state);
        assert!(text.contains("Sam (roll 4, 7A)"));
        assert!(text.contains("Overall attendance: 75.0%"));
        assert!(text.contains("Math: 88"));
        assert!(text.contains("[theme: dark]"));
    }

    #[test]
    fn test_admin_dashboard_shows_slice_states() {
        let mut state = ClientState::default();
        state.user.session = Session::from_user(json!({
            "_id": "a1",
            "name": "Head",
            "email": "head@x.com",
            "role": "Admin",
            "schoolName": "Hill School",
        }))
        .unwrap();
        state.teacher.list.soft_fail("No teachers found");
        state.student.list.fail(ErrorInfo::new("Server error", "ERR_BAD_RESPONSE"));
        state.sclass.list.start();

        let text = render(Screen::Dashboard(Role::Admin), &state);
        assert!(text.contains("Admin dashboard: Head (Hill School)"));
        assert!(text.contains("No teachers found"));
        assert!(text.contains("error: Server error (ERR_BAD_RESPONSE)"));
        assert!(text.contains("loading..."));
    }

    #[test]
    fn test_attendance_percentage_handles_no_sessions() {
        assert_eq!(attendance_percentage(0, 0), 0.0);
        assert_eq!(attendance_percentage(1, 4), 25.0);
    }

    #[test]
    fn test_public_screen_shows_login_failure_and_theme() {
        let mut state = ClientState::default();
        state.user.dark_mode = false;
        state.user.auth.soft_fail("Invalid password");
        let text = render(Screen::Public(PublicRoute::Choose), &state);
        assert_eq!(
            text,
            "Sign in as: /Adminlogin  /Studentlogin  /Teacherlogin\n\
             New school? /Adminregister\n\
             Invalid password\n\
             [theme: light]\n"
        );
    }
}
