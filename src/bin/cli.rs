use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use school_desk::client::actions;
use school_desk::client::persist::PersistFile;
use school_desk::client::view::{render, Screen};
use school_desk::client::{HttpApi, Remote, Session, Store};
use school_desk::config::Config;
use school_desk::handlers::student::StudentRegister;
use school_desk::handlers::subject::NewSubject;
use school_desk::handlers::teacher::TeacherRegister;
use school_desk::logging;
use school_desk::models::{AttendanceStatus, Role};

#[derive(Parser)]
#[command(name = "school-cli")]
#[command(about = "CLI for school_desk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL; defaults to SCHOOL_DESK_API_URL.
    #[arg(short, long)]
    url: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Student,
    Teacher,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Student => Role::Student,
            RoleArg::Teacher => Role::Teacher,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Present,
    Absent,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Present => AttendanceStatus::Present,
            StatusArg::Absent => AttendanceStatus::Absent,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long, value_enum)]
        role: RoleArg,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    RegisterAdmin {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        school_name: String,
    },
    Logout,
    /// Render the screen for a path as the current session sees it.
    Show {
        #[arg(default_value = "/")]
        path: String,
    },
    ToggleDarkMode,
    Teachers {
        #[arg(short, long)]
        school: Option<String>,
    },
    Teacher {
        id: String,
    },
    AssignSubject {
        #[arg(short, long)]
        teacher: String,
        #[arg(short, long)]
        subject: String,
    },
    TeacherAttendance {
        id: String,
        #[arg(short, long, value_enum)]
        status: StatusArg,
        #[arg(short, long)]
        date: NaiveDate,
    },
    DeleteTeacher {
        id: String,
    },
    RegisterTeacher {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short = 'S', long)]
        subject: String,
        #[arg(short, long)]
        class: String,
        #[arg(short, long)]
        school: Option<String>,
    },
    RegisterStudent {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        roll: u32,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        class: String,
        #[arg(short, long)]
        school: Option<String>,
    },
    Students {
        #[arg(short, long)]
        school: Option<String>,
    },
    Student {
        id: String,
    },
    DeleteStudent {
        id: String,
    },
    StudentAttendance {
        id: String,
        #[arg(short = 'S', long)]
        subject: String,
        #[arg(short, long, value_enum)]
        status: StatusArg,
        #[arg(short, long)]
        date: NaiveDate,
    },
    ExamResult {
        id: String,
        #[arg(short = 'S', long)]
        subject: String,
        #[arg(short, long)]
        marks: u32,
    },
    Classes {
        #[arg(short, long)]
        school: Option<String>,
    },
    Class {
        id: String,
    },
    ClassStudents {
        class: String,
    },
    Subjects {
        #[arg(short, long)]
        school: Option<String>,
    },
    ClassSubjects {
        class: String,
    },
    FreeSubjects {
        class: String,
    },
    Subject {
        id: String,
    },
    AddClass {
        name: String,
        #[arg(short, long)]
        school: Option<String>,
    },
    DeleteClass {
        id: String,
    },
    /// Each subject is written as NAME:CODE:SESSIONS.
    AddSubjects {
        #[arg(short, long)]
        class: String,
        #[arg(required = true, value_parser = parse_subject)]
        subjects: Vec<NewSubject>,
        #[arg(short, long)]
        school: Option<String>,
    },
    DeleteSubject {
        id: String,
    },
}

fn parse_subject(raw: &str) -> Result<NewSubject, String> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(code), Some(sessions)) if !name.is_empty() && !code.is_empty() => {
            let sessions = sessions
                .parse()
                .map_err(|e| format!("bad session count {sessions:?}: {e}"))?;
            Ok(NewSubject {
                sub_name: name.to_string(),
                sub_code: code.to_string(),
                sessions,
            })
        }
        _ => Err(format!("expected NAME:CODE:SESSIONS, got {raw:?}")),
    }
}

fn print_remote<T: Serialize>(title: &str, remote: &Remote<T>) {
    match remote {
        Remote::Loaded(value) => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{title}:\n{json}"),
            Err(e) => println!("{title}: could not encode response: {e}"),
        },
        Remote::SoftFailed(message) => println!("{title}: {message}"),
        Remote::Errored(e) => println!("{title} failed: {} ({})", e.message, e.code),
        Remote::Idle | Remote::Loading => println!("{title}: no result"),
    }
}

/// School of the signed-in user, used when a command omits `--school`.
fn session_school(session: &Session) -> Option<String> {
    match session {
        Session::Anonymous => None,
        Session::Admin(a) => Some(a.id.clone()),
        Session::Student(s) => s.school.as_ref().map(|r| r.id.clone()),
        Session::Teacher(t) => t.school.as_ref().map(|r| r.id.clone()),
    }
}

fn school_or_session(store: &Store, school: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    school
        .or_else(|| session_school(&store.snapshot().user.session))
        .ok_or_else(|| "no --school given and nobody is signed in".into())
}

/// Loads what the signed-in user's dashboard shows.
async fn load_dashboard(api: &HttpApi, store: &Store) {
    let session = store.snapshot().user.session;
    match &session {
        Session::Anonymous => {}
        Session::Admin(admin) => {
            actions::get_admin_details(api, store, &admin.id).await;
            actions::get_all_sclasses(api, store, &admin.id).await;
            actions::get_school_subjects(api, store, &admin.id).await;
            actions::get_all_teachers(api, store, &admin.id).await;
            actions::get_all_students(api, store, &admin.id).await;
        }
        Session::Teacher(teacher) => {
            actions::get_teacher_details(api, store, &teacher.id).await;
            if let Some(class) = &teacher.teach_sclass {
                actions::get_class_students(api, store, &class.id).await;
            }
        }
        Session::Student(student) => {
            actions::get_student_details(api, store, &student.id).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let _log_guard = logging::init(&config);

    let api = HttpApi::new(cli.url.unwrap_or(config.api_url));
    let store = Store::with_persistence(PersistFile::in_dir(&config.client_dir));

    match cli.command {
        Commands::Login { role, email, password } => {
            actions::login(&api, &store, role.into(), &email, &password).await;
            match store.snapshot().user.auth {
                Remote::Loaded(()) => println!("Logged in."),
                other => print_remote("Login", &other),
            }
        }
        Commands::RegisterAdmin { name, email, password, school_name } => {
            actions::register_admin(&api, &store, &name, &email, &password, &school_name).await;
            match store.snapshot().user.auth {
                Remote::Loaded(()) => println!("School registered and signed in."),
                other => print_remote("Register", &other),
            }
        }
        Commands::Logout => {
            actions::logout(&store);
            println!("Logged out.");
        }
        Commands::Show { path } => {
            let screen = Screen::resolve(&store.snapshot().user.session, &path);
            if matches!(screen, Screen::Dashboard(_)) {
                load_dashboard(&api, &store).await;
            }
            print!("{}", render(screen, &store.snapshot()));
        }
        Commands::ToggleDarkMode => {
            let dark = store.toggle_dark_mode();
            println!("Dark mode {}", if dark { "on" } else { "off" });
        }
        Commands::Teachers { school } => {
            let school = school_or_session(&store, school)?;
            actions::get_all_teachers(&api, &store, &school).await;
            print_remote("Teachers", &store.snapshot().teacher.list);
        }
        Commands::Teacher { id } => {
            actions::get_teacher_details(&api, &store, &id).await;
            print_remote("Teacher", &store.snapshot().teacher.details);
        }
        Commands::AssignSubject { teacher, subject } => {
            actions::update_teach_subject(&api, &store, &teacher, &subject).await;
            print_remote("Assign subject", &store.snapshot().teacher.mutation);
        }
        Commands::TeacherAttendance { id, status, date } => {
            actions::record_teacher_attendance(&api, &store, &id, date, status.into()).await;
            print_remote("Teacher", &store.snapshot().teacher.details);
        }
        Commands::DeleteTeacher { id } => {
            actions::delete_teacher(&api, &store, &id).await;
            print_remote("Delete teacher", &store.snapshot().teacher.mutation);
        }
        Commands::RegisterTeacher { name, email, password, subject, class, school } => {
            let teacher = TeacherRegister {
                name,
                email,
                password,
                school: school_or_session(&store, school)?,
                teach_subject: subject,
                teach_sclass: class,
            };
            actions::register_teacher(&api, &store, &teacher).await;
            print_remote("Register teacher", &store.snapshot().user.added);
        }
        Commands::RegisterStudent { name, email, roll, password, class, school } => {
            let student = StudentRegister {
                name,
                email,
                roll_num: roll,
                password,
                sclass_name: class,
                school: school_or_session(&store, school)?,
            };
            actions::register_student(&api, &store, &student).await;
            print_remote("Register student", &store.snapshot().user.added);
        }
        Commands::Students { school } => {
            let school = school_or_session(&store, school)?;
            actions::get_all_students(&api, &store, &school).await;
            print_remote("Students", &store.snapshot().student.list);
        }
        Commands::Student { id } => {
            actions::get_student_details(&api, &store, &id).await;
            print_remote("Student", &store.snapshot().student.details);
        }
        Commands::DeleteStudent { id } => {
            actions::delete_student(&api, &store, &id).await;
            print_remote("Delete student", &store.snapshot().student.mutation);
        }
        Commands::StudentAttendance { id, subject, status, date } => {
            actions::record_student_attendance(&api, &store, &id, &subject, date, status.into()).await;
            print_remote("Student", &store.snapshot().student.details);
        }
        Commands::ExamResult { id, subject, marks } => {
            actions::update_exam_result(&api, &store, &id, &subject, marks).await;
            print_remote("Student", &store.snapshot().student.details);
        }
        Commands::Classes { school } => {
            let school = school_or_session(&store, school)?;
            actions::get_all_sclasses(&api, &store, &school).await;
            print_remote("Classes", &store.snapshot().sclass.list);
        }
        Commands::Class { id } => {
            actions::get_sclass_details(&api, &store, &id).await;
            print_remote("Class", &store.snapshot().sclass.details);
        }
        Commands::ClassStudents { class } => {
            actions::get_class_students(&api, &store, &class).await;
            print_remote("Class students", &store.snapshot().sclass.students);
        }
        Commands::Subjects { school } => {
            let school = school_or_session(&store, school)?;
            actions::get_school_subjects(&api, &store, &school).await;
            print_remote("Subjects", &store.snapshot().subject.list);
        }
        Commands::ClassSubjects { class } => {
            actions::get_class_subjects(&api, &store, &class).await;
            print_remote("Subjects", &store.snapshot().subject.list);
        }
        Commands::FreeSubjects { class } => {
            actions::get_free_subjects(&api, &store, &class).await;
            print_remote("Free subjects", &store.snapshot().subject.free);
        }
        Commands::Subject { id } => {
            actions::get_subject_details(&api, &store, &id).await;
            print_remote("Subject", &store.snapshot().subject.details);
        }
        Commands::AddClass { name, school } => {
            let school = school_or_session(&store, school)?;
            actions::add_sclass(&api, &store, &school, &name).await;
            print_remote("Add class", &store.snapshot().user.added);
        }
        Commands::DeleteClass { id } => {
            actions::delete_sclass(&api, &store, &id).await;
            print_remote("Delete class", &store.snapshot().sclass.mutation);
        }
        Commands::AddSubjects { class, subjects, school } => {
            let school = school_or_session(&store, school)?;
            actions::add_subjects(&api, &store, &school, &class, &subjects).await;
            print_remote("Add subjects", &store.snapshot().user.added);
        }
        Commands::DeleteSubject { id } => {
            actions::delete_subject(&api, &store, &id).await;
            print_remote("Delete subject", &store.snapshot().subject.mutation);
        }
    }

    Ok(())
}
