//! Load data script for school_desk
//!
//! Seeds a demo school straight into the document store:
//! - one school (admin), one class, two subjects
//! - one teacher holding the first subject
//! - two students
//! Run: cargo run --bin load_data
//! Every seeded account uses the password "password".

use school_desk::auth::hash_password;
use school_desk::config::Config;
use school_desk::logging;
use school_desk::models::{new_id, Admin, Role, Sclass, Student, Subject, Teacher};
use school_desk::storage::Storage;
use tracing::info;

const DEMO_EMAIL: &str = "admin@demo.school";
const DEMO_PASSWORD: &str = "password";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let _log_guard = logging::init(&config);
    let storage = Storage::open(&config.data_dir)?;

    if storage.admins.find_one(|a| a.email == DEMO_EMAIL)?.is_some() {
        info!(email = DEMO_EMAIL, "demo school already present, nothing to do");
        return Ok(());
    }

    let password = hash_password(DEMO_PASSWORD, config.bcrypt_cost)?;

    let admin = Admin {
        id: new_id(),
        name: "Demo Admin".to_string(),
        email: DEMO_EMAIL.to_string(),
        password: password.clone(),
        role: Role::Admin,
        school_name: "Demo School".to_string(),
    };
    storage.admins.put(&admin)?;

    let sclass = Sclass {
        id: new_id(),
        sclass_name: "7A".to_string(),
        school: admin.id.clone(),
    };
    storage.sclasses.put(&sclass)?;

    let subject = |name: &str, code: &str, sessions: u32| Subject {
        id: new_id(),
        sub_name: name.to_string(),
        sub_code: code.to_string(),
        sessions,
        sclass_name: sclass.id.clone(),
        school: admin.id.clone(),
        teacher: None,
    };
    let mut math = subject("Mathematics", "MATH7", 40);
    let science = subject("Science", "SCI7", 30);

    let teacher = Teacher {
        id: new_id(),
        name: "Demo Teacher".to_string(),
        email: "teacher@demo.school".to_string(),
        password: password.clone(),
        role: Role::Teacher,
        school: admin.id.clone(),
        teach_subject: Some(math.id.clone()),
        teach_sclass: Some(sclass.id.clone()),
        attendance: Vec::new(),
    };
    math.teacher = Some(teacher.id.clone());
    storage.subjects.put(&math)?;
    storage.subjects.put(&science)?;
    storage.teachers.put(&teacher)?;

    for roll_num in 1..=2 {
        let student = Student {
            id: new_id(),
            name: format!("Demo Student {roll_num}"),
            email: format!("student{roll_num}@demo.school"),
            roll_num,
            password: password.clone(),
            role: Role::Student,
            sclass_name: sclass.id.clone(),
            school: admin.id.clone(),
            exam_result: Vec::new(),
            attendance: Vec::new(),
        };
        storage.students.put(&student)?;
        info!(student_id = %student.id, email = %student.email, "student seeded");
    }

    storage.flush().await?;
    info!(
        school_id = %admin.id,
        sclass_id = %sclass.id,
        teacher_id = %teacher.id,
        "demo school seeded"
    );
    Ok(())
}
