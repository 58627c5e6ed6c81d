//! Client state: one slice per resource, each async operation tracked as a
//! `Remote<T>`. Mutation goes through `Store::dispatch`; readers take a
//! `snapshot`.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

use super::api::ErrorInfo;
use super::persist::{PersistFile, Persisted};
use crate::models::Role;
use crate::views::{AdminView, SclassView, StudentView, SubjectView, TeacherView};

/// Progress of one async operation. Exactly one state at a time; a new
/// start discards the previous payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Remote<T> {
    Idle,
    Loading,
    Loaded(T),
    SoftFailed(String),
    Errored(ErrorInfo),
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Remote::Idle
    }
}

impl<T> Remote<T> {
    pub fn start(&mut self) {
        *self = Remote::Loading;
    }

    pub fn succeed(&mut self, value: T) {
        *self = Remote::Loaded(value);
    }

    pub fn soft_fail(&mut self, message: impl Into<String>) {
        *self = Remote::SoftFailed(message.into());
    }

    pub fn fail(&mut self, error: ErrorInfo) {
        *self = Remote::Errored(error);
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Remote::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            Remote::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Admin(AdminView),
    Student(StudentView),
    Teacher(TeacherView),
}

impl Session {
    /// Builds a session from a login or registration body, choosing the
    /// variant by its `role` field.
    pub fn from_user(user: Value) -> Result<Self, serde_json::Error> {
        let role: Role = match user.get("role") {
            Some(role) => serde_json::from_value(role.clone())?,
            None => return Err(de::Error::missing_field("role")),
        };
        Ok(match role {
            Role::Admin => Session::Admin(serde_json::from_value(user)?),
            Role::Student => Session::Student(serde_json::from_value(user)?),
            Role::Teacher => Session::Teacher(serde_json::from_value(user)?),
        })
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Session::Anonymous => None,
            Session::Admin(_) => Some(Role::Admin),
            Session::Student(_) => Some(Role::Student),
            Session::Teacher(_) => Some(Role::Teacher),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::Admin(a) => Some(&a.id),
            Session::Student(s) => Some(&s.id),
            Session::Teacher(t) => Some(&t.id),
        }
    }
}

// Persisted as the bare user document, the way the API returns it.
impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Session::Anonymous => serializer.serialize_none(),
            Session::Admin(a) => a.serialize(serializer),
            Session::Student(s) => s.serialize(serializer),
            Session::Teacher(t) => t.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Session {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Session::Anonymous),
            user => Session::from_user(user).map_err(de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSlice {
    pub session: Session,
    pub auth: Remote<()>,
    pub details: Remote<AdminView>,
    /// Last document the admin created, as the server echoed it.
    pub added: Remote<Value>,
    pub dark_mode: bool,
}

impl Default for UserSlice {
    fn default() -> Self {
        Self {
            session: Session::Anonymous,
            auth: Remote::Idle,
            details: Remote::Idle,
            added: Remote::Idle,
            dark_mode: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TeacherSlice {
    pub list: Remote<Vec<TeacherView>>,
    pub details: Remote<TeacherView>,
    pub mutation: Remote<()>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentSlice {
    pub list: Remote<Vec<StudentView>>,
    pub details: Remote<StudentView>,
    pub mutation: Remote<()>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SclassSlice {
    pub list: Remote<Vec<SclassView>>,
    pub details: Remote<SclassView>,
    pub students: Remote<Vec<StudentView>>,
    pub mutation: Remote<()>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubjectSlice {
    pub list: Remote<Vec<SubjectView>>,
    pub details: Remote<SubjectView>,
    pub free: Remote<Vec<SubjectView>>,
    pub mutation: Remote<()>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientState {
    pub user: UserSlice,
    pub teacher: TeacherSlice,
    pub student: StudentSlice,
    pub sclass: SclassSlice,
    pub subject: SubjectSlice,
}

impl ClientState {
    pub fn from_persisted(persisted: Persisted) -> Self {
        let mut state = ClientState::default();
        state.user.session = persisted.user.unwrap_or_default();
        state.user.dark_mode = persisted.dark_mode;
        state
    }

    pub fn to_persisted(&self) -> Persisted {
        let user = match self.user.session {
            Session::Anonymous => None,
            ref session => Some(session.clone()),
        };
        Persisted {
            user,
            dark_mode: self.user.dark_mode,
        }
    }
}

/// Shared handle on the client state. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct Store {
    state: Arc<Mutex<ClientState>>,
    persist: Option<Arc<PersistFile>>,
}

impl Store {
    pub fn new(state: ClientState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            persist: None,
        }
    }

    /// Loads the persisted session and writes it back on every sign-in,
    /// sign-out and theme change.
    pub fn with_persistence(persist: PersistFile) -> Self {
        let state = ClientState::from_persisted(persist.load());
        Self {
            state: Arc::new(Mutex::new(state)),
            persist: Some(Arc::new(persist)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dispatch<R>(&self, f: impl FnOnce(&mut ClientState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> ClientState {
        self.lock().clone()
    }

    pub fn sign_in(&self, session: Session) {
        self.dispatch(|s| {
            s.user.session = session;
            s.user.auth.succeed(());
        });
        self.save();
    }

    /// Clears the session and every cached slice.
    pub fn sign_out(&self) {
        self.dispatch(|s| {
            let dark_mode = s.user.dark_mode;
            *s = ClientState::default();
            s.user.dark_mode = dark_mode;
        });
        self.save();
    }

    pub fn toggle_dark_mode(&self) -> bool {
        let dark_mode = self.dispatch(|s| {
            s.user.dark_mode = !s.user.dark_mode;
            s.user.dark_mode
        });
        self.save();
        dark_mode
    }

    fn save(&self) {
        if let Some(persist) = &self.persist {
            let persisted = self.lock().to_persisted();
            if let Err(e) = persist.save(&persisted) {
                warn!(error = %e, path = %persist.path().display(), "could not persist client state");
            }
        }
    }
}
