//! Client side of school_desk: a transport seam over the REST API, typed
//! state slices, one action per user intent, persisted session state and
//! role-based screen routing. `school-cli` drives all of it.

pub mod actions;
pub mod api;
pub mod persist;
pub mod state;
pub mod view;

pub use api::{Api, ErrorInfo, HttpApi};
pub use state::{ClientState, Remote, Session, Store};
