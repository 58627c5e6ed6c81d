//! school_desk: role-based school management.
//!
//! Server side: a REST API (Axum) over a sled document store holding
//! schools, classes, subjects, teachers and students. Client side: an action
//! layer, typed state slices and role-based view routing used by `school-cli`.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod rest;
pub mod storage;
pub mod views;
