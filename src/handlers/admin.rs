use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{require, require_email, LoginRequest, Valid, Validate};
use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::models::{new_id, Admin, Role};
use crate::rest::AppState;
use crate::views::AdminView;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegister {
    pub name: String,
    pub email: String,
    pub password: String,
    pub school_name: String,
}

impl Validate for AdminRegister {
    fn validate(&self) -> ApiResult<()> {
        require("name", &self.name)?;
        require_email(&self.email)?;
        require("password", &self.password)?;
        require("schoolName", &self.school_name)
    }
}

pub async fn admin_register(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<AdminRegister>,
) -> ApiResult<(StatusCode, Json<AdminView>)> {
    let admins = &state.storage.admins;
    if admins.find_one(|a| a.email == payload.email)?.is_some() {
        return Err(ApiError::conflict("Email already exists"));
    }
    if admins
        .find_one(|a| a.school_name == payload.school_name)?
        .is_some()
    {
        return Err(ApiError::conflict("School name already exists"));
    }

    let admin = Admin {
        id: new_id(),
        name: payload.name,
        email: payload.email,
        password: hash_password(&payload.password, state.bcrypt_cost)?,
        role: Role::Admin,
        school_name: payload.school_name,
    };
    admins.put(&admin)?;

    info!(admin_id = %admin.id, school = %admin.school_name, "school registered");
    Ok((StatusCode::CREATED, Json(admin.into())))
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Valid(payload): Valid<LoginRequest>,
) -> ApiResult<Json<AdminView>> {
    let admin = state
        .storage
        .admins
        .find_one(|a| a.email == payload.email)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !verify_password(&payload.password, &admin.password)? {
        return Err(ApiError::BadCredentials);
    }
    info!(admin_id = %admin.id, "admin logged in");
    Ok(Json(admin.into()))
}

pub async fn get_admin_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AdminView>> {
    let admin = state
        .storage
        .admins
        .get(&id)?
        .ok_or_else(|| ApiError::not_found("No admin found"))?;
    Ok(Json(admin.into()))
}
