use bcrypt::{hash, verify};

use crate::error::ApiResult;

/// Salted bcrypt hash at the configured work factor.
pub fn hash_password(password: &str, cost: u32) -> ApiResult<String> {
    Ok(hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    Ok(verify(password, hash)?)
}
