use tracing::{error, warn};

use crate::{
    auth::{
        dto::SignupRequest,
        password,
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::AppError,
};

/// Validates the signup payload, hashes the password and persists the user.
pub async fn register(users: &dyn UserStore, req: SignupRequest) -> Result<User, AppError> {
    let username = req.username.trim().to_string();
    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push("Username must be present.".to_string());
    }
    let hash = match password::hash_password(&req.password) {
        Ok(h) => Some(h),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    };
    let Some(password_hash) = hash.filter(|_| errors.is_empty()) else {
        return Err(AppError::Validation(errors));
    };

    let user = users
        .insert(NewUser {
            username,
            password_hash,
            image_url: blank_to_none(req.image_url),
            bio: blank_to_none(req.bio),
        })
        .await?;
    Ok(user)
}

/// Returns the user only if the password matches. Unknown usernames still pay for one
/// verification.
pub async fn authenticate(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(user) = users.find_by_username(username.trim()).await? else {
        password::burn_verification(password);
        warn!("login unknown username");
        return Ok(None);
    };

    let ok = match password::verify_password(password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "stored password hash unreadable");
            false
        }
    };
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

fn blank_to_none(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}
