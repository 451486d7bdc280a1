use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, SignupRequest},
        extractors::Session,
        services,
    },
    error::AppError,
    extract::ValidJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", delete(logout))
        .route("/check_session", get(check_session))
}

#[instrument(skip(state, session, payload))]
pub async fn signup(
    State(state): State<AppState>,
    mut session: Session,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = match services::register(state.users.as_ref(), payload).await {
        Ok(u) => u,
        Err(AppError::Conflict(msg)) => {
            warn!("signup with taken username");
            return Err(AppError::Conflict(msg));
        }
        Err(e) => return Err(e),
    };
    session.create(user.id).await?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, session))]
pub async fn check_session(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<PublicUser>, AppError> {
    let user_id = session.current_user_id().ok_or(AppError::Unauthorized)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        debug!(error = %e, "rejected login body");
        AppError::InvalidCredentials
    })?;
    let user = services::authenticate(state.users.as_ref(), &payload.username, &payload.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    session.create(user.id).await?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(user.into()))
}

#[instrument(skip(session))]
pub async fn logout(mut session: Session) -> Result<StatusCode, AppError> {
    let user_id = session.current_user_id();
    session.destroy().await?;
    if let Some(user_id) = user_id {
        info!(%user_id, "user logged out");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{body_json, send, session_cookie, TestApp};

    #[tokio::test]
    async fn signup_then_check_session() {
        let app = TestApp::new();
        let res = app
            .request(
                Method::POST,
                "/signup",
                None,
                Some(json!({
                    "username": "ada",
                    "password": "hunter22",
                    "image_url": "https://img.example/ada.png",
                    "bio": "analytical"
                })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let cookie = session_cookie(&res).expect("session cookie set");
        let created = body_json(res).await;
        assert_eq!(created["username"], "ada");
        assert_eq!(created["image_url"], "https://img.example/ada.png");
        assert_eq!(created["bio"], "analytical");
        assert!(created.get("password_hash").is_none());

        let res = app.request(Method::GET, "/check_session", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, created);
    }

    #[tokio::test]
    async fn duplicate_signup_is_422_and_not_persisted() {
        let app = TestApp::new();
        let body = json!({ "username": "ada", "password": "hunter22" });
        let first = app.request(Method::POST, "/signup", None, Some(body.clone())).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let first_id = body_json(first).await["id"].clone();

        let second = app.request(Method::POST, "/signup", None, Some(body)).await;
        assert_eq!(second.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(session_cookie(&second).is_none());
        assert_eq!(
            body_json(second).await,
            json!({ "errors": ["Username already taken."] })
        );

        assert_eq!(app.store.user_count().await, 1);
        let res = app
            .request(
                Method::POST,
                "/login",
                None,
                Some(json!({ "username": "ada", "password": "hunter22" })),
            )
            .await;
        assert_eq!(body_json(res).await["id"], first_id);
    }

    #[tokio::test]
    async fn signup_with_empty_password_is_422() {
        let app = TestApp::new();
        let res = app
            .request(
                Method::POST,
                "/signup",
                None,
                Some(json!({ "username": "ada", "password": "" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(res).await,
            json!({ "errors": ["Password must be present."] })
        );
        assert_eq!(app.store.user_count().await, 0);
    }

    #[tokio::test]
    async fn signup_with_missing_or_unknown_fields_is_422() {
        let app = TestApp::new();
        let res = app
            .request(Method::POST, "/signup", None, Some(json!({ "username": "ada" })))
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(res).await,
            json!({ "errors": ["Invalid request body."] })
        );

        let res = app
            .request(
                Method::POST,
                "/signup",
                None,
                Some(json!({ "username": "ada", "password": "x", "role": "admin" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(app.store.user_count().await, 0);
    }

    #[tokio::test]
    async fn login_success_and_failure() {
        let app = TestApp::new();
        app.signup("ada", "hunter22").await;

        let res = app
            .request(
                Method::POST,
                "/login",
                None,
                Some(json!({ "username": "ada", "password": "hunter22" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res).expect("session cookie set");
        assert_eq!(body_json(res).await["username"], "ada");
        let res = app.request(Method::GET, "/check_session", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .request(
                Method::POST,
                "/login",
                None,
                Some(json!({ "username": "ada", "password": "nope" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(session_cookie(&res).is_none());
        assert_eq!(
            body_json(res).await,
            json!({ "error": "Invalid username or password" })
        );

        let res = app
            .request(
                Method::POST,
                "/login",
                None,
                Some(json!({ "username": "ghost", "password": "hunter22" })),
            )
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_login_bodies_are_invalid_credentials() {
        let app = TestApp::new();
        app.signup("ada", "hunter22").await;

        for body in [
            Some(json!({ "username": "ada" })),
            Some(json!({ "username": "ada", "password": 5 })),
            Some(json!({})),
            None,
        ] {
            let res = app.request(Method::POST, "/login", None, body).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert!(session_cookie(&res).is_none());
            assert_eq!(
                body_json(res).await,
                json!({ "error": "Invalid username or password" })
            );
        }
    }

    #[tokio::test]
    async fn relogin_rotates_the_session() {
        let app = TestApp::new();
        let old = app.signup("ada", "hunter22").await;

        let res = app
            .request(
                Method::POST,
                "/login",
                Some(&old),
                Some(json!({ "username": "ada", "password": "hunter22" })),
            )
            .await;
        let new = session_cookie(&res).expect("session cookie set");
        assert_ne!(old, new);

        let res = app.request(Method::GET, "/check_session", Some(&old), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = app.request(Method::GET, "/check_session", Some(&new), None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn check_session_without_cookie_is_401() {
        let app = TestApp::new();
        let res = app.request(Method::GET, "/check_session", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await, json!({ "error": "Unauthorized" }));

        let forged = "cookbook_session=eyJhbGciOiJIUzI1NiJ9.e30.bogus";
        let res = send(&app.router, Method::GET, "/check_session", Some(forged), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_flow() {
        let app = TestApp::new();
        let res = app.request(Method::DELETE, "/logout", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await, json!({ "error": "Unauthorized" }));

        let cookie = app.signup("ada", "hunter22").await;
        let res = app.request(Method::DELETE, "/logout", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());

        // Replaying the old cookie must not revive the session.
        let res = app.request(Method::GET, "/check_session", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = app.request(Method::DELETE, "/logout", Some(&cookie), None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
