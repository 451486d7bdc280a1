use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    extract::ValidJson,
    recipes::{
        dto::{CreateRecipeRequest, RecipeView},
        services,
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new().route("/recipes", get(list_recipes).post(create_recipe))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RecipeView>>, AppError> {
    let items = services::list_recipes(state.recipes.as_ref(), state.users.as_ref()).await?;
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeView>), AppError> {
    let view =
        services::create_recipe(state.recipes.as_ref(), state.users.as_ref(), user_id, payload)
            .await?;
    info!(recipe_id = %view.id, %user_id, "recipe created");
    Ok((StatusCode::CREATED, Json(view)))
}
