use std::collections::HashMap;

use anyhow::anyhow;
use uuid::Uuid;

use crate::{
    auth::{dto::PublicUser, repo::UserStore},
    error::AppError,
    recipes::{
        dto::{CreateRecipeRequest, RecipeView},
        repo::RecipeStore,
        repo_types::{NewRecipe, Recipe},
    },
};

pub fn validate(owner: Uuid, req: CreateRecipeRequest) -> Result<NewRecipe, AppError> {
    let mut errors = Vec::new();
    if req.title.trim().is_empty() {
        errors.push("Title must be present.".to_string());
    }
    if req.instructions.trim().is_empty() {
        errors.push("Instructions must be present.".to_string());
    }
    if matches!(req.minutes_to_complete, Some(m) if m < 0) {
        errors.push("Minutes to complete must be a non-negative number.".to_string());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(NewRecipe {
        user_id: owner,
        title: req.title,
        instructions: req.instructions,
        minutes_to_complete: req.minutes_to_complete,
    })
}

pub async fn create_recipe(
    recipes: &dyn RecipeStore,
    users: &dyn UserStore,
    owner: Uuid,
    req: CreateRecipeRequest,
) -> Result<RecipeView, AppError> {
    let new = validate(owner, req)?;
    let recipe = recipes.insert(new).await?;
    let user = users
        .find_by_id(owner)
        .await?
        .ok_or_else(|| anyhow!("owner {owner} of recipe {} vanished", recipe.id))?;
    Ok(RecipeView::new(recipe, user.into()))
}

/// Lists every recipe with its owner embedded, resolving owners in one batch lookup.
pub async fn list_recipes(
    recipes: &dyn RecipeStore,
    users: &dyn UserStore,
) -> Result<Vec<RecipeView>, AppError> {
    let rows: Vec<Recipe> = recipes.list_all().await?;

    let mut owner_ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();
    let owners: HashMap<Uuid, PublicUser> = users
        .find_many(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, PublicUser::from(u)))
        .collect();

    rows.into_iter()
        .map(|r| -> Result<RecipeView, AppError> {
            let owner = owners
                .get(&r.user_id)
                .cloned()
                .ok_or_else(|| anyhow!("recipe {} references missing user {}", r.id, r.user_id))?;
            Ok(RecipeView::new(r, owner))
        })
        .collect()
}
