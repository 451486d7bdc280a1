use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::map_constraint;
use crate::error::StoreError;
use crate::recipes::repo_types::{NewRecipe, Recipe};

pub const INVALID_RECIPE: &str = "Invalid recipe data.";

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// All recipes, oldest first.
    async fn list_all(&self) -> Result<Vec<Recipe>, StoreError>;
    /// Fails with `StoreError::Conflict` when the owner does not exist.
    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, StoreError>;
}

#[derive(Clone)]
pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn list_all(&self) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, instructions, minutes_to_complete, created_at
            FROM recipes
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (user_id, title, instructions, minutes_to_complete)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, instructions, minutes_to_complete, created_at
            "#,
        )
        .bind(recipe.user_id)
        .bind(&recipe.title)
        .bind(&recipe.instructions)
        .bind(recipe.minutes_to_complete)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_constraint(e, INVALID_RECIPE))
    }
}
