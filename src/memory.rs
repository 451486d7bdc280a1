//! In-process backend for the store traits, used when no `DATABASE_URL` is configured and by
//! the test suite. All tables sit behind one lock so constraint checks and inserts are atomic.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{SessionStore, UserStore, USERNAME_TAKEN},
        repo_types::{NewUser, SessionRecord, User},
    },
    error::StoreError,
    recipes::{
        repo::{RecipeStore, INVALID_RECIPE},
        repo_types::{NewRecipe, Recipe},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<Recipe>,
    sessions: Vec<SessionRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    #[cfg(test)]
    pub async fn recipe_count(&self) -> usize {
        self.tables.read().await.recipes.len()
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(USERNAME_TAKEN.into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            password_hash: user.password_hash,
            image_url: user.image_url,
            bio: user.bio,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.tables.read().await.recipes.clone())
    }

    async fn insert(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.iter().any(|u| u.id == recipe.user_id) {
            return Err(StoreError::Conflict(INVALID_RECIPE.into()));
        }
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: recipe.user_id,
            title: recipe.title,
            instructions: recipe.instructions,
            minutes_to_complete: recipe.minutes_to_complete,
            created_at: OffsetDateTime::now_utc(),
        };
        t.recipes.push(recipe.clone());
        Ok(recipe)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(
        &self,
        user_id: Uuid,
        expires_at: OffsetDateTime,
    ) -> Result<SessionRecord, StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::Conflict("Unknown user.".into()));
        }
        let session = SessionRecord {
            id: Uuid::new_v4(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        };
        t.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_active(
        &self,
        id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let t = self.tables.read().await;
        Ok(t
            .sessions
            .iter()
            .find(|s| s.id == id && s.expires_at > now)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|s| s.id != id);
        Ok(t.sessions.len() < before)
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|s| s.expires_at > now);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            password_hash: "hash".into(),
            image_url: None,
            bio: None,
        }
    }

    #[tokio::test]
    async fn username_is_unique() {
        let store = MemoryStore::new();
        UserStore::insert(&store, new_user("ada")).await.unwrap();
        let err = UserStore::insert(&store, new_user("ada")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn find_many_skips_unknown_ids() {
        let store = MemoryStore::new();
        let a = UserStore::insert(&store, new_user("a")).await.unwrap();
        let b = UserStore::insert(&store, new_user("b")).await.unwrap();
        let found = store.find_many(&[a.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
        assert!(store.find_many(&[]).await.unwrap().is_empty());
        assert_eq!(store.find_by_id(b.id).await.unwrap().unwrap().username, "b");
    }

    #[tokio::test]
    async fn recipe_requires_existing_owner() {
        let store = MemoryStore::new();
        let err = RecipeStore::insert(
            &store,
            NewRecipe {
                user_id: Uuid::new_v4(),
                title: "Toast".into(),
                instructions: "Toast the bread.".into(),
                minutes_to_complete: Some(3),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref m) if m == INVALID_RECIPE));
        assert_eq!(store.recipe_count().await, 0);
    }

    #[tokio::test]
    async fn recipes_list_in_insertion_order() {
        let store = MemoryStore::new();
        let owner = UserStore::insert(&store, new_user("ada")).await.unwrap();
        for title in ["one", "two", "three"] {
            RecipeStore::insert(
                &store,
                NewRecipe {
                    user_id: owner.id,
                    title: title.into(),
                    instructions: "x".into(),
                    minutes_to_complete: None,
                },
            )
            .await
            .unwrap();
        }
        let titles: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn sessions_expire_and_purge() {
        let store = MemoryStore::new();
        let owner = UserStore::insert(&store, new_user("ada")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let live = SessionStore::insert(&store, owner.id, now + Duration::hours(1))
            .await
            .unwrap();
        let dead = SessionStore::insert(&store, owner.id, now - Duration::seconds(1))
            .await
            .unwrap();

        assert!(store.find_active(live.id, now).await.unwrap().is_some());
        assert!(store.find_active(dead.id, now).await.unwrap().is_none());

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);
        assert_eq!(store.session_count().await, 1);

        assert!(store.delete(live.id).await.unwrap());
        assert!(!store.delete(live.id).await.unwrap());
    }
}
