//! Storage seam for the recipe composer, the cart aggregator and the
//! membership guards. Every method returns plain collections so the
//! algorithms never see the storage API.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    actions,
    error::CoreError,
    schema::{
        Author, Id, IngredientAmount, MembershipKind, Recipe, RecipeFields, RecipePart, Tag,
    },
};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, CoreError>;

    async fn get_author(&self, id: Id) -> Result<Option<Author>, CoreError>;

    /// Returns the ids from `ids` that have no ingredient row.
    async fn missing_ingredients(&self, ids: &[Id]) -> Result<Vec<Id>, CoreError>;

    /// Returns the ids from `ids` that have no tag row.
    async fn missing_tags(&self, ids: &[Id]) -> Result<Vec<Id>, CoreError>;

    /// Inserts the recipe row and its associations atomically.
    async fn create_recipe(
        &self,
        author_id: Id,
        fields: &RecipeFields,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<Id, CoreError>;

    /// Overwrites the scalar fields and the associations atomically.
    async fn update_recipe(
        &self,
        id: Id,
        fields: &RecipeFields,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError>;

    /// Replaces every ingredient and tag association of a recipe. Either the
    /// whole new set is visible afterwards or nothing changed.
    async fn replace_associations(
        &self,
        recipe_id: Id,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError>;

    async fn delete_recipe(&self, id: Id) -> Result<bool, CoreError>;

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, CoreError>;

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, CoreError>;

    async fn list_cart_recipes(&self, user_id: Id) -> Result<Vec<Id>, CoreError>;

    /// Every ingredient association of every recipe in the user's cart.
    async fn list_cart_parts(&self, user_id: Id) -> Result<Vec<RecipePart>, CoreError> {
        let mut parts = vec![];
        for recipe_id in self.list_cart_recipes(user_id).await? {
            parts.extend(self.list_recipe_parts(recipe_id).await?);
        }

        Ok(parts)
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError>;

    /// Returns false when the pair already existed.
    async fn insert_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError>;

    /// Returns false when there was nothing to delete.
    async fn delete_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError>;
}

/// PostgreSQL store backed by the sqlx pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, CoreError> {
        actions::get_recipe(id, &self.pool).await
    }

    async fn get_author(&self, id: Id) -> Result<Option<Author>, CoreError> {
        actions::get_author(id, &self.pool).await
    }

    async fn missing_ingredients(&self, ids: &[Id]) -> Result<Vec<Id>, CoreError> {
        actions::missing_ingredients(ids, &self.pool).await
    }

    async fn missing_tags(&self, ids: &[Id]) -> Result<Vec<Id>, CoreError> {
        actions::missing_tags(ids, &self.pool).await
    }

    async fn create_recipe(
        &self,
        author_id: Id,
        fields: &RecipeFields,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<Id, CoreError> {
        actions::create_recipe(author_id, fields, ingredients, tags, &self.pool).await
    }

    async fn update_recipe(
        &self,
        id: Id,
        fields: &RecipeFields,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError> {
        actions::update_recipe(id, fields, ingredients, tags, &self.pool).await
    }

    async fn replace_associations(
        &self,
        recipe_id: Id,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError> {
        actions::replace_recipe_associations(recipe_id, ingredients, tags, &self.pool).await
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, CoreError> {
        actions::delete_recipe(id, &self.pool).await
    }

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, CoreError> {
        actions::list_recipe_parts(recipe_id, &self.pool).await
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, CoreError> {
        actions::list_recipe_tags(recipe_id, &self.pool).await
    }

    async fn list_cart_recipes(&self, user_id: Id) -> Result<Vec<Id>, CoreError> {
        actions::list_cart_recipes(user_id, &self.pool).await
    }

    async fn list_cart_parts(&self, user_id: Id) -> Result<Vec<RecipePart>, CoreError> {
        actions::list_cart_parts(user_id, &self.pool).await
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        actions::has_membership(kind, user_id, target_id, &self.pool).await
    }

    async fn insert_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        actions::insert_membership(kind, user_id, target_id, &self.pool).await
    }

    async fn delete_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        actions::delete_membership(kind, user_id, target_id, &self.pool).await
    }
}
