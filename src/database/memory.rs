//! In-process `RecipeStore`. All state sits behind one lock and every
//! operation takes it once, so composite writes are atomic.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::CoreError,
    schema::{
        Author, Id, Ingredient, IngredientAmount, MembershipKind, Recipe, RecipeFields,
        RecipePart, Tag,
    },
    store::RecipeStore,
};

#[derive(Default)]
struct State {
    next_id: Id,
    authors: BTreeMap<Id, Author>,
    ingredients: BTreeMap<Id, Ingredient>,
    tags: BTreeMap<Id, Tag>,
    recipes: BTreeMap<Id, Recipe>,
    recipe_ingredients: BTreeMap<Id, Vec<IngredientAmount>>,
    recipe_tags: BTreeMap<Id, Vec<Id>>,
    memberships: Vec<(MembershipKind, Id, Id)>,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    /// Every check a database would make on the association rows, run
    /// before anything is written.
    fn check_associations(
        &self,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for part in ingredients {
            if !seen.insert(part.ingredient_id) {
                return Err(CoreError::DuplicateAssociation(
                    "The same ingredient is listed more than once".to_owned(),
                ));
            }
            if !self.ingredients.contains_key(&part.ingredient_id) {
                return Err(CoreError::NotFound("Referenced ingredient not found".to_owned()));
            }
        }

        let mut seen = HashSet::new();
        for tag_id in tags {
            if !seen.insert(*tag_id) {
                return Err(CoreError::DuplicateAssociation(
                    "The same tag is listed more than once".to_owned(),
                ));
            }
            if !self.tags.contains_key(tag_id) {
                return Err(CoreError::NotFound("Referenced tag not found".to_owned()));
            }
        }

        Ok(())
    }

    fn target_exists(&self, kind: MembershipKind, target_id: Id) -> bool {
        if kind.targets_user() {
            self.authors.contains_key(&target_id)
        } else {
            self.recipes.contains_key(&target_id)
        }
    }

    fn write_recipe(&mut self, recipe: Recipe, ingredients: &[IngredientAmount], tags: &[Id]) {
        self.recipe_ingredients.insert(recipe.id, ingredients.to_vec());
        self.recipe_tags.insert(recipe.id, tags.to_vec());
        self.recipes.insert(recipe.id, recipe);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str) -> Author {
        let mut state = self.state.write().await;
        let author = Author {
            id: state.next_id(),
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
        };
        state.authors.insert(author.id, author.clone());

        author
    }

    pub async fn add_ingredient(&self, name: &str, measurement_unit: &str) -> Ingredient {
        let mut state = self.state.write().await;
        let ingredient = Ingredient {
            id: state.next_id(),
            name: name.to_owned(),
            measurement_unit: measurement_unit.to_owned(),
        };
        state.ingredients.insert(ingredient.id, ingredient.clone());

        ingredient
    }

    pub async fn add_tag(&self, name: &str, color: &str, slug: &str) -> Tag {
        let mut state = self.state.write().await;
        let tag = Tag {
            id: state.next_id(),
            name: name.to_owned(),
            color: color.to_owned(),
            slug: slug.to_owned(),
        };
        state.tags.insert(tag.id, tag.clone());

        tag
    }

    /// Deletes a user together with their recipes and memberships.
    pub async fn remove_user(&self, user_id: Id) -> bool {
        let mut state = self.state.write().await;
        if state.authors.remove(&user_id).is_none() {
            return false;
        }

        let owned: Vec<Id> = state
            .recipes
            .values()
            .filter(|recipe| recipe.author_id == user_id)
            .map(|recipe| recipe.id)
            .collect();
        for recipe_id in owned {
            remove_recipe(&mut state, recipe_id);
        }
        state.memberships.retain(|(kind, user, target)| {
            *user != user_id && !(kind.targets_user() && *target == user_id)
        });

        true
    }
}

fn remove_recipe(state: &mut State, recipe_id: Id) -> bool {
    if state.recipes.remove(&recipe_id).is_none() {
        return false;
    }

    state.recipe_ingredients.remove(&recipe_id);
    state.recipe_tags.remove(&recipe_id);
    state
        .memberships
        .retain(|(kind, _, target)| kind.targets_user() || *target != recipe_id);

    true
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn get_recipe(&self, id: Id) -> Result<Option<Recipe>, CoreError> {
        Ok(self.state.read().await.recipes.get(&id).cloned())
    }

    async fn get_author(&self, id: Id) -> Result<Option<Author>, CoreError> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn missing_ingredients(&self, ids: &[Id]) -> Result<Vec<Id>, CoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !state.ingredients.contains_key(id))
            .collect())
    }

    async fn missing_tags(&self, ids: &[Id]) -> Result<Vec<Id>, CoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !state.tags.contains_key(id))
            .collect())
    }

    async fn create_recipe(
        &self,
        author_id: Id,
        fields: &RecipeFields,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<Id, CoreError> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&author_id) {
            return Err(CoreError::not_found("Author"));
        }
        state.check_associations(ingredients, tags)?;

        let recipe = Recipe {
            id: state.next_id(),
            author_id,
            name: fields.name.to_owned(),
            text: fields.text.to_owned(),
            image: fields.image.to_owned(),
            cooking_time: fields.cooking_time,
        };
        let id = recipe.id;
        state.write_recipe(recipe, ingredients, tags);

        Ok(id)
    }

    async fn update_recipe(
        &self,
        id: Id,
        fields: &RecipeFields,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        let current = state
            .recipes
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Recipe"))?;
        state.check_associations(ingredients, tags)?;

        let recipe = Recipe {
            name: fields.name.to_owned(),
            text: fields.text.to_owned(),
            image: fields.image.to_owned().or(current.image),
            cooking_time: fields.cooking_time,
            ..current
        };
        state.write_recipe(recipe, ingredients, tags);

        Ok(())
    }

    async fn replace_associations(
        &self,
        recipe_id: Id,
        ingredients: &[IngredientAmount],
        tags: &[Id],
    ) -> Result<(), CoreError> {
        let mut state = self.state.write().await;
        if !state.recipes.contains_key(&recipe_id) {
            return Err(CoreError::not_found("Recipe"));
        }
        state.check_associations(ingredients, tags)?;

        state
            .recipe_ingredients
            .insert(recipe_id, ingredients.to_vec());
        state.recipe_tags.insert(recipe_id, tags.to_vec());

        Ok(())
    }

    async fn delete_recipe(&self, id: Id) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        Ok(remove_recipe(&mut state, id))
    }

    async fn list_recipe_parts(&self, recipe_id: Id) -> Result<Vec<RecipePart>, CoreError> {
        let state = self.state.read().await;
        let parts = state
            .recipe_ingredients
            .get(&recipe_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|part| {
                state
                    .ingredients
                    .get(&part.ingredient_id)
                    .map(|ingredient| RecipePart {
                        recipe_id,
                        ingredient_id: ingredient.id,
                        name: ingredient.name.to_owned(),
                        measurement_unit: ingredient.measurement_unit.to_owned(),
                        amount: part.amount,
                    })
            })
            .collect();

        Ok(parts)
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, CoreError> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state
            .recipe_tags
            .get(&recipe_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|tag_id| state.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by_key(|tag| tag.id);

        Ok(tags)
    }

    async fn list_cart_recipes(&self, user_id: Id) -> Result<Vec<Id>, CoreError> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|(kind, user, _)| *kind == MembershipKind::ShoppingCart && *user == user_id)
            .map(|(_, _, recipe_id)| *recipe_id)
            .collect())
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        let state = self.state.read().await;
        Ok(state.memberships.contains(&(kind, user_id, target_id)))
    }

    async fn insert_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        if kind.targets_user() && user_id == target_id {
            return Err(CoreError::SelfReferenceNotAllowed);
        }
        if !state.target_exists(kind, target_id) {
            return Err(CoreError::not_found(if kind.targets_user() {
                "Author"
            } else {
                "Recipe"
            }));
        }
        if state.memberships.contains(&(kind, user_id, target_id)) {
            return Ok(false);
        }

        state.memberships.push((kind, user_id, target_id));
        Ok(true)
    }

    async fn delete_membership(
        &self,
        kind: MembershipKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        let before = state.memberships.len();
        state
            .memberships
            .retain(|membership| *membership != (kind, user_id, target_id));

        Ok(state.memberships.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> RecipeFields {
        RecipeFields {
            name: name.to_owned(),
            text: "Mix".to_owned(),
            image: None,
            cooking_time: 10,
        }
    }

    #[tokio::test]
    async fn deleting_a_recipe_drops_its_memberships() {
        let store = MemoryStore::new();
        let author = store.add_user("author").await;
        let flour = store.add_ingredient("flour", "g").await;
        let tag = store.add_tag("Bake", "#E26C2D", "bake").await;
        let recipe = store
            .create_recipe(
                author.id,
                &fields("Bread"),
                &[IngredientAmount {
                    ingredient_id: flour.id,
                    amount: 500,
                }],
                &[tag.id],
            )
            .await
            .unwrap();
        store
            .insert_membership(MembershipKind::ShoppingCart, author.id, recipe)
            .await
            .unwrap();

        assert!(store.delete_recipe(recipe).await.unwrap());
        assert!(store.list_cart_recipes(author.id).await.unwrap().is_empty());
        assert!(store.list_recipe_parts(recipe).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_a_user_cascades() {
        let store = MemoryStore::new();
        let author = store.add_user("author").await;
        let reader = store.add_user("reader").await;
        let tag = store.add_tag("Bake", "#E26C2D", "bake").await;
        let recipe = store
            .create_recipe(author.id, &fields("Bread"), &[], &[tag.id])
            .await
            .unwrap();
        store
            .insert_membership(MembershipKind::Subscribe, reader.id, author.id)
            .await
            .unwrap();
        store
            .insert_membership(MembershipKind::Favorite, reader.id, recipe)
            .await
            .unwrap();

        assert!(store.remove_user(author.id).await);
        assert_eq!(store.get_recipe(recipe).await.unwrap(), None);
        assert!(!store
            .has_membership(MembershipKind::Subscribe, reader.id, author.id)
            .await
            .unwrap());
        assert!(!store
            .has_membership(MembershipKind::Favorite, reader.id, recipe)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn create_rejects_unknown_ingredient_without_writing() {
        let store = MemoryStore::new();
        let author = store.add_user("author").await;

        let result = store
            .create_recipe(
                author.id,
                &fields("Bread"),
                &[IngredientAmount {
                    ingredient_id: 404,
                    amount: 1,
                }],
                &[],
            )
            .await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
        assert!(store.state.read().await.recipes.is_empty());
    }
}
