//! Replaces the ingredient and tag associations of a recipe as one unit.

use std::collections::HashSet;

use crate::{
    error::CoreError,
    schema::{Id, IngredientAmount, Recipe},
    store::RecipeStore,
};

/// Rejects duplicate and unknown references before anything is written.
pub async fn check_associations(
    store: &dyn RecipeStore,
    ingredients: &[IngredientAmount],
    tags: &[Id],
) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    if let Some(part) = ingredients
        .iter()
        .find(|part| !seen.insert(part.ingredient_id))
    {
        return Err(CoreError::DuplicateAssociation(format!(
            "Ingredient {} is listed more than once",
            part.ingredient_id
        )));
    }

    let mut seen = HashSet::new();
    if let Some(tag_id) = tags.iter().find(|tag_id| !seen.insert(**tag_id)) {
        return Err(CoreError::DuplicateAssociation(format!(
            "Tag {tag_id} is listed more than once"
        )));
    }

    let ids: Vec<Id> = ingredients.iter().map(|part| part.ingredient_id).collect();
    if let Some(id) = store.missing_ingredients(&ids).await?.first() {
        return Err(CoreError::NotFound(format!("Ingredient {id} not found")));
    }
    if let Some(id) = store.missing_tags(tags).await?.first() {
        return Err(CoreError::NotFound(format!("Tag {id} not found")));
    }

    Ok(())
}

/// Afterwards the recipe carries exactly `ingredients` and `tags`. On any
/// error the previous associations are left untouched.
pub async fn replace_recipe_associations(
    store: &dyn RecipeStore,
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    tags: &[Id],
) -> Result<Recipe, CoreError> {
    let recipe = store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Recipe"))?;

    check_associations(store, ingredients, tags).await?;
    store
        .replace_associations(recipe_id, ingredients, tags)
        .await?;

    log::trace!(
        "> Replaced associations of recipe {recipe_id}: {} ingredients, {} tags",
        ingredients.len(),
        tags.len()
    );
    Ok(recipe)
}
