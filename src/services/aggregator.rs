//! Sums the ingredients of every recipe in a user's cart.

use std::collections::HashMap;

use crate::{
    error::CoreError,
    schema::{Id, RecipePart, ShoppingListLine},
    store::RecipeStore,
};

use super::document::{Document, ShoppingListRenderer};

/// Merges parts by ingredient id. Ingredients that share a name but not a
/// unit stay separate lines. Ordered by name, then unit, then id.
pub fn aggregate_parts(parts: Vec<RecipePart>) -> Vec<ShoppingListLine> {
    let mut totals: HashMap<Id, ShoppingListLine> = HashMap::new();

    for part in parts {
        let amount = i64::from(part.amount);
        totals
            .entry(part.ingredient_id)
            .and_modify(|line| line.amount += amount)
            .or_insert_with(|| ShoppingListLine {
                ingredient_id: part.ingredient_id,
                amount,
                name: part.name,
                measurement_unit: part.measurement_unit,
            });
    }

    let mut lines: Vec<ShoppingListLine> = totals.into_values().collect();
    lines.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
            .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
    });

    lines
}

pub async fn shopping_list(
    store: &dyn RecipeStore,
    user_id: Id,
) -> Result<Vec<ShoppingListLine>, CoreError> {
    let parts = store.list_cart_parts(user_id).await?;
    Ok(aggregate_parts(parts))
}

pub async fn aggregate_shopping_list(
    store: &dyn RecipeStore,
    renderer: &ShoppingListRenderer,
    user_id: Id,
) -> Result<Document, CoreError> {
    let lines = shopping_list(store, user_id).await?;
    log::trace!("> Rendering {} shopping list lines for user {user_id}", lines.len());

    renderer.render_async(lines).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::MemoryStore,
        schema::{IngredientAmount, MembershipKind, RecipeFields},
    };

    async fn recipe_in_cart(
        store: &MemoryStore,
        user_id: Id,
        tag_id: Id,
        parts: &[(Id, i32)],
    ) -> Id {
        let parts: Vec<IngredientAmount> = parts
            .iter()
            .map(|(ingredient_id, amount)| IngredientAmount {
                ingredient_id: *ingredient_id,
                amount: *amount,
            })
            .collect();
        let recipe = store
            .create_recipe(
                user_id,
                &RecipeFields {
                    name: "Bread".to_owned(),
                    text: "Bake".to_owned(),
                    image: None,
                    cooking_time: 60,
                },
                &parts,
                &[tag_id],
            )
            .await
            .unwrap();
        store
            .insert_membership(MembershipKind::ShoppingCart, user_id, recipe)
            .await
            .unwrap();

        recipe
    }

    #[tokio::test]
    async fn sums_the_same_ingredient_across_recipes() {
        let store = MemoryStore::new();
        let user = store.add_user("cook").await;
        let tag = store.add_tag("Bake", "#E26C2D", "bake").await;
        let flour = store.add_ingredient("flour", "g").await;
        let salt = store.add_ingredient("salt", "g").await;
        recipe_in_cart(&store, user.id, tag.id, &[(flour.id, 200), (salt.id, 5)]).await;
        recipe_in_cart(&store, user.id, tag.id, &[(flour.id, 300)]).await;

        let lines = shopping_list(&store, user.id).await.unwrap();
        let text: Vec<String> = lines.iter().map(ToString::to_string).collect();

        assert_eq!(text, vec!["flour: 500 g", "salt: 5 g"]);
    }

    #[tokio::test]
    async fn same_name_with_other_unit_stays_apart() {
        let store = MemoryStore::new();
        let user = store.add_user("cook").await;
        let tag = store.add_tag("Bake", "#E26C2D", "bake").await;
        let grams = store.add_ingredient("sugar", "g").await;
        let spoons = store.add_ingredient("sugar", "tbsp").await;
        recipe_in_cart(&store, user.id, tag.id, &[(grams.id, 100)]).await;
        recipe_in_cart(&store, user.id, tag.id, &[(spoons.id, 2)]).await;

        let lines = shopping_list(&store, user.id).await.unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].to_string(), "sugar: 100 g");
        assert_eq!(lines[1].to_string(), "sugar: 2 tbsp");
    }

    #[test]
    fn sums_beyond_the_per_line_bound() {
        let parts = (0..3)
            .map(|recipe_id| RecipePart {
                recipe_id,
                ingredient_id: 7,
                name: "water".to_owned(),
                measurement_unit: "ml".to_owned(),
                amount: 32000,
            })
            .collect();

        let lines = aggregate_parts(parts);

        assert_eq!(lines[0].amount, 96000);
    }

    #[tokio::test]
    async fn empty_cart_renders_a_valid_document() {
        let store = MemoryStore::new();
        let user = store.add_user("cook").await;
        let renderer = ShoppingListRenderer::new(None, 14.0).unwrap();

        let document = aggregate_shopping_list(&store, &renderer, user.id)
            .await
            .unwrap();

        assert!(document.bytes.starts_with(b"%PDF"));
        assert_eq!(document.filename, "your_shopping_cart.pdf");
    }
}
