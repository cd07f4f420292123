use crate::{
    error::CoreError,
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, MembershipKind, Recipe, RecipeShort, RecipeView},
    store::RecipeStore,
    validation::RecipeForm,
};

use super::{composer::check_associations, membership::is_member};

async fn require_recipe(store: &dyn RecipeStore, id: Id) -> Result<Recipe, CoreError> {
    store
        .get_recipe(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Recipe"))
}

pub async fn create_recipe(
    store: &dyn RecipeStore,
    session: &SessionData,
    form: RecipeForm,
) -> Result<RecipeView, CoreError> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = form.validate()?;
    check_associations(store, &recipe.ingredients, &recipe.tags).await?;

    let id = store
        .create_recipe(
            session.user_id,
            &recipe.fields,
            &recipe.ingredients,
            &recipe.tags,
        )
        .await?;

    log::info!("User {} created recipe {id}", session.user_id);
    recipe_view(store, Some(session), id).await
}

/// Only the author or an admin may edit. A missing image keeps the stored one.
pub async fn update_recipe(
    store: &dyn RecipeStore,
    session: &SessionData,
    id: Id,
    form: RecipeForm,
) -> Result<RecipeView, CoreError> {
    let current = require_recipe(store, id).await?;
    session.authenticate_owner(
        current.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    let recipe = form.validate()?;
    check_associations(store, &recipe.ingredients, &recipe.tags).await?;
    store
        .update_recipe(id, &recipe.fields, &recipe.ingredients, &recipe.tags)
        .await?;

    recipe_view(store, Some(session), id).await
}

pub async fn delete_recipe(
    store: &dyn RecipeStore,
    session: &SessionData,
    id: Id,
) -> Result<(), CoreError> {
    let current = require_recipe(store, id).await?;
    session.authenticate_owner(
        current.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    if !store.delete_recipe(id).await? {
        return Err(CoreError::not_found("Recipe"));
    }

    log::info!("User {} deleted recipe {id}", session.user_id);
    Ok(())
}

/// Membership flags are false for anonymous viewers.
pub async fn recipe_view(
    store: &dyn RecipeStore,
    viewer: Option<&SessionData>,
    id: Id,
) -> Result<RecipeView, CoreError> {
    let recipe = require_recipe(store, id).await?;
    let author = store
        .get_author(recipe.author_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Author"))?;
    let tags = store.list_recipe_tags(id).await?;
    let ingredients = store
        .list_recipe_parts(id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(session) => (
            is_member(store, MembershipKind::Favorite, session.user_id, id).await?,
            is_member(store, MembershipKind::ShoppingCart, session.user_id, id).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn recipe_short(store: &dyn RecipeStore, id: Id) -> Result<RecipeShort, CoreError> {
    Ok(require_recipe(store, id).await?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::MemoryStore,
        membership::add_membership,
        schema::{IngredientAmount, UserRole},
    };

    struct Fixture {
        store: MemoryStore,
        author: SessionData,
        other: SessionData,
        admin: SessionData,
        flour: Id,
        egg: Id,
        tag: Id,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let author = store.add_user("author").await;
        let other = store.add_user("other").await;
        let admin = store.add_user("admin").await;
        let flour = store.add_ingredient("flour", "g").await.id;
        let egg = store.add_ingredient("egg", "pcs").await.id;
        let tag = store.add_tag("Breakfast", "#E26C2D", "breakfast").await.id;

        Fixture {
            store,
            author: SessionData::new(author.id, author.username, UserRole::User),
            other: SessionData::new(other.id, other.username, UserRole::User),
            admin: SessionData::new(admin.id, admin.username, UserRole::Admin),
            flour,
            egg,
            tag,
        }
    }

    fn form(f: &Fixture, ingredients: &[(Id, i32)]) -> RecipeForm {
        RecipeForm {
            ingredients: ingredients
                .iter()
                .map(|(ingredient_id, amount)| IngredientAmount {
                    ingredient_id: *ingredient_id,
                    amount: *amount,
                })
                .collect(),
            tags: vec![f.tag],
            image: None,
            name: "Pancakes".to_owned(),
            text: "Mix and fry".to_owned(),
            cooking_time: 15,
        }
    }

    #[tokio::test]
    async fn create_returns_the_full_view() {
        let f = fixture().await;

        let view = create_recipe(&f.store, &f.author, form(&f, &[(f.flour, 200)]))
            .await
            .unwrap();

        assert_eq!(view.author.id, f.author.user_id);
        assert_eq!(view.ingredients.len(), 1);
        assert_eq!(view.ingredients[0].name, "flour");
        assert_eq!(view.ingredients[0].amount, 200);
        assert_eq!(view.tags.len(), 1);
        assert!(!view.is_favorited);
    }

    #[tokio::test]
    async fn invalid_form_writes_nothing() {
        let f = fixture().await;

        let result = create_recipe(&f.store, &f.author, form(&f, &[(f.flour, 0)])).await;

        assert!(matches!(result, Err(CoreError::ValidationFailed(_))));
        for id in 1..=10 {
            assert!(f.store.get_recipe(id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn only_author_or_admin_may_edit() {
        let f = fixture().await;
        let view = create_recipe(&f.store, &f.author, form(&f, &[(f.flour, 200)]))
            .await
            .unwrap();

        let denied = update_recipe(&f.store, &f.other, view.id, form(&f, &[(f.egg, 2)])).await;
        let edited = update_recipe(&f.store, &f.admin, view.id, form(&f, &[(f.egg, 2)]))
            .await
            .unwrap();

        assert!(matches!(denied, Err(CoreError::PermissionDenied(_))));
        assert_eq!(edited.ingredients[0].name, "egg");
        assert!(matches!(
            delete_recipe(&f.store, &f.other, view.id).await,
            Err(CoreError::PermissionDenied(_))
        ));
        delete_recipe(&f.store, &f.author, view.id).await.unwrap();
        assert!(matches!(
            recipe_view(&f.store, None, view.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn view_flags_follow_the_viewer() {
        let f = fixture().await;
        let view = create_recipe(&f.store, &f.author, form(&f, &[(f.flour, 200)]))
            .await
            .unwrap();
        add_membership(&f.store, MembershipKind::Favorite, f.other.user_id, view.id)
            .await
            .unwrap();

        let own = recipe_view(&f.store, Some(&f.other), view.id).await.unwrap();
        let anonymous = recipe_view(&f.store, None, view.id).await.unwrap();

        assert!(own.is_favorited);
        assert!(!own.is_in_shopping_cart);
        assert!(!anonymous.is_favorited);
        assert_eq!(
            recipe_short(&f.store, view.id).await.unwrap().name,
            "Pancakes"
        );
    }
}
