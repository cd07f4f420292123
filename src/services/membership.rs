//! Guarded set operations for favorites, the shopping cart and
//! subscriptions.

use crate::{
    error::CoreError,
    schema::{Id, Membership, MembershipKind},
    store::RecipeStore,
};

fn already_member(kind: MembershipKind) -> CoreError {
    CoreError::AlreadyExists(
        match kind {
            MembershipKind::Favorite => "Recipe is already in favorites",
            MembershipKind::ShoppingCart => "Recipe is already in the shopping cart",
            MembershipKind::Subscribe => "You are already subscribed to this author",
        }
        .to_owned(),
    )
}

fn not_member(kind: MembershipKind) -> CoreError {
    CoreError::NotFound(
        match kind {
            MembershipKind::Favorite => "Recipe is not in favorites",
            MembershipKind::ShoppingCart => "Recipe is not in the shopping cart",
            MembershipKind::Subscribe => "You are not subscribed to this author",
        }
        .to_owned(),
    )
}

async fn ensure_target(
    store: &dyn RecipeStore,
    kind: MembershipKind,
    target_id: Id,
) -> Result<(), CoreError> {
    if kind.targets_user() {
        store
            .get_author(target_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Author"))?;
    } else {
        store
            .get_recipe(target_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Recipe"))?;
    }

    Ok(())
}

pub async fn add_membership(
    store: &dyn RecipeStore,
    kind: MembershipKind,
    subject: Id,
    target: Id,
) -> Result<Membership, CoreError> {
    if kind.targets_user() && subject == target {
        return Err(CoreError::SelfReferenceNotAllowed);
    }
    ensure_target(store, kind, target).await?;

    if store.has_membership(kind, subject, target).await? {
        return Err(already_member(kind));
    }
    // A concurrent add may land between the check and the insert
    if !store.insert_membership(kind, subject, target).await? {
        return Err(already_member(kind));
    }

    log::trace!("> Added {kind:?} {subject} -> {target}");
    Ok(Membership::new(kind, subject, target))
}

pub async fn remove_membership(
    store: &dyn RecipeStore,
    kind: MembershipKind,
    subject: Id,
    target: Id,
) -> Result<(), CoreError> {
    ensure_target(store, kind, target).await?;

    if !store.delete_membership(kind, subject, target).await? {
        return Err(not_member(kind));
    }

    log::trace!("> Removed {kind:?} {subject} -> {target}");
    Ok(())
}

pub async fn is_member(
    store: &dyn RecipeStore,
    kind: MembershipKind,
    subject: Id,
    target: Id,
) -> Result<bool, CoreError> {
    store.has_membership(kind, subject, target).await
}
