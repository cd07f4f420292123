use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::{CoreError, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Tag},
    validation::TagForm,
};

pub async fn create_tag(
    session: &SessionData,
    form: TagForm,
    pool: &Pool<Postgres>,
) -> Result<Tag, CoreError> {
    session.authenticate(ActionType::ManageTags)?;
    let form = form.validate()?;

    let tag: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING id, name, color, slug",
    )
    .bind(&form.name)
    .bind(&form.color)
    .bind(&form.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    tag.ok_or_else(|| CoreError::AlreadyExists(format!("Tag '{}' already exists", form.slug)))
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, CoreError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, CoreError> {
    let tag: Option<Tag> =
        sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, CoreError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn missing_tags(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<Id>, CoreError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();
    Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
}
