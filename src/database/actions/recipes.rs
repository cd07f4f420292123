use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{CoreError, QueryError, Violation},
    form::RecipeFilter,
    pagination::{PageContext, PageQuery},
    schema::{
        Id, IngredientAmount, Recipe, RecipeFields, RecipePart, RecipeRow, RecipeShort, Tag,
    },
};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, CoreError> {
    let row: Option<Recipe> = sqlx::query_as(
        "SELECT id, author_id, name, text, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: PageQuery,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, CoreError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE",
    );

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(filter.tags.clone())
            .push("))");
    }

    // Membership filters only apply to an authenticated viewer
    if let Some(user_id) = viewer {
        if filter.is_favorited {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query
                .push(" AND EXISTS (SELECT 1 FROM shopping_carts c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(PageContext::from_rows(rows, total_count, page))
}

pub async fn list_recipe_parts(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, CoreError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Tag>, CoreError> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn create_recipe(
    author_id: Id,
    fields: &RecipeFields,
    ingredients: &[IngredientAmount],
    tags: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Id, CoreError> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&fields.name)
    .bind(&fields.text)
    .bind(&fields.image)
    .bind(fields.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    write_associations(&mut tr, id.0, ingredients, tags).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Created recipe {} for author {author_id}", id.0);
    Ok(id.0)
}

pub async fn update_recipe(
    id: Id,
    fields: &RecipeFields,
    ingredients: &[IngredientAmount],
    tags: &[Id],
    pool: &Pool<Postgres>,
) -> Result<(), CoreError> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, image = COALESCE($3, image), cooking_time = $4 WHERE id = $5",
    )
    .bind(&fields.name)
    .bind(&fields.text)
    .bind(&fields.image)
    .bind(fields.cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::not_found("Recipe"));
    }

    write_associations(&mut tr, id, ingredients, tags).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

/// Replaces the ingredient and tag rows of a recipe inside one transaction.
/// The recipe row is locked first so concurrent replacements serialize.
pub async fn replace_recipe_associations(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    tags: &[Id],
    pool: &Pool<Postgres>,
) -> Result<(), CoreError> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let locked: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(recipe_id)
        .fetch_optional(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    if locked.is_none() {
        return Err(CoreError::not_found("Recipe"));
    }

    write_associations(&mut tr, recipe_id, ingredients, tags).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

async fn write_associations(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    tags: &[Id],
) -> Result<(), CoreError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    if !ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );

        query_builder.push_values(ingredients.iter(), |mut b, part| {
            b.push_bind(recipe_id)
                .push_bind(part.ingredient_id)
                .push_bind(part.amount);
        });

        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(|e| association_error(e, "ingredient"))?;
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await
        .map_err(QueryError::from)?;

    if !tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tags.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder
            .build()
            .execute(&mut **tr)
            .await
            .map_err(|e| association_error(e, "tag"))?;
    }

    Ok(())
}

fn association_error(error: sqlx::Error, what: &str) -> CoreError {
    let error = QueryError::from(error);
    violation_error(error.violation(), what).unwrap_or_else(|| CoreError::Storage(error))
}

/// Structured error for a constraint violation on a recipe's ingredient or
/// tag rows; `None` when the failure was not a constraint violation.
fn violation_error(violation: Option<Violation>, what: &str) -> Option<CoreError> {
    match violation? {
        Violation::Unique => Some(CoreError::DuplicateAssociation(format!(
            "The same {what} is listed more than once"
        ))),
        Violation::ForeignKey => Some(CoreError::NotFound(format!("Referenced {what} not found"))),
        Violation::Check => Some(CoreError::ValidationFailed(format!("Invalid {what} value"))),
    }
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<bool, CoreError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_author_recipes(
    author_id: Id,
    limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeShort>, CoreError> {
    let rows: Vec<RecipeShort> = sqlx::query_as(
        "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Violation::Unique, "DuplicateAssociation", "The same tag is listed more than once")]
    #[case(Violation::ForeignKey, "NotFound", "Referenced tag not found")]
    #[case(Violation::Check, "ValidationFailed", "Invalid tag value")]
    fn maps_violations(#[case] violation: Violation, #[case] kind: &str, #[case] message: &str) {
        let error = violation_error(Some(violation), "tag").unwrap();

        let (actual_kind, actual_message) = match error {
            CoreError::DuplicateAssociation(m) => ("DuplicateAssociation", m),
            CoreError::NotFound(m) => ("NotFound", m),
            CoreError::ValidationFailed(m) => ("ValidationFailed", m),
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(actual_kind, kind);
        assert_eq!(actual_message, message);
    }

    #[test]
    fn other_failures_stay_storage_errors() {
        assert!(violation_error(None, "ingredient").is_none());
        assert!(matches!(
            association_error(sqlx::Error::RowNotFound, "ingredient"),
            CoreError::Storage(_)
        ));
    }
}
