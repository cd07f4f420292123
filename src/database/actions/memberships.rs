use sqlx::{Pool, Postgres};

use crate::{
    error::{CoreError, QueryError, Violation},
    pagination::{PageContext, PageQuery},
    schema::{Id, MembershipKind, RecipePart, SubscriptionRow},
};

pub async fn has_membership(
    kind: MembershipKind,
    user_id: Id,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, CoreError> {
    let result: Option<(i32,)> = sqlx::query_as(&format!(
        "SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn insert_membership(
    kind: MembershipKind,
    user_id: Id,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, CoreError> {
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(|e| match QueryError::from(e) {
        e if e.violation() == Some(Violation::ForeignKey) => CoreError::not_found(match kind {
            MembershipKind::Subscribe => "Author",
            _ => "Recipe",
        }),
        e if e.violation() == Some(Violation::Check) => CoreError::SelfReferenceNotAllowed,
        e => CoreError::Storage(e),
    })?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_membership(
    kind: MembershipKind,
    user_id: Id,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, CoreError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.target_column()
    ))
    .bind(user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_cart_recipes(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<Id>, CoreError> {
    let rows: Vec<(Id,)> =
        sqlx::query_as("SELECT recipe_id FROM shopping_carts WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Every ingredient line of every recipe in the user's cart, in one query.
pub async fn list_cart_parts(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, CoreError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        ORDER BY c.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_subscriptions(
    user_id: Id,
    page: PageQuery,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionRow>, CoreError> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.id, u.username, u.email, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(PageContext::from_rows(rows, total_count, page))
}
