use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    constants::SUBSCRIPTION_RECIPES_PREVIEW,
    error::{CoreError, QueryError},
    pagination::{PageContext, PageQuery},
    schema::{Author, Id, SubscriptionView, User, UserRole},
    validation::RegisterForm,
};

use super::{fetch_subscriptions, list_author_recipes};

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, CoreError> {
    let row: Option<User> = sqlx::query_as(
        "SELECT id, username, email, first_name, last_name, password, role FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, CoreError> {
    let row: Option<User> = sqlx::query_as(
        "SELECT id, username, email, first_name, last_name, password, role FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_author(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<Author>, CoreError> {
    let row: Option<Author> = sqlx::query_as(
        "SELECT id, username, email, first_name, last_name FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user with the argon2 hash of their password.
pub async fn register_user(form: RegisterForm, pool: &Pool<Postgres>) -> Result<Author, CoreError> {
    let form = form.validate()?;
    let password = hash_password(&form.password)?;

    let row: Option<Author> = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, password, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING RETURNING id, username, email, first_name, last_name;
    ",
    )
    .bind(&form.username)
    .bind(&form.email)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .bind(UserRole::User)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(author) => {
            log::info!("Registered user {}", author.id);
            Ok(author)
        }
        None => Err(CoreError::AlreadyExists(
            "A user with that username or email already exists".to_owned(),
        )),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    secret: &str,
    pool: &Pool<Postgres>,
) -> Result<String, CoreError> {
    let user = get_user_by_email(email, pool)
        .await?
        .filter(|user| verify_password(password, &user.password))
        .ok_or_else(|| CoreError::validation("Invalid credentials"))?;

    generate_jwt_session(&user, secret)
}

/// Subscribed authors with their newest recipes, `recipes_limit` per author.
pub async fn fetch_subscription_views(
    user_id: Id,
    page: PageQuery,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, CoreError> {
    let recipes_limit = recipes_limit
        .filter(|limit| *limit >= 0)
        .unwrap_or(SUBSCRIPTION_RECIPES_PREVIEW);
    let rows = fetch_subscriptions(user_id, page, pool).await?;

    let mut recipes = Vec::with_capacity(rows.results.len());
    for row in &rows.results {
        recipes.push(list_author_recipes(row.id, recipes_limit, pool).await?);
    }

    let mut recipes = recipes.into_iter();
    Ok(rows.map(|row| SubscriptionView {
        id: row.id,
        username: row.username,
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        is_subscribed: true,
        recipes: recipes.next().unwrap_or_default(),
        recipes_count: row.recipes_count,
    }))
}
