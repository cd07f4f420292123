use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{CoreError, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Ingredient},
    validation::IngredientForm,
};

/// Postgres caps bind parameters at 65535 per statement.
const IMPORT_CHUNK_SIZE: usize = 65535 / 2;

pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, CoreError> {
    let rows: Vec<Ingredient> = match name.filter(|name| !name.is_empty()) {
        Some(name) => sqlx::query_as(
            "SELECT id, name, measurement_unit FROM ingredients WHERE name ILIKE $1 ORDER BY name, id",
        )
        .bind(format!("%{}%", escape_like(name)))
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, CoreError> {
    let row: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    session: &SessionData,
    form: IngredientForm,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, CoreError> {
    session.authenticate(ActionType::ManageIngredients)?;
    let form = form.validate()?;

    let row: Option<Ingredient> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id, name, measurement_unit;
    ",
    )
    .bind(&form.name)
    .bind(&form.measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| {
        CoreError::AlreadyExists(format!(
            "Ingredient {} ({}) already exists",
            form.name, form.measurement_unit
        ))
    })
}

/// Inserts every ingredient that is not present yet and returns how many
/// rows were written. Expects validated forms.
pub async fn import_ingredients(
    forms: &[IngredientForm],
    pool: &Pool<Postgres>,
) -> Result<u64, CoreError> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in forms.chunks(IMPORT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk.iter(), |mut b, form| {
            b.push_bind(form.name.as_str())
                .push_bind(form.measurement_unit.as_str());
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;

        inserted += result.rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Imported {inserted} of {} ingredients", forms.len());
    Ok(inserted)
}

pub async fn missing_ingredients(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<Id>, CoreError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();
    Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("flour"), "flour");
    }
}
