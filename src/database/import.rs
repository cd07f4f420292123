//! Ingredient import files: a JSON array of
//! `{"name": ..., "measurement_unit": ...}` objects, or headerless CSV rows
//! of `name,measurement_unit`.

use std::{fs, path::Path};

use sqlx::{Pool, Postgres};

use crate::{actions::import_ingredients, error::CoreError, validation::IngredientForm};

pub fn parse_json(data: &str) -> Result<Vec<IngredientForm>, CoreError> {
    let forms: Vec<IngredientForm> = serde_json::from_str(data)
        .map_err(|e| CoreError::ValidationFailed(format!("Invalid ingredient file: {e}")))?;

    forms.into_iter().map(IngredientForm::validate).collect()
}

pub fn parse_csv(data: &str) -> Result<Vec<IngredientForm>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut forms = vec![];
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| CoreError::ValidationFailed(format!("Invalid ingredient file: {e}")))?;

        match (record.get(0), record.get(1)) {
            (Some(name), Some(unit)) => forms.push(
                IngredientForm {
                    name: name.to_owned(),
                    measurement_unit: unit.to_owned(),
                }
                .validate()?,
            ),
            _ => {
                return Err(CoreError::ValidationFailed(format!(
                    "Line {} needs a name and a measurement unit",
                    line + 1
                )))
            }
        }
    }

    Ok(forms)
}

/// Picks the parser from the file extension.
pub fn read_ingredient_file(path: &Path) -> Result<Vec<IngredientForm>, CoreError> {
    let data = fs::read_to_string(path).map_err(|e| {
        CoreError::ValidationFailed(format!("Could not read {}: {e}", path.display()))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&data),
        Some("csv") => parse_csv(&data),
        _ => Err(CoreError::validation(
            "Unsupported file format, use a JSON or CSV file",
        )),
    }
}

pub async fn import_ingredient_file(path: &Path, pool: &Pool<Postgres>) -> Result<u64, CoreError> {
    let forms = read_ingredient_file(path)?;
    import_ingredients(&forms, pool).await
}
