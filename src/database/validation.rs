//! Request validation. Everything the services receive has passed through
//! here first; the services never re-check ranges or lengths.

use serde::Deserialize;

use crate::{
    constants::{
        EMAIL_MAX_LENGTH, MAX_VALUE, MIN_COOKING_TIME, MIN_VALUE, NAME_MAX_LENGTH,
        UNIT_MAX_LENGTH, USERNAME_MAX_LENGTH,
    },
    error::CoreError,
    schema::{Id, IngredientAmount, RecipeFields},
};

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeForm {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
    #[serde(default)]
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

/// A recipe payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecipe {
    pub fields: RecipeFields,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
}

impl RecipeForm {
    pub fn validate(self) -> Result<ValidRecipe, CoreError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(CoreError::validation("Recipe name must not be empty"));
        }
        if name.chars().count() > NAME_MAX_LENGTH {
            return Err(CoreError::ValidationFailed(format!(
                "Recipe name must be at most {NAME_MAX_LENGTH} characters"
            )));
        }
        if self.text.trim().is_empty() {
            return Err(CoreError::validation("Recipe description must not be empty"));
        }
        if self.cooking_time < MIN_COOKING_TIME {
            return Err(CoreError::ValidationFailed(format!(
                "Cooking time must be at least {MIN_COOKING_TIME}"
            )));
        }
        if self.ingredients.is_empty() {
            return Err(CoreError::validation(
                "A recipe needs at least one ingredient",
            ));
        }
        if self.tags.is_empty() {
            return Err(CoreError::validation("A recipe needs at least one tag"));
        }
        if let Some(part) = self
            .ingredients
            .iter()
            .find(|part| part.amount < MIN_VALUE || part.amount > MAX_VALUE)
        {
            return Err(CoreError::ValidationFailed(format!(
                "Amount of ingredient {} must be between {MIN_VALUE} and {MAX_VALUE}",
                part.ingredient_id
            )));
        }

        Ok(ValidRecipe {
            fields: RecipeFields {
                name,
                text: self.text,
                image: self.image.filter(|image| !image.is_empty()),
                cooking_time: self.cooking_time,
            },
            ingredients: self.ingredients,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagForm {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagForm {
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.name.trim().is_empty() || self.name.chars().count() > NAME_MAX_LENGTH {
            return Err(CoreError::validation("Invalid tag name"));
        }
        if !is_hex_color(&self.color) {
            return Err(CoreError::validation(
                "Tag color must be a hex code such as #E26C2D",
            ));
        }
        if !is_slug(&self.slug) {
            return Err(CoreError::validation(
                "Tag slug may only contain letters, digits, '-' and '_'",
            ));
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientForm {
    pub fn validate(self) -> Result<Self, CoreError> {
        let name = self.name.trim();
        let unit = self.measurement_unit.trim();

        if name.is_empty() || name.chars().count() > NAME_MAX_LENGTH {
            return Err(CoreError::validation("Invalid ingredient name"));
        }
        if unit.is_empty() || unit.chars().count() > UNIT_MAX_LENGTH {
            return Err(CoreError::validation("Invalid measurement unit"));
        }

        Ok(Self {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.username.is_empty()
            || self.username.chars().count() > USERNAME_MAX_LENGTH
            || !self
                .username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
        {
            return Err(CoreError::validation("Invalid username"));
        }
        if self.email.chars().count() > EMAIL_MAX_LENGTH || !is_email(&self.email) {
            return Err(CoreError::validation("Invalid email"));
        }
        for name in [&self.first_name, &self.last_name] {
            if name.chars().count() > USERNAME_MAX_LENGTH {
                return Err(CoreError::ValidationFailed(format!(
                    "Names must be at most {USERNAME_MAX_LENGTH} characters"
                )));
            }
        }
        if self.password.len() < 8 {
            return Err(CoreError::validation(
                "Password must be at least 8 characters",
            ));
        }

        Ok(self)
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= NAME_MAX_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn form() -> RecipeForm {
        RecipeForm {
            ingredients: vec![IngredientAmount {
                ingredient_id: 1,
                amount: 150,
            }],
            tags: vec![1],
            image: None,
            name: "Pancakes".to_owned(),
            text: "Mix and fry".to_owned(),
            cooking_time: 5,
        }
    }

    #[test]
    fn accepts_a_complete_recipe() {
        let valid = form().validate().unwrap();

        assert_eq!(valid.fields.name, "Pancakes");
        assert_eq!(valid.ingredients.len(), 1);
        assert_eq!(valid.tags, vec![1]);
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    #[case(MAX_VALUE + 1)]
    fn rejects_out_of_range_amounts(#[case] amount: i32) {
        let mut form = form();
        form.ingredients[0].amount = amount;

        assert!(matches!(
            form.validate(),
            Err(CoreError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_empty_collections() {
        let mut no_ingredients = form();
        no_ingredients.ingredients.clear();
        let mut no_tags = form();
        no_tags.tags.clear();

        assert!(matches!(
            no_ingredients.validate(),
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(matches!(
            no_tags.validate(),
            Err(CoreError::ValidationFailed(_))
        ));
    }

    #[test]
    fn rejects_short_cooking_time() {
        let mut form = form();
        form.cooking_time = MIN_COOKING_TIME - 1;

        assert!(matches!(
            form.validate(),
            Err(CoreError::ValidationFailed(_))
        ));
    }

    #[rstest]
    #[case("#E26C2D", "breakfast", true)]
    #[case("E26C2D", "breakfast", false)]
    #[case("#E26C2", "breakfast", false)]
    #[case("#GGGGGG", "breakfast", false)]
    #[case("#49B64E", "late dinner", false)]
    fn checks_tag_color_and_slug(#[case] color: &str, #[case] slug: &str, #[case] ok: bool) {
        let tag = TagForm {
            name: "Breakfast".to_owned(),
            color: color.to_owned(),
            slug: slug.to_owned(),
        };

        assert_eq!(tag.validate().is_ok(), ok);
    }

    #[test]
    fn trims_ingredient_fields() {
        let form = IngredientForm {
            name: "  flour ".to_owned(),
            measurement_unit: " g".to_owned(),
        }
        .validate()
        .unwrap();

        assert_eq!(form.name, "flour");
        assert_eq!(form.measurement_unit, "g");
    }

    fn register(first_name: &str, last_name: &str) -> RegisterForm {
        RegisterForm {
            email: "cook@example.com".to_owned(),
            username: "cook".to_owned(),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            password: "long enough".to_owned(),
        }
    }

    #[rstest]
    #[case("Mary Jane", "Watson")]
    #[case("Jean-Luc", "Picard")]
    #[case("Conan", "O'Brien")]
    #[case("Анна", "Каренина")]
    fn accepts_real_world_names(#[case] first_name: &str, #[case] last_name: &str) {
        assert!(register(first_name, last_name).validate().is_ok());
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(USERNAME_MAX_LENGTH + 1);

        assert!(matches!(
            register(&long, "Watson").validate(),
            Err(CoreError::ValidationFailed(_))
        ));
        assert!(matches!(
            register("Mary", &long).validate(),
            Err(CoreError::ValidationFailed(_))
        ));
    }
}
