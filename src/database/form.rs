use std::str::FromStr;

use super::{error::TypeError, pagination::PageQuery, schema::Id};

/// Raw query pairs as extracted by `warp::query::<Vec<(String, String)>>()`.
/// Keys may repeat (`?tags=breakfast&tags=lunch`).
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.to_owned())
            .collect()
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            None => Ok(None),
        }
    }

    /// Accepts `1`/`0` and `true`/`false`; a missing key reads as false.
    pub fn get_flag(&self, key: &str) -> Result<bool, TypeError> {
        match self.get_str(key) {
            Some("1") | Some("true") => Ok(true),
            Some("0") | Some("false") | None => Ok(false),
            Some(_) => Err(TypeError::new("Invalid flag value")),
        }
    }
}

/// Filters of the recipe listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<(Self, PageQuery), TypeError> {
        let filter = Self {
            author: form.get_number("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
        };
        let page = PageQuery::new(form.get_number("page")?, form.get_number("limit")?)?;

        Ok((filter, page))
    }
}
