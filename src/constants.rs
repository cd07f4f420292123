pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_LIMIT: i64 = 100;
pub const SUBSCRIPTION_RECIPES_PREVIEW: i64 = 3;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_VALUE: i32 = 1;
pub const MAX_VALUE: i32 = 32000;

pub const NAME_MAX_LENGTH: usize = 200;
pub const UNIT_MAX_LENGTH: usize = 15;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const DEFAULT_FONT_SIZE: f32 = 14.0;
pub const SHOPPING_LIST_FILENAME: &str = "your_shopping_cart.pdf";
pub const SHOPPING_LIST_MIME_TYPE: &str = "application/pdf";

pub const SESSION_LIFETIME_HOURS: i64 = 1;
