pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 480;

pub const MIN_INGREDIENT_AMOUNT: i64 = 1;
pub const MAX_INGREDIENT_AMOUNT: i64 = 3000;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const RECIPE_NAME_SYMBOLS: &[char] = &['-', ',', '.', '(', ')', '!', '\'', '"', ':'];

pub const TAG_NAME_MAX_LENGTH: usize = 50;
pub const TAG_SLUG_MAX_LENGTH: usize = 100;

pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 200;

pub const EMAIL_MAX_LENGTH: usize = 254;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const USERNAME_SYMBOLS: &[char] = &['.', '@', '+', '-', '_'];
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Upper bound for JSON request bodies, which carry base64 images.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

pub const RECIPE_IMAGE_DIRECTORY: &str = "recipes";

pub const TAG_CACHE_BIND: &str = "tag-cache-key";
pub const INGREDIENT_CACHE_BIND: &str = "ingredient-cache-key";
pub const REVOKED_SESSION_PREFIX: &str = "revoked-session";
