pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32000;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32000;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;

pub const INGREDIENT_CSV: &str = "ingredients.csv";
pub const TAG_CSV: &str = "tags.csv";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

pub const SESSION_COOKIE: &str = "session";

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
