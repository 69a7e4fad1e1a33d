use std::fmt::Write;

use chrono::{Datelike, NaiveDate};
use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    schema::{Id, ShoppingListEntry, User},
};

/// Ingredient totals over every recipe in the user's shopping cart, grouped by name and unit.
pub async fn aggregate_shopping_cart(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListEntry>, potion::Error> {
    let list: Vec<ShoppingListEntry> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, SUM(ri.amount)::BIGINT AS total
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

pub fn render_shopping_list(user: &User, entries: &[ShoppingListEntry], today: NaiveDate) -> String {
    let full_name = user.full_name();
    let owner = if full_name.is_empty() {
        user.username.as_str()
    } else {
        full_name.as_str()
    };

    let mut list = format!(
        "Shopping list for: {owner}\n\nDate: {}\n\n",
        today.format("%Y-%m-%d")
    );
    for entry in entries {
        let _ = writeln!(
            list,
            "{}  - {}({})",
            entry.name, entry.total, entry.measurement_unit
        );
    }
    let _ = write!(list, "\n Foodgram ({})", today.year());

    list
}

pub fn shopping_list_file_name(username: &str) -> String {
    format!("{username}_shopping_list.txt")
}
