use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    error::{HtmlError, QueryError},
    schema::{Engagement, Id, Recipe},
};

/// Adds the recipe to the user's favorites or shopping cart. A second add is a 400.
pub async fn add_engagement(
    kind: Engagement,
    user_id: Id,
    recipe: &Recipe,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let query = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if query.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Recipe {} is already in {}.",
            recipe.name,
            kind.label()
        )));
    }
    Ok(())
}

pub async fn remove_engagement(
    kind: Engagement,
    user_id: Id,
    recipe: &Recipe,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    if query.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Recipe {} is not in {}.",
            recipe.name,
            kind.label()
        )));
    }
    Ok(())
}

/// Which of `recipe_ids` the user has engaged with.
pub async fn engaged_recipe_ids(
    kind: Engagement,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
