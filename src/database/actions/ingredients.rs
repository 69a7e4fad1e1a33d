use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    cache::cache::{CacheKeyType, CacheLifetime, RedisValue},
    error::{ApiError, QueryError},
    filters::IngredientFilter,
    schema::{Id, Ingredient, RecipeIngredient},
    Cache,
};

use super::tags::invalidate;

pub async fn list_ingredients(
    filter: &IngredientFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let list: Vec<Ingredient> = match filter.prefix_pattern() {
        Some(pattern) => {
            sqlx::query_as::<_, Ingredient>(
                "SELECT * FROM ingredients WHERE LOWER(name) LIKE $1 ORDER BY name, id",
            )
            .bind(pattern)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await
        }
    }
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

/// Ingredient search served from the cache, keyed by the searched prefix.
pub async fn list_ingredients_cached(
    filter: IngredientFilter,
    pool: &Pool<Postgres>,
    cache: &Cache,
) -> Result<Vec<Ingredient>, potion::Error> {
    let mut conn = match cache.connection().await {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("Cache unavailable, listing ingredients from database: {e:?}");
            return list_ingredients(&filter, pool).await;
        }
    };

    let key = filter
        .name
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let p = pool.clone();
    let f = filter.clone();
    match RedisValue::get_or_list(
        CacheKeyType::Ingredients.new(key),
        &mut conn,
        move || async move { list_ingredients(&f, &p).await },
    )
    .await
    {
        Ok(cached) => Ok(cached.value),
        Err(e) => {
            log::warn!("Cached ingredient lookup failed: {e:?}");
            list_ingredients(&filter, pool).await
        }
    }
}

pub async fn get_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(ingredient)
}

pub async fn get_ingredient_or_404(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Ingredient, potion::Error> {
    get_ingredient(id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound.default())
}

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
    cache: &Cache,
) -> Result<Ingredient, potion::Error> {
    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    invalidate(CacheLifetime::BindIngredientCache, cache).await;
    Ok(ingredient)
}

/// Which of `ids` exist as ingredients.
pub async fn existing_ingredient_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, potion::Error> {
    let list: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

/// Replaces the recipe's ingredient lines with `(ingredient_id, amount)` pairs.
pub async fn set_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[(Id, i32)],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(
        ingredients.iter().take(65535 / 3),
        |mut b, (ingredient_id, amount)| {
            b.push_bind(recipe_id)
                .push_bind(*ingredient_id)
                .push_bind(*amount);
        },
    );

    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}
