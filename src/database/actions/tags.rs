use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    cache::cache::{CacheKeyType, CacheLifetime, RedisValue},
    error::{ApiError, QueryError},
    schema::{Id, LinkedRecipeTag, Tag},
    Cache,
};

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

/// Tag list served from the cache. Cache failures fall back to the database.
pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: &Cache,
) -> Result<Vec<Tag>, potion::Error> {
    let mut conn = match cache.connection().await {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("Cache unavailable, listing tags from database: {e:?}");
            return list_tags(pool).await;
        }
    };

    let p = pool.clone();
    match RedisValue::get_or_list(CacheKeyType::Tags.new("all"), &mut conn, move || async move {
        list_tags(&p).await
    })
    .await
    {
        Ok(cached) => Ok(cached.value),
        Err(e) => {
            log::warn!("Cached tag lookup failed: {e:?}");
            list_tags(pool).await
        }
    }
}

/// The subset of `slugs` that name an existing tag.
pub async fn known_tag_slugs(
    slugs: &[String],
    pool: &Pool<Postgres>,
) -> Result<HashSet<String>, potion::Error> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT slug FROM tags WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows.into_iter().map(|(slug,)| slug).collect())
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(tag)
}

pub async fn get_tag_or_404(id: Id, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    get_tag(id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound.default())
}

pub async fn create_tag(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
    cache: &Cache,
) -> Result<Tag, potion::Error> {
    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(name)
            .bind(color)
            .bind(slug)
            .fetch_one(pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    invalidate(CacheLifetime::BindTagCache, cache).await;
    Ok(tag)
}

/// Rotates a catalog binding. Failure only leaves stale entries until the next rotation.
pub(super) async fn invalidate(lifetime: CacheLifetime, cache: &Cache) {
    let result = match cache.connection().await {
        Ok(mut conn) => lifetime.invalidate(&mut conn).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        log::error!("Failed to invalidate {lifetime:?}: {e:?}");
    }
}

/// Which of `ids` exist as tags.
pub async fn existing_tag_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, potion::Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

/// Replaces the recipe's tag set.
pub async fn set_recipe_tags(
    recipe_id: Id,
    tag_ids: &[Id],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(tag_ids.iter().take(65535 / 2), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}
