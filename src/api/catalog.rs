use warp::{
    http::{Method, StatusCode},
    reply::Response,
};

use crate::{
    actions::{
        create_ingredient as store_ingredient, create_tag as store_tag, get_ingredient_or_404,
        get_tag_or_404, list_ingredients_cached, list_tags_cached,
    },
    context::Context,
    filters::IngredientFilter,
    form::{Form, FormData},
    jwt::SessionData,
    permissions::has_admin_permission,
    schema::Id,
    serialization::catalog::{IngredientPayload, TagPayload},
};

use super::routes::json_response;

// GET /api/tags/
pub async fn list_tags(ctx: Context) -> Result<Response, potion::Error> {
    let tags = list_tags_cached(&ctx.pool, &ctx.cache).await?;
    Ok(json_response(&tags, StatusCode::OK))
}

// GET /api/tags/{id}/
pub async fn tag_detail(id: Id, ctx: Context) -> Result<Response, potion::Error> {
    let tag = get_tag_or_404(id, &ctx.pool).await?;
    Ok(json_response(&tag, StatusCode::OK))
}

// POST /api/tags/
pub async fn create_tag(
    method: Method,
    session: SessionData,
    payload: TagPayload,
    ctx: Context,
) -> Result<Response, potion::Error> {
    has_admin_permission(&method, Some(&session))?;
    let new = payload
        .validate()
        .map_err(|e| -> potion::Error { e.into() })?;
    let tag = store_tag(&new.name, &new.color, &new.slug, &ctx.pool, &ctx.cache).await?;

    log::info!("{} created tag {}", session.username, tag.slug);
    Ok(json_response(&tag, StatusCode::CREATED))
}

// GET /api/ingredients/
pub async fn list_ingredients(data: FormData, ctx: Context) -> Result<Response, potion::Error> {
    let filter = IngredientFilter::from_form(&Form::from_data(data));
    let ingredients = list_ingredients_cached(filter, &ctx.pool, &ctx.cache).await?;
    Ok(json_response(&ingredients, StatusCode::OK))
}

// GET /api/ingredients/{id}/
pub async fn ingredient_detail(id: Id, ctx: Context) -> Result<Response, potion::Error> {
    let ingredient = get_ingredient_or_404(id, &ctx.pool).await?;
    Ok(json_response(&ingredient, StatusCode::OK))
}

// POST /api/ingredients/
pub async fn create_ingredient(
    method: Method,
    session: SessionData,
    payload: IngredientPayload,
    ctx: Context,
) -> Result<Response, potion::Error> {
    has_admin_permission(&method, Some(&session))?;
    let (name, unit) = payload
        .validate()
        .map_err(|e| -> potion::Error { e.into() })?;
    let ingredient = store_ingredient(&name, &unit, &ctx.pool, &ctx.cache).await?;

    log::info!("{} created ingredient {}", session.username, ingredient.name);
    Ok(json_response(&ingredient, StatusCode::CREATED))
}
