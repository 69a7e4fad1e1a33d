use chrono::Local;
use warp::{
    http::{Method, StatusCode},
    path::FullPath,
    reply::{Reply, Response},
};

use crate::{
    actions::{
        add_engagement, delete_recipe, fetch_recipes, get_recipe_mut, get_recipe_or_404,
        get_user_or_404, remove_engagement,
    },
    constants::RECIPE_COUNT_PER_PAGE,
    context::Context,
    error::HtmlError,
    filters::RecipeFilter,
    form::{Form, FormData},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    permissions::ActionType,
    schema::{Engagement, Id},
    serialization::recipes::{represent_recipe, represent_recipes, RecipePayload, RecipeShort},
    shopping_list::{aggregate_shopping_cart, render_shopping_list, shopping_list_file_name},
};

use super::routes::{json_response, no_content};

// GET /api/recipes/
pub async fn list(
    data: FormData,
    session: Option<SessionData>,
    path: FullPath,
    ctx: Context,
) -> Result<Response, potion::Error> {
    let form = Form::from_data(data);
    let filter = RecipeFilter::from_form(&form)?;
    let request = PageRequest::page_number(&form, RECIPE_COUNT_PER_PAGE)?;

    let caller = session.as_ref().map(|session| session.user_id);
    let (recipes, count) = fetch_recipes(&filter, caller, &request, &ctx.pool).await?;
    request.check_rows(recipes.len())?;

    let results = represent_recipes(&recipes, session.as_ref(), &ctx).await?;
    let page = Page::from_rows(results, count, &request, path.as_str(), &form);

    Ok(json_response(&page, StatusCode::OK))
}

// POST /api/recipes/
pub async fn create(
    session: SessionData,
    payload: RecipePayload,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    let recipe = payload
        .into_new_recipe()
        .map_err(|e| -> potion::Error { e.into() })?
        .create(session.user_id, &ctx)
        .await?;

    let read = represent_recipe(&recipe, Some(&session), &ctx).await?;
    Ok(json_response(&read, StatusCode::CREATED))
}

// GET /api/recipes/{id}/
pub async fn detail(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, potion::Error> {
    let recipe = get_recipe_or_404(id, &ctx.pool).await?;
    let read = represent_recipe(&recipe, session.as_ref(), &ctx).await?;

    Ok(json_response(&read, StatusCode::OK))
}

// PATCH /api/recipes/{id}/
pub async fn update(
    id: Id,
    method: Method,
    session: SessionData,
    payload: RecipePayload,
    ctx: Context,
) -> Result<Response, potion::Error> {
    let recipe = get_recipe_mut(id, &method, &session, &ctx.pool).await?;
    let recipe = payload
        .into_changes()
        .map_err(|e| -> potion::Error { e.into() })?
        .apply(&recipe, &ctx)
        .await?;

    let read = represent_recipe(&recipe, Some(&session), &ctx).await?;
    Ok(json_response(&read, StatusCode::OK))
}

// DELETE /api/recipes/{id}/
pub async fn delete(
    id: Id,
    method: Method,
    session: SessionData,
    ctx: Context,
) -> Result<Response, potion::Error> {
    let recipe = get_recipe_mut(id, &method, &session, &ctx.pool).await?;
    delete_recipe(recipe.id, &ctx.pool).await?;
    ctx.images().remove(&recipe.image).await;

    log::info!("{} deleted recipe {}", session.username, recipe.id);
    Ok(no_content())
}

// POST /api/recipes/{id}/favorite/ and /api/recipes/{id}/shopping_cart/
pub async fn engage(
    kind: Engagement,
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnEngagements)?;
    let recipe = get_recipe_or_404(id, &ctx.pool).await?;
    add_engagement(kind, session.user_id, &recipe, &ctx.pool).await?;

    let short = RecipeShort::from_recipe(&recipe, &ctx.config);
    Ok(json_response(&short, StatusCode::CREATED))
}

// DELETE /api/recipes/{id}/favorite/ and /api/recipes/{id}/shopping_cart/
pub async fn disengage(
    kind: Engagement,
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnEngagements)?;
    let recipe = get_recipe_or_404(id, &ctx.pool).await?;
    remove_engagement(kind, session.user_id, &recipe, &ctx.pool).await?;

    Ok(no_content())
}

// GET /api/recipes/download_shopping_cart/
pub async fn download_shopping_cart(
    session: SessionData,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnEngagements)?;
    let entries = aggregate_shopping_cart(session.user_id, &ctx.pool).await?;
    if entries.is_empty() {
        return Err(HtmlError::InvalidRequest.new("Shopping cart is empty"));
    }

    let user = get_user_or_404(session.user_id, &ctx.pool).await?;
    let list = render_shopping_list(&user, &entries, Local::now().date_naive());

    let reply = warp::reply::with_header(list, "Content-Type", "text/plain; charset=utf-8");
    let reply = warp::reply::with_header(
        reply,
        "Content-Disposition",
        format!(
            "attachment; filename={}",
            shopping_list_file_name(&user.username)
        ),
    );
    Ok(reply.into_response())
}
