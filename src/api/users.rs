use warp::{http::StatusCode, path::FullPath, reply::Response};

use crate::{
    actions::{
        count_subscriptions, fetch_subscriptions, fetch_users, follow_author, get_user_or_404,
        register_user, set_password as store_password, unfollow_author,
    },
    constants::USER_COUNT_PER_PAGE,
    context::Context,
    error::HtmlError,
    form::{Form, FormData},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    permissions::ActionType,
    schema::Id,
    serialization::users::{
        represent_subscriptions, represent_user, represent_users, CreatedUser, RegisterPayload,
        SetPasswordPayload,
    },
};

use super::routes::{json_response, no_content};

fn recipes_limit(form: &Form) -> Result<Option<usize>, potion::Error> {
    form.get_number::<usize>("recipes_limit")
}

// GET /api/users/
pub async fn list(
    data: FormData,
    session: Option<SessionData>,
    path: FullPath,
    ctx: Context,
) -> Result<Response, potion::Error> {
    let form = Form::from_data(data);
    let request = PageRequest::limit_offset(&form, USER_COUNT_PER_PAGE)?;

    let (users, count) = fetch_users(&request, &ctx.pool).await?;
    let results = represent_users(&users, session.as_ref(), &ctx).await?;
    let page = Page::from_rows(results, count, &request, path.as_str(), &form);

    Ok(json_response(&page, StatusCode::OK))
}

// POST /api/users/
pub async fn register(payload: RegisterPayload, ctx: Context) -> Result<Response, potion::Error> {
    let new = payload
        .validate()
        .map_err(|e| -> potion::Error { e.into() })?;
    let user = register_user(
        &new.email,
        &new.username,
        &new.first_name,
        &new.last_name,
        &new.password,
        &ctx.pool,
    )
    .await?;

    Ok(json_response(&CreatedUser::from(&user), StatusCode::CREATED))
}

// GET /api/users/me/
pub async fn me(session: SessionData, ctx: Context) -> Result<Response, potion::Error> {
    let user = get_user_or_404(session.user_id, &ctx.pool).await?;
    let read = represent_user(&user, Some(&session), &ctx).await?;

    Ok(json_response(&read, StatusCode::OK))
}

// GET /api/users/{id}/
pub async fn detail(
    id: Id,
    session: Option<SessionData>,
    ctx: Context,
) -> Result<Response, potion::Error> {
    let user = get_user_or_404(id, &ctx.pool).await?;
    let read = represent_user(&user, session.as_ref(), &ctx).await?;

    Ok(json_response(&read, StatusCode::OK))
}

// POST /api/users/set_password/
pub async fn set_password(
    session: SessionData,
    payload: SetPasswordPayload,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnAccount)?;
    let (current, new) = payload
        .validate()
        .map_err(|e| -> potion::Error { e.into() })?;
    store_password(session.user_id, &current, &new, &ctx.pool).await?;

    log::info!("{} changed their password", session.username);
    Ok(no_content())
}

// GET /api/users/subscriptions/
pub async fn subscriptions(
    data: FormData,
    session: SessionData,
    path: FullPath,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    if count_subscriptions(session.user_id, &ctx.pool).await? == 0 {
        return Err(HtmlError::InvalidRequest.new("You have no subscriptions."));
    }

    let form = Form::from_data(data);
    let request = PageRequest::limit_offset(&form, USER_COUNT_PER_PAGE)?;
    let recipes_limit = recipes_limit(&form)?;

    let (authors, count) = fetch_subscriptions(session.user_id, &request, &ctx.pool).await?;

    let results = represent_subscriptions(&authors, recipes_limit, &session, &ctx).await?;
    let page = Page::from_rows(results, count, &request, path.as_str(), &form);

    Ok(json_response(&page, StatusCode::OK))
}

// POST /api/users/{id}/subscribe/
pub async fn subscribe(
    id: Id,
    data: FormData,
    session: SessionData,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = recipes_limit(&Form::from_data(data))?;
    let author = get_user_or_404(id, &ctx.pool).await?;
    follow_author(session.user_id, &author, &ctx.pool).await?;

    let mut read =
        represent_subscriptions(std::slice::from_ref(&author), recipes_limit, &session, &ctx)
            .await?;
    match read.pop() {
        Some(read) => Ok(json_response(&read, StatusCode::CREATED)),
        None => Err(HtmlError::InternalServerError.default()),
    }
}

// DELETE /api/users/{id}/subscribe/
pub async fn unsubscribe(
    id: Id,
    session: SessionData,
    ctx: Context,
) -> Result<Response, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let author = get_user_or_404(id, &ctx.pool).await?;
    unfollow_author(session.user_id, &author, &ctx.pool).await?;

    Ok(no_content())
}
