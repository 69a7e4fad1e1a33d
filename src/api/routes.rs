use std::{convert::Infallible, future::Future};

use serde::{de::DeserializeOwned, Serialize};
use warp::{
    filters::BoxedFilter,
    http::{Method, StatusCode},
    path::FullPath,
    reply::{Reply, Response},
    Filter, Rejection,
};

use crate::{
    constants::MAX_BODY_SIZE,
    context::{with_context, Context},
    error::reject,
    form::FormData,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::{Engagement, Id},
};

use super::{auth, catalog, recipes, rejection::handle_rejection, users};

pub(super) fn json_response<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

pub(super) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

async fn handle<F>(handler: F) -> Result<Response, Rejection>
where
    F: Future<Output = Result<Response, potion::Error>>,
{
    handler.await.map_err(reject)
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn query() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::query::<FormData>()
}

fn recipe_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(query())
        .and(with_possible_session(ctx.clone()))
        .and(warp::path::full())
        .and(with_context(ctx.clone()))
        .and_then(
            |data: FormData, session: Option<SessionData>, path: FullPath, ctx: Context| {
                handle(recipes::list(data, session, path, ctx))
            },
        );

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|session, payload, ctx| handle(recipes::create(session, payload, ctx)));

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|session, ctx| handle(recipes::download_shopping_cart(session, ctx)));

    let detail = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|id, session, ctx| handle(recipes::detail(id, session, ctx)));

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(warp::method())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|id, method: Method, session, payload, ctx| {
            handle(recipes::update(id, method, session, payload, ctx))
        });

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(warp::method())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|id, method: Method, session, ctx| {
            handle(recipes::delete(id, method, session, ctx))
        });

    let favorite = engagement_routes("favorite", Engagement::Favorite, ctx);
    let shopping_cart = engagement_routes("shopping_cart", Engagement::ShoppingCart, ctx);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
        .boxed()
}

/// `POST` and `DELETE /api/recipes/{id}/<segment>/`.
fn engagement_routes(
    segment: &'static str,
    kind: Engagement,
    ctx: &Context,
) -> BoxedFilter<(Response,)> {
    let path = warp::path("api")
        .and(warp::path("recipes"))
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(move |id, session, ctx| handle(recipes::engage(kind, id, session, ctx)));

    let remove = path
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(move |id, session, ctx| handle(recipes::disengage(kind, id, session, ctx)));

    add.or(remove).unify().boxed()
}

fn user_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(query())
        .and(with_possible_session(ctx.clone()))
        .and(warp::path::full())
        .and(with_context(ctx.clone()))
        .and_then(
            |data: FormData, session: Option<SessionData>, path: FullPath, ctx: Context| {
                handle(users::list(data, session, path, ctx))
            },
        );

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|payload, ctx| handle(users::register(payload, ctx)));

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|session, ctx| handle(users::me(session, ctx)));

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|session, payload, ctx| handle(users::set_password(session, payload, ctx)));

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(query())
        .and(with_session(ctx.clone()))
        .and(warp::path::full())
        .and(with_context(ctx.clone()))
        .and_then(
            |data: FormData, session: SessionData, path: FullPath, ctx: Context| {
                handle(users::subscriptions(data, session, path, ctx))
            },
        );

    let detail = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|id, session, ctx| handle(users::detail(id, session, ctx)));

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(query())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|id, data, session, ctx| handle(users::subscribe(id, data, session, ctx)));

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|id, session, ctx| handle(users::unsubscribe(id, session, ctx)));

    list.or(register)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .boxed()
}

fn catalog_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(|ctx| handle(catalog::list_tags(ctx)));

    let tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(|id, ctx| handle(catalog::tag_detail(id, ctx)));

    let create_tag = warp::path!("api" / "tags")
        .and(warp::post())
        .and(warp::method())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|method, session, payload, ctx| {
            handle(catalog::create_tag(method, session, payload, ctx))
        });

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(query())
        .and(with_context(ctx.clone()))
        .and_then(|data, ctx| handle(catalog::list_ingredients(data, ctx)));

    let ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(|id, ctx| handle(catalog::ingredient_detail(id, ctx)));

    let create_ingredient = warp::path!("api" / "ingredients")
        .and(warp::post())
        .and(warp::method())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|method, session, payload, ctx| {
            handle(catalog::create_ingredient(method, session, payload, ctx))
        });

    tags.or(tag)
        .unify()
        .or(create_tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .or(create_ingredient)
        .unify()
        .boxed()
}

fn auth_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(|payload, ctx| handle(auth::login(payload, ctx)));

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(|session, ctx| handle(auth::logout(session, ctx)));

    login.or(logout).unify().boxed()
}

/// Every API route plus the media files, with rejections rendered as JSON.
pub fn routes(ctx: Context) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    let media = warp::path("media")
        .and(warp::fs::dir(ctx.config.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response());

    recipe_routes(&ctx)
        .or(user_routes(&ctx))
        .unify()
        .or(catalog_routes(&ctx))
        .unify()
        .or(auth_routes(&ctx))
        .unify()
        .or(media)
        .unify()
        .recover(handle_rejection)
        .unify()
}
