use chrono::Duration;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{ApiError, HtmlError, QueryError, ValidationError},
    pagination::PageRequest,
    schema::{Id, User, UserRow},
};

pub async fn get_user_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_or_404(id: Id, pool: &Pool<Postgres>) -> Result<User, potion::Error> {
    get_user_by_id(id, pool)
        .await?
        .ok_or_else(|| ApiError::NotFound.default())
}

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_users(ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<User>, potion::Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Users ordered by id, with the total number of users.
pub async fn fetch_users(
    request: &PageRequest,
    pool: &Pool<Postgres>,
) -> Result<(Vec<User>, i64), potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT *, COUNT(*) OVER() AS count FROM users ORDER BY id LIMIT $1 OFFSET $2",
    )
    .bind(request.limit)
    .bind(request.offset)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let count = match rows.first() {
        Some(row) => row.count,
        None => {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await
                .map_err(|e| QueryError::from(e).into())?;
            count.0
        }
    };

    Ok((rows.into_iter().map(User::from).collect(), count))
}

/// Creates an account with role `user`. The password is hashed before it is stored.
pub async fn register_user(
    email: &str,
    username: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<User, potion::Error> {
    let password = hash_password(password)?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(email)
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    log::info!("Registered user {}", user.username);
    Ok(user)
}

pub async fn set_password(
    user_id: Id,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let user = get_user_or_404(user_id, pool).await?;
    if !verify_password(current_password, &user.password)? {
        return Err(ValidationError::field("current_password", "Invalid password.").into());
    }

    let password = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// Checks the credentials and issues a session token.
pub async fn login_user(
    email: &str,
    password: &str,
    secret: &str,
    lifetime: Duration,
    pool: &Pool<Postgres>,
) -> Result<String, potion::Error> {
    let invalid = || HtmlError::InvalidRequest.new("Unable to log in with provided credentials.");

    let user = get_user_by_email(email, pool).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password)? {
        return Err(invalid());
    }

    log::debug!("> Issuing session for {}", user.username);
    generate_jwt_session(&user, secret, lifetime)
}
