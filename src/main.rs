use foodgram::{routes, Cache, Config, Context};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database migrated");

    let cache = Cache::open(&config.redis_url).map_err(|e| format!("{e:?}"))?;

    let address = config.bind_address;
    let ctx = Context::new(pool, cache, config);

    log::info!("Listening on {address}");
    warp::serve(routes(ctx).with(warp::log("foodgram")))
        .run(address)
        .await;

    Ok(())
}
