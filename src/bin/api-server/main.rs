use actix_web::{web, App, HttpServer};
use anyhow::Context;
use foodie_finds::{config::Config, db::Store};

mod api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(true)
        .with_file(false)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("fail to setup logging")?;

    let config = Config::from_env()?;

    // opened before binding so no request sees an unready store
    let store = Store::open(&config.database_url).await?;
    let state = web::Data::new(api::ApiState::new(store));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(api::cors())
            .app_data(state.clone())
            .configure(api::routes)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("fail to bind {}:{}", config.host, config.port))?;

    tracing::info!("Server is running on http://{}:{}", config.host, config.port);
    server.run().await?;
    Ok(())
}
