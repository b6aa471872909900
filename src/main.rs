use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::fs;

use tag2qr::db::connection::{init_pool, run_migrations};
use tag2qr::settings::Settings;
use tag2qr::{configure, json_config, AppState};

async fn start_server(settings: Settings) -> anyhow::Result<()> {
    let pool = init_pool(&settings.database).context("failed to create database pool")?;
    {
        let mut conn = pool.get().context("failed to connect to database")?;
        let applied = run_migrations(&mut conn)?;
        log::info!("{} pending migration(s) applied", applied);
    }

    for dir in [
        settings.products_folder(),
        settings.store_folder(),
        settings.uploads.qr_folder.clone(),
    ] {
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }

    let bind = (settings.server.host.clone(), settings.server.port);
    let upload_root = settings.uploads.folder.clone();
    let app_state = web::Data::new(AppState::new(pool, settings));

    log::info!("Starting HTTP server on http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .app_data(json_config(&app_state.settings))
            .service(Files::new("/uploads", upload_root.clone()))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("failed to load settings")?;
    start_server(settings).await
}
