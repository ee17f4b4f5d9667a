use actix_web::{middleware::Logger, App, HttpServer};
use env_logger::Env;
use log::{error, info};
use release_calendar::config::Config;
use release_calendar::database::SessionDb;
use release_calendar::state::AppState;
use release_calendar::{identity_service, pages, routes, seed};
use std::io;

fn open_db(config: &Config) -> sled::Result<sled::Db> {
    match &config.db_path {
        Some(path) => sled::open(path),
        None => sled::Config::new().temporary(true).open(),
    }
}

fn other_error<E: std::fmt::Display>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_rt::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(
        Env::default().default_filter_or("release_calendar=debug,actix_web=info"),
    )
    .init();

    let config = Config::load().map_err(|err| {
        error!("{}", err);
        other_error(err)
    })?;
    let db = open_db(&config).map_err(other_error)?;
    let purged = db.purge_expired_sessions().map_err(other_error)?;
    if purged > 0 {
        info!("purged {} expired sessions", purged);
    }
    if config.seed {
        seed::seed_events(&db, chrono::Utc::now()).map_err(other_error)?;
    }

    // Fail fast on template errors; workers parse their own copy below.
    tera::Tera::new(&config.templates).map_err(other_error)?;

    let bind = config.bind.clone();
    let state = AppState::new(db, config);
    info!("listening on {}", bind);

    HttpServer::new(move || {
        let tera = match tera::Tera::new(&state.config.templates) {
            Ok(tera) => tera,
            Err(err) => {
                error!("failed to load templates: {}", err);
                tera::Tera::default()
            }
        };
        App::new()
            .wrap(Logger::default())
            .wrap(identity_service(
                &state.config.cookie_key,
                state.config.secure_cookies,
            ))
            .data(tera)
            .data(state.clone())
            .configure(routes::configure)
            .configure(pages::configure)
    })
    .bind(bind)?
    .run()
    .await
}
