use actix_web::{middleware, web, App, HttpServer};

use devlink::core::db::{seed_demo_data, Store};
use devlink::{config, handle, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let store = match config::db_path() {
        Some(path) => Store::open(path)?,
        None => Store::in_memory(),
    };

    if config::seed_demo() {
        seed_demo_data(&store)?;
    }

    let data = web::Data::new(AppState {
        store: store.clone(),
    });

    let port = config::server_port();
    log::info!("devlink API listening on http://0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .default_service(web::route().to(handle))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    store.flush()?;
    Ok(())
}
