use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use o2c_engine::{broker::InMemoryBroker, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        NewProductRoute,
        OrderByIdRoute,
        OrdersRoute,
        ProductByIdRoute,
        ProductsRoute,
        RepublishOrderRoute,
        SubmitOrderRoute,
    },
    workers::PipelineWorkers,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (broker, queue) = InMemoryBroker::channel(config.pipeline.queue_buffer_size);
    let workers = PipelineWorkers::start(db.clone(), broker.clone(), queue, &config).await;
    let srv = create_server_instance(&config, db, broker)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    // The HTTP surface is gone; let the pipeline finish its in-flight work before exiting.
    workers.shutdown().await;
    result
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: SqliteDatabase,
    broker: InMemoryBroker,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("o2c::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(broker.clone()))
            .service(health)
            .service(SubmitOrderRoute::<SqliteDatabase, InMemoryBroker>::new())
            .service(OrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(RepublishOrderRoute::<SqliteDatabase, InMemoryBroker>::new())
            .service(NewProductRoute::<SqliteDatabase>::new())
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
