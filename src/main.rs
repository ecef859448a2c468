use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    http::header,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};
use tracing_subscriber::EnvFilter;

use crate::{
    configs::{RedisCache, connect_database},
    middlewares::authentication,
    modules::{
        conversation::{
            repository_pg::{ConversationPgRepository, ParticipantPgRepository},
            service::ConversationService,
        },
        directory::client::HttpDirectoryClient,
        mention::service::MentionResolver,
        message::{repository_pg::MessagePgRepository, service::MessageService},
        presence::service::PresenceService,
        receipt::service::ReceiptService,
        retention::service::{RetentionConfig, RetentionSweeper},
        search::{repository_pg::SearchPgRepository, service::SearchService},
        storage::service::DiskStorage,
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|err| std::io::Error::other(format!("Migration error: {err}")))?;

    let redis =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let conversation_repo = ConversationPgRepository::new(db_pool.clone());
    let participant_repo = ParticipantPgRepository::new(db_pool.clone());
    let message_repo = MessagePgRepository::new(db_pool.clone());
    let search_repo = SearchPgRepository::new(db_pool.clone());

    let directory = HttpDirectoryClient::from_env()
        .map_err(|_| std::io::Error::other("Directory client error"))?;
    let resolver = Arc::new(MentionResolver::new(Arc::new(directory)));
    let storage = Arc::new(DiskStorage::from_env());

    let conversation_service = ConversationService::with_dependencies(
        Arc::new(conversation_repo.clone()),
        Arc::new(participant_repo.clone()),
        Arc::new(message_repo.clone()),
        resolver.clone(),
    );
    let message_service = MessageService::with_dependencies(
        Arc::new(message_repo.clone()),
        Arc::new(conversation_repo.clone()),
        storage,
        resolver,
    );
    let receipt_service = ReceiptService::with_dependencies(Arc::new(participant_repo));
    let search_service = SearchService::with_dependencies(
        Arc::new(search_repo),
        Arc::new(conversation_repo.clone()),
    );
    let presence_service = PresenceService::new(redis.pool());

    RetentionSweeper::new(
        Arc::new(conversation_repo),
        Arc::new(message_repo),
        RetentionConfig {
            sweep_interval: std::time::Duration::from_secs(ENV.sweep_interval_secs),
            lock_ttl_secs: ENV.sweep_interval_secs * 9 / 10,
        },
    )
    .start(Arc::new(redis.clone()));

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(ENV.frontend_url.as_str())
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(conversation_service.clone()))
            .app_data(web::Data::new(message_service.clone()))
            .app_data(web::Data::new(receipt_service.clone()))
            .app_data(web::Data::new(search_service.clone()))
            .app_data(web::Data::new(presence_service.clone()))
            .service(health_check)
            .service(
                web::scope("/api")
                    .wrap(from_fn(authentication))
                    .configure(modules::conversation::route::configure)
                    .configure(modules::message::route::configure)
                    .configure(modules::receipt::route::configure)
                    .configure(modules::search::route::configure)
                    .configure(modules::presence::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
