//! Shared scaffolding for the pipeline integration tests.
use log::info;
use o2c_engine::SqliteDatabase;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_url() -> String {
    format!("sqlite://{}/o2c_test_store_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

/// Creates a scratch database with the schema applied and returns a handle to it.
pub async fn setup_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_url();
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}
