pub mod backup;
pub mod queries;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

pub use queries::categories::Category;
pub use queries::questions::{NewQuestion, Question};

use sqlx::Error;

pub async fn establish_connection(options: SqliteConnectOptions) -> Result<SqlitePool, Error> {
    SqlitePool::connect_with(options).await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
