use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
}

pub async fn get_all_categories(pool: &SqlitePool) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>(
        r#"
SELECT id, type
FROM categories
ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_category_types(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
SELECT type
FROM categories
ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn import_categories(pool: &SqlitePool, categories: Vec<Category>) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;
    for category in categories {
        sqlx::query(
            r#"
INSERT INTO categories (id, type) VALUES (?1, ?2)
ON CONFLICT(id) DO UPDATE SET type = excluded.type
            "#,
        )
        .bind(category.id)
        .bind(category.kind)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}
