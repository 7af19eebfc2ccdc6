use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub author: String,
    pub image: Option<String>,
    pub status: ArticleStatus,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated fields for an insert.
#[derive(Debug)]
pub struct NewArticle {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub author: String,
    pub image: Option<String>,
    pub status: ArticleStatus,
    pub tags: Vec<String>,
}

/// Validated fields for an update. Absent fields are retained, except
/// `image`, which is persisted as given (the handler decides between the
/// freshly staged path and the existing one).
#[derive(Debug, Default)]
pub struct ArticleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ArticleStatus>,
    pub image: Option<String>,
}

/// Optional filters applied to listing and counting.
#[derive(Debug, Default)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
}

const COLUMNS: &str =
    "id, name, description, price, author, image, status, tags, created_at, updated_at";

impl Article {
    pub async fn insert(db: &PgPool, new: &NewArticle) -> anyhow::Result<Article> {
        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            INSERT INTO articles (name, description, price, author, image, status, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#,
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.author)
        .bind(&new.image)
        .bind(new.status)
        .bind(&new.tags)
        .fetch_one(db)
        .await?;
        Ok(article)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {COLUMNS} FROM articles WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(article)
    }

    /// Newest first, with the optional status filter and a case-insensitive
    /// search across name, description and author.
    pub async fn list(
        db: &PgPool,
        filter: &ArticleFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM articles
            WHERE ($1::article_status IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR name ILIKE '%' || $2 || '%'
                   OR description ILIKE '%' || $2 || '%'
                   OR author ILIKE '%' || $2 || '%')
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(filter.status)
        .bind(&filter.search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(articles)
    }

    pub async fn count(db: &PgPool, filter: &ArticleFilter) -> anyhow::Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM articles
            WHERE ($1::article_status IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR name ILIKE '%' || $2 || '%'
                   OR description ILIKE '%' || $2 || '%'
                   OR author ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(filter.status)
        .bind(&filter.search)
        .fetch_one(db)
        .await?;
        Ok(total)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &ArticleChanges,
    ) -> anyhow::Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            UPDATE articles
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                author = COALESCE($5, author),
                tags = COALESCE($6, tags),
                status = COALESCE($7, status),
                image = $8,
                updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(&changes.author)
        .bind(&changes.tags)
        .bind(changes.status)
        .bind(&changes.image)
        .fetch_optional(db)
        .await?;
        Ok(article)
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: ArticleStatus,
    ) -> anyhow::Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            UPDATE articles
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
        Ok(article)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn article_json_uses_camel_case_timestamps() {
        let article = Article {
            id: Uuid::new_v4(),
            name: "Field notes".into(),
            description: "D".repeat(60),
            price: 12.5,
            author: "R. Crumb".into(),
            image: Some("/uploads/articles/cover-1.jpg".into()),
            status: ArticleStatus::Draft,
            tags: vec!["a".into(), "b".into()],
            created_at: datetime!(2024-05-01 08:00 UTC),
            updated_at: datetime!(2024-05-01 08:00 UTC),
        };
        let json = serde_json::to_value(&article).expect("serialize");
        assert_eq!(json["createdAt"], "2024-05-01T08:00:00Z");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["image"], "/uploads/articles/cover-1.jpg");
    }

    #[test]
    fn status_round_trips_lowercase() {
        assert_eq!(
            serde_json::to_string(&ArticleStatus::Published).expect("ser"),
            "\"published\""
        );
        let parsed: ArticleStatus = serde_json::from_str("\"archived\"").expect("de");
        assert_eq!(parsed, ArticleStatus::Archived);
    }
}
