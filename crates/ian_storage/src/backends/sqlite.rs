use async_trait::async_trait;
use ian_core::{Article, ArticleStore, Category, Error, NewArticle, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        color TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        summary TEXT NOT NULL,
        content TEXT NOT NULL,
        tags TEXT NOT NULL,
        category_id TEXT NOT NULL REFERENCES categories(id),
        generated_by TEXT NOT NULL,
        published INTEGER NOT NULL DEFAULT 0,
        featured INTEGER NOT NULL DEFAULT 0,
        view_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

fn database_error(context: &str, e: sqlx::Error) -> Error {
    Error::PersistenceFailed(format!("{}: {}", context, e))
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| database_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| database_error(&format!("Failed to run migration {}", i), e))?;
        }

        for category in Category::defaults() {
            sqlx::query(
                "INSERT OR IGNORE INTO categories (id, name, slug, description, color) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(category.description.as_deref())
            .bind(category.color.as_deref())
            .execute(&pool)
            .await
            .map_err(|e| database_error("Failed to seed categories", e))?;
        }

        tracing::info!("💾 SQLite storage ready at {}", db_path.display());
        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &PathBuf {
        &self.db_path
    }
}

fn parse_timestamp(value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&chrono::Utc))
        .map_err(|e| Error::PersistenceFailed(format!("Failed to parse date: {}", e)))
}

fn article_from_row(row: &SqliteRow) -> Result<Article> {
    let get = |e: sqlx::Error| database_error("Failed to read article row", e);
    let tags: String = row.try_get("tags").map_err(get)?;
    let generated_by: String = row.try_get("generated_by").map_err(get)?;
    let view_count: i64 = row.try_get("view_count").map_err(get)?;
    let created_at: String = row.try_get("created_at").map_err(get)?;
    let updated_at: String = row.try_get("updated_at").map_err(get)?;

    Ok(Article {
        id: row.try_get("id").map_err(get)?,
        title: row.try_get("title").map_err(get)?,
        slug: row.try_get("slug").map_err(get)?,
        summary: row.try_get("summary").map_err(get)?,
        content: row.try_get("content").map_err(get)?,
        tags: serde_json::from_str(&tags)?,
        category_id: row.try_get("category_id").map_err(get)?,
        generated_by: generated_by.parse()?,
        published: row.try_get("published").map_err(get)?,
        featured: row.try_get("featured").map_err(get)?,
        view_count: view_count.max(0) as u64,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| database_error("Failed to look up slug", e))?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        let article = Article::from_new(article);
        let tags = serde_json::to_string(&article.tags)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO articles
            (id, title, slug, summary, content, tags, category_id, generated_by,
             published, featured, view_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(tags)
        .bind(&article.category_id)
        .bind(article.generated_by.as_str())
        .bind(article.published)
        .bind(article.featured)
        .bind(article.view_count as i64)
        .bind(article.created_at.to_rfc3339())
        .bind(article.updated_at.to_rfc3339())
        .execute(&*self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(article),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::UniquenessViolation(article.slug))
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(Error::CategoryNotFound(article.category_id))
            }
            Err(e) => Err(database_error("Failed to store article", e)),
        }
    }

    async fn find_category(&self, id: &str) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name, slug, description, color FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| database_error("Failed to look up category", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let get = |e: sqlx::Error| database_error("Failed to read category row", e);
        Ok(Some(Category {
            id: row.try_get("id").map_err(get)?,
            name: row.try_get("name").map_err(get)?,
            slug: row.try_get("slug").map_err(get)?,
            description: row.try_get("description").map_err(get)?,
            color: row.try_get("color").map_err(get)?,
        }))
    }
}
