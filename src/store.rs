use crate::types::{
    AssistantError, NewPost, PostRecord, Result, SourceRecord, TrendAnalysis, User,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

/// Persistence gateway for users, posts, and their source citations.
///
/// All post operations are scoped to an owner id; a post exclusively owns
/// its source rows (they cascade-delete with it).
#[derive(Clone)]
pub struct PostStore {
    pool: PgPool,
}

impl PostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                external_id VARCHAR(255) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL,
                name VARCHAR(255),
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                title VARCHAR(500) NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                status VARCHAR(50) NOT NULL DEFAULT 'draft',
                research_summary TEXT,
                trend_analysis JSONB,
                featured_image_url TEXT,
                wordpress_id BIGINT,
                wordpress_link TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id SERIAL PRIMARY KEY,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                title VARCHAR(500) NOT NULL,
                uri TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database schema is ready");
        Ok(())
    }

    /// Resolve an external identity to a local user row, lazily creating it
    /// on first sight. The upsert keyed on the unique external_id means
    /// concurrent first-time requests for the same identity converge on a
    /// single row.
    pub async fn get_or_create_user(
        &self,
        external_id: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<User> {
        if external_id.is_empty() {
            return Err(AssistantError::Unauthorized);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO users (external_id, email, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (external_id)
            DO UPDATE SET updated_at = NOW()
            RETURNING id, external_id, email, name
            "#,
        )
        .bind(external_id)
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.get("id"),
            external_id: row.get("external_id"),
            email: row.get("email"),
            name: row.get("name"),
        })
    }

    /// All posts owned by the user, newest created first, each with its
    /// sources attached.
    pub async fn list_posts(&self, user_id: i32) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, content, status, research_summary,
                   trend_analysis, featured_image_url, wordpress_id,
                   wordpress_link, created_at, updated_at
            FROM posts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            let mut post = Self::post_from_row(&row)?;
            post.sources = self.sources_for_post(post.id).await?;
            posts.push(post);
        }

        Ok(posts)
    }

    /// Create a post with its sources in a single transaction, so a crash
    /// cannot leave an orphaned post with half its citations.
    pub async fn create_post(&self, user_id: i32, new_post: NewPost) -> Result<PostRecord> {
        if new_post.title.trim().is_empty() {
            return Err(AssistantError::Validation("Title is required".to_string()));
        }

        let status = new_post.status.as_deref().unwrap_or("draft");
        let trend_analysis = match &new_post.trend_analysis {
            Some(analysis) => Some(serde_json::to_value(analysis)?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO posts (user_id, title, content, status, research_summary,
                               trend_analysis, featured_image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, title, content, status, research_summary,
                      trend_analysis, featured_image_url, wordpress_id,
                      wordpress_link, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(status)
        .bind(&new_post.research_summary)
        .bind(&trend_analysis)
        .bind(&new_post.featured_image_url)
        .fetch_one(&mut *tx)
        .await?;

        let mut post = Self::post_from_row(&row)?;

        for source in &new_post.sources {
            let source_row = sqlx::query(
                "INSERT INTO sources (post_id, title, uri) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(post.id)
            .bind(&source.title)
            .bind(&source.uri)
            .fetch_one(&mut *tx)
            .await?;

            post.sources.push(SourceRecord {
                id: source_row.get("id"),
                post_id: post.id,
                title: source.title.clone(),
                uri: source.uri.clone(),
            });
        }

        tx.commit().await?;
        debug!("Created post {} with {} sources", post.id, post.sources.len());

        Ok(post)
    }

    /// Record the remote WordPress id/link after a successful (re)draft.
    pub async fn update_wordpress_link(
        &self,
        post_id: i32,
        user_id: i32,
        wordpress_id: i64,
        link: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET wordpress_id = $3, wordpress_link = $4, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(wordpress_id)
        .bind(link)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AssistantError::NotFound(format!("post {}", post_id)));
        }

        Ok(())
    }

    async fn sources_for_post(&self, post_id: i32) -> Result<Vec<SourceRecord>> {
        let rows = sqlx::query("SELECT id, post_id, title, uri FROM sources WHERE post_id = $1")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SourceRecord {
                id: row.get("id"),
                post_id: row.get("post_id"),
                title: row.get("title"),
                uri: row.get("uri"),
            })
            .collect())
    }

    fn post_from_row(row: &PgRow) -> Result<PostRecord> {
        let trend_analysis: Option<serde_json::Value> = row.try_get("trend_analysis")?;
        let trend_analysis = match trend_analysis {
            Some(value) => Some(serde_json::from_value::<TrendAnalysis>(value)?),
            None => None,
        };

        Ok(PostRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            content: row.get("content"),
            status: row.get("status"),
            research_summary: row.get("research_summary"),
            trend_analysis,
            featured_image_url: row.get("featured_image_url"),
            wordpress_id: row.get("wordpress_id"),
            wordpress_link: row.get("wordpress_link"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            sources: Vec::new(),
        })
    }
}
