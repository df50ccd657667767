use async_trait::async_trait;
use crate::types::{Article, Category, NewArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up an article by its slug
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// Insert an article in a single write.
    ///
    /// Implementations must reject a slug that is already taken with
    /// [`crate::Error::UniquenessViolation`]; the check done before this call
    /// is only advisory.
    async fn create(&self, article: NewArticle) -> Result<Article>;

    /// Look up a category by id
    async fn find_category(&self, id: &str) -> Result<Option<Category>>;
}
