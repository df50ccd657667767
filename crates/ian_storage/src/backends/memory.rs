use async_trait::async_trait;
use ian_core::{Article, ArticleStore, Category, Error, NewArticle, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    categories: Vec<Category>,
}

impl MemoryStore {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            articles: Vec::new(),
            categories,
        }
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<Article> {
        self.articles.iter().find(|a| a.slug == slug).cloned()
    }

    /// Check and insert happen under the same `&mut`, so two writers can
    /// never both claim a slug.
    pub fn insert(&mut self, article: NewArticle) -> Result<Article> {
        if self.articles.iter().any(|a| a.slug == article.slug) {
            return Err(Error::UniquenessViolation(article.slug));
        }
        let article = Article::from_new(article);
        self.articles.push(article.clone());
        Ok(article)
    }

    pub fn find_category(&self, id: &str) -> Option<Category> {
        self.categories.iter().find(|c| c.id == id).cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(categories))),
        }
    }

    pub fn with_default_categories() -> Self {
        Self::with_categories(Category::defaults())
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.find_by_slug(slug))
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        let mut store = self.store.write().await;
        if store.find_category(&article.category_id).is_none() && !store.categories.is_empty() {
            return Err(Error::CategoryNotFound(article.category_id));
        }
        store.insert(article)
    }

    async fn find_category(&self, id: &str) -> Result<Option<Category>> {
        let store = self.store.read().await;
        Ok(store.find_category(id))
    }
}
