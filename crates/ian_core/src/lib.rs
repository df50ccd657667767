pub mod backend;
pub mod error;
pub mod slug;
pub mod storage;
pub mod types;

pub use backend::GenerationBackend;
pub use error::{Error, ErrorKind, Result};
pub use slug::{slugify, SlugAllocator};
pub use storage::ArticleStore;
pub use types::{
    Article, Category, GeneratedArticle, GeneratedBy, GenerationRequest, ModelInfo, NewArticle,
};
