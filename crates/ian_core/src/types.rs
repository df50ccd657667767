use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::{Error, Result};

pub const DEFAULT_LANGUAGE: &str = "español";
pub const DEFAULT_TONE: &str = "informativo";

/// What the newsroom asks the model to write about.
///
/// Fields are private so a request cannot change between generation steps;
/// build one with [`GenerationRequest::new`] and the `with_*` helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    topic: String,
    category_name: String,
    language: String,
    tone: String,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, category_name: impl Into<String>) -> Result<Self> {
        let request = Self {
            topic: topic.into().trim().to_string(),
            category_name: category_name.into().trim().to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            tone: DEFAULT_TONE.to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language.trim().to_string();
        }
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        let tone = tone.into();
        if !tone.trim().is_empty() {
            self.tone = tone.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.is_empty() {
            return Err(Error::InvalidRequest("topic is required".to_string()));
        }
        if self.category_name.is_empty() {
            return Err(Error::InvalidRequest("category is required".to_string()));
        }
        Ok(())
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn tone(&self) -> &str {
        &self.tone
    }
}

/// The four model outputs of one run, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedBy {
    Ai,
    Manual,
}

impl GeneratedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratedBy::Ai => "ai",
            GeneratedBy::Manual => "manual",
        }
    }
}

impl std::str::FromStr for GeneratedBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ai" => Ok(GeneratedBy::Ai),
            "manual" => Ok(GeneratedBy::Manual),
            other => Err(Error::Config(format!("unknown article origin: {}", other))),
        }
    }
}

/// Everything a store needs to insert an article in one write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub generated_by: GeneratedBy,
    pub published: bool,
    pub featured: bool,
}

impl NewArticle {
    pub fn from_generated(generated: GeneratedArticle, slug: String, category_id: String) -> Self {
        Self {
            title: generated.title,
            slug,
            summary: generated.summary,
            content: generated.content,
            tags: generated.tags,
            category_id,
            generated_by: GeneratedBy::Ai,
            published: false,
            featured: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub generated_by: GeneratedBy,
    pub published: bool,
    pub featured: bool,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Stamps a fresh id and timestamps onto a [`NewArticle`].
    pub fn from_new(new: NewArticle) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            slug: new.slug,
            summary: new.summary,
            content: new.content,
            tags: new.tags,
            category_id: new.category_id,
            generated_by: new.generated_by,
            published: new.published,
            featured: new.featured,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl Category {
    /// The sections every fresh newsroom starts with. Ids equal slugs so
    /// they are stable across stores.
    pub fn defaults() -> Vec<Category> {
        [
            ("Tecnología", "tecnologia", "Noticias sobre tecnología e innovación", "#3B82F6"),
            ("Ciencia", "ciencia", "Descubrimientos y avances científicos", "#8B5CF6"),
            ("Deportes", "deportes", "Noticias deportivas", "#EF4444"),
            ("Cultura", "cultura", "Arte, música y entretenimiento", "#F59E0B"),
        ]
        .into_iter()
        .map(|(name, slug, description, color)| Category {
            id: slug.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: Some(description.to_string()),
            color: Some(color.to_string()),
        })
        .collect()
    }
}

/// A model installed on the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
    pub modified_at: Option<String>,
}
