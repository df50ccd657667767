//! URL-safe article identifiers.
//!
//! [`slugify`] is a pure function of the title, so two titles that normalize
//! to the same string collide on purpose. [`SlugAllocator`] resolves such
//! collisions against a point-in-time existence check; the store's own
//! uniqueness constraint stays the final authority.

use std::future::Future;
use chrono::Utc;
use crate::{Error, Result};

/// Used when a title has no sluggable characters at all (emoji, punctuation).
pub const FALLBACK_SLUG: &str = "articulo";

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Lower-cases and trims the title, turns whitespace runs into hyphens,
/// drops everything outside `[a-z0-9_-]` and collapses repeated hyphens.
/// Accented letters are dropped, not folded: "domésticos" gives "domsticos".
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());

    for c in lowered.chars() {
        match c {
            'a'..='z' | '0'..='9' | '_' => slug.push(c),
            c if (c == '-' || c.is_whitespace()) && !slug.ends_with('-') => slug.push('-'),
            _ => {}
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SlugAllocator {
    max_attempts: usize,
}

impl Default for SlugAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl SlugAllocator {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns `slugify(title)` if `exists` says it is free, otherwise the
    /// first free disambiguated form. Never writes anything.
    pub async fn allocate<F, Fut>(&self, title: &str, mut exists: F) -> Result<String>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let base = slugify(title);
        if !exists(base.clone()).await? {
            return Ok(base);
        }

        let millis = Utc::now().timestamp_millis();
        for attempt in 0..self.max_attempts {
            let candidate = disambiguate(&base, millis, attempt);
            if !exists(candidate.clone()).await? {
                tracing::debug!("Slug '{}' taken, using '{}'", base, candidate);
                return Ok(candidate);
            }
            tracing::warn!("Disambiguated slug '{}' also taken ({}/{})", candidate, attempt + 1, self.max_attempts);
        }

        Err(Error::SlugExhausted {
            slug: base,
            attempts: self.max_attempts,
        })
    }
}

fn disambiguate(base: &str, millis: i64, attempt: usize) -> String {
    if attempt == 0 {
        format!("{}-{}", base, millis)
    } else {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}-{}", base, millis, &suffix[..6])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn is_url_safe(slug: &str) -> bool {
        !slug.is_empty()
            && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            && !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Bienvenido a IA News"), "bienvenido-a-ia-news");
        assert_eq!(slugify("  Robots   domésticos: ¿el futuro?  "), "robots-domsticos-el-futuro");
        assert_eq!(slugify("Año - nuevo -- récord"), "ao-nuevo-rcord");
        assert_eq!(slugify("snake_case title"), "snake_case-title");
        assert_eq!(slugify("¡Hola!"), "hola");
        assert_eq!(slugify("\"Entre comillas\""), "entre-comillas");
        assert_eq!(slugify("🚀🚀"), FALLBACK_SLUG);
    }

    #[test]
    fn test_slugify_is_stable() {
        let title = "La IA llega a las redacciones";
        assert_eq!(slugify(title), slugify(title));
        assert!(is_url_safe(&slugify(title)));
    }

    #[tokio::test]
    async fn test_allocate_free_slug() {
        let allocator = SlugAllocator::default();
        let slug = allocator
            .allocate("Bienvenido a IA News", |_| async { Ok(false) })
            .await
            .unwrap();
        assert_eq!(slug, "bienvenido-a-ia-news");
    }

    #[tokio::test]
    async fn test_allocate_taken_slug() {
        let taken: HashSet<String> = ["bienvenido-a-ia-news".to_string()].into_iter().collect();
        let allocator = SlugAllocator::default();
        let slug = allocator
            .allocate("Bienvenido a IA News", |slug| {
                let exists = taken.contains(&slug);
                async move { Ok(exists) }
            })
            .await
            .unwrap();

        assert_ne!(slug, "bienvenido-a-ia-news");
        assert!(slug.starts_with("bienvenido-a-ia-news-"));
        assert!(is_url_safe(&slug));
    }

    #[tokio::test]
    async fn test_allocate_gives_up_after_bounded_attempts() {
        let calls = AtomicUsize::new(0);
        let allocator = SlugAllocator::new(3);
        let err = allocator
            .allocate("Siempre ocupado", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(true) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SlugExhausted { attempts: 3, .. }));
        // base check plus three disambiguated candidates
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_allocate_propagates_lookup_errors() {
        let allocator = SlugAllocator::default();
        let err = allocator
            .allocate("Título", |_| async { Err(Error::PersistenceFailed("store offline".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PersistenceFailed(_)));
    }
}
