//! Service providers: lookup, search and ratings.

use std::sync::Arc;

use meak_protocol::{Profile, UserId};
use meak_transport::{TableBackend, TableQuery};
use serde::Deserialize;

use crate::RemoteError;
use crate::rows::{decode_all, fetch_by_id};

const PROFILES: &str = "profiles";
const REVIEWS: &str = "reviews";

/// Text-search configuration used for name search.
pub const SEARCH_CONFIG: &str = "english";

/// Search criteria. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSearch {
    /// Matched against `first_name` with web-search syntax.
    pub query: Option<String>,
    /// Exact postal code.
    pub postal_code: Option<String>,
    /// Accepted but not filtered on; providers have no category column yet.
    pub category: Option<String>,
}

/// Aggregate of a provider's reviews.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderRating {
    /// Mean rating, `None` when there are no reviews.
    pub average: Option<f64>,
    pub count: usize,
}

impl ProviderRating {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self {
                average: None,
                count: 0,
            };
        }
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        Self {
            average: Some(sum as f64 / ratings.len() as f64),
            count: ratings.len(),
        }
    }
}

#[derive(Deserialize)]
struct RatingRow {
    rating: i32,
}

pub struct ProvidersService<B: TableBackend> {
    backend: Arc<B>,
}

impl<B: TableBackend> ProvidersService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn provider_by_id(&self, provider_id: &UserId) -> Result<Profile, RemoteError> {
        fetch_by_id(self.backend.as_ref(), PROFILES, provider_id.as_str()).await
    }

    pub async fn search(&self, search: &ProviderSearch) -> Result<Vec<Profile>, RemoteError> {
        let mut query = TableQuery::from(PROFILES);
        if let Some(text) = non_empty(&search.query) {
            query = query.web_search("first_name", text, SEARCH_CONFIG);
        }
        if let Some(postal_code) = non_empty(&search.postal_code) {
            query = query.eq("postal_code", postal_code);
        }
        if let Some(category) = non_empty(&search.category) {
            tracing::debug!(category, "category filter not supported, ignoring");
        }

        let rows = self.backend.select(&query).await?;
        decode_all(PROFILES, rows)
    }

    pub async fn ratings(&self, provider_id: &UserId) -> Result<ProviderRating, RemoteError> {
        let query = TableQuery::from(REVIEWS)
            .select("rating")
            .eq("reviewee_id", provider_id.as_str());
        let rows: Vec<RatingRow> = decode_all(REVIEWS, self.backend.select(&query).await?)?;
        let ratings: Vec<i32> = rows.into_iter().map(|r| r.rating).collect();
        Ok(ProviderRating::from_ratings(&ratings))
    }
}

impl<B: TableBackend> Clone for ProvidersService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
