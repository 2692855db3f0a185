//! Product catalog lookup used to suggest item names while typing.
//!
//! Suggestions are advisory: any network or decoding failure is logged and
//! turns into an empty list.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub const DEFAULT_CATALOG_URL: &str = "https://world.openfoodfacts.org";
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
    pub page_size: usize,
    pub min_query_len: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_URL.to_string(),
            page_size: MAX_SUGGESTIONS,
            min_query_len: MIN_QUERY_LEN,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSuggestion {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<RawProduct>,
}

#[derive(Deserialize)]
struct RawProduct {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    image_small_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawProduct {
    fn into_suggestion(self) -> Option<ProductSuggestion> {
        let name = non_blank(self.product_name)?;
        let id = match self.code {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => name.clone(),
        };
        Some(ProductSuggestion {
            id,
            name,
            brand: non_blank(self.brands),
            image: non_blank(self.image_small_url).or_else(|| non_blank(self.image_url)),
            quantity: non_blank(self.quantity),
        })
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Up to `page_size` products matching `query`. Queries shorter than
    /// `min_query_len` characters return nothing without a request.
    pub async fn search(&self, query: &str) -> Vec<ProductSuggestion> {
        let query = query.trim();
        if query.chars().count() < self.config.min_query_len {
            return Vec::new();
        }
        match self.fetch(query).await {
            Ok(products) => products,
            Err(err) => {
                warn!("product search for {:?} failed: {}", query, err);
                Vec::new()
            }
        }
    }

    async fn fetch(&self, query: &str) -> reqwest::Result<Vec<ProductSuggestion>> {
        let url = format!("{}/cgi/search.pl", self.config.base_url.trim_end_matches('/'));
        let page_size = self.config.page_size.to_string();
        let resp: SearchResponse = self
            .http
            .get(url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let products: Vec<_> = resp
            .products
            .into_iter()
            .filter_map(RawProduct::into_suggestion)
            .take(self.config.page_size)
            .collect();
        debug!("product search for {:?} returned {}", query, products.len());
        Ok(products)
    }
}

/// Catalog lookups gated by issue order: a response is only delivered if no
/// newer query was issued while it was in flight.
pub struct SearchAssist {
    catalog: CatalogClient,
    latest: AtomicU64,
}

impl SearchAssist {
    pub fn new(catalog: CatalogClient) -> Self {
        Self {
            catalog,
            latest: AtomicU64::new(0),
        }
    }

    /// Suggestions for `query`, or `None` when a newer query superseded it.
    pub async fn suggest(&self, query: &str) -> Option<Vec<ProductSuggestion>> {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let results = self.catalog.search(query).await;
        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!("dropping stale suggestions for {:?}", query);
            return None;
        }
        Some(results)
    }
}
