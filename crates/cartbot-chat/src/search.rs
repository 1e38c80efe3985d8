//! Product search invoker.

use std::sync::Arc;

use cartbot_core::types::{Product, SearchCriteria};

use crate::backend::ChatBackend;
use crate::error::BackendError;

/// Result of a successful product search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<Product>),
    NotFound,
}

impl SearchOutcome {
    pub fn count(&self) -> usize {
        match self {
            SearchOutcome::Found(products) => products.len(),
            SearchOutcome::NotFound => 0,
        }
    }

    /// The products to display; empty for `NotFound`.
    pub fn into_products(self) -> Vec<Product> {
        match self {
            SearchOutcome::Found(products) => products,
            SearchOutcome::NotFound => Vec::new(),
        }
    }
}

/// Runs product searches against the backend.
#[derive(Clone)]
pub struct ProductSearch {
    backend: Arc<dyn ChatBackend>,
}

impl ProductSearch {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Search with the present fields of `criteria`.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<SearchOutcome, BackendError> {
        let products = self.backend.search_products(criteria).await?;
        tracing::debug!(
            query = ?criteria.query,
            category = ?criteria.category,
            max_price = ?criteria.max_price,
            found = products.len(),
            "Product search complete"
        );
        if products.is_empty() {
            Ok(SearchOutcome::NotFound)
        } else {
            Ok(SearchOutcome::Found(products))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{Endpoint, MockBackend};

    fn mouse() -> Product {
        Product {
            id: 1,
            name: "Wireless Mouse".to_string(),
            price: 25.0,
            category: "electronics".to_string(),
            description: "Quiet clicks".to_string(),
            stock: 10,
            image_url: Some("https://img.example.com/mouse.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_search_found_reports_count() {
        let backend = Arc::new(MockBackend::new().with_catalog(vec![mouse()]));
        let search = ProductSearch::new(backend.clone());
        let outcome = search
            .search(&SearchCriteria {
                category: Some("electronics".to_string()),
                ..SearchCriteria::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.count(), 1);
        assert_eq!(outcome.into_products(), vec![mouse()]);
    }

    #[tokio::test]
    async fn test_search_empty_is_not_found() {
        let backend = Arc::new(MockBackend::new().with_catalog(vec![mouse()]));
        let search = ProductSearch::new(backend);
        let outcome = search
            .search(&SearchCriteria {
                max_price: Some(10),
                ..SearchCriteria::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome, SearchOutcome::NotFound);
        assert!(outcome.into_products().is_empty());
    }

    #[tokio::test]
    async fn test_search_passes_criteria_through() {
        let backend = Arc::new(MockBackend::new());
        let search = ProductSearch::new(backend.clone());
        let criteria = SearchCriteria {
            query: Some("phone".to_string()),
            category: None,
            max_price: Some(0),
        };
        search.search(&criteria).await.unwrap();
        assert_eq!(backend.searches(), vec![criteria]);
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let backend = Arc::new(MockBackend::new());
        backend.set_failing(Endpoint::SearchProducts, true);
        let search = ProductSearch::new(backend);
        assert!(search.search(&SearchCriteria::default()).await.is_err());
    }
}
