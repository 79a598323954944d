//! Document store client
//!
//! The store is a managed service: documents are JSON values addressed by
//! (collection, id). Writes are assigned their `created_at` timestamp by the
//! server, so `set` hands the stored document back.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::client::{ApiResponse, BaseClient};
use crate::error::{HearthError, Result};

/// Capability seam over the document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Write a document and return it as stored (server timestamp included)
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<Value>;
}

/// HTTP implementation of [`DocumentStore`]
///
/// Constructed per invocation from an explicit session token; there is no
/// ambient "current user".
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    base: BaseClient,
    bearer_token: String,
}

impl HttpDocumentStore {
    pub fn new(base: BaseClient, bearer_token: String) -> Self {
        Self { base, bearer_token }
    }

    fn document_path(collection: &str, id: &str) -> String {
        format!("/documents/{}/{}", collection, id)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let endpoint = Self::document_path(collection, id);

        let response: Result<ApiResponse<Value>> = self
            .base
            .request_with_bearer(Method::GET, &endpoint, None::<&()>, &self.bearer_token)
            .await;

        match response {
            Ok(api_response) => Ok(api_response.data),
            Err(HearthError::Api { status: 404, .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<Value> {
        let endpoint = Self::document_path(collection, id);

        let response: ApiResponse<Value> = self
            .base
            .request_with_bearer(Method::PUT, &endpoint, Some(&document), &self.bearer_token)
            .await
            .map_err(|e| match e {
                HearthError::Authentication { .. } => e,
                other => HearthError::persistence(other.to_string()),
            })?;

        response
            .data
            .ok_or_else(|| HearthError::persistence("No document in write response"))
    }
}

#[cfg(test)]
mod tests {
    use crate::listing::{GeoPoint, Listing, ListingKind};
    use crate::tests::mocks::MockDocumentStore;

    use super::DocumentStore;

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let store = MockDocumentStore::new();
        assert!(store.get("listings", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn geolocation_round_trips_unchanged() {
        let store = MockDocumentStore::new();

        let listing = Listing {
            kind: ListingKind::Rent,
            name: "Sunny riverside duplex".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            parking: false,
            furnished: true,
            location: "12 River Rd".to_string(),
            offer: false,
            regular_price: 1800,
            discounted_price: None,
            image_urls: vec!["https://objects.hearth.test/images/a".to_string()],
            geolocation: GeoPoint { lat: 40.7, lng: -74.0 },
            user_ref: "user-9".to_string(),
            created_at: None,
        };

        store
            .set("listings", "l-1", serde_json::to_value(&listing).unwrap())
            .await
            .unwrap();

        let fetched = store.get("listings", "l-1").await.unwrap().unwrap();
        let fetched: Listing = serde_json::from_value(fetched).unwrap();
        assert_eq!(fetched.geolocation, GeoPoint { lat: 40.7, lng: -74.0 });
    }

    #[tokio::test]
    async fn write_assigns_a_server_timestamp() {
        let store = MockDocumentStore::new();

        let stored = store
            .set("users", "u-1", serde_json::json!({ "name": "Rui" }))
            .await
            .unwrap();

        assert!(stored.get("created_at").is_some());
    }
}
