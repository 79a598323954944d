//! Submission sequencer
//!
//! Composes validation, the upload orchestrator and the document store into
//! the single create-listing flow: validate, upload the images, build the
//! final document, write it. A failure at any stage stops the sequence and
//! leaves no persisted listing behind.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Session;
use crate::documents::DocumentStore;
use crate::error::{HearthError, Result};
use crate::listing::{check_submission, Listing, ListingDraft, LISTINGS_COLLECTION};
use crate::upload::UploadService;

/// A listing as persisted, together with its document id
#[derive(Debug, Clone)]
pub struct StoredListing {
    pub id: String,
    pub listing: Listing,
}

pub struct SubmissionSequencer {
    uploader: UploadService,
    documents: Arc<dyn DocumentStore>,
}

impl SubmissionSequencer {
    pub fn new(uploader: UploadService, documents: Arc<dyn DocumentStore>) -> Self {
        Self { uploader, documents }
    }

    /// Run the full create-listing sequence for the given session's user.
    /// The draft is consumed; on success it no longer exists anywhere.
    pub async fn submit(&self, session: &Session, mut draft: ListingDraft) -> Result<StoredListing> {
        check_submission(&draft)?;

        let images = std::mem::take(&mut draft.images);
        let image_urls = self.uploader.upload_batch(&session.user_id, images).await?;

        let listing = Listing::from_draft(&draft, image_urls, &session.user_id);
        let id = Uuid::new_v4().to_string();

        let stored = self
            .documents
            .set(LISTINGS_COLLECTION, &id, serde_json::to_value(&listing)?)
            .await?;

        let listing: Listing = serde_json::from_value(stored)
            .map_err(|e| HearthError::persistence(format!("malformed stored listing: {}", e)))?;

        tracing::info!(id = %id, "listing created");
        Ok(StoredListing { id, listing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::listing::{fetch_listing, GeoPoint};
    use crate::storage::ObjectStore;
    use crate::tests::mocks::{MockDocumentStore, MockObjectStore};
    use crate::tests::utils::test_helpers::{draft_with_images, image, session, valid_draft};

    struct Fixture {
        store: Arc<MockObjectStore>,
        documents: Arc<MockDocumentStore>,
        sequencer: SubmissionSequencer,
    }

    fn fixture(store: MockObjectStore, documents: MockDocumentStore) -> Fixture {
        let store = Arc::new(store);
        let documents = Arc::new(documents);
        let sequencer = SubmissionSequencer::new(
            UploadService::new(Arc::clone(&store) as Arc<dyn ObjectStore>),
            Arc::clone(&documents) as Arc<dyn DocumentStore>,
        );
        Fixture {
            store,
            documents,
            sequencer,
        }
    }

    #[tokio::test]
    async fn successful_submission_writes_one_listing() {
        let f = fixture(MockObjectStore::new(), MockDocumentStore::new());

        let mut draft = valid_draft();
        draft.latitude = 40.7;
        draft.longitude = -74.0;
        draft.images = vec![image("front.jpg"), image("kitchen.jpg")];

        let stored = f.sequencer.submit(&session("user-1"), draft).await.unwrap();

        assert_eq!(stored.listing.user_ref, "user-1");
        assert_eq!(stored.listing.image_urls.len(), 2);
        assert!(stored.listing.image_urls[0].contains("front.jpg"));
        assert!(stored.listing.created_at.is_some(), "store assigns the timestamp");

        // Round trip through the store keeps the geolocation unchanged.
        let fetched = fetch_listing(f.documents.as_ref(), &stored.id).await.unwrap();
        assert_eq!(fetched.geolocation, GeoPoint { lat: 40.7, lng: -74.0 });
    }

    #[tokio::test]
    async fn price_ordering_violation_stops_everything() {
        let f = fixture(MockObjectStore::new(), MockDocumentStore::new());

        let mut draft = valid_draft();
        draft.offer = true;
        draft.regular_price = 1000;
        draft.discounted_price = Some(1200);

        let err = f.sequencer.submit(&session("user-1"), draft).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::PriceOrdering);
        assert_eq!(f.store.upload_count(), 0, "no upload may start");
        assert_eq!(f.documents.write_count(), 0, "no document may be written");
    }

    #[tokio::test]
    async fn oversized_image_set_is_rejected_before_any_upload() {
        let f = fixture(MockObjectStore::new(), MockDocumentStore::new());

        let err = f
            .sequencer
            .submit(&session("user-1"), draft_with_images(7))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::TooManyImages);
        assert_eq!(f.store.upload_count(), 0);
        assert_eq!(f.documents.write_count(), 0);
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_persisted_listing() {
        let f = fixture(
            MockObjectStore::new().with_failure("broken.jpg"),
            MockDocumentStore::new(),
        );

        let mut draft = valid_draft();
        draft.images = vec![image("ok.jpg"), image("broken.jpg"), image("ok-2.jpg")];

        let err = f.sequencer.submit(&session("user-1"), draft).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::UploadFailed);
        assert_eq!(f.documents.write_count(), 0, "no partial document");
    }

    #[tokio::test]
    async fn failed_write_surfaces_as_persistence_error() {
        let f = fixture(MockObjectStore::new(), MockDocumentStore::new().with_failing_writes());

        let err = f
            .sequencer
            .submit(&session("user-1"), valid_draft())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::PersistenceFailed);
    }
}
