//! Listing domain model
//!
//! A [`ListingDraft`] lives only for the duration of one create-listing
//! session; the persisted [`Listing`] swaps the selected image files for
//! their uploaded URLs and carries the server-assigned creation timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use validator::Validate;

use crate::documents::DocumentStore;
use crate::error::{HearthError, Result};

pub const LISTINGS_COLLECTION: &str = "listings";
pub const USERS_COLLECTION: &str = "users";

/// Maximum number of images per listing
pub const MAX_IMAGES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Sale,
    Rent,
}

impl ListingKind {
    pub fn label(&self) -> &'static str {
        match self {
            ListingKind::Sale => "For Sale",
            ListingKind::Rent => "For Rent",
        }
    }
}

/// Geolocation as persisted on every listing document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// An image selected for upload: original file name plus its bytes
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// In-memory draft collected from the create form, destroyed once the
/// submission succeeds
#[derive(Debug, Validate)]
pub struct ListingDraft {
    pub kind: ListingKind,
    #[validate(length(min = 10, max = 32, message = "name must be 10-32 characters"))]
    pub name: String,
    #[validate(range(min = 1, max = 50, message = "bedrooms must be 1-50"))]
    pub bedrooms: u32,
    #[validate(range(min = 1, max = 50, message = "bathrooms must be 1-50"))]
    pub bathrooms: u32,
    pub parking: bool,
    pub furnished: bool,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    pub offer: bool,
    #[validate(range(min = 50, max = 750_000_000, message = "price must be 50-750000000"))]
    pub regular_price: u64,
    /// Present only when `offer` is set
    pub discounted_price: Option<u64>,
    pub latitude: f64,
    pub longitude: f64,
    /// Non-empty, checked in [`check_submission`]
    pub images: Vec<ImageFile>,
}

/// Gate a draft before anything is uploaded or written. Rules run in order
/// and the first failure halts the submission:
///
/// 1. an offer's discounted price must be strictly below the regular price,
/// 2. at most [`MAX_IMAGES`] images, and at least one,
/// 3. the field constraints, re-checked here so a draft built outside the
///    input boundary cannot bypass them.
pub fn check_submission(draft: &ListingDraft) -> Result<()> {
    if draft.offer {
        let discounted = draft
            .discounted_price
            .ok_or_else(|| HearthError::invalid_input("discounted price is required for an offer"))?;
        if discounted >= draft.regular_price {
            return Err(HearthError::price_ordering());
        }
    }

    if draft.images.len() > MAX_IMAGES {
        return Err(HearthError::too_many_images(MAX_IMAGES));
    }

    // The image set carries raw bytes, so it stays outside the derive and is
    // checked by hand.
    if draft.images.is_empty() {
        return Err(HearthError::invalid_input("at least one image is required"));
    }

    draft.validate()?;

    if let Some(discounted) = draft.discounted_price {
        if !(50..=750_000_000).contains(&discounted) {
            return Err(HearthError::validation("price must be 50-750000000"));
        }
    }

    Ok(())
}

/// Listing document as persisted in the `listings` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "type")]
    pub kind: ListingKind,
    pub name: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub parking: bool,
    pub furnished: bool,
    pub location: String,
    pub offer: bool,
    pub regular_price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<u64>,
    pub image_urls: Vec<String>,
    pub geolocation: GeoPoint,
    pub user_ref: String,
    /// Assigned by the document store at write time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Build the document to persist: draft fields with the image files
    /// replaced by their URLs, owner attached, geolocation populated from
    /// the draft's coordinate pair. The timestamp is left to the store.
    pub fn from_draft(draft: &ListingDraft, image_urls: Vec<String>, user_ref: &str) -> Self {
        Self {
            kind: draft.kind,
            name: draft.name.clone(),
            bedrooms: draft.bedrooms,
            bathrooms: draft.bathrooms,
            parking: draft.parking,
            furnished: draft.furnished,
            location: draft.address.clone(),
            offer: draft.offer,
            regular_price: draft.regular_price,
            discounted_price: if draft.offer { draft.discounted_price } else { None },
            image_urls,
            geolocation: GeoPoint {
                lat: draft.latitude,
                lng: draft.longitude,
            },
            user_ref: user_ref.to_string(),
            created_at: None,
        }
    }

    /// The price a viewer pays: discounted when on offer
    pub fn effective_price(&self) -> u64 {
        if self.offer {
            self.discounted_price.unwrap_or(self.regular_price)
        } else {
            self.regular_price
        }
    }

    /// Amount saved when the listing is on offer
    pub fn discount(&self) -> Option<u64> {
        if self.offer {
            self.discounted_price
                .map(|d| self.regular_price.saturating_sub(d))
        } else {
            None
        }
    }
}

/// User profile document in the `users` collection, written at sign-up and
/// read when contacting a listing owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

pub async fn fetch_listing(store: &dyn DocumentStore, id: &str) -> Result<Listing> {
    let value: Value = store
        .get(LISTINGS_COLLECTION, id)
        .await?
        .ok_or_else(|| HearthError::listing_not_found(id))?;

    serde_json::from_value(value)
        .map_err(|e| HearthError::persistence(format!("malformed listing document: {}", e)))
}

pub async fn fetch_profile(store: &dyn DocumentStore, user_id: &str) -> Result<UserProfile> {
    let value: Value = store
        .get(USERS_COLLECTION, user_id)
        .await?
        .ok_or_else(|| HearthError::profile_not_found(user_id))?;

    serde_json::from_value(value)
        .map_err(|e| HearthError::persistence(format!("malformed profile document: {}", e)))
}

/// Read the selected image files off disk, keeping the selection order
pub async fn load_images(paths: &[std::path::PathBuf]) -> Result<Vec<ImageFile>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        images.push(load_image(path).await?);
    }
    Ok(images)
}

async fn load_image(path: &Path) -> Result<ImageFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| HearthError::invalid_input(format!("not a file: {}", path.display())))?
        .to_string();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| HearthError::file_read(format!("Failed to read image '{}'", path.display()), e))?;

    Ok(ImageFile { name, bytes })
}
