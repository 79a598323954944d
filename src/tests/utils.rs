//! Test fixture builders

#[cfg(test)]
pub mod test_helpers {
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use crate::auth::Session;
    use crate::listing::{ImageFile, ListingDraft, ListingKind};
    use crate::session::StoredSession;

    /// Create a temporary directory for testing
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    /// A fresh authenticated session for the given user
    pub fn session(user_id: &str) -> Session {
        Session {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            display_name: None,
            id_token: format!("id-token-{}", user_id),
            refresh_token: format!("refresh-token-{}", user_id),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    /// A stored session as it would sit on disk
    pub fn stored_session(user_id: &str) -> StoredSession {
        let now = Utc::now();
        StoredSession {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            display_name: Some("Test User".to_string()),
            id_token: format!("id-token-{}", user_id),
            refresh_token: format!("refresh-token-{}", user_id),
            expires_at: now + Duration::hours(1),
            created_at: now,
            updated_at: now,
        }
    }

    /// A small in-memory image file
    pub fn image(name: &str) -> ImageFile {
        ImageFile {
            name: name.to_string(),
            bytes: vec![0xAB; 64],
        }
    }

    pub fn images(count: usize) -> Vec<ImageFile> {
        (0..count).map(|i| image(&format!("photo-{}.jpg", i))).collect()
    }

    /// A draft that passes every submission rule as-is
    pub fn valid_draft() -> ListingDraft {
        ListingDraft {
            kind: ListingKind::Rent,
            name: "Sunny riverside duplex".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            parking: false,
            furnished: true,
            address: "12 River Rd".to_string(),
            offer: false,
            regular_price: 1800,
            discounted_price: None,
            latitude: 0.0,
            longitude: 0.0,
            images: vec![image("front.jpg")],
        }
    }

    pub fn draft_with_images(count: usize) -> ListingDraft {
        let mut draft = valid_draft();
        draft.images = images(count);
        draft
    }
}
