//! Domain models for the storefront catalog
//!
//! Records are persisted as camelCase JSON. Timestamps use RFC 3339 strings so
//! that a stored record reads back field-for-field equal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Genre filter value that matches every album.
pub const ALL_GENRES: &str = "All";

// =============================================================================
// User
// =============================================================================

/// The single local account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_artist: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub purchased_tracks: Vec<String>,
    /// One entry per purchase. Buying the same album twice lists it twice.
    #[serde(default)]
    pub purchased_albums: Vec<String>,
    #[serde(default)]
    pub downloaded_albums: Vec<String>,
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub followers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub social_links: BTreeMap<String, String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create an account with empty collections and a zero balance.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        is_artist: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            is_artist,
            profile_image: None,
            purchased_tracks: Vec::new(),
            purchased_albums: Vec::new(),
            downloaded_albums: Vec::new(),
            following: Vec::new(),
            followers: Vec::new(),
            bio: None,
            social_links: BTreeMap::new(),
            balance: 0.0,
            phone_number: None,
            created_at,
        }
    }

    pub fn has_purchased(&self, album_id: &str) -> bool {
        self.purchased_albums.iter().any(|id| id == album_id)
    }

    pub fn has_downloaded(&self, album_id: &str) -> bool {
        self.downloaded_albums.iter().any(|id| id == album_id)
    }

    /// Checks an account before it is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("User name cannot be empty".to_string());
        }

        if self.email.trim().is_empty() {
            return Err("User email cannot be empty".to_string());
        }

        if !self.balance.is_finite() {
            return Err("User balance must be a finite number".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Track
// =============================================================================

/// A song inside an album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Artist display name
    pub artist: String,
    pub artist_id: String,
    /// Display duration, `m:ss`
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    pub track_number: u32,
    pub price: f64,
    pub is_free: bool,
    #[serde(default)]
    pub stream_count: u64,
    #[serde(default)]
    pub purchase_count: u64,
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_downloaded: bool,
}

impl Track {
    /// Parse the `m:ss` display duration into seconds.
    ///
    /// Returns `None` for malformed strings or seconds outside `0..60`.
    pub fn duration_secs(&self) -> Option<u32> {
        parse_duration(&self.duration)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }

        if self.track_number == 0 {
            return Err("Track number must be positive".to_string());
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("Track price {} is invalid", self.price));
        }

        if self.duration_secs().is_none() {
            return Err(format!(
                "Track duration '{}' is not in m:ss form",
                self.duration
            ));
        }

        Ok(())
    }
}

/// Parse an `m:ss` duration string into seconds.
///
/// Both parts must be plain ASCII digits. Returns `None` when the total does
/// not fit in a `u32`.
pub fn parse_duration(value: &str) -> Option<u32> {
    let (minutes, seconds) = value.trim().split_once(':')?;
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(minutes) || seconds.len() != 2 || !all_digits(seconds) {
        return None;
    }

    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Render seconds as an `m:ss` duration string.
pub fn format_duration(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

// =============================================================================
// Album
// =============================================================================

/// A purchasable collection of tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub price: f64,
    pub cover_image_url: String,
    /// Ordered by track number
    pub tracks: Vec<Track>,
    pub created_at: DateTime<Utc>,
    pub genre: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_downloaded: bool,
}

impl Album {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Sum of all parseable track durations, in seconds.
    pub fn total_duration_secs(&self) -> u32 {
        self.tracks.iter().filter_map(Track::duration_secs).sum()
    }

    /// Case-insensitive genre match. `"All"` matches every album.
    pub fn matches_genre(&self, genre: &str) -> bool {
        genre.is_empty() || genre == ALL_GENRES || self.genre.eq_ignore_ascii_case(genre)
    }

    /// Checks a publishable album. The store itself saves albums as given;
    /// publishing flows call this first.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Album title cannot be empty".to_string());
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("Album price {} is invalid", self.price));
        }

        if self.tracks.is_empty() {
            return Err("Album must contain at least one track".to_string());
        }

        for track in &self.tracks {
            track
                .validate()
                .map_err(|e| format!("Track '{}': {}", track.id, e))?;
        }

        Ok(())
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// One row of the append-only purchase ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub album_id: String,
    pub purchase_date: DateTime<Utc>,
    pub price: f64,
}

/// Profile screen summary for the current user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub purchased_albums: usize,
    pub downloaded_albums: usize,
    pub uploaded_albums: usize,
    pub total_spent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
    }

    fn track(id: &str, number: u32, duration: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {}", id),
            artist: "Luna Eclipse".to_string(),
            artist_id: "artist1".to_string(),
            duration: duration.to_string(),
            file_url: None,
            preview_url: Some("https://cdn.example.com/preview.wav".to_string()),
            album_id: Some("1".to_string()),
            track_number: number,
            price: 2.5,
            is_free: false,
            stream_count: 0,
            purchase_count: 0,
            genre: "Electronic".to_string(),
            cover_image_url: None,
            created_at: created(),
            tags: vec!["ambient".to_string()],
            is_downloaded: false,
        }
    }

    fn album() -> Album {
        Album {
            id: "1".to_string(),
            title: "Midnight Vibes".to_string(),
            artist_id: "artist1".to_string(),
            artist_name: "Luna Eclipse".to_string(),
            price: 12.99,
            cover_image_url: "https://cdn.example.com/cover.jpg".to_string(),
            tracks: vec![track("1-1", 1, "4:32"), track("1-2", 2, "3:47")],
            created_at: created(),
            genre: "Electronic".to_string(),
            description: String::new(),
            is_downloaded: false,
        }
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4:32"), Some(272));
        assert_eq!(parse_duration("0:05"), Some(5));
        assert_eq!(parse_duration("12:00"), Some(720));
        assert_eq!(parse_duration("4:60"), None);
        assert_eq!(parse_duration("4:5"), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("3:+5"), None);
        assert_eq!(parse_duration("+3:05"), None);
        assert_eq!(parse_duration(":05"), None);
        assert_eq!(parse_duration("99999999:00"), None);
        assert_eq!(parse_duration("71582788:15"), Some(u32::MAX));
        assert_eq!(format_duration(272), "4:32");
        assert_eq!(format_duration(5), "0:05");
    }

    #[test]
    fn test_album_validation() {
        assert!(album().validate().is_ok());
        assert_eq!(album().total_duration_secs(), 272 + 227);

        let mut untitled = album();
        untitled.title = "   ".to_string();
        assert!(untitled.validate().is_err());

        let mut empty = album();
        empty.tracks.clear();
        assert!(empty.validate().is_err());

        let mut negative = album();
        negative.price = -1.0;
        assert!(negative.validate().is_err());

        let mut bad_track = album();
        bad_track.tracks[1].track_number = 0;
        let err = bad_track.validate().unwrap_err();
        assert!(err.contains("1-2"));
    }

    #[test]
    fn test_genre_matching() {
        let album = album();
        assert!(album.matches_genre("All"));
        assert!(album.matches_genre("electronic"));
        assert!(!album.matches_genre("Jazz"));
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let mut user = User::new("1718000000000", "Music Lover", "user@example.com", false, created());
        user.purchased_albums = vec!["1".to_string(), "2".to_string()];
        user.downloaded_albums = vec!["1".to_string(), "9".to_string()];

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["isArtist"], false);
        assert_eq!(json["purchasedAlbums"][1], "2");
        assert_eq!(json["createdAt"], "2024-05-01T08:30:00Z");
        assert!(json.get("bio").is_none());

    }

    #[test]
    fn test_user_missing_lists_default_to_empty() {
        let json = r#"{
            "id": "42",
            "name": "Ana",
            "email": "ana@example.com",
            "isArtist": true,
            "createdAt": "2024-05-01T08:30:00.250Z"
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.purchased_albums.is_empty());
        assert!(user.following.is_empty());
        assert_eq!(user.balance, 0.0);
        assert_eq!(user.created_at.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_user_validation() {
        let user = User::new("1", "Ana", "ana@example.com", false, created());
        assert!(user.validate().is_ok());

        let nameless = User::new("1", " ", "ana@example.com", false, created());
        assert!(nameless.validate().is_err());
    }
}
