//! Album upload form data and its validation.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use core_catalog::{parse_duration, Album, Track, User};
use serde::{Deserialize, Serialize};

/// Display duration given to tracks uploaded without one.
pub const DEFAULT_TRACK_DURATION: &str = "3:30";

/// Genre preselected on the upload form.
pub const DEFAULT_GENRE: &str = "Pop";

/// A track as entered on the upload form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDraft {
    pub title: String,
    /// `m:ss`; defaults to [`DEFAULT_TRACK_DURATION`]
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl TrackDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// An album as entered on the upload form.
///
/// `price` is the raw text of the price field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default = "default_genre")]
    pub genre: String,
    pub cover_image_url: String,
    #[serde(default)]
    pub tracks: Vec<TrackDraft>,
}

fn default_genre() -> String {
    DEFAULT_GENRE.to_string()
}

impl AlbumDraft {
    pub fn new(title: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            price: price.into(),
            genre: default_genre(),
            cover_image_url: String::new(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: TrackDraft) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_cover(mut self, url: impl Into<String>) -> Self {
        self.cover_image_url = url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the form fields in the order the upload screen reports them.
    ///
    /// Returns the parsed price.
    pub fn validate(&self) -> Result<f64> {
        if self.title.trim().is_empty() {
            return Err(CoreError::validation("title", "Please enter an album title"));
        }

        let price = self.price.trim();
        if price.is_empty() {
            return Err(CoreError::validation("price", "Please enter a price"));
        }
        let price: f64 = price
            .parse()
            .map_err(|_| CoreError::validation("price", format!("'{}' is not a number", price)))?;
        if !price.is_finite() {
            return Err(CoreError::validation("price", "Price must be a finite amount"));
        }
        if price < 0.0 {
            return Err(CoreError::validation("price", "Price cannot be negative"));
        }

        if self.tracks.is_empty() {
            return Err(CoreError::validation("tracks", "Please add at least one track"));
        }

        for (index, track) in self.tracks.iter().enumerate() {
            if track.title.trim().is_empty() {
                return Err(CoreError::validation(
                    "tracks",
                    format!("Track {} needs a title", index + 1),
                ));
            }
            if let Some(duration) = &track.duration {
                if parse_duration(duration).is_none() {
                    return Err(CoreError::validation(
                        "tracks",
                        format!("Track {} duration '{}' is not m:ss", index + 1, duration),
                    ));
                }
            }
        }

        Ok(price)
    }

    /// Build the album published by `artist`.
    ///
    /// Tracks are numbered from 1 in form order, free, and share the album's
    /// cover and genre.
    pub(crate) fn into_album(
        self,
        album_id: String,
        artist: &User,
        now: DateTime<Utc>,
    ) -> Result<Album> {
        let price = self.validate()?;
        let genre = if self.genre.trim().is_empty() {
            default_genre()
        } else {
            self.genre.trim().to_string()
        };

        let tracks = self
            .tracks
            .into_iter()
            .zip(1u32..)
            .map(|(draft, number)| Track {
                id: format!("{}-{}", album_id, number),
                title: draft.title.trim().to_string(),
                artist: artist.name.clone(),
                artist_id: artist.id.clone(),
                duration: draft
                    .duration
                    .unwrap_or_else(|| DEFAULT_TRACK_DURATION.to_string()),
                file_url: draft.file_url,
                preview_url: draft.preview_url,
                album_id: Some(album_id.clone()),
                track_number: number,
                price: 0.0,
                is_free: true,
                stream_count: 0,
                purchase_count: 0,
                genre: genre.clone(),
                cover_image_url: Some(self.cover_image_url.clone()),
                created_at: now,
                tags: Vec::new(),
                is_downloaded: false,
            })
            .collect();

        let album = Album {
            id: album_id,
            title: self.title.trim().to_string(),
            artist_id: artist.id.clone(),
            artist_name: artist.name.clone(),
            price,
            cover_image_url: self.cover_image_url,
            tracks,
            created_at: now,
            genre,
            description: self.description.trim().to_string(),
            is_downloaded: false,
        };

        album
            .validate()
            .map_err(|message| CoreError::validation("album", message))?;
        Ok(album)
    }
}
