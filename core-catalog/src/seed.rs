//! First-run sample catalog and demo account data.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Album, Purchase, Track};

/// Album ids granted to a new demo account.
pub const SAMPLE_PURCHASED_ALBUMS: &[&str] = &["1", "2"];

/// Album ids already downloaded on a new demo account.
pub const SAMPLE_DOWNLOADED_ALBUMS: &[&str] = &["1"];

const PREVIEW_BELL: &str = "https://www.soundjay.com/misc/sounds/bell-ringing-05.wav";
const PREVIEW_CHIME: &str = "https://www.soundjay.com/misc/sounds/magic-chime-02.wav";
const PREVIEW_CLOCK: &str = "https://www.soundjay.com/misc/sounds/clock-chimes-01.wav";

fn cover(photo_id: u32) -> String {
    format!(
        "https://images.pexels.com/photos/{id}/pexels-photo-{id}.jpeg?auto=compress&cs=tinysrgb&w=400",
        id = photo_id
    )
}

struct AlbumSeed {
    id: &'static str,
    title: &'static str,
    artist_id: &'static str,
    artist_name: &'static str,
    price: f64,
    photo_id: u32,
    age_days: i64,
    genre: &'static str,
    description: &'static str,
    tracks: &'static [TrackSeed],
}

struct TrackSeed {
    title: &'static str,
    duration: &'static str,
    price: f64,
    streams: u64,
    purchases: u64,
    preview: &'static str,
    tags: &'static [&'static str],
}

const SAMPLE_ALBUMS: &[AlbumSeed] = &[
    AlbumSeed {
        id: "1",
        title: "Midnight Vibes",
        artist_id: "artist1",
        artist_name: "Luna Eclipse",
        price: 12.99,
        photo_id: 1763075,
        age_days: 30,
        genre: "Electronic",
        description: "A collection of ambient electronic tracks perfect for late-night listening.",
        tracks: &[
            TrackSeed {
                title: "Neon Dreams",
                duration: "4:32",
                price: 2.50,
                streams: 15420,
                purchases: 89,
                preview: PREVIEW_BELL,
                tags: &["electronic", "ambient", "chill"],
            },
            TrackSeed {
                title: "City Lights",
                duration: "3:47",
                price: 2.50,
                streams: 12890,
                purchases: 67,
                preview: PREVIEW_CHIME,
                tags: &["electronic", "upbeat"],
            },
        ],
    },
    AlbumSeed {
        id: "2",
        title: "Acoustic Soul",
        artist_id: "artist2",
        artist_name: "River Stone",
        price: 9.99,
        photo_id: 1190297,
        age_days: 15,
        genre: "Acoustic",
        description: "Heartfelt acoustic melodies that speak to the soul.",
        tracks: &[
            TrackSeed {
                title: "Morning Coffee",
                duration: "3:28",
                price: 1.99,
                streams: 8920,
                purchases: 45,
                preview: PREVIEW_CHIME,
                tags: &["acoustic", "folk", "morning"],
            },
            TrackSeed {
                title: "River Flow",
                duration: "4:12",
                price: 1.99,
                streams: 7340,
                purchases: 38,
                preview: PREVIEW_CLOCK,
                tags: &["acoustic", "nature"],
            },
        ],
    },
    AlbumSeed {
        id: "3",
        title: "Beat Drop",
        artist_id: "artist3",
        artist_name: "DJ Thunder",
        price: 15.99,
        photo_id: 1105666,
        age_days: 7,
        genre: "EDM",
        description: "High-energy electronic dance music to get you moving.",
        tracks: &[
            TrackSeed {
                title: "Bass Explosion",
                duration: "5:43",
                price: 2.99,
                streams: 23410,
                purchases: 156,
                preview: PREVIEW_BELL,
                tags: &["edm", "bass", "party"],
            },
            TrackSeed {
                title: "Rhythm Machine",
                duration: "4:28",
                price: 2.99,
                streams: 18750,
                purchases: 134,
                preview: PREVIEW_CHIME,
                tags: &["edm", "rhythm"],
            },
        ],
    },
    AlbumSeed {
        id: "4",
        title: "Jazz Nights",
        artist_id: "artist4",
        artist_name: "Smooth Quartet",
        price: 11.99,
        photo_id: 1407322,
        age_days: 45,
        genre: "Jazz",
        description: "Smooth jazz compositions for elegant evenings.",
        tracks: &[TrackSeed {
            title: "Blue Moon",
            duration: "6:22",
            price: 2.25,
            streams: 9840,
            purchases: 72,
            preview: PREVIEW_CLOCK,
            tags: &["jazz", "smooth", "classic"],
        }],
    },
    AlbumSeed {
        id: "5",
        title: "Rock Anthem",
        artist_id: "artist5",
        artist_name: "Electric Storm",
        price: 13.99,
        photo_id: 1540406,
        age_days: 22,
        genre: "Rock",
        description: "Powerful rock anthems with electrifying guitar solos.",
        tracks: &[TrackSeed {
            title: "Thunder Strike",
            duration: "4:18",
            price: 2.99,
            streams: 16780,
            purchases: 98,
            preview: PREVIEW_BELL,
            tags: &["rock", "electric", "powerful"],
        }],
    },
];

impl AlbumSeed {
    fn build(&self, now: DateTime<Utc>) -> Album {
        let created_at = now - Duration::days(self.age_days);
        let cover_url = cover(self.photo_id);

        let tracks = self
            .tracks
            .iter()
            .zip(1u32..)
            .map(|(seed, number)| Track {
                id: format!("{}-{}", self.id, number),
                title: seed.title.to_string(),
                artist: self.artist_name.to_string(),
                artist_id: self.artist_id.to_string(),
                duration: seed.duration.to_string(),
                file_url: None,
                preview_url: Some(seed.preview.to_string()),
                album_id: Some(self.id.to_string()),
                track_number: number,
                price: seed.price,
                is_free: false,
                stream_count: seed.streams,
                purchase_count: seed.purchases,
                genre: self.genre.to_string(),
                cover_image_url: Some(cover_url.clone()),
                created_at,
                tags: seed.tags.iter().map(|t| t.to_string()).collect(),
                is_downloaded: false,
            })
            .collect();

        Album {
            id: self.id.to_string(),
            title: self.title.to_string(),
            artist_id: self.artist_id.to_string(),
            artist_name: self.artist_name.to_string(),
            price: self.price,
            cover_image_url: cover_url,
            tracks,
            created_at,
            genre: self.genre.to_string(),
            description: self.description.to_string(),
            is_downloaded: false,
        }
    }
}

/// The five sample albums, backdated relative to `now`.
pub fn sample_albums(now: DateTime<Utc>) -> Vec<Album> {
    SAMPLE_ALBUMS.iter().map(|seed| seed.build(now)).collect()
}

/// Ledger rows matching [`SAMPLE_PURCHASED_ALBUMS`]: album `1` five days
/// ago and album `2` three days ago, priced as the sample albums.
///
/// Ids are `now_millis` and `now_millis + 1`.
pub fn sample_purchases(user_id: &str, now: DateTime<Utc>) -> Vec<Purchase> {
    let base_id = now.timestamp_millis();
    [("1", 5, 12.99), ("2", 3, 9.99)]
        .iter()
        .zip(0i64..)
        .map(|(&(album_id, days_ago, price), offset)| Purchase {
            id: (base_id + offset).to_string(),
            user_id: user_id.to_string(),
            album_id: album_id.to_string(),
            purchase_date: now - Duration::days(days_ago),
            price,
        })
        .collect()
}
