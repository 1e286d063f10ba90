//! Core domain types: identifiers, catalog records, events, recommendations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// User identifier. Ordering is the lexicographic order of the raw id.
    UserId
);

string_id!(
    /// Catalog item identifier. Ordering is the lexicographic order of the raw id.
    ItemId
);

/// User record. Demographics are opaque to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub region: Option<String>,
}

impl User {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            age: None,
            gender: None,
            region: None,
        }
    }
}

/// Catalog item. `content_type` and `genre` are display metadata and the
/// basis of the optional item-type filter; they never enter the similarity math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub title: String,
    pub content_type: String,
    pub genre: String,
}

impl Item {
    pub fn new(
        item_id: impl Into<ItemId>,
        title: impl Into<String>,
        content_type: impl Into<String>,
        genre: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            title: title.into(),
            content_type: content_type.into(),
            genre: genre.into(),
        }
    }

    /// Case-insensitive content type match
    pub fn is_content_type(&self, content_type: &str) -> bool {
        self.content_type.eq_ignore_ascii_case(content_type)
    }
}

/// A single raw interaction event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Event kind, e.g. `play`, `complete`, `like`
    pub event_type: String,
    pub watch_seconds: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(
        user_id: impl Into<UserId>,
        item_id: impl Into<ItemId>,
        event_type: impl Into<String>,
        watch_seconds: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            event_type: event_type.into(),
            watch_seconds,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Where a recommended item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationOrigin {
    /// Item-based collaborative filtering over the user's history
    Collaborative,
    /// Global popularity ranking
    Popularity,
}

/// A ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: ItemId,
    /// Collaborative score for `Collaborative` items, popularity aggregate otherwise
    pub score: f64,
    /// History item contributing the largest share of `score`
    pub source_item: Option<ItemId>,
    pub origin: RecommendationOrigin,
}

/// Why a request was answered from the popularity ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The user id is not present in any event or user record
    UnknownUser,
    /// Known user without any positive interaction score
    EmptyHistory,
}

/// Whether a result list is personalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "reason", rename_all = "snake_case")]
pub enum RecommendationMode {
    Personalized,
    Fallback(FallbackReason),
}

/// Ordered recommendations for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub user_id: UserId,
    pub mode: RecommendationMode,
    pub items: Vec<Recommendation>,
}

impl RecommendationList {
    pub fn is_fallback(&self) -> bool {
        matches!(self.mode, RecommendationMode::Fallback(_))
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self.mode {
            RecommendationMode::Fallback(reason) => Some(reason),
            RecommendationMode::Personalized => None,
        }
    }

    pub fn item_ids(&self) -> Vec<&ItemId> {
        self.items.iter().map(|r| &r.item_id).collect()
    }
}

/// An item with its aggregate popularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularItem {
    pub item_id: ItemId,
    pub score: f64,
}
