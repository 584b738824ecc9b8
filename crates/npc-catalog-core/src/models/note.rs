use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Npc, User};

/// Free-text annotation attached to an image.
///
/// `hash` is assigned by the backend and is the only way to reach the public
/// preview of a note; it is never derived locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    #[serde(alias = "imageEntity")]
    pub npc: Option<Npc>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    pub created_by: Option<User>,
    pub modified_by: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    /// Id of the image the note is attached to
    pub npc: i64,
    pub name: String,
    pub description: String,
    pub is_private: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

/// Public read-only card served by `/preview/:hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct NotePreview {
    pub blob: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
