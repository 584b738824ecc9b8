use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// An uploaded character portrait with its tagged metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: i64,
    /// Base64 image data
    #[serde(alias = "imageBlob")]
    pub blob: String,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub class: Vec<String>,
    pub age: Option<String>,
    pub race: Option<String>,
    pub culture: Option<String>,
    #[serde(default)]
    pub uploader: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note_count: u32,
}

impl Npc {
    pub fn class_display(&self) -> String {
        self.class.join(", ")
    }
}

/// Raw image file for an upload.
#[derive(Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Guess the mime type from the file extension, defaulting to PNG.
    pub fn from_path_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let mime_type = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "image/png",
        };
        Self::new(file_name, mime_type, bytes)
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Upload request for `POST /npcs`.
#[derive(Debug, Clone)]
pub struct NewNpc {
    pub file: ImageFile,
    pub gender: Option<Gender>,
    pub class: Vec<String>,
    pub age: Option<String>,
    pub race: Option<String>,
    pub culture: Option<String>,
}

impl NewNpc {
    pub fn new(file: ImageFile) -> Self {
        Self {
            file,
            gender: None,
            class: Vec::new(),
            age: None,
            race: None,
            culture: None,
        }
    }
}

/// Partial update for `PUT /npcs/:id`. Unset fields are left out of the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct NpcUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
}

impl NpcUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Input for the name generator endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct NameRequest {
    pub gender: Gender,
    pub culture: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse_and_display() {
        assert_eq!("Male".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!(" female ".parse::<Gender>(), Ok(Gender::Female));
        assert!("other".parse::<Gender>().is_err());
        assert_eq!(Gender::Female.to_string(), "female");
    }

    #[test]
    fn test_parse_npc_with_image_blob_alias() {
        let json = r#"{
            "id": 12,
            "imageBlob": "iVBORw0KGgo=",
            "gender": "male",
            "class": ["warrior", "mage"],
            "age": "adult",
            "race": "human",
            "culture": "pyarroni",
            "uploader": {"id": 1, "username": "a"},
            "createdAt": "2021-03-01T10:00:00Z",
            "modifiedAt": "2021-03-02T10:00:00Z",
            "noteCount": 2
        }"#;
        let npc: Npc = serde_json::from_str(json).unwrap();
        assert_eq!(npc.blob, "iVBORw0KGgo=");
        assert_eq!(npc.gender, Some(Gender::Male));
        assert_eq!(npc.class_display(), "warrior, mage");
        assert_eq!(npc.uploader.as_ref().map(|u| u.id), Some(1));
        assert_eq!(npc.note_count, 2);
    }

    #[test]
    fn test_npc_update_omits_unset_fields() {
        let update = NpcUpdate {
            race: Some("elf".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({"race": "elf"}));
        assert!(NpcUpdate::default().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_image_file_mime_guess() {
        assert_eq!(ImageFile::from_path_bytes("a.JPG", vec![]).mime_type, "image/jpeg");
        assert_eq!(ImageFile::from_path_bytes("portrait", vec![]).mime_type, "image/png");
    }
}
