use reqwest::Method;

use crate::models::{NotePreview, User};

use super::{ApiClient, Result};

const PREVIEW_PATH: &str = "/preview";

impl ApiClient {
    /// Fetch all users (used for the uploader filter)
    pub async fn users(&self) -> Result<Vec<User>> {
        self.get("/users", &[]).await
    }

    /// Full URL of a note's public preview page
    pub fn preview_url(&self, hash: &str) -> Result<String> {
        Ok(self.url(&Self::segment_path(PREVIEW_PATH, hash)?))
    }

    /// Fetch the public preview card of a note by its hash.
    ///
    /// Sent without credentials when the deployment serves previews publicly.
    pub async fn preview(&self, hash: &str) -> Result<NotePreview> {
        let path = Self::segment_path(PREVIEW_PATH, hash)?;
        if self.public_preview {
            let response = self.send_public(Method::GET, &path).await?;
            Self::parse_json(response).await
        } else {
            self.get(&path, &[]).await
        }
    }
}
