use crate::models::{NewNote, Note, NoteUpdate, Paginated, Pagination};

use super::query::{list_params, Resource};
use super::{ApiClient, Result};

impl ApiClient {
    /// Fetch one page of notes. The uploader filter is sent as `createdById`.
    pub async fn notes(&self, pagination: &Pagination) -> Result<Paginated<Note>> {
        let query = list_params(pagination, Resource::Notes);
        self.get("/notes", &query).await
    }

    pub async fn create_note(&self, note: &NewNote) -> Result<Note> {
        self.post("/notes", note).await
    }

    pub async fn update_note(&self, id: i64, update: &NoteUpdate) -> Result<Note> {
        self.put(&format!("/notes/{}", id), update).await
    }

    pub async fn delete_note(&self, id: i64) -> Result<()> {
        self.delete(&format!("/notes/{}", id)).await
    }
}
