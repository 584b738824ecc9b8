use reqwest::multipart::{Form, Part};
use reqwest::Method;

use crate::models::{ImageFile, NewNpc, Npc, NpcUpdate, Paginated, Pagination};

use super::query::{list_params, Resource};
use super::{ApiClient, Result};

/// Multipart field carrying one class tag; repeated per tag
const CLASS_FIELD: &str = "class[]";

/// Text parts of an upload, in send order.
///
/// Optional scalars appear only when set. Class tags are trimmed and blank
/// tags dropped.
fn upload_fields(npc: &NewNpc) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    let scalars = [
        ("age", npc.age.clone()),
        ("culture", npc.culture.clone()),
        ("gender", npc.gender.map(|g| g.to_string())),
        ("race", npc.race.clone()),
    ];
    for (name, value) in scalars {
        if let Some(value) = value {
            fields.push((name, value));
        }
    }
    for class in &npc.class {
        let class = class.trim();
        if !class.is_empty() {
            fields.push((CLASS_FIELD, class.to_string()));
        }
    }
    fields
}

fn file_part(file: &ImageFile) -> Part {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    part().mime_str(&file.mime_type).unwrap_or_else(|_| part())
}

fn upload_form(npc: &NewNpc) -> Form {
    upload_fields(npc)
        .into_iter()
        .fold(Form::new().part("file", file_part(&npc.file)), |form, (name, value)| {
            form.text(name, value)
        })
}

impl ApiClient {
    /// Fetch one page of images matching the pagination's filter
    pub async fn npcs(&self, pagination: &Pagination) -> Result<Paginated<Npc>> {
        let query = list_params(pagination, Resource::Npcs);
        self.get("/npcs", &query).await
    }

    /// Upload a new image as multipart form data
    pub async fn create_npc(&self, npc: &NewNpc) -> Result<Npc> {
        let response = self
            .send_authorized(Method::POST, "/npcs", |req| req.multipart(upload_form(npc)))
            .await?;
        Self::parse_json(response).await
    }

    pub async fn update_npc(&self, id: i64, update: &NpcUpdate) -> Result<Npc> {
        self.put(&format!("/npcs/{}", id), update).await
    }

    pub async fn delete_npc(&self, id: i64) -> Result<()> {
        self.delete(&format!("/npcs/{}", id)).await
    }

    /// Class tags known to the backend, optionally narrowed by a substring
    pub async fn available_classes(&self, filter: Option<&str>) -> Result<Vec<String>> {
        let query = [("filter".to_string(), filter.unwrap_or_default().to_string())];
        self.get("/npcs/classes", &query).await
    }
}
