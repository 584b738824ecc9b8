//! Query-string building for the paginated list endpoints.
//!
//! Filter fields are looked up in a per-resource table that decides which
//! fields a listing accepts and what the backend calls them. Images and
//! notes disagree on the uploader field: `uploaderId` for images,
//! `createdById` for notes.

use serde_json::Value;

use crate::models::{Filter, Pagination};

/// A paginated listing with its own filter vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Npcs,
    Notes,
}

/// (filter field, query parameter) pairs accepted by `/npcs`
const NPC_FILTER_FIELDS: &[(&str, &str)] = &[
    ("gender", "gender"),
    ("class", "class"),
    ("age", "age"),
    ("race", "race"),
    ("culture", "culture"),
    ("uploaderId", "uploaderId"),
];

/// (filter field, query parameter) pairs accepted by `/notes`
const NOTE_FILTER_FIELDS: &[(&str, &str)] = &[
    ("gender", "gender"),
    ("class", "class"),
    ("age", "age"),
    ("race", "race"),
    ("culture", "culture"),
    ("uploaderId", "createdById"),
    ("name", "name"),
    ("description", "description"),
];

impl Resource {
    fn filter_fields(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Resource::Npcs => NPC_FILTER_FIELDS,
            Resource::Notes => NOTE_FILTER_FIELDS,
        }
    }

    /// Query parameter name for a filter field, or None if not accepted
    pub fn param_name(self, field: &str) -> Option<&'static str> {
        self.filter_fields()
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, param)| *param)
    }
}

/// Render a JSON scalar as a query value. Null and empty strings yield None.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Filter as query pairs, with empty fields stripped and names mapped for
/// `resource`. Values are otherwise passed through verbatim.
pub fn filter_params(filter: &Filter, resource: Resource) -> Vec<(String, String)> {
    let Ok(Value::Object(fields)) = serde_json::to_value(filter) else {
        return Vec::new();
    };

    resource
        .filter_fields()
        .iter()
        .filter_map(|(field, param)| {
            let value = fields.get(*field).and_then(query_value)?;
            Some((param.to_string(), value))
        })
        .collect()
}

/// Pagination keys followed by the flattened filter.
pub fn list_params(pagination: &Pagination, resource: Resource) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_string(), pagination.page.to_string()),
        ("limit".to_string(), pagination.limit.to_string()),
    ];
    if let Some(sort) = pagination.sort.as_deref().filter(|s| !s.is_empty()) {
        params.push(("sort".to_string(), sort.to_string()));
    }
    if let Some(order) = pagination.order.as_deref().filter(|s| !s.is_empty()) {
        params.push(("order".to_string(), order.to_string()));
    }
    params.extend(filter_params(&pagination.filter, resource));
    params
}
