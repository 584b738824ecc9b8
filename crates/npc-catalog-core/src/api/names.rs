use reqwest::Method;

use crate::models::NameRequest;

use super::{ApiClient, Result};

impl ApiClient {
    fn name_params(request: &NameRequest) -> Vec<(String, String)> {
        vec![
            ("gender".to_string(), request.gender.to_string()),
            ("culture".to_string(), request.culture.clone()),
        ]
    }

    /// Generate one random name for a gender and culture
    pub async fn generate_name(&self, request: &NameRequest) -> Result<String> {
        let query = Self::name_params(request);
        let response = self
            .send_authorized(Method::GET, "/names/generate", |req| req.query(&query))
            .await?;
        let body = response.text().await?;
        Ok(Self::parse_name(&body))
    }

    /// Generate a list of names. `count` is left to the server when None.
    pub async fn generate_names(&self, request: &NameRequest, count: Option<u32>) -> Result<Vec<String>> {
        let mut query = Self::name_params(request);
        if let Some(count) = count {
            query.push(("count".to_string(), count.to_string()));
        }
        self.get("/names/generate-list", &query).await
    }

    /// The name endpoint answers either a JSON string or plain text.
    fn parse_name(body: &str) -> String {
        serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_string())
    }
}
