use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{AgentRecord, DispatchRequest};

/// Client for a running swarmgate endpoint.
pub struct SwarmClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct SwarmResults {
    pub swarm_results: Map<String, Value>,
}

impl SwarmResults {
    /// Typed records in response order.
    pub fn records(&self) -> Result<Vec<(String, AgentRecord)>> {
        self.swarm_results
            .iter()
            .map(|(name, value)| {
                let record: AgentRecord = serde_json::from_value(value.clone())?;
                Ok((name.clone(), record))
            })
            .collect()
    }
}

impl SwarmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<SwarmResults> {
        let response = self
            .client
            .post(format!("{}/swarm", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("swarm request failed: {}", response.status()));
        }

        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        let body: Value = response.json().await?;
        let version = body["version"]
            .as_str()
            .ok_or_else(|| anyhow!("invalid health response"))?;

        Ok(version.to_string())
    }
}
