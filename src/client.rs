use crate::error::Result;
use crate::events::Event;
use crate::prog::ingest;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// Thin transport against an ingest node: pipeline simulation and
/// installation. Responses are returned raw for the caller to print.
pub struct IngestClient {
    host: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct SimulateRequest<'a> {
    pipeline: &'a ingest::Pipeline,
    docs: Vec<Value>,
}

impl IngestClient {
    pub fn new(host: &str) -> Self {
        IngestClient {
            host: host.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Run the pipeline against sample events via the simulate API.
    pub async fn simulate(
        &self,
        pipeline: &ingest::Pipeline,
        events: &[Event],
        verbose: bool,
    ) -> Result<String> {
        let request = SimulateRequest {
            pipeline,
            docs: events
                .iter()
                .map(|event| json!({ "_source": event }))
                .collect(),
        };

        let mut url = format!("{}/_ingest/pipeline/_simulate?pretty", self.host);
        if verbose {
            url.push_str("&verbose");
        }
        debug!(%url, docs = request.docs.len(), "simulating pipeline");

        let response = self.http.post(&url).json(&request).send().await?;
        Ok(response.text().await?)
    }

    /// Install the pipeline under `id`.
    pub async fn install(&self, id: &str, pipeline: &ingest::Pipeline) -> Result<String> {
        let url = format!("{}/_ingest/pipeline/{}?pretty", self.host, id);
        debug!(%url, "installing pipeline");

        let response = self.http.put(&url).json(pipeline).send().await?;
        Ok(response.text().await?)
    }
}
