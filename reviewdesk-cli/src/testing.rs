//! In-memory review service for command tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use reviewdesk::client::{FormFields, ServiceReply, StageTransport};
use reviewdesk::config::{load_config_from_str, ClientConfig};
use reviewdesk::{Endpoint, InvokeError, ModelCatalog, Orchestrator};

/// Answers by endpoint so concurrent stages get deterministic replies.
/// Transforms echo their pasted text; the review names both of its inputs.
#[derive(Default)]
pub struct FakeService {
    failing: HashSet<Endpoint>,
    calls: Mutex<Vec<(Endpoint, FormFields)>>,
}

impl FakeService {
    pub fn failing(endpoints: &[Endpoint]) -> Self {
        Self {
            failing: endpoints.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<FormFields> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, form)| form.clone())
            .collect()
    }
}

#[async_trait]
impl StageTransport for FakeService {
    async fn post_form(&self, endpoint: Endpoint, form: FormFields) -> Result<ServiceReply, InvokeError> {
        self.calls.lock().unwrap().push((endpoint, form.clone()));
        if self.failing.contains(&endpoint) {
            return Err(InvokeError::Service {
                endpoint,
                status: 500,
                message: format!("{} is down", endpoint),
            });
        }

        let result = match endpoint {
            Endpoint::RunReview => format!(
                "Review of [{}] against [{}]",
                form.get_text("submission").unwrap_or_default(),
                form.get_text("checklist").unwrap_or_default()
            ),
            _ => format!("Organized: {}", form.get_text("pasted").unwrap_or("<file>")),
        };
        let mut body = Map::new();
        body.insert("result".to_string(), Value::String(result));
        Ok(ServiceReply::new(body))
    }

    async fn post_json(&self, _endpoint: Endpoint, _body: Value) -> Result<ServiceReply, InvokeError> {
        Ok(ServiceReply::default())
    }
}

pub fn orchestrator(service: &Arc<FakeService>) -> Arc<Orchestrator> {
    let transport: Arc<dyn StageTransport> = service.clone();
    Arc::new(Orchestrator::new(transport, ModelCatalog::default()))
}

pub fn config() -> ClientConfig {
    load_config_from_str(r#"{ "version": "1.0" }"#).unwrap()
}
