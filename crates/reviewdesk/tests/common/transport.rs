//! Scripted in-memory transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use reviewdesk::client::{FormFields, ServiceReply, StageTransport};
use reviewdesk::{Endpoint, InvokeError};

type Outcome = Result<ServiceReply, InvokeError>;

/// Builds a successful stage reply carrying `result`.
pub fn reply(result: &str) -> Outcome {
    let mut body = Map::new();
    body.insert("result".to_string(), Value::String(result.to_string()));
    Ok(ServiceReply::new(body))
}

/// A call as it reached the transport.
#[derive(Debug, Clone)]
pub enum RecordedCall {
    Form { endpoint: Endpoint, form: FormFields },
    Json { endpoint: Endpoint, body: Value },
}

impl RecordedCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            RecordedCall::Form { endpoint, .. } | RecordedCall::Json { endpoint, .. } => *endpoint,
        }
    }

    pub fn form(&self) -> &FormFields {
        match self {
            RecordedCall::Form { form, .. } => form,
            RecordedCall::Json { .. } => panic!("expected a multipart call"),
        }
    }

    pub fn json(&self) -> &Value {
        match self {
            RecordedCall::Json { body, .. } => body,
            RecordedCall::Form { .. } => panic!("expected a JSON call"),
        }
    }
}

enum Step {
    Ready(Outcome),
    Held(oneshot::Receiver<Outcome>),
}

/// Answers calls in order from a script. Once the script is exhausted every
/// call succeeds with the result `"ok"`.
#[derive(Default)]
pub struct ScriptedTransport {
    calls: Mutex<Vec<RecordedCall>>,
    script: Mutex<VecDeque<Step>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an immediate answer.
    pub fn then(&self, outcome: Outcome) -> &Self {
        self.script.lock().unwrap().push_back(Step::Ready(outcome));
        self
    }

    /// Queues an answer that is only delivered when the returned sender fires.
    pub fn then_hold(&self) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().push_back(Step::Held(rx));
        tx
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint() == endpoint)
            .collect()
    }

    /// Yields until at least `n` calls have been made.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn answer(&self, call: RecordedCall) -> Outcome {
        let step = {
            self.calls.lock().unwrap().push(call);
            self.script.lock().unwrap().pop_front()
        };
        match step {
            Some(Step::Ready(outcome)) => outcome,
            Some(Step::Held(rx)) => rx.await.unwrap_or_else(|_| reply("dropped")),
            None => reply("ok"),
        }
    }
}

#[async_trait]
impl StageTransport for ScriptedTransport {
    async fn post_form(&self, endpoint: Endpoint, form: FormFields) -> Outcome {
        self.answer(RecordedCall::Form { endpoint, form }).await
    }

    async fn post_json(&self, endpoint: Endpoint, body: Value) -> Outcome {
        self.answer(RecordedCall::Json { endpoint, body }).await
    }
}
