use std::fmt;

use serde::Serialize;

/// Remote service endpoints consumed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// JSON body, not multipart.
    SetApiKeys,
    TransformSubmission,
    TransformChecklist,
    RunReview,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::SetApiKeys => "/set_api_keys",
            Endpoint::TransformSubmission => "/transform_submission",
            Endpoint::TransformChecklist => "/transform_checklist",
            Endpoint::RunReview => "/run_review",
        }
    }

    /// Joins the endpoint path onto a base URL, tolerating a trailing slash.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
