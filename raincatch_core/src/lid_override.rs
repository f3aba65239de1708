//! Remote lid-status override from the dashboard.

use raincatch_traits::HttpClient;
use serde::Deserialize;

use crate::remote::fetch_json;

/// Dashboard endpoint reporting the requested lid position.
pub const LID_UPDATE_PATH: &str = "/api/LidUpdate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum LidOverrideCommand {
    Open,
    Close,
    #[default]
    None,
}

#[derive(Debug, Deserialize)]
struct LidUpdate {
    #[serde(rename = "lidStatus")]
    lid_status: Option<serde_json::Value>,
}

impl LidOverrideCommand {
    /// Exact, case-sensitive match; anything else (including "reset") is `None`.
    pub fn parse(status: &str) -> Self {
        match status {
            "open" => Self::Open,
            "close" => Self::Close,
            _ => Self::None,
        }
    }
}

/// Fetch the override command. Every failure maps to `None`.
pub fn fetch_override(http: &mut dyn HttpClient, base_url: &str) -> LidOverrideCommand {
    let url = format!("{base_url}{LID_UPDATE_PATH}");
    match fetch_json::<LidUpdate>(http, &url) {
        Ok(LidUpdate {
            lid_status: Some(serde_json::Value::String(s)),
        }) => LidOverrideCommand::parse(&s),
        Ok(_) => LidOverrideCommand::None,
        Err(e) => {
            tracing::debug!(error = %e, "lid status query failed");
            LidOverrideCommand::None
        }
    }
}
