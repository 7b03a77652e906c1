pub mod config;
pub mod doctor;
pub mod itemsets;
pub mod mine;
pub mod normalize;
pub mod stat;
pub mod suggest;

use anyhow::{bail, Context};
use basket_core::domain::GoodId;
use basket_core::errors::ApplicationError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Exit code for arguments that parse on the command line but make no sense.
pub const INVALID_ARGUMENT_EXIT: u8 = 64;

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success carrying a structured payload under `data`.
    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => return Self::failure(command, "serialization", error.to_string(), 1),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: impl Into<ApplicationError>) -> Self {
        let error = error.into();
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }

    pub fn invalid_argument(command: &str, error: &anyhow::Error) -> Self {
        Self::failure(command, "invalid_argument", format!("{error:#}"), INVALID_ARGUMENT_EXIT)
    }
}

/// Parses a comma separated list of good ids such as `3, 7,12`.
pub fn parse_good_ids(raw: &str) -> anyhow::Result<Vec<GoodId>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let id = part.parse::<u32>().with_context(|| format!("`{part}` is not a good id"))?;
        ids.push(GoodId(id));
    }
    Ok(ids)
}

/// Like [`parse_good_ids`], but at least one id is required.
pub fn parse_required_good_ids(flag: &str, raw: &str) -> anyhow::Result<Vec<GoodId>> {
    let ids = parse_good_ids(raw).with_context(|| format!("invalid value for --{flag}"))?;
    if ids.is_empty() {
        bail!("--{flag} needs at least one good id");
    }
    Ok(ids)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
