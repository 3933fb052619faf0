//! JSON envelope printed by every command, and the exit code behind it.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::error::Hint;
use crate::{Error, ErrorCode, Result};

/// `{"success": true, "data": ...}` or `{"success": false, "error": ...}`.
#[derive(Debug, Serialize)]
pub struct CliResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
}

impl From<&Error> for CliError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: err.hints.clone(),
        }
    }
}

impl CliResponse {
    pub fn from_result(result: &Result<Value>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data.clone()),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.into()),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))
    }
}

/// Serialize a command's output, pairing it with the exit code to use.
pub fn map_cmd_result_to_json<T: Serialize>(result: Result<(T, i32)>) -> (Result<Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(e) => (
                Err(Error::internal_json(e.to_string(), Some("serialize command output".to_string()))),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

/// Bad input (arguments or upgrade configs) exits 2; everything else 1.
pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidYaml
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::ValidationUnknownRule => 2,

        ErrorCode::RuleParseFailed
        | ErrorCode::RuleMergeConflict
        | ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalYamlError
        | ErrorCode::InternalUnexpected => 1,
    }
}

/// Print the envelope on stdout. A closed pipe is not an error.
pub fn print_json_result(result: Result<Value>) -> Result<()> {
    let payload = CliResponse::from_result(&result).to_json()?;

    match writeln!(io::stdout().lock(), "{}", payload) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            Err(Error::internal_io(e.to_string(), Some("write stdout".to_string())))
        }
        _ => Ok(()),
    }
}
