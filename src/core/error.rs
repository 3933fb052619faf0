use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidYaml,
    ConfigInvalidValue,

    ValidationInvalidArgument,
    ValidationUnknownRule,

    RuleParseFailed,
    RuleMergeConflict,

    InternalIoError,
    InternalJsonError,
    InternalYamlError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationUnknownRule => "validation.unknown_rule",

            ErrorCode::RuleParseFailed => "rule.parse_failed",
            ErrorCode::RuleMergeConflict => "rule.merge_conflict",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalYamlError => "internal.yaml_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParseDetails {
    pub path: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleParseDetails {
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflictDetails {
    pub key: String,
    pub existing_kind: String,
    pub incoming_kind: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_unknown_rule(name: impl Into<String>, known: Vec<String>) -> Self {
        let name = name.into();
        let details = to_details(InvalidArgumentDetails {
            field: "rule".to_string(),
            problem: format!("Unknown rule '{}'", name),
            id: Some(name.clone()),
            tried: Some(known),
        });

        Self::new(
            ErrorCode::ValidationUnknownRule,
            format!("Unknown rule '{}'", name),
            details,
        )
        .with_hint("Run 'upgrader rules' to see available rules")
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigParseDetails {
            path: path.into(),
            error: err.to_string(),
            line: Some(err.line()),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in upgrade config",
            details,
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, err: serde_yml::Error) -> Self {
        let details = to_details(ConfigParseDetails {
            path: path.into(),
            error: err.to_string(),
            line: err.location().map(|l| l.line()),
        });

        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in upgrade config",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid upgrade config value",
            details,
        )
    }

    /// A rule could not parse the contents it was handed.
    ///
    /// `message` is the parser's own message; rules surface it verbatim
    /// as the warning text.
    pub fn rule_parse_failed(line: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::RuleParseFailed,
            message.clone(),
            to_details(RuleParseDetails {
                line,
                error: message,
            }),
        )
    }

    pub fn rule_merge_conflict(
        key: impl Into<String>,
        existing_kind: impl Into<String>,
        incoming_kind: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let details = to_details(MergeConflictDetails {
            key: key.clone(),
            existing_kind: existing_kind.into(),
            incoming_kind: incoming_kind.into(),
        });

        Self::new(
            ErrorCode::RuleMergeConflict,
            format!(
                "Renamed key '{}' collides with an existing key and only lists can be merged",
                key
            ),
            details,
        )
        .with_hint("Resolve the duplicate key by hand, then re-run the upgrade")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_yaml(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalYamlError, "YAML error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    /// Line a rule-level error is anchored at, 0 when unknown.
    pub fn line(&self) -> usize {
        self.details
            .get("line")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(0)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
