//! Domain error types.

/// A parse error with position information for value-expression parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("unresolvable value expression '{expression}': {reason}")]
    UnresolvableValueExpression { expression: String, reason: String },

    #[error("invalid trade bounds: {reason}")]
    InvalidTradeBounds { reason: String },

    #[error("invalid profit mode '{mode}' (expected realized or theoretical)")]
    InvalidProfitMode { mode: String },

    #[error("invalid price table: {reason}")]
    InvalidTable { reason: String },

    #[error("trade extraction exceeded {limit} iterations")]
    IterationLimit { limit: usize },

    #[error("invalid date range token '{token}': {reason}")]
    InvalidDateRange { token: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to load strategy {name}: {reason}")]
    StrategyLoad { name: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. }
            | TraderError::InvalidDateRange { .. } => 2,
            TraderError::Data { .. }
            | TraderError::InvalidTable { .. }
            | TraderError::MissingColumn { .. } => 3,
            TraderError::StrategyLoad { .. }
            | TraderError::UnknownOperator { .. }
            | TraderError::UnresolvableValueExpression { .. } => 4,
            TraderError::InvalidTradeBounds { .. }
            | TraderError::InvalidProfitMode { .. }
            | TraderError::IterationLimit { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
