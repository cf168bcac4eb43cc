//! Domain error types.

/// A parse error with position information for expression parsing.
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

/// Failure while evaluating an expression string against a scope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0} is not defined")]
    UnknownIdentifier(String),

    #[error("unknown function {0}()")]
    UnknownFunction(String),

    #[error("{name}() expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
}

/// Top-level error type for rulesim.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid strategy: {reason}")]
    InvalidStrategy { reason: String },

    #[error("candle series is empty")]
    NoCandles,

    #[error("candle data error: {reason}")]
    CandleData { reason: String },

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

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SimError::Io(_) => 1,
            SimError::ConfigParse { .. }
            | SimError::ConfigMissing { .. }
            | SimError::ConfigInvalid { .. } => 2,
            SimError::CandleData { .. } | SimError::NoCandles => 3,
            SimError::InvalidStrategy { .. } | SimError::Json(_) => 4,
            SimError::Csv(_) => 5,
        }
    }
}

impl From<&SimError> for std::process::ExitCode {
    fn from(err: &SimError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "unexpected character '#'".into(),
            position: 4,
        };
        let rendered = err.display_with_context("a + # b");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "a + # b");
        assert_eq!(lines[1], "    ^");
        assert!(lines[2].contains("position 4"));
    }

    #[test]
    fn expr_error_messages() {
        assert_eq!(
            ExprError::UnknownIdentifier("foo".into()).to_string(),
            "foo is not defined"
        );
        let arity = ExprError::Arity {
            name: "abs".into(),
            expected: "1",
            got: 2,
        };
        assert_eq!(arity.to_string(), "abs() expects 1 argument(s), got 2");
    }

    #[test]
    fn exit_codes_by_category() {
        let invalid = SimError::InvalidStrategy {
            reason: "vars".into(),
        };
        assert_eq!(invalid.exit_code(), 4);
        let missing = SimError::ConfigMissing {
            section: "simulation".into(),
            key: "candles".into(),
        };
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(SimError::NoCandles.exit_code(), 3);
    }
}
