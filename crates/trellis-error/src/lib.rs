use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

pub type TrellisResult<T> = Result<T, TrellisError>;

/// What went wrong, independent of the message text. Matching on the code
/// is the supported way to branch on failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    DimensionMismatch,
    NotFound,
    Io,
    DivisionByZero,
    Inconsistent,
    Unsupported,
}

impl ErrorCode {
    fn label(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::DimensionMismatch => "dimension mismatch",
            Self::NotFound => "not found",
            Self::Io => "i/o error",
            Self::DivisionByZero => "division by zero",
            Self::Inconsistent => "inconsistent model",
            Self::Unsupported => "unsupported",
        }
    }
}

/// A failure carrying its [ErrorCode], a message, and the contexts it
/// bubbled through on the way out.
///
/// Errors are values, not chains: wrapping an error in context pushes onto
/// a stack inside the same value rather than boxing a source. Contexts
/// print outermost-first, so `to_string()` reads like a path down to the
/// failing operation.
#[derive(Debug)]
pub struct TrellisError {
    code: ErrorCode,
    message: Cow<'static, str>,
    context: Vec<String>,
}

impl TrellisError {
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        TrellisError {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Annotate the error with the operation it surfaced from. The code
    /// and message stay untouched.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }
}

impl Display for TrellisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for context in self.context.iter().rev() {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}: {}", self.code.label(), self.message)
    }
}

impl std::error::Error for TrellisError {}

impl From<std::io::Error> for TrellisError {
    fn from(err: std::io::Error) -> Self {
        TrellisError::new(ErrorCode::Io, err.to_string())
    }
}

/// Attach context to the error side of a result.
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> TrellisResult<T>;
}

impl<T, E: Into<TrellisError>> ResultExt<T> for Result<T, E> {
    fn context(self, msg: impl Into<String>) -> TrellisResult<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}

/// Build a [TrellisError] from an [ErrorCode] name and a format string:
/// `trellis_err!(NotFound: "no variable '{}'", symbol)`.
#[macro_export]
macro_rules! trellis_err {
    ($code:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::TrellisError::new($crate::ErrorCode::$code, format!($fmt $(, $arg)*))
    };
}

/// Return early with a [TrellisError].
#[macro_export]
macro_rules! trellis_bail {
    ($($body:tt)+) => {
        return Err($crate::trellis_err!($($body)+))
    };
}

/// Return early with a [TrellisError] unless the condition holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($body:tt)+) => {
        if !($cond) {
            $crate::trellis_bail!($($body)+);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_message_survive_formatting() {
        let err = trellis_err!(DimensionMismatch: "expected {} cells, got {}", 6, 4);
        assert_eq!(err.code(), ErrorCode::DimensionMismatch);
        assert_eq!(err.message(), "expected 6 cells, got 4");
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[test]
    fn context_prints_outermost_first() {
        let err = trellis_err!(NotFound: "variable {}", "rain")
            .with_context("loading model")
            .with_context("running step 3");

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.to_string(),
            "running step 3: loading model: not found: variable rain"
        );
    }

    #[test]
    fn result_ext_wraps_the_error_side() {
        let io: Result<(), std::io::Error> = Err(std::io::Error::other("disk gone"));
        let err = io.context("reading observations").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Io);
        assert!(err.to_string().starts_with("reading observations: "));
    }

    #[test]
    fn ensure_returns_early() {
        fn check(n: usize) -> TrellisResult<usize> {
            ensure!(n > 0, InvalidArgument: "cardinality must be positive, got {}", n);
            Ok(n)
        }
        assert!(check(2).is_ok());
        assert_eq!(check(0).unwrap_err().code(), ErrorCode::InvalidArgument);
    }
}
