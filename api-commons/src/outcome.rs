//! Success/failure wrapper for operations that report failures as values
//!
//! [`Outcome`] is either a [`Outcome::Success`] holding a value or an
//! [`Outcome::Failure`] holding a [`Failure`]: an optional human readable
//! message plus an optional underlying error (the cause).
//!
//! Services return `Outcome` from use cases and repositories, and the web
//! layer turns failures into the error envelope (see
//! [`responses::failure_with`](crate::responses::failure_with)).
//!
//! # Example
//!
//! ```rust
//! use api_commons::outcome::Outcome;
//!
//! let parsed: Outcome<u32> = "42".parse::<u32>().into();
//! assert!(parsed.is_success());
//! assert_eq!(parsed.map(|n| n * 2).get_or_default(0), 84);
//!
//! let failed: Outcome<u32> = Outcome::failure("user not found");
//! assert_eq!(failed.get_or_default(7), 7);
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;

/// Underlying error carried by a [`Failure`]
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Message of the failure produced by [`Outcome::map`] on a failure
pub const MAP_FAILURE_MESSAGE: &str = "Error while performing map";

/// Message of the failure produced by [`Outcome::map_catching`] on a failure
pub const MAP_CATCHING_FAILURE_MESSAGE: &str = "Error while performing mapCatching";

/// Fallback text when a failure carries neither message nor cause
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Text returned by [`Outcome::exception_message`] on success
pub const SUCCESS_MESSAGE: &str = "Outcome success";

/// The failure side of an [`Outcome`]
#[derive(Debug, Clone, Default)]
pub struct Failure {
    message: Option<String>,
    cause: Option<Cause>,
}

impl Failure {
    /// Failure with a message and no cause
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            cause: None,
        }
    }

    /// Failure caused by `err`; the message is the error's display text
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: Some(err.to_string()),
            cause: Some(Arc::new(err)),
        }
    }

    /// Failure with an explicit message and an already shared cause
    pub fn with_cause(message: impl Into<String>, cause: Cause) -> Self {
        Self {
            message: Some(message.into()),
            cause: Some(cause),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Borrow the cause as a concrete error type, if it is one
    pub fn downcast_cause<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.cause.as_deref().and_then(|cause| cause.downcast_ref::<E>())
    }

    /// Whether the cause is an authentication failure
    ///
    /// The web layer answers these with `401` instead of `400`.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.downcast_cause::<Error>(), Some(Error::Unauthorized(_)))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.message, &self.cause) {
            (Some(message), _) => write!(f, "{}", message),
            (None, Some(cause)) => write!(f, "{}", cause),
            (None, None) => write!(f, "{}", UNKNOWN_ERROR_MESSAGE),
        }
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Result of an operation: a value or a [`Failure`], never both
#[derive(Debug, Clone)]
#[must_use]
pub enum Outcome<T> {
    /// The operation produced a value
    Success(T),
    /// The operation failed
    Failure(Failure),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Failure with a message and no cause
    pub fn failure(message: impl Into<String>) -> Self {
        let failure = Failure::new(message);
        tracing::debug!(error = %failure, "operation failed");
        Self::Failure(failure)
    }

    /// Failure caused by `err`
    pub fn failure_from<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let failure = Failure::from_error(err);
        tracing::debug!(error = %failure, "operation failed");
        Self::Failure(failure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Failure(failure) => Outcome::Failure(failure.clone()),
        }
    }

    /// The value, or `None` on failure
    pub fn get_or_none(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The value, or the failure's cause as an error
    ///
    /// A failure without a cause is returned as the [`Failure`] itself, so
    /// callers always get an error whose text is the failure message (or
    /// "Unknown error" when there is none).
    pub fn get_or_throw(self) -> Result<T, Cause> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(Failure {
                cause: Some(cause), ..
            }) => Err(cause),
            Self::Failure(failure) => Err(Arc::new(failure)),
        }
    }

    pub fn get_or_default(self, default: T) -> T {
        match self {
            Self::Success(value) => value,
            Self::Failure(_) => default,
        }
    }

    pub fn get_or_else<F>(self, f: F) -> T
    where
        F: FnOnce(&Failure) -> T,
    {
        match self {
            Self::Success(value) => value,
            Self::Failure(failure) => f(&failure),
        }
    }

    /// Transform the success value
    ///
    /// A failure is replaced by a new failure with the fixed message
    /// [`MAP_FAILURE_MESSAGE`] and `f` is never called.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(failure) => {
                tracing::debug!(error = %failure, "map skipped on failure");
                Outcome::failure(MAP_FAILURE_MESSAGE)
            }
        }
    }

    /// Transform the success value with a fallible function
    ///
    /// An error returned by `f` becomes a failure caused by that error. A
    /// failure input is replaced by [`MAP_CATCHING_FAILURE_MESSAGE`].
    pub fn map_catching<U, E, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Result<U, E>,
        E: StdError + Send + Sync + 'static,
    {
        match self {
            Self::Success(value) => catching(|| f(value)),
            Self::Failure(failure) => {
                tracing::debug!(error = %failure, "mapCatching skipped on failure");
                Outcome::failure(MAP_CATCHING_FAILURE_MESSAGE)
            }
        }
    }

    /// Turn a failure into a success computed from it
    pub fn recover<F>(self, f: F) -> Self
    where
        F: FnOnce(&Failure) -> T,
    {
        match self {
            Self::Success(value) => Self::Success(value),
            Self::Failure(failure) => Self::Success(f(&failure)),
        }
    }

    /// Like [`recover`](Self::recover), but the recovery itself may fail
    pub fn recover_catching<E, F>(self, f: F) -> Self
    where
        F: FnOnce(&Failure) -> Result<T, E>,
        E: StdError + Send + Sync + 'static,
    {
        match self {
            Self::Success(value) => Self::Success(value),
            Self::Failure(failure) => catching(|| f(&failure)),
        }
    }

    pub fn on_success<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Self::Success(value) = &self {
            f(value);
        }
        self
    }

    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(&Failure),
    {
        if let Self::Failure(failure) = &self {
            f(failure);
        }
        self
    }

    /// Collapse both branches into one value
    pub fn fold<R, S, F>(self, on_success: S, on_failure: F) -> R
    where
        S: FnOnce(T) -> R,
        F: FnOnce(Failure) -> R,
    {
        match self {
            Self::Success(value) => on_success(value),
            Self::Failure(failure) => on_failure(failure),
        }
    }

    pub fn failure_ref(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.failure_ref().and_then(Failure::cause)
    }

    pub fn message(&self) -> Option<&str> {
        self.failure_ref().and_then(Failure::message)
    }

    /// Failure message, "Unknown error" for a bare failure,
    /// or [`SUCCESS_MESSAGE`] on success
    pub fn exception_message(&self) -> String {
        match self {
            Self::Success(_) => SUCCESS_MESSAGE.to_string(),
            Self::Failure(failure) => failure
                .message()
                .unwrap_or(UNKNOWN_ERROR_MESSAGE)
                .to_string(),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: StdError + Send + Sync + 'static,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::failure_from(err),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(value) => write!(f, "Success({})", value),
            Self::Failure(failure) => write!(f, "Failure({})", failure),
        }
    }
}

/// Run a fallible closure and capture its error as a failure
pub fn catching<T, E, F>(f: F) -> Outcome<T>
where
    F: FnOnce() -> Result<T, E>,
    E: StdError + Send + Sync + 'static,
{
    match f() {
        Ok(value) => Outcome::Success(value),
        Err(err) => {
            tracing::info!(error = %err, "caught error");
            Outcome::failure_from(err)
        }
    }
}

/// Run a fallible closure, logging and discarding its error
pub fn try_or_none<T, E, F>(f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    match f() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::info!(error = %err, "ignored error");
            None
        }
    }
}

/// Run blocking work on tokio's blocking pool
///
/// A panic inside `f` is reported as a failure caused by the join error.
pub async fn run_blocking<T, E, F>(f: F) -> Outcome<T>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    match tokio::task::spawn_blocking(move || catching(f)).await {
        Ok(outcome) => outcome,
        Err(join_error) => Outcome::failure_from(join_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::num::ParseIntError;

    #[test]
    fn test_success_and_failure_are_exclusive() {
        let ok = Outcome::success(1);
        assert!(ok.is_success());
        assert!(!ok.is_failure());

        let failed: Outcome<i32> = Outcome::failure("boom");
        assert!(failed.is_failure());
        assert!(!failed.is_success());
    }

    #[test]
    fn test_unit_success() {
        let done = Outcome::success(());
        assert!(done.is_success());
        assert_eq!(done.get_or_none(), Some(()));
    }

    #[test]
    fn test_get_or_default() {
        assert_eq!(Outcome::success(3).get_or_default(9), 3);
        assert_eq!(Outcome::<i32>::failure("nope").get_or_default(9), 9);
    }

    #[test]
    fn test_get_or_else_sees_failure() {
        let value = Outcome::<String>::failure("missing")
            .get_or_else(|failure| format!("fallback: {}", failure));
        assert_eq!(value, "fallback: missing");
    }

    #[test]
    fn test_map_on_failure_never_calls_transform() {
        let calls = Cell::new(0);
        let mapped = Outcome::<i32>::failure("original").map(|v| {
            calls.set(calls.get() + 1);
            v + 1
        });

        assert_eq!(calls.get(), 0);
        assert_eq!(mapped.message(), Some(MAP_FAILURE_MESSAGE));
        assert!(mapped.cause().is_none());
    }

    #[test]
    fn test_map_on_success() {
        let mapped = Outcome::success(20).map(|v| v + 1);
        assert_eq!(mapped.get_or_none(), Some(21));
    }

    #[test]
    fn test_map_catching_captures_error_as_cause() {
        let mapped = Outcome::success("not a number").map_catching(|s| s.parse::<i32>());

        assert!(mapped.is_failure());
        let failure = mapped.failure_ref().unwrap();
        assert!(failure.downcast_cause::<ParseIntError>().is_some());
    }

    #[test]
    fn test_map_catching_on_failure() {
        let calls = Cell::new(0);
        let mapped = Outcome::<&str>::failure("earlier").map_catching(|s| {
            calls.set(calls.get() + 1);
            s.parse::<i32>()
        });

        assert_eq!(calls.get(), 0);
        assert_eq!(mapped.message(), Some(MAP_CATCHING_FAILURE_MESSAGE));
    }

    #[test]
    fn test_recover() {
        let recovered = Outcome::<usize>::failure("abc").recover(|f| f.message().map_or(0, str::len));
        assert_eq!(recovered.get_or_none(), Some(3));

        let untouched = Outcome::success(5).recover(|_| 0);
        assert_eq!(untouched.get_or_none(), Some(5));
    }

    #[test]
    fn test_recover_catching_can_fail_again() {
        let still_failed =
            Outcome::<i32>::failure("x").recover_catching(|_| "still bad".parse::<i32>());
        assert!(still_failed.is_failure());
        assert!(still_failed.cause().is_some());
    }

    #[test]
    fn test_hooks_return_original() {
        let seen = Cell::new(0);
        let outcome = Outcome::success(4)
            .on_success(|v| seen.set(*v))
            .on_failure(|_| seen.set(-1));

        assert_eq!(seen.get(), 4);
        assert_eq!(outcome.get_or_none(), Some(4));
    }

    #[test]
    fn test_fold() {
        let text = Outcome::<i32>::failure("bad input").fold(|v| v.to_string(), |f| f.to_string());
        assert_eq!(text, "bad input");
    }

    #[test]
    fn test_get_or_throw_prefers_cause() {
        let err = Outcome::<i32>::from("zz".parse::<i32>())
            .get_or_throw()
            .unwrap_err();
        assert!(err.downcast_ref::<ParseIntError>().is_some());
    }

    #[test]
    fn test_get_or_throw_without_cause_uses_message() {
        let err = Outcome::<i32>::failure("no rows").get_or_throw().unwrap_err();
        assert_eq!(err.to_string(), "no rows");

        let bare = Outcome::<i32>::Failure(Failure::default())
            .get_or_throw()
            .unwrap_err();
        assert_eq!(bare.to_string(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_exception_message() {
        assert_eq!(Outcome::success(1).exception_message(), SUCCESS_MESSAGE);
        assert_eq!(
            Outcome::<i32>::Failure(Failure::default()).exception_message(),
            UNKNOWN_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Outcome::success(7).to_string(), "Success(7)");
        assert_eq!(Outcome::<i32>::failure("oops").to_string(), "Failure(oops)");
    }

    #[test]
    fn test_unauthorized_detection() {
        let failure = Failure::from_error(Error::Unauthorized("token expired".into()));
        assert!(failure.is_unauthorized());
        assert!(!Failure::new("plain").is_unauthorized());
    }

    #[test]
    fn test_try_or_none() {
        assert_eq!(try_or_none(|| "12".parse::<u8>()), Some(12));
        assert_eq!(try_or_none(|| "300".parse::<u8>()), None);
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let outcome = run_blocking(|| "8".parse::<i64>()).await;
        assert_eq!(outcome.get_or_none(), Some(8));

        let failed = run_blocking(|| "x".parse::<i64>()).await;
        assert!(failed.is_failure());
    }
}
