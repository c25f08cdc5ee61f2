use crate::averror;
use crate::check::{Failure, FailureKind};
use crate::domain;
use libc::c_int;
use serde_json::Value;
use std::collections::BTreeMap;

/// No error.
pub const ERR_SUCCESS: c_int = 0;
/// A soft check on a condition failed.
pub const ERR_CHECK_FAILED: c_int = 1;
/// A soft check on a value found nothing.
pub const ERR_MISSING_VALUE: c_int = 2;

/// Error object reported to the application, keyed by the error domain.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, thiserror::Error)]
#[error("{domain} error {code}: {message}")]
pub struct Error {
  pub domain: String,
  pub code: c_int,
  pub message: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub user_info: BTreeMap<String, Value>,
}

impl Error {
  /// Builds an error in the current [error domain](crate::domain::error_domain).
  pub fn new(code: c_int, message: &str) -> Self {
    Error::with_domain(domain::error_domain(), code, message)
  }

  pub fn with_domain(domain: &str, code: c_int, message: &str) -> Self {
    Error {
      domain: domain.to_string(),
      code,
      message: message.to_string(),
      user_info: BTreeMap::new(),
    }
  }

  /// Builds an error from a status code, describing it.
  pub fn from_code(code: c_int) -> Self {
    Error::new(code, &describe(code))
  }

  pub fn with_info<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
    self.user_info.insert(key.to_string(), value.into());
    self
  }

  pub fn is_in_current_domain(&self) -> bool {
    self.domain == domain::error_domain()
  }
}

impl From<Failure> for Error {
  fn from(failure: Failure) -> Self {
    let code = match failure.kind {
      FailureKind::Condition => ERR_CHECK_FAILED,
      FailureKind::Missing => ERR_MISSING_VALUE,
    };
    Error::new(code, &failure.to_string())
      .with_info("expression", failure.expression)
      .with_info("file", failure.file)
      .with_info("line", failure.line)
  }
}

impl From<Error> for String {
  fn from(error: Error) -> String {
    error.to_string()
  }
}

/// Describes a status code: codes of this crate, then ffmpeg codes.
pub fn describe(code: c_int) -> String {
  match code {
    ERR_SUCCESS => "Success".to_string(),
    ERR_CHECK_FAILED => "Check failed".to_string(),
    ERR_MISSING_VALUE => "Missing value".to_string(),
    _ => averror::describe(code),
  }
}

/// Integer status of a result, `ERR_SUCCESS` for `Ok`.
pub fn to_status<T>(result: &Result<T, Error>) -> c_int {
  match result {
    Ok(_) => ERR_SUCCESS,
    // an error must never read as a success
    Err(error) if error.code == ERR_SUCCESS => averror::AVERROR_UNKNOWN,
    Err(error) => error.code,
  }
}

pub fn from_status(status: c_int) -> Result<(), Error> {
  if status == ERR_SUCCESS {
    Ok(())
  } else {
    Err(Error::from_code(status))
  }
}

/// Evaluates an ffmpeg style call and returns an [`Error`] from the enclosing
/// function when its status is negative. The optional block runs first, to
/// release what the function holds.
#[macro_export]
macro_rules! check_result {
  ($condition: expr, $block: block) => {
    let errnum = $condition;
    if errnum < 0 {
      $block;
      return ::std::result::Result::Err(::std::convert::From::from(
        $crate::error::Error::from_code(errnum),
      ));
    }
  };
  ($condition: expr) => {
    let errnum = $condition;
    if errnum < 0 {
      return ::std::result::Result::Err(::std::convert::From::from(
        $crate::error::Error::from_code(errnum),
      ));
    }
  };
}

#[test]
fn success_is_zero_and_unique() {
  assert_eq!(ERR_SUCCESS, 0);
  for code in [
    ERR_CHECK_FAILED,
    ERR_MISSING_VALUE,
    averror::AVERROR_EOF,
    averror::AVERROR_UNKNOWN,
    averror::AVERROR_EINVAL,
  ] {
    assert_ne!(code, ERR_SUCCESS);
  }
}

#[test]
fn failure_becomes_domain_error() {
  let failure = Failure::missing("decoder", "src/player.rs", 42);
  let error = Error::from(failure);

  assert_eq!(error.code, ERR_MISSING_VALUE);
  assert!(error.is_in_current_domain());
  assert_eq!(error.user_info["expression"], "decoder");
  assert_eq!(error.user_info["line"], 42);
  assert_eq!(
    error.to_string(),
    format!(
      "{} error 2: `decoder` is missing at src/player.rs:42",
      domain::error_domain()
    )
  );
}

#[test]
fn status_conversion() {
  assert_eq!(to_status::<()>(&Ok(())), ERR_SUCCESS);
  assert_eq!(
    to_status::<()>(&Err(Error::from_code(averror::AVERROR_EOF))),
    averror::AVERROR_EOF
  );
  assert_eq!(
    to_status::<()>(&Err(Error::new(ERR_SUCCESS, "confused"))),
    averror::AVERROR_UNKNOWN
  );

  assert!(from_status(ERR_SUCCESS).is_ok());
  let error = from_status(averror::AVERROR_INVALIDDATA).unwrap_err();
  assert_eq!(error.message, "Invalid data found when processing input");
}

#[test]
fn any_status_converts_without_panicking() {
  fn call(status: c_int) -> Result<(), String> {
    check_result!(status);
    Ok(())
  }

  for status in [c_int::MIN, c_int::MIN + 1, -1, c_int::MAX] {
    let error = from_status(status).unwrap_err();
    assert_eq!(error.code, status);
    assert!(!error.message.is_empty());
    assert_eq!(to_status::<()>(&Err(error)), status);
  }

  assert!(call(c_int::MIN).unwrap_err().ends_with(&format!("Error number {} occurred", c_int::MIN)));
  assert!(call(c_int::MAX).is_ok());
}

#[test]
fn error_is_a_std_error() {
  let error: Box<dyn std::error::Error> = Box::new(Error::with_domain("com.example.media", 2, "Missing value"));
  assert_eq!(error.to_string(), "com.example.media error 2: Missing value");
  assert!(error.source().is_none());
}

#[test]
fn check_result_returns_on_negative_status() {
  fn open(status: c_int, released: &mut bool) -> Result<(), String> {
    check_result!(status, {
      *released = true;
    });
    Ok(())
  }

  let mut released = false;
  assert!(open(0, &mut released).is_ok());
  assert!(!released);

  let error = open(averror::AVERROR_EOF, &mut released).unwrap_err();
  assert!(error.ends_with("End of file"));
  assert!(released);
}

#[test]
fn serialize_error() {
  let error = Error::with_domain("com.example.media", -1, "Operation not permitted")
    .with_info("path", "/tmp/a.mp4");
  let json = serde_json::to_value(&error).unwrap();
  assert_eq!(
    json,
    serde_json::json!({
      "domain": "com.example.media",
      "code": -1,
      "message": "Operation not permitted",
      "user_info": { "path": "/tmp/a.mp4" }
    })
  );

  let parsed: Error = serde_json::from_value(json).unwrap();
  assert_eq!(parsed, error);

  let bare = serde_json::to_value(Error::with_domain("d", 3, "m")).unwrap();
  assert!(bare.get("user_info").is_none());
}
