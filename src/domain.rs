//! Process wide error domain.
//!
//! Every [`Error`](crate::error::Error) built by this crate is stamped with the
//! domain, so errors raised by the media stack can be told apart from errors
//! of other subsystems. The domain is fixed the first time it is set or read.

use std::sync::OnceLock;

pub const DEFAULT_ERROR_DOMAIN: &str = "ffmpeg4iOS.error";

static ERROR_DOMAIN: OnceLock<String> = OnceLock::new();

pub fn error_domain() -> &'static str {
  ERROR_DOMAIN.get_or_init(|| DEFAULT_ERROR_DOMAIN.to_string())
}

/// Sets the error domain, once, at startup.
///
/// Fails when the domain is blank or was already fixed by an earlier call or
/// read.
pub fn set_error_domain(domain: &str) -> Result<(), String> {
  let domain = domain.trim();
  if domain.is_empty() {
    return Err("Error domain cannot be empty".to_string());
  }

  ERROR_DOMAIN
    .set(domain.to_string())
    .map_err(|_| format!("Error domain is already set to {:?}", error_domain()))
}

#[test]
fn blank_domain_is_rejected() {
  assert!(set_error_domain("   ").is_err());
}

#[test]
fn domain_is_frozen_after_first_read() {
  let domain = error_domain();
  assert!(!domain.is_empty());
  assert!(set_error_domain("com.example.other").is_err());
  assert_eq!(error_domain(), domain);
}
