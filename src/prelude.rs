//! The ehm prelude.
//!
//! The prelude re-exports most commonly used types and macros from this crate.
//!
//! # Examples
//!
//! Import the prelude with:
//!
//! ```
//! #[allow(unused_imports)]
//! use ehm::prelude::*;
//! ```

#[doc(no_inline)]
pub use crate::{
  assertion::AssertPolicy,
  check,
  check::{Failure, FailureKind},
  check_assert, check_continue, check_continue_assert, check_ptr, check_ptr_assert, check_result,
  config::Config,
  domain::error_domain,
  error::{Error, ERR_SUCCESS},
  finish,
  graphics::{GlError, GraphicsContext},
  scope::{on_exit, Cleanup, Scope},
  verify, verify_gl, verify_ptr,
};
