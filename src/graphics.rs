//! Graphics state assertion.
//!
//! Reading the error state of a GL context also clears it, so the context is
//! always borrowed mutably.

use crate::assertion::{self, Diagnostic};
use std::fmt;

pub const GL_NO_ERROR: u32 = 0;
pub const GL_INVALID_ENUM: u32 = 0x0500;
pub const GL_INVALID_VALUE: u32 = 0x0501;
pub const GL_INVALID_OPERATION: u32 = 0x0502;
pub const GL_STACK_OVERFLOW: u32 = 0x0503;
pub const GL_STACK_UNDERFLOW: u32 = 0x0504;
pub const GL_OUT_OF_MEMORY: u32 = 0x0505;
pub const GL_INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;

/// GL keeps at most one flag per error kind.
pub const MAX_QUEUED_ERRORS: usize = 8;

/// Value returned by `glGetError`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GlError(pub u32);

impl GlError {
  pub fn is_error(&self) -> bool {
    self.0 != GL_NO_ERROR
  }

  pub fn name(&self) -> Option<&'static str> {
    let name = match self.0 {
      GL_NO_ERROR => "GL_NO_ERROR",
      GL_INVALID_ENUM => "GL_INVALID_ENUM",
      GL_INVALID_VALUE => "GL_INVALID_VALUE",
      GL_INVALID_OPERATION => "GL_INVALID_OPERATION",
      GL_STACK_OVERFLOW => "GL_STACK_OVERFLOW",
      GL_STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
      GL_OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
      GL_INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
      _ => return None,
    };
    Some(name)
  }
}

impl fmt::Display for GlError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self.name() {
      Some(name) => write!(f, "{name}"),
      None => write!(f, "0x{:04x}", self.0),
    }
  }
}

pub trait GraphicsContext {
  /// Returns the oldest pending error and clears it.
  fn get_error(&mut self) -> GlError;
}

impl<C: GraphicsContext + ?Sized> GraphicsContext for &mut C {
  fn get_error(&mut self) -> GlError {
    (**self).get_error()
  }
}

/// Queries the context once and raises an assertion unless it has no error.
pub fn verify_no_error<C: GraphicsContext + ?Sized>(
  context: &mut C,
  file: &'static str,
  line: u32,
) -> GlError {
  let error = context.get_error();
  if error.is_error() {
    assertion::raise(Diagnostic::new(format!("OGL ERROR: {error}"), file, line));
  }
  error
}

/// Collects every pending error, leaving the context clean.
pub fn drain_errors<C: GraphicsContext + ?Sized>(context: &mut C) -> Vec<GlError> {
  let mut errors = vec![];
  for _ in 0..MAX_QUEUED_ERRORS {
    let error = context.get_error();
    if !error.is_error() {
      return errors;
    }
    errors.push(error);
  }
  warn!(
    "Graphics context still reports errors after {} queries",
    MAX_QUEUED_ERRORS
  );
  errors
}

/// `VGLERR`: asserts that the graphics context has no pending error.
#[macro_export]
macro_rules! verify_gl {
  ($context: expr) => {
    $crate::graphics::verify_no_error(&mut $context, file!(), line!())
  };
}

#[cfg(test)]
struct FakeContext {
  pending: Vec<u32>,
  queries: usize,
}

#[cfg(test)]
impl GraphicsContext for FakeContext {
  fn get_error(&mut self) -> GlError {
    self.queries += 1;
    if self.pending.is_empty() {
      GlError(GL_NO_ERROR)
    } else {
      GlError(self.pending.remove(0))
    }
  }
}

#[test]
fn error_names() {
  assert_eq!(GlError(GL_INVALID_VALUE).to_string(), "GL_INVALID_VALUE");
  assert_eq!(GlError(0x1234).to_string(), "0x1234");
  assert!(!GlError(GL_NO_ERROR).is_error());
}

#[test]
fn verify_gl_reads_and_clears() {
  use crate::assertion::{scoped_with_hook, AssertPolicy};
  use std::cell::RefCell;
  use std::rc::Rc;

  let messages = Rc::new(RefCell::new(vec![]));
  let recorder = messages.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |diagnostic| {
    recorder.borrow_mut().push(diagnostic.message.clone())
  });

  let mut context = FakeContext {
    pending: vec![GL_INVALID_OPERATION],
    queries: 0,
  };

  assert_eq!(verify_gl!(context), GlError(GL_INVALID_OPERATION));
  assert_eq!(verify_gl!(context), GlError(GL_NO_ERROR));
  assert_eq!(context.queries, 2);
  assert_eq!(*messages.borrow(), vec!["OGL ERROR: GL_INVALID_OPERATION".to_string()]);
}

#[test]
fn verify_gl_through_a_borrowed_context() {
  use crate::assertion::{scoped, AssertPolicy};

  let _guard = scoped(AssertPolicy::Ignore);
  let mut context = FakeContext {
    pending: vec![GL_OUT_OF_MEMORY],
    queries: 0,
  };
  let mut borrowed = &mut context;
  assert_eq!(verify_gl!(borrowed), GlError(GL_OUT_OF_MEMORY));
  assert_eq!(context.queries, 1);
}

#[test]
fn drain_collects_pending_errors() {
  let mut context = FakeContext {
    pending: vec![GL_INVALID_ENUM, GL_OUT_OF_MEMORY],
    queries: 0,
  };
  assert_eq!(
    drain_errors(&mut context),
    vec![GlError(GL_INVALID_ENUM), GlError(GL_OUT_OF_MEMORY)]
  );
  assert!(drain_errors(&mut context).is_empty());
}

#[test]
fn drain_is_bounded() {
  let mut context = FakeContext {
    pending: vec![GL_INVALID_VALUE; 20],
    queries: 0,
  };
  assert_eq!(drain_errors(&mut context).len(), MAX_QUEUED_ERRORS);
  assert_eq!(context.queries, MAX_QUEUED_ERRORS);
}
