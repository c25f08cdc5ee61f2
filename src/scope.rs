//! Single exit cleanup.
//!
//! A function using the soft checks leaves early on failure. The code that
//! must run on the way out, whatever the path, is registered up front:
//!
//! ```
//! use ehm::prelude::*;
//!
//! fn decode(input: Option<&[u8]>) -> Result<usize, Error> {
//!   Scope::new()
//!     .on_error(|error: &Error| log::warn!("decode failed: {}", error))
//!     .on_done(|| log::debug!("decoder released"))
//!     .run(|| {
//!       let input = check_ptr!(input);
//!       check!(!input.is_empty());
//!       Ok(input.len())
//!     })
//! }
//!
//! assert_eq!(decode(Some(&b"frame"[..])), Ok(5));
//! assert!(decode(None).is_err());
//! ```

/// Runs an action when dropped, unless disarmed.
#[must_use = "the action runs as soon as the guard is dropped"]
pub struct Cleanup<F: FnOnce()> {
  action: Option<F>,
}

impl<F: FnOnce()> Cleanup<F> {
  pub fn new(action: F) -> Self {
    Cleanup {
      action: Some(action),
    }
  }

  /// Cancels the action, typically once the success path is committed.
  pub fn disarm(mut self) {
    self.action = None;
  }
}

impl<F: FnOnce()> Drop for Cleanup<F> {
  fn drop(&mut self) {
    if let Some(action) = self.action.take() {
      action();
    }
  }
}

/// Guard running `action` on every exit path, unwinding included.
pub fn on_exit<F: FnOnce()>(action: F) -> Cleanup<F> {
  Cleanup::new(action)
}

/// The error and done blocks shared by every exit of a function body.
pub struct Scope<'a, E> {
  on_error: Option<Box<dyn FnOnce(&E) + 'a>>,
  on_done: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a, E> Default for Scope<'a, E> {
  fn default() -> Self {
    Scope {
      on_error: None,
      on_done: None,
    }
  }
}

impl<'a, E> Scope<'a, E> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Runs only when the body fails, before the done block.
  pub fn on_error<F: FnOnce(&E) + 'a>(mut self, action: F) -> Self {
    self.on_error = Some(Box::new(action));
    self
  }

  /// Runs exactly once after the body, whatever its outcome.
  pub fn on_done<F: FnOnce() + 'a>(mut self, action: F) -> Self {
    self.on_done = Some(Box::new(action));
    self
  }

  /// Runs the body, then the blocks, and returns the body result untouched.
  pub fn run<T, B>(self, body: B) -> Result<T, E>
  where
    B: FnOnce() -> Result<T, E>,
  {
    let Scope { on_error, on_done } = self;
    let _done = on_done.map(on_exit);

    let result = body();
    if let (Err(error), Some(on_error)) = (&result, on_error) {
      on_error(error);
    }
    result
  }
}

#[cfg(test)]
fn counted_run(
  conditions: [bool; 3],
  evaluated: &std::cell::Cell<u32>,
  errors: &std::cell::Cell<u32>,
  done: &std::cell::Cell<u32>,
) -> Result<(), crate::error::Error> {
  let condition = |index: usize| {
    evaluated.set(evaluated.get() + 1);
    conditions[index]
  };

  Scope::new()
    .on_error(|_: &crate::error::Error| errors.set(errors.get() + 1))
    .on_done(|| done.set(done.get() + 1))
    .run(|| {
      check!(condition(0));
      check!(condition(1));
      check!(condition(2));
      Ok(())
    })
}

#[test]
fn success_runs_done_once() {
  use std::cell::Cell;

  let (evaluated, errors, done) = (Cell::new(0), Cell::new(0), Cell::new(0));
  assert!(counted_run([true, true, true], &evaluated, &errors, &done).is_ok());
  assert_eq!(evaluated.get(), 3);
  assert_eq!(errors.get(), 0);
  assert_eq!(done.get(), 1);
}

#[test]
fn second_precondition_fails() {
  use crate::error::ERR_CHECK_FAILED;
  use std::cell::Cell;

  let (evaluated, errors, done) = (Cell::new(0), Cell::new(0), Cell::new(0));
  let error = counted_run([true, false, true], &evaluated, &errors, &done).unwrap_err();
  assert_eq!(error.code, ERR_CHECK_FAILED);
  assert_eq!(error.user_info["expression"], "condition(1)");
  assert_eq!(evaluated.get(), 2);
  assert_eq!(errors.get(), 1);
  assert_eq!(done.get(), 1);
}

#[test]
fn error_block_runs_before_done_block() {
  use std::cell::RefCell;

  let order = RefCell::new(vec![]);
  let result: Result<(), String> = Scope::new()
    .on_error(|error: &String| order.borrow_mut().push(format!("error: {error}")))
    .on_done(|| order.borrow_mut().push("done".to_string()))
    .run(|| {
      order.borrow_mut().push("body".to_string());
      Err("bad header".to_string())
    });

  assert!(result.is_err());
  assert_eq!(
    *order.borrow(),
    vec!["body".to_string(), "error: bad header".to_string(), "done".to_string()]
  );
}

#[test]
fn asserting_check_diagnoses_before_cleanup() {
  use crate::assertion::{scoped_with_hook, AssertPolicy};
  use std::cell::RefCell;
  use std::rc::Rc;

  let order = Rc::new(RefCell::new(vec![]));
  let recorder = order.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |_| recorder.borrow_mut().push("diagnostic"));

  let result: Result<(), crate::check::Failure> = Scope::new()
    .on_error(|_: &crate::check::Failure| order.borrow_mut().push("error"))
    .on_done(|| order.borrow_mut().push("done"))
    .run(|| {
      check_assert!(1 > 2);
      order.borrow_mut().push("body");
      Ok(())
    });

  assert!(result.is_err());
  assert_eq!(*order.borrow(), vec!["diagnostic", "error", "done"]);
}

#[test]
fn finish_still_runs_done() {
  use std::cell::Cell;

  let done = Cell::new(0);
  let result: Result<u8, String> = Scope::new().on_done(|| done.set(done.get() + 1)).run(|| {
    if done.get() == 0 {
      finish!(7);
    }
    Ok(0)
  });

  assert_eq!(result, Ok(7));
  assert_eq!(done.get(), 1);
}

#[test]
fn guard_runs_on_every_path() {
  use std::cell::Cell;

  let released = Cell::new(0);
  let run = |fail: bool| -> Result<(), String> {
    let _release = on_exit(|| released.set(released.get() + 1));
    check!(!fail);
    Ok(())
  };

  assert!(run(false).is_ok());
  assert!(run(true).is_err());
  assert_eq!(released.get(), 2);
}

#[test]
fn disarmed_guard_is_error_only_cleanup() {
  use std::cell::Cell;

  let rolled_back = Cell::new(false);
  let run = |fail: bool| -> Result<(), String> {
    let rollback = on_exit(|| rolled_back.set(true));
    check!(!fail);
    rollback.disarm();
    Ok(())
  };

  assert!(run(false).is_ok());
  assert!(!rolled_back.get());
  assert!(run(true).is_err());
  assert!(rolled_back.get());
}

#[test]
fn guard_runs_while_unwinding() {
  use std::cell::Cell;
  use std::panic::{catch_unwind, AssertUnwindSafe};

  let released = Cell::new(false);
  let outcome = catch_unwind(AssertUnwindSafe(|| {
    let _release = on_exit(|| released.set(true));
    panic!("decoder state is inconsistent");
  }));

  assert!(outcome.is_err());
  assert!(released.get());
}
