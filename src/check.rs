//! Soft checks.
//!
//! A soft check tests a recoverable precondition. When it fails, the
//! enclosing function returns `Err` right away, so nothing after the check
//! runs and the result can no longer become a success. Shared cleanup is
//! attached with [`Scope`](crate::scope::Scope) or a
//! [`Cleanup`](crate::scope::Cleanup) guard.
//!
//! | header  | macro                      |
//! |---------|----------------------------|
//! | `CBR`   | [`check!`]                 |
//! | `CBRA`  | [`check_assert!`]          |
//! | `CPR`   | [`check_ptr!`]             |
//! | `CPRA`  | [`check_ptr_assert!`]      |
//! | `CCBR`  | [`check_continue!`]        |
//! | `CCBRA` | [`check_continue_assert!`] |
//! | `FINISH`| [`finish!`]                |
//!
//! The error type of the enclosing function only needs `From<Failure>`:
//! [`Error`](crate::error::Error) and `String` both qualify.

use crate::assertion::{self, Diagnostic};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// A boolean condition was false.
  Condition,
  /// A value was `None` or a null pointer.
  Missing,
}

impl FailureKind {
  pub fn describe(&self, expression: &str) -> String {
    match self {
      FailureKind::Condition => format!("check `{expression}` failed"),
      FailureKind::Missing => format!("`{expression}` is missing"),
    }
  }
}

/// Which check failed, and where.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, thiserror::Error)]
#[error("{} at {}:{}", .kind.describe(.expression), .file, .line)]
pub struct Failure {
  pub kind: FailureKind,
  pub expression: &'static str,
  pub file: &'static str,
  pub line: u32,
}

impl Failure {
  pub fn condition(expression: &'static str, file: &'static str, line: u32) -> Self {
    Failure {
      kind: FailureKind::Condition,
      expression,
      file,
      line,
    }
  }

  pub fn missing(expression: &'static str, file: &'static str, line: u32) -> Self {
    Failure {
      kind: FailureKind::Missing,
      expression,
      file,
      line,
    }
  }

  /// Logs the failure and hands it back, ready to be returned.
  pub fn report(self) -> Self {
    debug!("{}", self);
    self
  }

  /// Raises the hard assertion diagnostic for this failure, then behaves
  /// like [`report`](Failure::report).
  pub fn assert(self) -> Self {
    assertion::raise(Diagnostic::new(format!("ERROR: {}", self), self.file, self.line));
    self.report()
  }
}

impl From<Failure> for String {
  fn from(failure: Failure) -> String {
    failure.to_string()
  }
}

/// Logs an element skipped by a loop scoped check.
pub fn skipped(expression: &'static str, file: &'static str, line: u32) {
  trace!("skip iteration, check `{}` failed at {}:{}", expression, file, line);
}

/// Values that can be absent: `Option` and raw pointers.
pub trait Presence {
  type Value;

  fn is_absent(&self) -> bool;

  fn into_present(self) -> Option<Self::Value>;
}

impl<T> Presence for Option<T> {
  type Value = T;

  fn is_absent(&self) -> bool {
    self.is_none()
  }

  fn into_present(self) -> Option<T> {
    self
  }
}

impl<T> Presence for *const T {
  type Value = *const T;

  fn is_absent(&self) -> bool {
    self.is_null()
  }

  fn into_present(self) -> Option<*const T> {
    if self.is_null() {
      None
    } else {
      Some(self)
    }
  }
}

impl<T> Presence for *mut T {
  type Value = *mut T;

  fn is_absent(&self) -> bool {
    self.is_null()
  }

  fn into_present(self) -> Option<*mut T> {
    if self.is_null() {
      None
    } else {
      Some(self)
    }
  }
}

/// `CBR`: returns `Err` from the enclosing function when the condition is false.
#[macro_export]
macro_rules! check {
  ($condition: expr) => {
    if !($condition) {
      let failure = $crate::check::Failure::condition(stringify!($condition), file!(), line!());
      return ::std::result::Result::Err(::std::convert::From::from(failure.report()));
    }
  };
}

/// `CBRA`: like [`check!`], raising the assertion diagnostic before returning.
#[macro_export]
macro_rules! check_assert {
  ($condition: expr) => {
    if !($condition) {
      let failure = $crate::check::Failure::condition(stringify!($condition), file!(), line!());
      return ::std::result::Result::Err(::std::convert::From::from(failure.assert()));
    }
  };
}

/// `CPR`: returns `Err` from the enclosing function when the value is absent,
/// evaluates to the present value otherwise.
#[macro_export]
macro_rules! check_ptr {
  ($value: expr) => {
    match $crate::check::Presence::into_present($value) {
      ::std::option::Option::Some(value) => value,
      ::std::option::Option::None => {
        let failure = $crate::check::Failure::missing(stringify!($value), file!(), line!());
        return ::std::result::Result::Err(::std::convert::From::from(failure.report()));
      }
    }
  };
}

/// `CPRA`: like [`check_ptr!`], raising the assertion diagnostic before returning.
#[macro_export]
macro_rules! check_ptr_assert {
  ($value: expr) => {
    match $crate::check::Presence::into_present($value) {
      ::std::option::Option::Some(value) => value,
      ::std::option::Option::None => {
        let failure = $crate::check::Failure::missing(stringify!($value), file!(), line!());
        return ::std::result::Result::Err(::std::convert::From::from(failure.assert()));
      }
    }
  };
}

/// `CCBR`: moves on to the next iteration of the enclosing (or labelled) loop
/// when the condition is false.
#[macro_export]
macro_rules! check_continue {
  ($label: lifetime, $condition: expr) => {
    if !($condition) {
      $crate::check::skipped(stringify!($condition), file!(), line!());
      continue $label;
    }
  };
  ($condition: expr) => {
    if !($condition) {
      $crate::check::skipped(stringify!($condition), file!(), line!());
      continue;
    }
  };
}

/// `CCBRA`: like [`check_continue!`], raising the assertion diagnostic first.
#[macro_export]
macro_rules! check_continue_assert {
  ($label: lifetime, $condition: expr) => {
    if !($condition) {
      $crate::assertion::raise($crate::assertion::Diagnostic::new(
        format!("ERROR: check `{}` failed", stringify!($condition)),
        file!(),
        line!(),
      ));
      $crate::check::skipped(stringify!($condition), file!(), line!());
      continue $label;
    }
  };
  ($condition: expr) => {
    if !($condition) {
      $crate::assertion::raise($crate::assertion::Diagnostic::new(
        format!("ERROR: check `{}` failed", stringify!($condition)),
        file!(),
        line!(),
      ));
      $crate::check::skipped(stringify!($condition), file!(), line!());
      continue;
    }
  };
}

/// `FINISH`: ends the success path.
#[macro_export]
macro_rules! finish {
  () => {
    return ::std::result::Result::Ok(())
  };
  ($value: expr) => {
    return ::std::result::Result::Ok($value)
  };
}

#[test]
fn failing_check_stops_the_function() {
  fn run(value: i32, reached: &mut u32) -> Result<(), Failure> {
    check!(value > 0);
    *reached += 1;
    Ok(())
  }

  let mut reached = 0;
  let failure = run(-1, &mut reached).unwrap_err();
  assert_eq!(reached, 0);
  assert_eq!(failure.kind, FailureKind::Condition);
  assert_eq!(failure.expression, "value > 0");
  assert_eq!(failure.file, file!());

  assert_eq!(run(1, &mut reached), Ok(()));
  assert_eq!(reached, 1);
}

#[test]
fn failure_messages() {
  let failure = Failure::condition("width > 0", "src/scaler.rs", 12);
  assert_eq!(failure.to_string(), "check `width > 0` failed at src/scaler.rs:12");

  let error: Box<dyn std::error::Error> = Box::new(Failure::missing("frame", "src/decoder.rs", 7));
  assert_eq!(error.to_string(), "`frame` is missing at src/decoder.rs:7");
}

#[test]
fn three_preconditions_second_false() {
  use std::cell::Cell;

  let evaluated = Cell::new(0);
  let condition = |result: bool| {
    evaluated.set(evaluated.get() + 1);
    result
  };

  let run = || -> Result<(), String> {
    check!(condition(true));
    check!(condition(false));
    check!(condition(true));
    Ok(())
  };

  let error = run().unwrap_err();
  assert!(error.starts_with("check `condition(false)` failed"));
  assert_eq!(evaluated.get(), 2);
}

#[test]
fn check_ptr_yields_the_value() {
  fn first_even(values: &[u32]) -> Result<u32, Failure> {
    let value = check_ptr!(values.iter().find(|value| *value % 2 == 0));
    Ok(*value * 10)
  }

  assert_eq!(first_even(&[1, 4, 6]), Ok(40));
  let failure = first_even(&[1, 3]).unwrap_err();
  assert_eq!(failure.kind, FailureKind::Missing);
  assert!(failure.to_string().contains("is missing"));
}

#[test]
fn check_ptr_on_raw_pointers() {
  use std::ptr::null_mut;

  fn read(pointer: *mut u8) -> Result<u8, Failure> {
    let pointer = check_ptr!(pointer);
    Ok(unsafe { *pointer })
  }

  let mut byte = 7u8;
  assert_eq!(read(&mut byte as *mut u8), Ok(7));
  assert!(read(null_mut()).is_err());
}

#[test]
fn asserting_checks_raise_before_returning() {
  use crate::assertion::{scoped_with_hook, AssertPolicy};
  use std::cell::RefCell;
  use std::rc::Rc;

  let events = Rc::new(RefCell::new(vec![]));
  let recorder = events.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |_| recorder.borrow_mut().push("diagnostic"));

  let run = |events: &Rc<RefCell<Vec<&'static str>>>| -> Result<(), Failure> {
    check_assert!(events.borrow().len() > 10);
    events.borrow_mut().push("body");
    Ok(())
  };

  let result = run(&events);
  events.borrow_mut().push("returned");

  assert!(result.is_err());
  assert_eq!(*events.borrow(), vec!["diagnostic", "returned"]);
}

#[test]
fn asserting_checks_without_assertions_still_fail() {
  use crate::assertion::{scoped_with_hook, AssertPolicy};
  use std::cell::Cell;
  use std::rc::Rc;

  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let _guard = scoped_with_hook(AssertPolicy::Ignore, move |_| counter.set(counter.get() + 1));

  fn run(value: Option<u8>) -> Result<u8, Failure> {
    let value = check_ptr_assert!(value);
    Ok(value)
  }

  assert_eq!(run(None).unwrap_err().kind, FailureKind::Missing);
  assert_eq!(run(Some(2)), Ok(2));
  assert_eq!(count.get(), 0);
}

#[test]
fn loop_check_skips_malformed_elements() {
  let frames = vec![Some(1), Some(2), None, Some(4)];
  let mut processed = vec![];

  for frame in &frames {
    check_continue!(frame.is_some());
    processed.push(frame.unwrap_or_default());
  }

  assert_eq!(processed, vec![1, 2, 4]);
}

#[test]
fn labelled_loop_check() {
  let rows = vec![vec![1, 2], vec![3, -1, 5], vec![6]];
  let mut sums = vec![];

  'rows: for row in &rows {
    let mut sum = 0;
    for value in row {
      check_continue!('rows, *value >= 0);
      sum += value;
    }
    sums.push(sum);
  }

  assert_eq!(sums, vec![3, 6]);
}

#[test]
fn asserting_loop_check_reports_each_skip() {
  use crate::assertion::{scoped_with_hook, AssertPolicy};
  use std::cell::Cell;
  use std::rc::Rc;

  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |_| counter.set(counter.get() + 1));

  let mut kept = 0;
  for value in [3, 0, 7, 0] {
    check_continue_assert!(value != 0);
    kept += 1;
  }

  assert_eq!(kept, 2);
  assert_eq!(count.get(), 2);
}

#[test]
fn finish_ends_the_success_path() {
  fn run(short: bool, reached: &mut bool) -> Result<u8, Failure> {
    if short {
      finish!(1);
    }
    *reached = true;
    Ok(2)
  }

  let mut reached = false;
  assert_eq!(run(true, &mut reached), Ok(1));
  assert!(!reached);
  assert_eq!(run(false, &mut reached), Ok(2));
  assert!(reached);
}
