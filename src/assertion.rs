//! Hard assertions.
//!
//! A failed hard assertion is a programming error. What happens next is decided
//! by the [`AssertPolicy`]: debug builds panic, release builds ignore the
//! assertion, unless the policy is changed at startup.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertPolicy {
  /// Log the diagnostic, then panic.
  #[serde(alias = "abort")]
  Panic,
  /// Log the diagnostic and carry on.
  Log,
  /// Drop the diagnostic.
  #[serde(alias = "off")]
  Ignore,
}

impl AssertPolicy {
  pub const fn build_default() -> Self {
    if cfg!(debug_assertions) {
      AssertPolicy::Panic
    } else {
      AssertPolicy::Ignore
    }
  }

  const fn to_u8(self) -> u8 {
    match self {
      AssertPolicy::Panic => 1,
      AssertPolicy::Log => 2,
      AssertPolicy::Ignore => 3,
    }
  }

  const fn from_u8(value: u8) -> Option<Self> {
    match value {
      1 => Some(AssertPolicy::Panic),
      2 => Some(AssertPolicy::Log),
      3 => Some(AssertPolicy::Ignore),
      _ => None,
    }
  }
}

impl fmt::Display for AssertPolicy {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      AssertPolicy::Panic => "panic",
      AssertPolicy::Log => "log",
      AssertPolicy::Ignore => "ignore",
    };
    write!(f, "{name}")
  }
}

impl FromStr for AssertPolicy {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim().to_lowercase().as_str() {
      "panic" | "abort" => Ok(AssertPolicy::Panic),
      "log" => Ok(AssertPolicy::Log),
      "ignore" | "off" => Ok(AssertPolicy::Ignore),
      other => Err(format!("Unknown assertion policy {other:?}")),
    }
  }
}

/// A raised assertion, with the location of the failing check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
  pub message: String,
  pub file: &'static str,
  pub line: u32,
}

impl Diagnostic {
  pub fn new(message: String, file: &'static str, line: u32) -> Self {
    Diagnostic {
      message,
      file,
      line,
    }
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{} ({}:{})", self.message, self.file, self.line)
  }
}

type Hook = Box<dyn FnMut(&Diagnostic)>;

// 0 means not configured, fall back to the build default.
static POLICY: AtomicU8 = AtomicU8::new(0);

thread_local! {
  static POLICY_OVERRIDE: Cell<Option<AssertPolicy>> = Cell::new(None);
  static HOOK: RefCell<Option<Hook>> = RefCell::new(None);
}

/// Policy in effect on the current thread.
pub fn policy() -> AssertPolicy {
  POLICY_OVERRIDE
    .with(Cell::get)
    .or_else(|| AssertPolicy::from_u8(POLICY.load(Ordering::Relaxed)))
    .unwrap_or_else(AssertPolicy::build_default)
}

/// Sets the process wide policy.
pub fn set_policy(policy: AssertPolicy) {
  POLICY.store(policy.to_u8(), Ordering::Relaxed);
}

/// Restores the previous thread policy, and hook if one was replaced, when
/// dropped.
#[must_use = "the override ends when the guard is dropped"]
pub struct ScopedAssertions {
  previous_policy: Option<AssertPolicy>,
  // None when the hook was left untouched
  previous_hook: Option<Option<Hook>>,
}

impl Drop for ScopedAssertions {
  fn drop(&mut self) {
    POLICY_OVERRIDE.with(|cell| cell.set(self.previous_policy));
    if let Some(previous_hook) = self.previous_hook.take() {
      HOOK.with(|hook| match hook.try_borrow_mut() {
        Ok(mut hook) => *hook = previous_hook,
        Err(_) => warn!("Assertion hook is running, it cannot be restored"),
      });
    }
  }
}

/// Overrides the policy on the current thread until the guard is dropped.
/// An installed hook stays in place.
pub fn scoped(policy: AssertPolicy) -> ScopedAssertions {
  let previous_policy = POLICY_OVERRIDE.with(|cell| cell.replace(Some(policy)));
  ScopedAssertions {
    previous_policy,
    previous_hook: None,
  }
}

/// Same as [`scoped`], also routing every raised diagnostic through `hook`
/// before the policy acts on it. The hook replaces the current one until the
/// guard is dropped; it is not installed when called from a running hook.
pub fn scoped_with_hook<F>(policy: AssertPolicy, hook: F) -> ScopedAssertions
where
  F: FnMut(&Diagnostic) + 'static,
{
  let mut guard = scoped(policy);
  HOOK.with(|cell| match cell.try_borrow_mut() {
    Ok(mut current) => guard.previous_hook = Some(current.replace(Box::new(hook))),
    Err(_) => warn!("Assertion hook is running, the new hook is not installed"),
  });
  guard
}

/// Reports a failed hard assertion according to the current policy.
pub fn raise(diagnostic: Diagnostic) {
  let policy = policy();
  if policy == AssertPolicy::Ignore {
    return;
  }

  HOOK.with(|hook| {
    // a hook raising an assertion itself is not called again
    if let Ok(mut hook) = hook.try_borrow_mut() {
      if let Some(hook) = hook.as_mut() {
        hook(&diagnostic);
      }
    }
  });

  error!("{}", diagnostic);
  if policy == AssertPolicy::Panic {
    panic!("{}", diagnostic);
  }
}

/// `VBR`: asserts that the condition holds.
#[macro_export]
macro_rules! verify {
  ($condition: expr) => {
    $crate::verify!($condition, "ERROR")
  };
  ($condition: expr, $($arg: tt)+) => {
    if !($condition) {
      $crate::assertion::raise($crate::assertion::Diagnostic::new(
        format!($($arg)+),
        file!(),
        line!(),
      ));
    }
  };
}

/// `VPR`: asserts that the value is present (not `None`, not a null pointer).
#[macro_export]
macro_rules! verify_ptr {
  ($value: expr) => {
    $crate::verify_ptr!($value, "ERROR")
  };
  ($value: expr, $($arg: tt)+) => {
    if $crate::check::Presence::is_absent(&$value) {
      $crate::assertion::raise($crate::assertion::Diagnostic::new(
        format!($($arg)+),
        file!(),
        line!(),
      ));
    }
  };
}

#[test]
fn parse_policy() {
  assert_eq!("panic".parse::<AssertPolicy>(), Ok(AssertPolicy::Panic));
  assert_eq!(" Log ".parse::<AssertPolicy>(), Ok(AssertPolicy::Log));
  assert_eq!("off".parse::<AssertPolicy>(), Ok(AssertPolicy::Ignore));
  assert!("loud".parse::<AssertPolicy>().is_err());
  assert_eq!(AssertPolicy::Log.to_string(), "log");
}

#[test]
fn scoped_policy_is_restored() {
  let outer = policy();
  {
    let _guard = scoped(AssertPolicy::Log);
    assert_eq!(policy(), AssertPolicy::Log);
    {
      let _inner = scoped(AssertPolicy::Ignore);
      assert_eq!(policy(), AssertPolicy::Ignore);
    }
    assert_eq!(policy(), AssertPolicy::Log);
  }
  assert_eq!(policy(), outer);
}

#[test]
fn nested_scope_keeps_the_hook() {
  use std::rc::Rc;

  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |_| counter.set(counter.get() + 1));

  {
    let _inner = scoped(AssertPolicy::Log);
    verify!(false);
  }
  verify!(false);
  assert_eq!(count.get(), 2);
}

#[test]
fn scoping_from_a_running_hook() {
  use std::rc::Rc;

  let policies = Rc::new(RefCell::new(vec![]));
  let recorder = policies.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |_| {
    let _inner = scoped(AssertPolicy::Ignore);
    recorder.borrow_mut().push(policy());
    let _ignored = scoped_with_hook(AssertPolicy::Ignore, |_| {});
  });

  verify!(false);
  verify!(false);
  assert_eq!(*policies.borrow(), vec![AssertPolicy::Ignore, AssertPolicy::Ignore]);
  assert_eq!(policy(), AssertPolicy::Log);
}

#[test]
fn verify_reports_through_hook() {
  use std::rc::Rc;

  let seen = Rc::new(RefCell::new(vec![]));
  let recorder = seen.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |diagnostic| {
    recorder.borrow_mut().push(diagnostic.message.clone())
  });

  verify!(1 + 1 == 2);
  verify!(1 + 1 == 3);
  verify!(false, "bad frame {}", 12);

  assert_eq!(*seen.borrow(), vec!["ERROR".to_string(), "bad frame 12".to_string()]);
}

#[test]
fn verify_ptr_checks_presence() {
  use std::ptr::null;
  use std::rc::Rc;

  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let _guard = scoped_with_hook(AssertPolicy::Log, move |_| counter.set(counter.get() + 1));

  let value = 5u8;
  verify_ptr!(Some(3));
  verify_ptr!(&value as *const u8);
  assert_eq!(count.get(), 0);

  verify_ptr!(None::<u8>);
  verify_ptr!(null::<u8>());
  assert_eq!(count.get(), 2);
}

#[test]
fn ignore_policy_suppresses_hook() {
  use std::rc::Rc;

  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let _guard = scoped_with_hook(AssertPolicy::Ignore, move |_| counter.set(counter.get() + 1));

  verify!(false);
  assert_eq!(count.get(), 0);
}

#[test]
#[should_panic(expected = "ERROR")]
fn panic_policy_is_fatal() {
  let _guard = scoped(AssertPolicy::Panic);
  verify!(false);
}
