use ehm::assertion::{self, AssertPolicy};
use ehm::config::Config;
use ehm::prelude::*;

// Alone in its binary: the error domain is process wide and can be set once.
#[test]
fn configure_at_startup() {
  let config = Config::from_json(r#"{"error_domain": "com.nomalab.player", "assertions": "log"}"#).unwrap();
  config.apply().unwrap();

  assert_eq!(error_domain(), "com.nomalab.player");
  assert_eq!(assertion::policy(), AssertPolicy::Log);

  let error = Error::from(Failure::condition("width > 0", "src/scaler.rs", 12));
  assert_eq!(error.domain, "com.nomalab.player");
  assert!(error.is_in_current_domain());

  // hard assertions only log now
  verify!(error.code == ERR_SUCCESS);

  assert!(config.apply().is_err());
  assert!(ehm::domain::set_error_domain("com.example.other").is_err());
  assert_eq!(error_domain(), "com.nomalab.player");
}
