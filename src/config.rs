use crate::assertion::{self, AssertPolicy};
use crate::domain;
use std::env;

pub const ERROR_DOMAIN_VARIABLE: &str = "EHM_ERROR_DOMAIN";
pub const ASSERTIONS_VARIABLE: &str = "EHM_ASSERTIONS";

/// Startup settings. Anything left unset keeps its built-in default.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub error_domain: Option<String>,
  #[serde(default)]
  pub assertions: Option<AssertPolicy>,
}

impl Config {
  pub fn from_json(message: &str) -> Result<Self, String> {
    serde_json::from_str(message).map_err(|e| e.to_string())
  }

  pub fn from_env() -> Result<Self, String> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup<F>(lookup: F) -> Result<Self, String>
  where
    F: Fn(&str) -> Option<String>,
  {
    let assertions = match lookup(ASSERTIONS_VARIABLE) {
      Some(value) => Some(
        value
          .parse::<AssertPolicy>()
          .map_err(|e| format!("{}: {}", ASSERTIONS_VARIABLE, e))?,
      ),
      None => None,
    };

    Ok(Config {
      error_domain: lookup(ERROR_DOMAIN_VARIABLE),
      assertions,
    })
  }

  /// Installs the settings for the whole process. Call it once, before any
  /// error is built.
  pub fn apply(&self) -> Result<(), String> {
    if let Some(error_domain) = &self.error_domain {
      domain::set_error_domain(error_domain)?;
      info!("Error domain set to {:?}", error_domain);
    }
    if let Some(policy) = self.assertions {
      assertion::set_policy(policy);
      info!("Assertion policy set to {}", policy);
    }
    Ok(())
  }
}

#[test]
fn parse_json_config() {
  let config = Config::from_json(r#"{"error_domain": "com.example.player", "assertions": "log"}"#).unwrap();
  assert_eq!(
    config,
    Config {
      error_domain: Some("com.example.player".to_string()),
      assertions: Some(AssertPolicy::Log),
    }
  );

  assert_eq!(Config::from_json("{}").unwrap(), Config::default());
  assert!(Config::from_json(r#"{"assertions": "loud"}"#).is_err());
  assert!(Config::from_json(r#"{"verbose": true}"#).is_err());
}

#[test]
fn both_sources_accept_the_same_policy_names() {
  for (name, policy) in [
    ("panic", AssertPolicy::Panic),
    ("abort", AssertPolicy::Panic),
    ("log", AssertPolicy::Log),
    ("ignore", AssertPolicy::Ignore),
    ("off", AssertPolicy::Ignore),
  ] {
    let json = Config::from_json(&format!(r#"{{"assertions": "{}"}}"#, name)).unwrap();
    let variables = Config::from_lookup(|key| match key {
      ASSERTIONS_VARIABLE => Some(name.to_string()),
      _ => None,
    })
    .unwrap();
    assert_eq!(json.assertions, Some(policy));
    assert_eq!(variables.assertions, Some(policy));
  }
}

#[test]
fn read_config_from_variables() {
  let config = Config::from_lookup(|key| match key {
    ASSERTIONS_VARIABLE => Some("ignore".to_string()),
    _ => None,
  })
  .unwrap();
  assert_eq!(config.assertions, Some(AssertPolicy::Ignore));
  assert_eq!(config.error_domain, None);

  let error = Config::from_lookup(|key| match key {
    ASSERTIONS_VARIABLE => Some("sometimes".to_string()),
    _ => None,
  })
  .unwrap_err();
  assert!(error.starts_with(ASSERTIONS_VARIABLE));
}

#[test]
fn empty_config_changes_nothing() {
  let policy = assertion::policy();
  assert!(Config::default().apply().is_ok());
  assert_eq!(assertion::policy(), policy);
}
