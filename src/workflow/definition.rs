//! Workflow and step definitions as they appear in YAML.
//!
//! ```yaml
//! name: deploy
//! description: Build and ship
//! env:
//!   TARGET: production
//! steps:
//!   - name: Build
//!     run: cargo build --release
//!   - name: Upload
//!     run: ./upload.sh --token ${{ secrets.DEPLOY_TOKEN }}
//!     cwd: $HOME/releases
//!     timeout: 5m
//!     continue_on_error: true
//! on_failure:
//!   - name: Notify
//!     run: echo "deploy of $TARGET failed"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named, ordered list of shell steps plus optional hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Falls back to the file name when empty.
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Workflow-level environment, overridden by step `env`.
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "scalar::map"
    )]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub steps: Vec<Step>,

    /// Run after the main steps when none failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<Step>,

    /// Run after the main steps when one failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<Step>,
}

impl Workflow {
    /// Whether any command, directory, condition or env value refers to
    /// `secrets.`, i.e. whether running it needs an unlocked vault.
    pub fn references_secrets(&self) -> bool {
        let env_uses = |env: &BTreeMap<String, String>| env.values().any(|v| v.contains("secrets."));

        env_uses(&self.env)
            || self
                .steps
                .iter()
                .chain(&self.on_success)
                .chain(&self.on_failure)
                .any(|s| {
                    s.run.contains("secrets.")
                        || s.cwd.as_deref().is_some_and(|c| c.contains("secrets."))
                        || env_uses(&s.env)
                })
    }
}

/// One shell command and its execution context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: String,

    /// Command line handed to the shell after expansion.
    #[serde(default)]
    pub run: String,

    /// Working directory, expanded like `run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "scalar::map"
    )]
    pub env: BTreeMap<String, String>,

    /// Condition evaluated before the step runs; see `condition`.
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// A failure of this step does not stop the remaining steps.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub continue_on_error: bool,

    /// e.g. `30s`, `5m`, `1h`, `250ms`; a bare number means seconds.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar::optional"
    )]
    pub timeout: Option<String>,
}

impl Step {
    /// A step that just runs `command`.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: command.into(),
            ..Self::default()
        }
    }
}

/// YAML happily types `PORT: 8080` or `timeout: 30` as numbers; these
/// helpers accept any scalar and keep its textual form.
mod scalar {
    use std::collections::BTreeMap;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    fn to_string<E: Error>(value: Value) -> Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(E::custom(format!("expected a scalar, found {other:?}"))),
        }
    }

    pub fn map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
        raw.unwrap_or_default()
            .into_iter()
            .map(|(k, v)| Ok((k, to_string(v)?)))
            .collect()
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(v) => to_string(v).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_definition() {
        let yaml = r#"
name: deploy
description: Ship it
env:
  TARGET: prod
  PORT: 8080
steps:
  - name: Build
    run: make
    timeout: 30
  - name: Push
    run: ./push ${{ secrets.TOKEN }}
    cwd: /tmp
    env:
      VERBOSE: true
    if: success()
    continue_on_error: true
on_success:
  - name: Done
    run: echo ok
on_failure:
  - name: Alert
    run: echo fail
"#;
        let wf: Workflow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wf.name, "deploy");
        assert_eq!(wf.env["PORT"], "8080");
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0].timeout.as_deref(), Some("30"));
        assert!(!wf.steps[0].continue_on_error);

        let push = &wf.steps[1];
        assert_eq!(push.cwd.as_deref(), Some("/tmp"));
        assert_eq!(push.env["VERBOSE"], "true");
        assert_eq!(push.condition.as_deref(), Some("success()"));
        assert!(push.continue_on_error);

        assert_eq!(wf.on_success[0].name, "Done");
        assert_eq!(wf.on_failure[0].name, "Alert");
        assert!(wf.references_secrets());
    }

    #[test]
    fn minimal_definition_uses_defaults() {
        let wf: Workflow = serde_yaml::from_str("steps:\n  - run: ls\n").unwrap();
        assert!(wf.name.is_empty());
        assert!(wf.env.is_empty());
        assert!(wf.on_failure.is_empty());
        assert!(!wf.references_secrets());
    }

    #[test]
    fn nested_env_value_is_rejected() {
        let yaml = "env:\n  A:\n    - 1\nsteps: []\n";
        assert!(serde_yaml::from_str::<Workflow>(yaml).is_err());
    }

    #[test]
    fn serializing_skips_empty_fields() {
        let wf = Workflow {
            name: "x".into(),
            steps: vec![Step::new("s", "true")],
            ..Workflow::default()
        };
        let yaml = serde_yaml::to_string(&wf).unwrap();
        assert!(!yaml.contains("on_success"));
        assert!(!yaml.contains("continue_on_error"));
        assert!(!yaml.contains("timeout"));
    }
}
