//! Sequential workflow execution.
//!
//! A run walks the main steps in order, stops at the first failing step
//! that does not have `continue_on_error`, and then runs either the
//! `on_success` or the `on_failure` hook list. Nothing is retried and
//! nothing runs in parallel. Step failures end up in the returned
//! `WorkflowResult`; `execute` itself cannot fail.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::errors::StepError;
use crate::vault::SecretSource;

use super::condition;
use super::definition::{Step, Workflow};
use super::executor::{CommandExecutor, CommandOutput, CommandSpec};
use super::expand::{Expander, Expansion, SecretMode};
use super::timeout::parse_timeout;

/// Called after every executed (or skipped) step.
pub type StepObserver = Box<dyn Fn(&Step, &StepResult) + Send + Sync>;

/// Outcome of one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: Step,
    pub success: bool,
    /// The step's `if:` evaluated to false; it did not run.
    pub skipped: bool,
    /// Combined stdout and stderr.
    pub output: String,
    pub error: Option<StepError>,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl StepResult {
    fn skipped(step: &Step) -> Self {
        Self {
            step: step.clone(),
            success: true,
            skipped: true,
            output: String::new(),
            error: None,
            exit_code: None,
            duration: Duration::ZERO,
        }
    }

    fn failed(step: &Step, error: StepError, duration: Duration) -> Self {
        Self {
            step: step.clone(),
            success: false,
            skipped: false,
            output: String::new(),
            error: Some(error),
            exit_code: None,
            duration,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub workflow: Workflow,
    /// Main steps in order, followed by the hook steps that ran.
    pub steps: Vec<StepResult>,
    /// False iff some main step failed.
    pub success: bool,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
}

impl WorkflowResult {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.success)
    }
}

/// Runs workflows against an executor, an engine-level environment and
/// an optional secret source.
///
/// The engine keeps no per-run state, so one instance can serve several
/// concurrent runs.
pub struct Engine {
    executor: Arc<dyn CommandExecutor>,
    env: BTreeMap<String, String>,
    vault: Option<Arc<dyn SecretSource>>,
    secret_mode: SecretMode,
    on_step: Option<StepObserver>,
}

impl Engine {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            env: BTreeMap::new(),
            vault: None,
            secret_mode: SecretMode::Inline,
            on_step: None,
        }
    }

    /// Engine-level environment; workflow and step `env` override it.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Attach a secret source for `${{ secrets.KEY }}`. The engine never
    /// locks or unlocks it.
    pub fn with_vault(mut self, vault: Arc<dyn SecretSource>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn with_secret_mode(mut self, mode: SecretMode) -> Self {
        self.secret_mode = mode;
        self
    }

    /// Register a callback for live progress reporting.
    pub fn on_step<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Step, &StepResult) + Send + Sync + 'static,
    {
        self.on_step = Some(Box::new(observer));
        self
    }

    /// Expand `input` the way a step's `run` line is expanded.
    pub fn expand(&self, input: &str, env: &BTreeMap<String, String>) -> Expansion {
        self.expander(env, self.secret_mode).expand(input)
    }

    /// Run `workflow` to completion.
    pub fn execute(&self, workflow: &Workflow) -> WorkflowResult {
        let span = tracing::info_span!("workflow", name = %workflow.name);
        let _enter = span.enter();

        let started_at = Utc::now();
        let start = Instant::now();

        let mut base_env = self.env.clone();
        base_env.extend(workflow.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut steps = Vec::with_capacity(workflow.steps.len());
        let mut success = true;
        // Drives `success()` / `failure()` conditions; hooks count too.
        let mut any_failed = false;

        for step in &workflow.steps {
            let result = self.run_step(step, &base_env, any_failed);
            self.notify(step, &result);

            let failed = !result.success;
            steps.push(result);
            if failed {
                success = false;
                any_failed = true;
                if !step.continue_on_error {
                    tracing::warn!(step = %step.name, "aborting workflow");
                    break;
                }
            }
        }

        let hooks = if success {
            &workflow.on_success
        } else {
            &workflow.on_failure
        };
        for step in hooks {
            let result = self.run_step(step, &base_env, any_failed);
            self.notify(step, &result);
            any_failed |= !result.success;
            steps.push(result);
        }

        let duration = start.elapsed();
        tracing::info!(success, steps = steps.len(), ?duration, "workflow finished");

        WorkflowResult {
            workflow: workflow.clone(),
            steps,
            success,
            duration,
            started_at,
        }
    }

    fn run_step(
        &self,
        step: &Step,
        base_env: &BTreeMap<String, String>,
        run_failed: bool,
    ) -> StepResult {
        let start = Instant::now();

        let mut env = base_env.clone();
        env.extend(step.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(raw) = step.condition.as_deref() {
            // Conditions never see secrets.
            let condition = Expander::new(&env).expand(raw).text;
            if !condition::evaluate(&condition, run_failed) {
                tracing::debug!(step = %step.name, "condition is false, skipping");
                return StepResult::skipped(step);
            }
        }

        let timeout = match step.timeout.as_deref() {
            None => None,
            Some(raw) => match parse_timeout(raw) {
                Some(limit) => Some(limit),
                None => {
                    let error = StepError::InvalidTimeout(raw.to_string());
                    tracing::warn!(step = %step.name, %error, "step failed");
                    return StepResult::failed(step, error, start.elapsed());
                }
            },
        };

        let command = self.expand(&step.run, &env);
        // The working directory never passes through a shell, so secrets
        // are always spliced directly there.
        let cwd = step
            .cwd
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| self.expander(&env, SecretMode::Inline).expand(c).text);

        let mut child_env: Vec<(String, String)> = env.into_iter().collect();
        child_env.extend(command.secret_env);

        tracing::debug!(step = %step.name, cwd = ?cwd, ?timeout, "running step");

        let spec = CommandSpec {
            command: &command.text,
            cwd: cwd.as_deref().map(Path::new),
            env: &child_env,
            timeout,
        };

        let result = match self.executor.run(&spec) {
            Ok(output) => finish(step, output, timeout, start.elapsed()),
            Err(e) => StepResult::failed(step, StepError::Spawn(e.to_string()), start.elapsed()),
        };

        if let Some(error) = &result.error {
            tracing::warn!(step = %step.name, %error, "step failed");
        }
        result
    }

    fn expander<'a>(&'a self, env: &'a BTreeMap<String, String>, mode: SecretMode) -> Expander<'a> {
        Expander::new(env).with_secrets(self.vault.as_deref(), mode)
    }

    fn notify(&self, step: &Step, result: &StepResult) {
        if let Some(observer) = &self.on_step {
            observer(step, result);
        }
    }
}

fn finish(
    step: &Step,
    output: CommandOutput,
    timeout: Option<Duration>,
    duration: Duration,
) -> StepResult {
    let error = if output.timed_out {
        Some(StepError::TimedOut(timeout.unwrap_or_default()))
    } else {
        match output.exit_code {
            Some(0) => None,
            Some(code) => Some(StepError::Exit(code)),
            None => Some(StepError::Signal),
        }
    };

    StepResult {
        step: step.clone(),
        success: error.is_none(),
        skipped: false,
        output: output.output,
        error,
        exit_code: output.exit_code,
        duration,
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("vault", &self.vault.is_some())
            .field("secret_mode", &self.secret_mode)
            .field("on_step", &self.on_step.is_some())
            .finish_non_exhaustive()
    }
}
