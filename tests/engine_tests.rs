//! Integration tests for the workflow engine.
//!
//! Most tests drive the engine with a scripted executor that records every
//! call; a few at the bottom run real commands through `sh`.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bdev::errors::{BdevError, Result, StepError};
use bdev::vault::SecretSource;
use bdev::workflow::{
    secret_env_name, CommandExecutor, CommandOutput, CommandSpec, Engine, SecretMode, Step,
    Workflow,
};

// ---------------------------------------------------------------------------
// Scripted executor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Call {
    command: String,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

/// Succeeds for every command except those listed in `failing`;
/// `unspawnable` commands return an I/O error.
#[derive(Default)]
struct Scripted {
    calls: Mutex<Vec<Call>>,
    failing: Vec<&'static str>,
    unspawnable: Vec<&'static str>,
}

impl Scripted {
    fn failing(commands: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            failing: commands.to_vec(),
            ..Self::default()
        })
    }

    fn ok() -> Arc<Self> {
        Self::failing(&[])
    }

    fn commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.command.clone()).collect()
    }

    fn call(&self, index: usize) -> Call {
        self.calls.lock().unwrap()[index].clone()
    }
}

impl CommandExecutor for Scripted {
    fn run(&self, spec: &CommandSpec<'_>) -> io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(Call {
            command: spec.command.to_string(),
            cwd: spec.cwd.map(PathBuf::from),
            env: spec.env.to_vec(),
            timeout: spec.timeout,
        });

        if self.unspawnable.iter().any(|c| *c == spec.command) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such shell"));
        }

        let code = if self.failing.iter().any(|c| *c == spec.command) { 1 } else { 0 };
        Ok(CommandOutput {
            output: format!("ran {}\n", spec.command),
            exit_code: Some(code),
            timed_out: false,
        })
    }
}

fn workflow(steps: &[&str]) -> Workflow {
    Workflow {
        name: "test".into(),
        steps: steps.iter().map(|s| Step::new(*s, *s)).collect(),
        ..Workflow::default()
    }
}

fn env_of(call: &Call, key: &str) -> Option<String> {
    call.env
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

struct LockedSource;

impl SecretSource for LockedSource {
    fn get(&self, _key: &str) -> Result<String> {
        Err(BdevError::VaultLocked)
    }

    fn is_unlocked(&self) -> bool {
        false
    }
}

fn secrets(pairs: &[(&str, &str)]) -> Arc<dyn SecretSource> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(map)
}

// ---------------------------------------------------------------------------
// Ordering and failure handling
// ---------------------------------------------------------------------------

#[test]
fn steps_run_in_order() {
    let exec = Scripted::ok();
    let result = Engine::new(exec.clone()).execute(&workflow(&["A", "B"]));

    assert!(result.success);
    assert_eq!(exec.commands(), vec!["A", "B"]);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.steps[0].output, "ran A\n");
    assert_eq!(result.steps[1].exit_code, Some(0));
}

#[test]
fn failing_step_aborts_the_run() {
    let exec = Scripted::failing(&["A"]);
    let result = Engine::new(exec.clone()).execute(&workflow(&["A", "B"]));

    assert!(!result.success);
    assert_eq!(exec.commands(), vec!["A"]);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].error, Some(StepError::Exit(1)));
}

#[test]
fn continue_on_error_keeps_going_but_fails_the_run() {
    let exec = Scripted::failing(&["B"]);
    let mut wf = workflow(&["A", "B", "C"]);
    wf.steps[1].continue_on_error = true;
    wf.on_success = vec![Step::new("ok hook", "S")];
    wf.on_failure = vec![Step::new("fail hook", "F")];

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(!result.success);
    assert_eq!(exec.commands(), vec!["A", "B", "C", "F"]);
    let flags: Vec<bool> = result.steps.iter().map(|s| s.success).collect();
    assert_eq!(flags, vec![true, false, true, true]);
}

#[test]
fn success_runs_only_on_success_hooks() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["A"]);
    wf.on_success = vec![Step::new("ok hook", "S")];
    wf.on_failure = vec![Step::new("fail hook", "F")];

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(result.success);
    assert_eq!(exec.commands(), vec!["A", "S"]);
}

#[test]
fn failure_runs_only_on_failure_hooks() {
    let exec = Scripted::failing(&["A"]);
    let mut wf = workflow(&["A", "B"]);
    wf.on_success = vec![Step::new("ok hook", "S")];
    wf.on_failure = vec![Step::new("fail hook", "F")];

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(!result.success);
    assert_eq!(exec.commands(), vec!["A", "F"]);
}

#[test]
fn failing_hook_does_not_change_success() {
    let exec = Scripted::failing(&["S1"]);
    let mut wf = workflow(&["A"]);
    wf.on_success = vec![Step::new("first", "S1"), Step::new("second", "S2")];

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(result.success);
    assert_eq!(exec.commands(), vec!["A", "S1", "S2"]);
    assert_eq!(result.failed_steps().count(), 1);
}

#[test]
fn empty_workflow_succeeds_and_runs_success_hooks() {
    let exec = Scripted::ok();
    let mut wf = workflow(&[]);
    wf.on_success = vec![Step::new("done", "S")];

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(result.success);
    assert_eq!(exec.commands(), vec!["S"]);
}

#[test]
fn spawn_failure_is_a_step_failure() {
    let exec = Arc::new(Scripted {
        unspawnable: vec!["A"],
        ..Scripted::default()
    });
    let result = Engine::new(exec).execute(&workflow(&["A", "B"]));

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert!(matches!(result.steps[0].error, Some(StepError::Spawn(_))));
}

// ---------------------------------------------------------------------------
// Environment and expansion
// ---------------------------------------------------------------------------

#[test]
fn step_env_beats_workflow_env_beats_engine_env() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["echo ${{ X }} ${{ env.Y }}", "echo ${{ X }} $Y"]);
    wf.env.insert("X".into(), "workflow".into());
    wf.steps[0].env.insert("X".into(), "step".into());

    let engine_env = BTreeMap::from([
        ("X".to_string(), "engine".to_string()),
        ("Y".to_string(), "engine-y".to_string()),
    ]);
    Engine::new(exec.clone()).with_env(engine_env).execute(&wf);

    assert_eq!(exec.commands(), vec!["echo step engine-y", "echo workflow engine-y"]);
    assert_eq!(env_of(&exec.call(0), "X").as_deref(), Some("step"));
    assert_eq!(env_of(&exec.call(1), "X").as_deref(), Some("workflow"));
}

#[test]
fn expand_previews_without_running_anything() {
    let exec = Scripted::ok();
    let engine = Engine::new(exec.clone())
        .with_vault(secrets(&[("TOKEN", "t0k")]))
        .with_secret_mode(SecretMode::Environment);
    let env = BTreeMap::from([("HOST".to_string(), "db".to_string())]);

    let preview = engine.expand("connect ${{ HOST }} ${{ secrets.TOKEN }}", &env);

    assert_eq!(preview.text, "connect db ${BDEV_SECRET_TOKEN}");
    assert_eq!(
        preview.secret_env,
        vec![(secret_env_name("TOKEN"), "t0k".to_string())]
    );
    assert!(exec.commands().is_empty());
}

#[test]
fn unknown_context_placeholder_is_left_alone() {
    let exec = Scripted::ok();
    Engine::new(exec.clone()).execute(&workflow(&["echo ${{ NOPE }}"]));
    assert_eq!(exec.commands(), vec!["echo ${{ NOPE }}"]);
}

#[test]
fn cwd_is_expanded() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["ls"]);
    wf.env.insert("ROOT".into(), "/srv".into());
    wf.steps[0].cwd = Some("${ROOT}/app".into());

    Engine::new(exec.clone()).execute(&wf);

    assert_eq!(exec.call(0).cwd, Some(PathBuf::from("/srv/app")));
}

#[test]
fn secrets_are_spliced_inline() {
    let exec = Scripted::ok();
    let wf = workflow(&["deploy --token ${{ secrets.TOKEN }} ${{secrets.MISSING}}!"]);

    Engine::new(exec.clone())
        .with_vault(secrets(&[("TOKEN", "s3cr3t")]))
        .execute(&wf);

    assert_eq!(exec.commands(), vec!["deploy --token s3cr3t !"]);
}

#[test]
fn without_a_vault_secret_placeholders_stay() {
    let exec = Scripted::ok();
    let wf = workflow(&["echo ${{ secrets.TOKEN }}"]);

    Engine::new(exec.clone()).execute(&wf);
    Engine::new(exec.clone())
        .with_vault(Arc::new(LockedSource))
        .execute(&wf);

    assert_eq!(
        exec.commands(),
        vec!["echo ${{ secrets.TOKEN }}", "echo ${{ secrets.TOKEN }}"]
    );
}

#[test]
fn environment_mode_passes_secrets_out_of_band() {
    let exec = Scripted::ok();
    let wf = workflow(&["curl -H \"Auth: ${{ secrets.api-key }}\""]);

    Engine::new(exec.clone())
        .with_vault(secrets(&[("api-key", "a;b $(rm -rf /)")]))
        .with_secret_mode(SecretMode::Environment)
        .execute(&wf);

    let var = secret_env_name("api-key");
    assert_eq!(var, "BDEV_SECRET_API_KEY");
    assert_eq!(exec.commands(), vec![format!("curl -H \"Auth: ${{{var}}}\"")]);
    assert_eq!(env_of(&exec.call(0), &var).as_deref(), Some("a;b $(rm -rf /)"));
}

#[test]
fn substituted_values_are_not_rescanned() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["echo ${{ A }}"]);
    wf.env.insert("A".into(), "${{ secrets.TOKEN }} $B".into());
    wf.env.insert("B".into(), "expanded".into());

    Engine::new(exec.clone())
        .with_vault(secrets(&[("TOKEN", "s3cr3t")]))
        .execute(&wf);

    assert_eq!(exec.commands(), vec!["echo ${{ secrets.TOKEN }} $B"]);
}

// ---------------------------------------------------------------------------
// Conditions and timeouts
// ---------------------------------------------------------------------------

#[test]
fn conditions_skip_steps() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["A", "B", "C"]);
    wf.env.insert("TARGET".into(), "staging".into());
    wf.steps[0].condition = Some("${{ TARGET }} == 'prod'".into());
    wf.steps[1].condition = Some("failure()".into());
    wf.steps[2].condition = Some("$TARGET != prod".into());

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(result.success);
    assert_eq!(exec.commands(), vec!["C"]);
    assert!(result.steps[0].skipped && result.steps[0].success);
    assert!(result.steps[1].skipped);
    assert!(!result.steps[2].skipped);
}

#[test]
fn failure_condition_sees_earlier_failures() {
    let exec = Scripted::failing(&["A"]);
    let mut wf = workflow(&["A", "B"]);
    wf.steps[0].continue_on_error = true;
    wf.steps[1].condition = Some("failure()".into());
    wf.on_failure = vec![Step::new("cleanup", "C")];
    wf.on_failure[0].condition = Some("always()".into());

    Engine::new(exec.clone()).execute(&wf);

    assert_eq!(exec.commands(), vec!["A", "B", "C"]);
}

#[test]
fn timeout_reaches_the_executor() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["A"]);
    wf.steps[0].timeout = Some("1500ms".into());

    Engine::new(exec.clone()).execute(&wf);

    assert_eq!(exec.call(0).timeout, Some(Duration::from_millis(1500)));
}

#[test]
fn invalid_timeout_fails_without_running() {
    let exec = Scripted::ok();
    let mut wf = workflow(&["A", "B"]);
    wf.steps[0].timeout = Some("forever".into());

    let result = Engine::new(exec.clone()).execute(&wf);

    assert!(!result.success);
    assert!(exec.commands().is_empty());
    assert_eq!(
        result.steps[0].error,
        Some(StepError::InvalidTimeout("forever".into()))
    );
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

#[test]
fn observer_sees_every_step_including_hooks() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut wf = workflow(&["A", "B"]);
    wf.on_failure = vec![Step::new("hook", "H")];

    let result = Engine::new(Scripted::failing(&["B"]))
        .on_step(move |step, result| {
            sink.lock()
                .unwrap()
                .push(format!("{}:{}", step.name, result.success));
        })
        .execute(&wf);

    assert!(!result.success);
    assert_eq!(*seen.lock().unwrap(), vec!["A:true", "B:false", "hook:true"]);
}

#[test]
fn result_records_the_workflow() {
    let wf = workflow(&["A"]);
    let result = Engine::new(Scripted::ok()).execute(&wf);
    assert_eq!(result.workflow, wf);
    assert!(result.started_at <= chrono::Utc::now());
}

// ---------------------------------------------------------------------------
// Real shell
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod shell {
    use super::*;
    use bdev::workflow::ShellExecutor;

    fn engine() -> Engine {
        Engine::new(Arc::new(ShellExecutor::new().resolve().unwrap()))
    }

    #[test]
    fn captures_output_and_exit_codes() {
        let wf = Workflow {
            name: "sh".into(),
            steps: vec![
                Step::new("greet", "echo hello; echo oops >&2"),
                Step::new("fail", "exit 3"),
            ],
            ..Workflow::default()
        };

        let result = engine().execute(&wf);

        assert!(!result.success);
        assert!(result.steps[0].output.contains("hello"));
        assert!(result.steps[0].output.contains("oops"));
        assert_eq!(result.steps[1].error, Some(StepError::Exit(3)));
    }

    #[test]
    fn step_env_reaches_the_process() {
        let mut step = Step::new("env", "printf '%s' \"$GREETING\"");
        step.env.insert("GREETING".into(), "hi there".into());
        let wf = Workflow {
            name: "sh".into(),
            steps: vec![step],
            ..Workflow::default()
        };

        let result = engine().execute(&wf);
        assert_eq!(result.steps[0].output, "hi there");
    }

    #[test]
    fn timed_out_step_is_killed() {
        let mut step = Step::new("slow", "sleep 5");
        step.timeout = Some("200ms".into());
        let wf = Workflow {
            name: "sh".into(),
            steps: vec![step, Step::new("never", "echo never")],
            ..Workflow::default()
        };

        let result = engine().execute(&wf);

        assert!(!result.success);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(
            result.steps[0].error,
            Some(StepError::TimedOut(Duration::from_millis(200)))
        );
        assert!(result.steps[0].duration < Duration::from_secs(4));
    }

    #[test]
    fn background_child_cannot_outlive_the_deadline() {
        let mut step = Step::new("detach", "sleep 3 & echo started");
        step.timeout = Some("200ms".into());
        let wf = Workflow {
            name: "sh".into(),
            steps: vec![step],
            ..Workflow::default()
        };

        let result = engine().execute(&wf);

        assert!(!result.success);
        assert!(result.steps[0].output.contains("started"));
        assert_eq!(
            result.steps[0].error,
            Some(StepError::TimedOut(Duration::from_millis(200)))
        );
        assert!(result.duration < Duration::from_secs(1));
    }

    #[test]
    fn environment_mode_keeps_metacharacters_inert() {
        let wf = Workflow {
            name: "sh".into(),
            steps: vec![Step::new("print", "printf '%s' \"${{ secrets.TOKEN }}\"")],
            ..Workflow::default()
        };

        let result = engine()
            .with_vault(secrets(&[("TOKEN", "a;b $(echo pwned)")]))
            .with_secret_mode(SecretMode::Environment)
            .execute(&wf);

        assert!(result.success);
        assert_eq!(result.steps[0].output, "a;b $(echo pwned)");
    }
}
