//! Placeholder expansion for step commands and working directories.
//!
//! Three kinds of placeholder are recognized in one left-to-right pass:
//!
//! | Syntax | Value |
//! |---|---|
//! | `${{ secrets.KEY }}` | secret from the attached source |
//! | `${{ KEY }}`, `${{ env.KEY }}` | merged workflow environment |
//! | `$VAR`, `${VAR}` | merged environment, then the process environment |
//!
//! Substituted text is never scanned again, so a secret that happens to
//! contain `${{ ... }}` or `$` comes through untouched. An unterminated
//! placeholder ends the scan and the remainder is copied verbatim.

use std::collections::BTreeMap;

use crate::vault::SecretSource;

const CONTEXT_OPEN: &str = "${{";
const CONTEXT_CLOSE: &str = "}}";
const SECRETS_PREFIX: &str = "secrets.";
const ENV_PREFIX: &str = "env.";

/// Prefix of the variables that carry secrets in `SecretMode::Environment`.
pub const SECRET_ENV_PREFIX: &str = "BDEV_SECRET_";

/// How `${{ secrets.KEY }}` reaches the shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecretMode {
    /// Splice the plaintext into the command line.
    #[default]
    Inline,
    /// Splice a `${BDEV_SECRET_KEY}` reference and export the value in
    /// the child's environment, so shell metacharacters in a secret are
    /// never parsed as syntax.
    Environment,
}

/// Result of expanding one string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    /// Variables to export to the child (only in `SecretMode::Environment`).
    pub secret_env: Vec<(String, String)>,
}

/// Expands placeholders against a merged environment and an optional
/// secret source.
pub struct Expander<'a> {
    env: &'a BTreeMap<String, String>,
    secrets: Option<&'a dyn SecretSource>,
    mode: SecretMode,
}

impl<'a> Expander<'a> {
    pub fn new(env: &'a BTreeMap<String, String>) -> Self {
        Self {
            env,
            secrets: None,
            mode: SecretMode::Inline,
        }
    }

    pub fn with_secrets(mut self, secrets: Option<&'a dyn SecretSource>, mode: SecretMode) -> Self {
        self.secrets = secrets;
        self.mode = mode;
        self
    }

    /// Expand every placeholder in `input`.
    pub fn expand(&self, input: &str) -> Expansion {
        // Only consult the source when there is something to look up; a
        // locked or missing source leaves secret placeholders as written.
        let secrets = self
            .secrets
            .filter(|s| input.contains(SECRETS_PREFIX) && s.is_unlocked());

        let mut out = Expansion {
            text: String::with_capacity(input.len()),
            secret_env: Vec::new(),
        };
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.text.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(body) = tail.strip_prefix(CONTEXT_OPEN) {
                let Some(end) = body.find(CONTEXT_CLOSE) else {
                    rest = tail;
                    break;
                };
                let raw = &tail[..CONTEXT_OPEN.len() + end + CONTEXT_CLOSE.len()];
                self.context(body[..end].trim(), raw, secrets, &mut out);
                rest = &body[end + CONTEXT_CLOSE.len()..];
            } else if let Some(body) = tail.strip_prefix("${") {
                let Some(end) = body.find('}') else {
                    rest = tail;
                    break;
                };
                let name = &body[..end];
                if identifier_len(name) == name.len() && !name.is_empty() {
                    out.text.push_str(&self.variable(name));
                } else {
                    // `${VAR:-default}` and friends are left for the shell.
                    out.text.push_str(&tail[..end + 3]);
                }
                rest = &body[end + 1..];
            } else {
                let body = &tail[1..];
                let len = identifier_len(body);
                if len == 0 {
                    out.text.push('$');
                } else {
                    out.text.push_str(&self.variable(&body[..len]));
                }
                rest = &body[len..];
            }
        }

        // Either no `$` is left or an unterminated placeholder stopped the
        // scan; in both cases the remainder goes out as written.
        out.text.push_str(rest);
        out
    }

    /// Resolve the inside of a `${{ ... }}` token.
    fn context(
        &self,
        inner: &str,
        raw: &str,
        secrets: Option<&dyn SecretSource>,
        out: &mut Expansion,
    ) {
        if let Some(key) = inner.strip_prefix(SECRETS_PREFIX) {
            let Some(source) = secrets else {
                out.text.push_str(raw);
                return;
            };
            let key = key.trim();
            // A missing secret becomes empty rather than leaking the
            // template into the shell.
            let value = source.get(key).unwrap_or_default();
            match self.mode {
                SecretMode::Inline => out.text.push_str(&value),
                SecretMode::Environment => {
                    let var = secret_env_name(key);
                    out.text.push_str(&format!("${{{var}}}"));
                    if !out.secret_env.iter().any(|(name, _)| *name == var) {
                        out.secret_env.push((var, value));
                    }
                }
            }
            return;
        }

        let key = inner.strip_prefix(ENV_PREFIX).unwrap_or(inner).trim();
        match self.env.get(key) {
            Some(value) => out.text.push_str(value),
            None => out.text.push_str(raw),
        }
    }

    /// `$VAR` lookup: merged env first, then the process environment.
    fn variable(&self, name: &str) -> String {
        match self.env.get(name) {
            Some(value) => value.clone(),
            None => std::env::var(name).unwrap_or_default(),
        }
    }
}

/// Environment variable carrying secret `key` in `SecretMode::Environment`.
pub fn secret_env_name(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{SECRET_ENV_PREFIX}{sanitized}")
}

/// Length of the shell identifier (`[A-Za-z_][A-Za-z0-9_]*`) at the start of `s`.
fn identifier_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return 0,
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}
