//! Evaluation of a step's `if:` field.
//!
//! The condition has already been through env expansion when it gets here.
//! Supported forms:
//!
//! - `always()`, `success()`, `failure()`: status of the run so far
//! - `A == B`, `A != B`: string comparison, operands optionally quoted
//! - anything else: truthy unless empty, `false`, `0`, `no` or `off`

/// Whether a step guarded by `condition` should run.
///
/// `run_failed` is true once any earlier step in this run has failed.
pub fn evaluate(condition: &str, run_failed: bool) -> bool {
    let condition = condition.trim();

    match condition {
        "always()" => return true,
        "success()" => return !run_failed,
        "failure()" => return run_failed,
        _ => {}
    }

    if let Some((lhs, rhs)) = condition.split_once("!=") {
        return unquote(lhs) != unquote(rhs);
    }
    if let Some((lhs, rhs)) = condition.split_once("==") {
        return unquote(lhs) == unquote(rhs);
    }

    is_truthy(unquote(condition))
}

fn unquote(operand: &str) -> &str {
    let operand = operand.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = operand
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner;
        }
    }
    operand
}

fn is_truthy(value: &str) -> bool {
    !(value.is_empty()
        || ["false", "0", "no", "off"]
            .iter()
            .any(|falsy| value.eq_ignore_ascii_case(falsy)))
}
