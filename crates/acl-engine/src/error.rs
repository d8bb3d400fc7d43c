//! Evaluator-internal error kinds.
//!
//! Every variant here is handled by coercing to a mismatch/skip at the
//! nearest clause or rule boundary (spec §7, §9 "Exception-like
//! failures") — nothing here ever unwinds out of [`crate::Evaluator`].
//! The public entry points return a plain `bool` / `AccessMask`, never
//! a `Result`.

use thiserror::Error;

/// Internal failure of a single evaluator step.
///
/// Callers inside this crate treat every variant as "this dimension,
/// clause, or rule does not match" — see [`crate::error::fail_closed`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A `$N` / `${N}` backreference expansion ran out of scratch space.
    #[error("pattern expansion for {pattern:?} would exceed the {buf_size}-byte scratch buffer")]
    ExpansionOverflow {
        pattern: String,
        buf_size: usize,
    },

    /// A `$N` backreference named a capture group that does not exist.
    #[error("pattern {pattern:?} references capture group ${group}, which the match did not populate")]
    ExpansionBadGroup { pattern: String, group: usize },

    /// A regex pattern (entry DN, value, or who-clause DN) failed to compile.
    #[error("regex {pattern:?} failed to compile: {detail}")]
    RegexCompileFailed { pattern: String, detail: String },

    /// A DN could not be normalized (empty component, bad escape, ...).
    #[error("could not normalize DN {raw:?}: {detail}")]
    NormalizeFailed { raw: String, detail: String },

    /// An external collaborator (entry store, schema matcher) failed or
    /// timed out while answering a synchronous probe.
    #[error("external store call failed: {detail}")]
    StoreUnavailable { detail: String },

    /// A five-field ACI value did not have the minimum structural shape.
    #[error("malformed ACI value: {detail}")]
    AciMalformed { detail: String },
}

/// Log `err` at debug level and coerce it to "no match" / "skip".
///
/// This is the single choke point spec §7 describes: "the affected
/// dimension is treated as non-matching, causing the clause to be
/// skipped." Centralizing it means every fail-closed coercion also
/// gets a consistent log line instead of silently vanishing.
pub(crate) fn fail_closed(context: &str, err: EvalError) -> bool {
    tracing::debug!(context, error = %err, "evaluator dimension failed closed");
    false
}
