//! Top-level entry points (spec §2 "Control flow", §6, §7).
//!
//! `Evaluator` owns the combined, immutable rule chain — per-database
//! rules followed by the global list, appended once at construction
//! (spec §10.5's "per-database-then-global list fallthrough") — so it
//! can be shared read-only across request threads (spec §5).

use crate::cache::{ResumePoint, StateCache};
use crate::context::RequestContext;
use crate::pattern::Captures;
use crate::privilege::{AccessMask, ControlVerdict, Privilege, RequestedAccess};
use crate::rule::{self, AccessControl, PolicyList, SelectionProbe};
use crate::store::{AttrDesc, DynamicAclRegistry, EntryStore, SchemaResolver, SetMatcher};
use crate::who::{self, ClauseInput, ClauseOutcome};
use std::sync::Arc;

/// External collaborators an evaluation call needs (spec §6). Bundled
/// together since every call site needs all four.
pub struct Collaborators<'a> {
    pub schema: &'a dyn SchemaResolver,
    pub store: &'a dyn EntryStore,
    pub sets: &'a dyn SetMatcher,
    pub registry: &'a DynamicAclRegistry,
}

/// What's being asked about: an entry, an attribute, and optionally a
/// specific value of it (spec §2 "a request enters at
/// `access_allowed(op, entry, attr, value?, requested_priv)`").
pub struct Probe<'a> {
    pub entry_ndn: &'a str,
    pub attr: &'a AttrDesc,
    pub value: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    rules: Arc<[AccessControl]>,
    backend_default: Privilege,
}

impl Evaluator {
    /// Build the combined rule chain from a per-database list and a
    /// global list (spec §3 "Two lists are consulted").
    pub fn new(per_database: PolicyList, global: PolicyList) -> Self {
        let mut rules = per_database.rules;
        rules.extend(global.rules);
        Self {
            rules: rules.into(),
            backend_default: Privilege::None,
        }
    }

    /// Set the privilege level granted when the combined rule chain is
    /// empty (spec §2 "a backend default privilege level is used").
    pub fn with_backend_default(mut self, level: Privilege) -> Self {
        self.backend_default = level;
        self
    }

    pub fn access_allowed(
        &self,
        collaborators: &Collaborators<'_>,
        ctx: &RequestContext,
        probe: &Probe<'_>,
        requested: RequestedAccess,
        cache: &mut StateCache,
    ) -> bool {
        self.access_allowed_mask(collaborators, ctx, probe, requested, cache).0
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(entry = probe.entry_ndn, attr = %probe.attr, root = ctx.is_root)
    )]
    pub fn access_allowed_mask(
        &self,
        collaborators: &Collaborators<'_>,
        ctx: &RequestContext,
        probe: &Probe<'_>,
        requested: RequestedAccess,
        cache: &mut StateCache,
    ) -> (bool, AccessMask) {
        if ctx.is_root {
            tracing::debug!("root identity short-circuit");
            let mask = Privilege::Manage.cumulative_bits();
            return (true, mask);
        }

        if no_user_mod_shortcut(collaborators.schema, probe.attr, &requested) {
            tracing::debug!("no-user-modification short-circuit");
            let mask = Privilege::Manage.cumulative_bits();
            return (true, mask);
        }

        if probe.value.is_none() {
            if let Some(answer) = cache.lookup_simple(probe.attr) {
                tracing::debug!("state cache short-circuit for non-value-dependent probe");
                return (answer, AccessMask::empty());
            }
        }

        if self.rules.is_empty() {
            let mask = self.backend_default.cumulative_bits();
            let granted = mask.grants(&requested);
            if probe.value.is_none() {
                cache.record_simple(probe.attr.clone(), granted);
            }
            return (granted, mask);
        }

        // Value-independent rule-index resumption only: earlier rules
        // were ruled out by entry/attribute matching, which cannot
        // depend on the probed value, so skipping them is always safe.
        // The clause walk itself always restarts at clause 0 for
        // whichever rule is selected, since who-clause outcomes (e.g.
        // the DN-attribute self check) can depend on the value.
        let resume: Option<ResumePoint> = probe.value.and_then(|_| cache.resume_point(probe.attr));
        let mut rule_counter = resume.as_ref().map(|rp| rp.rule_counter).unwrap_or(0);
        let mut start = resume.as_ref().map(|rp| rp.rule_index).unwrap_or(0);
        let mut running = AccessMask::empty();

        loop {
            let sel_probe = SelectionProbe {
                entry_ndn: probe.entry_ndn,
                attr: probe.attr,
                value: probe.value,
            };
            let Some((rule_idx, entry_caps)) =
                rule::select_rule(&self.rules, start, &sel_probe, collaborators.schema, &mut rule_counter)
            else {
                if probe.value.is_none() {
                    cache.record_simple(probe.attr.clone(), false);
                } else {
                    cache.clear();
                }
                tracing::debug!("policy list exhausted with no matching rule");
                return (false, AccessMask::empty());
            };

            if probe.value.is_some() {
                cache.record_resume(
                    probe.attr.clone(),
                    ResumePoint {
                        rule_index: rule_idx,
                        rule_counter,
                        clause_index: 0,
                        matches: entry_caps.clone(),
                    },
                );
            }

            match self.walk_clauses(collaborators, ctx, probe, &requested, &self.rules[rule_idx].who, &entry_caps, running) {
                ClauseWalkResult::Stop(mask) => {
                    let granted = mask.grants(&requested);
                    if probe.value.is_none() {
                        cache.record_simple(probe.attr.clone(), granted);
                    } else {
                        cache.clear();
                    }
                    return (granted, mask);
                }
                ClauseWalkResult::Break(mask) => {
                    running = mask;
                    start = rule_idx + 1;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_clauses(
        &self,
        collaborators: &Collaborators<'_>,
        ctx: &RequestContext,
        probe: &Probe<'_>,
        requested: &RequestedAccess,
        who: &[crate::who::Access],
        entry_caps: &Captures,
        mut running: AccessMask,
    ) -> ClauseWalkResult {
        for access in who {
            let input = ClauseInput {
                ctx,
                target_entry_ndn: probe.entry_ndn,
                attr: probe.attr,
                value: probe.value,
                requested,
                entry_captures: entry_caps,
            };
            let outcome = who::evaluate_clause(
                access,
                &input,
                collaborators.schema,
                collaborators.store,
                collaborators.sets,
                collaborators.registry,
            );
            let ClauseOutcome::Apply { effect, verdict } = outcome else {
                continue;
            };
            let (new_running, verdict) = crate::mask::compose(running, effect, verdict);
            running = new_running;
            match verdict {
                ControlVerdict::Continue => continue,
                ControlVerdict::Break => return ClauseWalkResult::Break(running),
                ControlVerdict::Stop => return ClauseWalkResult::Stop(running),
            }
        }

        let (mask, _) = crate::mask::exhausted();
        ClauseWalkResult::Stop(mask)
    }
}

enum ClauseWalkResult {
    Stop(AccessMask),
    Break(AccessMask),
}

fn no_user_mod_shortcut(schema: &dyn SchemaResolver, attr: &AttrDesc, requested: &RequestedAccess) -> bool {
    schema.is_no_user_mod(attr)
        && requested.effective_privilege() < Privilege::WriteAdd
        && !attr.name.eq_ignore_ascii_case("entry")
        && !attr.name.eq_ignore_ascii_case("children")
}
