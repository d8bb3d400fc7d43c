//! Rule Selector (spec §4.2): the ordered policy list and the walk
//! that picks the first rule whose entry predicate matches a probe.

use crate::error::EvalError;
use crate::pattern::{self, Captures, Style};
use crate::store::{AttrDesc, SchemaResolver};
use crate::who::Access;

/// The optional value-scoping half of an entry predicate (spec §3
/// "optional value predicate").
#[derive(Debug, Clone)]
pub struct ValuePredicate {
    pub pattern: String,
    pub style: Style,
}

/// A rule's entry predicate (spec §3 "Rule (AccessControl)").
///
/// `dn_pattern` is expected already normalized at configuration time;
/// callers pass an already-normalized target DN into [`select_rule`].
#[derive(Debug, Clone)]
pub struct EntryPredicate {
    pub dn_pattern: String,
    pub dn_style: Style,
    pub attrs: Option<Vec<AttrDesc>>,
    pub value: Option<ValuePredicate>,
    pub filter: Option<String>,
}

/// An immutable-after-configuration access control rule.
#[derive(Debug, Clone)]
pub struct AccessControl {
    pub entry: EntryPredicate,
    pub who: Vec<Access>,
}

/// The ordered, singly-linked policy list (spec §3). Two of these are
/// consulted per request — a per-database list and a global list
/// (spec §2, §10.5) — modeled here as plain `Vec`s the caller owns.
#[derive(Debug, Clone, Default)]
pub struct PolicyList {
    pub rules: Vec<AccessControl>,
}

impl PolicyList {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// What the Rule Selector is matching against (spec §4.2 "Input").
pub struct SelectionProbe<'a> {
    pub entry_ndn: &'a str,
    pub attr: &'a AttrDesc,
    pub value: Option<&'a str>,
}

/// Walk `rules` starting at `start`, returning the index of the first
/// rule whose entry predicate matches `probe`, plus the entry-DN
/// regex's capture offsets (empty for non-REGEX styles). `rule_counter`
/// is incremented once per rule visited, matching spec §4.2's
/// "increments an externally held rule counter used to stabilize cache
/// keys."
pub fn select_rule(
    rules: &[AccessControl],
    start: usize,
    probe: &SelectionProbe<'_>,
    schema: &dyn SchemaResolver,
    rule_counter: &mut u64,
) -> Option<(usize, Captures)> {
    for idx in start..rules.len() {
        *rule_counter += 1;
        if let Some(matches) = entry_matches(&rules[idx].entry, probe, schema) {
            return Some((idx, matches));
        }
    }
    None
}

fn entry_matches(
    entry: &EntryPredicate,
    probe: &SelectionProbe<'_>,
    schema: &dyn SchemaResolver,
) -> Option<Captures> {
    let dn_matches = match_entry_dn(entry, probe.entry_ndn)?;

    if let Some(list) = &entry.attrs {
        if !schema.is_in_list(probe.attr, list) {
            return None;
        }
    }

    if let Some(vp) = &entry.value {
        let value = probe.value?;
        if !value_matches(vp, probe.attr, value, schema) {
            return None;
        }
    }

    if let Some(filter) = &entry.filter {
        if schema.test_filter(probe.entry_ndn, filter) != crate::store::FilterResult::True {
            return None;
        }
    }

    Some(dn_matches)
}

fn match_entry_dn(entry: &EntryPredicate, target_ndn: &str) -> Option<Captures> {
    match entry.dn_style {
        Style::Regex => pattern::regex_captures(&entry.dn_pattern, target_ndn),
        style => {
            if pattern::structural_match(target_ndn, &entry.dn_pattern, style) {
                Some(Captures::new())
            } else {
                None
            }
        }
    }
}

fn value_matches(
    vp: &ValuePredicate,
    attr: &AttrDesc,
    value: &str,
    schema: &dyn SchemaResolver,
) -> bool {
    match vp.style {
        Style::Regex => {
            let no_caps = Captures::new();
            pattern::regex_match(&vp.pattern, value, value, &no_caps)
        }
        style if schema.is_dn_syntax(attr) => pattern::structural_match(value, &vp.pattern, style),
        _ => schema
            .match_values(attr, &vp.pattern, std::slice::from_ref(&value.to_string()))
            .unwrap_or_else(|err| crate::error::fail_closed("rule:value_predicate", err)),
    }
}
