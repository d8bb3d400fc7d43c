//! Per-operation state cache (spec §3, §4.2, §9).
//!
//! Keyed by attribute-description identity and whether the probe is
//! value-dependent, not by name or pointer — "when the next call's
//! attribute differs, the cache is cleared" (spec §9). Holding the
//! resumption point by integer (rule index + rule counter + clause
//! index) rather than by reference keeps this type `Clone` and
//! trivially ownable by a single operation (spec §9 "not by pointer").

use crate::pattern::Captures;
use crate::store::AttrDesc;

/// Where a value-dependent rule walk should resume for the next call
/// with the same attribute description.
#[derive(Debug, Clone)]
pub struct ResumePoint {
    pub rule_index: usize,
    pub rule_counter: u64,
    pub clause_index: usize,
    pub matches: Captures,
}

#[derive(Debug, Clone)]
enum CachedAnswer {
    /// A non-value-dependent probe already has its final answer.
    Simple(bool),
    /// A value-dependent probe resumes the rule walk from here.
    Resume(ResumePoint),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    attr: AttrDesc,
    value_dependent: bool,
    answer: CachedAnswer,
}

/// Single-slot memoization for one operation. Only one attribute probe
/// is ever live at a time — spec §3: "records the last-seen attribute
/// description."
#[derive(Debug, Default)]
pub struct StateCache {
    entry: Option<CacheEntry>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached answer for a plain (non-value-dependent) probe, if
    /// the key matches exactly.
    pub fn lookup_simple(&self, attr: &AttrDesc) -> Option<bool> {
        match &self.entry {
            Some(CacheEntry {
                attr: cached_attr,
                value_dependent: false,
                answer: CachedAnswer::Simple(b),
            }) if cached_attr == attr => Some(*b),
            _ => None,
        }
    }

    pub fn record_simple(&mut self, attr: AttrDesc, answer: bool) {
        self.entry = Some(CacheEntry {
            attr,
            value_dependent: false,
            answer: CachedAnswer::Simple(answer),
        });
    }

    /// The resumption point for a value-dependent probe, if the key
    /// matches exactly. A key mismatch (different attribute) silently
    /// clears and returns `None` — spec §3 invariant.
    pub fn resume_point(&mut self, attr: &AttrDesc) -> Option<ResumePoint> {
        match &self.entry {
            Some(CacheEntry {
                attr: cached_attr,
                value_dependent: true,
                answer: CachedAnswer::Resume(rp),
            }) if cached_attr == attr => Some(rp.clone()),
            Some(CacheEntry { attr: cached_attr, .. }) if cached_attr != attr => {
                self.entry = None;
                None
            }
            _ => None,
        }
    }

    pub fn record_resume(&mut self, attr: AttrDesc, point: ResumePoint) {
        self.entry = Some(CacheEntry {
            attr,
            value_dependent: true,
            answer: CachedAnswer::Resume(point),
        });
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
