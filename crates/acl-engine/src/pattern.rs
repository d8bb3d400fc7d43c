//! Pattern matcher: `$N` backreference expansion and DN structural
//! comparison styles (spec §4.1).

use crate::dn;
use crate::error::EvalError;
use regex::Regex;

/// Caller-supplied scratch bound for expanded patterns (spec §4.1: "the
/// exact number is part of the format contract because it caps
/// expanded pattern length").
pub const ACL_BUF_SIZE: usize = 1024;

/// Byte ranges of a previous match's capture groups, index 0 is the
/// whole match. Produced by [`regex_match`] or synthesized by who-clause
/// evaluation (spec §4.3's "auxiliary capture array").
pub type Captures = Vec<Option<(usize, usize)>>;

/// Build a `Captures` vector from a `regex::Captures`.
pub fn captures_from_regex(caps: &regex::Captures<'_>) -> Captures {
    (0..caps.len())
        .map(|i| caps.get(i).map(|m| (m.start(), m.end())))
        .collect()
}

/// The style tag a rule, who-clause DN, or value predicate is
/// evaluated under (spec §3 "Style").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Regex,
    Base,
    One,
    Subtree,
    Children,
    Level(u32),
    Anonymous,
    Users,
    /// `level >= 0`: walk the operand DN up that many RDNs and compare
    /// to the target; `level < 0`: walk the target up `|level|` RDNs
    /// and compare to the operand. `0` is exact self.
    SelfLevel(i32),
    Ip,
    Path,
    Expand,
}

/// Apply a *structural* DN style (`Base`/`One`/`Subtree`/`Children`/
/// `Level`) to a pair of already-normalized DNs. Other styles are
/// evaluated by their own dedicated call sites (regex, network,
/// self-referential) since they need data this signature doesn't carry.
pub fn structural_match(target_ndn: &str, pattern_ndn: &str, style: Style) -> bool {
    match style {
        Style::Base => dn::dn_match(target_ndn, pattern_ndn),
        Style::Subtree => dn::dn_is_suffix(target_ndn, pattern_ndn),
        Style::One => dn::dn_rdn_depth(target_ndn, pattern_ndn) == Some(1),
        Style::Children => {
            matches!(dn::dn_rdn_depth(target_ndn, pattern_ndn), Some(d) if d >= 1)
        }
        Style::Level(n) => dn::dn_rdn_depth(target_ndn, pattern_ndn) == Some(n as usize),
        _ => false,
    }
}

/// Substitute `$N` / `${N}` in `pattern` with `source[matches[N]]`.
///
/// A lone trailing `$` (nothing follows it) is preserved verbatim. `$`
/// followed by anything other than a digit or `{` is also preserved
/// verbatim, left un-consumed. Unknown or out-of-range `N` fails
/// closed with [`EvalError::ExpansionBadGroup`]; an output exceeding
/// [`ACL_BUF_SIZE`] fails with [`EvalError::ExpansionOverflow`].
pub fn expand(pattern: &str, source: &str, matches: &Captures) -> Result<String, EvalError> {
    let mut out = String::new();
    let bytes: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c != '$' {
            out.push(c);
            i += 1;
        } else if i + 1 == bytes.len() {
            // lone trailing '$'
            out.push('$');
            i += 1;
        } else if bytes[i + 1] == '{' {
            let mut j = i + 2;
            let mut num = String::new();
            while j < bytes.len() && bytes[j] != '}' {
                num.push(bytes[j]);
                j += 1;
            }
            if j >= bytes.len() {
                return Err(EvalError::ExpansionBadGroup {
                    pattern: pattern.to_string(),
                    group: 0,
                });
            }
            let group: usize = num.parse().map_err(|_| EvalError::ExpansionBadGroup {
                pattern: pattern.to_string(),
                group: 0,
            })?;
            append_group(&mut out, source, matches, group, pattern)?;
            i = j + 1;
        } else if bytes[i + 1].is_ascii_digit() {
            let mut j = i + 1;
            let mut num = String::new();
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                num.push(bytes[j]);
                j += 1;
            }
            let group: usize = num.parse().expect("digits only");
            append_group(&mut out, source, matches, group, pattern)?;
            i = j;
        } else {
            out.push('$');
            i += 1;
        }

        if out.len() > ACL_BUF_SIZE {
            return Err(EvalError::ExpansionOverflow {
                pattern: pattern.to_string(),
                buf_size: ACL_BUF_SIZE,
            });
        }
    }
    Ok(out)
}

fn append_group(
    out: &mut String,
    source: &str,
    matches: &Captures,
    group: usize,
    pattern: &str,
) -> Result<(), EvalError> {
    let range = matches
        .get(group)
        .and_then(|m| *m)
        .ok_or_else(|| EvalError::ExpansionBadGroup {
            pattern: pattern.to_string(),
            group,
        })?;
    let slice = source.get(range.0..range.1).ok_or_else(|| EvalError::ExpansionBadGroup {
        pattern: pattern.to_string(),
        group,
    })?;
    out.push_str(slice);
    Ok(())
}

/// Expand `pattern` against `matches`, compile it as an extended,
/// case-insensitive regex, and test it against `subject`.
///
/// Compilation failure is "no match" (spec §4.1: "fail-closed"), not a
/// propagated error — callers that need to know *why* should call
/// [`expand`] and regex compilation separately.
pub fn regex_match(pattern: &str, subject: &str, source: &str, matches: &Captures) -> bool {
    let expanded = match expand(pattern, source, matches) {
        Ok(e) => e,
        Err(err) => return crate::error::fail_closed("regex_match:expand", err),
    };
    let anchored = format!("(?i){expanded}");
    match Regex::new(&anchored) {
        Ok(re) => re.is_match(subject),
        Err(e) => crate::error::fail_closed(
            "regex_match:compile",
            EvalError::RegexCompileFailed {
                pattern: expanded,
                detail: e.to_string(),
            },
        ),
    }
}

/// Compile `pattern` (already expanded) and return captures over
/// `subject`, or `None` on no-match/compile-failure (fail-closed).
pub fn regex_captures(pattern: &str, subject: &str) -> Option<Captures> {
    let anchored = format!("(?i){pattern}");
    match Regex::new(&anchored) {
        Ok(re) => re.captures(subject).map(|c| captures_from_regex(&c)),
        Err(e) => {
            crate::error::fail_closed(
                "regex_captures:compile",
                EvalError::RegexCompileFailed {
                    pattern: pattern.to_string(),
                    detail: e.to_string(),
                },
            );
            None
        }
    }
}
