//! DN normalization and structural comparison utilities.
//!
//! Spec §6 lists these as a thin "DN utilities" external interface
//! (`normalize`, `dnMatch`, `dnIsSuffix`, `dnParent`, `dnRdnLen`); since
//! they have no configuration-dependent behavior (unlike schema-aware
//! value matching, which genuinely is external — see [`crate::store`]),
//! this crate implements them directly as free functions rather than a
//! trait, keeping the evaluator's only real external dependencies at
//! the entry-store / schema-resolver boundary.
//!
//! Normalization here is syntax-generic: it lowercases attribute type
//! names and RDN values and collapses insignificant whitespace around
//! `=` and `,`, matching the common case for directory-string syntaxes.
//! A deployment with case-sensitive DN components would normalize
//! through its own schema before calling into this crate — normalize's
//! job is byte-exact comparison after that point, not schema lookup.

use crate::error::EvalError;

/// Normalize a raw DN into the byte-comparable form the rest of this
/// crate expects. Splits on unescaped `,`, trims surrounding
/// whitespace from each RDN, and lowercases the whole thing.
pub fn normalize(raw: &str) -> Result<String, EvalError> {
    let rdns = split_rdns(raw);
    if raw.trim().is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(rdns.len());
    for rdn in rdns {
        let rdn = rdn.trim();
        if rdn.is_empty() {
            return Err(EvalError::NormalizeFailed {
                raw: raw.to_string(),
                detail: "empty RDN component".to_string(),
            });
        }
        let mut attrs = Vec::new();
        for piece in split_unescaped(rdn, '+') {
            let piece = piece.trim();
            let Some((ty, val)) = piece.split_once('=') else {
                return Err(EvalError::NormalizeFailed {
                    raw: raw.to_string(),
                    detail: format!("RDN component {piece:?} has no '='"),
                });
            };
            attrs.push(format!(
                "{}={}",
                ty.trim().to_ascii_lowercase(),
                val.trim().to_ascii_lowercase()
            ));
        }
        parts.push(attrs.join("+"));
    }
    Ok(parts.join(","))
}

/// Split `s` on unescaped occurrences of `sep`, leaving `\<sep>`
/// escapes intact in the returned pieces.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        if c == sep {
            out.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    out.push(current);
    out
}

fn split_rdns(dn: &str) -> Vec<String> {
    split_unescaped(dn, ',')
}

/// Byte-exact equality of two already-normalized DNs.
pub fn dn_match(a: &str, b: &str) -> bool {
    a == b
}

/// Does `ndn` lie at or below `suffix` in the tree (equal-or-descended)?
///
/// Requires either exact equality or that `suffix` begins immediately
/// after a DN component separator in `ndn` — spec §4.1's "structural
/// constraint on the byte immediately preceding the tail."
pub fn dn_is_suffix(ndn: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return true;
    }
    if ndn == suffix {
        return true;
    }
    if ndn.len() <= suffix.len() || !ndn.ends_with(suffix) {
        return false;
    }
    let boundary = ndn.len() - suffix.len();
    ndn.as_bytes()[boundary - 1] == b','
}

/// Number of RDNs between `ndn` and `suffix`, or `None` if `ndn` is not
/// at/below `suffix`. `0` means exact equality.
pub fn dn_rdn_depth(ndn: &str, suffix: &str) -> Option<usize> {
    if !dn_is_suffix(ndn, suffix) {
        return None;
    }
    if ndn == suffix {
        return Some(0);
    }
    let prefix_len = ndn.len() - suffix.len() - 1; // drop the separating comma
    let prefix = &ndn[..prefix_len];
    Some(split_rdns(prefix).len())
}

/// Total RDN count of a normalized DN (0 for the empty/root DN).
pub fn dn_rdn_len(ndn: &str) -> usize {
    if ndn.is_empty() {
        0
    } else {
        split_rdns(ndn).len()
    }
}

/// The immediate parent of a normalized DN, or `None` at the root.
pub fn dn_parent(ndn: &str) -> Option<String> {
    if ndn.is_empty() {
        return None;
    }
    let rdns = split_unescaped(ndn, ',');
    if rdns.len() <= 1 {
        return Some(String::new());
    }
    Some(rdns[1..].join(","))
}

/// Walk `ndn` and every ancestor up to (and including) the empty root,
/// nearest first.
pub fn ancestors(ndn: &str) -> impl Iterator<Item = String> + '_ {
    let mut current = Some(ndn.to_string());
    std::iter::from_fn(move || {
        let this = current.take()?;
        current = dn_parent(&this);
        Some(this)
    })
    .skip(1) // caller already has ndn itself; this yields parents only
}
