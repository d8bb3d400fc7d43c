//! Modification Check (spec §4.6): the top-level driver over a
//! modification list, choosing ADD/DELETE/REPLACE/SOFT-ADD semantics
//! per value and enforcing REPLACE as WRITE_DEL-then-WRITE_ADD.

use crate::privilege::Privilege;
use crate::store::{AttrDesc, SchemaResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOp {
    Add,
    Delete,
    Replace,
    /// Internal rename-path add, unconditionally granted (spec §4.6).
    SoftAdd,
}

#[derive(Debug, Clone)]
pub struct Modification {
    pub op: ModOp,
    pub attr: AttrDesc,
    /// `None`/empty means a value-less, attribute-wide operation.
    pub values: Option<Vec<String>>,
    /// Internal modifications are unconditionally granted (spec §4.6).
    pub is_internal: bool,
}

/// Walk `mods` in order, calling `check(attr, value, privilege)` for
/// each probe the policy needs to authorize. `check` is expected to
/// reuse one [`crate::cache::StateCache`] across the whole list (spec
/// §4.6: "A fresh state cache is used for the whole list").
///
/// Short-circuits on the first denied probe.
pub fn check_modification_list<F>(mods: &[Modification], schema: &dyn SchemaResolver, mut check: F) -> bool
where
    F: FnMut(&AttrDesc, Option<&str>, Privilege) -> bool,
{
    for m in mods {
        if m.is_internal || schema.is_no_user_mod(&m.attr) {
            continue;
        }
        if !check_one(m, &mut check) {
            return false;
        }
    }
    true
}

fn check_one<F>(m: &Modification, check: &mut F) -> bool
where
    F: FnMut(&AttrDesc, Option<&str>, Privilege) -> bool,
{
    match m.op {
        ModOp::SoftAdd => true,
        ModOp::Add => m
            .values
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .all(|v| check(&m.attr, Some(v), Privilege::WriteAdd)),
        ModOp::Delete => match &m.values {
            Some(values) if !values.is_empty() => {
                values.iter().all(|v| check(&m.attr, Some(v), Privilege::WriteDel))
            }
            _ => check(&m.attr, None, Privilege::WriteDel),
        },
        ModOp::Replace => {
            if !check(&m.attr, None, Privilege::WriteDel) {
                return false;
            }
            m.values
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .all(|v| check(&m.attr, Some(v), Privilege::WriteAdd))
        }
    }
}
