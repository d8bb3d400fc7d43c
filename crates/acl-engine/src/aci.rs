//! ACI Engine (spec §4.5): per-entry dynamic access-control
//! information, parsed from the five-field `#`-separated syntax and
//! matched against a request, with an ancestor walk for subtree-scoped
//! grants.
//!
//! Subject-body parsing takes "the remainder of the string" after the
//! fourth `#` (spec §9's Open Question), so a DN subject body may
//! itself embed `#` characters without being truncated.

use crate::context::RequestContext;
use crate::dn;
use crate::error::EvalError;
use crate::privilege::AccessMask;
use crate::store::{AttrDesc, AttrLookup, EntryStore, SchemaResolver, SetMatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AciScope {
    Entry,
    Children,
    Subtree,
}

impl AciScope {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(Self::Entry),
            "children" => Some(Self::Children),
            "subtree" => Some(Self::Subtree),
            _ => None,
        }
    }

    /// Does this ACI's scope apply when evaluated at the level
    /// `is_entry_scope` describes (true = the target entry itself,
    /// false = an ancestor reached by the CHILDREN walk)?
    fn subsumes(self, is_entry_scope: bool) -> bool {
        match self {
            AciScope::Subtree => true,
            AciScope::Entry => is_entry_scope,
            AciScope::Children => !is_entry_scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermAction {
    Grant,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AciAttrTarget {
    Named(String),
    All,
    Entry,
}

#[derive(Debug, Clone)]
struct AciPermission {
    action: PermAction,
    rights: AccessMask,
    attr: AciAttrTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectType {
    Public,
    Users,
    AccessId,
    Subtree,
    OneLevel,
    Children,
    SelfSubject,
    DnAttr,
    Group,
    Role,
    Set,
    SetRef,
}

impl SubjectType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "users" => Some(Self::Users),
            "access-id" => Some(Self::AccessId),
            "subtree" => Some(Self::Subtree),
            "onelevel" => Some(Self::OneLevel),
            "children" => Some(Self::Children),
            "self" => Some(Self::SelfSubject),
            "dnattr" => Some(Self::DnAttr),
            "group" => Some(Self::Group),
            "role" => Some(Self::Role),
            "set" => Some(Self::Set),
            "set-ref" => Some(Self::SetRef),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct AciValue {
    #[allow(dead_code)]
    oid: String,
    scope: AciScope,
    permissions: Vec<AciPermission>,
    subject_type: SubjectType,
    subject_body: String,
}

/// Map ACI right letters to the cumulative bits their equivalent
/// [`crate::privilege::Privilege`] level implies. Granting `r` must
/// imply `s`/`c`/`x` too, since mask containment checks elsewhere are
/// always done against a privilege's cumulative bits, never a single
/// bit in isolation.
fn rights_mask(rights: &str) -> AccessMask {
    use crate::privilege::Privilege;
    let chars: Box<dyn Iterator<Item = char>> = if rights.contains(',') {
        Box::new(rights.split(',').filter_map(|s| s.chars().next()))
    } else {
        Box::new(rights.chars())
    };
    chars.fold(AccessMask::empty(), |acc, c| {
        acc.union(match c {
            'c' => Privilege::Compare.cumulative_bits(),
            's' => Privilege::Search.cumulative_bits(),
            'r' => Privilege::Read.cumulative_bits(),
            'w' => Privilege::Write.cumulative_bits(),
            'x' => Privilege::Auth.cumulative_bits(),
            _ => AccessMask::empty(),
        })
    })
}

fn parse_permissions(field: &str) -> Vec<AciPermission> {
    let mut out = Vec::new();
    for element in field.split('$') {
        let parts: Vec<&str> = element.split(';').collect();
        if parts.len() < 3 || parts.len() % 2 != 1 {
            continue;
        }
        let action = match parts[0] {
            "grant" => PermAction::Grant,
            "deny" => PermAction::Deny,
            _ => continue,
        };
        let mut i = 1;
        while i + 1 < parts.len() {
            let rights = rights_mask(parts[i]);
            let attr = match parts[i + 1] {
                "[all]" => AciAttrTarget::All,
                "[entry]" => AciAttrTarget::Entry,
                name => AciAttrTarget::Named(name.to_ascii_lowercase()),
            };
            out.push(AciPermission {
                action,
                rights,
                attr,
            });
            i += 2;
        }
    }
    out
}

/// Parse a raw ACI attribute value into its five fields.
fn parse_aci(raw: &str) -> Result<AciValue, EvalError> {
    let fields: Vec<&str> = raw.splitn(5, '#').collect();
    let [oid, scope, permissions, subject_type, subject_body] = fields.as_slice() else {
        return Err(EvalError::AciMalformed {
            detail: format!("expected 5 '#'-separated fields, got {}", fields.len()),
        });
    };
    let scope = AciScope::parse(scope).ok_or_else(|| EvalError::AciMalformed {
        detail: format!("unknown scope {scope:?}"),
    })?;
    let subject_type = SubjectType::parse(subject_type).ok_or_else(|| EvalError::AciMalformed {
        detail: format!("unknown subject-type {subject_type:?}"),
    })?;
    Ok(AciValue {
        oid: (*oid).to_string(),
        scope,
        permissions: parse_permissions(permissions),
        subject_type,
        subject_body: (*subject_body).to_string(),
    })
}

fn masks_for_attr(permissions: &[AciPermission], requested_attr: &str) -> (AccessMask, AccessMask) {
    let mut grant = AccessMask::empty();
    let mut deny = AccessMask::empty();
    for perm in permissions {
        let applies = match &perm.attr {
            AciAttrTarget::All => true,
            AciAttrTarget::Entry => requested_attr.eq_ignore_ascii_case("entry"),
            AciAttrTarget::Named(name) => name.eq_ignore_ascii_case(requested_attr),
        };
        if !applies {
            continue;
        }
        match perm.action {
            PermAction::Grant => grant = grant.union(perm.rights),
            PermAction::Deny => deny = deny.union(perm.rights),
        }
    }
    (grant, deny)
}

/// `group`/`role` subject bodies may override the default object class
/// and member attribute with `dn/objectClass/attrName`.
fn split_group_subject(body: &str, default_oc: &str, default_attr: &str) -> (String, String, String) {
    let mut parts = body.splitn(3, '/');
    let dn = parts.next().unwrap_or_default().to_string();
    let oc = parts.next().unwrap_or(default_oc).to_string();
    let attr = parts.next().unwrap_or(default_attr).to_string();
    (dn, oc, attr)
}

#[allow(clippy::too_many_arguments)]
fn subject_matches(
    value: &AciValue,
    requester_ndn: &str,
    target_entry_ndn: &str,
    ctx: &RequestContext,
    store: &dyn EntryStore,
) -> bool {
    match value.subject_type {
        SubjectType::Public => true,
        SubjectType::Users => !ctx.op_ndn.is_empty(),
        SubjectType::AccessId => {
            dn::normalize(&value.subject_body).is_ok_and(|n| dn::dn_match(requester_ndn, &n))
        }
        SubjectType::Subtree => dn::dn_is_suffix(requester_ndn, &value.subject_body),
        SubjectType::OneLevel => {
            dn::dn_rdn_depth(requester_ndn, &value.subject_body) == Some(1)
        }
        SubjectType::Children => {
            matches!(dn::dn_rdn_depth(requester_ndn, &value.subject_body), Some(d) if d >= 1)
        }
        SubjectType::SelfSubject => dn::dn_match(requester_ndn, target_entry_ndn),
        SubjectType::DnAttr => match store.get_attribute(target_entry_ndn, &AttrDesc::new(&value.subject_body, 0)) {
            AttrLookup::Values(values) => values.iter().any(|v| dn::dn_match(v, requester_ndn)),
            _ => false,
        },
        SubjectType::Group => {
            let (dn, oc, attr) = split_group_subject(&value.subject_body, "groupOfNames", "member");
            store
                .group_member(&dn, requester_ndn, &oc, &attr)
                .unwrap_or_else(|err| crate::error::fail_closed("aci:group", err))
        }
        SubjectType::Role => {
            let (dn, oc, attr) =
                split_group_subject(&value.subject_body, "organizationalRole", "roleOccupant");
            store
                .group_member(&dn, requester_ndn, &oc, &attr)
                .unwrap_or_else(|err| crate::error::fail_closed("aci:role", err))
        }
        SubjectType::Set | SubjectType::SetRef => false,
    }
}

fn subject_matches_with_sets(
    value: &AciValue,
    requester_ndn: &str,
    target_entry_ndn: &str,
    ctx: &RequestContext,
    store: &dyn EntryStore,
    sets: &dyn SetMatcher,
) -> bool {
    match value.subject_type {
        SubjectType::Set | SubjectType::SetRef => sets
            .eval_set(&value.subject_body, requester_ndn, target_entry_ndn)
            .unwrap_or_else(|err| crate::error::fail_closed("aci:set", err)),
        _ => subject_matches(value, requester_ndn, target_entry_ndn, ctx, store),
    }
}

#[allow(clippy::too_many_arguments)]
fn accumulate(
    values: &[String],
    requested_attr: &str,
    requester_ndn: &str,
    target_entry_ndn: &str,
    is_entry_scope: bool,
    ctx: &RequestContext,
    store: &dyn EntryStore,
    sets: &dyn SetMatcher,
) -> (AccessMask, AccessMask) {
    let mut grant = AccessMask::empty();
    let mut deny = AccessMask::empty();
    for raw in values {
        let parsed = match parse_aci(raw) {
            Ok(v) => v,
            Err(err) => {
                crate::error::fail_closed("aci:parse", err);
                continue;
            }
        };
        if !parsed.scope.subsumes(is_entry_scope) {
            continue;
        }
        if !subject_matches_with_sets(&parsed, requester_ndn, target_entry_ndn, ctx, store, sets) {
            continue;
        }
        let (g, d) = masks_for_attr(&parsed.permissions, requested_attr);
        grant = grant.union(g);
        deny = deny.union(d);
    }
    (grant, deny)
}

/// Compute the (grant, deny) pair for a single dynamic-ACI who-clause
/// dimension: evaluate the target entry's own ACI values, and if that
/// yields nothing, walk ancestors (spec §4.5 "Ancestor walk").
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    aci_attr: &AttrDesc,
    target_entry_ndn: &str,
    requested_attr: &AttrDesc,
    requester_ndn: &str,
    ctx: &RequestContext,
    store: &dyn EntryStore,
    sets: &dyn SetMatcher,
) -> (AccessMask, AccessMask) {
    if let AttrLookup::Values(values) = store.get_attribute(target_entry_ndn, aci_attr) {
        let (g, d) = accumulate(
            &values,
            &requested_attr.name,
            requester_ndn,
            target_entry_ndn,
            true,
            ctx,
            store,
            sets,
        );
        if !g.is_empty() || !d.is_empty() {
            return (g, d);
        }
    }

    for ancestor in dn::ancestors(target_entry_ndn) {
        match store.get_attribute(&ancestor, aci_attr) {
            AttrLookup::NotFound => break,
            AttrLookup::NoSuchAttr => continue,
            AttrLookup::Values(values) => {
                let (g, d) = accumulate(
                    &values,
                    &requested_attr.name,
                    requester_ndn,
                    target_entry_ndn,
                    false,
                    ctx,
                    store,
                    sets,
                );
                if !g.is_empty() || !d.is_empty() {
                    return (g, d);
                }
            }
        }
    }
    (AccessMask::empty(), AccessMask::empty())
}

/// Combine an ACI (grant, deny) pair with a clause's own declared
/// privilege mask, producing the [`crate::privilege::MaskEffect`] the
/// clause actually applies (spec §4.5 "Combination with the clause's
/// own mask"). `None` means the clause fails (empty grant and deny).
pub fn combine_with_clause_mask(
    grant: AccessMask,
    deny: AccessMask,
    clause_mask: AccessMask,
) -> Option<crate::privilege::MaskEffect> {
    use crate::privilege::MaskEffect;
    let grant = grant.intersect(clause_mask);
    let deny = deny.intersect(clause_mask);

    if grant.is_empty() && deny.is_empty() {
        None
    } else if deny.is_empty() {
        Some(MaskEffect::Additive(grant))
    } else if grant.is_empty() {
        Some(MaskEffect::Subtractive(deny))
    } else {
        Some(MaskEffect::Additive(grant.minus(deny)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStore {
        values: std::collections::HashMap<String, Vec<String>>,
    }
    impl EntryStore for FakeStore {
        fn get_attribute(&self, entry_ndn: &str, _attr: &AttrDesc) -> AttrLookup {
            match self.values.get(entry_ndn) {
                Some(v) => AttrLookup::Values(v.clone()),
                None => AttrLookup::NotFound,
            }
        }
        fn group_member(
            &self,
            _group_ndn: &str,
            _member_ndn: &str,
            _object_class: &str,
            _member_attr: &str,
        ) -> Result<bool, EvalError> {
            Ok(false)
        }
    }
    struct FakeSets;
    impl SetMatcher for FakeSets {
        fn eval_set(&self, _set_expr: &str, _user_ndn: &str, _entry_ndn: &str) -> Result<bool, EvalError> {
            Ok(false)
        }
    }

    #[test]
    fn parses_five_fields_and_keeps_embedded_hash_in_subject_body() {
        let raw = "1.1#subtree#grant;r,s;[all]#access-id#uid=a#b,dc=x";
        let v = parse_aci(raw).unwrap();
        assert_eq!(v.subject_body, "uid=a#b,dc=x");
        assert_eq!(v.scope, AciScope::Subtree);
    }

    #[test]
    fn entry_scope_grants_search_for_access_id_subject() {
        let mut values = std::collections::HashMap::new();
        values.insert(
            "dc=y,dc=x".to_string(),
            vec!["1.1#subtree#grant;r,s;[all]#access-id#uid=a,dc=x".to_string()],
        );
        let store = FakeStore { values };
        let sets = FakeSets;
        let ctx = RequestContext::anonymous();
        let requested = AttrDesc::new("cn", 1);
        let aci_attr = AttrDesc::new("aci", 2);
        let (grant, deny) = evaluate(
            &aci_attr,
            "dc=y,dc=x",
            &requested,
            "uid=a,dc=x",
            &ctx,
            &store,
            &sets,
        );
        assert!(grant.contains(AccessMask::SEARCH));
        assert!(deny.is_empty());
    }

    #[test]
    fn ancestor_walk_finds_children_scoped_grant() {
        let mut values = std::collections::HashMap::new();
        values.insert(
            "dc=x".to_string(),
            vec!["1.1#children#grant;r,s;[all]#access-id#uid=a,dc=x".to_string()],
        );
        let store = FakeStore { values };
        let sets = FakeSets;
        let ctx = RequestContext::anonymous();
        let requested = AttrDesc::new("cn", 1);
        let aci_attr = AttrDesc::new("aci", 2);
        let (grant, _) = evaluate(
            &aci_attr,
            "dc=y,dc=x",
            &requested,
            "uid=a,dc=x",
            &ctx,
            &store,
            &sets,
        );
        assert!(grant.contains(AccessMask::SEARCH));
    }

    #[test]
    fn combine_produces_subtractive_effect_when_only_deny() {
        let effect = combine_with_clause_mask(
            AccessMask::empty(),
            AccessMask::READ,
            AccessMask::READ,
        )
        .unwrap();
        assert!(matches!(effect, crate::privilege::MaskEffect::Subtractive(_)));
    }

    #[test]
    fn combine_fails_clause_when_both_empty() {
        assert!(combine_with_clause_mask(AccessMask::empty(), AccessMask::empty(), AccessMask::READ).is_none());
    }
}
