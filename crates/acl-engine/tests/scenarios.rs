//! The six concrete scenarios from the evaluator's testable-properties
//! document, each exercised end-to-end through [`Evaluator`].

mod support;

use acl_engine::{
    Access, AccessControl, AttrDesc, Collaborators, ControlVerdict, DnClause, DynamicAclRegistry,
    EntryPredicate, Evaluator, MaskEffect, PolicyList, Privilege, Probe, RequestContext,
    RequestedAccess, StateCache, Style,
};
use support::{FixtureSchema, FixtureSets, FixtureStore};

fn collaborators<'a>(
    schema: &'a FixtureSchema,
    store: &'a FixtureStore,
    sets: &'a FixtureSets,
    registry: &'a DynamicAclRegistry,
) -> Collaborators<'a> {
    Collaborators {
        schema,
        store,
        sets,
        registry,
    }
}

/// 1. `to dn.base="dc=x" by * read`; READ on `dc=x` as anonymous -> grant.
#[test]
fn base_rule_grants_read_to_anonymous() {
    let rule = AccessControl {
        entry: EntryPredicate {
            dn_pattern: "dc=x".to_string(),
            dn_style: Style::Base,
            attrs: None,
            value: None,
            filter: None,
        },
        who: vec![Access {
            dimensions: vec![],
            effect: MaskEffect::Absolute(Privilege::Read.cumulative_bits()),
            verdict: ControlVerdict::Stop,
        }],
    };
    let evaluator = Evaluator::new(PolicyList { rules: vec![rule] }, PolicyList::default());
    let schema = FixtureSchema::default();
    let store = FixtureStore::default();
    let sets = FixtureSets;
    let registry = DynamicAclRegistry::new();
    let collab = collaborators(&schema, &store, &sets, &registry);
    let ctx = RequestContext::anonymous();
    let attr = AttrDesc::new("cn", 1);
    let probe = Probe {
        entry_ndn: "dc=x",
        attr: &attr,
        value: None,
    };
    let mut cache = StateCache::new();
    let (granted, mask) = evaluator.access_allowed_mask(&collab, &ctx, &probe, RequestedAccess::new(Privilege::Read), &mut cache);
    assert!(granted);
    assert!(mask.contains(acl_engine::AccessMask::READ));
}

fn user_password_rule() -> AccessControl {
    AccessControl {
        entry: EntryPredicate {
            dn_pattern: String::new(),
            dn_style: Style::Subtree,
            attrs: Some(vec![AttrDesc::new("userpassword", 3)]),
            value: None,
            filter: None,
        },
        who: vec![
            Access {
                dimensions: vec![Access_dn_self()],
                effect: MaskEffect::Absolute(Privilege::Write.cumulative_bits()),
                verdict: ControlVerdict::Stop,
            },
            Access {
                dimensions: vec![],
                effect: MaskEffect::Absolute(Privilege::Auth.cumulative_bits()),
                verdict: ControlVerdict::Stop,
            },
        ],
    }
}

#[allow(non_snake_case)]
fn Access_dn_self() -> acl_engine::WhoDimension {
    acl_engine::WhoDimension::Dn(DnClause {
        pattern: String::new(),
        style: Style::SelfLevel(0),
        expand: false,
    })
}

/// 2. `to attr=userPassword by self =w by * auth`; WRITE on `userPassword`
/// of `uid=a,dc=x` bound as `uid=a,dc=x` -> grant.
#[test]
fn self_bind_grants_write_to_own_password() {
    let evaluator = Evaluator::new(
        PolicyList {
            rules: vec![user_password_rule()],
        },
        PolicyList::default(),
    );
    let schema = FixtureSchema::default();
    let store = FixtureStore::default();
    let sets = FixtureSets;
    let registry = DynamicAclRegistry::new();
    let collab = collaborators(&schema, &store, &sets, &registry);
    let mut ctx = RequestContext::anonymous();
    ctx.op_ndn = "uid=a,dc=x".to_string();
    let attr = AttrDesc::new("userpassword", 3);
    let probe = Probe {
        entry_ndn: "uid=a,dc=x",
        attr: &attr,
        value: None,
    };
    let mut cache = StateCache::new();
    let granted = evaluator.access_allowed(&collab, &ctx, &probe, RequestedAccess::new(Privilege::Write), &mut cache);
    assert!(granted);
}

/// 3. Same policy; READ on `userPassword` as `uid=b,dc=x` -> deny (only
/// AUTH is granted to non-self binders).
#[test]
fn non_self_bind_denied_read_on_password() {
    let evaluator = Evaluator::new(
        PolicyList {
            rules: vec![user_password_rule()],
        },
        PolicyList::default(),
    );
    let schema = FixtureSchema::default();
    let store = FixtureStore::default();
    let sets = FixtureSets;
    let registry = DynamicAclRegistry::new();
    let collab = collaborators(&schema, &store, &sets, &registry);
    let mut ctx = RequestContext::anonymous();
    ctx.op_ndn = "uid=b,dc=x".to_string();
    let attr = AttrDesc::new("userpassword", 3);
    let probe = Probe {
        entry_ndn: "uid=a,dc=x",
        attr: &attr,
        value: None,
    };
    let mut cache = StateCache::new();
    let granted = evaluator.access_allowed(&collab, &ctx, &probe, RequestedAccess::new(Privilege::Read), &mut cache);
    assert!(!granted);
}

/// 4. ACI on the entry itself, scope=subtree, subject=access-id; SEARCH
/// by the named subject at ENTRY scope -> grant.
#[test]
fn entry_scoped_aci_grants_search_to_named_subject() {
    let rule = AccessControl {
        entry: EntryPredicate {
            dn_pattern: String::new(),
            dn_style: Style::Subtree,
            attrs: None,
            value: None,
            filter: None,
        },
        who: vec![Access {
            dimensions: vec![acl_engine::WhoDimension::DynamicAci {
                attr: AttrDesc::new("aci", 9),
            }],
            effect: MaskEffect::Absolute(Privilege::Manage.cumulative_bits()),
            verdict: ControlVerdict::Stop,
        }],
    };
    let evaluator = Evaluator::new(PolicyList { rules: vec![rule] }, PolicyList::default());
    let schema = FixtureSchema::default();
    let mut store = FixtureStore::default();
    store.set_attr(
        "dc=y,dc=x",
        "aci",
        vec!["1.1#subtree#grant;r,s;[all]#access-id#uid=a,dc=x".to_string()],
    );
    let sets = FixtureSets;
    let registry = DynamicAclRegistry::new();
    let collab = collaborators(&schema, &store, &sets, &registry);
    let mut ctx = RequestContext::anonymous();
    ctx.op_ndn = "uid=a,dc=x".to_string();
    let attr = AttrDesc::new("cn", 1);
    let probe = Probe {
        entry_ndn: "dc=y,dc=x",
        attr: &attr,
        value: None,
    };
    let mut cache = StateCache::new();
    let granted = evaluator.access_allowed(&collab, &ctx, &probe, RequestedAccess::new(Privilege::Search), &mut cache);
    assert!(granted);
}

/// 5. Same ACI, but only on an ancestor, scope=children; SEARCH from a
/// descendant -> grant via the ancestor walk.
#[test]
fn ancestor_scoped_aci_grants_via_children_walk() {
    let rule = AccessControl {
        entry: EntryPredicate {
            dn_pattern: String::new(),
            dn_style: Style::Subtree,
            attrs: None,
            value: None,
            filter: None,
        },
        who: vec![Access {
            dimensions: vec![acl_engine::WhoDimension::DynamicAci {
                attr: AttrDesc::new("aci", 9),
            }],
            effect: MaskEffect::Absolute(Privilege::Manage.cumulative_bits()),
            verdict: ControlVerdict::Stop,
        }],
    };
    let evaluator = Evaluator::new(PolicyList { rules: vec![rule] }, PolicyList::default());
    let schema = FixtureSchema::default();
    let mut store = FixtureStore::default();
    store.set_attr(
        "dc=x",
        "aci",
        vec!["1.1#children#grant;r,s;[all]#access-id#uid=a,dc=x".to_string()],
    );
    let sets = FixtureSets;
    let registry = DynamicAclRegistry::new();
    let collab = collaborators(&schema, &store, &sets, &registry);
    let mut ctx = RequestContext::anonymous();
    ctx.op_ndn = "uid=a,dc=x".to_string();
    let attr = AttrDesc::new("cn", 1);
    let probe = Probe {
        entry_ndn: "dc=y,dc=x",
        attr: &attr,
        value: None,
    };
    let mut cache = StateCache::new();
    let granted = evaluator.access_allowed(&collab, &ctx, &probe, RequestedAccess::new(Privilege::Search), &mut cache);
    assert!(granted);
}

/// 6. `REPLACE mail [m@x]` where policy grants WRITE_ADD but not
/// WRITE_DEL on `mail` -> deny (REPLACE needs both).
#[test]
fn replace_denied_without_write_del() {
    let rule = AccessControl {
        entry: EntryPredicate {
            dn_pattern: String::new(),
            dn_style: Style::Subtree,
            attrs: Some(vec![AttrDesc::new("mail", 4)]),
            value: None,
            filter: None,
        },
        who: vec![Access {
            dimensions: vec![],
            effect: MaskEffect::Absolute(Privilege::WriteAdd.cumulative_bits()),
            verdict: ControlVerdict::Stop,
        }],
    };
    let evaluator = Evaluator::new(PolicyList { rules: vec![rule] }, PolicyList::default());
    let schema = FixtureSchema::default();
    let store = FixtureStore::default();
    let sets = FixtureSets;
    let registry = DynamicAclRegistry::new();
    let collab = collaborators(&schema, &store, &sets, &registry);
    let ctx = RequestContext::anonymous();
    let mail = AttrDesc::new("mail", 4);

    let modification = acl_engine::Modification {
        op: acl_engine::ModOp::Replace,
        attr: mail.clone(),
        values: Some(vec!["m@x".to_string()]),
        is_internal: false,
    };
    let mut cache = StateCache::new();
    let granted = acl_engine::check_modification_list(std::slice::from_ref(&modification), &schema, |attr, value, priv_| {
        let probe = Probe {
            entry_ndn: "dc=x",
            attr,
            value,
        };
        evaluator.access_allowed(&collab, &ctx, &probe, RequestedAccess::new(priv_), &mut cache)
    });
    assert!(!granted);
}
