//! External collaborator traits (spec §6): everything the evaluator
//! consumes but does not implement — schema resolution, the entry
//! store, set-expression evaluation, and the dynamic ACL module
//! registry. Storage, wire protocol and schema *loading* stay entirely
//! on the caller's side of these traits (spec §1 "OUT of scope").

use crate::pattern::Captures;
use crate::privilege::AccessMask;
use crate::EvalError;
use std::collections::HashMap;
use std::fmt;

/// An attribute description, compared by schema identity rather than
/// by the string the caller typed — two `AttrDesc`s for the same
/// underlying attribute (reached via different names/aliases) must
/// compare equal and hash equal (spec §9 "Value-dependent caching...
/// keyed by attribute description identity, not name").
#[derive(Debug, Clone)]
pub struct AttrDesc {
    pub name: String,
    pub id: u64,
}

impl AttrDesc {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

impl PartialEq for AttrDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for AttrDesc {}

impl std::hash::Hash for AttrDesc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for AttrDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Result of looking up an attribute's values on a target entry (spec
/// §6: "`getAttribute(...) -> values | NotFound | NoAttr`").
#[derive(Debug, Clone)]
pub enum AttrLookup {
    Values(Vec<String>),
    /// The entry exists but does not carry this attribute.
    NoSuchAttr,
    /// The entry itself could not be located.
    NotFound,
}

/// Outcome of evaluating an LDAP search filter against an entry (spec
/// §6: `testFilter(entry, filter) -> {TRUE, FALSE, UNDEFINED}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    True,
    False,
    Undefined,
}

/// Entry lookups and group-membership probes (spec §2.2, §6).
pub trait EntryStore {
    /// Fetch `attr`'s values on `entry_ndn`.
    fn get_attribute(&self, entry_ndn: &str, attr: &AttrDesc) -> AttrLookup;

    /// Is `member_ndn` a member of `group_ndn` per the given object
    /// class / membership attribute?
    fn group_member(
        &self,
        group_ndn: &str,
        member_ndn: &str,
        object_class: &str,
        member_attr: &str,
    ) -> Result<bool, EvalError>;
}

/// Schema-driven resolution and matching (spec §6).
pub trait SchemaResolver {
    fn resolve_attr_name(&self, text: &str) -> Result<AttrDesc, EvalError>;

    /// Membership test honoring attribute-description hierarchy (spec
    /// §4.2: "semantic membership, not string equality").
    fn is_in_list(&self, attr: &AttrDesc, list: &[AttrDesc]) -> bool;

    fn is_no_user_mod(&self, attr: &AttrDesc) -> bool;

    /// Is this attribute's syntax DN-valued? Value predicates switch
    /// between structural DN styles and schema matching rules based on
    /// this (spec §4.2 step 3).
    fn is_dn_syntax(&self, attr: &AttrDesc) -> bool;

    /// Evaluate a non-DN-syntax value predicate using the attribute's
    /// schema matching rule.
    fn match_values(
        &self,
        attr: &AttrDesc,
        pattern: &str,
        actual_values: &[String],
    ) -> Result<bool, EvalError>;

    fn test_filter(&self, entry_ndn: &str, filter: &str) -> FilterResult;
}

/// Dynamic set-expression evaluation (spec §4.3, §6).
pub trait SetMatcher {
    fn eval_set(&self, set_expr: &str, user_ndn: &str, entry_ndn: &str) -> Result<bool, EvalError>;
}

/// A pluggable dynamic ACL module (spec §9: "a registry of name ->
/// vtable"). The built-in [`crate::aci`] engine is an ordinary
/// registrant, not a privileged special case.
pub trait DynamicAclModule: fmt::Debug {
    fn name(&self) -> &str;

    /// Compute the (grant, deny) mask pair this module contributes for
    /// the given (entry, attribute, value) probe.
    fn mask(
        &self,
        entry_ndn: &str,
        attr: &AttrDesc,
        value: Option<&str>,
        matches: &Captures,
    ) -> (AccessMask, AccessMask);
}

/// Case-insensitive name -> module registry (spec §6, §9), grounded on
/// the same keyed-by-string-id shape used for trust-key lookups
/// elsewhere in this codebase.
#[derive(Default)]
pub struct DynamicAclRegistry {
    modules: HashMap<String, Box<dyn DynamicAclModule>>,
}

impl DynamicAclRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn DynamicAclModule>) {
        self.modules.insert(module.name().to_ascii_lowercase(), module);
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn DynamicAclModule> {
        self.modules
            .get(&name.to_ascii_lowercase())
            .map(|b| b.as_ref())
    }
}

impl fmt::Debug for DynamicAclRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicAclRegistry")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}
