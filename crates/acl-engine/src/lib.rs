//! Access-control decision engine for a directory server implementing
//! the LDAP data and query model.
//!
//! Given an authenticated operation, a target entry, an attribute
//! (optionally a specific value), and a requested privilege, this
//! crate decides whether the privilege is granted and produces the
//! effective privilege mask. Configuration parsing, the storage
//! backend, the wire protocol, and schema loading are all external —
//! see [`store`] for the collaborator traits this crate consumes
//! instead of owning.

mod aci;
mod cache;
mod context;
mod dn;
mod engine;
mod error;
mod mask;
mod modify;
mod pattern;
mod privilege;
mod rule;
mod store;
mod who;

pub use cache::{ResumePoint, StateCache};
pub use context::{parse_peer_name, PeerAddress, RequestContext, SecurityFactors};
pub use engine::{Collaborators, Evaluator, Probe};
pub use error::EvalError;
pub use modify::{check_modification_list, ModOp, Modification};
pub use pattern::{Captures, Style, ACL_BUF_SIZE};
pub use privilege::{AccessMask, ControlVerdict, MaskEffect, Privilege, RequestedAccess};
pub use rule::{AccessControl, EntryPredicate, PolicyList, ValuePredicate};
pub use store::{
    AttrDesc, AttrLookup, DynamicAclModule, DynamicAclRegistry, EntryStore, FilterResult,
    SchemaResolver, SetMatcher,
};
pub use who::{Access, ClauseInput, ClauseOutcome, DnClause, DomainClause, GroupClause, NetClause, WhoDimension};

pub use dn::{ancestors, dn_is_suffix, dn_match, dn_parent, dn_rdn_depth, dn_rdn_len, normalize};
