//! Who-Clause Evaluator (spec §4.3): a clause is a conjunction of
//! independently optional dimensions (spec §9's "variant with one
//! constructor per dimension and an AND-combinator"); an empty
//! dimension list is the unit clause that matches any requester.

use crate::aci;
use crate::context::{PeerAddress, RequestContext};
use crate::dn;
use crate::pattern::{self, Captures, Style};
use crate::privilege::{AccessMask, ControlVerdict, MaskEffect, RequestedAccess};
use crate::store::{AttrDesc, AttrLookup, DynamicAclRegistry, EntryStore, SchemaResolver, SetMatcher};

/// Shared shape for the DN-pattern and Real-DN dimensions (spec §4.3).
#[derive(Debug, Clone)]
pub struct DnClause {
    pub pattern: String,
    pub style: Style,
    pub expand: bool,
}

/// Shared shape for the socket-URL / peer-name / socket-name network
/// predicates. `*` in `pattern` always matches (spec §4.3).
#[derive(Debug, Clone)]
pub struct NetClause {
    pub pattern: String,
    pub style: Style,
}

/// Peer-domain predicate: matches exactly, or (when `subtree`) accepts
/// trailing-label alignment on `.` separators.
#[derive(Debug, Clone)]
pub struct DomainClause {
    pub pattern: String,
    pub subtree: bool,
}

#[derive(Debug, Clone)]
pub struct GroupClause {
    pub dn_pattern: String,
    pub expand: bool,
    pub object_class: String,
    pub member_attr: String,
}

/// One independently-optional predicate over the requester (spec §4.3).
#[derive(Debug, Clone)]
pub enum WhoDimension {
    Dn(DnClause),
    RealDn(DnClause),
    SocketUrl(NetClause),
    PeerDomain(DomainClause),
    PeerName(NetClause),
    SocketName(NetClause),
    DnAttr { attr: AttrDesc, is_self: bool },
    Group(GroupClause),
    Set { expr: String, expand: bool },
    Security(crate::context::SecurityFactors),
    DynamicAci { attr: AttrDesc },
    DynamicModule { name: String },
}

/// A who clause: dimensions AND together, then an effect/verdict pair
/// applies when they all pass (spec §3 "Who clause (Access)").
#[derive(Debug, Clone)]
pub struct Access {
    pub dimensions: Vec<WhoDimension>,
    pub effect: MaskEffect,
    pub verdict: ControlVerdict,
}

/// Everything the who-clause walk needs about the current probe,
/// beyond the clause itself.
pub struct ClauseInput<'a> {
    pub ctx: &'a RequestContext,
    pub target_entry_ndn: &'a str,
    pub attr: &'a AttrDesc,
    pub value: Option<&'a str>,
    pub requested: &'a RequestedAccess,
    /// Entry-DN regex captures from rule selection, used to expand
    /// `$N` references in DN-pattern/network dimensions.
    pub entry_captures: &'a Captures,
}

/// What a clause evaluation yields: either it didn't match (the walk
/// should move to the next clause) or it matched and produced the
/// effect/verdict pair to feed the Mask Composer.
pub enum ClauseOutcome {
    Skip,
    Apply { effect: MaskEffect, verdict: ControlVerdict },
}

/// Evaluate one who clause against `input` (spec §4.3). `clause_mask`
/// is the running mask accumulated so far, used only to gate the
/// dynamic-ACI dimension.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_clause(
    access: &Access,
    input: &ClauseInput<'_>,
    schema: &dyn SchemaResolver,
    store: &dyn EntryStore,
    sets: &dyn SetMatcher,
    registry: &DynamicAclRegistry,
) -> ClauseOutcome {
    let mut dynamic_override: Option<MaskEffect> = None;

    for dim in &access.dimensions {
        match dim {
            WhoDimension::DynamicAci { .. } | WhoDimension::DynamicModule { .. } => {
                // Handled after the static dimensions all pass, since it
                // needs the clause's own declared mask (spec §4.3).
            }
            _ => {
                if !static_dimension_matches(dim, input, schema, store, sets) {
                    return ClauseOutcome::Skip;
                }
            }
        }
    }

    for dim in &access.dimensions {
        let (grant, deny) = match dim {
            WhoDimension::DynamicAci { attr } => {
                if !access.effect.declared_mask().grants(input.requested) {
                    return ClauseOutcome::Skip;
                }
                aci::evaluate(
                    attr,
                    input.target_entry_ndn,
                    input.attr,
                    &input.ctx.op_ndn,
                    input.ctx,
                    store,
                    sets,
                )
            }
            WhoDimension::DynamicModule { name } => {
                if !access.effect.declared_mask().grants(input.requested) {
                    return ClauseOutcome::Skip;
                }
                let Some(module) = registry.lookup(name) else {
                    return ClauseOutcome::Skip;
                };
                module.mask(
                    input.target_entry_ndn,
                    input.attr,
                    input.value,
                    input.entry_captures,
                )
            }
            _ => continue,
        };
        match aci::combine_with_clause_mask(grant, deny, access.effect.declared_mask()) {
            Some(effect) => dynamic_override = Some(effect),
            None => return ClauseOutcome::Skip,
        }
    }

    ClauseOutcome::Apply {
        effect: dynamic_override.unwrap_or(access.effect),
        verdict: access.verdict,
    }
}

fn static_dimension_matches(
    dim: &WhoDimension,
    input: &ClauseInput<'_>,
    schema: &dyn SchemaResolver,
    store: &dyn EntryStore,
    sets: &dyn SetMatcher,
) -> bool {
    match dim {
        WhoDimension::Dn(clause) => dn_clause_matches(clause, &input.ctx.op_ndn, input),
        WhoDimension::RealDn(clause) => dn_clause_matches(clause, &input.ctx.real_ndn, input),
        WhoDimension::SocketUrl(clause) => net_clause_matches(
            clause,
            input.ctx.listener_url.as_deref(),
            input,
        ),
        WhoDimension::PeerName(clause) => peer_name_matches(clause, input),
        WhoDimension::SocketName(clause) => {
            net_clause_matches(clause, input.ctx.socket_name.as_deref(), input)
        }
        WhoDimension::PeerDomain(clause) => peer_domain_matches(clause, input.ctx.peer_domain.as_deref()),
        WhoDimension::DnAttr { attr, is_self } => dn_attr_matches(attr, *is_self, input, store),
        WhoDimension::Group(clause) => group_matches(clause, input, store),
        WhoDimension::Set { expr, expand } => set_matches(expr, *expand, input, sets),
        WhoDimension::Security(floor) => input.ctx.ssf.meets(floor),
        WhoDimension::DynamicAci { .. } | WhoDimension::DynamicModule { .. } => true,
    }
}

fn expand_if(pattern_str: &str, expand: bool, input: &ClauseInput<'_>) -> Option<String> {
    if expand {
        pattern::expand(pattern_str, &input.ctx.op_ndn, input.entry_captures)
            .map_err(|err| crate::error::fail_closed("who:expand", err))
            .ok()
    } else {
        Some(pattern_str.to_string())
    }
}

fn dn_clause_matches(clause: &DnClause, operand_ndn: &str, input: &ClauseInput<'_>) -> bool {
    match clause.style {
        Style::Anonymous => operand_ndn.is_empty(),
        Style::Users => !operand_ndn.is_empty(),
        Style::SelfLevel(level) => {
            if level >= 0 {
                walk_up(operand_ndn, level as usize).as_deref() == Some(input.target_entry_ndn)
            } else {
                walk_up(input.target_entry_ndn, (-level) as usize).as_deref() == Some(operand_ndn)
            }
        }
        Style::Regex => pattern::regex_match(
            &clause.pattern,
            operand_ndn,
            input.target_entry_ndn,
            input.entry_captures,
        ),
        style => {
            let Some(expanded) = expand_if(&clause.pattern, clause.expand, input) else {
                return false;
            };
            let Ok(normalized) = dn::normalize(&expanded) else {
                return false;
            };
            pattern::structural_match(operand_ndn, &normalized, style)
        }
    }
}

/// Walk `ndn` upward `levels` RDNs, or `None` if it runs out of RDNs
/// before reaching `levels` (spec §8 boundary case).
fn walk_up(ndn: &str, levels: usize) -> Option<String> {
    let mut current = ndn.to_string();
    for _ in 0..levels {
        current = dn::dn_parent(&current)?;
    }
    Some(current)
}

fn net_clause_matches(clause: &NetClause, actual: Option<&str>, input: &ClauseInput<'_>) -> bool {
    let Some(actual) = actual else { return false };
    if clause.pattern == "*" {
        return true;
    }
    match clause.style {
        Style::Regex => {
            let no_caps = Captures::new();
            pattern::regex_match(&clause.pattern, actual, actual, &no_caps)
        }
        Style::Expand => match expand_if(&clause.pattern, true, input) {
            Some(expanded) => expanded.eq_ignore_ascii_case(actual),
            None => false,
        },
        _ => clause.pattern.eq_ignore_ascii_case(actual),
    }
}

fn peer_name_matches(clause: &NetClause, input: &ClauseInput<'_>) -> bool {
    let Some(peer) = &input.ctx.peer else { return false };
    if clause.pattern == "*" {
        return true;
    }
    match clause.style {
        Style::Ip => {
            let PeerAddress::Ip { addr, port } = peer else {
                return false;
            };
            let Some((network, expected_port)) = parse_ip_clause(&clause.pattern) else {
                return false;
            };
            network.contains(addr) && (expected_port.is_none() || *port == expected_port)
        }
        Style::Path => match peer {
            PeerAddress::Path(p) => clause
                .pattern
                .strip_prefix("PATH=")
                .map(|expected| expected == p)
                .unwrap_or(false),
            _ => false,
        },
        _ => {
            let rendered = match peer {
                PeerAddress::Ip { addr, port: Some(p) } => format!("IP={addr}:{p}"),
                PeerAddress::Ip { addr, port: None } => format!("IP={addr}"),
                PeerAddress::Path(p) => format!("PATH={p}"),
            };
            net_clause_matches(clause, Some(rendered.as_str()), input)
        }
    }
}

/// Parse an `IP=address[/prefix][:port]` clause pattern into the
/// network it denotes (spec §3 Style::IP's "(address, mask, port)
/// triple").
fn parse_ip_clause(pattern: &str) -> Option<(ipnet::IpNet, Option<u16>)> {
    let rest = pattern.strip_prefix("IP=")?;
    let (network_part, port) = match rest.rsplit_once(':') {
        Some((n, p)) => (n, p.parse::<u16>().ok()),
        None => (rest, None),
    };
    let network = network_part
        .parse::<ipnet::IpNet>()
        .or_else(|_| network_part.parse::<std::net::IpAddr>().map(ipnet::IpNet::from))
        .ok()?;
    Some((network, port))
}

fn peer_domain_matches(clause: &DomainClause, actual: Option<&str>) -> bool {
    let Some(actual) = actual else { return false };
    if clause.pattern == "*" {
        return true;
    }
    if clause.subtree {
        actual.eq_ignore_ascii_case(&clause.pattern)
            || actual
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", clause.pattern.to_ascii_lowercase()))
    } else {
        actual.eq_ignore_ascii_case(&clause.pattern)
    }
}

fn dn_attr_matches(
    attr: &AttrDesc,
    is_self: bool,
    input: &ClauseInput<'_>,
    store: &dyn EntryStore,
) -> bool {
    match store.get_attribute(input.target_entry_ndn, attr) {
        AttrLookup::Values(values) => {
            let found = values.iter().any(|v| dn::dn_match(v, &input.ctx.op_ndn));
            if found {
                if !is_self {
                    return true;
                }
                return input
                    .value
                    .is_some_and(|v| dn::dn_match(v, &input.ctx.op_ndn));
            }
            is_self && input.value.is_some_and(|v| dn::dn_match(v, &input.ctx.op_ndn))
        }
        _ => is_self && input.value.is_some_and(|v| dn::dn_match(v, &input.ctx.op_ndn)),
    }
}

fn group_matches(clause: &GroupClause, input: &ClauseInput<'_>, store: &dyn EntryStore) -> bool {
    let Some(expanded) = expand_if(&clause.dn_pattern, clause.expand, input) else {
        return false;
    };
    let Ok(normalized) = dn::normalize(&expanded) else {
        return false;
    };
    store
        .group_member(&normalized, &input.ctx.op_ndn, &clause.object_class, &clause.member_attr)
        .unwrap_or_else(|err| crate::error::fail_closed("who:group", err))
}

fn set_matches(expr: &str, expand: bool, input: &ClauseInput<'_>, sets: &dyn SetMatcher) -> bool {
    let Some(expanded) = expand_if(expr, expand, input) else {
        return false;
    };
    sets.eval_set(&expanded, &input.ctx.op_ndn, input.target_entry_ndn)
        .unwrap_or_else(|err| crate::error::fail_closed("who:set", err))
}
