//! Shared fixtures for the acl-engine integration tests.

use acl_engine::{
    AttrDesc, AttrLookup, EntryStore, EvalError, FilterResult, SchemaResolver, SetMatcher,
};
use std::collections::HashMap;

#[derive(Default)]
pub struct FixtureSchema {
    pub dn_syntax: Vec<String>,
    pub no_user_mod: Vec<String>,
}

impl SchemaResolver for FixtureSchema {
    fn resolve_attr_name(&self, text: &str) -> Result<AttrDesc, EvalError> {
        Ok(AttrDesc::new(text.to_ascii_lowercase(), 0))
    }

    fn is_in_list(&self, attr: &AttrDesc, list: &[AttrDesc]) -> bool {
        list.iter().any(|a| a.name.eq_ignore_ascii_case(&attr.name))
    }

    fn is_no_user_mod(&self, attr: &AttrDesc) -> bool {
        self.no_user_mod.iter().any(|n| n.eq_ignore_ascii_case(&attr.name))
    }

    fn is_dn_syntax(&self, attr: &AttrDesc) -> bool {
        self.dn_syntax.iter().any(|n| n.eq_ignore_ascii_case(&attr.name))
    }

    fn match_values(&self, _attr: &AttrDesc, pattern: &str, actual_values: &[String]) -> Result<bool, EvalError> {
        Ok(actual_values.iter().any(|v| v.eq_ignore_ascii_case(pattern)))
    }

    fn test_filter(&self, _entry_ndn: &str, _filter: &str) -> FilterResult {
        FilterResult::True
    }
}

#[derive(Default)]
pub struct FixtureStore {
    pub attrs: HashMap<(String, String), Vec<String>>,
    pub missing_entries: Vec<String>,
    pub groups: HashMap<(String, String), bool>,
}

impl FixtureStore {
    pub fn set_attr(&mut self, entry_ndn: &str, attr: &str, values: Vec<String>) {
        self.attrs.insert((entry_ndn.to_string(), attr.to_ascii_lowercase()), values);
    }
}

impl EntryStore for FixtureStore {
    fn get_attribute(&self, entry_ndn: &str, attr: &AttrDesc) -> AttrLookup {
        if self.missing_entries.iter().any(|e| e == entry_ndn) {
            return AttrLookup::NotFound;
        }
        match self.attrs.get(&(entry_ndn.to_string(), attr.name.to_ascii_lowercase())) {
            Some(values) => AttrLookup::Values(values.clone()),
            None => AttrLookup::NoSuchAttr,
        }
    }

    fn group_member(&self, group_ndn: &str, member_ndn: &str, _object_class: &str, _member_attr: &str) -> Result<bool, EvalError> {
        Ok(*self
            .groups
            .get(&(group_ndn.to_string(), member_ndn.to_string()))
            .unwrap_or(&false))
    }
}

pub struct FixtureSets;

impl SetMatcher for FixtureSets {
    fn eval_set(&self, _set_expr: &str, _user_ndn: &str, _entry_ndn: &str) -> Result<bool, EvalError> {
        Ok(false)
    }
}
