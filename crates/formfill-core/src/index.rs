//! Field tree indexing and name resolution.
//!
//! The index flattens the document's hierarchical field tree into a
//! normalized-name lookup built fresh for every request. Caller-supplied
//! names resolve in two tiers: the exact normalized name first, then the
//! index-stripped form (`Line1[0]` also answers to `Line1`), so templates
//! exported with array subscripts keep working when callers drop them.

use std::collections::{BTreeSet, HashMap, HashSet};

use lazy_static::lazy_static;
use lopdf::{Document, ObjectId};
use regex::Regex;

use crate::acroform;

lazy_static! {
    static ref INDEX_SUFFIX: Regex = Regex::new(r"\[\d+\]").unwrap();
}

/// Trimmed, case-folded form of a field name used as the lookup key.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name with bracketed numeric subscripts removed: `Addr.Line1[0]` becomes
/// `Addr.Line1`.
pub fn strip_index(name: &str) -> String {
    INDEX_SUFFIX.replace_all(name, "").into_owned()
}

/// One resolvable field: its name as spelled in the document, and a handle
/// into the document's object table. The handle is only meaningful against
/// the document the index was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub qualified_name: String,
    pub field_id: ObjectId,
}

/// Flat lookup over every reachable field in a document's form tree.
#[derive(Debug, Default)]
pub struct FieldIndex {
    entries: HashMap<String, LookupEntry>,
}

impl FieldIndex {
    /// Walk the field tree and build the lookup. Never fails: nodes that do
    /// not resolve to a dictionary are skipped, and an unusable tree simply
    /// produces an empty index.
    pub fn build(doc: &Document) -> Self {
        let mut entries: HashMap<String, LookupEntry> = HashMap::new();

        // Explicit work stack: nesting depth is untrusted, so no recursion.
        // Seeded in reverse so fields pop in document order.
        let mut stack: Vec<(ObjectId, String)> = acroform::top_level_field_ids(doc)
            .unwrap_or_default()
            .into_iter()
            .rev()
            .map(|id| (id, String::new()))
            .collect();
        let mut visited: HashSet<ObjectId> = HashSet::new();

        while let Some((id, parent)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Ok(dict) = doc.get_dictionary(id) else {
                continue;
            };

            let local = acroform::text_string(doc, dict, b"T").unwrap_or_default();
            let qualified = match (parent.is_empty(), local.is_empty()) {
                (false, false) => format!("{parent}.{local}"),
                (false, true) => parent.clone(),
                (true, false) => local,
                (true, true) => String::new(),
            };

            if !qualified.is_empty() {
                let exact = normalize(&qualified);
                let stripped = normalize(&strip_index(&qualified));
                // Exact key: last writer wins. Duplicate exact names are a
                // malformed-template concern, not handled specially.
                entries.insert(
                    exact.clone(),
                    LookupEntry {
                        qualified_name: qualified.clone(),
                        field_id: id,
                    },
                );
                // Stripped alias: registered only when distinct and the key
                // is not already claimed by another field.
                if stripped != exact {
                    entries.entry(stripped).or_insert_with(|| LookupEntry {
                        qualified_name: qualified.clone(),
                        field_id: id,
                    });
                }
            }

            for kid in acroform::child_field_ids(doc, dict).into_iter().rev() {
                stack.push((kid, qualified.clone()));
            }
        }

        FieldIndex { entries }
    }

    /// Two-tier lookup: exact normalized name, then the index-stripped form
    /// of the original input. Not-found is an ordinary `None`.
    pub fn resolve(&self, name: &str) -> Option<&LookupEntry> {
        let exact = normalize(name);
        if let Some(entry) = self.entries.get(&exact) {
            return Some(entry);
        }
        let stripped = normalize(&strip_index(name));
        if stripped != exact {
            self.entries.get(&stripped)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered lookup keys (a field reachable under an alias
    /// counts twice).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Distinct qualified field names, sorted, for diagnostics.
    pub fn qualified_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .entries
            .values()
            .map(|entry| entry.qualified_name.clone())
            .collect();
        names.into_iter().collect()
    }
}
