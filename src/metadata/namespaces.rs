//! Namespace grouping, name indexes and the type forwarder map.
//!
//! Binding a qualified name against an imported module starts with namespaces: the binder asks
//! for the top-level types grouped by namespace, checks cheap name sets before doing real
//! lookups, and falls back to the forwarder map when a type moved to another assembly.
//!
//! Everything here is computed from the immutable tables of a [`RawMetadata`] and is published
//! once by [`crate::metadata::module::PeModule`].
//!
//! # Ordering of namespace groups
//!
//! Groups with distinct names stay distinct even when the caller's comparer considers them
//! equal, so `A` and `a` are two groups. They are sorted by the comparer first, so such groups
//! end up adjacent. Ties are broken by the first type of each group, with forwarder-only groups
//! (no types) after the others, and finally by ordinal comparison of the names.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use tracing::debug;

use crate::{
    metadata::{
        attributes::is_nested,
        reader::{table_tokens, RawMetadata},
        tables::{TableId, TypeAttributes, TypeDefRaw},
        token::Token,
    },
    Result,
};

/// How metadata names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameComparer {
    /// Code unit by code unit
    #[default]
    Ordinal,
    /// Code unit by code unit after simple upper-case mapping
    OrdinalIgnoreCase,
}

impl NameComparer {
    /// The comparer for a case sensitivity flag.
    #[must_use]
    pub fn from_ignore_case(ignore_case: bool) -> Self {
        if ignore_case {
            NameComparer::OrdinalIgnoreCase
        } else {
            NameComparer::Ordinal
        }
    }

    /// Compare two names. Ordinal order is UTF-16 code unit order.
    #[must_use]
    pub fn compare(self, left: &str, right: &str) -> Ordering {
        match self {
            NameComparer::Ordinal => left.encode_utf16().cmp(right.encode_utf16()),
            NameComparer::OrdinalIgnoreCase => fold_case(left)
                .encode_utf16()
                .cmp(fold_case(right).encode_utf16()),
        }
    }

    /// True if the two names are equal under this comparer.
    #[must_use]
    pub fn equals(self, left: &str, right: &str) -> bool {
        match self {
            NameComparer::Ordinal => left == right,
            NameComparer::OrdinalIgnoreCase => left
                .chars()
                .flat_map(char::to_uppercase)
                .eq(right.chars().flat_map(char::to_uppercase)),
        }
    }
}

fn fold_case(value: &str) -> String {
    value.chars().flat_map(char::to_uppercase).collect()
}

/// `namespace.name`, or `name` in the global namespace.
#[must_use]
pub fn full_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Name of a `TypeDef` row.
///
/// Nested types never have a namespace of their own. Some compilers put the part of a nested
/// type's name before its last dot into the namespace column; for those the namespace is
/// prepended again.
///
/// # Errors
/// Returns an error if a name cannot be read from the `#Strings` heap.
pub fn type_def_name(reader: &dyn RawMetadata, row: &TypeDefRaw) -> Result<String> {
    let name = reader.string(row.type_name)?;

    if is_nested(row.flags) {
        let namespace = reader.string(row.type_namespace)?;
        if !namespace.is_empty() {
            return Ok(format!("{namespace}.{name}"));
        }
    }

    Ok(name.to_string())
}

/// A set of identifiers that answers both case-sensitive and case-insensitive membership.
#[derive(Debug, Clone, Default)]
pub struct IdentifierCollection {
    by_folded_name: HashMap<String, HashSet<String>>,
}

impl IdentifierCollection {
    /// Build a collection from `names`; duplicates are collapsed.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_folded_name: HashMap<String, HashSet<String>> = HashMap::new();
        for name in names {
            let name = name.into();
            by_folded_name
                .entry(fold_case(&name))
                .or_default()
                .insert(name);
        }

        IdentifierCollection { by_folded_name }
    }

    /// True if `name` is in the collection, compared ordinally.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_folded_name
            .get(&fold_case(name))
            .is_some_and(|spellings| spellings.contains(name))
    }

    /// True if `name` is in the collection, ignoring case.
    #[must_use]
    pub fn contains_ignore_case(&self, name: &str) -> bool {
        self.by_folded_name.contains_key(&fold_case(name))
    }

    /// Number of distinct spellings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_folded_name.values().map(HashSet::len).sum()
    }

    /// True if the collection holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_folded_name.is_empty()
    }
}

/// Simple names of every type, with the generic arity suffix (`` `N ``) removed.
///
/// Returns an empty collection if the `TypeDef` table cannot be read.
pub fn type_name_collection(reader: &dyn RawMetadata) -> IdentifierCollection {
    let compute = || -> Result<Vec<String>> {
        let mut names = Vec::new();
        for rid in 1..=reader.row_count(TableId::TypeDef) {
            let mut name = type_def_name(reader, &reader.type_def(rid)?)?;
            if let Some(backtick) = name.find('`') {
                name.truncate(backtick);
            }
            names.push(name);
        }
        Ok(names)
    };

    match compute() {
        Ok(names) => IdentifierCollection::new(names),
        Err(error) => {
            debug!(%error, "type name collection not computable");
            IdentifierCollection::default()
        }
    }
}

/// Every dot separated fragment of the namespaces of top-level types.
///
/// Returns an empty collection if the `TypeDef` table cannot be read.
pub fn namespace_name_collection(reader: &dyn RawMetadata) -> IdentifierCollection {
    let compute = || -> Result<Vec<String>> {
        let mut namespaces = HashSet::new();
        for rid in 1..=reader.row_count(TableId::TypeDef) {
            let row = reader.type_def(rid)?;
            if !is_nested(row.flags) && row.type_namespace != 0 {
                namespaces.insert(row.type_namespace);
            }
        }

        let mut fragments = Vec::new();
        for namespace in namespaces {
            fragments.extend(
                reader
                    .string(namespace)?
                    .split('.')
                    .filter(|fragment| !fragment.is_empty())
                    .map(str::to_string),
            );
        }
        Ok(fragments)
    };

    match compute() {
        Ok(fragments) => IdentifierCollection::new(fragments),
        Err(error) => {
            debug!(%error, "namespace name collection not computable");
            IdentifierCollection::default()
        }
    }
}

/// The top-level types of one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceGroup {
    /// Fully qualified namespace name, empty for the global namespace
    pub namespace: String,
    /// `TypeDef` tokens in table order; empty if the namespace only holds forwarded types
    pub types: Vec<Token>,
}

impl NamespaceGroup {
    fn first_type(&self) -> Option<Token> {
        self.types.first().copied()
    }
}

/// Group the top-level types by namespace and add empty groups for namespaces that only
/// contain forwarded types.
///
/// # Errors
/// Returns an error if a `TypeDef` row or a namespace name cannot be read.
pub fn group_types_by_namespace(
    reader: &dyn RawMetadata,
    forwarders: &ForwarderMap,
    comparer: NameComparer,
) -> Result<Vec<NamespaceGroup>> {
    // Group by heap index first so each namespace string is materialized once
    let mut by_index: Vec<(u32, Vec<Token>)> = Vec::new();
    let mut index_slots: HashMap<u32, usize> = HashMap::new();
    for token in table_tokens(TableId::TypeDef, reader.row_count(TableId::TypeDef)) {
        let row = reader.type_def(token.row())?;
        if is_nested(row.flags) {
            continue;
        }

        let slot = *index_slots.entry(row.type_namespace).or_insert_with(|| {
            by_index.push((row.type_namespace, Vec::new()));
            by_index.len() - 1
        });
        by_index[slot].1.push(token);
    }

    let mut groups: Vec<NamespaceGroup> = Vec::new();
    let mut group_slots: HashMap<String, usize> = HashMap::new();
    for (index, types) in by_index {
        let namespace = reader.string(index)?;
        match group_slots.get(namespace) {
            Some(&slot) => groups[slot].types.extend(types),
            None => {
                group_slots.insert(namespace.to_string(), groups.len());
                groups.push(NamespaceGroup {
                    namespace: namespace.to_string(),
                    types,
                });
            }
        }
    }

    for namespace in forwarders.namespaces() {
        if !group_slots.contains_key(namespace) {
            group_slots.insert(namespace.to_string(), groups.len());
            groups.push(NamespaceGroup {
                namespace: namespace.to_string(),
                types: Vec::new(),
            });
        }
    }

    groups.sort_by(|left, right| compare_groups(comparer, left, right));
    Ok(groups)
}

fn compare_groups(comparer: NameComparer, left: &NamespaceGroup, right: &NamespaceGroup) -> Ordering {
    comparer
        .compare(&left.namespace, &right.namespace)
        .then_with(|| match (left.first_type(), right.first_type()) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| NameComparer::Ordinal.compare(&left.namespace, &right.namespace))
}

/// Full names of forwarded types mapped to the `AssemblyRef` now defining them.
///
/// Lookups that ignore case walk the map linearly; the map itself stays case-sensitive because
/// metadata name resolution is.
#[derive(Debug, Clone, Default)]
pub struct ForwarderMap {
    types: HashMap<String, Token>,
}

impl ForwarderMap {
    /// Scan the `ExportedType` table for forwarders.
    ///
    /// Rows that cannot be read, or whose implementation is not an `AssemblyRef`, are skipped.
    /// If a name is forwarded twice the first row wins.
    #[must_use]
    pub fn build(reader: &dyn RawMetadata) -> Self {
        let mut types = HashMap::new();

        for rid in 1..=reader.row_count(TableId::ExportedType) {
            let entry = || -> Result<Option<(String, Token)>> {
                let row = reader.exported_type(rid)?;
                if row.flags & TypeAttributes::FORWARDER == 0 {
                    return Ok(None);
                }

                if !row.implementation.is(TableId::AssemblyRef) {
                    return Err(malformed_error!(
                        "Forwarder {} does not point to an AssemblyRef - {}",
                        rid,
                        row.implementation
                    ));
                }

                let name = reader.string(row.name)?;
                let namespace = reader.string(row.namespace)?;
                Ok(Some((full_name(namespace, name), row.implementation)))
            };

            match entry() {
                Ok(Some((name, assembly_ref))) => {
                    types.entry(name).or_insert(assembly_ref);
                }
                Ok(None) => {}
                Err(error) => debug!(rid, %error, "skipping malformed type forwarder"),
            }
        }

        ForwarderMap { types }
    }

    /// The `AssemblyRef` a type was forwarded to, and the name as stored in metadata.
    #[must_use]
    pub fn get(&self, full_name: &str, ignore_case: bool) -> Option<(Token, &str)> {
        if ignore_case {
            self.types
                .iter()
                .find(|(name, _)| NameComparer::OrdinalIgnoreCase.equals(name, full_name))
                .map(|(name, &assembly_ref)| (assembly_ref, name.as_str()))
        } else {
            self.types
                .get_key_value(full_name)
                .map(|(name, &assembly_ref)| (assembly_ref, name.as_str()))
        }
    }

    /// All forwarded types.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Token)> {
        self.types
            .iter()
            .map(|(name, &assembly_ref)| (name.as_str(), assembly_ref))
    }

    /// Namespaces of the forwarded types, possibly repeated.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.types
            .keys()
            .map(|name| name.rfind('.').map_or("", |dot| &name[..dot]))
    }

    /// Number of forwarded types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if nothing is forwarded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
