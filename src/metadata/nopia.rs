//! Cache of embedded interop ("NoPia") local types.
//!
//! A type marked with `System.Runtime.InteropServices.TypeIdentifierAttribute` is a local copy
//! of a COM interop type that was embedded into the referencing assembly. Compilers need to know
//! this for every `TypeDef` they import, so the answer is cached per row:
//!
//! - a bit per `TypeDef` row records that the row was checked,
//! - a map holds the matched attribute of every positive row,
//! - a module wide tri-state gate short-circuits all queries once the module is known to contain
//!   no local types.
//!
//! Bits are only ever set and the map is written before the bit, so a reader that observes a set
//! bit always finds the positive entry. Threads racing on the same row compute the same answer
//! from immutable metadata and converge on it.

use dashmap::DashMap;
use tracing::debug;

use crate::{
    file::parser::Parser,
    metadata::{
        attributes::{
            crack_string, decode_attribute, find_target_attribute, target_attribute_signature_index,
            AttributeDescription, AttributeInfo, AttributeValue, ValueKind, ATTRIBUTE_PROLOG,
        },
        reader::RawMetadata,
        tables::{TableId, TypeAttributes},
        token::Token,
    },
    utils::{AtomicBitSet, AtomicThreeState},
    Error, Result,
};

pub use crate::utils::ThreeState;

/// Signature index of `TypeIdentifierAttribute(string scope, string identifier)`.
const TYPE_IDENTIFIER_WITH_ARGUMENTS: usize = 1;

/// Identity of an embedded interop type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoPiaLocalTypeInfo {
    /// The matched `TypeIdentifierAttribute`
    pub attribute: AttributeInfo,
    /// Value of the `GuidAttribute`, for interfaces only
    pub interface_guid: Option<String>,
    /// Explicit scope argument of `TypeIdentifierAttribute`
    pub scope: Option<String>,
    /// Explicit identifier argument of `TypeIdentifierAttribute`
    pub identifier: Option<String>,
}

/// Per-module cache of `TypeIdentifierAttribute` lookups.
#[derive(Debug)]
pub struct NoPiaCache {
    gate: AtomicThreeState,
    checked: AtomicBitSet,
    local_types: DashMap<u32, AttributeInfo>,
}

impl NoPiaCache {
    /// Create an empty cache for a module with `type_def_count` types.
    ///
    /// With `include_embedded_interop_types` the module is treated as containing no local
    /// types at all.
    #[must_use]
    pub fn new(type_def_count: u32, include_embedded_interop_types: bool) -> Self {
        let gate = if include_embedded_interop_types {
            ThreeState::False
        } else {
            ThreeState::Unknown
        };

        NoPiaCache {
            gate: AtomicThreeState::new(gate),
            checked: AtomicBitSet::new(type_def_count as usize + 1),
            local_types: DashMap::new(),
        }
    }

    /// Current value of the module wide gate.
    #[must_use]
    pub fn gate(&self) -> ThreeState {
        self.gate.load()
    }

    /// True if the row was already checked.
    #[must_use]
    pub fn is_checked(&self, type_def_rid: u32) -> bool {
        self.checked.contains(type_def_rid as usize)
    }

    /// Number of rows known to be local types.
    #[must_use]
    pub fn local_type_count(&self) -> usize {
        self.local_types.len()
    }

    /// The `TypeIdentifierAttribute` of a `TypeDef` row, if it has one.
    pub fn is_no_pia_local_type(
        &self,
        reader: &dyn RawMetadata,
        type_def_rid: u32,
    ) -> Option<AttributeInfo> {
        if self.gate.load() == ThreeState::False {
            return None;
        }

        if self.is_checked(type_def_rid) {
            return self.local_types.get(&type_def_rid).map(|entry| *entry);
        }

        let parent = Token::from_parts(TableId::TypeDef, type_def_rid);
        match find_target_attribute(reader, parent, &AttributeDescription::TYPE_IDENTIFIER) {
            Some(info) => {
                if self.gate.load() == ThreeState::Unknown {
                    debug!(token = %parent, "module contains embedded interop types");
                }
                self.gate.publish(ThreeState::True);
                self.register(type_def_rid, info);
                Some(info)
            }
            None => {
                self.checked.insert(type_def_rid as usize);
                None
            }
        }
    }

    /// Like [`NoPiaCache::is_no_pia_local_type`], additionally extracting the interface guid and
    /// the explicit scope and identifier.
    ///
    /// Returns `None` if the row is not a local type, or if its identity cannot be read.
    pub fn local_type_info(
        &self,
        reader: &dyn RawMetadata,
        type_def_rid: u32,
    ) -> Option<NoPiaLocalTypeInfo> {
        let attribute = self.is_no_pia_local_type(reader, type_def_rid)?;
        let parent = Token::from_parts(TableId::TypeDef, type_def_rid);

        match read_local_type_identity(reader, parent, attribute) {
            Ok(info) => info,
            Err(error) => {
                debug!(token = %parent, %error, "embedded interop type identity not readable");
                None
            }
        }
    }

    /// True if any type in the module carries a `TypeIdentifierAttribute`.
    ///
    /// Scans the whole `CustomAttribute` table once and caches the answer in the gate. A hit also
    /// seeds the per-row cache.
    pub fn contains_no_pia_local_types(&self, reader: &dyn RawMetadata) -> bool {
        match self.gate.load() {
            ThreeState::True => return true,
            ThreeState::False => return false,
            ThreeState::Unknown => {}
        }

        match first_type_identifier(reader) {
            Ok(Some((type_def_rid, info))) => {
                self.gate.publish(ThreeState::True);
                self.register(type_def_rid, info);
            }
            Ok(None) => {
                self.gate.publish(ThreeState::False);
            }
            Err(error) => {
                debug!(%error, "custom attribute table not scannable");
                self.gate.publish(ThreeState::False);
            }
        }

        self.gate.load() == ThreeState::True
    }

    /// Treat the module as containing no local types from now on.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if local types were already found.
    pub fn pretend_there_are_no_no_pia_local_types(&self) -> Result<()> {
        if self.gate.load() == ThreeState::True {
            return Err(Error::NotSupported(
                "module is already known to contain embedded interop types".to_string(),
            ));
        }

        self.gate.store(ThreeState::False);
        Ok(())
    }

    fn register(&self, type_def_rid: u32, info: AttributeInfo) {
        self.local_types.entry(type_def_rid).or_insert(info);
        self.checked.insert(type_def_rid as usize);
    }
}

fn first_type_identifier(reader: &dyn RawMetadata) -> Result<Option<(u32, AttributeInfo)>> {
    for rid in 1..=reader.row_count(TableId::CustomAttribute) {
        let parent = reader.custom_attribute(rid)?.parent;
        if !parent.is(TableId::TypeDef) {
            continue;
        }

        let handle = Token::from_parts(TableId::CustomAttribute, rid);
        if let Some(index) =
            target_attribute_signature_index(reader, handle, &AttributeDescription::TYPE_IDENTIFIER)
        {
            return Ok(Some((parent.row(), AttributeInfo::new(handle, index))));
        }
    }

    Ok(None)
}

fn read_local_type_identity(
    reader: &dyn RawMetadata,
    parent: Token,
    attribute: AttributeInfo,
) -> Result<Option<NoPiaLocalTypeInfo>> {
    let mut info = NoPiaLocalTypeInfo {
        attribute,
        ..NoPiaLocalTypeInfo::default()
    };

    if reader.type_def(parent.row())?.flags & TypeAttributes::INTERFACE != 0 {
        info.interface_guid = find_target_attribute(reader, parent, &AttributeDescription::GUID)
            .and_then(|guid| decode_attribute(reader, guid.handle, ValueKind::String))
            .and_then(|value| match value {
                AttributeValue::String(guid) => guid,
                _ => None,
            });
    }

    if attribute.signature_index == TYPE_IDENTIFIER_WITH_ARGUMENTS {
        let blob = reader.blob(reader.custom_attribute(attribute.handle.row())?.value)?;
        if blob.len() > 4 {
            let mut parser = Parser::new(blob);
            if parser.read_le::<u16>()? == ATTRIBUTE_PROLOG {
                let Some(scope) = crack_string(&mut parser) else {
                    return Ok(None);
                };
                let Some(identifier) = crack_string(&mut parser) else {
                    return Ok(None);
                };
                info.scope = scope;
                info.identifier = identifier;
            }
        }
    }

    Ok(Some(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::image::{MetadataImage, MetadataImageBuilder};

    fn image() -> (MetadataImage, Token, Token, Token) {
        let mut builder = MetadataImageBuilder::new();
        builder.add_module("Interop.dll").unwrap();
        let mscorlib = builder
            .add_assembly_ref("mscorlib", [4, 0, 0, 0], &[], "")
            .unwrap();
        let identifier = builder
            .add_type_ref(mscorlib, "System.Runtime.InteropServices", "TypeIdentifierAttribute")
            .unwrap();
        let plain_ctor = builder
            .add_member_ref(identifier, ".ctor", &[0x20, 0x00, 0x01])
            .unwrap();
        let scoped_ctor = builder
            .add_member_ref(identifier, ".ctor", &[0x20, 0x02, 0x01, 0x0E, 0x0E])
            .unwrap();
        let guid = builder
            .add_type_ref(mscorlib, "System.Runtime.InteropServices", "GuidAttribute")
            .unwrap();
        let guid_ctor = builder
            .add_member_ref(guid, ".ctor", &[0x20, 0x01, 0x01, 0x0E])
            .unwrap();

        let local = builder
            .add_type_def(TypeAttributes::PUBLIC, "Interop", "Local", Token::default())
            .unwrap();
        let plain = builder
            .add_type_def(TypeAttributes::PUBLIC, "Interop", "Plain", Token::default())
            .unwrap();
        let interface = builder
            .add_type_def(
                TypeAttributes::PUBLIC | TypeAttributes::INTERFACE,
                "Interop",
                "IScoped",
                Token::default(),
            )
            .unwrap();

        builder
            .add_custom_attribute(local, plain_ctor, &[0x01, 0x00])
            .unwrap();

        #[rustfmt::skip]
        let scoped = [
            0x01, 0x00,
            0x03, b'l', b'i', b'b',
            0x04, b'I', b'S', b'c', b'o',
            0x00, 0x00,
        ];
        builder
            .add_custom_attribute(interface, scoped_ctor, &scoped)
            .unwrap();
        builder
            .add_custom_attribute(interface, guid_ctor, &[0x01, 0x00, 0x03, b'a', b'b', b'c', 0x00, 0x00])
            .unwrap();

        (builder.build(), local, plain, interface)
    }

    #[test]
    fn per_row_cache() {
        let (image, local, plain, _) = image();
        let cache = NoPiaCache::new(image.row_count(TableId::TypeDef), false);

        assert!(!cache.is_checked(plain.row()));
        assert!(cache.is_no_pia_local_type(&image, plain.row()).is_none());
        assert!(cache.is_checked(plain.row()));
        assert_eq!(cache.gate(), ThreeState::Unknown);

        let info = cache.is_no_pia_local_type(&image, local.row()).unwrap();
        assert_eq!(info.signature_index, 0);
        assert_eq!(cache.gate(), ThreeState::True);
        assert_eq!(cache.is_no_pia_local_type(&image, local.row()), Some(info));
        assert_eq!(cache.local_type_count(), 1);
    }

    #[test]
    fn local_type_identity() {
        let (image, local, _, interface) = image();
        let cache = NoPiaCache::new(image.row_count(TableId::TypeDef), false);

        let info = cache.local_type_info(&image, interface.row()).unwrap();
        assert_eq!(info.attribute.signature_index, 1);
        assert_eq!(info.interface_guid.as_deref(), Some("abc"));
        assert_eq!(info.scope.as_deref(), Some("lib"));
        assert_eq!(info.identifier.as_deref(), Some("ISco"));

        let info = cache.local_type_info(&image, local.row()).unwrap();
        assert_eq!(info.interface_guid, None);
        assert_eq!(info.scope, None);
    }

    #[test]
    fn module_wide_gate() {
        let (image, local, _, _) = image();
        let cache = NoPiaCache::new(image.row_count(TableId::TypeDef), false);

        assert!(cache.contains_no_pia_local_types(&image));
        assert_eq!(cache.gate(), ThreeState::True);
        assert!(cache.is_checked(local.row()));
        assert!(cache.pretend_there_are_no_no_pia_local_types().is_err());

        let embedded = NoPiaCache::new(image.row_count(TableId::TypeDef), true);
        assert!(!embedded.contains_no_pia_local_types(&image));
        assert!(embedded.is_no_pia_local_type(&image, local.row()).is_none());
        assert!(!embedded.is_checked(local.row()));
    }

    #[test]
    fn pretend_blocks_queries() {
        let (image, local, _, _) = image();
        let cache = NoPiaCache::new(image.row_count(TableId::TypeDef), false);

        cache.pretend_there_are_no_no_pia_local_types().unwrap();
        assert!(cache.is_no_pia_local_type(&image, local.row()).is_none());
        assert!(!cache.contains_no_pia_local_types(&image));
    }

    #[test]
    fn module_without_local_types() {
        let mut builder = MetadataImageBuilder::new();
        builder
            .add_type_def(TypeAttributes::PUBLIC, "N", "T", Token::default())
            .unwrap();
        let image = builder.build();

        let cache = NoPiaCache::new(image.row_count(TableId::TypeDef), false);
        assert!(!cache.contains_no_pia_local_types(&image));
        assert_eq!(cache.gate(), ThreeState::False);
    }
}
