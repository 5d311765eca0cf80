//! The raw metadata reader contract.
//!
//! [`RawMetadata`] is the narrow surface the import facade needs from whatever decoded the
//! image's tables and heaps: row counts, rows by token, the custom attributes of a parent, and
//! heap dereferencing. Everything else the facade asks for (typed rows, member ranges, owner
//! lookups, rows keyed by parent) is a provided method built on those six operations, so an
//! implementation only has to supply storage.
//!
//! # Examples
//!
//! ```rust
//! use cilimport::metadata::{image::MetadataImageBuilder, reader::RawMetadata, tables::TypeAttributes};
//!
//! let mut builder = MetadataImageBuilder::new();
//! let object = builder.add_type_def(TypeAttributes::PUBLIC, "System", "Object", Default::default())?;
//! let image = builder.build();
//!
//! let row = image.type_def(object.row())?;
//! assert_eq!(image.string(row.type_name)?, "Object");
//! # Ok::<(), cilimport::Error>(())
//! ```

use std::ops::Range;

use crate::{
    metadata::{
        tables::{
            AssemblyRaw, AssemblyRefRaw, ClassLayoutRaw, ConstantRaw, CustomAttributeRaw,
            EventMapRaw, EventRaw, ExportedTypeRaw, FieldLayoutRaw, FieldMarshalRaw, FieldRaw,
            FileRaw, GenericParamConstraintRaw, GenericParamRaw, ImplMapRaw,
            ManifestResourceRaw, MemberRefRaw, MethodDefRaw, MethodSpecRaw, ModuleRaw,
            ModuleRefRaw, NestedClassRaw, ParamRaw, PropertyMapRaw, PropertyRaw, RowDefinition,
            TableId, TableRow, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
        },
        token::Token,
    },
    Result,
};

/// Unwrap `row` as an `R`, reporting a malformed image if it belongs to another table.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `row` is not a row of `R::TABLE`.
pub fn expect_row<R: RowDefinition>(row: TableRow) -> Result<R> {
    let table = row.table();
    R::from_row(row).ok_or_else(|| {
        malformed_error!(
            "Expected a {:?} row but found a {:?} row",
            R::TABLE,
            table
        )
    })
}

/// Tokens of all rows of `table`, given its row count.
pub fn table_tokens(table: TableId, count: u32) -> impl Iterator<Item = Token> {
    (1..=count).map(move |rid| Token::from_parts(table, rid))
}

macro_rules! typed_rows {
    ($($(#[$doc:meta])* $name:ident => $table:ident, $raw:ident;)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            /// Returns an error if `rid` does not exist or the reader returns a row of another table.
            fn $name(&self, rid: u32) -> Result<$raw> {
                expect_row(self.row(Token::from_parts(TableId::$table, rid))?)
            }
        )*
    };
}

/// Accessor contract of a decoded metadata image.
///
/// Implementations must be immutable after construction; the facade calls them from many
/// threads without locking. All row ids are 1-based.
pub trait RawMetadata: Send + Sync {
    /// Number of rows in `table`. Tables an implementation does not model have no rows.
    fn row_count(&self, table: TableId) -> u32;

    /// The row `token` refers to.
    ///
    /// # Errors
    /// Returns an error if the table is not modelled or the row does not exist.
    fn row(&self, token: Token) -> Result<TableRow>;

    /// Tokens of the `CustomAttribute` rows whose parent is `parent`, in table order.
    ///
    /// # Errors
    /// Returns an error if the attribute index cannot be read.
    fn custom_attributes(&self, parent: Token) -> Result<Vec<Token>>;

    /// Dereference a `#Strings` heap index.
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds or the string is not valid UTF-8.
    fn string(&self, index: u32) -> Result<&str>;

    /// Dereference a `#Blob` heap index.
    ///
    /// # Errors
    /// Returns an error if the index or the entry's length is out of bounds.
    fn blob(&self, index: u32) -> Result<&[u8]>;

    /// Dereference a 1-based `#GUID` heap index.
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds.
    fn guid(&self, index: u32) -> Result<uguid::Guid>;

    typed_rows! {
        /// The `Module` row (rid is always 1).
        module_row => Module, ModuleRaw;
        /// A `TypeRef` row.
        type_ref => TypeRef, TypeRefRaw;
        /// A `TypeDef` row.
        type_def => TypeDef, TypeDefRaw;
        /// A `Field` row.
        field => Field, FieldRaw;
        /// A `MethodDef` row.
        method_def => MethodDef, MethodDefRaw;
        /// A `Param` row.
        param => Param, ParamRaw;
        /// A `MemberRef` row.
        member_ref => MemberRef, MemberRefRaw;
        /// A `Constant` row.
        constant => Constant, ConstantRaw;
        /// A `CustomAttribute` row.
        custom_attribute => CustomAttribute, CustomAttributeRaw;
        /// A `FieldMarshal` row.
        field_marshal => FieldMarshal, FieldMarshalRaw;
        /// A `ClassLayout` row.
        class_layout => ClassLayout, ClassLayoutRaw;
        /// A `FieldLayout` row.
        field_layout => FieldLayout, FieldLayoutRaw;
        /// An `EventMap` row.
        event_map => EventMap, EventMapRaw;
        /// An `Event` row.
        event => Event, EventRaw;
        /// A `PropertyMap` row.
        property_map => PropertyMap, PropertyMapRaw;
        /// A `Property` row.
        property => Property, PropertyRaw;
        /// A `ModuleRef` row.
        module_ref => ModuleRef, ModuleRefRaw;
        /// A `TypeSpec` row.
        type_spec => TypeSpec, TypeSpecRaw;
        /// An `ImplMap` row.
        impl_map => ImplMap, ImplMapRaw;
        /// The `Assembly` row (rid is always 1).
        assembly => Assembly, AssemblyRaw;
        /// An `AssemblyRef` row.
        assembly_ref => AssemblyRef, AssemblyRefRaw;
        /// A `File` row.
        file => File, FileRaw;
        /// An `ExportedType` row.
        exported_type => ExportedType, ExportedTypeRaw;
        /// A `ManifestResource` row.
        manifest_resource => ManifestResource, ManifestResourceRaw;
        /// A `NestedClass` row.
        nested_class => NestedClass, NestedClassRaw;
        /// A `GenericParam` row.
        generic_param => GenericParam, GenericParamRaw;
        /// A `MethodSpec` row.
        method_spec => MethodSpec, MethodSpecRaw;
        /// A `GenericParamConstraint` row.
        generic_param_constraint => GenericParamConstraint, GenericParamConstraintRaw;
    }

    /// Row ids of the fields owned by a type.
    ///
    /// # Errors
    /// Returns an error if the type or its successor cannot be read, or the run is out of order.
    fn fields_of_type(&self, type_rid: u32) -> Result<Range<u32>> {
        let start = self.type_def(type_rid)?.field_list;
        let end = if type_rid < self.row_count(TableId::TypeDef) {
            self.type_def(type_rid + 1)?.field_list
        } else {
            self.row_count(TableId::Field) + 1
        };

        member_run(start, end, self.row_count(TableId::Field))
    }

    /// Row ids of the methods owned by a type.
    ///
    /// # Errors
    /// Returns an error if the type or its successor cannot be read, or the run is out of order.
    fn methods_of_type(&self, type_rid: u32) -> Result<Range<u32>> {
        let start = self.type_def(type_rid)?.method_list;
        let end = if type_rid < self.row_count(TableId::TypeDef) {
            self.type_def(type_rid + 1)?.method_list
        } else {
            self.row_count(TableId::MethodDef) + 1
        };

        member_run(start, end, self.row_count(TableId::MethodDef))
    }

    /// Row ids of the parameters owned by a method.
    ///
    /// # Errors
    /// Returns an error if the method or its successor cannot be read, or the run is out of order.
    fn params_of_method(&self, method_rid: u32) -> Result<Range<u32>> {
        let start = self.method_def(method_rid)?.param_list;
        let end = if method_rid < self.row_count(TableId::MethodDef) {
            self.method_def(method_rid + 1)?.param_list
        } else {
            self.row_count(TableId::Param) + 1
        };

        member_run(start, end, self.row_count(TableId::Param))
    }

    /// The `TypeDef` owning a method.
    ///
    /// # Errors
    /// Returns an error if no type's method run contains `method_rid`.
    fn declaring_type_of_method(&self, method_rid: u32) -> Result<u32> {
        if method_rid == 0 || method_rid > self.row_count(TableId::MethodDef) {
            return Err(malformed_error!("Method row out of range - {}", method_rid));
        }

        owner_of(self.row_count(TableId::TypeDef), method_rid, |rid| {
            Ok(self.type_def(rid)?.method_list)
        })
    }

    /// The `TypeDef` owning a field.
    ///
    /// # Errors
    /// Returns an error if no type's field run contains `field_rid`.
    fn declaring_type_of_field(&self, field_rid: u32) -> Result<u32> {
        if field_rid == 0 || field_rid > self.row_count(TableId::Field) {
            return Err(malformed_error!("Field row out of range - {}", field_rid));
        }

        owner_of(self.row_count(TableId::TypeDef), field_rid, |rid| {
            Ok(self.type_def(rid)?.field_list)
        })
    }

    /// The `TypeDef` enclosing a nested type, or `None` for a top-level type.
    ///
    /// # Errors
    /// Returns an error if the `NestedClass` table cannot be read.
    fn enclosing_type(&self, type_rid: u32) -> Result<Option<u32>> {
        for rid in 1..=self.row_count(TableId::NestedClass) {
            let row = self.nested_class(rid)?;
            if row.nested_class == type_rid {
                return Ok(Some(row.enclosing_class));
            }
        }

        Ok(None)
    }

    /// The `TypeDef`s directly nested in a type, in table order.
    ///
    /// # Errors
    /// Returns an error if the `NestedClass` table cannot be read.
    fn nested_types(&self, type_rid: u32) -> Result<Vec<u32>> {
        let mut nested = Vec::new();
        for rid in 1..=self.row_count(TableId::NestedClass) {
            let row = self.nested_class(rid)?;
            if row.enclosing_class == type_rid {
                nested.push(row.nested_class);
            }
        }

        Ok(nested)
    }

    /// Row ids of the properties owned by a type; empty if the type has no `PropertyMap` row.
    ///
    /// # Errors
    /// Returns an error if the `PropertyMap` table cannot be read.
    fn properties_of_type(&self, type_rid: u32) -> Result<Range<u32>> {
        let count = self.row_count(TableId::PropertyMap);
        for rid in 1..=count {
            let row = self.property_map(rid)?;
            if row.parent == type_rid {
                let end = if rid < count {
                    self.property_map(rid + 1)?.property_list
                } else {
                    self.row_count(TableId::Property) + 1
                };
                return member_run(row.property_list, end, self.row_count(TableId::Property));
            }
        }

        Ok(0..0)
    }

    /// Row ids of the events owned by a type; empty if the type has no `EventMap` row.
    ///
    /// # Errors
    /// Returns an error if the `EventMap` table cannot be read.
    fn events_of_type(&self, type_rid: u32) -> Result<Range<u32>> {
        let count = self.row_count(TableId::EventMap);
        for rid in 1..=count {
            let row = self.event_map(rid)?;
            if row.parent == type_rid {
                let end = if rid < count {
                    self.event_map(rid + 1)?.event_list
                } else {
                    self.row_count(TableId::Event) + 1
                };
                return member_run(row.event_list, end, self.row_count(TableId::Event));
            }
        }

        Ok(0..0)
    }

    /// The `Constant` row of a field, parameter or property.
    ///
    /// # Errors
    /// Returns an error if the `Constant` table cannot be read.
    fn constant_for(&self, parent: Token) -> Result<Option<ConstantRaw>> {
        for rid in 1..=self.row_count(TableId::Constant) {
            let row = self.constant(rid)?;
            if row.parent == parent {
                return Ok(Some(row));
            }
        }

        Ok(None)
    }

    /// The `ClassLayout` row of a type.
    ///
    /// # Errors
    /// Returns an error if the `ClassLayout` table cannot be read.
    fn class_layout_for(&self, type_rid: u32) -> Result<Option<ClassLayoutRaw>> {
        for rid in 1..=self.row_count(TableId::ClassLayout) {
            let row = self.class_layout(rid)?;
            if row.parent == type_rid {
                return Ok(Some(row));
            }
        }

        Ok(None)
    }

    /// The `FieldLayout` row of a field.
    ///
    /// # Errors
    /// Returns an error if the `FieldLayout` table cannot be read.
    fn field_layout_for(&self, field_rid: u32) -> Result<Option<FieldLayoutRaw>> {
        for rid in 1..=self.row_count(TableId::FieldLayout) {
            let row = self.field_layout(rid)?;
            if row.field == field_rid {
                return Ok(Some(row));
            }
        }

        Ok(None)
    }

    /// The `FieldMarshal` row of a field or parameter.
    ///
    /// # Errors
    /// Returns an error if the `FieldMarshal` table cannot be read.
    fn field_marshal_for(&self, parent: Token) -> Result<Option<FieldMarshalRaw>> {
        for rid in 1..=self.row_count(TableId::FieldMarshal) {
            let row = self.field_marshal(rid)?;
            if row.parent == parent {
                return Ok(Some(row));
            }
        }

        Ok(None)
    }

    /// The `ImplMap` row of a field or method.
    ///
    /// # Errors
    /// Returns an error if the `ImplMap` table cannot be read.
    fn impl_map_for(&self, member: Token) -> Result<Option<ImplMapRaw>> {
        for rid in 1..=self.row_count(TableId::ImplMap) {
            let row = self.impl_map(rid)?;
            if row.member_forwarded == member {
                return Ok(Some(row));
            }
        }

        Ok(None)
    }

    /// Row ids of the generic parameters of a type or method, ordered by parameter number.
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` table cannot be read.
    fn generic_params_of(&self, owner: Token) -> Result<Vec<u32>> {
        let mut params = Vec::new();
        for rid in 1..=self.row_count(TableId::GenericParam) {
            let row = self.generic_param(rid)?;
            if row.owner == owner {
                params.push((row.number, rid));
            }
        }

        params.sort_unstable();
        Ok(params.into_iter().map(|(_, rid)| rid).collect())
    }

    /// Row ids of the constraints of a generic parameter.
    ///
    /// # Errors
    /// Returns an error if the `GenericParamConstraint` table cannot be read.
    fn constraints_of(&self, generic_param_rid: u32) -> Result<Vec<u32>> {
        let mut constraints = Vec::new();
        for rid in 1..=self.row_count(TableId::GenericParamConstraint) {
            if self.generic_param_constraint(rid)?.owner == generic_param_rid {
                constraints.push(rid);
            }
        }

        Ok(constraints)
    }
}

/// Validate a member run `start..end` against a table of `count` rows.
///
/// A start of `count + 1` denotes an empty run at the end of the table.
fn member_run(start: u32, end: u32, count: u32) -> Result<Range<u32>> {
    if start == 0 || start > count + 1 || end < start || end > count + 1 {
        return Err(malformed_error!(
            "Invalid member run {}..{} in a table of {} rows",
            start,
            end,
            count
        ));
    }

    Ok(start..end)
}

/// Binary search the owner whose run contains `member`, given the run starts of `owners` rows.
///
/// Run starts are non-decreasing. Owners with empty runs share their start with the next owner,
/// so the owner is the last row whose start is not greater than `member`.
fn owner_of<F>(owners: u32, member: u32, run_start: F) -> Result<u32>
where
    F: Fn(u32) -> Result<u32>,
{
    let mut low = 1u32;
    let mut high = owners;
    let mut found = 0u32;

    while low <= high {
        let mid = low + (high - low) / 2;
        if run_start(mid)? <= member {
            found = mid;
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    if found == 0 {
        return Err(malformed_error!("No owner found for member row {}", member));
    }

    Ok(found)
}
