//! Integration tests for namespace grouping, name indexes and type forwarders.

use cilimport::prelude::*;

fn module(builder: MetadataImageBuilder) -> PeModule {
    PeModule::new(Box::new(builder.build()), ModuleOptions::default())
}

fn namespaces(groups: &[NamespaceGroup]) -> Vec<&str> {
    groups.iter().map(|group| group.namespace.as_str()).collect()
}

#[test]
fn test_case_variants_are_adjacent() -> Result<()> {
    let mut builder = MetadataImageBuilder::new();
    builder.add_module("Casing.dll")?;
    let lower = builder.add_type_def(TypeAttributes::PUBLIC, "a", "Lower", Token::default())?;
    let global = builder.add_type_def(TypeAttributes::PUBLIC, "", "Global", Token::default())?;
    let upper = builder.add_type_def(TypeAttributes::PUBLIC, "A", "Upper", Token::default())?;
    let other = builder.add_type_def(TypeAttributes::PUBLIC, "B", "Other", Token::default())?;
    let module = module(builder);

    let groups = module.group_types_by_namespace_or_throw(NameComparer::OrdinalIgnoreCase)?;
    assert_eq!(namespaces(&groups), ["", "a", "A", "B"]);
    assert_eq!(groups[0].types, [global]);
    assert_eq!(groups[1].types, [lower]);
    assert_eq!(groups[2].types, [upper]);
    assert_eq!(groups[3].types, [other]);

    let ordinal = module.group_types_by_namespace_or_throw(NameComparer::Ordinal)?;
    assert_eq!(namespaces(&ordinal), ["", "A", "B", "a"]);
    Ok(())
}

#[test]
fn test_nested_types_are_not_grouped() -> Result<()> {
    let mut builder = MetadataImageBuilder::new();
    builder.add_module("Nesting.dll")?;
    let outer = builder.add_type_def(TypeAttributes::PUBLIC, "N", "Outer", Token::default())?;
    let inner = builder.add_type_def(
        TypeAttributes::NESTED_PUBLIC,
        "",
        "Inner",
        Token::default(),
    )?;
    builder.add_nested_class(inner, outer)?;
    let module = module(builder);

    let groups = module.group_types_by_namespace_or_throw(NameComparer::Ordinal)?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].types, [outer]);
    assert_eq!(module.containing_type_or_throw(inner)?, Some(outer));
    Ok(())
}

#[test]
fn test_forwarded_only_namespace_gets_empty_group() -> Result<()> {
    let mut builder = MetadataImageBuilder::new();
    builder.add_module("Facade.dll")?;
    let target = builder.add_assembly_ref("Target", [1, 0, 0, 0], &[], "")?;
    let local = builder.add_type_def(TypeAttributes::PUBLIC, "A", "Local", Token::default())?;
    builder.add_exported_type(TypeAttributes::FORWARDER, "B", "C", target)?;
    builder.add_exported_type(TypeAttributes::FORWARDER, "A", "Moved", target)?;
    let module = module(builder);

    let groups = module.group_types_by_namespace_or_throw(NameComparer::Ordinal)?;
    assert_eq!(namespaces(&groups), ["A", "B"]);
    assert_eq!(groups[0].types, [local]);
    assert!(groups[1].types.is_empty());
    Ok(())
}

#[test]
fn test_forwarder_lookup_case_parity() -> Result<()> {
    let mut builder = MetadataImageBuilder::new();
    builder.add_module("Facade.dll")?;
    let target = builder.add_assembly_ref("Target", [1, 0, 0, 0], &[], "")?;
    let other = builder.add_assembly_ref("Other", [1, 0, 0, 0], &[], "")?;
    builder.add_exported_type(TypeAttributes::FORWARDER, "System.Collections", "Stack", target)?;
    // Not a forwarder, only an exported type
    builder.add_exported_type(TypeAttributes::PUBLIC, "System", "Exported", other)?;
    let module = module(builder);

    assert_eq!(
        module.assembly_for_forwarded_type("System.Collections.Stack", false),
        Some((target, "System.Collections.Stack"))
    );
    assert_eq!(
        module.assembly_for_forwarded_type("system.collections.STACK", true),
        Some((target, "System.Collections.Stack"))
    );
    assert!(module
        .assembly_for_forwarded_type("system.collections.STACK", false)
        .is_none());
    assert!(module.assembly_for_forwarded_type("System.Exported", true).is_none());

    let forwarded: Vec<_> = module.forwarded_types().collect();
    assert_eq!(forwarded, [("System.Collections.Stack", target)]);
    Ok(())
}

#[test]
fn test_first_forwarder_wins() -> Result<()> {
    let mut builder = MetadataImageBuilder::new();
    builder.add_module("Facade.dll")?;
    let first = builder.add_assembly_ref("First", [1, 0, 0, 0], &[], "")?;
    let second = builder.add_assembly_ref("Second", [1, 0, 0, 0], &[], "")?;
    builder.add_exported_type(TypeAttributes::FORWARDER, "N", "T", first)?;
    builder.add_exported_type(TypeAttributes::FORWARDER, "N", "T", second)?;
    let module = module(builder);

    assert_eq!(
        module.assembly_for_forwarded_type("N.T", false),
        Some((first, "N.T"))
    );
    assert_eq!(module.forwarded_types().count(), 1);
    Ok(())
}

#[test]
fn test_name_indexes() -> Result<()> {
    let mut builder = MetadataImageBuilder::new();
    builder.add_module("Names.dll")?;
    builder.add_type_def(TypeAttributes::PUBLIC, "System.Collections.Generic", "List`1", Token::default())?;
    builder.add_type_def(TypeAttributes::PUBLIC, "System", "Object", Token::default())?;
    let module = module(builder);

    let types = module.type_names()?;
    assert!(types.contains("List"));
    assert!(types.contains("Object"));
    assert!(!types.contains("List`1"));
    assert!(types.contains_ignore_case("object"));

    let namespaces = module.namespace_names()?;
    assert!(namespaces.contains("System"));
    assert!(namespaces.contains("Collections"));
    assert!(namespaces.contains("Generic"));
    assert!(!namespaces.contains("System.Collections"));

    assert!(std::ptr::eq(types, module.type_names()?));
    Ok(())
}
