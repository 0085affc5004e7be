use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use driftcodec_metadata::{
    CatalogError, Construction, Describe, DescribeEnum, EnumDescription, FieldDescription,
    FieldKind, Injection, Requiredness, StructDescription, ThriftCatalog, ThriftType, TypeRef,
    DISCRIMINANT_ID,
};

// Self-referencing through a list.
#[derive(Default)]
struct TreeNode {
    children: Vec<TreeNode>,
}

impl Describe for TreeNode {
    fn describe() -> StructDescription {
        StructDescription::structure::<TreeNode>("TreeNode")
            .constructor(Construction::default_of::<TreeNode>())
            .field(
                FieldDescription::new(1, "children", TypeRef::list(TypeRef::record::<TreeNode>()))
                    .setter(|n: &mut TreeNode, v: Vec<TreeNode>| n.children = v),
            )
    }
}

driftcodec_metadata::object_value!(TreeNode);

#[derive(Default)]
struct Alpha;
#[derive(Default)]
struct Beta;

impl Describe for Alpha {
    fn describe() -> StructDescription {
        StructDescription::structure::<Alpha>("Alpha")
            .constructor(Construction::default_of::<Alpha>())
            .field(FieldDescription::new(1, "beta", TypeRef::record::<Beta>()).getter(|_: &Alpha| None::<i32>))
    }
}

impl Describe for Beta {
    fn describe() -> StructDescription {
        StructDescription::structure::<Beta>("Beta")
            .constructor(Construction::default_of::<Beta>())
            .field(FieldDescription::new(1, "alpha", TypeRef::record::<Alpha>()).getter(|_: &Beta| None::<i32>))
    }
}

#[test]
fn self_reference_is_a_cycle() {
    let catalog = ThriftCatalog::new();
    let err = catalog.struct_metadata::<TreeNode>().unwrap_err();
    assert_eq!(
        err.root_cause(),
        &CatalogError::Cycle {
            chain: vec!["TreeNode".into(), "TreeNode".into()]
        }
    );
}

#[test]
fn mutual_reference_names_the_chain() {
    let catalog = ThriftCatalog::new();
    let err = catalog.struct_metadata::<Alpha>().unwrap_err();
    assert_eq!(
        err.root_cause(),
        &CatalogError::Cycle {
            chain: vec!["Alpha".into(), "Beta".into(), "Alpha".into()]
        }
    );
    assert!(err.to_string().contains("Alpha -> Beta -> Alpha"));

    // Beta failed as part of Alpha's derivation and stays failed.
    assert!(catalog.struct_metadata::<Beta>().is_err());
}

static FLAKY_DESCRIBES: AtomicUsize = AtomicUsize::new(0);

struct Flaky;

impl Describe for Flaky {
    fn describe() -> StructDescription {
        FLAKY_DESCRIBES.fetch_add(1, Ordering::SeqCst);
        StructDescription::structure::<Flaky>("Flaky")
            .field(FieldDescription::new(1, "a", TypeRef::I32).getter(|_: &Flaky| Some(1)))
            .field(FieldDescription::new(1, "b", TypeRef::I32).getter(|_: &Flaky| Some(2)))
    }
}

#[test]
fn failures_are_cached() {
    let catalog = ThriftCatalog::new();
    let first = catalog.struct_metadata::<Flaky>().unwrap_err();
    let second = catalog.struct_metadata::<Flaky>().unwrap_err();
    assert_eq!(first, second);
    assert_eq!(
        first,
        CatalogError::DuplicateFieldId {
            struct_name: "Flaky".into(),
            id: 1
        }
    );
    assert_eq!(FLAKY_DESCRIBES.load(Ordering::SeqCst), 1);
}

macro_rules! described {
    ($name:ident, $body:expr) => {
        struct $name;
        impl Describe for $name {
            fn describe() -> StructDescription {
                $body
            }
        }
    };
}

described!(
    DuplicateName,
    StructDescription::structure::<DuplicateName>("DuplicateName")
        .field(FieldDescription::new(1, "a", TypeRef::I32).getter(|_: &DuplicateName| Some(1)))
        .field(FieldDescription::new(2, "a", TypeRef::I32).getter(|_: &DuplicateName| Some(2)))
);

described!(
    NegativeId,
    StructDescription::structure::<NegativeId>("NegativeId")
        .field(FieldDescription::new(-1, "a", TypeRef::I32).getter(|_: &NegativeId| Some(1)))
);

described!(
    NoAccessor,
    StructDescription::structure::<NoAccessor>("NoAccessor")
        .field(FieldDescription::new(3, "lonely", TypeRef::String))
);

described!(
    UnknownParameter,
    StructDescription::structure::<UnknownParameter>("UnknownParameter")
        .constructor(Construction::new(&[1, 9], |_| Ok(UnknownParameter)))
        .field(FieldDescription::new(1, "a", TypeRef::I32).getter(|_: &UnknownParameter| Some(1)))
);

described!(
    NoConstructor,
    StructDescription::structure::<NoConstructor>("NoConstructor").field(
        FieldDescription::new(1, "a", TypeRef::I32).setter(|_: &mut NoConstructor, _: i32| {})
    )
);

described!(
    WriteOnly,
    StructDescription::structure::<WriteOnly>("WriteOnly")
        .field(FieldDescription::new(1, "a", TypeRef::I32).getter(|_: &WriteOnly| Some(1)))
);

#[test]
fn invalid_descriptions_are_configuration_errors() {
    let catalog = ThriftCatalog::new();

    assert!(matches!(
        catalog.struct_metadata::<DuplicateName>(),
        Err(CatalogError::DuplicateFieldName { .. })
    ));
    assert!(matches!(
        catalog.struct_metadata::<NegativeId>(),
        Err(CatalogError::NegativeFieldId { id: -1, .. })
    ));
    assert!(matches!(
        catalog.struct_metadata::<NoAccessor>(),
        Err(CatalogError::FieldWithoutAccessor { id: 3, .. })
    ));
    assert!(matches!(
        catalog.struct_metadata::<UnknownParameter>(),
        Err(CatalogError::UnknownParameterField { id: 9, .. })
    ));
    assert!(matches!(
        catalog.struct_metadata::<NoConstructor>(),
        Err(CatalogError::MissingConstructor { .. })
    ));

    // Nothing to inject, so nothing to construct.
    assert!(catalog.struct_metadata::<WriteOnly>().is_ok());
}

// Copied from another type's description without updating the type.
described!(
    Misnamed,
    StructDescription::structure::<WriteOnly>("Misnamed")
        .field(FieldDescription::new(1, "a", TypeRef::I32).getter(|_: &WriteOnly| Some(1)))
);

struct Grade;

impl DescribeEnum for Grade {
    fn describe_enum() -> EnumDescription {
        EnumDescription::new::<Priority>("Grade").constant("PASS")
    }
}

#[test]
fn description_must_name_the_described_type() {
    let catalog = ThriftCatalog::new();

    let err = catalog.struct_metadata::<Misnamed>().unwrap_err();
    assert!(matches!(
        &err,
        CatalogError::DescribedTypeMismatch { description, type_name, described }
            if description == "Misnamed"
                && type_name.ends_with("Misnamed")
                && described.ends_with("WriteOnly")
    ));
    assert_eq!(catalog.struct_metadata::<Misnamed>().unwrap_err(), err);

    assert!(matches!(
        catalog.enum_metadata::<Grade>(),
        Err(CatalogError::DescribedTypeMismatch { .. })
    ));
}

#[derive(Debug, PartialEq)]
enum Shape {
    Circle(f64),
    Square(i32),
}

impl Describe for Shape {
    fn describe() -> StructDescription {
        StructDescription::union::<Shape>("Shape")
            .discriminant(|s: &Shape| {
                Some(match s {
                    Shape::Circle(_) => 1,
                    Shape::Square(_) => 2,
                })
            })
            .field(
                FieldDescription::new(1, "circle", TypeRef::Double)
                    .union_constructor(Shape::Circle)
                    .getter(|s: &Shape| match s {
                        Shape::Circle(r) => Some(*r),
                        _ => None,
                    }),
            )
            .field(
                FieldDescription::new(2, "square", TypeRef::I32)
                    .union_constructor(Shape::Square)
                    .getter(|s: &Shape| match s {
                        Shape::Square(side) => Some(*side),
                        _ => None,
                    }),
            )
    }
}

described!(
    NoDiscriminant,
    StructDescription::union::<NoDiscriminant>("NoDiscriminant").field(
        FieldDescription::new(1, "a", TypeRef::I32).union_constructor(|_: i32| NoDiscriminant)
    )
);

described!(
    Unconstructible,
    StructDescription::union::<Unconstructible>("Unconstructible")
        .discriminant(|_: &Unconstructible| None)
        .field(FieldDescription::new(1, "a", TypeRef::I32).setter(|_: &mut Unconstructible, _: i32| {}))
);

#[test]
fn union_metadata() {
    let catalog = ThriftCatalog::new();
    let metadata = catalog.struct_metadata::<Shape>().unwrap();
    assert!(metadata.is_union());

    let discriminant = metadata.discriminant().unwrap();
    assert_eq!(discriminant.id(), DISCRIMINANT_ID);
    assert_eq!(discriminant.kind(), FieldKind::UnionDiscriminant);
    assert_eq!(discriminant.thrift_type(), &ThriftType::I16);

    let square = Shape::Square(4);
    assert_eq!(metadata.active_field(&square).unwrap(), Some(2));
    assert!(metadata.field(1).unwrap().union_constructor().is_some());

    assert!(matches!(
        catalog.thrift_type_of::<Shape>().unwrap(),
        ThriftType::Union(_)
    ));
}

#[test]
fn invalid_unions() {
    let catalog = ThriftCatalog::new();
    assert!(matches!(
        catalog.struct_metadata::<NoDiscriminant>(),
        Err(CatalogError::MissingDiscriminant { .. })
    ));
    assert!(matches!(
        catalog.struct_metadata::<Unconstructible>(),
        Err(CatalogError::UnconstructibleUnionField { .. })
    ));
}

#[derive(Default)]
struct Account {
    owner: String,
    balance: i64,
    currency: String,
}

impl Describe for Account {
    fn describe() -> StructDescription {
        StructDescription::structure::<Account>("Account")
            .doc("A ledger account.")
            .constructor(Construction::default_of::<Account>())
            .method("set_balance", &[2, 3], |a: &mut Account, args| {
                a.balance = args.take(0)?;
                a.currency = args.take(1)?;
                Ok(())
            })
            .field(
                FieldDescription::new(1, "owner", TypeRef::String)
                    .required()
                    .doc("Account holder.")
                    .method_setter("set_owner", |a: &mut Account, v: String| {
                        a.owner = v;
                        Ok(())
                    })
                    .method_getter("owner", |a: &Account| Ok(Some(a.owner.clone()))),
            )
            .field(
                FieldDescription::new(2, "balance", TypeRef::I64)
                    .optional()
                    .getter(|a: &Account| Some(a.balance)),
            )
            .field(
                FieldDescription::new(3, "currency", TypeRef::String)
                    .getter(|a: &Account| Some(a.currency.clone())),
            )
    }
}

#[test]
fn method_injections_and_documentation() {
    let catalog = ThriftCatalog::new();
    let metadata = catalog.struct_metadata::<Account>().unwrap();

    assert_eq!(metadata.documentation(), ["A ledger account."]);
    assert_eq!(metadata.methods().len(), 2);
    assert_eq!(metadata.methods()[0].name(), "set_balance");
    assert_eq!(metadata.methods()[1].name(), "set_owner");

    let owner = metadata.field(1).unwrap();
    assert_eq!(owner.requiredness(), Requiredness::Required);
    assert_eq!(owner.documentation(), ["Account holder."]);
    assert!(matches!(
        owner.primary_injection(),
        Some(Injection::Method { method: 1, index: 0 })
    ));

    let currency = metadata.field(3).unwrap();
    assert!(matches!(
        currency.primary_injection(),
        Some(Injection::Method { method: 0, index: 1 })
    ));
    assert_eq!(metadata.field(2).unwrap().requiredness(), Requiredness::Optional);
    assert_eq!(currency.requiredness(), Requiredness::None);
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Priority {
    #[default]
    Low,
    High,
}

impl DescribeEnum for Priority {
    fn describe_enum() -> EnumDescription {
        EnumDescription::new::<Priority>("Priority")
            .constant_value("LOW", 10)
            .constant_value("HIGH", 20)
    }
}

driftcodec_metadata::enum_value!(Priority { Priority::Low, Priority::High });

#[test]
fn enum_metadata_maps_explicit_values() {
    use driftcodec_metadata::{FromValue, IntoValue, Value};

    let catalog = ThriftCatalog::new();
    let metadata = catalog.enum_metadata::<Priority>().unwrap();
    assert_eq!(metadata.wire_value(1), Some(20));
    assert_eq!(metadata.index_of(10), Some(0));
    assert!(Arc::ptr_eq(
        &metadata,
        &catalog.enum_metadata::<Priority>().unwrap()
    ));

    assert!(matches!(Priority::High.into_value(), Value::Enum(1)));
    assert_eq!(Priority::from_value(Value::Enum(0)).unwrap(), Priority::Low);
    assert!(Priority::from_value(Value::Enum(7)).is_err());
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Celsius(f64);

#[test]
fn registered_coercions_resolve_native_fields() {
    let catalog = ThriftCatalog::new();
    assert!(matches!(
        catalog.thrift_type(&TypeRef::native::<Celsius>()),
        Err(CatalogError::MissingCoercion { .. })
    ));

    catalog
        .register_coercion(
            TypeRef::Double,
            |c: &Celsius| Some(c.0),
            |wire: f64| Ok(Celsius(wire)),
        )
        .unwrap();

    let resolved = catalog.thrift_type(&TypeRef::native::<Celsius>()).unwrap();
    let coercion = resolved.coercion().unwrap();
    assert_eq!(coercion.wire_type(), &ThriftType::Double);
    assert_eq!(
        resolved.protocol_type(),
        driftcodec_protocol::FieldType::Double
    );
}

#[derive(Default)]
struct Shared {
    value: i32,
}

impl Describe for Shared {
    fn describe() -> StructDescription {
        StructDescription::structure::<Shared>("Shared")
            .constructor(Construction::default_of::<Shared>())
            .field(
                FieldDescription::new(1, "value", TypeRef::I32)
                    .setter(|s: &mut Shared, v: i32| s.value = v)
                    .getter(|s: &Shared| Some(s.value)),
            )
    }
}

#[test]
fn concurrent_derivation_has_a_single_winner() {
    let catalog = Arc::new(ThriftCatalog::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || catalog.struct_metadata::<Shared>().unwrap())
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    for metadata in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], metadata));
    }
    assert_eq!(catalog.struct_count(), 1);
}
