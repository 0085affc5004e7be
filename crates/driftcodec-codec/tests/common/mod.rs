//! Native types shared by the codec integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use driftcodec_codec::{CodecConfig, CodecManager, CodecStrategy};
use driftcodec_metadata::{
    Builder, Construction, Describe, DescribeEnum, EnumDescription, FieldDescription,
    StructDescription, TypeRef,
};

pub fn manager(strategy: CodecStrategy) -> CodecManager {
    CodecManager::with_config(CodecConfig {
        strategy,
        ..CodecConfig::default()
    })
}

pub const STRATEGIES: [CodecStrategy; 2] = [CodecStrategy::Compiled, CodecStrategy::Reflective];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Widget {
    pub name: String,
    pub count: i32,
}

impl Describe for Widget {
    fn describe() -> StructDescription {
        StructDescription::structure::<Widget>("Widget")
            .constructor(Construction::default_of::<Widget>())
            .field(
                FieldDescription::new(1, "name", TypeRef::String)
                    .setter(|w: &mut Widget, v: String| w.name = v)
                    .getter(|w: &Widget| Some(w.name.clone())),
            )
            .field(
                FieldDescription::new(2, "count", TypeRef::I32)
                    .setter(|w: &mut Widget, v: i32| w.count = v)
                    .getter(|w: &Widget| Some(w.count)),
            )
    }
}

driftcodec_metadata::object_value!(Widget);

/// Writes a payload-less marker field ahead of its count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Marked {
    pub count: i32,
}

impl Describe for Marked {
    fn describe() -> StructDescription {
        StructDescription::structure::<Marked>("Marked")
            .constructor(Construction::default_of::<Marked>())
            .field(FieldDescription::new(1, "marker", TypeRef::Void).getter(|_: &Marked| Some(())))
            .field(
                FieldDescription::new(2, "count", TypeRef::I32)
                    .setter(|m: &mut Marked, v: i32| m.count = v)
                    .getter(|m: &Marked| Some(m.count)),
            )
    }
}

driftcodec_metadata::object_value!(Marked);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Status {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl DescribeEnum for Status {
    fn describe_enum() -> EnumDescription {
        EnumDescription::new::<Status>("Status")
            .constant("PENDING")
            .constant("SHIPPED")
            .constant("DELIVERED")
    }
}

driftcodec_metadata::enum_value!(Status {
    Status::Pending,
    Status::Shipped,
    Status::Delivered,
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    pub sku: String,
    pub quantity: i32,
    pub price: f64,
}

impl Describe for Item {
    fn describe() -> StructDescription {
        StructDescription::structure::<Item>("Item")
            .constructor(Construction::new(&[1, 2], |args| {
                Ok(Item {
                    sku: args.take(0)?,
                    quantity: args.take(1)?,
                    price: 0.0,
                })
            }))
            .field(
                FieldDescription::new(1, "sku", TypeRef::String)
                    .required()
                    .getter(|i: &Item| Some(i.sku.clone())),
            )
            .field(
                FieldDescription::new(2, "quantity", TypeRef::I32)
                    .getter(|i: &Item| Some(i.quantity)),
            )
            .field(
                FieldDescription::new(3, "price", TypeRef::Double)
                    .setter(|i: &mut Item, v: f64| i.price = v)
                    .getter(|i: &Item| Some(i.price)),
            )
    }
}

driftcodec_metadata::object_value!(Item);

/// Exercises every injection kind except builders, plus containers,
/// enums and coerced natives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Order {
    pub id: i64,
    pub status: Status,
    pub items: Vec<Item>,
    pub by_sku: BTreeMap<String, Item>,
    pub tags: BTreeSet<String>,
    pub history: Vec<Status>,
    pub placed_at: Option<SystemTime>,
    pub weight: f32,
    pub carrier: String,
    pub tracking: String,
}

impl Describe for Order {
    fn describe() -> StructDescription {
        StructDescription::structure::<Order>("Order")
            .constructor(Construction::new(&[1], |args| {
                Ok(Order {
                    id: args.take(0)?,
                    ..Order::default()
                })
            }))
            .method("ship", &[9, 10], |o: &mut Order, args| {
                o.carrier = args.take(0)?;
                o.tracking = args.take(1)?;
                Ok(())
            })
            .field(
                FieldDescription::new(1, "id", TypeRef::I64)
                    .required()
                    .getter(|o: &Order| Some(o.id)),
            )
            .field(
                FieldDescription::new(2, "status", TypeRef::of_enum::<Status>())
                    .setter(|o: &mut Order, v: Status| o.status = v)
                    .getter(|o: &Order| Some(o.status)),
            )
            .field(
                FieldDescription::new(3, "items", TypeRef::list(TypeRef::record::<Item>()))
                    .setter(|o: &mut Order, v: Vec<Item>| o.items = v)
                    .getter(|o: &Order| Some(o.items.clone())),
            )
            .field(
                FieldDescription::new(
                    4,
                    "by_sku",
                    TypeRef::map(TypeRef::String, TypeRef::record::<Item>()),
                )
                .setter(|o: &mut Order, v: BTreeMap<String, Item>| o.by_sku = v)
                .getter(|o: &Order| Some(o.by_sku.clone())),
            )
            .field(
                FieldDescription::new(5, "tags", TypeRef::set(TypeRef::String))
                    .setter(|o: &mut Order, v: BTreeSet<String>| o.tags = v)
                    .getter(|o: &Order| Some(o.tags.clone())),
            )
            .field(
                FieldDescription::new(6, "history", TypeRef::list(TypeRef::of_enum::<Status>()))
                    .setter(|o: &mut Order, v: Vec<Status>| o.history = v)
                    .getter(|o: &Order| Some(o.history.clone())),
            )
            .field(
                FieldDescription::new(7, "placed_at", TypeRef::native::<SystemTime>())
                    .setter(|o: &mut Order, v: SystemTime| o.placed_at = Some(v))
                    .getter(|o: &Order| o.placed_at),
            )
            .field(
                FieldDescription::new(8, "weight", TypeRef::native::<f32>())
                    .setter(|o: &mut Order, v: f32| o.weight = v)
                    .getter(|o: &Order| Some(o.weight)),
            )
            .field(
                FieldDescription::new(9, "carrier", TypeRef::String)
                    .getter(|o: &Order| Some(o.carrier.clone())),
            )
            .field(
                FieldDescription::new(10, "tracking", TypeRef::String)
                    .getter(|o: &Order| Some(o.tracking.clone())),
            )
    }
}

driftcodec_metadata::object_value!(Order);

pub fn sample_order() -> Order {
    let bolt = Item {
        sku: "bolt".into(),
        quantity: 40,
        price: 0.25,
    };
    let nut = Item {
        sku: "nut".into(),
        quantity: 40,
        price: 0.1,
    };
    Order {
        id: 90_210,
        status: Status::Shipped,
        items: vec![bolt.clone(), nut.clone()],
        by_sku: BTreeMap::from([("bolt".to_string(), bolt), ("nut".to_string(), nut)]),
        tags: BTreeSet::from(["hardware".to_string(), "bulk".to_string()]),
        history: vec![Status::Pending, Status::Shipped],
        placed_at: Some(SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(1_700_000_000_123)),
        weight: 2.5,
        carrier: "ups".into(),
        tracking: "1Z999".into(),
    }
}

/// Account with a required field delivered through a method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Account {
    pub owner: String,
    pub balance: i64,
}

impl Describe for Account {
    fn describe() -> StructDescription {
        StructDescription::structure::<Account>("Account")
            .constructor(Construction::default_of::<Account>())
            .field(
                FieldDescription::new(1, "owner", TypeRef::String)
                    .required()
                    .method_setter("set_owner", |a: &mut Account, v: String| {
                        a.owner = v;
                        Ok(())
                    })
                    .getter(|a: &Account| Some(a.owner.clone())),
            )
            .field(
                FieldDescription::new(2, "balance", TypeRef::I64)
                    .setter(|a: &mut Account, v: i64| a.balance = v)
                    .getter(|a: &Account| Some(a.balance)),
            )
    }
}

driftcodec_metadata::object_value!(Account);

#[derive(Debug, Default)]
pub struct PointBuilder {
    pub x: i32,
    pub y: i32,
}

/// Immutable type produced through a builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub label: String,
}

impl Describe for Point {
    fn describe() -> StructDescription {
        StructDescription::structure::<Point>("Point")
            .constructor(Construction::default_of::<PointBuilder>())
            .builder(Builder::new(&[3], |b: PointBuilder, args| {
                Ok(Some(Point {
                    x: b.x,
                    y: b.y,
                    label: args.take(0)?,
                }))
            }))
            .field(
                FieldDescription::new(1, "x", TypeRef::I32)
                    .setter(|b: &mut PointBuilder, v: i32| b.x = v)
                    .getter(|p: &Point| Some(p.x)),
            )
            .field(
                FieldDescription::new(2, "y", TypeRef::I32)
                    .setter(|b: &mut PointBuilder, v: i32| b.y = v)
                    .getter(|p: &Point| Some(p.y)),
            )
            .field(
                FieldDescription::new(3, "label", TypeRef::String)
                    .getter(|p: &Point| Some(p.label.clone())),
            )
    }
}

/// Builder that yields nothing.
#[derive(Debug, Default)]
pub struct Vanishing;

impl Describe for Vanishing {
    fn describe() -> StructDescription {
        StructDescription::structure::<Vanishing>("Vanishing")
            .constructor(Construction::default_of::<PointBuilder>())
            .builder(Builder::new(&[], |_: PointBuilder, _| Ok(None::<Vanishing>)))
            .field(
                FieldDescription::new(1, "x", TypeRef::I32)
                    .setter(|b: &mut PointBuilder, v: i32| b.x = v),
            )
    }
}

/// Builder that yields an instance of the wrong type.
#[derive(Debug, Default)]
pub struct Impostor;

impl Describe for Impostor {
    fn describe() -> StructDescription {
        StructDescription::structure::<Impostor>("Impostor")
            .constructor(Construction::default_of::<PointBuilder>())
            .builder(Builder::new(&[], |b: PointBuilder, _| Ok(Some(b))))
            .field(
                FieldDescription::new(1, "x", TypeRef::I32)
                    .setter(|b: &mut PointBuilder, v: i32| b.x = v),
            )
    }
}

/// Union over native enum variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Created(Widget),
    Deleted(i64),
    Renamed(String),
}

impl Describe for Event {
    fn describe() -> StructDescription {
        StructDescription::union::<Event>("Event")
            .discriminant(|e: &Event| {
                Some(match e {
                    Event::Created(_) => 1,
                    Event::Deleted(_) => 2,
                    Event::Renamed(_) => 3,
                })
            })
            .field(
                FieldDescription::new(1, "created", TypeRef::record::<Widget>())
                    .union_constructor(Event::Created)
                    .getter(|e: &Event| match e {
                        Event::Created(w) => Some(w.clone()),
                        _ => None,
                    }),
            )
            .field(
                FieldDescription::new(2, "deleted", TypeRef::I64)
                    .union_constructor(Event::Deleted)
                    .getter(|e: &Event| match e {
                        Event::Deleted(id) => Some(*id),
                        _ => None,
                    }),
            )
            .field(
                FieldDescription::new(3, "renamed", TypeRef::String)
                    .union_constructor(Event::Renamed)
                    .getter(|e: &Event| match e {
                        Event::Renamed(name) => Some(name.clone()),
                        _ => None,
                    }),
            )
    }
}

driftcodec_metadata::object_value!(Event);

/// Struct-shaped union: default constructor, field setters and an explicit
/// discriminant slot. Empty payloads decode to `Choice::default()`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Choice {
    pub active: i16,
    pub text: Option<String>,
    pub number: Option<i64>,
}

impl Describe for Choice {
    fn describe() -> StructDescription {
        StructDescription::union::<Choice>("Choice")
            .constructor(Construction::default_of::<Choice>())
            .discriminant(|c: &Choice| (c.active != 0).then_some(c.active))
            .discriminant_setter(|c: &mut Choice, id: i16| c.active = id)
            .field(
                FieldDescription::new(1, "text", TypeRef::String)
                    .setter(|c: &mut Choice, v: String| c.text = Some(v))
                    .getter(|c: &Choice| c.text.clone()),
            )
            .field(
                FieldDescription::new(2, "number", TypeRef::I64)
                    .setter(|c: &mut Choice, v: i64| c.number = Some(v))
                    .getter(|c: &Choice| c.number),
            )
    }
}
