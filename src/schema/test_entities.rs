//! Entity fixtures shared by the schema and statement unit tests. Each
//! fixture exercises one relationship shape against the golden DDL.

use crate::meta::{Entity, EntityDescriptor};
use crate::value::{Value, ValueType};
use std::sync::LazyLock;

#[derive(Clone, Default)]
pub(crate) struct TestDefaultName {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: i32,
}

impl Entity for TestDefaultName {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<TestDefaultName>("TestDefaultName")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .unique()
                .column(
                    "age",
                    ValueType::Int32,
                    |e| Some(Value::from(e.age)),
                    |e, v| e.age = v.and_then(|v| v.as_i32()).unwrap_or_default(),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Parent {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub child: Option<Box<Child>>,
}

impl Entity for Parent {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Parent>("Parent")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .one_to_one::<Child>(
                    "child",
                    |e| e.child.as_deref_mut(),
                    |e, c| e.child = Some(Box::new(c)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Child {
    pub id: Option<i64>,
    pub parent: Option<Box<Parent>>,
}

impl Entity for Child {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Child>("Child")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .one_to_one::<Parent>(
                    "parent",
                    |e| e.parent.as_deref_mut(),
                    |e, p| e.parent = Some(Box::new(p)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Album {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub tracks: Vec<Track>,
}

impl Entity for Album {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Album>("Album")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "title",
                    ValueType::Text,
                    |e| e.title.clone().map(Value::from),
                    |e, v| e.title = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .one_to_many::<Track>(
                    "tracks",
                    Some("album"),
                    |e| e.tracks.iter_mut().collect(),
                    |e, ts| e.tracks = ts,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub(crate) struct Track {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub album: Option<Box<Album>>,
}

impl Entity for Track {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Track>("Track")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "title",
                    ValueType::Text,
                    |e| e.title.clone().map(Value::from),
                    |e, v| e.title = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .many_to_one::<Album>(
                    "album",
                    Some("tracks"),
                    |e| e.album.as_deref_mut(),
                    |e, a| e.album = Some(Box::new(a)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub(crate) struct FirstEntity {
    pub id: Option<i64>,
    pub seconds: Vec<SecondEntity>,
}

impl Entity for FirstEntity {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<FirstEntity>("FirstEntity")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .many_to_many::<SecondEntity>(
                    "seconds",
                    |e| e.seconds.iter_mut().collect(),
                    |e, xs| e.seconds = xs,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub(crate) struct SecondEntity {
    pub id: Option<i64>,
    pub firsts: Vec<FirstEntity>,
}

impl Entity for SecondEntity {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<SecondEntity>("SecondEntity")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .many_to_many::<FirstEntity>(
                    "firsts",
                    |e| e.firsts.iter_mut().collect(),
                    |e, xs| e.firsts = xs,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

/// Misconfigured on purpose: `mapped_by` names a field the target lacks.
#[derive(Clone, Default)]
pub(crate) struct Playlist {
    pub id: Option<i64>,
    pub entries: Vec<Track>,
}

impl Entity for Playlist {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Playlist>("Playlist")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .one_to_many::<Track>(
                    "entries",
                    Some("playlist"),
                    |e| e.entries.iter_mut().collect(),
                    |e, xs| e.entries = xs,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

/// Carries a column the shipped dialect has no type for.
#[derive(Clone, Default)]
pub(crate) struct Oddity {
    pub id: Option<i64>,
    pub payload: Vec<u8>,
}

impl Entity for Oddity {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Oddity>("Oddity")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column("payload", ValueType::Custom("byte_array"), |_| None, |_, _| {})
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

/// Misconfigured on purpose: no identifier field.
#[derive(Clone, Default)]
pub(crate) struct Orphan {
    pub name: Option<String>,
}

impl Entity for Orphan {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Orphan>("Orphan")
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}
