//! Typed entities built from raw records
//!
//! One entity is constructed per source record, held until its batch is
//! flushed, then discarded. Construction is pure data transformation: a
//! closed set of three build functions dispatched by the record's kind, no
//! runtime type lookup.
//!
//! Serde renames on these types define the destination document shape, so an
//! entity serialized to BSON is exactly what lands in storage.

use chrono::{DateTime, Utc};
use mapdepot_common::{ImportError, Result};
use serde::Serialize;

use crate::stream::{RawChild, RawRecord, RecordKind};

/// Child element names within a record
const TAG_ELEMENT: &str = "tag";
const POINT_REF_ELEMENT: &str = "nd";
const MEMBER_ELEMENT: &str = "member";

/// Attribute set shared by all three record kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCommon {
    /// Identity supplied by the source file, never generated
    #[serde(rename = "_id")]
    pub id: i64,

    /// Display name of the editor, absent in anonymized exports
    #[serde(rename = "uname")]
    pub author: Option<String>,

    /// Numeric editor id, 0 when the attribute is absent
    #[serde(rename = "uid")]
    pub author_id: i64,

    pub version: i64,

    #[serde(rename = "changeset")]
    pub changeset_id: i64,

    /// Last-edited instant; required, unparseable values are fatal for the record
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,

    /// Key/value pairs in document order, duplicates preserved
    pub tags: Vec<(String, String)>,

    /// Key projection of `tags` with duplicates collapsed, kept as a separate
    /// indexed field for key-existence queries
    #[serde(rename = "tagKeys")]
    pub tag_keys: Vec<String>,
}

/// A geolocated point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    #[serde(flatten)]
    pub common: EntityCommon,

    /// Coordinate pair as `[longitude, latitude]`
    pub location: [f64; 2],
}

/// An ordered chain of point references
///
/// Members are references by id; a path never owns the points it lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    #[serde(flatten)]
    pub common: EntityCommon,

    pub members: Vec<i64>,
}

/// A collection of point/path/group references with roles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    #[serde(flatten)]
    pub common: EntityCommon,

    pub members: Vec<GroupMember>,
}

/// One member reference within a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMember {
    pub kind: MemberKind,

    #[serde(rename = "ref")]
    pub reference_id: i64,

    /// Role within the group, empty when the source omits it
    pub role: String,
}

/// The kind of record a group member references
///
/// Serialized with the source file's vocabulary so destination documents
/// carry the same member-kind strings as the export they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberKind {
    #[serde(rename = "node")]
    Point,
    #[serde(rename = "way")]
    Path,
    #[serde(rename = "relation")]
    Group,
}

impl MemberKind {
    fn from_source(value: &str) -> Option<Self> {
        match value {
            "node" => Some(MemberKind::Point),
            "way" => Some(MemberKind::Path),
            "relation" => Some(MemberKind::Group),
            _ => None,
        }
    }
}

/// A typed record of any kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Point(Point),
    Path(Path),
    Group(Group),
}

impl Entity {
    /// Build a fully populated entity of the matching variant from a raw record
    ///
    /// Fails with [`ImportError::MalformedRecord`] when `id` or `timestamp`
    /// cannot be parsed; other missing attributes take their documented
    /// defaults.
    pub fn build_from(record: &RawRecord) -> Result<Self> {
        match record.kind {
            RecordKind::Point => build_point(record).map(Entity::Point),
            RecordKind::Path => build_path(record).map(Entity::Path),
            RecordKind::Group => build_group(record).map(Entity::Group),
        }
    }

    /// The record kind this entity was built from
    pub fn kind(&self) -> RecordKind {
        match self {
            Entity::Point(_) => RecordKind::Point,
            Entity::Path(_) => RecordKind::Path,
            Entity::Group(_) => RecordKind::Group,
        }
    }

    /// The source-supplied identity
    pub fn id(&self) -> i64 {
        match self {
            Entity::Point(p) => p.common.id,
            Entity::Path(p) => p.common.id,
            Entity::Group(g) => g.common.id,
        }
    }
}

fn build_point(record: &RawRecord) -> Result<Point> {
    let common = parse_common(record)?;
    let longitude = required_f64(record, "lon")?;
    let latitude = required_f64(record, "lat")?;

    Ok(Point {
        common,
        location: [longitude, latitude],
    })
}

fn build_path(record: &RawRecord) -> Result<Path> {
    let common = parse_common(record)?;
    let mut members = Vec::new();

    for child in children_named(record, POINT_REF_ELEMENT) {
        let reference = child.attr("ref").ok_or_else(|| {
            ImportError::malformed(record.kind.element_name(), "reference child missing ref")
        })?;
        let id: i64 = reference.parse().map_err(|_| {
            ImportError::malformed(
                record.kind.element_name(),
                format!("unparseable member reference '{reference}'"),
            )
        })?;
        members.push(id);
    }

    Ok(Path { common, members })
}

fn build_group(record: &RawRecord) -> Result<Group> {
    let common = parse_common(record)?;
    let mut members = Vec::new();

    for child in children_named(record, MEMBER_ELEMENT) {
        members.push(parse_member(record, child)?);
    }

    Ok(Group { common, members })
}

fn parse_member(record: &RawRecord, child: &RawChild) -> Result<GroupMember> {
    let kind_name = record.kind.element_name();

    let member_type = child
        .attr("type")
        .ok_or_else(|| ImportError::malformed(kind_name, "member child missing type"))?;
    let kind = MemberKind::from_source(member_type).ok_or_else(|| {
        ImportError::malformed(kind_name, format!("unknown member type '{member_type}'"))
    })?;

    let reference = child
        .attr("ref")
        .ok_or_else(|| ImportError::malformed(kind_name, "member child missing ref"))?;
    let reference_id: i64 = reference.parse().map_err(|_| {
        ImportError::malformed(kind_name, format!("unparseable member reference '{reference}'"))
    })?;

    let role = child.attr("role").unwrap_or_default().to_string();

    Ok(GroupMember {
        kind,
        reference_id,
        role,
    })
}

/// Parse the attribute set shared by all kinds
fn parse_common(record: &RawRecord) -> Result<EntityCommon> {
    let kind_name = record.kind.element_name();

    let id_value = record
        .attr("id")
        .ok_or_else(|| ImportError::malformed(kind_name, "missing id attribute"))?;
    let id: i64 = id_value.parse().map_err(|_| {
        ImportError::malformed(kind_name, format!("unparseable id '{id_value}'"))
    })?;

    let timestamp_value = record
        .attr("timestamp")
        .ok_or_else(|| ImportError::malformed(kind_name, "missing timestamp attribute"))?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_value)
        .map_err(|e| {
            ImportError::malformed(
                kind_name,
                format!("unparseable timestamp '{timestamp_value}': {e}"),
            )
        })?
        .with_timezone(&Utc);

    let author = record.attr("user").map(str::to_owned);

    // Source data quirk, preserved as-is: changeset/version defaulting is
    // keyed off the presence of the uid attribute, not off their own
    // attributes. When uid is present but either attribute is absent, the
    // value defaults to 0.
    let author_attr = record.attr("uid");
    let author_id = author_attr.and_then(|v| v.parse().ok()).unwrap_or(0);
    let (version, changeset_id) = if author_attr.is_some() {
        (attr_i64_or_zero(record, "version"), attr_i64_or_zero(record, "changeset"))
    } else {
        (0, 0)
    };

    let mut tags = Vec::new();
    let mut tag_keys: Vec<String> = Vec::new();
    for child in children_named(record, TAG_ELEMENT) {
        let key = child.attr("k").unwrap_or_default().to_string();
        let value = child.attr("v").unwrap_or_default().to_string();
        if !tag_keys.contains(&key) {
            tag_keys.push(key.clone());
        }
        tags.push((key, value));
    }

    Ok(EntityCommon {
        id,
        author,
        author_id,
        version,
        changeset_id,
        timestamp,
        tags,
        tag_keys,
    })
}

fn children_named<'a>(
    record: &'a RawRecord,
    name: &'a str,
) -> impl Iterator<Item = &'a RawChild> {
    record.children.iter().filter(move |child| child.name == name)
}

fn attr_i64_or_zero(record: &RawRecord, name: &str) -> i64 {
    record.attr(name).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn required_f64(record: &RawRecord, name: &str) -> Result<f64> {
    let value = record.attr(name).ok_or_else(|| {
        ImportError::malformed(
            record.kind.element_name(),
            format!("missing {name} attribute"),
        )
    })?;
    value.parse().map_err(|_| {
        ImportError::malformed(
            record.kind.element_name(),
            format!("unparseable {name} '{value}'"),
        )
    })
}
