//! End-to-end import pipeline tests against the in-memory sink

use mapdepot_import::pipeline::Importer;
use mapdepot_import::storage::MemorySink;
use std::io::Write;
use std::time::Duration;

fn write_fixture(xml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(xml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_minimal_export_imports_one_document_per_kind() {
    let file = write_fixture(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <node id="1" user="alice" uid="7" version="1" changeset="3" timestamp="2024-01-15T10:30:00Z" lat="1.0" lon="2.0"/>
  <way id="2" user="alice" uid="7" version="1" changeset="3" timestamp="2024-01-15T10:31:00Z">
    <nd ref="1"/>
  </way>
  <relation id="3" user="alice" uid="7" version="1" changeset="3" timestamp="2024-01-15T10:32:00Z">
    <member type="way" ref="2" role="outer"/>
  </relation>
</osm>
"#,
    );

    let importer = Importer::new(file.path(), MemorySink::new());
    let counts = importer.run().await.unwrap();

    assert_eq!((counts.points, counts.paths, counts.groups), (1, 1, 1));

    let sink = importer.sink();

    let points = sink.documents("points");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].get_i64("_id").unwrap(), 1);
    let location: Vec<f64> = points[0]
        .get_array("location")
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(location, vec![2.0, 1.0]);

    let paths = sink.documents("paths");
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].get_i64("_id").unwrap(), 2);
    let members: Vec<i64> = paths[0]
        .get_array("members")
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    assert_eq!(members, vec![1]);

    let groups = sink.documents("groups");
    assert_eq!(groups.len(), 1);
    let member = groups[0].get_array("members").unwrap()[0]
        .as_document()
        .unwrap();
    assert_eq!(member.get_str("kind").unwrap(), "way");
    assert_eq!(member.get_i64("ref").unwrap(), 2);
    assert_eq!(member.get_str("role").unwrap(), "outer");
}

#[tokio::test]
async fn test_destination_documents_carry_provenance_and_tags() {
    let file = write_fixture(
        r#"<osm>
  <node id="42" user="alice" uid="7" version="2" changeset="3" timestamp="2024-01-15T10:30:00Z" lat="51.5" lon="-0.12">
    <tag k="amenity" v="cafe"/>
    <tag k="name" v="Corner"/>
  </node>
</osm>
"#,
    );

    let importer = Importer::new(file.path(), MemorySink::new());
    importer.run().await.unwrap();

    let doc = &importer.sink().documents("points")[0];

    assert_eq!(doc.get_i64("_id").unwrap(), 42);
    assert_eq!(doc.get_str("uname").unwrap(), "alice");
    assert_eq!(doc.get_i64("uid").unwrap(), 7);
    assert_eq!(doc.get_i64("version").unwrap(), 2);
    assert_eq!(doc.get_i64("changeset").unwrap(), 3);
    assert!(doc.get_datetime("timestamp").is_ok());

    let tags = doc.get_array("tags").unwrap();
    assert_eq!(tags.len(), 2);
    let first = tags[0].as_array().unwrap();
    assert_eq!(first[0].as_str().unwrap(), "amenity");
    assert_eq!(first[1].as_str().unwrap(), "cafe");

    let tag_keys: Vec<&str> = doc
        .get_array("tagKeys")
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(tag_keys, vec!["amenity", "name"]);
}

#[tokio::test]
async fn test_every_record_lands_exactly_once_in_source_order() {
    let mut xml = String::from("<osm>\n");
    for id in 0..500 {
        xml.push_str(&format!(
            r#"  <node id="{id}" uid="1" timestamp="2024-01-15T10:30:00Z" lat="0.0" lon="0.0"/>"#,
        ));
        xml.push('\n');
    }
    xml.push_str("</osm>\n");
    let file = write_fixture(&xml);

    // a tiny interval forces many flushes over the 500 records
    let importer = Importer::new(file.path(), MemorySink::new())
        .with_flush_interval(Duration::from_micros(1));
    let counts = importer.run().await.unwrap();

    assert_eq!(counts.points, 500);

    let ids: Vec<i64> = importer
        .sink()
        .documents("points")
        .iter()
        .map(|doc| doc.get_i64("_id").unwrap())
        .collect();
    assert_eq!(ids, (0..500).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_collections_are_reset_and_indexed_before_import() {
    let file = write_fixture(
        r#"<osm><node id="1" uid="1" timestamp="2024-01-15T10:30:00Z" lat="0.0" lon="0.0"/></osm>"#,
    );

    let importer = Importer::new(file.path(), MemorySink::new());
    importer.run().await.unwrap();

    let sink = importer.sink();
    assert_eq!(sink.indexes("points"), vec!["tagKeys_1", "location_2dsphere"]);
    assert_eq!(sink.indexes("paths"), vec!["tagKeys_1"]);
    assert_eq!(sink.indexes("groups"), vec!["tagKeys_1"]);
    assert_eq!(sink.prepare_count("points"), 1);
}
