//! Metadata extraction through an open package.

mod common;

use spindle::epub::{AttrMatcher, MetadataEngine, builtin_templates};
use spindle::{Error, FieldFlags, FieldTemplate, FieldValue, OpenOptions, Package, Value};

use common::*;

fn package_with_metadata(metadata: &str) -> Package {
    let data = book_zip_with(
        "OEBPS/book.opf",
        &opf(
            metadata,
            r#"<item id="cover" href="images/cover.jpg" media-type="image/jpeg"/>
               <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>"#,
            r#"<itemref idref="ch1"/>"#,
            "",
        ),
    );
    Package::from_bytes(data).unwrap()
}

#[test]
fn test_builtin_fields() {
    let package = Package::from_bytes(book_zip()).unwrap();

    let text = |name: &str| {
        package
            .metadata(name)
            .unwrap()
            .and_then(|v| v.first().and_then(Value::as_text).map(String::from))
    };
    assert_eq!(text("title").as_deref(), Some("Agnes Grey"));
    assert_eq!(text("author").as_deref(), Some("Anne Brontë"));
    assert_eq!(text("language").as_deref(), Some("en"));
    assert_eq!(text("date-of-publication").as_deref(), Some("1847-12-01"));
    assert_eq!(text("date-of-modification"), None);

    let identifier = package.metadata("identifier").unwrap().unwrap();
    assert_eq!(
        identifier,
        FieldValue::One(Value::Tuple(vec![
            Value::Text("urn:uuid:0f1c2a4e".into()),
            Value::Text("UUID".into()),
        ]))
    );

    let report = package.extract_metadata();
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let names: Vec<_> = report.values.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["title", "author", "identifier", "language", "date", "date-of-publication", "cover"]
    );
}

#[test]
fn test_missing_required_field_does_not_block_others() {
    let package = package_with_metadata(
        r#"<dc:title>Half a Book</dc:title>
           <dc:creator opf:role="aut">Someone</dc:creator>
           <dc:identifier>id-1</dc:identifier>
           <meta name="cover" content="cover"/>"#,
    );

    assert!(matches!(
        package.metadata("language"),
        Err(Error::MissingRequiredField(field)) if field == "language"
    ));
    assert_eq!(
        package.metadata("title").unwrap().unwrap().first().and_then(Value::as_text),
        Some("Half a Book")
    );

    let report = package.extract_metadata();
    assert_eq!(report.errors.len(), 1);
    assert!(report.get("cover").is_some());
    assert!(report.get("language").is_none());
}

#[test]
fn test_several_matches_form_a_sequence() {
    let package = package_with_metadata(
        r#"<dc:creator opf:role="aut">First</dc:creator>
           <dc:creator opf:role="ill">Illustrator</dc:creator>
           <dc:creator opf:role="aut">Second</dc:creator>"#,
    );
    let authors = package.metadata("author").unwrap().unwrap();
    let names: Vec<_> = authors.values().iter().filter_map(Value::as_text).collect();
    assert_eq!(names, vec!["First", "Second"]);
}

#[test]
fn test_cover_must_be_unique() {
    let package = package_with_metadata(
        r#"<meta name="cover" content="cover"/><meta name="cover" content="ch1"/>"#,
    );
    assert!(matches!(
        package.metadata("cover"),
        Err(Error::DuplicateUniqueField { count: 2, .. })
    ));
}

#[test]
fn test_unknown_field_is_absent() {
    let package = Package::from_bytes(book_zip()).unwrap();
    assert!(package.metadata("no-such-field").unwrap().is_none());
    assert!(package.metadata("description").unwrap().is_none());
}

#[test]
fn test_templates_from_open_options() {
    let data = book_zip_with(
        "OEBPS/book.opf",
        &opf(
            r#"<dc:publisher>Thomas Cautley Newby</dc:publisher>
               <meta name="start-page" content="text/ch1.xhtml"/>"#,
            r#"<item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>"#,
            r#"<itemref idref="ch1"/>"#,
            "",
        ),
    );
    let package = OpenOptions::new()
        .template(FieldTemplate::new("publisher", "dc:publisher").flags(FieldFlags::TEXT))
        .template(
            FieldTemplate::new("start-page", "meta")
                .attr(AttrMatcher::equals("name", "start-page"))
                .attr(AttrMatcher::present("content").capture(FieldFlags::ITEM_REF)),
        )
        .open_bytes(data)
        .unwrap();

    let publisher = package.metadata("publisher").unwrap().unwrap();
    assert_eq!(publisher.first().and_then(Value::as_text), Some("Thomas Cautley Newby"));

    let start = package.metadata("start-page").unwrap().unwrap();
    assert_eq!(start.first().and_then(Value::as_item).unwrap().manifest_id.as_deref(), Some("ch1"));
}

#[test]
fn test_engines_do_not_share_registrations() {
    let mut first = MetadataEngine::new();
    first
        .register(FieldTemplate::new("publisher", "dc:publisher").flags(FieldFlags::TEXT))
        .unwrap();
    let second = MetadataEngine::new();

    assert!(first.template("publisher").is_some());
    assert!(second.template("publisher").is_none());
    assert_eq!(second.templates().len(), builtin_templates().len());
}
