use std::collections::HashSet;

use keel_core::module_id::{ModuleId, ModuleRevisionId};

#[test]
fn mrid_parse_without_branch() {
    let mrid = ModuleRevisionId::parse("org.apache#commons-lang;2.6").unwrap();
    assert_eq!(mrid.organisation(), "org.apache");
    assert_eq!(mrid.name(), "commons-lang");
    assert_eq!(mrid.branch(), None);
    assert_eq!(mrid.revision(), "2.6");
}

#[test]
fn mrid_parse_with_branch() {
    let mrid: ModuleRevisionId = "acme#core#trunk;1.0".parse().unwrap();
    assert_eq!(mrid.branch(), Some("trunk"));
    assert_eq!(mrid.revision(), "1.0");
}

#[test]
fn mrid_parse_missing_revision_fails() {
    assert!(ModuleRevisionId::parse("acme#core").is_err());
}

#[test]
fn mrid_parse_too_many_parts_fails() {
    assert!(ModuleRevisionId::parse("a#b#c#d;1.0").is_err());
}

#[test]
fn mrid_parse_empty_name_fails() {
    assert!(ModuleRevisionId::parse("acme#;1.0").is_err());
}

#[test]
fn mrid_display_roundtrip() {
    for s in ["acme#core;1.0", "acme#core#trunk;latest.integration"] {
        let mrid = ModuleRevisionId::parse(s).unwrap();
        assert_eq!(mrid.to_string(), s);
    }
}

#[test]
fn mrid_equality_includes_extra_attributes() {
    let plain = ModuleRevisionId::new("acme", "core", "1.0");
    let classified = plain.clone().with_extra_attribute("e:classifier", "jdk8");
    assert_ne!(plain, classified);

    let mut set = HashSet::new();
    set.insert(plain.clone());
    set.insert(classified.clone());
    set.insert(plain.clone());
    assert_eq!(set.len(), 2);
}

#[test]
fn mrid_extra_attribute_views() {
    let mrid = ModuleRevisionId::new("acme", "core", "1.0")
        .with_extra_attribute("e:classifier", "jdk8")
        .with_extra_attribute("color", "blue");
    assert_eq!(
        mrid.qualified_extra_attributes().get("e:classifier"),
        Some(&"jdk8".to_string())
    );
    let unqualified = mrid.extra_attributes();
    assert_eq!(unqualified.get("classifier"), Some(&"jdk8"));
    assert_eq!(unqualified.get("color"), Some(&"blue"));
    assert_eq!(mrid.extra_attribute("classifier"), Some("jdk8"));
    assert_eq!(mrid.extra_attribute("e:classifier"), Some("jdk8"));
    assert_eq!(mrid.extra_attribute("missing"), None);
}

#[test]
fn mrid_with_revision_keeps_everything_else() {
    let mrid = ModuleRevisionId::new("acme", "core", "1.0")
        .with_branch("trunk")
        .with_extra_attribute("color", "blue");
    let other = mrid.with_revision("2.0");
    assert_eq!(other.revision(), "2.0");
    assert_eq!(other.branch(), Some("trunk"));
    assert_eq!(other.extra_attribute("color"), Some("blue"));
    assert_eq!(other.module_id(), mrid.module_id());
}

#[test]
fn module_id_display_and_attributes() {
    let mid = ModuleId::new("acme", "core");
    assert_eq!(mid.to_string(), "acme#core");
    let attrs = mid.attributes();
    assert_eq!(attrs.get("organisation"), Some(&"acme"));
    assert_eq!(attrs.get("module"), Some(&"core"));
}
