use std::path::PathBuf;

use pretty_assertions::assert_eq;

use dynetml2other::{
    AdapterError, Document, Error, GraphHandle, GraphLibrary, LoadOptions, PropertyValue,
    dynetml::FormatError,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(name)
}

#[test]
fn load_save_load_is_lossless() {
    let original = dynetml2other::load(fixture("tweets.xml")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tweets.xml");

    dynetml2other::save(&original, &path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains(r#"<propertyIdentity id="verified" type="boolean""#));
    let reloaded = dynetml2other::load(&path).unwrap();

    assert_eq!(reloaded, original);
    let ana = reloaded.node("Agent", "@ana").unwrap();
    assert_eq!(ana.property("verified"), Some(&PropertyValue::Bool(true)));
    assert_eq!(
        reloaded.properties["source"],
        PropertyValue::Text("twitter stream & search API".into())
    );
}

#[test]
fn two_node_document_in_every_representation() {
    let mn = dynetml2other::load(fixture("two_agents.xml")).unwrap();

    let GraphHandle::Networks(graphs) = mn.to_graph_library(GraphLibrary::Petgraph).unwrap()
    else {
        panic!("expected per-network graphs");
    };
    let interacts = &graphs.networks["interacts"].graph;
    assert!(interacts.is_directed());
    assert_eq!(interacts.node_count(), 2);
    assert_eq!(interacts.edge_count(), 1);

    let GraphHandle::Merged(merged) = mn.to_graph_library(GraphLibrary::PetgraphMerged).unwrap()
    else {
        panic!("expected a merged graph");
    };
    assert!(merged.graph.is_directed());
    assert_eq!(merged.graph.node_count(), 2);
    assert_eq!(merged.graph.edge_count(), 1);

    let dict = dynetml2other::to_dict(&mn);
    assert_eq!(dict.node_count(), 2);
    assert_eq!(dict.link_count(), 1);
    assert!(dict.networks["interacts"].is_directed);
}

#[test]
fn graph_edges_reference_declared_nodes() {
    let mn = dynetml2other::load(fixture("tweets.xml")).unwrap();
    let GraphHandle::Networks(graphs) = mn.to_graph_library(GraphLibrary::Petgraph).unwrap()
    else {
        panic!("expected per-network graphs");
    };

    for network in graphs.networks.values() {
        assert_eq!(network.graph.edge_count(), mn.network(&network.header.id).unwrap().link_count());
        for (source, target, _) in network.graph.edges() {
            assert_eq!(source.nodeset, network.header.source);
            assert!(mn.node(&source.nodeset, &source.node).is_ok());
            assert!(mn.node(&target.nodeset, &target.node).is_ok());
        }
    }
}

#[test]
fn dict_conversion_covers_every_loadable_fixture() {
    for name in ["two_agents.xml", "tweets.xml"] {
        let mn = dynetml2other::load(fixture(name)).unwrap();
        let dict = dynetml2other::to_dict(&mn);
        assert_eq!(dict.node_count(), mn.node_count());
        assert_eq!(dict.link_count(), mn.link_count());
        assert!(dict.to_json().is_ok());
    }
}

#[test]
fn saving_a_graph_handle_writes_the_same_model() {
    let mn = dynetml2other::load(fixture("tweets.xml")).unwrap();
    let handle = dynetml2other::to_graph_library(&mn, GraphLibrary::Petgraph).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from_graphs.xml");

    dynetml2other::save(&handle, &path).unwrap();

    assert_eq!(dynetml2other::load(&path).unwrap(), mn);
}

#[test]
fn merged_graph_rejects_mixed_directedness() {
    let mn = dynetml2other::load(fixture("tweets.xml")).unwrap();
    let err = dynetml2other::to_graph_library(&mn, GraphLibrary::PetgraphMerged).unwrap_err();
    assert!(matches!(err, Error::Adapter(AdapterError::UnsupportedFeature(_))));
}

#[test]
fn broken_documents_are_format_errors() {
    let err = dynetml2other::load(fixture("dangling_link.xml")).unwrap_err();
    assert!(err.is_dangling_reference(), "{err}");

    let err = dynetml2other::load(fixture("malformed.xml")).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::Xml(_))), "{err}");

    let err = dynetml2other::load(fixture("dynamic.xml")).unwrap_err();
    assert!(matches!(err, Error::Format(FormatError::UnexpectedRoot { .. })));

    let err = dynetml2other::load(fixture("missing.xml")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn dynamic_document_round_trip() {
    let document = dynetml2other::load_document(fixture("dynamic.xml"), &LoadOptions::default())
        .unwrap();
    let Document::Dynamic(dmn) = &document else {
        panic!("expected a dynamic document");
    };
    assert_eq!(dmn.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dynamic.xml");
    dynetml2other::save_document(&document, &path).unwrap();
    let reloaded = dynetml2other::load_document(&path, &LoadOptions::default()).unwrap();
    assert_eq!(reloaded, document);
}

#[test]
fn options_file_filters_networks() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("options.json");
    std::fs::write(
        &config,
        r#"{ "networks_to_include": ["Agent x Agent - Mentions"] }"#,
    )
    .unwrap();

    let options = LoadOptions::from_json_file(&config).unwrap();
    let mn = dynetml2other::load_with(fixture("tweets.xml"), &options).unwrap();
    let ids: Vec<_> = mn.networks().map(|n| n.id().to_string()).collect();
    assert_eq!(ids, vec!["Agent x Agent - Mentions".to_string()]);
    assert_eq!(mn.nodesets().count(), 3);
}

#[test]
fn failed_save_leaves_no_file() {
    let mut mn = dynetml2other::load(fixture("two_agents.xml")).unwrap();
    mn.properties
        .insert("score".into(), PropertyValue::Number(f64::INFINITY));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xml");

    let err = dynetml2other::save(&mn, &path).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    assert!(!path.exists());

    let err = dynetml2other::save(&dynetml2other::load(fixture("two_agents.xml")).unwrap(), dir.path())
        .unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}
