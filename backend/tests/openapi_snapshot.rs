//! Snapshot of every operation the OpenAPI document publishes.
//!
//! Adding, renaming or removing an endpoint changes the snapshot, so API
//! surface changes show up in review.

use careplan::ApiDoc;
use insta::assert_json_snapshot;
use rstest::rstest;
use utoipa::OpenApi;
use utoipa::openapi::path::{Operation, PathItem};

fn methods(item: &PathItem) -> impl Iterator<Item = &'static str> + '_ {
    let slots: [(&'static str, &Option<Operation>); 5] = [
        ("GET", &item.get),
        ("POST", &item.post),
        ("PUT", &item.put),
        ("PATCH", &item.patch),
        ("DELETE", &item.delete),
    ];
    slots
        .into_iter()
        .filter_map(|(name, operation)| operation.as_ref().map(|_| name))
}

#[rstest]
fn documented_operations() {
    let doc = ApiDoc::openapi();
    let mut operations: Vec<String> = doc
        .paths
        .paths
        .iter()
        .flat_map(|(path, item)| methods(item).map(move |method| format!("{path} {method}")))
        .collect();
    operations.sort();
    assert_json_snapshot!("documented_operations", operations);
}

#[rstest]
fn every_operation_has_a_tag() {
    let doc = ApiDoc::openapi();
    for (path, item) in &doc.paths.paths {
        for operation in [&item.get, &item.post, &item.put, &item.patch, &item.delete]
            .into_iter()
            .flatten()
        {
            assert!(
                operation.tags.as_ref().is_some_and(|tags| !tags.is_empty()),
                "{path} has an untagged operation"
            );
        }
    }
}
