// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use quell_engine::{Engine, EngineOptions, OperationRequest, ServiceMap};
use quell_testing::{concert_schema, Database};

fn request(query: &str) -> OperationRequest {
    let mut services = ServiceMap::default();
    services.insert(Arc::new(Database::seeded()));
    OperationRequest::new(query).with_services(services)
}

async fn run(query: &str) -> serde_json::Value {
    Engine::new(concert_schema())
        .execute(request(query))
        .await
        .to_json()
        .unwrap()
}

#[tokio::test]
async fn non_null_violation_nulls_the_nearest_nullable_ancestor() {
    // Concert 3 has a null title, so its non-null `requiredTitle`
    // violates; `concert` is the nearest nullable ancestor.
    let json = run("{ concert(id: 3) { id requiredTitle } }").await;

    assert_eq!(json["data"]["concert"], serde_json::Value::Null);
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0]["path"],
        serde_json::json!(["concert", "requiredTitle"])
    );
    assert!(
        errors[0]["message"]
            .as_str()
            .unwrap()
            .contains("non-nullable field"),
    );
}

#[tokio::test]
async fn violation_without_nullable_ancestor_nulls_the_whole_payload() {
    // concerts: [Concert!]! leaves no nullable position anywhere above the
    // violating field, so the data payload itself goes null.
    let json = run("{ concerts { requiredTitle } }").await;

    assert_eq!(json["data"], serde_json::Value::Null);
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0]["path"],
        serde_json::json!(["concerts", 2, "requiredTitle"])
    );
}

#[tokio::test]
async fn null_element_in_non_null_list_fails_the_list_not_the_element() {
    // tags: [String!]. The list itself is nullable, its elements are
    // not. One null tag nulls the whole list, with a single error.
    let json = run("{ concert(id: 3) { id tags } }").await;

    assert_eq!(json["data"]["concert"]["id"], 3);
    assert_eq!(json["data"]["concert"]["tags"], serde_json::Value::Null);
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0]["path"],
        serde_json::json!(["concert", "tags", 1])
    );
}

#[tokio::test]
async fn resolver_failure_on_a_nullable_field_stays_local() {
    let json = run("{ boom concert(id: 1) { id } }").await;

    assert_eq!(json["data"]["boom"], serde_json::Value::Null);
    // The sibling is untouched.
    assert_eq!(json["data"]["concert"]["id"], 1);
    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], serde_json::json!(["boom"]));
    // Resolver detail is hidden unless the engine is told otherwise.
    assert_eq!(errors[0]["message"], "Internal server error");
}

#[tokio::test]
async fn resolver_messages_surface_in_developer_mode() {
    let engine = Engine::with_options(
        concert_schema(),
        EngineOptions::default().with_expose_internal_errors(true),
    );
    let json = engine
        .execute(request("{ boom }"))
        .await
        .to_json()
        .unwrap();

    assert_eq!(json["errors"][0]["message"], "boom went the resolver");
}

#[tokio::test]
async fn nullable_field_resolving_null_is_just_null() {
    let json = run("{ concert(id: 3) { title } }").await;

    assert_eq!(json["data"]["concert"]["title"], serde_json::Value::Null);
    assert!(json.get("errors").is_none());
}
