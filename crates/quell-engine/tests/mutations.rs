// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use quell_engine::{Engine, OperationRequest, ServiceMap};
use quell_testing::{concert_schema, Database, RecordingLog};

struct Harness {
    engine: Engine,
    log: Arc<RecordingLog>,
    services: fn(Arc<RecordingLog>) -> ServiceMap,
}

fn harness() -> Harness {
    Harness {
        engine: Engine::new(concert_schema()),
        log: Arc::new(RecordingLog::default()),
        services: |log| {
            let mut services = ServiceMap::default();
            services.insert(Arc::new(Database::seeded()));
            services.insert(log);
            services
        },
    }
}

#[tokio::test]
async fn root_fields_run_in_declaration_order_with_subtrees_drained() {
    let harness = harness();
    // `first` produces a whole Concert subtree; its side effect must
    // still land before `second`'s resolver runs.
    let response = harness
        .engine
        .execute(
            OperationRequest::new(
                r#"
                mutation {
                    first: appendConcert(message: "a") {
                        title
                        venue { name }
                    }
                    second: append(message: "b")
                }
                "#,
            )
            .with_services((harness.services)(harness.log.clone())),
        )
        .await;

    assert_eq!(harness.log.entries(), vec!["a", "b"]);

    let json = response.to_json().unwrap();
    assert_eq!(json["data"]["first"]["venue"]["name"], "Riverside Hall");
    // `second` saw `a` already in the log: it got sequence number 2.
    assert_eq!(json["data"]["second"], 2);
}

#[tokio::test]
async fn mutation_result_keys_follow_declaration_order() {
    let harness = harness();
    let body = harness
        .engine
        .execute(
            OperationRequest::new(
                r#"
                mutation {
                    z: append(message: "one")
                    a: append(message: "two")
                }
                "#,
            )
            .with_services((harness.services)(harness.log.clone())),
        )
        .await
        .to_body()
        .unwrap();

    assert_eq!(body, r#"{"data":{"z":1,"a":2}}"#);
}

#[tokio::test]
async fn failed_root_mutation_does_not_stop_later_roots() {
    let harness = harness();
    let json = harness
        .engine
        .execute(
            OperationRequest::new(
                r#"
                mutation {
                    bad: append(message: 42)
                    good: append(message: "still runs")
                }
                "#,
            )
            .with_services((harness.services)(harness.log.clone())),
        )
        .await
        .to_json()
        .unwrap();

    // `append` returns Int!, so the failed root violates a non-null
    // position with no nullable ancestor: the payload goes null. Later
    // roots still run, side effects included.
    assert_eq!(json["data"], serde_json::Value::Null);
    assert_eq!(harness.log.entries(), vec!["still runs"]);
    assert!(!json["errors"].as_array().unwrap().is_empty());
}
