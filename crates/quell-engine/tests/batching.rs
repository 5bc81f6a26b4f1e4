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
use quell_testing::{concert_schema, Database, KeyedLoader};

fn loader_rows() -> Vec<(i64, quell_engine::Val)> {
    Database::seeded()
        .concerts
        .into_iter()
        .map(|concert| {
            let id = match concert.get("id") {
                Some(quell_engine::Val::Number(n)) => n.as_i64().unwrap(),
                _ => unreachable!(),
            };
            (id, concert)
        })
        .collect()
}

#[test_log::test(tokio::test)]
async fn sibling_fields_share_one_trigger_per_wave() {
    let loader = Arc::new(KeyedLoader::new(loader_rows()));
    let mut services = ServiceMap::default();
    services.insert(Arc::new(Database::seeded()));
    services.insert(loader.clone());

    let response = Engine::new(concert_schema())
        .execute(
            OperationRequest::new(
                r#"
                {
                    a: loadedConcert(id: 1) { title }
                    b: loadedConcert(id: 2) { title }
                }
                "#,
            )
            .with_services(services)
            .with_batch_queue(loader.clone()),
        )
        .await;

    let json = response.to_json().unwrap();
    assert_eq!(json["data"]["a"]["title"], "Glass Forest");
    assert_eq!(json["data"]["b"]["title"], "Night Parade");

    // Both root fields registered before the wave's single batch-sync.
    assert_eq!(loader.trigger_count(), 1);
    assert_eq!(loader.batch_sizes(), vec![2]);
}

#[test_log::test(tokio::test)]
async fn later_waves_get_their_own_trigger() {
    let loader = Arc::new(KeyedLoader::new(loader_rows()));
    let mut services = ServiceMap::default();
    services.insert(Arc::new(Database::seeded()));
    services.insert(loader.clone());

    let response = Engine::new(concert_schema())
        .execute(
            OperationRequest::new(
                r#"
                {
                    a: loadedConcert(id: 1) { title venue { name } }
                }
                "#,
            )
            .with_services(services)
            .with_batch_queue(loader.clone()),
        )
        .await;

    let json = response.to_json().unwrap();
    assert_eq!(json["data"]["a"]["venue"]["name"], "Riverside Hall");
    // Only the first wave registered batch work.
    assert_eq!(loader.trigger_count(), 1);
}

#[test_log::test(tokio::test)]
async fn missing_batch_row_resolves_null() {
    let loader = Arc::new(KeyedLoader::new(loader_rows()));
    let mut services = ServiceMap::default();
    services.insert(Arc::new(Database::seeded()));
    services.insert(loader.clone());

    let response = Engine::new(concert_schema())
        .execute(
            OperationRequest::new("{ loadedConcert(id: 99) { title } }")
                .with_services(services)
                .with_batch_queue(loader),
        )
        .await;

    assert_eq!(
        response.to_body().unwrap(),
        r#"{"data":{"loadedConcert":null}}"#
    );
}
