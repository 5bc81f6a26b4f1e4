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

fn engine() -> Engine {
    Engine::new(concert_schema())
}

fn request(query: &str) -> OperationRequest {
    let mut services = ServiceMap::default();
    services.insert(Arc::new(Database::seeded()));
    services.insert(Arc::new(RecordingLog::default()));
    OperationRequest::new(query).with_services(services)
}

async fn body(query: &str) -> String {
    engine().execute(request(query)).await.to_body().unwrap()
}

#[tokio::test]
async fn result_key_order_matches_selection_order() {
    let body = body(
        r#"
        {
            concert(id: 1) {
                title
                id
                venue {
                    name
                    id
                }
            }
        }
        "#,
    )
    .await;

    assert_eq!(
        body,
        r#"{"data":{"concert":{"title":"Glass Forest","id":1,"venue":{"name":"Riverside Hall","id":10}}}}"#
    );
}

#[tokio::test]
async fn aliases_become_response_keys() {
    let body = body(r#"{ first: concert(id: 1) { headline: title } }"#).await;
    assert_eq!(body, r#"{"data":{"first":{"headline":"Glass Forest"}}}"#);
}

#[tokio::test]
async fn fields_without_resolvers_read_the_parent_value() {
    let body = body(r#"{ venue(id: 20) { name published } }"#).await;
    assert_eq!(
        body,
        r#"{"data":{"venue":{"name":"Black Box","published":false}}}"#
    );
}

#[tokio::test]
async fn lists_preserve_source_order() {
    let body = body(r#"{ venue(id: 10) { concerts { title } } }"#).await;
    assert_eq!(
        body,
        r#"{"data":{"venue":{"concerts":[{"title":"Glass Forest"},{"title":"Night Parade"}]}}}"#
    );
}

#[tokio::test]
async fn typename_resolves_to_the_concrete_type() {
    let body = body("{ __typename }").await;
    assert_eq!(body, r#"{"data":{"__typename":"Query"}}"#);
}

#[tokio::test]
async fn union_members_collect_against_their_concrete_type() {
    let response = engine()
        .execute(request(
            r#"
            {
                search(term: "a") {
                    __typename
                    ... on Concert { title }
                    ... on Venue { name }
                }
            }
            "#,
        ))
        .await;

    let json = response.to_json().unwrap();
    let hits = json["data"]["search"].as_array().unwrap();
    let type_names: Vec<_> = hits
        .iter()
        .map(|hit| hit["__typename"].as_str().unwrap())
        .collect();
    assert_eq!(type_names, vec!["Concert", "Concert", "Venue", "Venue"]);
    assert_eq!(hits[0]["title"], "Glass Forest");
    assert_eq!(hits[2]["name"], "Riverside Hall");
    assert!(hits[0].get("name").is_none());
}

#[tokio::test]
async fn unknown_field_records_an_error_and_execution_continues() {
    let response = engine()
        .execute(request("{ concert(id: 1) { id } nope }"))
        .await;

    let json = response.to_json().unwrap();
    assert_eq!(json["data"]["concert"]["id"], 1);
    assert!(json["data"].get("nope").is_none());
    assert!(
        json["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("'nope' is not valid for type 'Query'"),
        "unexpected error: {}",
        json["errors"][0]["message"]
    );
}

#[tokio::test]
async fn skip_and_include_run_against_coerced_variables() {
    let variables = serde_json::from_str(r#"{ "skipTitle": true }"#).unwrap();
    let response = engine()
        .execute(
            request(
                r#"
                query($skipTitle: Boolean!) {
                    concert(id: 1) {
                        id
                        title @skip(if: $skipTitle)
                    }
                }
                "#,
            )
            .with_variables(variables),
        )
        .await;

    assert_eq!(
        response.to_body().unwrap(),
        r#"{"data":{"concert":{"id":1}}}"#
    );
}

#[tokio::test]
async fn fragment_spreads_flatten_in_order() {
    let body = body(
        r#"
        {
            concert(id: 2) {
                id
                ...details
            }
        }

        fragment details on Concert {
            title
            venue { name }
        }
        "#,
    )
    .await;

    assert_eq!(
        body,
        r#"{"data":{"concert":{"id":2,"title":"Night Parade","venue":{"name":"Riverside Hall"}}}}"#
    );
}

#[tokio::test]
async fn operation_name_selects_the_operation_to_run() {
    let query = r#"
        query one { concert(id: 1) { id } }
        query two { concert(id: 2) { id } }
    "#;

    let response = engine()
        .execute(request(query).with_operation_name("two"))
        .await;
    assert_eq!(response.to_body().unwrap(), r#"{"data":{"concert":{"id":2}}}"#);

    let response = engine().execute(request(query)).await;
    let json = response.to_json().unwrap();
    assert!(json.get("data").is_none());
    assert!(
        json["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("operation name"),
    );
}

#[tokio::test]
async fn missing_non_null_variable_fails_before_any_resolver_runs() {
    let log = Arc::new(RecordingLog::default());
    let mut services = ServiceMap::default();
    services.insert(Arc::new(Database::seeded()));
    services.insert(log.clone());

    let response = engine()
        .execute(
            OperationRequest::new(
                r#"mutation($m: String!) { append(message: $m) }"#,
            )
            .with_services(services),
        )
        .await;

    let json = response.to_json().unwrap();
    assert!(json.get("data").is_none());
    assert!(
        json["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("'m'"),
    );
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn argument_falls_back_to_schema_default_for_undeclared_variable() {
    // `$missing` is not declared; the argument must fall back to the
    // schema default rather than failing the field.
    let schema = {
        use async_graphql_parser::types::Type;
        use async_graphql_value::ConstValue;
        use quell_engine::field_resolver::FnResolver;
        use quell_engine::schema::{
            ArgumentDefinition, FieldDefinition, ObjectType, ScalarType, Schema,
            TypeDefinition,
        };
        use quell_engine::Val;

        Schema::with_root_types(
            vec![
                TypeDefinition::Scalar(ScalarType::int()),
                TypeDefinition::Object(ObjectType::new(
                    "Query",
                    vec![FieldDefinition::new("echo", Type::new("Int").unwrap())
                        .with_arguments(vec![ArgumentDefinition::new(
                            "n",
                            Type::new("Int").unwrap(),
                        )
                        .with_default(ConstValue::Number(77.into()))])
                        .with_resolver(FnResolver(|ctx: &quell_engine::ResolverContext<'_>| {
                            Ok(ctx.argument("n").cloned().unwrap_or(Val::Null))
                        }))],
                )),
            ],
            "Query",
            None,
            None,
        )
    };

    let response = Engine::new(schema)
        .execute(OperationRequest::new("{ echo(n: $missing) }"))
        .await;
    assert_eq!(response.to_body().unwrap(), r#"{"data":{"echo":77}}"#);
}

#[tokio::test]
async fn repeated_execution_reuses_the_cached_document() {
    let engine = engine();
    let first = engine.execute(request("{ concert(id: 1) { id } }")).await;
    let second = engine.execute(request("{ concert(id: 1) { id } }")).await;

    assert_eq!(first.to_body().unwrap(), second.to_body().unwrap());
}
