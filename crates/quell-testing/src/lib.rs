// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Shared fixtures for engine tests: a concert/venue schema backed by an
//! in-memory dataset, a recording side-effect log, a keyed batch loader,
//! and a canned subscription source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_graphql_parser::types::Type;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

use quell_engine::error::ResolverError;
use quell_engine::execution::{ResolverContext, SubscriptionRequest, SubscriptionSource};
use quell_engine::field_resolver::{FieldResolver, FnResolver};
use quell_engine::loader::BatchFetchQueue;
use quell_engine::schema::{
    ArgumentDefinition, EnumType, FieldDefinition, ObjectType, ScalarType, Schema,
    TypeDefinition, UnionType,
};
use quell_engine::val_object;
use quell_engine::value::Val;

/// In-memory dataset the fixture resolvers read from.
pub struct Database {
    pub concerts: Vec<Val>,
    pub venues: Vec<Val>,
}

impl Database {
    pub fn seeded() -> Self {
        let concerts = vec![
            val_object! {
                "__typename" => Val::String("Concert".to_string()),
                "id" => Val::Number(1.into()),
                "title" => Val::String("Glass Forest".to_string()),
                "venue_id" => Val::Number(10.into()),
                "tags" => Val::List(vec![
                    Val::String("electronic".to_string()),
                    Val::String("ambient".to_string()),
                ]),
            },
            val_object! {
                "__typename" => Val::String("Concert".to_string()),
                "id" => Val::Number(2.into()),
                "title" => Val::String("Night Parade".to_string()),
                "venue_id" => Val::Number(10.into()),
                "tags" => Val::List(vec![Val::String("brass".to_string())]),
            },
            val_object! {
                "__typename" => Val::String("Concert".to_string()),
                "id" => Val::Number(3.into()),
                "title" => Val::Null,
                "venue_id" => Val::Number(20.into()),
                "tags" => Val::List(vec![Val::String("live".to_string()), Val::Null]),
            },
        ];
        let venues = vec![
            val_object! {
                "__typename" => Val::String("Venue".to_string()),
                "id" => Val::Number(10.into()),
                "name" => Val::String("Riverside Hall".to_string()),
                "published" => Val::Bool(true),
            },
            val_object! {
                "__typename" => Val::String("Venue".to_string()),
                "id" => Val::Number(20.into()),
                "name" => Val::String("Black Box".to_string()),
                "published" => Val::Bool(false),
            },
        ];
        Self { concerts, venues }
    }

    pub fn concert(&self, id: i64) -> Option<&Val> {
        self.concerts.iter().find(|c| int_field(c, "id") == Some(id))
    }

    pub fn venue(&self, id: i64) -> Option<&Val> {
        self.venues.iter().find(|v| int_field(v, "id") == Some(id))
    }
}

fn int_field(value: &Val, key: &str) -> Option<i64> {
    match value.get(key) {
        Some(Val::Number(n)) => n.as_i64(),
        _ => None,
    }
}

fn int_argument(ctx: &ResolverContext<'_>, name: &str) -> Result<i64, ResolverError> {
    match ctx.argument(name) {
        Some(Val::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ResolverError::new(format!("argument '{name}' out of range"))),
        _ => Err(ResolverError::new(format!("missing argument '{name}'"))),
    }
}

fn database(ctx: &ResolverContext<'_>) -> Result<std::sync::Arc<Database>, ResolverError> {
    ctx.service::<Database>()
        .ok_or_else(|| ResolverError::new("no database attached to the request"))
}

/// Observable side-effect sink for mutation-ordering tests.
#[derive(Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<String>>,
}

impl RecordingLog {
    pub fn append(&self, entry: impl Into<String>) -> usize {
        let mut entries = self.entries.lock().unwrap();
        entries.push(entry.into());
        entries.len()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// A keyed batch loader honoring the engine's trigger contract: `load`
/// registers the key synchronously and returns a waiter that resolves
/// when the wave's batch-sync phase triggers the queue.
pub struct KeyedLoader {
    rows: Vec<(i64, Val)>,
    pending: Mutex<Vec<(i64, tokio::sync::oneshot::Sender<Val>)>>,
    triggers: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl KeyedLoader {
    pub fn new(rows: Vec<(i64, Val)>) -> Self {
        Self {
            rows,
            pending: Mutex::new(vec![]),
            triggers: AtomicUsize::new(0),
            batch_sizes: Mutex::new(vec![]),
        }
    }

    pub fn load(&self, key: i64) -> tokio::sync::oneshot::Receiver<Val> {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.pending.lock().unwrap().push((key, sender));
        receiver
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchFetchQueue for KeyedLoader {
    fn has_pending(&self) -> bool {
        !self.pending.lock().unwrap().is_empty()
    }

    async fn trigger_all(&self) {
        let drained: Vec<_> = std::mem::take(&mut *self.pending.lock().unwrap());
        self.triggers.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(drained.len());
        for (key, sender) in drained {
            let row = self
                .rows
                .iter()
                .find(|(id, _)| *id == key)
                .map(|(_, row)| row.clone())
                .unwrap_or(Val::Null);
            let _ = sender.send(row);
        }
    }
}

/// Subscription source that replays a fixed list of events, recording
/// the request it was subscribed with.
pub struct StaticEventSource {
    events: Vec<Val>,
    pub seen_requests: Mutex<Vec<(String, String)>>,
}

impl StaticEventSource {
    pub fn new(events: Vec<Val>) -> Self {
        Self {
            events,
            seen_requests: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl SubscriptionSource for StaticEventSource {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<BoxStream<'static, Val>, ResolverError> {
        let rendered_arguments = request
            .arguments
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.seen_requests
            .lock()
            .unwrap()
            .push((request.field_name, rendered_arguments));
        Ok(futures::stream::iter(self.events.clone()).boxed())
    }
}

/// Resolver that never finishes on its own; cancellation and timeout
/// tests race against it.
struct StalledResolver;

#[async_trait]
impl FieldResolver for StalledResolver {
    async fn resolve_field(&self, _ctx: &ResolverContext<'_>) -> Result<Val, ResolverError> {
        futures::future::pending::<()>().await;
        unreachable!()
    }
}

struct LoadedConcertResolver;

#[async_trait]
impl FieldResolver for LoadedConcertResolver {
    async fn resolve_field(&self, ctx: &ResolverContext<'_>) -> Result<Val, ResolverError> {
        let loader = ctx
            .service::<KeyedLoader>()
            .ok_or_else(|| ResolverError::new("no loader attached to the request"))?;
        let id = int_argument(ctx, "id")?;
        let receiver = loader.load(id);
        receiver
            .await
            .map_err(|_| ResolverError::new("batch was dropped before it was triggered"))
    }
}

/// The fixture schema: concerts, venues, a search union, batched
/// lookups, failing fields, ordered mutations, and one subscription.
pub fn concert_schema() -> Schema {
    let query_fields = vec![
        FieldDefinition::new("concert", Type::new("Concert").unwrap())
            .with_arguments(vec![ArgumentDefinition::new("id", Type::new("Int!").unwrap())])
            .with_resolver(FnResolver(|ctx: &ResolverContext<'_>| {
                let db = database(ctx)?;
                let id = int_argument(ctx, "id")?;
                Ok(db.concert(id).cloned().unwrap_or(Val::Null))
            })),
        FieldDefinition::new("concerts", Type::new("[Concert!]!").unwrap()).with_resolver(
            FnResolver(|ctx: &ResolverContext<'_>| {
                Ok(Val::List(database(ctx)?.concerts.clone()))
            }),
        ),
        FieldDefinition::new("venue", Type::new("Venue").unwrap())
            .with_arguments(vec![ArgumentDefinition::new("id", Type::new("Int!").unwrap())])
            .with_resolver(FnResolver(|ctx: &ResolverContext<'_>| {
                let db = database(ctx)?;
                let id = int_argument(ctx, "id")?;
                Ok(db.venue(id).cloned().unwrap_or(Val::Null))
            })),
        FieldDefinition::new("search", Type::new("[SearchResult!]!").unwrap())
            .with_arguments(vec![ArgumentDefinition::new(
                "term",
                Type::new("String!").unwrap(),
            )])
            .with_resolver(FnResolver(|ctx: &ResolverContext<'_>| {
                let db = database(ctx)?;
                let term = match ctx.argument("term") {
                    Some(Val::String(term)) => term.to_lowercase(),
                    _ => return Err(ResolverError::new("missing argument 'term'")),
                };
                let matches = |row: &&Val, key: &str| match row.get(key) {
                    Some(Val::String(text)) => text.to_lowercase().contains(&term),
                    _ => false,
                };
                let mut hits: Vec<Val> = db
                    .concerts
                    .iter()
                    .filter(|row| matches(row, "title"))
                    .cloned()
                    .collect();
                hits.extend(db.venues.iter().filter(|row| matches(row, "name")).cloned());
                Ok(Val::List(hits))
            })),
        FieldDefinition::new("loadedConcert", Type::new("Concert").unwrap())
            .with_arguments(vec![ArgumentDefinition::new("id", Type::new("Int!").unwrap())])
            .with_resolver(LoadedConcertResolver),
        FieldDefinition::new("boom", Type::new("String").unwrap()).with_resolver(FnResolver(
            |_ctx: &ResolverContext<'_>| Err(ResolverError::new("boom went the resolver")),
        )),
        FieldDefinition::new("stalled", Type::new("String").unwrap())
            .with_resolver(StalledResolver),
    ];

    let concert_fields = vec![
        FieldDefinition::new("id", Type::new("Int!").unwrap()),
        FieldDefinition::new("title", Type::new("String").unwrap()),
        FieldDefinition::new("requiredTitle", Type::new("String!").unwrap()).with_resolver(
            FnResolver(|ctx: &ResolverContext<'_>| {
                Ok(ctx.parent().get("title").cloned().unwrap_or(Val::Null))
            }),
        ),
        FieldDefinition::new("tags", Type::new("[String!]").unwrap()),
        FieldDefinition::new("venue", Type::new("Venue").unwrap()).with_resolver(FnResolver(
            |ctx: &ResolverContext<'_>| {
                let db = database(ctx)?;
                match int_field(ctx.parent(), "venue_id") {
                    Some(venue_id) => Ok(db.venue(venue_id).cloned().unwrap_or(Val::Null)),
                    None => Ok(Val::Null),
                }
            },
        )),
    ];

    let venue_fields = vec![
        FieldDefinition::new("id", Type::new("Int!").unwrap()),
        FieldDefinition::new("name", Type::new("String").unwrap()),
        FieldDefinition::new("published", Type::new("Boolean!").unwrap()),
        FieldDefinition::new("concerts", Type::new("[Concert!]!").unwrap()).with_resolver(
            FnResolver(|ctx: &ResolverContext<'_>| {
                let db = database(ctx)?;
                let venue_id = int_field(ctx.parent(), "id");
                Ok(Val::List(
                    db.concerts
                        .iter()
                        .filter(|c| int_field(c, "venue_id") == venue_id)
                        .cloned()
                        .collect(),
                ))
            }),
        ),
    ];

    let mutation_fields = vec![
        FieldDefinition::new("append", Type::new("Int!").unwrap())
            .with_arguments(vec![ArgumentDefinition::new(
                "message",
                Type::new("String!").unwrap(),
            )])
            .with_resolver(FnResolver(|ctx: &ResolverContext<'_>| {
                let log = ctx
                    .service::<RecordingLog>()
                    .ok_or_else(|| ResolverError::new("no log attached to the request"))?;
                let message = match ctx.argument("message") {
                    Some(Val::String(message)) => message.clone(),
                    _ => return Err(ResolverError::new("missing argument 'message'")),
                };
                Ok(Val::Number((log.append(message) as i64).into()))
            })),
        FieldDefinition::new("appendConcert", Type::new("Concert!").unwrap())
            .with_arguments(vec![ArgumentDefinition::new(
                "message",
                Type::new("String!").unwrap(),
            )])
            .with_resolver(FnResolver(|ctx: &ResolverContext<'_>| {
                let log = ctx
                    .service::<RecordingLog>()
                    .ok_or_else(|| ResolverError::new("no log attached to the request"))?;
                let message = match ctx.argument("message") {
                    Some(Val::String(message)) => message.clone(),
                    _ => return Err(ResolverError::new("missing argument 'message'")),
                };
                log.append(message);
                let db = database(ctx)?;
                Ok(db.concert(1).cloned().unwrap_or(Val::Null))
            })),
    ];

    let subscription_fields = vec![FieldDefinition::new(
        "concertAdded",
        Type::new("Concert").unwrap(),
    )
    .with_arguments(vec![ArgumentDefinition::new(
        "venueId",
        Type::new("Int").unwrap(),
    )])];

    Schema::new(vec![
        TypeDefinition::Scalar(ScalarType::int()),
        TypeDefinition::Scalar(ScalarType::float()),
        TypeDefinition::Scalar(ScalarType::string()),
        TypeDefinition::Scalar(ScalarType::boolean()),
        TypeDefinition::Scalar(ScalarType::id()),
        TypeDefinition::Enum(EnumType::new("SortOrder", ["ASC", "DESC"])),
        TypeDefinition::Object(ObjectType::new("Concert", concert_fields)),
        TypeDefinition::Object(ObjectType::new("Venue", venue_fields)),
        TypeDefinition::Union(UnionType::new(
            "SearchResult",
            ["Concert", "Venue"],
            None,
        )),
        TypeDefinition::Object(ObjectType::new("Query", query_fields)),
        TypeDefinition::Object(ObjectType::new("Mutation", mutation_fields)),
        TypeDefinition::Object(ObjectType::new("Subscription", subscription_fields)),
    ])
}
