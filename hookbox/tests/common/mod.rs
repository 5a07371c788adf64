#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use hookbox::{CancellationToken, FetchError, FetchState, ResourceKey, Transport};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

/// What a mocked key answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
    Network(&'static str),
}

#[derive(Debug, Clone)]
struct Route {
    delay: Duration,
    reply: Reply,
}

/// Transport answering from a fixed route table after a per-route delay.
///
/// Unknown keys answer 404. Every call is recorded, including calls that end
/// up cancelled.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, key: &str, delay_ms: u64, reply: Reply) -> Self {
        self.routes.lock().insert(
            key.to_string(),
            Route {
                delay: Duration::from_millis(delay_ms),
                reply,
            },
        );
        self
    }

    pub fn json(self, key: &str, delay_ms: u64, body: Value) -> Self {
        self.route(key, delay_ms, Reply::Json(body))
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|called| called.as_str() == key)
            .count()
    }
}

impl Transport for MockTransport {
    type Payload = Value;
    type Future = BoxFuture<'static, Result<Value, FetchError>>;

    fn fetch(&self, key: &ResourceKey, _cancel: CancellationToken) -> Self::Future {
        self.calls.lock().push(key.to_string());
        let route = self.routes.lock().get(key.as_str()).cloned();
        async move {
            let Some(route) = route else {
                return Err(FetchError::Http { status: 404 });
            };
            tokio::time::sleep(route.delay).await;
            match route.reply {
                Reply::Json(body) => Ok(body),
                Reply::Status(status) => Err(FetchError::Http { status }),
                Reply::Network(message) => Err(FetchError::network(message)),
            }
        }
        .boxed()
    }
}

/// Waits until the state is `Fetched` or `Error` and returns it.
pub async fn settled(rx: &mut watch::Receiver<FetchState<Value>>) -> FetchState<Value> {
    rx.wait_for(|state| state.is_settled())
        .await
        .expect("fetcher dropped before settling")
        .clone()
}

pub fn user(id: u64, name: &str) -> Value {
    serde_json::json!({ "id": id, "name": name })
}

/// Event captured by an [`EventCollector`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }
}

struct EventCaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for EventCaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Collects tracing events emitted while its dispatch is the default.
///
/// Only tasks polled on the current thread are covered, which holds for the
/// current-thread runtime of `#[tokio::test]`.
#[derive(Clone)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    dispatch: Dispatch,
}

pub fn create_event_collector() -> EventCollector {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCaptureLayer {
        events: Arc::clone(&events),
    };
    let dispatch = Dispatch::new(Registry::default().with(layer));
    EventCollector { events, dispatch }
}

impl EventCollector {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn warnings(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.level == Level::WARN)
            .cloned()
            .collect()
    }
}
