//! Fixtures shared by the host tests

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use modhost_abi::Module;
use modhost_config::library_file_name;
use modhost_descriptor::{embedded_bytes, ModuleDescriptor};

use crate::host::ModuleHost;
use crate::loader::StaticLoader;

/// A module with no operations that declares a dependency on `waku`
#[derive(Debug, Default)]
pub(crate) struct Chat;

impl Chat {
    fn new() -> Self {
        Chat
    }
}

impl Module for Chat {
    fn name(&self) -> &str {
        "chat"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }
}

mod chat {
    modhost_abi::declare_module!("chat", super::Chat::new);
}

/// Loader serving the demo modules linked into the test binary
pub(crate) fn demo_loader() -> StaticLoader {
    StaticLoader::new()
        .with(calculator_interface::NAME, &calculator_module::MODHOST_DECLARATION)
        .with(greeter_module::NAME, &greeter_module::MODHOST_DECLARATION)
        .with("chat", &chat::MODHOST_DECLARATION)
}

pub(crate) fn demo_host(modules_dir: &Path) -> ModuleHost {
    ModuleHost::new(modules_dir, Box::new(demo_loader()))
}

/// Write a stand-in library file for `stem` carrying `descriptor` embedded.
pub(crate) fn write_module(dir: &Path, stem: &str, descriptor: &ModuleDescriptor) -> PathBuf {
    let path = dir.join(library_file_name(stem));
    let mut bytes = b"\x7fELF\x02\x01\x01\0".to_vec();
    bytes.extend(embedded_bytes(descriptor).unwrap_or_default());
    bytes.extend(b"\0\0");
    let _ = fs::write(&path, bytes);
    path
}

/// A log event recorded by [`capture_logs`]
#[derive(Debug, Clone)]
pub(crate) struct LogEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl LogEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn message(&self) -> &str {
        self.field("message").unwrap_or_default()
    }
}

#[derive(Default)]
struct FieldMap(BTreeMap<String, String>);

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

#[derive(Clone, Default)]
struct Collector(Arc<Mutex<Vec<LogEvent>>>);

impl<S: Subscriber> Layer<S> for Collector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldMap::default();
        event.record(&mut fields);
        if let Ok(mut events) = self.0.lock() {
            events.push(LogEvent {
                level: *event.metadata().level(),
                fields: fields.0,
            });
        }
    }
}

/// Run `f` with a subscriber recording every event emitted on this thread.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<LogEvent>) {
    let collector = Collector::default();
    let subscriber = tracing_subscriber::registry().with(collector.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = collector
        .0
        .lock()
        .map(|events| events.to_vec())
        .unwrap_or_default();
    (result, events)
}

/// Warnings among `events` that carry `field = value`
pub(crate) fn warnings_with<'a>(
    events: &'a [LogEvent],
    field: &str,
    value: &str,
) -> Vec<&'a LogEvent> {
    events
        .iter()
        .filter(|e| e.level == Level::WARN && e.field(field) == Some(value))
        .collect()
}
