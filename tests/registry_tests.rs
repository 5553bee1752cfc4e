/* tests/registry_tests.rs */

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reflip::flag::{Document, Evaluation, Flag, FlagDef, FlagKind, PredicateError, Predicate};
use reflip::registry::{ErrorStage, MAX_REFRESH_INTERVAL};
use reflip::storage::{Fetched, MemoryAdapter, StorageAdapter, StorageError};
use reflip::{Context, FlagTable, ReflipError, Registry, RegistryEvent};
use tokio::sync::broadcast;

fn zoo() -> Document {
	Document::new(vec![
		FlagDef::boolean("aardvarks", true),
		FlagDef::boolean("archaeopteryx", false),
	])
	.with_ttl(Duration::from_secs(60))
}

fn memory_registry(document: Document) -> (Registry, Arc<MemoryAdapter>) {
	let adapter = Arc::new(MemoryAdapter::new(document));
	let registry = Registry::builder().shared_storage(adapter.clone()).build().unwrap();
	(registry, adapter)
}

/// Serves a fixed document after a configurable delay and records fetch overlap.
struct SlowAdapter {
	document: Mutex<Document>,
	delay_ms: AtomicU64,
	fetches: AtomicUsize,
	active: AtomicUsize,
	peak: AtomicUsize,
}

impl SlowAdapter {
	fn new(document: Document, delay: Duration) -> Arc<Self> {
		Arc::new(Self {
			document: Mutex::new(document),
			delay_ms: AtomicU64::new(delay.as_millis() as u64),
			fetches: AtomicUsize::new(0),
			active: AtomicUsize::new(0),
			peak: AtomicUsize::new(0),
		})
	}

	fn set_delay(&self, delay: Duration) {
		self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
	}

	fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}

	fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl StorageAdapter for SlowAdapter {
	fn name(&self) -> &'static str {
		"slow"
	}

	async fn fetch(&self) -> Result<Fetched, StorageError> {
		self.fetches.fetch_add(1, Ordering::SeqCst);
		let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(active, Ordering::SeqCst);

		let delay = self.delay_ms.load(Ordering::SeqCst);
		if delay > 0 {
			tokio::time::sleep(Duration::from_millis(delay)).await;
		}

		self.active.fetch_sub(1, Ordering::SeqCst);
		Ok(Fetched::from(self.document.lock().unwrap().clone()))
	}
}

async fn wait_for<F>(rx: &mut broadcast::Receiver<RegistryEvent>, matches: F) -> RegistryEvent
where
	F: Fn(&RegistryEvent) -> bool,
{
	tokio::time::timeout(Duration::from_secs(5), async {
		loop {
			match rx.recv().await {
				Ok(event) if matches(&event) => return event,
				Ok(_) => continue,
				Err(e) => panic!("event channel failed: {e}"),
			}
		}
	})
	.await
	.expect("timed out waiting for event")
}

#[test]
fn test_builder_preconditions() {
	let neither = Registry::builder().build();
	assert!(matches!(neither, Err(ReflipError::Precondition(_))));

	let both = Registry::builder()
		.storage(MemoryAdapter::default())
		.features(FlagTable::new())
		.build();
	assert!(matches!(both, Err(ReflipError::Precondition(_))));

	let bad_code = Registry::builder().features(FlagTable::new()).http_code(42).build();
	assert!(matches!(bad_code, Err(ReflipError::Precondition(_))));

	let empty_export = Registry::builder().features(FlagTable::new()).export_name("").build();
	assert!(matches!(empty_export, Err(ReflipError::Precondition(_))));

	let registry = Registry::builder().features(FlagTable::new()).build().unwrap();
	assert_eq!(registry.options().http_code.as_u16(), 404);
	assert_eq!(registry.options().export_name, "check");
	assert_eq!(registry.options().default, Evaluation::Bool(false));
}

#[tokio::test]
async fn test_end_to_end_sync() {
	let (registry, _adapter) = memory_registry(zoo());
	let mut rx = registry.subscribe();

	registry.start().await.unwrap();

	assert!(matches!(rx.recv().await.unwrap(), RegistryEvent::Refreshing));
	let ready = wait_for(&mut rx, RegistryEvent::is_ready).await;
	match ready {
		RegistryEvent::Ready(change) => {
			assert_eq!(change.added, vec!["aardvarks".to_string(), "archaeopteryx".to_string()]);
			assert!(change.removed.is_empty());
		}
		other => panic!("unexpected event: {other:?}"),
	}

	let ctx = Context::new();
	assert_eq!(registry.evaluate("aardvarks", &ctx).unwrap(), true);
	assert_eq!(registry.evaluate("archaeopteryx", &ctx).unwrap(), false);
	assert_eq!(registry.evaluate("agouti", &ctx).unwrap(), false);
	assert_eq!(registry.ttl(), Some(Duration::from_secs(60)));
	assert_eq!(registry.names(), vec!["aardvarks", "archaeopteryx"]);
}

#[tokio::test]
async fn test_unknown_name_resolves_to_configured_default() {
	let registry = Registry::builder()
		.features(FlagTable::new())
		.default_value("control")
		.build()
		.unwrap();

	let ctx = Context::new();
	assert_eq!(registry.evaluate("missing", &ctx).unwrap(), "control");
	assert!(registry.is_enabled("missing", &ctx).unwrap());
	assert!(registry.refresh().await.is_ok());
}

#[tokio::test]
async fn test_register_invokes_predicate_and_overwrites() {
	let registry = Registry::builder().features(FlagTable::new()).build().unwrap();
	let calls = Arc::new(AtomicUsize::new(0));

	let counter = calls.clone();
	let previous = registry
		.register_fn("x", move |ctx| {
			counter.fetch_add(1, Ordering::SeqCst);
			ctx.attribute("plan") == Some("pro")
		})
		.unwrap();
	assert!(previous.is_none());

	let pro = Context::new().with_attribute("plan", "pro");
	assert_eq!(registry.evaluate("x", &pro).unwrap(), true);
	assert_eq!(registry.evaluate("x", &Context::new()).unwrap(), false);
	assert_eq!(calls.load(Ordering::SeqCst), 2);

	let previous = registry.register_fn("x", |_| false).unwrap();
	assert!(previous.is_some());
	assert_eq!(registry.evaluate("x", &pro).unwrap(), false);
	assert_eq!(calls.load(Ordering::SeqCst), 2);

	assert!(registry.register_fn("", |_| true).is_err());
}

#[tokio::test]
async fn test_registered_flags_survive_replace() {
	let (registry, adapter) = memory_registry(zoo());
	registry.start().await.unwrap();

	registry.register(Flag::boolean("local", true).unwrap());
	adapter.replace(Document::new(vec![FlagDef::boolean("aardvarks", false)]));

	let mut rx = registry.subscribe();
	registry.refresh().await.unwrap();

	let change = match wait_for(&mut rx, RegistryEvent::is_ready).await {
		RegistryEvent::Ready(change) => change,
		other => panic!("unexpected event: {other:?}"),
	};
	assert_eq!(change.updated, vec!["aardvarks".to_string()]);
	assert_eq!(change.removed, vec!["archaeopteryx".to_string()]);
	assert_eq!(change.retained, vec!["local".to_string()]);

	let ctx = Context::new();
	assert_eq!(registry.evaluate("local", &ctx).unwrap(), true);
	assert_eq!(registry.evaluate("aardvarks", &ctx).unwrap(), false);
	assert!(registry.get("archaeopteryx").is_none());

	assert!(registry.unregister("local").is_some());
	assert!(registry.get("local").is_none());
}

#[tokio::test]
async fn test_custom_definition_reuses_registered_predicate() {
	let (registry, adapter) = memory_registry(Document::default());
	registry.start().await.unwrap();
	registry.register_fn("beta", |_| true).unwrap();

	adapter.replace(Document::new(vec![FlagDef::custom("beta", false)]));
	registry.refresh().await.unwrap();

	let flag = registry.get("beta").unwrap();
	assert!(matches!(flag.kind(), FlagKind::Custom { .. }));
	assert_eq!(registry.evaluate("beta", &Context::new()).unwrap(), false);

	adapter.replace(Document::new(vec![FlagDef::custom("gamma", true)]));
	assert!(matches!(registry.refresh().await, Err(ReflipError::Definition(_))));
	assert!(registry.get("beta").is_some());
}

#[tokio::test]
async fn test_registered_predicate_outlives_storage_definitions() {
	let (registry, adapter) = memory_registry(Document::default());
	registry.start().await.unwrap();
	registry.register_fn("beta", |_| true).unwrap();
	let ctx = Context::new();

	adapter.replace(Document::new(vec![FlagDef::custom("beta", true)]));
	registry.refresh().await.unwrap();

	adapter.replace(Document::new(vec![FlagDef::boolean("other", true)]));
	registry.refresh().await.unwrap();
	assert!(registry.get("beta").is_none());

	adapter.replace(Document::new(vec![
		FlagDef::custom("beta", true),
		FlagDef::boolean("other", false),
	]));
	registry.refresh().await.unwrap();
	assert!(matches!(registry.get("beta").unwrap().kind(), FlagKind::Custom { .. }));
	assert_eq!(registry.evaluate("beta", &ctx).unwrap(), true);
	assert_eq!(registry.evaluate("other", &ctx).unwrap(), false);

	// Unregistering forgets the predicate as well.
	registry.unregister("beta");
	adapter.replace(Document::new(vec![FlagDef::custom("beta", true)]));
	assert!(matches!(registry.refresh().await, Err(ReflipError::Definition(_))));
	assert_eq!(registry.evaluate("other", &ctx).unwrap(), false);
}

#[tokio::test]
async fn test_initial_table_predicates_outlive_updates() {
	let table = FlagTable::from_flags([Flag::custom(
		"staff",
		Predicate::new(|ctx| ctx.attribute("role") == Some("staff")),
	)
	.unwrap()])
	.unwrap();
	let registry = Registry::builder().features(table).build().unwrap();
	let staff = Context::new().with_attribute("role", "staff");

	registry.update(&[FlagDef::custom("staff", false)]).await.unwrap();
	assert_eq!(registry.evaluate("staff", &staff).unwrap(), false);

	registry.update(&[FlagDef::boolean("other", true)]).await.unwrap();
	assert!(registry.get("staff").is_none());

	registry.update(&[FlagDef::custom("staff", true)]).await.unwrap();
	assert_eq!(registry.evaluate("staff", &staff).unwrap(), true);
	assert_eq!(registry.evaluate("staff", &Context::new()).unwrap(), false);
}

#[tokio::test]
async fn test_malformed_definitions_keep_previous_table() {
	let (registry, _adapter) = memory_registry(zoo());
	registry.start().await.unwrap();
	let version = registry.table().version();
	let mut rx = registry.subscribe();

	let result = registry.update(&[FlagDef::metered("bad", 500.0)]).await;
	assert!(matches!(result, Err(ReflipError::Definition(_))));

	match wait_for(&mut rx, RegistryEvent::is_error).await {
		RegistryEvent::Error { stage, .. } => assert_eq!(stage, ErrorStage::Definitions),
		other => panic!("unexpected event: {other:?}"),
	}

	assert_eq!(registry.table().version(), version);
	assert_eq!(registry.evaluate("aardvarks", &Context::new()).unwrap(), true);
	assert!(registry.get("bad").is_none());
}

#[tokio::test]
async fn test_fetch_failure_keeps_previous_table() {
	let (registry, adapter) = memory_registry(zoo());
	registry.start().await.unwrap();
	let mut rx = registry.subscribe();

	adapter.fail_next("connection reset");
	let result = registry.refresh().await;
	assert!(matches!(result, Err(ReflipError::Storage(_))));

	match wait_for(&mut rx, RegistryEvent::is_error).await {
		RegistryEvent::Error { stage, message } => {
			assert_eq!(stage, ErrorStage::Fetch);
			assert!(message.contains("connection reset"));
		}
		other => panic!("unexpected event: {other:?}"),
	}
	assert_eq!(registry.evaluate("aardvarks", &Context::new()).unwrap(), true);
	assert!(!registry.is_refreshing());
}

#[tokio::test]
async fn test_pushed_updates_are_applied() {
	let (registry, adapter) = memory_registry(zoo());
	registry.start().await.unwrap();
	let mut rx = registry.subscribe();

	adapter.set(Document::new(vec![
		FlagDef::boolean("aardvarks", true),
		FlagDef::boolean("archaeopteryx", true),
	]));

	match wait_for(&mut rx, |event| matches!(event, RegistryEvent::Update { .. })).await {
		RegistryEvent::Update { definitions } => assert_eq!(definitions, 2),
		other => panic!("unexpected event: {other:?}"),
	}
	wait_for(&mut rx, RegistryEvent::is_ready).await;
	assert_eq!(registry.evaluate("archaeopteryx", &Context::new()).unwrap(), true);
	// A push without a TTL keeps the current schedule.
	assert_eq!(registry.ttl(), Some(Duration::from_secs(60)));

	adapter.push_error("disk full");
	match wait_for(&mut rx, RegistryEvent::is_error).await {
		RegistryEvent::Error { stage, .. } => assert_eq!(stage, ErrorStage::Push),
		other => panic!("unexpected event: {other:?}"),
	}
	assert_eq!(registry.evaluate("archaeopteryx", &Context::new()).unwrap(), true);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_schedules_refresh_and_zero_stops_it() {
	let document = Document::new(vec![FlagDef::boolean("aardvarks", true)]).with_ttl(Duration::from_secs(1));
	let (registry, adapter) = memory_registry(document);
	let mut rx = registry.subscribe();

	registry.start().await.unwrap();
	wait_for(&mut rx, RegistryEvent::is_ready).await;
	assert_eq!(adapter.fetch_count(), 1);
	assert_eq!(registry.ttl(), Some(Duration::from_secs(1)));

	wait_for(&mut rx, RegistryEvent::is_ready).await;
	assert_eq!(adapter.fetch_count(), 2);

	adapter.replace(Document::new(vec![FlagDef::boolean("aardvarks", false)]).with_ttl(Duration::ZERO));
	wait_for(&mut rx, RegistryEvent::is_ready).await;
	assert_eq!(adapter.fetch_count(), 3);
	assert_eq!(registry.ttl(), None);

	tokio::time::sleep(Duration::from_secs(10)).await;
	assert_eq!(adapter.fetch_count(), 3);
	assert_eq!(registry.evaluate("aardvarks", &Context::new()).unwrap(), false);
}

#[tokio::test(start_paused = true)]
async fn test_update_waits_for_in_flight_refresh() {
	let adapter = SlowAdapter::new(
		Document::new(vec![FlagDef::boolean("aardvarks", false)]),
		Duration::from_millis(200),
	);
	let registry = Registry::builder().shared_storage(adapter.clone()).build().unwrap();

	let refreshing = tokio::spawn({
		let registry = registry.clone();
		async move { registry.refresh().await }
	});
	while !registry.is_refreshing() {
		tokio::task::yield_now().await;
	}

	registry.update(&[FlagDef::boolean("aardvarks", true)]).await.unwrap();
	refreshing.await.unwrap().unwrap();

	assert_eq!(registry.evaluate("aardvarks", &Context::new()).unwrap(), true);
	assert!(!registry.is_refreshing());
	assert_eq!(adapter.fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_fetch_one_at_a_time() {
	let adapter = SlowAdapter::new(
		Document::new(vec![FlagDef::boolean("aardvarks", true)]),
		Duration::from_millis(500),
	);
	let registry = Registry::builder().shared_storage(adapter.clone()).build().unwrap();

	let (first, second) = tokio::join!(registry.refresh(), registry.refresh());
	first.unwrap();
	second.unwrap();

	assert_eq!(adapter.fetches(), 2);
	assert_eq!(adapter.peak(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_skips_ticks_while_a_fetch_runs() {
	let document = Document::new(vec![FlagDef::boolean("aardvarks", true)]).with_ttl(Duration::from_secs(1));
	let adapter = SlowAdapter::new(document, Duration::ZERO);
	let registry = Registry::builder().shared_storage(adapter.clone()).build().unwrap();

	// Timer armed, first tick one second from now.
	registry.refresh().await.unwrap();
	assert_eq!(adapter.fetches(), 1);

	adapter.set_delay(Duration::from_millis(2500));
	let manual = tokio::spawn({
		let registry = registry.clone();
		async move { registry.refresh().await }
	});

	// Ticks at 1s and 2s land inside the manual fetch.
	tokio::time::sleep(Duration::from_millis(2200)).await;
	assert!(registry.is_refreshing());
	assert_eq!(adapter.fetches(), 2);

	// The manual fetch finished at 2.5s and re-armed the timer for 3.5s.
	tokio::time::sleep(Duration::from_millis(1000)).await;
	manual.await.unwrap().unwrap();
	assert!(!registry.is_refreshing());
	assert_eq!(adapter.fetches(), 2);

	tokio::time::sleep(Duration::from_millis(500)).await;
	assert_eq!(adapter.fetches(), 3);
	assert_eq!(adapter.peak(), 1);

	registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_oversized_ttl_is_capped() {
	let mut document = Document::new(vec![FlagDef::boolean("aardvarks", true)]);
	document.ttl = Some(u64::MAX);
	let (registry, adapter) = memory_registry(document);

	registry.start().await.unwrap();
	assert_eq!(registry.ttl(), Some(MAX_REFRESH_INTERVAL));

	tokio::time::sleep(MAX_REFRESH_INTERVAL + Duration::from_secs(1)).await;
	assert_eq!(adapter.fetch_count(), 2);
	assert_eq!(registry.evaluate("aardvarks", &Context::new()).unwrap(), true);

	registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_is_idempotent_and_stops_the_timer() {
	let document = Document::new(vec![FlagDef::boolean("aardvarks", true)]).with_ttl(Duration::from_secs(1));
	let (registry, adapter) = memory_registry(document);
	registry.start().await.unwrap();

	registry.shutdown();
	registry.shutdown();
	assert!(registry.is_shut_down());
	assert_eq!(registry.ttl(), None);

	tokio::time::sleep(Duration::from_secs(5)).await;
	assert_eq!(adapter.fetch_count(), 1);

	assert!(matches!(registry.refresh().await, Err(ReflipError::ShutDown)));
	assert!(matches!(registry.update(&[]).await, Err(ReflipError::ShutDown)));
	assert_eq!(registry.evaluate("aardvarks", &Context::new()).unwrap(), true);
}

#[tokio::test]
async fn test_predicate_errors() {
	let registry = Registry::builder().features(FlagTable::new()).build().unwrap();
	registry.register(
		Flag::custom(
			"flaky",
			Predicate::fallible(|_| Err(PredicateError::new("lookup failed"))),
		)
		.unwrap(),
	);
	registry.register(Flag::boolean("steady", true).unwrap());
	let mut rx = registry.subscribe();

	let ctx = Context::new();
	assert!(matches!(registry.evaluate("flaky", &ctx), Err(ReflipError::Predicate(_))));
	assert!(registry.evaluate_all(&ctx).is_err());

	let snapshot = registry.snapshot(&ctx);
	assert_eq!(snapshot.get("flaky"), false);
	assert_eq!(snapshot.get("steady"), true);

	match wait_for(&mut rx, RegistryEvent::is_error).await {
		RegistryEvent::Error { stage, message } => {
			assert_eq!(stage, ErrorStage::Predicate);
			assert!(message.contains("flaky"));
		}
		other => panic!("unexpected event: {other:?}"),
	}
}

#[test]
fn test_seeded_registries_agree() {
	let build = || {
		let table = FlagTable::from_flags([
			Flag::metered("coin", 50.0).unwrap(),
			Flag::grouped("color", ["red", "green", "blue"]).unwrap(),
		])
		.unwrap();
		Registry::builder().features(table).seed(42).build().unwrap()
	};
	let (a, b) = (build(), build());
	let ctx = Context::new();

	for _ in 0..100 {
		assert_eq!(a.evaluate("coin", &ctx).unwrap(), b.evaluate("coin", &ctx).unwrap());
		assert_eq!(a.evaluate("color", &ctx).unwrap(), b.evaluate("color", &ctx).unwrap());
	}
}

#[cfg(feature = "stream")]
#[tokio::test]
async fn test_event_stream() {
	use futures_util::StreamExt;

	let (registry, _adapter) = memory_registry(zoo());
	let mut events = registry.events();
	registry.refresh().await.unwrap();

	assert!(matches!(events.next().await, Some(Ok(RegistryEvent::Refreshing))));
	assert!(matches!(events.next().await, Some(Ok(RegistryEvent::Ready(_)))));
}
