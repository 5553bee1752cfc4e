/* src/signal/worker.rs */

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::sync::mpsc;

use super::target::FileTarget;
use super::{Config, Event, EventKind};

struct DebounceState {
	last_seen: Instant,
	kind: EventKind,
}

pub(crate) async fn process_events(
	mut raw_rx: mpsc::Receiver<notify::Result<notify::Event>>,
	user_tx: broadcast::Sender<Event>,
	target: FileTarget,
	config: Config,
) {
	let mut pending: HashMap<PathBuf, DebounceState> = HashMap::new();

	let tick_rate = if config.debounce < Duration::from_millis(50) {
		config.debounce.max(Duration::from_millis(1))
	} else {
		config.debounce / 5
	};

	let mut interval = tokio::time::interval(tick_rate);

	loop {
		tokio::select! {
			maybe_event = raw_rx.recv() => {
				match maybe_event {
					Some(Ok(event)) => handle_raw_event(event, &mut pending, &target, &config),
					Some(Err(e)) => tracing::error!("Notify error: {:?}", e),
					None => break,
				}
			}
			_ = interval.tick() => {
				flush_pending(&mut pending, &user_tx, &config);
			}
		}
	}
}

fn handle_raw_event(
	event: notify::Event,
	pending: &mut HashMap<PathBuf, DebounceState>,
	target: &FileTarget,
	config: &Config,
) {
	use notify::EventKind as NK;
	let kind = match event.kind {
		NK::Create(_) => EventKind::Create,
		NK::Modify(_) => EventKind::Modify,
		NK::Remove(_) => EventKind::Remove,
		_ => return,
	};

	for path in event.paths {
		if !target.matches(&path) {
			continue;
		}

		pending
			.entry(path)
			.and_modify(|state| {
				state.last_seen = Instant::now();

				if !config.coalesce {
					state.kind = kind;
					return;
				}

				match (state.kind, kind) {
					(EventKind::Create, EventKind::Modify) => {}
					// A remove followed by a write is an atomic replace.
					(EventKind::Remove, EventKind::Create) | (EventKind::Remove, EventKind::Modify) => {
						state.kind = EventKind::Create;
					}
					_ => state.kind = kind,
				}
			})
			.or_insert(DebounceState {
				last_seen: Instant::now(),
				kind,
			});
	}
}

fn flush_pending(pending: &mut HashMap<PathBuf, DebounceState>, tx: &broadcast::Sender<Event>, config: &Config) {
	let now = Instant::now();

	pending.retain(|path, state| {
		if now.duration_since(state.last_seen) < config.debounce {
			return true;
		}

		let allowed = match &config.listen_events {
			None => true,
			Some(list) => list.contains(&state.kind),
		};

		if allowed {
			let _ = tx.send(Event {
				path: path.clone(),
				kind: state.kind,
			});
		}
		false
	});
}
