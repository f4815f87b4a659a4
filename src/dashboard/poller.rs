use std::time::Duration;

use futures::future::{AbortHandle, abortable};
use log::{debug, info, warn};

use crate::api::{ApiError, HealthReport, RuleEngineStatus, StatusApi};
use crate::clock::Clock;

/// One panel refresh, successful or not.
#[derive(Debug)]
pub enum PollEvent {
	Health(Result<HealthReport, ApiError>),
	RuleEngine(Result<RuleEngineStatus, ApiError>),
}

/// Re-fetches health and rule-engine status every `interval`. A failed
/// fetch is reported like any other result and never ends the loop.
pub struct Poller<S, C> {
	api: S,
	clock: C,
	interval: Duration,
}

impl<S: StatusApi, C: Clock> Poller<S, C> {
	pub fn new(api: S, clock: C, interval: Duration) -> Self {
		Self {
			api,
			clock,
			interval,
		}
	}

	pub async fn tick(&self, sink: &impl Fn(PollEvent)) {
		let health = self.api.health().await;
		if let Err(err) = &health {
			warn!("health refresh failed: {err}");
		}
		sink(PollEvent::Health(health));

		let rules = self.api.rule_engine_status().await;
		if let Err(err) = &rules {
			warn!("rule engine refresh failed: {err}");
		}
		sink(PollEvent::RuleEngine(rules));
	}

	/// Ticks immediately, then after every interval. The next tick is
	/// scheduled only once the current one settles, so ticks never overlap.
	pub async fn run(&self, sink: impl Fn(PollEvent)) {
		info!("polling every {:?}", self.interval);
		loop {
			self.tick(&sink).await;
			debug!("next poll in {:?}", self.interval);
			self.clock.sleep(self.interval).await;
		}
	}
}

impl<S, C> Poller<S, C>
where
	S: StatusApi + 'static,
	C: Clock + 'static,
{
	/// Runs the loop on the browser's task queue until the returned handle
	/// is aborted.
	pub fn spawn(self, sink: impl Fn(PollEvent) + 'static) -> AbortHandle {
		let (task, handle) = abortable(async move { self.run(sink).await });
		wasm_bindgen_futures::spawn_local(async move {
			if task.await.is_err() {
				debug!("poller stopped");
			}
		});
		handle
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use futures::executor::block_on;

	use super::*;
	use crate::api::ApiClient;
	use crate::testing::{FakeClock, MockTransport};

	const HEALTH: &str = r#"{"score": 82.4, "components": {"rules": {"score": 90, "message": "ok"}}, "timestamp": "2024-05-01T10:00:00"}"#;
	const RULES: &str = r#"{"status": "operational", "active_rules": [{"id": "r1", "name": "lint", "status": "active"}], "last_update": "2024-05-01T10:00:00"}"#;

	#[test]
	fn failed_tick_does_not_stop_the_next_one() {
		let transport = Rc::new(MockTransport::default());
		transport.respond(500, r#"{"error": "health unavailable"}"#);
		transport.respond(200, RULES);
		transport.respond(200, HEALTH);
		transport.respond(200, RULES);
		let clock = Rc::new(FakeClock::default());
		let poller = Poller::new(
			ApiClient::new(transport.clone(), "/api/kg/data", "/api/ai"),
			clock.clone(),
			Duration::from_secs(60),
		);

		let events = Rc::new(RefCell::new(Vec::new()));
		let stop: Rc<RefCell<Option<AbortHandle>>> = Rc::default();
		let (sink_events, sink_stop) = (events.clone(), stop.clone());
		let sink = move |event: PollEvent| {
			let mut events = sink_events.borrow_mut();
			events.push(event);
			if events.len() == 4 {
				if let Some(handle) = sink_stop.borrow().as_ref() {
					handle.abort();
				}
			}
		};

		let (task, handle) = abortable(poller.run(sink));
		*stop.borrow_mut() = Some(handle);
		assert!(block_on(task).is_err());

		let events = events.borrow();
		assert!(matches!(&events[0], PollEvent::Health(Err(ApiError::Http { status: 500, .. }))));
		assert!(matches!(&events[1], PollEvent::RuleEngine(Ok(_))));
		assert!(matches!(&events[2], PollEvent::Health(Ok(h)) if h.components["rules"].message == "ok"));
		assert!(matches!(&events[3], PollEvent::RuleEngine(Ok(s)) if s.active_rules.len() == 1));
		assert_eq!(clock.sleeps()[0], Duration::from_secs(60));

		let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
		assert_eq!(
			paths,
			vec!["/api/health", "/api/rule-engine/status", "/api/health", "/api/rule-engine/status"]
		);
	}
}
