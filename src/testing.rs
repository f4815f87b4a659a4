//! In-memory fakes for the transport, storage and clock seams.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::api::{ApiRequest, RawResponse, Transport, TransportError};
use crate::clock::Clock;
use crate::storage::{KeyValueStore, StorageError};

/// Pending once, then ready; stands in for a real suspension point.
#[derive(Default)]
pub struct YieldOnce {
	yielded: bool,
}

impl Future for YieldOnce {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.yielded {
			Poll::Ready(())
		} else {
			self.yielded = true;
			cx.waker().wake_by_ref();
			Poll::Pending
		}
	}
}

/// Replays scripted responses in order and records every request.
/// Each call suspends once before answering.
#[derive(Default)]
pub struct MockTransport {
	script: RefCell<VecDeque<Result<RawResponse, TransportError>>>,
	requests: RefCell<Vec<ApiRequest>>,
}

impl MockTransport {
	pub fn respond(&self, status: u16, body: &str) {
		self.script.borrow_mut().push_back(Ok(RawResponse {
			status,
			body: body.into(),
		}));
	}

	pub fn fail(&self, message: &str) {
		self.script
			.borrow_mut()
			.push_back(Err(TransportError(message.into())));
	}

	pub fn requests(&self) -> Vec<ApiRequest> {
		self.requests.borrow().clone()
	}
}

impl Transport for MockTransport {
	async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
		self.requests.borrow_mut().push(request.clone());
		let next = self.script.borrow_mut().pop_front();
		YieldOnce::default().await;
		next.unwrap_or_else(|| Err(TransportError(format!("no scripted response for {}", request.path))))
	}
}

#[derive(Default)]
pub struct MemoryStore {
	entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn with_entry(key: &str, value: &str) -> Self {
		let store = Self::default();
		store.entries.borrow_mut().insert(key.into(), value.into());
		store
	}

	pub fn get(&self, key: &str) -> Option<String> {
		self.entries.borrow().get(key).cloned()
	}
}

impl KeyValueStore for MemoryStore {
	fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.get(key))
	}

	fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.entries.borrow_mut().insert(key.into(), value.into());
		Ok(())
	}
}

impl<S: KeyValueStore> KeyValueStore for std::rc::Rc<S> {
	fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
		(**self).load(key)
	}

	fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
		(**self).save(key, value)
	}
}

/// Records requested sleeps instead of waiting; time advances one second
/// per `now_ms` call.
#[derive(Default)]
pub struct FakeClock {
	sleeps: RefCell<Vec<Duration>>,
	now: Cell<f64>,
}

impl FakeClock {
	pub fn sleeps(&self) -> Vec<Duration> {
		self.sleeps.borrow().clone()
	}
}

impl Clock for FakeClock {
	fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
		self.sleeps.borrow_mut().push(duration);
		YieldOnce::default()
	}

	fn now_ms(&self) -> f64 {
		let now = self.now.get() + 1000.0;
		self.now.set(now);
		now
	}
}

impl<C: Clock> Clock for std::rc::Rc<C> {
	fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
		(**self).sleep(duration)
	}

	fn now_ms(&self) -> f64 {
		(**self).now_ms()
	}
}
