use std::cell::{Cell, RefCell};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::api::{AiApi, AiStatus, ApiError, Feedback, QueryContext, QueryResponse};
use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::storage::{KeyValueStore, load_json, save_json};

pub const HISTORY_KEY: &str = "aiChatHistory";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
	pub id: String,
	pub query: String,
	pub response: String,
	#[serde(default)]
	pub confidence: f64,
	#[serde(default)]
	pub context: QueryContext,
	/// Milliseconds since the epoch.
	#[serde(default)]
	pub timestamp: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub feedback: Option<Feedback>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatState {
	#[default]
	Idle,
	Sending {
		attempt: u32,
	},
	Retrying {
		attempt: u32,
		delay: Duration,
	},
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
	#[error("query must not be empty")]
	EmptyQuery,
	#[error("a query is already in flight")]
	Busy,
	#[error("gave up after {attempts} attempts: {message}")]
	RetriesExhausted { attempts: u32, message: String },
	#[error(transparent)]
	Api(#[from] ApiError),
	#[error("no chat entry `{0}`")]
	UnknownEntry(String),
}

type StateListener = Box<dyn Fn(ChatState)>;

pub struct ChatSession<A, C, S> {
	api: A,
	clock: C,
	store: S,
	retry: RetryPolicy,
	state: Cell<ChatState>,
	history: RefCell<Vec<ChatEntry>>,
	context: RefCell<QueryContext>,
	listener: RefCell<Option<StateListener>>,
}

/// Puts the session back to idle however the exchange ends, including
/// when the caller drops the future mid-retry.
struct InFlight<'a, A, C, S>(&'a ChatSession<A, C, S>);

impl<A, C, S> Drop for InFlight<'_, A, C, S> {
	fn drop(&mut self) {
		self.0.state.set(ChatState::Idle);
		if let Some(listener) = self.0.listener.borrow().as_ref() {
			listener(ChatState::Idle);
		}
	}
}

impl<A: AiApi, C: Clock, S: KeyValueStore> ChatSession<A, C, S> {
	/// Restores history from `store`; unreadable history starts empty.
	pub fn new(api: A, clock: C, store: S, retry: RetryPolicy) -> Self {
		let history = match load_json::<Vec<ChatEntry>>(&store, HISTORY_KEY) {
			Ok(history) => history.unwrap_or_default(),
			Err(err) => {
				warn!("discarding chat history: {err}");
				Vec::new()
			}
		};
		info!("chat history restored: {} entries", history.len());
		Self {
			api,
			clock,
			store,
			retry,
			state: Cell::new(ChatState::Idle),
			history: RefCell::new(history),
			context: RefCell::new(QueryContext::new()),
			listener: RefCell::new(None),
		}
	}

	pub fn state(&self) -> ChatState {
		self.state.get()
	}

	pub fn on_state_change(&self, listener: impl Fn(ChatState) + 'static) {
		*self.listener.borrow_mut() = Some(Box::new(listener));
	}

	fn set_state(&self, state: ChatState) {
		self.state.set(state);
		if let Some(listener) = self.listener.borrow().as_ref() {
			listener(state);
		}
	}

	pub fn history(&self) -> Vec<ChatEntry> {
		self.history.borrow().clone()
	}

	pub fn context(&self) -> QueryContext {
		self.context.borrow().clone()
	}

	/// Sends `query`, retrying logical failures with exponential backoff.
	/// Transport and HTTP failures are reported immediately.
	pub async fn send(&self, query: &str) -> Result<ChatEntry, ChatError> {
		let query = query.trim();
		if query.is_empty() {
			return Err(ChatError::EmptyQuery);
		}
		if self.state() != ChatState::Idle {
			return Err(ChatError::Busy);
		}

		let response = {
			let _in_flight = InFlight(self);
			self.exchange(query).await?
		};

		let entry = ChatEntry {
			id: self.next_entry_id(),
			query: query.to_owned(),
			response: response.answer(),
			confidence: response.confidence.clamp(0.0, 1.0),
			context: response.context.clone(),
			timestamp: self.clock.now_ms(),
			feedback: None,
		};
		// later keys win
		self.context.borrow_mut().extend(response.context);
		self.history.borrow_mut().push(entry.clone());
		self.persist();
		Ok(entry)
	}

	async fn exchange(&self, query: &str) -> Result<QueryResponse, ChatError> {
		let mut attempt = 0;
		loop {
			self.set_state(ChatState::Sending { attempt });
			let context = self.context();
			match self.api.query(query, &context).await {
				Ok(response) => return Ok(response),
				Err(ApiError::Logical(message)) if attempt < self.retry.max_retries => {
					let delay = self.retry.delay_for(attempt);
					debug!("query attempt {} failed ({message}), retrying in {delay:?}", attempt + 1);
					self.set_state(ChatState::Retrying { attempt, delay });
					self.clock.sleep(delay).await;
					attempt += 1;
				}
				Err(ApiError::Logical(message)) => {
					warn!("query failed after {} attempts: {message}", attempt + 1);
					return Err(ChatError::RetriesExhausted {
						attempts: attempt + 1,
						message,
					});
				}
				Err(err) => {
					warn!("query failed: {err}");
					return Err(err.into());
				}
			}
		}
	}

	fn next_entry_id(&self) -> String {
		let now = self.clock.now_ms() as u64;
		let history = self.history.borrow();
		let mut id = now.to_string();
		let mut n = 1;
		while history.iter().any(|e| e.id == id) {
			id = format!("{now}-{n}");
			n += 1;
		}
		id
	}

	pub async fn submit_feedback(&self, entry_id: &str, feedback: Feedback) -> Result<(), ChatError> {
		if !self.history.borrow().iter().any(|e| e.id == entry_id) {
			return Err(ChatError::UnknownEntry(entry_id.to_owned()));
		}
		self.api.feedback(entry_id, feedback).await?;
		if let Some(entry) = self
			.history
			.borrow_mut()
			.iter_mut()
			.find(|e| e.id == entry_id)
		{
			entry.feedback = Some(feedback);
		}
		self.persist();
		Ok(())
	}

	pub async fn status(&self) -> Result<AiStatus, ApiError> {
		self.api.status().await
	}

	pub fn clear_history(&self) {
		self.history.borrow_mut().clear();
		self.persist();
	}

	fn persist(&self) {
		if let Err(err) = save_json(&self.store, HISTORY_KEY, &*self.history.borrow()) {
			warn!("chat history not saved: {err}");
		}
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use futures::executor::block_on;
	use futures::{pin_mut, poll};
	use pretty_assertions::assert_eq;
	use serde_json::{Value, json};

	use super::*;
	use crate::api::ApiClient;
	use crate::testing::{FakeClock, MemoryStore, MockTransport};

	type TestSession = ChatSession<ApiClient<Rc<MockTransport>>, Rc<FakeClock>, Rc<MemoryStore>>;

	struct Harness {
		transport: Rc<MockTransport>,
		clock: Rc<FakeClock>,
		store: Rc<MemoryStore>,
	}

	impl Harness {
		fn new() -> Self {
			Self {
				transport: Rc::new(MockTransport::default()),
				clock: Rc::new(FakeClock::default()),
				store: Rc::new(MemoryStore::default()),
			}
		}

		fn session(&self) -> TestSession {
			ChatSession::new(
				ApiClient::new(self.transport.clone(), "/api/kg/data", "/api/ai"),
				self.clock.clone(),
				self.store.clone(),
				RetryPolicy::default(),
			)
		}
	}

	#[test]
	fn logical_failure_is_retried_until_the_bound() {
		let h = Harness::new();
		let session = h.session();
		for _ in 0..4 {
			h.transport.respond(200, r#"{"success": false}"#);
		}

		let err = block_on(session.send("why?")).unwrap_err();
		assert!(matches!(err, ChatError::RetriesExhausted { attempts: 4, .. }));
		assert_eq!(h.transport.requests().len(), 4);
		assert_eq!(
			h.clock.sleeps(),
			vec![
				Duration::from_millis(1000),
				Duration::from_millis(2000),
				Duration::from_millis(4000)
			]
		);
		assert_eq!(session.state(), ChatState::Idle);
		assert!(session.history().is_empty());
	}

	#[test]
	fn retry_then_success_records_one_entry() {
		let h = Harness::new();
		let session = h.session();
		h.transport.respond(200, r#"{"success": false}"#);
		h.transport.respond(
			200,
			r#"{"success": true, "response": "42", "confidence": 0.9, "context": {"topic": "life"}}"#,
		);

		let entry = block_on(session.send("meaning")).unwrap();
		assert_eq!(entry.response, "42");
		assert_eq!(entry.context["topic"], "life");
		assert_eq!(h.transport.requests().len(), 2);
		assert_eq!(session.history().len(), 1);
	}

	#[test]
	fn transport_and_http_errors_are_not_retried() {
		let h = Harness::new();
		let session = h.session();
		h.transport.fail("offline");
		assert!(matches!(
			block_on(session.send("q")),
			Err(ChatError::Api(ApiError::Transport(_)))
		));
		h.transport.respond(503, "");
		assert!(matches!(
			block_on(session.send("q")),
			Err(ChatError::Api(ApiError::Http { status: 503, .. }))
		));
		assert_eq!(h.transport.requests().len(), 2);
		assert!(h.clock.sleeps().is_empty());
	}

	#[test]
	fn context_is_merged_and_sent_with_the_next_query() {
		let h = Harness::new();
		let session = h.session();
		h.transport.respond(200, r#"{"response": "a", "context": {"x": 1, "y": 1}}"#);
		h.transport.respond(200, r#"{"response": "b", "context": {"y": 2}}"#);
		h.transport.respond(200, r#"{"response": "c"}"#);

		block_on(session.send("one")).unwrap();
		block_on(session.send("two")).unwrap();
		block_on(session.send("three")).unwrap();

		assert_eq!(Value::Object(session.context()), json!({"x": 1, "y": 2}));
		let third: Value = serde_json::from_str(h.transport.requests()[2].body.as_deref().unwrap()).unwrap();
		assert_eq!(third, json!({"query": "three", "context": {"x": 1, "y": 2}}));
	}

	#[test]
	fn second_query_while_sending_is_rejected() {
		let h = Harness::new();
		let session = h.session();
		h.transport.respond(200, r#"{"response": "first"}"#);

		block_on(async {
			let first = session.send("first");
			pin_mut!(first);
			assert!(poll!(&mut first).is_pending());
			assert_eq!(session.state(), ChatState::Sending { attempt: 0 });
			assert!(matches!(session.send("second").await, Err(ChatError::Busy)));
			first.await.unwrap();
		});
		assert_eq!(h.transport.requests().len(), 1);
	}

	#[test]
	fn dropping_a_retrying_query_returns_to_idle() {
		let h = Harness::new();
		let session = h.session();
		h.transport.respond(200, r#"{"success": false}"#);

		block_on(async {
			let query = session.send("slow");
			pin_mut!(query);
			let _ = poll!(&mut query);
			let _ = poll!(&mut query);
		});
		assert!(matches!(session.state(), ChatState::Idle));
	}

	#[test]
	fn history_and_feedback_persist_across_sessions() {
		let h = Harness::new();
		let session = h.session();
		h.transport.respond(200, r#"{"response": "hello", "confidence": 0.5}"#);
		let entry = block_on(session.send("hi")).unwrap();

		h.transport.respond(200, r#"{"success": true}"#);
		block_on(session.submit_feedback(&entry.id, Feedback::Helpful)).unwrap();
		let sent: Value = serde_json::from_str(h.transport.requests()[1].body.as_deref().unwrap()).unwrap();
		assert_eq!(sent, json!({"feedback": "helpful", "query_id": entry.id}));

		let reloaded = h.session();
		let history = reloaded.history();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].feedback, Some(Feedback::Helpful));
		assert!(h.store.get(HISTORY_KEY).unwrap().contains("\"query\":\"hi\""));

		assert!(matches!(
			block_on(reloaded.submit_feedback("nope", Feedback::NotHelpful)),
			Err(ChatError::UnknownEntry(_))
		));
	}

	#[test]
	fn empty_query_is_rejected_locally() {
		let h = Harness::new();
		assert!(matches!(block_on(h.session().send("   ")), Err(ChatError::EmptyQuery)));
		assert!(h.transport.requests().is_empty());
	}
}
