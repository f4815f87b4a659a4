//! AI query panel: history, model indicator and the query box.

use std::rc::Rc;

use futures::future::{AbortHandle, Aborted, abortable};
use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen_futures::spawn_local;

use super::toast::Notifier;
use crate::api::Feedback;
use crate::chat::{ChatEntry, ChatState, LiveChat};
use crate::format::{format_confidence, format_epoch_ms, multiline_markup};

fn state_label(state: ChatState) -> Option<String> {
	match state {
		ChatState::Idle => None,
		ChatState::Sending { attempt: 0 } => Some("Thinking...".into()),
		ChatState::Sending { attempt } => Some(format!("Retrying (attempt {})...", attempt + 1)),
		ChatState::Retrying { delay, .. } => {
			Some(format!("Backend busy, retrying in {:.0}s", delay.as_secs_f64()))
		}
	}
}

#[component]
pub fn ChatPanel(session: Rc<LiveChat>) -> impl IntoView {
	let notifier = expect_context::<Notifier>();
	let history = RwSignal::new(session.history());
	let state = RwSignal::new(session.state());
	let model_loaded = RwSignal::new(None::<bool>);
	let query = RwSignal::new(String::new());
	let in_flight = StoredValue::new(None::<AbortHandle>);

	session.on_state_change(move |s| {
		state.try_set(s);
	});
	let session = StoredValue::new_local(session);

	{
		let session = session.get_value();
		spawn_local(async move {
			match session.status().await {
				Ok(status) => {
					model_loaded.try_set(Some(status.model_loaded));
				}
				Err(err) => warn!("AI status unavailable: {err}"),
			}
		});
	}

	on_cleanup(move || {
		if let Some(handle) = in_flight.try_update_value(Option::take).flatten() {
			info!("chat panel closed, cancelling in-flight query");
			handle.abort();
		}
	});

	let send = move || {
		let text = query.get_untracked();
		if text.trim().is_empty() {
			return;
		}
		let session = session.get_value();
		let (task, handle) = abortable(async move {
			let result = session.send(&text).await;
			(session, result)
		});
		in_flight.set_value(Some(handle));
		spawn_local(async move {
			match task.await {
				Ok((session, Ok(_))) => {
					query.try_set(String::new());
					history.try_set(session.history());
				}
				Ok((_, Err(err))) => notifier.error(&err.to_string()),
				Err(Aborted) => return,
			}
			in_flight.try_set_value(None);
		});
	};

	let feedback = move |entry_id: String, value: Feedback| {
		let session = session.get_value();
		spawn_local(async move {
			match session.submit_feedback(&entry_id, value).await {
				Ok(()) => {
					history.try_set(session.history());
					notifier.success("Thanks for the feedback");
				}
				Err(err) => notifier.error(&err.to_string()),
			}
		});
	};

	let clear = move |_| {
		session.get_value().clear_history();
		history.set(Vec::new());
		notifier.info("Chat history cleared");
	};

	let busy = move || state.get() != ChatState::Idle;

	view! {
		<div class="card chat-panel">
			<div class="card-header d-flex justify-content-between align-items-center">
				<h5 class="mb-0">"AI Assistant"</h5>
				<span class=move || match model_loaded.get() {
					Some(true) => "badge bg-success",
					Some(false) => "badge bg-danger",
					None => "badge bg-secondary",
				}>
					{move || match model_loaded.get() {
						Some(true) => "Model loaded",
						Some(false) => "Model not loaded",
						None => "Status unknown",
					}}
				</span>
			</div>
			<div class="card-body chat-history" style="max-height: 420px; overflow-y: auto;">
				<For
					each=move || history.get()
					key=|entry| (entry.id.clone(), entry.feedback)
					children=move |entry: ChatEntry| {
						let (up, down) = (entry.id.clone(), entry.id.clone());
						let rated = entry.feedback.is_some();
						view! {
							<div class="chat-entry mb-3">
								<div class="chat-query"><strong>"You: "</strong>{entry.query}</div>
								<div class="chat-response" inner_html=multiline_markup(&entry.response)></div>
								<small class="text-muted">
									{format_epoch_ms(entry.timestamp)}
									" · confidence " {format_confidence(entry.confidence)}
								</small>
								<div class="btn-group btn-group-sm ms-2">
									<button
										class="btn btn-outline-success"
										disabled=rated
										on:click=move |_| feedback(up.clone(), Feedback::Helpful)
									>{Feedback::Helpful.label()}</button>
									<button
										class="btn btn-outline-danger"
										disabled=rated
										on:click=move |_| feedback(down.clone(), Feedback::NotHelpful)
									>{Feedback::NotHelpful.label()}</button>
								</div>
							</div>
						}
					}
				/>
			</div>
			<div class="card-footer">
				{move || state_label(state.get()).map(|label| view! { <div class="text-muted small mb-1">{label}</div> })}
				<div class="input-group">
					<textarea
						class="form-control"
						placeholder="Ask about your rules or code..."
						bind:value=query
						prop:disabled=busy
					></textarea>
					<button class="btn btn-primary" disabled=busy on:click=move |_| send()>"Send"</button>
					<button class="btn btn-outline-secondary" on:click=clear>"Clear"</button>
				</div>
			</div>
		</div>
	}
}
