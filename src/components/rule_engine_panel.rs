use std::rc::Rc;

use leptos::prelude::*;
use serde_json::{Map, Value};
use wasm_bindgen_futures::spawn_local;

use super::toast::Notifier;
use crate::api::{AiApi, LiveApi, RuleEngineStatus, StatusApi};
use crate::dashboard::PanelState;
use crate::format::{format_timestamp, status_class};

/// Blank input means an empty context.
fn parse_context(raw: &str) -> Result<Map<String, Value>, serde_json::Error> {
	if raw.trim().is_empty() {
		return Ok(Map::new());
	}
	serde_json::from_str(raw)
}

#[component]
pub fn RuleEnginePanel(
	#[prop(into)] state: Signal<PanelState<RuleEngineStatus>>,
	api: Rc<LiveApi>,
) -> impl IntoView {
	let notifier = expect_context::<Notifier>();
	let api = StoredValue::new_local(api);
	let trigger = RwSignal::new(String::new());
	let context = RwSignal::new(String::new());
	let result = RwSignal::new(None::<String>);
	let description = RwSignal::new(String::new());
	let draft = RwSignal::new(None::<String>);
	let drafting = RwSignal::new(false);

	let fire = move |_| {
		let name = trigger.get_untracked().trim().to_owned();
		if name.is_empty() {
			notifier.error("Trigger name is required");
			return;
		}
		let ctx = match parse_context(&context.get_untracked()) {
			Ok(ctx) => ctx,
			Err(err) => {
				notifier.error(&format!("Context must be a JSON object: {err}"));
				return;
			}
		};
		let api = api.get_value();
		spawn_local(async move {
			match api.trigger_rule(&name, &ctx).await {
				Ok(value) => {
					let shown = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
					result.try_set(Some(shown));
					notifier.success(&format!("Trigger {name} fired"));
				}
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let generate = move |_| {
		let text = description.get_untracked().trim().to_owned();
		if text.is_empty() {
			notifier.error("Describe the rule to generate");
			return;
		}
		let api = api.get_value();
		drafting.set(true);
		spawn_local(async move {
			match api.generate_rule(&text).await {
				Ok(rule) => {
					let shown = serde_json::to_string_pretty(&rule).unwrap_or_else(|_| rule.to_string());
					draft.try_set(Some(shown));
					notifier.success("Rule generated");
				}
				Err(err) => notifier.error(&err.user_message()),
			}
			drafting.try_set(false);
		});
	};

	view! {
		<div class="card rule-engine-panel">
			<div class="card-header">
				<h5 class="mb-0">"Rule Engine"</h5>
			</div>
			<div class="card-body" id="rule-engine-status">
				{move || match state.get() {
					PanelState::Loading => view! { <div class="text-muted">"Loading..."</div> }.into_any(),
					PanelState::Failed(message) => view! {
						<div class="alert alert-danger">"Rule engine status unavailable: " {message}</div>
					}.into_any(),
					PanelState::Ready(status) => view! {
						<div class="d-flex justify-content-between align-items-center mb-3">
							<h6 class="mb-0">"Status: " {status.status.clone()}</h6>
							<span class=format!("badge {}", status_class(&status.status))>{status.status.clone()}</span>
						</div>
						<div class="table-responsive">
							<table class="table table-sm">
								<thead>
									<tr><th>"Rule ID"</th><th>"Name"</th><th>"Status"</th></tr>
								</thead>
								<tbody>
									{status.active_rules.into_iter().map(|rule| {
										let badge = format!("badge {}", status_class(&rule.status));
										view! {
											<tr>
												<td>{rule.id}</td>
												<td>{rule.name}</td>
												<td><span class=badge>{rule.status}</span></td>
											</tr>
										}
									}).collect_view()}
								</tbody>
							</table>
						</div>
						{status.last_update.map(|ts| view! {
							<small class="text-muted">"Last updated: " {format_timestamp(&ts)}</small>
						})}
					}.into_any(),
				}}

				<hr />
				<h6>"Fire trigger"</h6>
				<input class="form-control mb-1" placeholder="Trigger name" bind:value=trigger />
				<textarea class="form-control mb-1" placeholder="Context (JSON object)" bind:value=context></textarea>
				<button class="btn btn-sm btn-primary" on:click=fire>"Fire"</button>
				{move || result.get().map(|shown| view! { <pre class="mt-2 mb-0">{shown}</pre> })}

				<hr />
				<h6>"Generate rule"</h6>
				<textarea class="form-control mb-1" placeholder="Describe the rule" bind:value=description></textarea>
				<button class="btn btn-sm btn-outline-primary" on:click=generate disabled=move || drafting.get()>
					{move || if drafting.get() { "Generating..." } else { "Generate" }}
				</button>
				{move || draft.get().map(|shown| view! { <pre class="mt-2 mb-0">{shown}</pre> })}
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blank_context_is_empty_object() {
		assert!(parse_context("  ").unwrap().is_empty());
	}

	#[test]
	fn context_must_be_an_object() {
		assert!(parse_context("[1, 2]").is_err());
		let ctx = parse_context(r#"{"file": "main.rs"}"#).unwrap();
		assert_eq!(ctx.get("file"), Some(&Value::from("main.rs")));
	}
}
