//! Knowledge-graph editor: canvas plus the forms that drive the view-model.

use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use super::force_graph::{CanvasData, ForceGraphCanvas};
use super::toast::Notifier;
use crate::api::{EntityRecord, NodeDetails};
use crate::dashboard::PanelState;
use crate::format::format_timestamp;
use crate::graph::{GraphEdge, GraphNode, LiveGraph, NodeKind, NodeUpdate};

fn observation_lines(raw: &str) -> Vec<String> {
	raw.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(String::from)
		.collect()
}

#[component]
fn KindOptions() -> impl IntoView {
	NodeKind::ALL
		.into_iter()
		.map(|kind| view! { <option value=kind.as_str()>{kind.as_str()}</option> })
		.collect_view()
}

#[component]
pub fn GraphPanel(vm: Rc<LiveGraph>) -> impl IntoView {
	let notifier = expect_context::<Notifier>();
	let snapshot = RwSignal::new(vm.snapshot());
	let last_update = RwSignal::new(vm.last_update());
	let load_state = RwSignal::new(PanelState::<usize>::Loading);
	let selection = RwSignal::new(None::<String>);
	let details = RwSignal::new(None::<NodeDetails>);
	let results = RwSignal::new(Vec::<EntityRecord>::new());

	let new_label = RwSignal::new(String::new());
	let new_kind = RwSignal::new(NodeKind::Default.as_str().to_owned());
	let new_observations = RwSignal::new(String::new());
	let edit_label = RwSignal::new(String::new());
	let edit_kind = RwSignal::new(NodeKind::Default.as_str().to_owned());
	let edge_from = RwSignal::new(String::new());
	let edge_to = RwSignal::new(String::new());
	let edge_label = RwSignal::new(String::new());
	let query = RwSignal::new(String::new());

	vm.subscribe(move |s| {
		snapshot.try_set(s.clone());
	});
	let vm = StoredValue::new_local(vm);

	let reload = move || {
		let vm = vm.get_value();
		load_state.set(PanelState::Loading);
		spawn_local(async move {
			let result = vm.load().await.map_err(|err| err.user_message());
			if let Err(message) = &result {
				notifier.error(message);
			}
			last_update.try_set(vm.last_update());
			load_state.try_set(PanelState::from_result(result));
		});
	};
	reload();

	Effect::new(move |_| {
		let vm = vm.get_value();
		let Some(id) = selection.get() else {
			vm.clear_selection();
			details.set(None);
			return;
		};
		if let Some(node) = snapshot.with_untracked(|s| s.node(&id).cloned()) {
			edit_label.set(node.label);
			edit_kind.set(node.kind.as_str().to_owned());
		}
		spawn_local(async move {
			let found = vm.select_node(&id).await;
			// a newer selection may have landed while this one was in flight
			if selection.try_get_untracked().flatten().as_deref() != Some(id.as_str()) {
				return;
			}
			match found {
				Ok(found) => {
					details.try_set(Some(found));
				}
				Err(err) => {
					details.try_set(None);
					notifier.error(&err.user_message());
				}
			}
		});
	});

	let create_node = move |_| {
		let vm = vm.get_value();
		let label = new_label.get_untracked();
		let kind = NodeKind::parse(&new_kind.get_untracked());
		let observations = observation_lines(&new_observations.get_untracked());
		spawn_local(async move {
			match vm.create_node(&label, kind, observations).await {
				Ok(id) => {
					notifier.success(&format!("Created node {}", label.trim()));
					new_label.try_set(String::new());
					new_observations.try_set(String::new());
					selection.try_set(Some(id));
				}
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let update_node = move |_| {
		let Some(id) = selection.get_untracked() else {
			return;
		};
		let vm = vm.get_value();
		let update = NodeUpdate {
			label: Some(edit_label.get_untracked()),
			kind: Some(NodeKind::parse(&edit_kind.get_untracked())),
		};
		spawn_local(async move {
			match vm.update_node(&id, update).await {
				Ok(()) => {
					notifier.success("Node updated");
					selection.try_set(vm.selected());
				}
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let delete_node = move |_| {
		let Some(id) = selection.get_untracked() else {
			return;
		};
		let vm = vm.get_value();
		spawn_local(async move {
			match vm.delete_node(&id).await {
				Ok(()) => {
					notifier.success("Node deleted");
					selection.try_set(None);
				}
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let create_edge = move |_| {
		let vm = vm.get_value();
		let (from, to, label) = (
			edge_from.get_untracked(),
			edge_to.get_untracked(),
			edge_label.get_untracked(),
		);
		if from.is_empty() || to.is_empty() {
			notifier.error("Pick both ends of the relation");
			return;
		}
		spawn_local(async move {
			match vm.create_edge(&from, &to, label.trim()).await {
				Ok(_) => {
					notifier.success("Relation created");
					edge_label.try_set(String::new());
				}
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let delete_edge = move |id: String| {
		let vm = vm.get_value();
		spawn_local(async move {
			match vm.delete_edge(&id).await {
				Ok(()) => notifier.success("Relation deleted"),
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let search = move |_| {
		let vm = vm.get_value();
		let q = query.get_untracked();
		spawn_local(async move {
			match vm.search(&q).await {
				Ok(found) => {
					results.try_set(found);
				}
				Err(err) => notifier.error(&err.user_message()),
			}
		});
	};

	let canvas_data = Signal::derive(move || snapshot.with(|s| CanvasData::from(s)));
	let nodes = move || snapshot.with(|s| s.nodes().to_vec());
	let selected_edges = move || {
		let Some(id) = selection.get() else {
			return Vec::new();
		};
		snapshot.with(|s| {
			s.edges()
				.iter()
				.filter(|e| e.touches(&id))
				.cloned()
				.collect::<Vec<_>>()
		})
	};

	view! {
		<div class="card graph-panel">
			<div class="card-header d-flex justify-content-between align-items-center">
				<h5 class="mb-0">"Knowledge Graph"</h5>
				<small class="text-muted">
					{move || snapshot.with(|s| format!("{} nodes, {} relations", s.nodes().len(), s.edges().len()))}
					{move || last_update.get().map(|ts| format!(" · updated {}", format_timestamp(&ts)))}
				</small>
				<button class="btn btn-sm btn-outline-secondary" on:click=move |_| reload()>"Refresh"</button>
			</div>
			<div class="card-body">
				{move || match load_state.get() {
					PanelState::Loading => view! { <div class="text-muted">"Loading graph..."</div> }.into_any(),
					PanelState::Failed(message) => view! {
						<div class="alert alert-danger">"Failed to load graph: " {message}</div>
					}.into_any(),
					PanelState::Ready(_) => ().into_any(),
				}}
				<div class="graph-canvas" style="height: 480px; position: relative;">
					<ForceGraphCanvas data=canvas_data selection=selection />
				</div>

				<div class="row mt-3">
					<div class="col-md-4">
						<h6>"Add node"</h6>
						<input class="form-control mb-1" placeholder="Label" bind:value=new_label />
						<select
							class="form-select mb-1"
							prop:value=move || new_kind.get()
							on:change=move |ev| new_kind.set(event_target_value(&ev))
						>
							<KindOptions />
						</select>
						<textarea
							class="form-control mb-1"
							placeholder="Observations, one per line"
							bind:value=new_observations
						></textarea>
						<button class="btn btn-primary btn-sm" on:click=create_node>"Add node"</button>
					</div>

					<div class="col-md-4">
						<h6>"Add relation"</h6>
						<select
							class="form-select mb-1"
							prop:value=move || edge_from.get()
							on:change=move |ev| edge_from.set(event_target_value(&ev))
						>
							<option value="">"From..."</option>
							<For each=nodes key=|n| n.id.clone() children=node_option />
						</select>
						<select
							class="form-select mb-1"
							prop:value=move || edge_to.get()
							on:change=move |ev| edge_to.set(event_target_value(&ev))
						>
							<option value="">"To..."</option>
							<For each=nodes key=|n| n.id.clone() children=node_option />
						</select>
						<input class="form-control mb-1" placeholder="Relation type" bind:value=edge_label />
						<button class="btn btn-primary btn-sm" on:click=create_edge>"Add relation"</button>
					</div>

					<div class="col-md-4">
						<h6>"Search"</h6>
						<div class="input-group mb-1">
							<input class="form-control" placeholder="Entity name" bind:value=query />
							<button class="btn btn-outline-primary" on:click=search>"Search"</button>
						</div>
						<ul class="list-group">
							<For
								each=move || results.get()
								key=|r| r.confirmed_id().to_owned()
								children=move |record: EntityRecord| {
									let id = record.confirmed_id().to_owned();
									view! {
										<li
											class="list-group-item list-group-item-action"
											on:click=move |_| selection.set(Some(id.clone()))
										>
											{record.name}
											<span class="badge bg-secondary ms-2">{record.entity_type}</span>
										</li>
									}
								}
							/>
						</ul>
					</div>
				</div>

				<Show when=move || selection.with(Option::is_some)>
					<div class="card mt-3 node-details">
						<div class="card-header d-flex justify-content-between">
							<span>"Selected: " {move || selection.get().unwrap_or_default()}</span>
							<button class="btn-close" on:click=move |_| selection.set(None)></button>
						</div>
						<div class="card-body">
							<div class="row g-1 mb-2">
								<div class="col">
									<input class="form-control form-control-sm" bind:value=edit_label />
								</div>
								<div class="col">
									<select
										class="form-select form-select-sm"
										prop:value=move || edit_kind.get()
										on:change=move |ev| edit_kind.set(event_target_value(&ev))
									>
										<KindOptions />
									</select>
								</div>
								<div class="col-auto">
									<button class="btn btn-sm btn-success" on:click=update_node>"Save"</button>
									<button class="btn btn-sm btn-danger ms-1" on:click=delete_node>"Delete"</button>
								</div>
							</div>
							{move || details.get().map(|d| view! {
								<h6>"Observations"</h6>
								<ul>{d.observations.into_iter().map(|o| view! { <li>{o}</li> }).collect_view()}</ul>
								<h6>"Relations"</h6>
								<ul>
									{d.relations.into_iter().map(|r| view! {
										<li>{r.from} " → " <em>{r.relation_type}</em> " → " {r.to}</li>
									}).collect_view()}
								</ul>
							})}
							<h6>"Edges in view"</h6>
							<ul class="list-group">
								<For
									each=selected_edges
									key=|e| e.id.clone()
									children=move |edge: GraphEdge| {
										let id = edge.id.clone();
										view! {
											<li class="list-group-item d-flex justify-content-between">
												<span>{edge.from} " → " {edge.label} " → " {edge.to}</span>
												<button
													class="btn btn-sm btn-outline-danger"
													on:click=move |_| delete_edge(id.clone())
												>"Remove"</button>
											</li>
										}
									}
								/>
							</ul>
						</div>
					</div>
				</Show>
			</div>
		</div>
	}
}

fn node_option(node: GraphNode) -> impl IntoView {
	view! { <option value=node.id>{node.label}</option> }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn observations_skip_blank_lines() {
		assert_eq!(
			observation_lines("parses tokens\n\n  emits ast  \n"),
			vec!["parses tokens".to_owned(), "emits ast".to_owned()]
		);
	}
}
