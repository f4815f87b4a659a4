use leptos::prelude::*;

use crate::api::HealthReport;
use crate::dashboard::PanelState;
use crate::format::{format_score, format_timestamp, health_class};

#[component]
pub fn HealthPanel(#[prop(into)] state: Signal<PanelState<HealthReport>>) -> impl IntoView {
	view! {
		<div class="card health-panel">
			<div class="card-header d-flex justify-content-between align-items-center">
				<h5 class="mb-0">"System Health"</h5>
				{move || match state.get() {
					PanelState::Ready(report) => view! {
						<span id="health-score" class=format!("badge {}", health_class(report.score))>
							{format_score(report.score)}
						</span>
					}.into_any(),
					_ => ().into_any(),
				}}
			</div>
			<div class="card-body">
				{move || match state.get() {
					PanelState::Loading => view! { <div class="text-muted">"Loading..."</div> }.into_any(),
					PanelState::Failed(message) => view! {
						<div class="alert alert-danger mb-0">"Health check failed: " {message}</div>
					}.into_any(),
					PanelState::Ready(report) => view! {
						<div class="list-group">
							{report.components.into_iter().map(|(name, info)| view! {
								<div class="list-group-item">
									<div class="d-flex justify-content-between align-items-center">
										<h6 class="mb-0">{name}</h6>
										<span class=format!("badge {}", health_class(info.score))>
											{format_score(info.score)}
										</span>
									</div>
									<small class="text-muted">{info.message}</small>
								</div>
							}).collect_view()}
						</div>
						{report.timestamp.map(|ts| view! {
							<small class="text-muted mt-2 d-block">"Last updated: " {format_timestamp(&ts)}</small>
						})}
					}.into_any(),
				}}
			</div>
		</div>
	}
}
