use std::rc::Rc;

use futures::future::AbortHandle;
use leptos::prelude::*;
use log::info;

use crate::api::{HealthReport, RuleEngineStatus, live_client};
use crate::chat::ChatSession;
use crate::clock::BrowserClock;
use crate::components::chat_panel::ChatPanel;
use crate::components::graph_panel::GraphPanel;
use crate::components::health_panel::HealthPanel;
use crate::components::rule_engine_panel::RuleEnginePanel;
use crate::components::settings_panel::SettingsPanel;
use crate::components::toast::Notifier;
use crate::config::AppConfig;
use crate::dashboard::{PanelState, PollEvent, Poller};
use crate::format::format_score;
use crate::graph::GraphViewModel;
use crate::settings::DashboardSettings;
use crate::storage::BrowserStore;

/// The dashboard. Builds the view-model, chat session and poller from the
/// app config and hands them to the panels that use them.
#[component]
pub fn Home() -> impl IntoView {
	let config = expect_context::<AppConfig>();
	let settings = expect_context::<RwSignal<DashboardSettings>>();
	let notifier = expect_context::<Notifier>();

	let graph = Rc::new(GraphViewModel::new(live_client(&config)));
	let chat = Rc::new(ChatSession::new(
		live_client(&config),
		BrowserClock,
		BrowserStore,
		config.chat_retry,
	));
	let api = Rc::new(live_client(&config));

	let health = RwSignal::new(PanelState::<HealthReport>::Loading);
	let rules = RwSignal::new(PanelState::<RuleEngineStatus>::Loading);
	let poller = StoredValue::new(None::<AbortHandle>);
	let threshold = config.health_warning_threshold;

	// restart polling whenever settings change
	Effect::new(move |_| {
		let current = settings.get();
		if let Some(previous) = poller.try_update_value(Option::take).flatten() {
			info!("settings changed, restarting poller");
			previous.abort();
		}
		let notify = current.notifications_enabled;
		let sink = move |event: PollEvent| match event {
			PollEvent::Health(result) => {
				if let Ok(report) = &result {
					if notify && report.score < threshold {
						notifier.warning(
							"Health Warning",
							&format!("System health score is {}", format_score(report.score)),
						);
					}
				}
				health.try_set(PanelState::from_result(result));
			}
			PollEvent::RuleEngine(result) => {
				rules.try_set(PanelState::from_result(result));
			}
		};
		let handle =
			Poller::new(live_client(&config), BrowserClock, current.refresh_interval()).spawn(sink);
		poller.set_value(Some(handle));
	});

	on_cleanup(move || {
		if let Some(handle) = poller.try_update_value(Option::take).flatten() {
			handle.abort();
		}
	});

	view! {
		<div class="container-fluid py-3 dashboard">
			<div class="row g-3">
				<div class="col-lg-8">
					<GraphPanel vm=graph />
				</div>
				<div class="col-lg-4 d-flex flex-column gap-3">
					<HealthPanel state=health />
					<RuleEnginePanel state=rules api=api />
					<SettingsPanel settings=settings />
				</div>
				<div class="col-12">
					<ChatPanel session=chat />
				</div>
			</div>
		</div>
	}
}
