use leptos::prelude::*;

use super::toast::Notifier;
use crate::settings::{DashboardSettings, Theme, parse_refresh_interval};
use crate::storage::BrowserStore;

#[component]
pub fn SettingsPanel(settings: RwSignal<DashboardSettings>) -> impl IntoView {
	let notifier = expect_context::<Notifier>();
	let current = settings.get_untracked();
	let theme = RwSignal::new(current.theme.as_str().to_owned());
	let interval = RwSignal::new(current.refresh_interval_seconds.to_string());
	let notifications = RwSignal::new(current.notifications_enabled);

	let save = move |_| {
		let Some(refresh_interval_seconds) = parse_refresh_interval(&interval.get_untracked()) else {
			notifier.error("Refresh interval must be a positive number of seconds");
			return;
		};
		let next = DashboardSettings {
			theme: Theme::parse(&theme.get_untracked()).unwrap_or_default(),
			refresh_interval_seconds,
			notifications_enabled: notifications.get_untracked(),
		};
		if let Err(err) = next.save(&BrowserStore) {
			notifier.error(&format!("Settings not saved: {err}"));
			return;
		}
		settings.set(next);
		notifier.success("Settings saved successfully");
	};

	view! {
		<div class="card settings-panel">
			<div class="card-header">
				<h5 class="mb-0">"Settings"</h5>
			</div>
			<div class="card-body">
				<label class="form-label" for="theme-select">"Theme"</label>
				<select
					id="theme-select"
					class="form-select mb-2"
					prop:value=move || theme.get()
					on:change=move |ev| theme.set(event_target_value(&ev))
				>
					{Theme::ALL
						.into_iter()
						.map(|t| view! { <option value=t.as_str()>{t.as_str()}</option> })
						.collect_view()}
				</select>
				<label class="form-label" for="refresh-interval">"Refresh interval (seconds)"</label>
				<input id="refresh-interval" type="number" min="1" class="form-control mb-2" bind:value=interval />
				<div class="form-check mb-2">
					<input
						id="notifications-enabled"
						type="checkbox"
						class="form-check-input"
						bind:checked=notifications
					/>
					<label class="form-check-label" for="notifications-enabled">"Health notifications"</label>
				</div>
				<button class="btn btn-primary" on:click=save>"Save"</button>
			</div>
		</div>
	}
}
