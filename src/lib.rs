//! Leptos client-side dashboard for a rule-engine knowledge graph.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
mod api;
mod chat;
mod clock;
mod components;
mod config;
mod dashboard;
mod format;
mod graph;
mod pages;
mod settings;
mod storage;
#[cfg(test)]
mod testing;

// Top-Level pages
use crate::components::toast::{Notifier, ToastStack};
use crate::config::AppConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;
use crate::settings::DashboardSettings;
use crate::storage::BrowserStore;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Provides config, settings and the toast surface, then routes to the
/// dashboard or a 404 page.
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	let config = AppConfig::from_document();
	let notifier = Notifier::provide(config.toast_lifetime);
	let settings = RwSignal::new(DashboardSettings::load(&BrowserStore));
	provide_context(config);
	provide_context(settings);

	view! {
		<Html
			attr:lang="en"
			attr:dir="ltr"
			attr:data-theme=move || settings.with(|s| s.theme.as_str())
		/>

		// sets the document title
		<Title text="Rule Engine Dashboard" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
		<ToastStack notifier=notifier />
	}
}
