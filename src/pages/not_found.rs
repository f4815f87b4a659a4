use leptos::prelude::*;

/// 404 - Not Found
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<div class="container py-5">
			<h1>"Page not found"</h1>
			<a href="/">"Back to the dashboard"</a>
		</div>
	}
}
