//! Transient notifications.
//!
//! Every toast is an independent entry with its own expiry timer; dismissing
//! or expiring one never touches the others.

use std::time::Duration;

use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use log::{error, info, warn};

use crate::format::escape_html;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
	Success,
	Info,
	Warning,
	Error,
}

impl ToastLevel {
	pub fn class(self) -> &'static str {
		match self {
			Self::Success => "toast text-bg-success",
			Self::Info => "toast text-bg-info",
			Self::Warning => "toast text-bg-warning",
			Self::Error => "toast text-bg-danger",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
	pub id: u64,
	pub level: ToastLevel,
	pub title: String,
	pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct ToastQueue {
	next_id: u64,
	entries: Vec<Toast>,
}

impl ToastQueue {
	pub fn push(&mut self, level: ToastLevel, title: impl Into<String>, message: impl Into<String>) -> u64 {
		let id = self.next_id;
		self.next_id += 1;
		self.entries.push(Toast {
			id,
			level,
			title: title.into(),
			message: message.into(),
		});
		id
	}

	pub fn dismiss(&mut self, id: u64) -> bool {
		let before = self.entries.len();
		self.entries.retain(|t| t.id != id);
		self.entries.len() != before
	}

	pub fn entries(&self) -> &[Toast] {
		&self.entries
	}
}

/// Handle for raising toasts, shared through context.
#[derive(Clone, Copy)]
pub struct Notifier {
	queue: RwSignal<ToastQueue>,
	lifetime: Duration,
}

impl Notifier {
	pub fn new(lifetime: Duration) -> Self {
		Self {
			queue: RwSignal::new(ToastQueue::default()),
			lifetime,
		}
	}

	/// Creates a notifier and makes it available to every descendant.
	pub fn provide(lifetime: Duration) -> Self {
		let notifier = Self::new(lifetime);
		provide_context(notifier);
		notifier
	}

	pub fn notify(&self, level: ToastLevel, title: &str, message: &str) {
		match level {
			ToastLevel::Error => error!("{title}: {message}"),
			ToastLevel::Warning => warn!("{title}: {message}"),
			_ => info!("{title}: {message}"),
		}
		let Some(id) = self.queue.try_update(|q| q.push(level, title, message)) else {
			return;
		};
		let queue = self.queue;
		let millis = u32::try_from(self.lifetime.as_millis()).unwrap_or(u32::MAX);
		Timeout::new(millis, move || {
			let _ = queue.try_update(|q| q.dismiss(id));
		})
		.forget();
	}

	pub fn success(&self, message: &str) {
		self.notify(ToastLevel::Success, "Success", message);
	}

	pub fn info(&self, message: &str) {
		self.notify(ToastLevel::Info, "Info", message);
	}

	pub fn warning(&self, title: &str, message: &str) {
		self.notify(ToastLevel::Warning, title, message);
	}

	pub fn error(&self, message: &str) {
		self.notify(ToastLevel::Error, "Error", message);
	}

	pub fn dismiss(&self, id: u64) {
		let _ = self.queue.try_update(|q| q.dismiss(id));
	}

	pub fn entries(&self) -> Vec<Toast> {
		self.queue.with(|q| q.entries().to_vec())
	}
}

#[component]
pub fn ToastStack(notifier: Notifier) -> impl IntoView {
	view! {
		<div class="toast-container position-fixed bottom-0 end-0 p-3">
			<For
				each=move || notifier.entries()
				key=|toast| toast.id
				children=move |toast| {
					let id = toast.id;
					view! {
						<div class=toast.level.class() role="alert">
							<div class="toast-header">
								<strong class="me-auto" inner_html=escape_html(&toast.title)></strong>
								<button
									type="button"
									class="btn-close"
									aria-label="Close"
									on:click=move |_| notifier.dismiss(id)
								></button>
							</div>
							<div class="toast-body" inner_html=escape_html(&toast.message)></div>
						</div>
					}
				}
			/>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique_and_entries_ordered() {
		let mut queue = ToastQueue::default();
		let a = queue.push(ToastLevel::Info, "Info", "first");
		let b = queue.push(ToastLevel::Error, "Error", "second");
		assert_ne!(a, b);
		let messages: Vec<_> = queue.entries().iter().map(|t| t.message.as_str()).collect();
		assert_eq!(messages, ["first", "second"]);
	}

	#[test]
	fn dismiss_removes_only_its_entry() {
		let mut queue = ToastQueue::default();
		let a = queue.push(ToastLevel::Info, "Info", "a");
		let b = queue.push(ToastLevel::Info, "Info", "b");
		assert!(queue.dismiss(a));
		assert!(!queue.dismiss(a));
		assert_eq!(queue.entries().len(), 1);
		assert_eq!(queue.entries()[0].id, b);
	}

	#[test]
	fn ids_are_not_reused_after_dismissal() {
		let mut queue = ToastQueue::default();
		let a = queue.push(ToastLevel::Success, "Success", "saved");
		queue.dismiss(a);
		let b = queue.push(ToastLevel::Success, "Success", "saved again");
		assert!(b > a);
	}
}
