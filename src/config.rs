//! Static application configuration.
//!
//! Defaults target a backend served from the same origin. Any value can be
//! overridden by a `<meta name="kg-…" content="…">` tag in `index.html`, which
//! lets one build talk to backends mounted under different prefixes.

use std::time::Duration;

use log::info;

pub const META_API_BASE: &str = "kg-api-base";
pub const META_GRAPH_PATH: &str = "kg-graph-path";
pub const META_AI_PREFIX: &str = "kg-ai-prefix";
pub const META_MAX_RETRIES: &str = "kg-max-retries";

/// Bounded exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_retries: u32,
	pub base_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::from_millis(1000),
		}
	}
}

impl RetryPolicy {
	/// Delay before retry number `attempt + 1` (`attempt` counts from zero).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		self.base_delay
			.saturating_mul(2u32.saturating_pow(attempt.min(16)))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	/// Prepended to every request path. Empty means same origin.
	pub api_base: String,
	/// `/api/kg/data` or the older `/api/kg/visualize`.
	pub graph_data_path: String,
	pub ai_prefix: String,
	pub chat_retry: RetryPolicy,
	pub toast_lifetime: Duration,
	/// Health scores below this raise a warning toast.
	pub health_warning_threshold: f64,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base: String::new(),
			graph_data_path: "/api/kg/data".into(),
			ai_prefix: "/api/ai".into(),
			chat_retry: RetryPolicy::default(),
			toast_lifetime: Duration::from_secs(5),
			health_warning_threshold: 70.0,
		}
	}
}

impl AppConfig {
	/// Defaults overridden by the page's `<meta>` tags.
	pub fn from_document() -> Self {
		let document = web_sys::window().and_then(|w| w.document());
		let config = Self::default().with_overrides(|name| {
			let doc = document.as_ref()?;
			let el = doc
				.query_selector(&format!("meta[name=\"{name}\"]"))
				.ok()
				.flatten()?;
			el.get_attribute("content")
		});
		info!(
			"config: api_base={:?} graph={} ai={}",
			config.api_base, config.graph_data_path, config.ai_prefix
		);
		config
	}

	pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		let lookup = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		if let Some(base) = lookup(META_API_BASE) {
			self.api_base = base.trim_end_matches('/').to_owned();
		}
		if let Some(path) = lookup(META_GRAPH_PATH) {
			self.graph_data_path = path;
		}
		if let Some(prefix) = lookup(META_AI_PREFIX) {
			self.ai_prefix = prefix.trim_end_matches('/').to_owned();
		}
		if let Some(retries) = lookup(META_MAX_RETRIES).and_then(|v| v.parse().ok()) {
			self.chat_retry.max_retries = retries;
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_from_base() {
		let policy = RetryPolicy::default();
		let delays: Vec<_> = (0..4).map(|a| policy.delay_for(a).as_millis()).collect();
		assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
	}

	#[test]
	fn overrides_apply_and_blank_values_are_ignored() {
		let config = AppConfig::default().with_overrides(|name| match name {
			META_API_BASE => Some("http://localhost:5000/".into()),
			META_AI_PREFIX => Some("/ai/".into()),
			META_GRAPH_PATH => Some("   ".into()),
			META_MAX_RETRIES => Some("5".into()),
			_ => None,
		});
		assert_eq!(config.api_base, "http://localhost:5000");
		assert_eq!(config.ai_prefix, "/ai");
		assert_eq!(config.graph_data_path, "/api/kg/data");
		assert_eq!(config.chat_retry.max_retries, 5);
	}
}
