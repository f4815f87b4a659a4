//! User-editable dashboard settings, persisted in local storage.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StorageError, load_json, save_json};

pub const SETTINGS_KEY: &str = "dashboardSettings";
pub const DEFAULT_REFRESH_SECONDS: u32 = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
	#[default]
	Light,
	Dark,
}

impl Theme {
	pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

	pub fn as_str(self) -> &'static str {
		match self {
			Theme::Light => "light",
			Theme::Dark => "dark",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|t| t.as_str() == value)
	}
}

/// Stored fields are merged over the defaults, so blobs written by older
/// builds (or partially hand-edited) still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
	pub theme: Theme,
	#[serde(rename = "refreshInterval", alias = "refreshIntervalSeconds")]
	pub refresh_interval_seconds: u32,
	pub notifications_enabled: bool,
}

impl Default for DashboardSettings {
	fn default() -> Self {
		Self {
			theme: Theme::Light,
			refresh_interval_seconds: DEFAULT_REFRESH_SECONDS,
			notifications_enabled: true,
		}
	}
}

impl DashboardSettings {
	/// Never fails: a missing or unreadable blob yields the defaults.
	pub fn load(store: &impl KeyValueStore) -> Self {
		match load_json::<Self>(store, SETTINGS_KEY) {
			Ok(Some(settings)) => settings.normalized(),
			Ok(None) => Self::default(),
			Err(err) => {
				warn!("ignoring stored settings: {err}");
				Self::default()
			}
		}
	}

	pub fn save(&self, store: &impl KeyValueStore) -> Result<(), StorageError> {
		save_json(store, SETTINGS_KEY, self)
	}

	pub fn refresh_interval(&self) -> Duration {
		Duration::from_secs(u64::from(self.refresh_interval_seconds.max(1)))
	}

	fn normalized(mut self) -> Self {
		if self.refresh_interval_seconds == 0 {
			self.refresh_interval_seconds = DEFAULT_REFRESH_SECONDS;
		}
		self
	}
}

/// Parses the refresh-interval form field; the interval must be a positive
/// whole number of seconds.
pub fn parse_refresh_interval(input: &str) -> Option<u32> {
	input.trim().parse::<u32>().ok().filter(|s| *s > 0)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::testing::MemoryStore;

	#[test]
	fn first_load_uses_defaults() {
		let store = MemoryStore::default();
		assert_eq!(DashboardSettings::load(&store), DashboardSettings::default());
	}

	#[test]
	fn saved_settings_survive_a_reload() {
		let store = MemoryStore::default();
		let settings = DashboardSettings {
			theme: Theme::Dark,
			refresh_interval_seconds: 60,
			notifications_enabled: false,
		};
		settings.save(&store).unwrap();

		assert_eq!(DashboardSettings::load(&store), settings);
	}

	#[test]
	fn partial_blob_is_merged_over_defaults() {
		let store = MemoryStore::with_entry(SETTINGS_KEY, r#"{"theme":"dark"}"#);
		let settings = DashboardSettings::load(&store);
		assert_eq!(settings.theme, Theme::Dark);
		assert_eq!(settings.refresh_interval_seconds, DEFAULT_REFRESH_SECONDS);
		assert!(settings.notifications_enabled);
	}

	#[test]
	fn alias_and_zero_interval() {
		let store = MemoryStore::with_entry(SETTINGS_KEY, r#"{"refreshIntervalSeconds":0}"#);
		assert_eq!(
			DashboardSettings::load(&store).refresh_interval_seconds,
			DEFAULT_REFRESH_SECONDS
		);
	}

	#[test]
	fn malformed_blob_falls_back_to_defaults() {
		let store = MemoryStore::with_entry(SETTINGS_KEY, "{not json");
		assert_eq!(DashboardSettings::load(&store), DashboardSettings::default());
	}

	#[test]
	fn refresh_interval_input() {
		assert_eq!(parse_refresh_interval(" 45 "), Some(45));
		assert_eq!(parse_refresh_interval("0"), None);
		assert_eq!(parse_refresh_interval("-3"), None);
		assert_eq!(parse_refresh_interval("soon"), None);
	}
}
