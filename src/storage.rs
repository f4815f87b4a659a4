//! Local persistence for settings and chat history.
//!
//! Values are whole JSON blobs stored under fixed keys and overwritten on
//! every save.

use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
	#[error("local storage is unavailable")]
	Unavailable,
	#[error("failed to write `{key}` to local storage")]
	Write { key: String },
	#[error("stored value under `{key}` is malformed: {source}")]
	Malformed {
		key: String,
		#[source]
		source: serde_json::Error,
	},
	#[error("failed to encode value for `{key}`: {source}")]
	Encode {
		key: String,
		#[source]
		source: serde_json::Error,
	},
}

pub trait KeyValueStore {
	fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
	fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStore;

impl BrowserStore {
	fn storage() -> Result<web_sys::Storage, StorageError> {
		web_sys::window()
			.and_then(|w| w.local_storage().ok().flatten())
			.ok_or(StorageError::Unavailable)
	}
}

impl KeyValueStore for BrowserStore {
	fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
		Self::storage()?
			.get_item(key)
			.map_err(|_| StorageError::Unavailable)
	}

	fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
		Self::storage()?
			.set_item(key, value)
			.map_err(|_| StorageError::Write { key: key.into() })
	}
}

pub fn load_json<T: DeserializeOwned>(
	store: &impl KeyValueStore,
	key: &str,
) -> Result<Option<T>, StorageError> {
	let Some(raw) = store.load(key)? else {
		return Ok(None);
	};
	serde_json::from_str(&raw)
		.map(Some)
		.map_err(|source| StorageError::Malformed {
			key: key.into(),
			source,
		})
}

pub fn save_json<T: Serialize + ?Sized>(
	store: &impl KeyValueStore,
	key: &str,
	value: &T,
) -> Result<(), StorageError> {
	let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
		key: key.into(),
		source,
	})?;
	debug!("saving {} bytes under {key}", raw.len());
	store.save(key, &raw)
}
