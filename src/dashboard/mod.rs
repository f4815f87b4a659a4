//! Periodically refreshed status panels.

mod poller;

pub use poller::{PollEvent, Poller};

/// What a panel currently shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PanelState<T> {
	#[default]
	Loading,
	Ready(T),
	Failed(String),
}

impl<T> PanelState<T> {
	pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
		match result {
			Ok(value) => PanelState::Ready(value),
			Err(err) => PanelState::Failed(err.to_string()),
		}
	}
}
