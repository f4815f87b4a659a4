//! AI chat session: bounded retries, merged context, persisted history.

mod session;

pub use session::{ChatEntry, ChatSession, ChatState};

use crate::api::LiveApi;
use crate::clock::BrowserClock;
use crate::storage::BrowserStore;

pub type LiveChat = ChatSession<LiveApi, BrowserClock, BrowserStore>;
