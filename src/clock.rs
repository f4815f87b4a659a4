use std::future::Future;
use std::time::Duration;

/// Time source for the poller and chat retries.
pub trait Clock {
	fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;

	/// Milliseconds since the Unix epoch.
	fn now_ms(&self) -> f64;
}

/// `setTimeout`-backed clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
	fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
		gloo_timers::future::sleep(duration)
	}

	fn now_ms(&self) -> f64 {
		js_sys::Date::now()
	}
}
