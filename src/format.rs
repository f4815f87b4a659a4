//! Escaping and display formatting shared by the panels.

/// Escapes the five markup-significant characters so `raw` can be placed
/// inside `inner_html` or an attribute value.
pub fn escape_html(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len() + raw.len() / 8);
	for c in raw.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#039;"),
			_ => out.push(c),
		}
	}
	out
}

/// Escaped text with line breaks turned into `<br>`.
pub fn multiline_markup(text: &str) -> String {
	escape_html(text).replace("\r\n", "\n").replace('\n', "<br>")
}

/// Health scores are shown as whole numbers.
pub fn format_score(score: f64) -> String {
	if score.is_finite() {
		format!("{}", score.round() as i64)
	} else {
		"?".into()
	}
}

/// `0.875` -> `"87.5%"`. Values outside `[0, 1]` are clamped.
pub fn format_confidence(confidence: f64) -> String {
	let c = if confidence.is_nan() {
		0.0
	} else {
		confidence.clamp(0.0, 1.0)
	};
	format!("{:.1}%", c * 100.0)
}

/// Badge class for a health score.
pub fn health_class(score: f64) -> &'static str {
	if score >= 90.0 {
		"bg-success"
	} else if score >= 70.0 {
		"bg-warning"
	} else {
		"bg-danger"
	}
}

/// Badge class for a rule or engine status string.
pub fn status_class(status: &str) -> &'static str {
	match status {
		"operational" | "active" => "bg-success",
		"inactive" | "disabled" => "bg-secondary",
		_ => "bg-warning",
	}
}

/// Renders an ISO-8601 or epoch-millisecond timestamp in the browser locale.
/// Falls back to the raw text when the browser cannot parse it.
pub fn format_timestamp(raw: &str) -> String {
	let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_str(raw));
	if date.get_time().is_nan() {
		raw.to_owned()
	} else {
		String::from(date.to_locale_string("default", &wasm_bindgen::JsValue::UNDEFINED))
	}
}

/// Same as [`format_timestamp`] for milliseconds since the epoch.
pub fn format_epoch_ms(ms: f64) -> String {
	let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms));
	String::from(date.to_locale_string("default", &wasm_bindgen::JsValue::UNDEFINED))
}
