use serde::Serialize;
use serde_json::{Map, Value};

/// Error reported to clients for any stdout that breaks the plugin contract.
/// The specific reason is only logged.
pub const INVALID_OUTPUT: &str = "Invalid plugin output format";

/// One plugin's report. Failures use the same shape with `error` set and no
/// widgets, so consumers never special-case them.
///
/// A valid result keeps the exact object the plugin printed and serializes
/// it as is: key order, unknown fields and an explicit `"error": null` all
/// survive. Accessors read through to that object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PluginResult(Map<String, Value>);

impl PluginResult {
    pub fn failure(title: impl Into<String>, error: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title.into()));
        fields.insert("widgets".into(), Value::Array(Vec::new()));
        fields.insert("error".into(), Value::String(error.into()));
        Self(fields)
    }

    /// Wrap an object that already passed [`crate::validate`].
    pub(crate) fn from_validated(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn title(&self) -> &str {
        self.0.get("title").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn widgets(&self) -> Vec<Widget<'_>> {
        self.0
            .get("widgets")
            .and_then(Value::as_array)
            .map(|widgets| widgets.iter().filter_map(Widget::from_value).collect())
            .unwrap_or_default()
    }

    /// `None` when the plugin omitted `error` or set it to null.
    pub fn error(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    /// Any top-level field, including ones outside the contract.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// A display unit. `kind` is an opaque discriminator (`metric_card`,
/// `action_button`, ...) interpreted only by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Widget<'a> {
    pub kind: &'a str,
    pub data: &'a Map<String, Value>,
    fields: &'a Map<String, Value>,
}

impl<'a> Widget<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            kind: fields.get("type")?.as_str()?,
            data: fields.get("data")?.as_object()?,
            fields,
        })
    }

    /// Any widget field, e.g. a layout hint like `gridWidth`.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }
}
