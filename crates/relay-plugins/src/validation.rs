use serde_json::Value;
use thiserror::Error;

use crate::output::PluginResult;

/// Which rule of the plugin output contract was broken. Only used for logs;
/// clients always see [`crate::INVALID_OUTPUT`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("output is not a JSON object")]
    NotAnObject,

    #[error("`title` must be a non-empty string")]
    InvalidTitle,

    #[error("`widgets` must be an array")]
    InvalidWidgets,

    #[error("widget {index} must be an object")]
    WidgetNotAnObject { index: usize },

    #[error("widget {index} is missing a non-empty string `type`")]
    InvalidWidgetType { index: usize },

    #[error("widget {index} is missing an object `data`")]
    InvalidWidgetData { index: usize },

    #[error("`error` must be a string when present")]
    InvalidError,
}

/// Check `raw` against the plugin output contract. Rules are checked in
/// order and the first violation wins. On success the object is kept exactly
/// as the plugin printed it.
pub fn validate(raw: &Value) -> Result<PluginResult, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    match obj.get("title") {
        Some(Value::String(t)) if !t.is_empty() => {}
        _ => return Err(ValidationError::InvalidTitle),
    }

    let widgets = obj
        .get("widgets")
        .and_then(Value::as_array)
        .ok_or(ValidationError::InvalidWidgets)?;

    for (index, widget) in widgets.iter().enumerate() {
        validate_widget(index, widget)?;
    }

    match obj.get("error") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => return Err(ValidationError::InvalidError),
    }

    Ok(PluginResult::from_validated(obj.clone()))
}

fn validate_widget(index: usize, raw: &Value) -> Result<(), ValidationError> {
    let obj = raw
        .as_object()
        .ok_or(ValidationError::WidgetNotAnObject { index })?;

    match obj.get("type") {
        Some(Value::String(t)) if !t.is_empty() => {}
        _ => return Err(ValidationError::InvalidWidgetType { index }),
    }

    if !obj.get("data").is_some_and(Value::is_object) {
        return Err(ValidationError::InvalidWidgetData { index });
    }

    Ok(())
}
