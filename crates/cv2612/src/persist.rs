//! JSON export and import of the logical state.
//!
//! Import is strict and all-or-nothing. A document is accepted only when
//! 1. its shape (object keys, array lengths, scalar kinds) matches the shape
//!    of a default state,
//! 2. it deserializes into [`ModuleState`], and
//! 3. every value fits its bit width and every binding index is bindable.
//!
//! Empty arrays in the template (the binding sets) accept arrays of any
//! length.
use serde_json::Value;

use crate::error::Cv2612Error;
use crate::state::ModuleState;

/// Pretty-printed JSON document of `state`.
pub fn export_json(state: &ModuleState) -> Result<String, Cv2612Error> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Parse and validate a JSON document.
pub fn import_json(json: &str) -> Result<ModuleState, Cv2612Error> {
    let value: Value = serde_json::from_str(json)?;
    import_value(value)
}

/// Validate an already parsed document.
pub fn import_value(value: Value) -> Result<ModuleState, Cv2612Error> {
    let template = serde_json::to_value(ModuleState::default())?;
    check_shape(&template, &value, "$")?;
    let state: ModuleState = serde_json::from_value(value)?;
    state.validate()?;
    Ok(state)
}

/// Like [`import_json`], but a rejected document yields the default state.
pub fn import_or_default(json: &str) -> ModuleState {
    match import_json(json) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting saved state, using defaults");
            ModuleState::default()
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compare the structure of `value` against `template`.
pub fn check_shape(template: &Value, value: &Value, path: &str) -> Result<(), Cv2612Error> {
    let mismatch = |what: String| Cv2612Error::ShapeMismatch(format!("{}: {}", path, what));
    match (template, value) {
        (Value::Object(t), Value::Object(v)) => {
            if let Some(key) = t.keys().find(|k| !v.contains_key(*k)) {
                return Err(mismatch(format!("missing key {:?}", key)));
            }
            if let Some(key) = v.keys().find(|k| !t.contains_key(*k)) {
                return Err(mismatch(format!("unexpected key {:?}", key)));
            }
            for (key, t) in t {
                check_shape(t, &v[key], &format!("{}.{}", path, key))?;
            }
            Ok(())
        }
        (Value::Array(t), Value::Array(v)) => {
            if t.is_empty() {
                return Ok(());
            }
            if t.len() != v.len() {
                return Err(mismatch(format!(
                    "expected {} elements, found {}",
                    t.len(),
                    v.len()
                )));
            }
            for (i, (t, v)) in t.iter().zip(v).enumerate() {
                check_shape(t, v, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        (t, v) if kind(t) == kind(v) => Ok(()),
        (t, v) => Err(mismatch(format!("expected {}, found {}", kind(t), kind(v)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Modulator;

    #[test]
    fn test_export_import_preserves_state() {
        let mut state = ModuleState::default();
        state.name = "Bass".to_string();
        state.patches[1].channels[2].operators[3].tl = 100;
        state.bindings.insert(Modulator::Z, 45);
        state.sequence.toggle(2, 7).unwrap();
        let json = export_json(&state).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_shape_mismatches() {
        let json = export_json(&ModuleState::default()).unwrap();
        let mut value: Value = serde_json::from_str(&json).unwrap();
        value["patches"][0]["channels"]
            .as_array_mut()
            .unwrap()
            .pop();
        let err = import_value(value).unwrap_err();
        assert!(matches!(err, Cv2612Error::ShapeMismatch(ref p) if p.contains("channels")));

        let mut value: Value = serde_json::from_str(&json).unwrap();
        value["settings"]["pm"] = Value::String("MONO".into());
        assert!(matches!(
            import_value(value),
            Err(Cv2612Error::ShapeMismatch(_))
        ));

        let mut value: Value = serde_json::from_str(&json).unwrap();
        value["extra"] = Value::Bool(true);
        assert!(import_value(value).is_err());
    }

    #[test]
    fn test_range_errors_reject() {
        let json = export_json(&ModuleState::default()).unwrap();
        let mut value: Value = serde_json::from_str(&json).unwrap();
        value["patches"][0]["channels"][0]["al"] = Value::from(9);
        assert!(matches!(
            import_value(value),
            Err(Cv2612Error::ValueOutOfRange { value: 9, .. })
        ));

        let mut value: Value = serde_json::from_str(&json).unwrap();
        value["bindings"]["x"] = serde_json::json!([0]);
        assert!(import_value(value).is_err());
    }

    #[test]
    fn test_import_or_default() {
        assert_eq!(import_or_default("{not json"), ModuleState::default());
        assert_eq!(import_or_default("[]"), ModuleState::default());
    }
}
