//! Conversions between `serde_json::Value` and `rquickjs::Value`.
//!
//! Bindings enter and leave the sandbox as JSON (§3's "opaque value the
//! sandbox understands"); this module is the one place that crosses the
//! boundary so every caller gets the same mapping.

use rquickjs::{Array, Ctx, Object, Value};

use crate::error::EvalError;

/// Convert a `serde_json::Value` into a live JS value in `ctx`.
pub fn json_to_js<'js>(ctx: &Ctx<'js>, value: &serde_json::Value) -> Result<Value<'js>, EvalError> {
    match value {
        serde_json::Value::Null => Ok(Value::new_null(ctx.clone())),
        serde_json::Value::Bool(b) => Ok(Value::new_bool(ctx.clone(), *b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::new_int(ctx.clone(), i as i32))
            } else {
                Ok(Value::new_float(ctx.clone(), n.as_f64().unwrap_or_default()))
            }
        }
        serde_json::Value::String(s) => rquickjs::String::from_str(ctx.clone(), s)
            .map(|s| s.into_value())
            .map_err(|e| EvalError::Crashed(e.to_string())),
        serde_json::Value::Array(items) => {
            let arr = Array::new(ctx.clone()).map_err(|e| EvalError::Crashed(e.to_string()))?;
            for (idx, item) in items.iter().enumerate() {
                arr.set(idx, json_to_js(ctx, item)?).map_err(|e| EvalError::Crashed(e.to_string()))?;
            }
            Ok(arr.into_value())
        }
        serde_json::Value::Object(map) => {
            let obj = Object::new(ctx.clone()).map_err(|e| EvalError::Crashed(e.to_string()))?;
            for (key, item) in map {
                obj.set(key.as_str(), json_to_js(ctx, item)?)
                    .map_err(|e| EvalError::Crashed(e.to_string()))?;
            }
            Ok(obj.into_value())
        }
    }
}

/// Convert a live JS value back into `serde_json::Value`.
pub fn js_to_json(value: &Value<'_>) -> Result<serde_json::Value, EvalError> {
    if value.is_null() || value.is_undefined() {
        Ok(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        Ok(serde_json::Value::Bool(b))
    } else if let Some(i) = value.as_int() {
        Ok(serde_json::Value::from(i))
    } else if let Some(f) = value.as_float() {
        Ok(serde_json::json!(f))
    } else if let Some(s) = value.as_string() {
        let s = s.to_string().map_err(|e| EvalError::Crashed(e.to_string()))?;
        Ok(serde_json::Value::String(s))
    } else if let Some(arr) = value.as_array() {
        let mut out = Vec::with_capacity(arr.len());
        for item in arr.iter::<Value>() {
            let item = item.map_err(|e| EvalError::Crashed(e.to_string()))?;
            out.push(js_to_json(&item)?);
        }
        Ok(serde_json::Value::Array(out))
    } else if let Some(obj) = value.as_object() {
        let mut out = serde_json::Map::new();
        for key in obj.keys::<String>() {
            let key = key.map_err(|e| EvalError::Crashed(e.to_string()))?;
            let val: Value = obj.get(&key).map_err(|e| EvalError::Crashed(e.to_string()))?;
            out.insert(key, js_to_json(&val)?);
        }
        Ok(serde_json::Value::Object(out))
    } else {
        Ok(serde_json::Value::Null)
    }
}
