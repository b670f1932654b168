//! Dynamic variable conversion.
//!
//! Resource configuration carries build variables as dynamic JSON values; the
//! tool wants them as `-var key=value` arguments. Scalars render to their
//! string form, lists render in HCL list syntax, and anything nested deeper
//! (maps, objects) is rejected rather than guessed at.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VarsError {
  #[error("variables must be a map or object, got {found}")]
  NotAnObject { found: &'static str },

  #[error("maps are unsupported as variable values (key {key})")]
  NestedMap { key: String },

  #[error("null is unsupported as a variable value (key {key})")]
  NullValue { key: String },
}

/// Converts a dynamic variables value into `-var key=value` argument pairs.
///
/// `None` (attribute absent) and `Null` (attribute set to null) both yield no
/// arguments. Keys are emitted in sorted order, so the produced command line
/// is deterministic.
pub fn var_args(variables: Option<&Value>) -> Result<Vec<String>, VarsError> {
  let Some(variables) = variables else {
    return Ok(Vec::new());
  };

  let map = match variables {
    Value::Null => return Ok(Vec::new()),
    Value::Object(map) => map,
    Value::Bool(_) => return Err(VarsError::NotAnObject { found: "bool" }),
    Value::Number(_) => return Err(VarsError::NotAnObject { found: "number" }),
    Value::String(_) => return Err(VarsError::NotAnObject { found: "string" }),
    Value::Array(_) => return Err(VarsError::NotAnObject { found: "array" }),
  };

  let mut args = Vec::with_capacity(map.len() * 2);
  for (key, value) in map {
    let rendered = render_value(key, value)?;
    args.push("-var".to_string());
    args.push(format!("{key}={rendered}"));
  }
  Ok(args)
}

/// Renders one variable value to the string Packer expects on the command
/// line.
fn render_value(key: &str, value: &Value) -> Result<String, VarsError> {
  match value {
    Value::String(s) => Ok(s.clone()),
    Value::Bool(b) => Ok(b.to_string()),
    Value::Number(n) => Ok(render_number(n)),
    Value::Array(elements) => render_list(key, elements),
    Value::Object(_) => Err(VarsError::NestedMap {
      key: key.to_string(),
    }),
    Value::Null => Err(VarsError::NullValue {
      key: key.to_string(),
    }),
  }
}

fn render_number(n: &serde_json::Number) -> String {
  if let Some(i) = n.as_i64() {
    i.to_string()
  } else if let Some(u) = n.as_u64() {
    u.to_string()
  } else {
    let f = n.as_f64().unwrap_or(0.0);
    if f.fract() == 0.0 && f.is_finite() && f.abs() < 9e15 {
      // Whole-number floats render as plain integers.
      format!("{}", f as i64)
    } else {
      // Exponent form with a fixed mantissa width keeps float rendering
      // stable across platforms.
      format!("{f:.4e}")
    }
  }
}

/// Renders a list in HCL syntax: every element string-rendered, quoted, and
/// comma-joined inside brackets.
fn render_list(key: &str, elements: &[Value]) -> Result<String, VarsError> {
  let mut rendered = Vec::with_capacity(elements.len());
  for element in elements {
    let as_string = render_value(key, element)?;
    rendered.push(format!("\"{}\"", escape_hcl_string(&as_string)));
  }
  Ok(format!("[{}]", rendered.join(", ")))
}

fn escape_hcl_string(s: &str) -> String {
  s.replace('\\', "\\\\").replace('"', "\\\"")
}
