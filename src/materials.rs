// Pipe material propagation.
//
// Legacy line layers carry a numeric PIPE_TYPE code. A segment's own
// `material_source` only records whether such a value is present; the
// materials written at each end are those of the neighbouring segment,
// looked up through the code table.

use ahash::AHashMap;
use serde_json::Value;

pub const UNKNOWN_MATERIAL: &str = "Unknown";
pub const LEGACY_SOURCE: &str = "Legacy";

/// A normalised pipe-type code.
///
/// Integral numbers and numeric strings share one key so that `3`, `3.0`
/// and `"3"` all look up the same table entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipeTypeCode {
    Number(i64),
    Text(String),
}

impl PipeTypeCode {
    /// `None` for null, empty strings and non-scalar values.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(PipeTypeCode::Number(i))
                } else {
                    let f = n.as_f64()?;
                    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Some(PipeTypeCode::Number(f as i64))
                    } else {
                        Some(PipeTypeCode::Text(n.to_string()))
                    }
                }
            }
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else if let Ok(i) = trimmed.parse::<i64>() {
                    Some(PipeTypeCode::Number(i))
                } else if let Some(f) = trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                {
                    Some(PipeTypeCode::Number(f as i64))
                } else {
                    Some(PipeTypeCode::Text(trimmed.to_string()))
                }
            }
            Value::Bool(b) => Some(PipeTypeCode::Number(i64::from(*b))),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn key(&self) -> String {
        match self {
            PipeTypeCode::Number(i) => i.to_string(),
            PipeTypeCode::Text(s) => s.clone(),
        }
    }
}

/// "Legacy" when the segment's raw pipe-type value is present and not
/// numerically zero. Presence is judged on the raw attribute, so an empty
/// string or the text `"0"` still counts as a legacy value even though
/// neither maps to a material.
pub fn material_source(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(_) => Some(LEGACY_SOURCE.to_string()),
    }
}

/// Code to material name lookup. Keys are normalised however the table is
/// built, deserialisation included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "AHashMap<String, String>",
    into = "AHashMap<String, String>"
)]
pub struct MaterialTable {
    names: AHashMap<String, String>,
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::from_pairs([
            ("1", "PVC"),
            ("2", "RCP"),
            ("3", "Cast Iron"),
            ("4", "Ductile Iron"),
            ("5", "VCP"),
            ("6", "R.C.C.P"),
        ])
    }
}

impl MaterialTable {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let names = pairs
            .into_iter()
            .map(|(k, v)| {
                let key: String = k.into();
                // Store under the same normalised key a lookup would use.
                let key = PipeTypeCode::from_value(&Value::String(key.clone()))
                    .map(|code| code.key())
                    .unwrap_or(key);
                (key, v.into())
            })
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Material for a code; "Unknown" for missing or unmapped codes.
    pub fn material(&self, code: Option<&PipeTypeCode>) -> String {
        code.and_then(|c| self.names.get(&c.key()))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_MATERIAL.to_string())
    }

}

impl From<AHashMap<String, String>> for MaterialTable {
    fn from(names: AHashMap<String, String>) -> Self {
        Self::from_pairs(names)
    }
}

impl From<MaterialTable> for AHashMap<String, String> {
    fn from(table: MaterialTable) -> Self {
        table.names
    }
}
