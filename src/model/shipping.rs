//! Shipping zones, methods, classes and the per-class rate extraction

use super::{array, as_object, flag, optional_int, required_id, text, RecordError, RecordResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// Calculation mode used when a settings blob names none
pub const DEFAULT_CALC_TYPE: &str = "flat";

const CLASS_COST_PREFIX: &str = "class_cost_";
const CLASS_CALC_PREFIX: &str = "class_calc_";
const NO_CLASS_COST: &str = "no_class_cost";
const NO_CLASS_CALC: &str = "no_class_calc";

/// One location rule of a zone with the API metadata stripped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneLocation {
    pub code: String,
    #[serde(rename = "type")]
    pub location_type: String,
}

/// A shipping zone, with its locations merged in by the catalog client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingZoneRecord {
    pub remote_id: i64,
    pub name: String,
    pub order: i64,
    pub locations: Vec<ZoneLocation>,
}

impl ShippingZoneRecord {
    pub fn from_remote_record(record: &Value) -> RecordResult<Self> {
        let record = as_object(record)?;

        let locations = array(record, "locations")?
            .iter()
            .map(|item| {
                let item = as_object(item)?;
                Ok(ZoneLocation {
                    code: text(item, "code")?,
                    location_type: text(item, "type")?,
                })
            })
            .collect::<RecordResult<Vec<_>>>()?;

        Ok(Self {
            remote_id: required_id(record, "id")?,
            name: text(record, "name")?,
            order: optional_int(record, "order")?.unwrap_or(0),
            locations,
        })
    }

    /// The cleaned location list as stored
    pub fn locations_json(&self) -> String {
        serde_json::to_string(&self.locations).unwrap_or_else(|_| "[]".to_string())
    }
}

/// A shipping method instance inside a zone
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingMethodRecord {
    pub instance_id: i64,
    pub title: String,
    pub method_id: String,
    pub method_title: String,
    pub enabled: bool,
    pub order: i64,
    pub settings: Map<String, Value>,
}

impl ShippingMethodRecord {
    pub fn from_remote_record(record: &Value) -> RecordResult<Self> {
        let record = as_object(record)?;

        let settings = match record.get("settings") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            // PHP serializes an empty associative array as []
            Some(Value::Array(items)) if items.is_empty() => Map::new(),
            Some(_) => {
                return Err(RecordError::InvalidField {
                    field: "settings".to_string(),
                    expected: "object",
                })
            }
        };

        Ok(Self {
            instance_id: required_id(record, "instance_id")?,
            title: text(record, "title")?,
            method_id: text(record, "method_id")?,
            method_title: text(record, "method_title")?,
            enabled: flag(record, "enabled", true)?,
            order: optional_int(record, "order")?.unwrap_or(0),
            settings,
        })
    }

    pub fn settings_json(&self) -> String {
        Value::Object(self.settings.clone()).to_string()
    }

    /// Per-class rates derived from the current settings
    pub fn class_rates(&self) -> Vec<ClassRate> {
        extract_class_rates(&self.settings)
    }
}

/// A shipping class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingClassRecord {
    pub remote_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl ShippingClassRecord {
    pub fn from_remote_record(record: &Value) -> RecordResult<Self> {
        let record = as_object(record)?;
        Ok(Self {
            remote_id: required_id(record, "id")?,
            name: text(record, "name")?,
            slug: text(record, "slug")?,
            description: text(record, "description")?,
        })
    }
}

/// Cost override for one shipping class (or for items without a class)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRate {
    /// Remote shipping class id; `None` is the no-class rate
    pub class_id: Option<i64>,
    pub cost: String,
    pub calc_type: String,
}

/// Scans a method settings blob for per-class cost keys
///
/// `class_cost_<id>` carries the cost for class `<id>` and `class_calc_<id>`
/// its calculation mode (default [`DEFAULT_CALC_TYPE`]). `no_class_cost` and
/// `no_class_calc` describe items without a class. Values may be scalars or
/// setting objects holding a `value` field. Blank costs produce no rate.
/// The result is ordered with the no-class rate first, then by class id.
pub fn extract_class_rates(settings: &Map<String, Value>) -> Vec<ClassRate> {
    let mut rates = Vec::new();

    for (key, value) in settings {
        let (class_id, calc_key) = if key == NO_CLASS_COST {
            (None, NO_CLASS_CALC.to_string())
        } else if let Some(suffix) = key.strip_prefix(CLASS_COST_PREFIX) {
            match suffix.parse::<i64>() {
                Ok(id) => (Some(id), format!("{}{}", CLASS_CALC_PREFIX, suffix)),
                Err(_) => continue,
            }
        } else {
            continue;
        };

        let Some(cost) = setting_value(value).filter(|c| !c.is_empty()) else {
            continue;
        };

        let calc_type = settings
            .get(&calc_key)
            .and_then(setting_value)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CALC_TYPE.to_string());

        rates.push(ClassRate {
            class_id,
            cost,
            calc_type,
        });
    }

    rates.sort_by_key(|rate| rate.class_id);
    rates
}

/// Reads a setting that is either a scalar or an object with a `value` field
fn setting_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("value").and_then(setting_value),
        _ => None,
    }
}
