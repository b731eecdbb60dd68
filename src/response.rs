//! Success envelopes: `{ <name>: record }` and `{ <plural>: [records] }`.

use crate::config::ControllerConfig;
use crate::model::{Model, Record};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
pub struct StatusBody {
    pub status: &'static str,
}

/// Body returned by delete.
pub fn deleted() -> StatusBody {
    StatusBody { status: "ok" }
}

fn envelope(key: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key, value);
    Value::Object(map)
}

pub fn format_one(record: Record, model: &dyn Model, config: &ControllerConfig) -> Value {
    envelope(
        config.output_name(model, false),
        Value::Object(record.into_values()),
    )
}

pub fn format_many(records: Vec<Record>, model: &dyn Model, config: &ControllerConfig) -> Value {
    let items = records
        .into_iter()
        .map(|r| Value::Object(r.into_values()))
        .collect();
    envelope(config.output_name(model, true), Value::Array(items))
}
