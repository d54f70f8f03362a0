//! World Bank API response shapes.
//!
//! A normal response is a two-element array `[meta, rows]`. Errors come as
//! a one-element array holding a `message` list.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(super) struct PageMeta {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub message: Option<Vec<ApiMessage>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ApiMessage {
    pub fn text(&self) -> String {
        [self.key.as_deref(), self.value.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(": ")
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct Labelled {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IndicatorRow {
    pub indicator: Labelled,
    pub country: Labelled,
    #[serde(default)]
    pub countryiso3code: Option<String>,
    pub date: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Splits the raw `[meta, rows]` payload.
pub(super) fn split(
    payload: Vec<Value>,
) -> Result<(PageMeta, Vec<IndicatorRow>), serde_json::Error> {
    let mut parts = payload.into_iter();
    let meta: PageMeta = match parts.next() {
        Some(v) => serde_json::from_value(v)?,
        None => PageMeta {
            total: None,
            message: None,
        },
    };
    let rows: Vec<IndicatorRow> = match parts.next() {
        Some(Value::Null) | None => Vec::new(),
        Some(v) => serde_json::from_value(v)?,
    };
    Ok((meta, rows))
}
