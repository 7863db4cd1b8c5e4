use super::{Event, EventStore};
use std::collections::BTreeSet;

/// A single cell in the exported table. Producers build these directly
/// with the right variant for the field (§6): integer columns as `Int`,
/// floating-point columns as `Float`, `block_proposed` as `Bool`, and
/// everything else — including JSON-encoded lists/maps — as `Str`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
  Int(i64),
  Float(f64),
  Bool(bool),
  Str(String),
}

impl CellValue {
  pub fn to_csv_field(&self) -> String {
    match self {
      CellValue::Int(v) => v.to_string(),
      CellValue::Float(v) => v.to_string(),
      CellValue::Bool(v) => v.to_string(),
      CellValue::Str(v) => v.clone(),
    }
  }
}

impl From<i64> for CellValue {
  fn from(v: i64) -> Self {
    CellValue::Int(v)
  }
}
impl From<u64> for CellValue {
  fn from(v: u64) -> Self {
    CellValue::Int(v as i64)
  }
}
impl From<usize> for CellValue {
  fn from(v: usize) -> Self {
    CellValue::Int(v as i64)
  }
}
impl From<u32> for CellValue {
  fn from(v: u32) -> Self {
    CellValue::Int(v as i64)
  }
}
impl From<f64> for CellValue {
  fn from(v: f64) -> Self {
    CellValue::Float(v)
  }
}
impl From<bool> for CellValue {
  fn from(v: bool) -> Self {
    CellValue::Bool(v)
  }
}
impl From<String> for CellValue {
  fn from(v: String) -> Self {
    CellValue::Str(v)
  }
}
impl From<&str> for CellValue {
  fn from(v: &str) -> Self {
    CellValue::Str(v.to_owned())
  }
}

/// Columnar export of an `EventStore` (§4.1, §6). Column order is stable:
/// `timestamp_ms, slot, event_type, actor, subject`, then every `data_*`
/// column seen across the whole stream in sorted key order.
pub struct EventTable {
  pub columns: Vec<String>,
  pub rows: Vec<Vec<Option<CellValue>>>,
}

impl EventTable {
  pub fn from_store(store: &EventStore) -> Self {
    Self::from_events(store.iter())
  }

  pub fn from_events<'a>(events: impl Iterator<Item = &'a Event>) -> Self {
    let events: Vec<&Event> = events.collect();

    let mut data_keys: BTreeSet<&'static str> = BTreeSet::new();
    for event in &events {
      for (key, _) in &event.data {
        data_keys.insert(key);
      }
    }
    let data_keys: Vec<&'static str> = data_keys.into_iter().collect();

    let mut columns = vec![
      "timestamp_ms".to_owned(),
      "slot".to_owned(),
      "event_type".to_owned(),
      "actor".to_owned(),
      "subject".to_owned(),
    ];
    columns.extend(data_keys.iter().map(|k| format!("data_{k}")));

    let rows = events
      .iter()
      .map(|event| {
        let mut row: Vec<Option<CellValue>> = vec![
          Some(CellValue::Float(event.time_ms)),
          Some(CellValue::Int(event.slot as i64)),
          Some(CellValue::Str(event.kind.as_str().to_owned())),
          event
            .actor
            .as_ref()
            .map(|a| CellValue::Str(a.as_str().to_owned())),
          event
            .subject
            .as_ref()
            .map(|s| CellValue::Str(s.as_str().to_owned())),
        ];
        for key in &data_keys {
          let value = event
            .data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone());
          row.push(value);
        }
        row
      })
      .collect();

    Self { columns, rows }
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Renders the table as CSV text, suitable for writing straight to a
  /// file or stdout.
  pub fn to_csv(&self) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&self.columns)?;
    for row in &self.rows {
      let fields: Vec<String> = row
        .iter()
        .map(|cell| cell.as_ref().map(CellValue::to_csv_field).unwrap_or_default())
        .collect();
      writer.write_record(&fields)?;
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
  }
}
