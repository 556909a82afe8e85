//! Ticker feed: freshest observation of each configured pair.

use chrono::NaiveDate;
use cifras_core::{Result, series::SeriesKey, store::SeriesStore};
use serde::Serialize;

use crate::{config::TickerPair, index::variation_percent, reader::Reader};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerItem {
  pub variable_id:    i64,
  pub country_id:     i64,
  pub label:          String,
  pub date:           NaiveDate,
  pub value:          f64,
  /// Latin formatting, e.g. `"1.234,50"`.
  pub display:        String,
  /// Relative change against the previous observation.
  pub change_percent: Option<f64>,
}

/// Latest point of each pair; pairs without data are left out.
pub async fn feed<S: SeriesStore>(
  reader: Reader<'_, S>,
  pairs: &[TickerPair],
) -> Result<Vec<TickerItem>> {
  let mut items = Vec::with_capacity(pairs.len());
  for pair in pairs {
    let key = SeriesKey::new(pair.variable_id, pair.country_id);
    let recent = reader.recent(key, None, 2).await?;
    let Some(latest) = recent.first() else { continue };
    items.push(TickerItem {
      variable_id:    pair.variable_id,
      country_id:     pair.country_id,
      label:          pair.label.clone(),
      date:           latest.date,
      value:          latest.value,
      display:        format_latin(latest.value),
      change_percent: recent.get(1).and_then(|prev| variation_percent(prev.value, latest.value)),
    });
  }
  Ok(items)
}

/// Two decimals, `.` as thousands separator and `,` as decimal mark.
pub fn format_latin(value: f64) -> String {
  let fixed = format!("{:.2}", value.abs());
  let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

  let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
  for (i, ch) in int_part.chars().enumerate() {
    if i > 0 && (int_part.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }

  let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
    "-"
  } else {
    ""
  };
  format!("{sign}{grouped},{frac}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_with_latin_separators() {
    assert_eq!(format_latin(1234.5), "1.234,50");
    assert_eq!(format_latin(39.123), "39,12");
    assert_eq!(format_latin(1_234_567.891), "1.234.567,89");
    assert_eq!(format_latin(0.0), "0,00");
    assert_eq!(format_latin(-950.0), "-950,00");
    assert_eq!(format_latin(-0.001), "0,00");
  }
}
