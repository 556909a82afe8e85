//! Query-string access with the `[]` array convention.
//!
//! Array parameters arrive as repeated `name[]=a&name[]=b`. Plain repeated
//! `name=a&name=b` and comma-separated `name=a,b` are accepted too.

use std::str::FromStr;

use axum::{
  extract::{FromRequestParts, Query},
  http::request::Parts,
};
use chrono::NaiveDate;
use cifras_core::series::{DateRange, Pid, parse_date};

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct Params(Vec<(String, String)>);

impl Params {
  pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
    Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }

  fn raw<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
    self.0.iter().filter_map(move |(k, v)| {
      let key = k.strip_suffix("[]").unwrap_or(k);
      (key == name).then_some(v.as_str())
    })
  }

  /// First non-blank value of `name`.
  pub fn get(&self, name: &str) -> Option<&str> {
    self.raw(name).map(str::trim).find(|v| !v.is_empty())
  }

  /// Every value of `name`, with comma lists split.
  pub fn list(&self, name: &str) -> Vec<&str> {
    self
      .raw(name)
      .flat_map(|v| v.split(','))
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .collect()
  }

  pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
    self
      .get(name)
      .map(|v| v.parse().map_err(|_| invalid(name, v)))
      .transpose()
  }

  pub fn required<T: FromStr>(&self, name: &str) -> Result<T, ApiError> {
    self
      .parse(name)?
      .ok_or_else(|| ApiError::BadRequest(format!("missing parameter {name}")))
  }

  pub fn parse_list<T: FromStr>(&self, name: &str) -> Result<Vec<T>, ApiError> {
    self
      .list(name)
      .into_iter()
      .map(|v| v.parse().map_err(|_| invalid(name, v)))
      .collect()
  }

  /// `product_ids[]`, decoded as synthetic product ids.
  pub fn pids(&self) -> Result<Vec<Pid>, ApiError> { self.parse_list("product_ids") }

  pub fn date(&self, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    Ok(self.get(name).map(parse_date).transpose()?)
  }

  /// `date_from` / `date_to`, both optional and inclusive.
  pub fn window(&self) -> Result<DateRange, ApiError> {
    Ok(DateRange::parse(self.get("date_from"), self.get("date_to"))?)
  }

  /// `true`/`1`/`yes`/`si` or `false`/`0`/`no`; absent reads as `false`.
  pub fn flag(&self, name: &str) -> Result<bool, ApiError> {
    match self.get(name).map(str::to_ascii_lowercase).as_deref() {
      None | Some("false" | "0" | "no") => Ok(false),
      Some("true" | "1" | "yes" | "si" | "sí") => Ok(true),
      Some(other) => Err(invalid(name, other)),
    }
  }
}

fn invalid(name: &str, value: &str) -> ApiError {
  ApiError::BadRequest(format!("invalid value {value:?} for parameter {name}"))
}

impl<S: Send + Sync> FromRequestParts<S> for Params {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Self(pairs))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

  #[test]
  fn arrays_accept_brackets_repeats_and_commas() {
    let p = Params::from_pairs([
      ("product_ids[]", "220858"),
      ("product_ids[]", "200032"),
      ("product_ids", "90858, 10032"),
    ]);
    assert_eq!(p.pids().unwrap(), [Pid(220858), Pid(200032), Pid(90858), Pid(10032)]);
    assert!(Params::default().pids().unwrap().is_empty());
  }

  #[test]
  fn bad_values_are_bad_requests() {
    let p = Params::from_pairs([("product_ids[]", "abc"), ("monthly", "maybe")]);
    assert!(matches!(p.pids(), Err(ApiError::BadRequest(_))));
    assert!(matches!(p.flag("monthly"), Err(ApiError::BadRequest(_))));
    assert!(matches!(p.required::<u32>("plazo"), Err(ApiError::BadRequest(m)) if m.contains("plazo")));
  }

  #[test]
  fn window_parses_and_validates() {
    let p = Params::from_pairs([("date_from", "2023-01-01"), ("date_to", "2023-03-01")]);
    assert_eq!(p.window().unwrap(), DateRange::between(d(2023, 1, 1), d(2023, 3, 1)).unwrap());

    let inverted = Params::from_pairs([("date_from", "2023-03-01"), ("date_to", "2023-01-01")]);
    assert!(matches!(inverted.window(), Err(ApiError::BadRequest(_))));

    let blank = Params::from_pairs([("date_from", ""), ("date_to", "2023-01-01")]);
    assert_eq!(blank.window().unwrap().from, None);
  }

  #[test]
  fn flags() {
    let p = Params::from_pairs([("monthly", "true"), ("base100", "0")]);
    assert!(p.flag("monthly").unwrap());
    assert!(!p.flag("base100").unwrap());
    assert!(!p.flag("absent").unwrap());
  }
}
