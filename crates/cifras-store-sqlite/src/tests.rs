//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use cifras_core::{
  catalog::{
    Country, Currency, Maestro, MaestroBulk, MaestroFields, MaestroFilter,
    NewFamily, NewGraph, NewSubFamily, NewVariable, Valuation,
  },
  series::{DateRange, Observation, Periodicity, Pid, SeriesKey},
  store::SeriesStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

/// Family → sub-family → variable 20 ("Dólar"), Uruguay, Argentina, and a
/// daily Maestro row for (20, 858).
async fn seeded() -> SqliteStore {
  let s = store().await;
  let fam = s.create_family(NewFamily { name: "Monedas".into() }).await.unwrap();
  let sub = s
    .create_subfamily(NewSubFamily { name: "Tipos de cambio".into(), family_id: fam.id })
    .await
    .unwrap();
  s.create_variable(NewVariable {
    id:              Some(20),
    name:            "Dólar".into(),
    subfamily_id:    sub.id,
    nominal_or_real: None,
    currency:        None,
    series_type_id:  Some(1),
  })
  .await
  .unwrap();
  s.create_country(Country { id: 858, name: "Uruguay".into() }).await.unwrap();
  s.create_country(Country { id: 32, name: "Argentina".into() }).await.unwrap();
  s.create_maestro(Maestro::new(
    SeriesKey::new(20, 858),
    MaestroFields::new(Periodicity::Daily),
  ))
  .await
  .unwrap();
  s
}

const UYU: SeriesKey = SeriesKey::new(20, 858);

// ─── Families ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn family_crud_round_trip() {
  let s = store().await;

  let fam = s.create_family(NewFamily { name: "Precios".into() }).await.unwrap();
  assert_eq!(s.get_family(fam.id).await.unwrap().unwrap().name, "Precios");

  let renamed = s
    .update_family(fam.id, NewFamily { name: "Precios internacionales".into() })
    .await
    .unwrap();
  assert_eq!(renamed.name, "Precios internacionales");
  assert_eq!(
    s.get_family(fam.id).await.unwrap().unwrap().name,
    "Precios internacionales"
  );

  s.delete_family(fam.id).await.unwrap();
  assert!(s.get_family(fam.id).await.unwrap().is_none());
  assert!(matches!(s.delete_family(fam.id).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn duplicate_family_name_conflicts() {
  let s = store().await;
  s.create_family(NewFamily { name: "Precios".into() }).await.unwrap();
  let err = s.create_family(NewFamily { name: "Precios".into() }).await;
  assert!(matches!(err, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn blank_family_name_is_invalid() {
  let s = store().await;
  assert!(matches!(
    s.create_family(NewFamily { name: "  ".into() }).await,
    Err(Error::Invalid(_))
  ));
}

#[tokio::test]
async fn deleting_family_with_subfamilies_conflicts_and_mutates_nothing() {
  let s = store().await;
  let fam = s.create_family(NewFamily { name: "Precios".into() }).await.unwrap();
  for name in ["Carnes", "Lácteos"] {
    s.create_subfamily(NewSubFamily { name: name.into(), family_id: fam.id })
      .await
      .unwrap();
  }

  match s.delete_family(fam.id).await {
    Err(Error::Conflict(msg)) => assert!(msg.contains("sub-familias"), "message: {msg}"),
    other => panic!("expected conflict, got {other:?}"),
  }
  assert!(s.get_family(fam.id).await.unwrap().is_some());
  assert_eq!(s.list_subfamilies(Some(fam.id)).await.unwrap().len(), 2);
}

// ─── Sub-families and variables ──────────────────────────────────────────────

#[tokio::test]
async fn subfamily_requires_existing_family() {
  let s = store().await;
  let err = s
    .create_subfamily(NewSubFamily { name: "Huérfana".into(), family_id: 99 })
    .await;
  assert!(matches!(err, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn deleting_subfamily_with_variables_conflicts() {
  let s = seeded().await;
  let sub = s.list_subfamilies(None).await.unwrap().remove(0);
  match s.delete_subfamily(sub.id).await {
    Err(Error::Conflict(msg)) => assert!(msg.contains("variables"), "message: {msg}"),
    other => panic!("expected conflict, got {other:?}"),
  }
}

#[tokio::test]
async fn variable_keeps_requested_id_and_attributes() {
  let s = seeded().await;
  let sub = s.list_subfamilies(None).await.unwrap().remove(0);
  let v = s
    .create_variable(NewVariable {
      id:              Some(220),
      name:            "Carne".into(),
      subfamily_id:    sub.id,
      nominal_or_real: Some(Valuation::Nominal),
      currency:        Some(Currency::Usd),
      series_type_id:  None,
    })
    .await
    .unwrap();
  assert_eq!(v.id, 220);

  let fetched = s.get_variable(220).await.unwrap().unwrap();
  assert_eq!(fetched.currency, Some(Currency::Usd));
  assert_eq!(fetched.nominal_or_real, Some(Valuation::Nominal));
}

#[tokio::test]
async fn variable_with_unknown_series_type_conflicts() {
  let s = seeded().await;
  let sub = s.list_subfamilies(None).await.unwrap().remove(0);
  let err = s
    .create_variable(NewVariable {
      id:              None,
      name:            "Rara".into(),
      subfamily_id:    sub.id,
      nominal_or_real: None,
      currency:        None,
      series_type_id:  Some(42),
    })
    .await;
  assert!(matches!(err, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn deleting_variable_or_country_with_maestro_conflicts() {
  let s = seeded().await;
  assert!(matches!(s.delete_variable(20).await, Err(Error::Conflict(_))));
  assert!(matches!(s.delete_country(858).await, Err(Error::Conflict(_))));
  // Argentina has no Maestro rows.
  s.delete_country(32).await.unwrap();
  assert!(s.get_country(32).await.unwrap().is_none());
}

#[tokio::test]
async fn country_ids_must_fit_the_product_id_codec() {
  let s = store().await;
  let err = s.create_country(Country { id: 10_000, name: "Atlántida".into() }).await;
  assert!(matches!(err, Err(Error::Invalid(_))));
  let c = s.create_country(Country { id: 9_999, name: "Borde".into() }).await.unwrap();
  assert_eq!(Pid::encode(SeriesKey::new(20, c.id)).decode(), SeriesKey::new(20, 9_999));
}

#[tokio::test]
async fn series_types_are_seeded() {
  let s = store().await;
  let types = s.list_series_types().await.unwrap();
  assert_eq!(types.len(), 3);
  assert_eq!(types[0].name, "Original");
}

// ─── Maestro ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_maestro_conflicts() {
  let s = seeded().await;
  let err = s
    .create_maestro(Maestro::new(UYU, MaestroFields::new(Periodicity::Monthly)))
    .await;
  assert!(matches!(err, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn maestro_delete_blocked_by_observations() {
  let s = seeded().await;
  s.store_observations(vec![Observation::new(UYU, d(2024, 1, 2), 39.1)])
    .await
    .unwrap();
  match s.delete_maestro(UYU).await {
    Err(Error::Conflict(msg)) => assert!(msg.contains("observaciones"), "message: {msg}"),
    other => panic!("expected conflict, got {other:?}"),
  }

  let ar = SeriesKey::new(20, 32);
  s.create_maestro(Maestro::new(ar, MaestroFields::new(Periodicity::Daily)))
    .await
    .unwrap();
  s.delete_maestro(ar).await.unwrap();
  assert!(s.get_maestro(ar).await.unwrap().is_none());
}

#[tokio::test]
async fn bulk_maestro_rejects_whole_batch_on_any_failure() {
  let s = seeded().await;
  let err = s
    .create_maestros(MaestroBulk {
      variable_id: 20,
      country_ids: vec![32, 858, 999],
      fields:      MaestroFields::new(Periodicity::Daily),
    })
    .await;
  match err {
    Err(Error::Conflict(msg)) => {
      assert!(msg.contains("país 858"), "message: {msg}");
      assert!(msg.contains("país 999"), "message: {msg}");
    }
    other => panic!("expected conflict, got {other:?}"),
  }
  // Argentina passed the precheck but must not have been inserted.
  assert!(s.get_maestro(SeriesKey::new(20, 32)).await.unwrap().is_none());
}

#[tokio::test]
async fn bulk_maestro_inserts_all_rows() {
  let s = seeded().await;
  s.create_country(Country { id: 152, name: "Chile".into() }).await.unwrap();
  let rows = s
    .create_maestros(MaestroBulk {
      variable_id: 20,
      country_ids: vec![32, 152],
      fields:      MaestroFields::new(Periodicity::Daily),
    })
    .await
    .unwrap();
  assert_eq!(rows.len(), 2);

  let all = s
    .list_maestros(MaestroFilter { variable_id: Some(20), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn maestro_update_and_filtering_by_active() {
  let s = seeded().await;
  let mut fields = MaestroFields::new(Periodicity::Daily);
  fields.active = false;
  fields.source = Some("BCU".into());
  s.update_maestro(UYU, fields).await.unwrap();

  let m = s.get_maestro(UYU).await.unwrap().unwrap();
  assert!(!m.fields.active);
  assert_eq!(m.fields.source.as_deref(), Some("BCU"));

  let active = s
    .list_maestros(MaestroFilter { active: Some(true), ..Default::default() })
    .await
    .unwrap();
  assert!(active.is_empty());
  assert!(s.list_products(true).await.unwrap().is_empty());
  assert_eq!(s.list_products(false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn product_carries_catalog_context() {
  let s = seeded().await;
  let p = s.get_product(UYU).await.unwrap().unwrap();
  assert_eq!(p.pid, Pid(200858));
  assert_eq!(p.name, "Dólar");
  assert_eq!(p.country, "Uruguay");
  assert_eq!(p.family, "Monedas");
  assert_eq!(p.periodicity, Periodicity::Daily);
}

// ─── Graphs ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn graph_country_filter_is_replaced_atomically() {
  let s = seeded().await;
  let g = s
    .create_graph(NewGraph { name: "Región".into(), selector: Some("#region".into()) })
    .await
    .unwrap();

  s.replace_graph_countries(g.id, vec![858, 32, 858]).await.unwrap();
  assert_eq!(s.graph_countries(g.id).await.unwrap(), vec![32, 858]);

  // One unknown country rejects the whole replacement.
  let err = s.replace_graph_countries(g.id, vec![858, 999]).await;
  assert!(matches!(err, Err(Error::Conflict(_))));
  assert_eq!(s.graph_countries(g.id).await.unwrap(), vec![32, 858]);

  s.delete_graph(g.id).await.unwrap();
  assert!(matches!(s.graph_countries(g.id).await, Err(Error::NotFound(_))));
}

// ─── Observations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn observations_require_maestro() {
  let s = seeded().await;
  let err = s
    .store_observations(vec![Observation::new(SeriesKey::new(20, 32), d(2024, 1, 2), 800.0)])
    .await;
  assert!(matches!(err, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn read_series_is_ordered_and_inclusive() {
  let s = seeded().await;
  s.store_observations(vec![
    Observation::new(UYU, d(2024, 1, 3), 39.3),
    Observation::new(UYU, d(2024, 1, 1), 39.1),
    Observation::new(UYU, d(2024, 1, 2), 39.2),
    Observation::new(UYU, d(2024, 1, 4), 39.4),
  ])
  .await
  .unwrap();

  let range = DateRange::between(d(2024, 1, 2), d(2024, 1, 3)).unwrap();
  let pts = s.read_series(UYU, range).await.unwrap();
  assert_eq!(pts.len(), 2);
  assert_eq!(pts[0].date, d(2024, 1, 2));
  assert_eq!(pts[1].date, d(2024, 1, 3));

  let all = s.read_series(UYU, DateRange::ALL).await.unwrap();
  assert_eq!(all.len(), 4);
  assert!(all.windows(2).all(|w| w[0].date < w[1].date));
}

#[tokio::test]
async fn missing_series_reads_empty() {
  let s = seeded().await;
  let pts = s.read_series(SeriesKey::new(77, 858), DateRange::ALL).await.unwrap();
  assert!(pts.is_empty());
}

#[tokio::test]
async fn datetime_strings_are_truncated_and_matched_on_last_day() {
  let s = seeded().await;
  s.conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO observations (variable_id, country_id, date, value)
         VALUES (20, 858, '2024-02-29 00:00:00', 40.5)",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let range = DateRange::between(d(2024, 2, 1), d(2024, 2, 29)).unwrap();
  let pts = s.read_series(UYU, range).await.unwrap();
  assert_eq!(pts.len(), 1);
  assert_eq!(pts[0].date, d(2024, 2, 29));
}

#[tokio::test]
async fn upsert_overwrites_existing_value() {
  let s = seeded().await;
  s.store_observations(vec![Observation::new(UYU, d(2024, 1, 1), 1.0)]).await.unwrap();
  s.store_observations(vec![Observation::new(UYU, d(2024, 1, 1), 2.0)]).await.unwrap();
  let pts = s.read_series(UYU, DateRange::ALL).await.unwrap();
  assert_eq!(pts.len(), 1);
  assert_eq!(pts[0].value, 2.0);
}

#[tokio::test]
async fn latest_and_recent_respect_cutoff() {
  let s = seeded().await;
  s.store_observations(
    (1..=10)
      .map(|day| Observation::new(UYU, d(2024, 3, day), f64::from(day)))
      .collect(),
  )
  .await
  .unwrap();

  let latest = s.latest_at(UYU, None).await.unwrap().unwrap();
  assert_eq!(latest.date, d(2024, 3, 10));

  let before = s.latest_at(UYU, Some(d(2024, 3, 5))).await.unwrap().unwrap();
  assert_eq!(before.value, 5.0);

  let last3 = s.recent(UYU, Some(d(2024, 3, 7)), 3).await.unwrap();
  let values: Vec<f64> = last3.iter().map(|p| p.value).collect();
  assert_eq!(values, vec![7.0, 6.0, 5.0]);

  assert!(s.latest_at(UYU, Some(d(2024, 2, 1))).await.unwrap().is_none());
}

#[tokio::test]
async fn dates_values_on_and_long_form() {
  let s = seeded().await;
  let ar = SeriesKey::new(20, 32);
  s.create_maestro(Maestro::new(ar, MaestroFields::new(Periodicity::Daily)))
    .await
    .unwrap();
  s.store_observations(vec![
    Observation::new(UYU, d(2024, 1, 1), 39.0),
    Observation::new(UYU, d(2024, 1, 2), 39.5),
    Observation::new(ar, d(2024, 1, 2), 810.0),
  ])
  .await
  .unwrap();

  let dates = s.observation_dates(&[20], 858).await.unwrap();
  assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 1)]);

  let on = s.values_on(&[20, 21], 858, d(2024, 1, 2)).await.unwrap();
  assert_eq!(on, vec![(20, 39.5)]);

  let long = s.read_long(&[20], &[858, 32], DateRange::ALL).await.unwrap();
  assert_eq!(long.len(), 3);
  assert_eq!(long[0].country_id, 32);

  assert!(s.read_long(&[], &[858], DateRange::ALL).await.unwrap().is_empty());
}
