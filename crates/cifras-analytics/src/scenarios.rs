//! End-to-end engine tests against an in-memory SQLite store.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use cifras_core::{
  Error,
  catalog::{
    Country, Currency, Maestro, MaestroFields, NewFamily, NewSubFamily, NewVariable, Valuation,
  },
  series::{DateRange, Observation, Periodicity, Pid, SeriesKey},
  store::SeriesStore,
};
use cifras_store_sqlite::SqliteStore;

use crate::{
  AnalyticsConfig, OmitReason, Reader, dcp, dollar_inflation, implicit, policy, tenders, ticker,
  tidy, yield_curve,
};

const UY: i64 = 858;

fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

struct Fixture {
  store:     SqliteStore,
  subfamily: i64,
}

impl Fixture {
  async fn new() -> Self {
    let store = SqliteStore::open_in_memory().await.expect("in-memory store");
    let fam = store.create_family(NewFamily { name: "Indicadores".into() }).await.unwrap();
    let sub = store
      .create_subfamily(NewSubFamily { name: "Varios".into(), family_id: fam.id })
      .await
      .unwrap();
    let fx = Self { store, subfamily: sub.id };
    fx.country(UY, "Uruguay").await;
    fx
  }

  fn reader(&self) -> Reader<'_, SqliteStore> { Reader::new(&self.store) }

  async fn country(&self, id: i64, name: &str) {
    self.store.create_country(Country { id, name: name.into() }).await.unwrap();
  }

  async fn variable(
    &self,
    id: i64,
    name: &str,
    valuation: Option<Valuation>,
    currency: Option<Currency>,
  ) {
    if self.store.get_variable(id).await.unwrap().is_some() {
      return;
    }
    self
      .store
      .create_variable(NewVariable {
        id:              Some(id),
        name:            name.into(),
        subfamily_id:    self.subfamily,
        nominal_or_real: valuation,
        currency,
        series_type_id:  None,
      })
      .await
      .unwrap();
  }

  /// Declare `key` (creating a plain variable if needed) and load its points.
  async fn series(&self, key: SeriesKey, periodicity: Periodicity, points: &[(NaiveDate, f64)]) {
    self.variable(key.variable_id, &format!("Variable {}", key.variable_id), None, None).await;
    self
      .store
      .create_maestro(Maestro::new(key, MaestroFields::new(periodicity)))
      .await
      .unwrap();
    let rows = points.iter().map(|&(date, v)| Observation::new(key, date, v)).collect();
    self.store.store_observations(rows).await.unwrap();
  }
}

fn months(values: &[f64]) -> Vec<(NaiveDate, f64)> {
  values
    .iter()
    .enumerate()
    .map(|(i, &v)| (d(2023, 1 + i as u32, 1), v))
    .collect()
}

// ─── DCP ─────────────────────────────────────────────────────────────────────

async fn dcp_fixture() -> Fixture {
  let f = Fixture::new().await;
  f.variable(220, "Carne real", Some(Valuation::Real), Some(Currency::Usd)).await;
  f.variable(221, "Carne nominal", Some(Valuation::Nominal), Some(Currency::Usd)).await;
  f.variable(222, "Queso", Some(Valuation::Nominal), Some(Currency::Eur)).await;
  f.variable(223, "Leche", Some(Valuation::Nominal), Some(Currency::Uyu)).await;
  let prices = months(&[100.0, 110.0, 121.0]);
  f.series(SeriesKey::new(220, UY), Periodicity::Monthly, &prices).await;
  f.series(SeriesKey::new(221, UY), Periodicity::Monthly, &prices).await;
  f.series(SeriesKey::new(222, UY), Periodicity::Monthly, &prices).await;
  f.series(SeriesKey::new(223, UY), Periodicity::Monthly, &[]).await;
  f.series(SeriesKey::new(20, UY), Periodicity::Monthly, &months(&[40.0, 40.0, 40.0])).await;
  f.series(SeriesKey::new(9, UY), Periodicity::Monthly, &months(&[100.0, 105.0, 110.0])).await;
  f
}

fn q1_2023() -> DateRange { DateRange::between(d(2023, 1, 1), d(2023, 3, 1)).unwrap() }

#[tokio::test]
async fn dcp_real_usd_product_normalizes_to_100() {
  let f = dcp_fixture().await;
  let cfg = AnalyticsConfig::default();
  let out = dcp::indices(f.reader(), &cfg, &[Pid(2_200_858)], q1_2023()).await.unwrap();

  let s = &out.series[0];
  let values: Vec<f64> = s.points.iter().map(|p| p.value).collect();
  assert_eq!(values[0], 100.0);
  assert_relative_eq!(values[1], 110.0, epsilon = 1e-9);
  assert_relative_eq!(values[2], 121.0, epsilon = 1e-9);
  assert_relative_eq!(s.summary.variation_percent, 21.0, epsilon = 1e-9);
}

#[tokio::test]
async fn dcp_nominal_product_is_deflated_by_cpi() {
  let f = dcp_fixture().await;
  let cfg = AnalyticsConfig::default();
  let out = dcp::indices(f.reader(), &cfg, &[Pid(2_210_858)], q1_2023()).await.unwrap();

  let values: Vec<f64> = out.series[0].points.iter().map(|p| p.value).collect();
  assert_eq!(values[0], 100.0);
  assert_relative_eq!(values[1], 104.761_904_76, epsilon = 1e-6);
  assert_relative_eq!(values[2], 110.0, epsilon = 1e-9);
  assert_relative_eq!(out.series[0].summary.variation_percent, 10.0, epsilon = 1e-9);
}

#[tokio::test]
async fn dcp_bad_products_are_omitted_not_failed() {
  let f = dcp_fixture().await;
  let cfg = AnalyticsConfig::default();
  let pids = [Pid(2_200_858), Pid(2_220_858), Pid(2_230_858), Pid(9_990_858)];
  let out = dcp::indices(f.reader(), &cfg, &pids, q1_2023()).await.unwrap();

  assert_eq!(out.series.len(), 1);
  let reasons: Vec<OmitReason> = out.omitted.iter().map(|o| o.reason).collect();
  assert_eq!(reasons, vec![
    OmitReason::NoFx,
    OmitReason::NoPricesInRange,
    OmitReason::NotFound
  ]);
}

#[tokio::test]
async fn dcp_with_only_missing_references_is_unavailable() {
  let f = dcp_fixture().await;
  let cfg = AnalyticsConfig::default();
  let err = dcp::indices(f.reader(), &cfg, &[Pid(2_220_858)], q1_2023()).await;
  assert!(matches!(err, Err(Error::Unavailable(_))));
}

#[tokio::test]
async fn dcp_single_point_window_is_omitted() {
  let f = dcp_fixture().await;
  let cfg = AnalyticsConfig::default();
  let window = DateRange::between(d(2023, 3, 1), d(2023, 3, 31)).unwrap();
  let out = dcp::indices(f.reader(), &cfg, &[Pid(2_200_858)], window).await.unwrap();
  assert!(out.series.is_empty());
  assert_eq!(out.omitted[0].reason, OmitReason::FewerThanTwoPoints);
  assert_eq!(out.omitted[0].last_data_date, Some(d(2023, 3, 1)));
}

#[tokio::test]
async fn variations_are_ranked() {
  let f = dcp_fixture().await;
  let cfg = AnalyticsConfig::default();
  let desc = dcp::variations(f.reader(), &cfg, q1_2023(), dcp::SortOrder::Desc).await.unwrap();
  let ranked: Vec<Pid> = desc.items.iter().map(|v| v.pid).collect();
  // Real product (+21%) ahead of the CPI deflated one (+10%); the flat FX and
  // CPI series themselves are products too.
  let real = ranked.iter().position(|&p| p == Pid(2_200_858)).unwrap();
  let nominal = ranked.iter().position(|&p| p == Pid(2_210_858)).unwrap();
  assert!(real < nominal);
  assert!(desc.items.windows(2).all(|w| w[0].variation_percent >= w[1].variation_percent));

  let asc = dcp::variations(f.reader(), &cfg, q1_2023(), dcp::SortOrder::Asc).await.unwrap();
  assert!(asc.items.windows(2).all(|w| w[0].variation_percent <= w[1].variation_percent));
}

// ─── Dollar inflation ────────────────────────────────────────────────────────

async fn dollar_fixture() -> Fixture {
  let f = Fixture::new().await;
  f.country(32, "Argentina").await;
  f.country(152, "Chile").await;
  f.series(SeriesKey::new(20, 32), Periodicity::Daily, &[
    (d(2024, 1, 2), 800.0),
    (d(2024, 1, 3), 820.0),
    (d(2024, 2, 1), 900.0),
  ])
  .await;
  f.series(SeriesKey::new(9, 32), Periodicity::Monthly, &[
    (d(2024, 1, 1), 100.0),
    (d(2024, 2, 1), 120.0),
  ])
  .await;
  f
}

#[tokio::test]
async fn dollar_inflation_combines_cpi_and_monthly_fx() {
  let f = dollar_fixture().await;
  let cfg = AnalyticsConfig::default();
  let window = DateRange::between(d(2024, 1, 1), d(2024, 2, 29)).unwrap();
  let out = dollar_inflation::compute(f.reader(), &cfg, &[Pid(200_032), Pid(200_152)], window)
    .await
    .unwrap();

  let ar = &out.countries[0];
  assert_eq!(ar.country, "Argentina");
  assert_eq!(ar.points[0].index, 100.0);
  assert_relative_eq!(ar.points[0].fx, 810.0);
  assert_relative_eq!(ar.points[1].index, 108.0, epsilon = 1e-9);
  assert_relative_eq!(ar.delta_cpi.unwrap(), 20.0, epsilon = 1e-9);
  assert_relative_eq!(ar.delta_fx.unwrap(), 11.111_111_11, epsilon = 1e-6);

  assert_eq!(out.omitted.len(), 1);
  assert_eq!(out.omitted[0].reason, OmitReason::NoFx);

  let sheets = dollar_inflation::export_tables(&out);
  assert_eq!(sheets.len(), 3);
  assert_eq!(sheets[2].columns, vec!["Argentina IPC", "Argentina TC"]);
}

#[tokio::test]
async fn dollar_inflation_without_any_fx_is_unavailable() {
  let f = dollar_fixture().await;
  let cfg = AnalyticsConfig::default();
  let err = dollar_inflation::compute(f.reader(), &cfg, &[Pid(200_152)], DateRange::ALL).await;
  assert!(matches!(err, Err(Error::Unavailable(_))));
}

#[tokio::test]
async fn dollar_inflation_mid_month_start_keeps_first_month() {
  let f = dollar_fixture().await;
  let cfg = AnalyticsConfig::default();
  let window = DateRange::between(d(2024, 1, 15), d(2024, 2, 29)).unwrap();
  let out = dollar_inflation::compute(f.reader(), &cfg, &[Pid(200_032)], window).await.unwrap();

  let ar = &out.countries[0];
  assert_eq!(ar.points.len(), 2);
  assert_eq!(ar.first_date, d(2024, 1, 1));
  assert_relative_eq!(ar.points[0].fx, 810.0);
  assert_relative_eq!(ar.points[0].cpi, 100.0);
  assert_relative_eq!(ar.points[1].index, 108.0, epsilon = 1e-9);
}

// ─── Yield curve ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn yield_table_reports_pp_differences() {
  let f = Fixture::new().await;
  f.series(SeriesKey::new(42, UY), Periodicity::Daily, &[
    (d(2024, 11, 15), 6.0),
    (d(2025, 10, 11), 7.0),
    (d(2025, 11, 5), 7.5),
    (d(2025, 11, 10), 8.0),
  ])
  .await;

  let table = yield_curve::table(f.reader(), UY, yield_curve::CurveKind::Nominal, None)
    .await
    .unwrap();
  assert_eq!(table.reference_date, d(2025, 11, 10));

  let one_year = table.rows.iter().find(|r| r.tenor.variable_id == 42).unwrap();
  assert_eq!(one_year.value, Some(8.0));
  assert_eq!(one_year.change_5d, Some(0.5));
  assert_eq!(one_year.change_30d, Some(1.0));
  assert_eq!(one_year.change_360d, Some(2.0));
  assert_eq!(one_year.change_ytd, Some(2.0));

  let two_years = table.rows.iter().find(|r| r.tenor.variable_id == 43).unwrap();
  assert_eq!(two_years.value, None);
  assert_eq!(two_years.change_5d, None);
}

#[tokio::test]
async fn yield_missing_horizon_is_null_only_there() {
  let f = Fixture::new().await;
  f.series(SeriesKey::new(42, UY), Periodicity::Daily, &[
    (d(2025, 11, 5), 7.5),
    (d(2025, 11, 10), 8.0),
  ])
  .await;
  let table = yield_curve::table(
    f.reader(),
    UY,
    yield_curve::CurveKind::Nominal,
    Some(d(2025, 11, 10)),
  )
  .await
  .unwrap();
  let row = table.rows.iter().find(|r| r.tenor.variable_id == 42).unwrap();
  assert_eq!(row.change_5d, Some(0.5));
  assert_eq!(row.change_30d, None);
  assert_eq!(row.change_360d, None);
}

#[tokio::test]
async fn yield_snapshot_and_dates() {
  let f = Fixture::new().await;
  f.series(SeriesKey::new(37, UY), Periodicity::Daily, &[(d(2025, 1, 2), 9.1)]).await;
  f.series(SeriesKey::new(75, UY), Periodicity::Daily, &[(d(2025, 1, 3), 2.5)]).await;

  let all = yield_curve::available_dates(f.reader(), UY, None).await.unwrap();
  assert_eq!(all.dates, vec![d(2025, 1, 3), d(2025, 1, 2)]);
  let nominal =
    yield_curve::available_dates(f.reader(), UY, Some(yield_curve::CurveKind::Nominal))
      .await
      .unwrap();
  assert_eq!(nominal.latest, Some(d(2025, 1, 2)));

  let snap = yield_curve::snapshot(f.reader(), UY, yield_curve::CurveKind::Nominal, d(2025, 1, 2))
    .await
    .unwrap();
  assert_eq!(snap.len(), 15);
  assert_eq!(snap[0].value, Some(9.1));
  assert!(snap[1..].iter().all(|p| p.value.is_none()));

  let hist = yield_curve::timeseries(f.reader(), UY, &[37, 75], DateRange::ALL).await.unwrap();
  assert_eq!(hist[0].name, "1 mes (nominal)");
  assert_eq!(hist[1].name, "1 año (real)");
  assert!(yield_curve::timeseries(f.reader(), UY, &[9], DateRange::ALL).await.is_err());
}

// ─── Implicit inflation ──────────────────────────────────────────────────────

#[tokio::test]
async fn implicit_recompute_writes_declared_tenors_only() {
  let f = Fixture::new().await;
  f.series(SeriesKey::new(42, UY), Periodicity::Daily, &[
    (d(2025, 3, 3), 9.0),
    (d(2025, 3, 4), 9.2),
  ])
  .await;
  f.series(SeriesKey::new(75, UY), Periodicity::Daily, &[(d(2025, 3, 4), 3.0)]).await;
  f.series(SeriesKey::new(86, UY), Periodicity::Daily, &[]).await;

  let report = implicit::recompute(f.reader(), UY).await.unwrap();
  assert_eq!(report.written.len(), 1);
  assert_eq!(report.written[0].rows, 1);
  assert_eq!(report.skipped.len(), 9);

  let curve = implicit::curve(f.reader(), UY, None).await.unwrap();
  assert_eq!(curve.date, d(2025, 3, 4));
  assert_relative_eq!(
    curve.points[0].value.unwrap(),
    implicit::implicit_rate(9.2, 3.0),
    epsilon = 1e-9
  );
  assert!(curve.points[1].value.is_none());
}

// ─── Tenders ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn last_five_auctions_weighted_ratio() {
  let f = Fixture::new().await;
  let dates = [
    d(2025, 1, 7),
    d(2025, 1, 14),
    d(2025, 1, 21),
    d(2025, 1, 28),
    d(2025, 2, 4),
    d(2025, 2, 11),
  ];
  let announced = [999.0, 100.0, 200.0, 150.0, 300.0, 250.0];
  let ratios = [0.1, 1.0, 0.5, 0.8, 0.6, 1.0];
  let zip = |vals: &[f64]| dates.iter().copied().zip(vals.iter().copied()).collect::<Vec<_>>();
  f.series(SeriesKey::new(100, UY), Periodicity::Weekly, &zip(&announced)).await;
  f.series(SeriesKey::new(101, UY), Periodicity::Weekly, &zip(&ratios)).await;
  f.series(SeriesKey::new(102, UY), Periodicity::Weekly, &zip(&[9.0; 6])).await;
  f.series(SeriesKey::new(37, UY), Periodicity::Daily, &[(d(2025, 1, 1), 8.8)]).await;

  let cfg = AnalyticsConfig::default();
  let last = tenders::last_auctions(f.reader(), &cfg.tenders, 30, None).await.unwrap();
  assert_eq!(last.rows.len(), 5);
  assert_relative_eq!(last.total_announced, 1000.0);
  assert_relative_eq!(last.total_adjudicated, 750.0);
  assert_relative_eq!(last.weighted_ratio.unwrap(), 75.0, epsilon = 1e-9);
  assert_eq!(last.rows[0].bevsa_rate, Some(8.8));
  assert_eq!(last.rows[0].proximity, Some(tenders::Proximity::Green));

  let one = tenders::auction(f.reader(), &cfg.tenders, d(2025, 2, 11), 30).await.unwrap();
  assert_eq!(one.adjudicated_amount, Some(250.0));
  assert!(matches!(
    tenders::auction(f.reader(), &cfg.tenders, d(2025, 2, 12), 30).await,
    Err(Error::NotFound(_))
  ));

  let keys = tenders::auctions(f.reader(), &cfg.tenders).await.unwrap();
  assert_eq!(keys.len(), 6);
  assert_eq!(keys[0].date, d(2025, 2, 11));
}

#[tokio::test]
async fn bevsa_reference_and_history() {
  let f = Fixture::new().await;
  let pts: Vec<(NaiveDate, f64)> = (1..=8).map(|day| (d(2025, 3, day), 8.0 + f64::from(day) / 10.0)).collect();
  f.series(SeriesKey::new(39, UY), Periodicity::Daily, &pts).await;
  let cfg = AnalyticsConfig::default();

  let r = tenders::bevsa_reference(f.reader(), &cfg.tenders, 90, None).await.unwrap();
  assert_eq!(r.latest.unwrap().date, d(2025, 3, 8));
  assert_eq!(r.min.unwrap().date, d(2025, 3, 4));
  assert_eq!(r.max.unwrap().date, d(2025, 3, 8));

  let h = tenders::bevsa_history(f.reader(), &cfg.tenders, 90, Some(3), None).await.unwrap();
  assert_eq!(h.points.len(), 4);

  let curve = tenders::bevsa_curve(f.reader(), &cfg.tenders, Some(d(2025, 3, 5))).await.unwrap();
  assert_eq!(curve.date, Some(d(2025, 3, 5)));
}

// ─── Ticker, tidy, policy ────────────────────────────────────────────────────

#[tokio::test]
async fn ticker_formats_latest_values() {
  let f = Fixture::new().await;
  f.series(SeriesKey::new(20, UY), Periodicity::Daily, &[
    (d(2025, 5, 1), 40.0),
    (d(2025, 5, 2), 1234.5),
  ])
  .await;
  let cfg = AnalyticsConfig::default();
  let items = ticker::feed(f.reader(), &cfg.ticker).await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].label, "USD/UYU");
  assert_eq!(items[0].display, "1.234,50");
}

#[tokio::test]
async fn tidy_export_pivots_per_variable() {
  let f = Fixture::new().await;
  f.country(32, "Argentina").await;
  f.series(SeriesKey::new(20, UY), Periodicity::Daily, &[(d(2025, 1, 1), 40.0), (d(2025, 1, 2), 41.0)])
    .await;
  f.series(SeriesKey::new(20, 32), Periodicity::Daily, &[(d(2025, 1, 2), 1000.0)]).await;

  let selection = tidy::Selection {
    variable_ids: &[20],
    country_ids:  &[UY, 32],
    window:       DateRange::ALL,
  };
  let tables = tidy::export(f.reader(), &selection).await.unwrap();
  assert_eq!(tables.len(), 1);
  assert_eq!(tables[0].columns, vec!["Uruguay", "Argentina"]);
  assert_eq!(tables[0].rows[1].values, vec![Some(41.0), Some(1000.0)]);

  let preview = tidy::preview(f.reader(), &selection).await.unwrap();
  assert_eq!(preview.len(), 3);
  for row in &preview {
    assert!(tables[0].cells().any(|(col, date, v)| col == row.country && date == row.date && v == row.value));
  }

  let countries = tidy::countries_for(f.reader(), &[20]).await.unwrap();
  assert_eq!(countries.len(), 2);
}

#[tokio::test]
async fn policy_dashboard_row_for_uruguay() {
  let f = Fixture::new().await;
  f.series(SeriesKey::new(9, UY), Periodicity::Monthly, &[
    (d(2024, 6, 1), 100.0),
    (d(2025, 6, 1), 105.0),
  ])
  .await;
  f.series(SeriesKey::new(30, UY), Periodicity::Daily, &[
    (d(2025, 5, 1), 9.0),
    (d(2025, 6, 1), 9.25),
    (d(2025, 6, 2), 9.25),
  ])
  .await;
  f.series(SeriesKey::new(32, UY), Periodicity::Monthly, &[(d(2025, 6, 1), 5.5)]).await;
  f.series(SeriesKey::new(33, UY), Periodicity::Daily, &[(d(2025, 6, 2), 0.0105)]).await;

  let cfg = AnalyticsConfig::default();
  let rows = policy::dashboard(f.reader(), &cfg).await.unwrap();
  let uy = rows.iter().find(|r| r.country_id == UY).unwrap();
  assert_eq!(uy.name, "Uruguay");
  assert_relative_eq!(uy.inflation.unwrap(), 5.0, epsilon = 1e-9);
  assert_eq!(uy.inflation_in_range, Some(true));
  let rate = uy.policy_rate.unwrap();
  assert_eq!(rate.since, d(2025, 6, 1));
  assert_eq!(rate.change, Some(0.25));
  assert_relative_eq!(uy.embi.unwrap(), 1.05, epsilon = 1e-9);
  assert_relative_eq!(uy.real_rate.unwrap(), policy::real_rate(9.25, 5.5), epsilon = 1e-9);

  let cl = rows.iter().find(|r| r.code == "CL").unwrap();
  assert!(cl.policy_rate.is_none());
  assert!(cl.inflation.is_none());
}
