//! Handlers for the tidy export wizard.
//!
//! The client walks family → sub-family → variables → countries, previews the
//! selection and downloads it as one wide sheet per variable.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/export/families` | |
//! | `GET`  | `/export/subfamilies` | Optional `family_id` |
//! | `GET`  | `/export/variables` | Optional `subfamily_id` |
//! | `GET`  | `/export/countries` | Countries tracked for `variable_ids[]` |
//! | `GET`  | `/export/preview` | `variable_ids[]`, `country_ids[]`, `date_from`, `date_to` |
//! | `GET`  | `/export/download` | Same selection as `.xlsx` |

use axum::{Json, extract::State, response::Response};
use cifras_analytics::tidy::{self, Selection, TidyRow};
use cifras_core::{
  catalog::{Country, Family, SubFamily, Variable},
  store::SeriesStore,
};

use crate::{ApiState, error::{ApiError, lift}, params::Params, xlsx_attachment};

pub async fn families<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<Family>>, ApiError>
where
  S: SeriesStore + 'static,
{
  Ok(Json(state.store.list_families().await.map_err(lift)?))
}

/// `GET /export/subfamilies[?family_id=..]`
pub async fn subfamilies<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<SubFamily>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let family_id = params.parse("family_id")?;
  Ok(Json(state.store.list_subfamilies(family_id).await.map_err(lift)?))
}

/// `GET /export/variables[?subfamily_id=..]`
pub async fn variables<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<Variable>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let subfamily_id = params.parse("subfamily_id")?;
  Ok(Json(state.store.list_variables(subfamily_id).await.map_err(lift)?))
}

/// `GET /export/countries?variable_ids[]=..`
pub async fn countries<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<Country>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let ids: Vec<i64> = params.parse_list("variable_ids")?;
  Ok(Json(tidy::countries_for(state.reader(), &ids).await?))
}

struct Owned {
  variable_ids: Vec<i64>,
  country_ids:  Vec<i64>,
  window:       cifras_core::series::DateRange,
}

impl Owned {
  fn from_params(params: &Params) -> Result<Self, ApiError> {
    Ok(Self {
      variable_ids: params.parse_list("variable_ids")?,
      country_ids:  params.parse_list("country_ids")?,
      window:       params.window()?,
    })
  }

  fn selection(&self) -> Selection<'_> {
    Selection { variable_ids: &self.variable_ids, country_ids: &self.country_ids, window: self.window }
  }
}

/// `GET /export/preview?variable_ids[]=..&country_ids[]=..`
pub async fn preview<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Json<Vec<TidyRow>>, ApiError>
where
  S: SeriesStore + 'static,
{
  let sel = Owned::from_params(&params)?;
  Ok(Json(tidy::preview(state.reader(), &sel.selection()).await?))
}

/// `GET /export/download`: same selection as the preview.
pub async fn download<S>(
  State(state): State<ApiState<S>>,
  params: Params,
) -> Result<Response, ApiError>
where
  S: SeriesStore + 'static,
{
  let sel = Owned::from_params(&params)?;
  let tables = tidy::export(state.reader(), &sel.selection()).await?;
  let bytes = cifras_xlsx::write_tables(&tables)?;
  Ok(xlsx_attachment("series.xlsx", bytes))
}
