//! [`SqliteStore`]: the SQLite implementation of [`SeriesStore`].

use std::{
  collections::{BTreeSet, HashSet},
  path::Path,
};

use chrono::NaiveDate;
use rusqlite::{OptionalExtension as _, types::Value};

use cifras_core::{
  catalog::{
    Country, Family, Graph, Maestro, MaestroBulk, MaestroFields, MaestroFilter,
    NewFamily, NewGraph, NewSubFamily, NewVariable, Product, SeriesType,
    SubFamily, Variable,
  },
  series::{DateRange, Observation, PID_FACTOR, Point, SeriesKey},
  store::SeriesStore,
};

use crate::{
  Error, Result,
  encode::{
    MAESTRO_COLUMNS, PRODUCT_SELECT, RawMaestro, RawProduct, RawVariable,
    VARIABLE_COLUMNS, decode_date, encode_date, lower_bound, upper_bound,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cifras store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Calls are
/// serialised onto the connection's thread, so a check-then-write inside one
/// call cannot interleave with another request.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }
}

// ─── SQL helpers ─────────────────────────────────────────────────────────────

fn exists(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

fn count(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<i64> {
  conn.query_row(sql, params, |r| r.get(0))
}

/// `?start, ?start+1, …` for an `IN (…)` list of `n` items.
fn placeholders(start: usize, n: usize) -> String {
  (start..start + n)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

fn required_name(name: &str, what: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::Invalid(format!("{what} must not be empty")));
  }
  Ok(trimmed.to_owned())
}

/// A table that blocks deletion while it still references the row.
struct Dependent {
  count_sql: &'static str,
  label:     &'static str,
}

/// Delete a row inside a transaction, after checking it exists and that no
/// [`Dependent`] references it. `params` bind every statement.
fn guarded_delete(
  conn: &mut rusqlite::Connection,
  entity: &str,
  exists_sql: &str,
  dependents: &[Dependent],
  delete_sql: &str,
  params: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Result<()>> {
  let tx = conn.transaction()?;
  if !exists(&tx, exists_sql, params)? {
    return Ok(Err(Error::NotFound(entity.to_owned())));
  }
  for dep in dependents {
    let n = count(&tx, dep.count_sql, params)?;
    if n > 0 {
      return Ok(Err(Error::Conflict(format!(
        "no se puede eliminar {entity}: tiene {n} {}",
        dep.label
      ))));
    }
  }
  tx.execute(delete_sql, params)?;
  tx.commit()?;
  Ok(Ok(()))
}

fn insert_maestro(conn: &rusqlite::Connection, m: &Maestro) -> rusqlite::Result<()> {
  let f = &m.fields;
  conn.execute(
    "INSERT INTO maestros (
       variable_id, country_id, periodicity, source, active,
       link, script, notes, category, kind
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    rusqlite::params![
      m.variable_id,
      m.country_id,
      f.periodicity.code(),
      f.source,
      f.active,
      f.link,
      f.script,
      f.notes,
      f.category,
      f.kind,
    ],
  )?;
  Ok(())
}

fn query_points(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<(String, f64)>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect()
}

fn decode_points(raw: Vec<(String, f64)>) -> Result<Vec<Point>> {
  raw
    .into_iter()
    .map(|(d, v)| Ok(Point::new(decode_date(&d)?, v)))
    .collect()
}

// ─── SeriesStore impl ────────────────────────────────────────────────────────

impl SeriesStore for SqliteStore {
  type Error = Error;

  // ── Families ──────────────────────────────────────────────────────────────

  async fn list_families(&self) -> Result<Vec<Family>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT id, name FROM families ORDER BY name")?;
          let rows = stmt
            .query_map([], |row| Ok(Family { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_family(&self, id: i64) -> Result<Option<Family>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name FROM families WHERE id = ?1",
                [id],
                |row| Ok(Family { id: row.get(0)?, name: row.get(1)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_family(&self, input: NewFamily) -> Result<Family> {
    let name = required_name(&input.name, "family name")?;
    self
      .conn
      .call(move |conn| {
        if exists(conn, "SELECT 1 FROM families WHERE name = ?1", [&name])? {
          return Ok(Err(Error::Conflict(format!(
            "ya existe una familia llamada {name:?}"
          ))));
        }
        conn.execute("INSERT INTO families (name) VALUES (?1)", [&name])?;
        Ok(Ok(Family { id: conn.last_insert_rowid(), name }))
      })
      .await?
  }

  async fn update_family(&self, id: i64, input: NewFamily) -> Result<Family> {
    let name = required_name(&input.name, "family name")?;
    self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM families WHERE id = ?1", [id])? {
          return Ok(Err(Error::NotFound(format!("la familia {id}"))));
        }
        if exists(
          conn,
          "SELECT 1 FROM families WHERE name = ?1 AND id != ?2",
          rusqlite::params![name, id],
        )? {
          return Ok(Err(Error::Conflict(format!(
            "ya existe una familia llamada {name:?}"
          ))));
        }
        conn.execute(
          "UPDATE families SET name = ?1 WHERE id = ?2",
          rusqlite::params![name, id],
        )?;
        Ok(Ok(Family { id, name }))
      })
      .await?
  }

  async fn delete_family(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(guarded_delete(
          conn,
          &format!("la familia {id}"),
          "SELECT 1 FROM families WHERE id = ?1",
          &[Dependent {
            count_sql: "SELECT COUNT(*) FROM subfamilies WHERE family_id = ?1",
            label:     "sub-familias asociadas",
          }],
          "DELETE FROM families WHERE id = ?1",
          &[&id],
        )?)
      })
      .await?
  }

  // ── Sub-families ──────────────────────────────────────────────────────────

  async fn list_subfamilies(&self, family_id: Option<i64>) -> Result<Vec<SubFamily>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT id, name, family_id FROM subfamilies
             WHERE (?1 IS NULL OR family_id = ?1)
             ORDER BY name",
          )?;
          let rows = stmt
            .query_map([family_id], |row| {
              Ok(SubFamily {
                id:        row.get(0)?,
                name:      row.get(1)?,
                family_id: row.get(2)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_subfamily(&self, id: i64) -> Result<Option<SubFamily>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, family_id FROM subfamilies WHERE id = ?1",
                [id],
                |row| {
                  Ok(SubFamily {
                    id:        row.get(0)?,
                    name:      row.get(1)?,
                    family_id: row.get(2)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_subfamily(&self, input: NewSubFamily) -> Result<SubFamily> {
    let name = required_name(&input.name, "sub-family name")?;
    let family_id = input.family_id;
    self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM families WHERE id = ?1", [family_id])? {
          return Ok(Err(Error::Conflict(format!(
            "la familia {family_id} no existe"
          ))));
        }
        conn.execute(
          "INSERT INTO subfamilies (name, family_id) VALUES (?1, ?2)",
          rusqlite::params![name, family_id],
        )?;
        Ok(Ok(SubFamily { id: conn.last_insert_rowid(), name, family_id }))
      })
      .await?
  }

  async fn update_subfamily(&self, id: i64, input: NewSubFamily) -> Result<SubFamily> {
    let name = required_name(&input.name, "sub-family name")?;
    let family_id = input.family_id;
    self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM subfamilies WHERE id = ?1", [id])? {
          return Ok(Err(Error::NotFound(format!("la sub-familia {id}"))));
        }
        if !exists(conn, "SELECT 1 FROM families WHERE id = ?1", [family_id])? {
          return Ok(Err(Error::Conflict(format!(
            "la familia {family_id} no existe"
          ))));
        }
        conn.execute(
          "UPDATE subfamilies SET name = ?1, family_id = ?2 WHERE id = ?3",
          rusqlite::params![name, family_id, id],
        )?;
        Ok(Ok(SubFamily { id, name, family_id }))
      })
      .await?
  }

  async fn delete_subfamily(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(guarded_delete(
          conn,
          &format!("la sub-familia {id}"),
          "SELECT 1 FROM subfamilies WHERE id = ?1",
          &[Dependent {
            count_sql: "SELECT COUNT(*) FROM variables WHERE subfamily_id = ?1",
            label:     "variables asociadas",
          }],
          "DELETE FROM subfamilies WHERE id = ?1",
          &[&id],
        )?)
      })
      .await?
  }

  // ── Series types ──────────────────────────────────────────────────────────

  async fn list_series_types(&self) -> Result<Vec<SeriesType>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT id, name FROM series_types ORDER BY id")?;
          let rows = stmt
            .query_map([], |row| Ok(SeriesType { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  // ── Variables ─────────────────────────────────────────────────────────────

  async fn list_variables(&self, subfamily_id: Option<i64>) -> Result<Vec<Variable>> {
    let raws: Vec<RawVariable> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {VARIABLE_COLUMNS} FROM variables
           WHERE (?1 IS NULL OR subfamily_id = ?1)
           ORDER BY name"
        ))?;
        let rows = stmt
          .query_map([subfamily_id], RawVariable::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVariable::into_variable).collect()
  }

  async fn get_variable(&self, id: i64) -> Result<Option<Variable>> {
    let raw: Option<RawVariable> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {VARIABLE_COLUMNS} FROM variables WHERE id = ?1"),
              [id],
              RawVariable::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawVariable::into_variable).transpose()
  }

  async fn create_variable(&self, input: NewVariable) -> Result<Variable> {
    let name = required_name(&input.name, "variable name")?;
    self
      .conn
      .call(move |conn| {
        if let Some(err) = variable_fk_violation(conn, &input)? {
          return Ok(Err(err));
        }
        if let Some(id) = input.id
          && exists(conn, "SELECT 1 FROM variables WHERE id = ?1", [id])?
        {
          return Ok(Err(Error::Conflict(format!("ya existe la variable {id}"))));
        }
        conn.execute(
          "INSERT INTO variables (
             id, name, subfamily_id, nominal_or_real, currency, series_type_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            input.id,
            name,
            input.subfamily_id,
            input.nominal_or_real.map(|v| v.code()),
            input.currency.map(|c| c.code()),
            input.series_type_id,
          ],
        )?;
        Ok(Ok(Variable {
          id: conn.last_insert_rowid(),
          name,
          subfamily_id: input.subfamily_id,
          nominal_or_real: input.nominal_or_real,
          currency: input.currency,
          series_type_id: input.series_type_id,
        }))
      })
      .await?
  }

  async fn update_variable(&self, id: i64, input: NewVariable) -> Result<Variable> {
    let name = required_name(&input.name, "variable name")?;
    self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM variables WHERE id = ?1", [id])? {
          return Ok(Err(Error::NotFound(format!("la variable {id}"))));
        }
        if let Some(err) = variable_fk_violation(conn, &input)? {
          return Ok(Err(err));
        }
        conn.execute(
          "UPDATE variables
           SET name = ?1, subfamily_id = ?2, nominal_or_real = ?3,
               currency = ?4, series_type_id = ?5
           WHERE id = ?6",
          rusqlite::params![
            name,
            input.subfamily_id,
            input.nominal_or_real.map(|v| v.code()),
            input.currency.map(|c| c.code()),
            input.series_type_id,
            id,
          ],
        )?;
        Ok(Ok(Variable {
          id,
          name,
          subfamily_id: input.subfamily_id,
          nominal_or_real: input.nominal_or_real,
          currency: input.currency,
          series_type_id: input.series_type_id,
        }))
      })
      .await?
  }

  async fn delete_variable(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(guarded_delete(
          conn,
          &format!("la variable {id}"),
          "SELECT 1 FROM variables WHERE id = ?1",
          &[Dependent {
            count_sql: "SELECT COUNT(*) FROM maestros WHERE variable_id = ?1",
            label:     "filas de maestro asociadas",
          }],
          "DELETE FROM variables WHERE id = ?1",
          &[&id],
        )?)
      })
      .await?
  }

  // ── Countries ─────────────────────────────────────────────────────────────

  async fn list_countries(&self) -> Result<Vec<Country>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT id, name FROM countries ORDER BY name")?;
          let rows = stmt
            .query_map([], |row| Ok(Country { id: row.get(0)?, name: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_country(&self, id: i64) -> Result<Option<Country>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name FROM countries WHERE id = ?1",
                [id],
                |row| Ok(Country { id: row.get(0)?, name: row.get(1)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_country(&self, input: Country) -> Result<Country> {
    let name = required_name(&input.name, "country name")?;
    let id = input.id;
    if id <= 0 {
      return Err(Error::Invalid(format!("country id must be positive, got {id}")));
    }
    // Product ids pack the country into the low four digits.
    if id >= PID_FACTOR {
      return Err(Error::Invalid(format!(
        "country id must be below {PID_FACTOR}, got {id}"
      )));
    }
    self
      .conn
      .call(move |conn| {
        if exists(conn, "SELECT 1 FROM countries WHERE id = ?1", [id])? {
          return Ok(Err(Error::Conflict(format!("ya existe el país {id}"))));
        }
        if exists(conn, "SELECT 1 FROM countries WHERE name = ?1", [&name])? {
          return Ok(Err(Error::Conflict(format!(
            "ya existe un país llamado {name:?}"
          ))));
        }
        conn.execute(
          "INSERT INTO countries (id, name) VALUES (?1, ?2)",
          rusqlite::params![id, name],
        )?;
        Ok(Ok(Country { id, name }))
      })
      .await?
  }

  async fn update_country(&self, id: i64, name: String) -> Result<Country> {
    let name = required_name(&name, "country name")?;
    self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM countries WHERE id = ?1", [id])? {
          return Ok(Err(Error::NotFound(format!("el país {id}"))));
        }
        if exists(
          conn,
          "SELECT 1 FROM countries WHERE name = ?1 AND id != ?2",
          rusqlite::params![name, id],
        )? {
          return Ok(Err(Error::Conflict(format!(
            "ya existe un país llamado {name:?}"
          ))));
        }
        conn.execute(
          "UPDATE countries SET name = ?1 WHERE id = ?2",
          rusqlite::params![name, id],
        )?;
        Ok(Ok(Country { id, name }))
      })
      .await?
  }

  async fn delete_country(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(guarded_delete(
          conn,
          &format!("el país {id}"),
          "SELECT 1 FROM countries WHERE id = ?1",
          &[Dependent {
            count_sql: "SELECT COUNT(*) FROM maestros WHERE country_id = ?1",
            label:     "filas de maestro asociadas",
          }],
          "DELETE FROM countries WHERE id = ?1",
          &[&id],
        )?)
      })
      .await?
  }

  // ── Maestro ───────────────────────────────────────────────────────────────

  async fn list_maestros(&self, filter: MaestroFilter) -> Result<Vec<Maestro>> {
    let raws: Vec<RawMaestro> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MAESTRO_COLUMNS} FROM maestros
           WHERE (?1 IS NULL OR variable_id = ?1)
             AND (?2 IS NULL OR country_id = ?2)
             AND (?3 IS NULL OR active = ?3)
           ORDER BY variable_id, country_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![filter.variable_id, filter.country_id, filter.active],
            RawMaestro::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMaestro::into_maestro).collect()
  }

  async fn get_maestro(&self, key: SeriesKey) -> Result<Option<Maestro>> {
    let raw: Option<RawMaestro> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MAESTRO_COLUMNS} FROM maestros
                 WHERE variable_id = ?1 AND country_id = ?2"
              ),
              [key.variable_id, key.country_id],
              RawMaestro::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawMaestro::into_maestro).transpose()
  }

  async fn create_maestro(&self, input: Maestro) -> Result<Maestro> {
    self
      .conn
      .call(move |conn| {
        let (v, c) = (input.variable_id, input.country_id);
        if !exists(conn, "SELECT 1 FROM variables WHERE id = ?1", [v])? {
          return Ok(Err(Error::Conflict(format!("la variable {v} no existe"))));
        }
        if !exists(conn, "SELECT 1 FROM countries WHERE id = ?1", [c])? {
          return Ok(Err(Error::Conflict(format!("el país {c} no existe"))));
        }
        if exists(
          conn,
          "SELECT 1 FROM maestros WHERE variable_id = ?1 AND country_id = ?2",
          [v, c],
        )? {
          return Ok(Err(Error::Conflict(format!(
            "la variable {v} ya está declarada para el país {c}"
          ))));
        }
        insert_maestro(conn, &input)?;
        Ok(Ok(input))
      })
      .await?
  }

  async fn create_maestros(&self, input: MaestroBulk) -> Result<Vec<Maestro>> {
    if input.country_ids.is_empty() {
      return Err(Error::Invalid("country_ids must not be empty".to_owned()));
    }
    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let v = input.variable_id;
        let mut failures = Vec::new();

        if !exists(&tx, "SELECT 1 FROM variables WHERE id = ?1", [v])? {
          failures.push(format!("variable {v}: no existe"));
        }
        let mut seen = HashSet::new();
        for &c in &input.country_ids {
          if !seen.insert(c) {
            failures.push(format!("país {c}: repetido en la solicitud"));
          } else if !exists(&tx, "SELECT 1 FROM countries WHERE id = ?1", [c])? {
            failures.push(format!("país {c}: no existe"));
          } else if exists(
            &tx,
            "SELECT 1 FROM maestros WHERE variable_id = ?1 AND country_id = ?2",
            [v, c],
          )? {
            failures.push(format!("país {c}: la variable {v} ya está declarada"));
          }
        }
        if !failures.is_empty() {
          return Ok(Err(Error::Conflict(format!(
            "carga masiva rechazada: {}",
            failures.join("; ")
          ))));
        }

        let rows: Vec<Maestro> = input
          .country_ids
          .iter()
          .map(|&c| Maestro::new(SeriesKey::new(v, c), input.fields.clone()))
          .collect();
        for m in &rows {
          insert_maestro(&tx, m)?;
        }
        tx.commit()?;
        Ok(Ok(rows))
      })
      .await??;
    tracing::info!(count = created.len(), "maestro rows created in bulk");
    Ok(created)
  }

  async fn update_maestro(&self, key: SeriesKey, fields: MaestroFields) -> Result<Maestro> {
    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE maestros
           SET periodicity = ?1, source = ?2, active = ?3, link = ?4,
               script = ?5, notes = ?6, category = ?7, kind = ?8
           WHERE variable_id = ?9 AND country_id = ?10",
          rusqlite::params![
            fields.periodicity.code(),
            fields.source,
            fields.active,
            fields.link,
            fields.script,
            fields.notes,
            fields.category,
            fields.kind,
            key.variable_id,
            key.country_id,
          ],
        )?;
        if changed == 0 {
          return Ok(Err(Error::NotFound(format!("el maestro ({key})"))));
        }
        Ok(Ok(Maestro::new(key, fields)))
      })
      .await?
  }

  async fn delete_maestro(&self, key: SeriesKey) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(guarded_delete(
          conn,
          &format!("el maestro ({key})"),
          "SELECT 1 FROM maestros WHERE variable_id = ?1 AND country_id = ?2",
          &[Dependent {
            count_sql: "SELECT COUNT(*) FROM observations
                        WHERE variable_id = ?1 AND country_id = ?2",
            label:     "observaciones",
          }],
          "DELETE FROM maestros WHERE variable_id = ?1 AND country_id = ?2",
          &[&key.variable_id, &key.country_id],
        )?)
      })
      .await?
  }

  // ── Graphs ────────────────────────────────────────────────────────────────

  async fn list_graphs(&self) -> Result<Vec<Graph>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt =
            conn.prepare("SELECT id, name, selector FROM graphs ORDER BY name")?;
          let rows = stmt
            .query_map([], |row| {
              Ok(Graph { id: row.get(0)?, name: row.get(1)?, selector: row.get(2)? })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn get_graph(&self, id: i64) -> Result<Option<Graph>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, selector FROM graphs WHERE id = ?1",
                [id],
                |row| {
                  Ok(Graph { id: row.get(0)?, name: row.get(1)?, selector: row.get(2)? })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn create_graph(&self, input: NewGraph) -> Result<Graph> {
    let name = required_name(&input.name, "graph name")?;
    Ok(
      self
        .conn
        .call(move |conn| {
          conn.execute(
            "INSERT INTO graphs (name, selector) VALUES (?1, ?2)",
            rusqlite::params![name, input.selector],
          )?;
          Ok(Graph { id: conn.last_insert_rowid(), name, selector: input.selector })
        })
        .await?,
    )
  }

  async fn update_graph(&self, id: i64, input: NewGraph) -> Result<Graph> {
    let name = required_name(&input.name, "graph name")?;
    self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE graphs SET name = ?1, selector = ?2 WHERE id = ?3",
          rusqlite::params![name, input.selector, id],
        )?;
        if changed == 0 {
          return Ok(Err(Error::NotFound(format!("el gráfico {id}"))));
        }
        Ok(Ok(Graph { id, name, selector: input.selector }))
      })
      .await?
  }

  async fn delete_graph(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(guarded_delete(
          conn,
          &format!("el gráfico {id}"),
          "SELECT 1 FROM graphs WHERE id = ?1",
          &[],
          "DELETE FROM graphs WHERE id = ?1",
          &[&id],
        )?)
      })
      .await?
  }

  async fn graph_countries(&self, graph_id: i64) -> Result<Vec<i64>> {
    self
      .conn
      .call(move |conn| {
        if !exists(conn, "SELECT 1 FROM graphs WHERE id = ?1", [graph_id])? {
          return Ok(Err(Error::NotFound(format!("el gráfico {graph_id}"))));
        }
        let mut stmt = conn.prepare(
          "SELECT country_id FROM graph_countries WHERE graph_id = ?1 ORDER BY country_id",
        )?;
        let ids = stmt
          .query_map([graph_id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(Ok(ids))
      })
      .await?
  }

  async fn replace_graph_countries(
    &self,
    graph_id: i64,
    country_ids: Vec<i64>,
  ) -> Result<Vec<i64>> {
    let ids: Vec<i64> = country_ids
      .into_iter()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !exists(&tx, "SELECT 1 FROM graphs WHERE id = ?1", [graph_id])? {
          return Ok(Err(Error::NotFound(format!("el gráfico {graph_id}"))));
        }
        for &c in &ids {
          if !exists(&tx, "SELECT 1 FROM countries WHERE id = ?1", [c])? {
            return Ok(Err(Error::Conflict(format!("el país {c} no existe"))));
          }
        }
        tx.execute("DELETE FROM graph_countries WHERE graph_id = ?1", [graph_id])?;
        for &c in &ids {
          tx.execute(
            "INSERT INTO graph_countries (graph_id, country_id) VALUES (?1, ?2)",
            [graph_id, c],
          )?;
        }
        tx.commit()?;
        Ok(Ok(ids))
      })
      .await?
  }

  // ── Products ──────────────────────────────────────────────────────────────

  async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
    let raws: Vec<RawProduct> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{PRODUCT_SELECT}
           WHERE (?1 = 0 OR m.active = 1)
           ORDER BY f.name, s.name, v.name, c.name"
        ))?;
        let rows = stmt
          .query_map([active_only], RawProduct::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawProduct::into_product).collect()
  }

  async fn get_product(&self, key: SeriesKey) -> Result<Option<Product>> {
    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{PRODUCT_SELECT} WHERE m.variable_id = ?1 AND m.country_id = ?2"),
              [key.variable_id, key.country_id],
              RawProduct::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProduct::into_product).transpose()
  }

  // ── Observations ──────────────────────────────────────────────────────────

  async fn read_series(&self, key: SeriesKey, range: DateRange) -> Result<Vec<Point>> {
    let from = lower_bound(range.from);
    let until = upper_bound(range.to);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(query_points(
          conn,
          "SELECT date, value FROM observations
           WHERE variable_id = ?1 AND country_id = ?2
             AND date >= ?3 AND date < ?4
           ORDER BY date",
          rusqlite::params![key.variable_id, key.country_id, from, until],
        )?)
      })
      .await?;
    decode_points(raw)
  }

  async fn read_long(
    &self,
    variable_ids: &[i64],
    country_ids: &[i64],
    range: DateRange,
  ) -> Result<Vec<Observation>> {
    if variable_ids.is_empty() || country_ids.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!(
      "SELECT variable_id, country_id, date, value FROM observations
       WHERE variable_id IN ({}) AND country_id IN ({})
         AND date >= ?1 AND date < ?2
       ORDER BY variable_id, country_id, date",
      placeholders(3, variable_ids.len()),
      placeholders(3 + variable_ids.len(), country_ids.len()),
    );
    let mut params = vec![
      Value::Text(lower_bound(range.from)),
      Value::Text(upper_bound(range.to)),
    ];
    params.extend(variable_ids.iter().map(|&v| Value::Integer(v)));
    params.extend(country_ids.iter().map(|&c| Value::Integer(c)));

    let raws: Vec<(i64, i64, String, f64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(variable_id, country_id, date, value)| {
        Ok(Observation { variable_id, country_id, date: decode_date(&date)?, value })
      })
      .collect()
  }

  async fn latest_at(
    &self,
    key: SeriesKey,
    on_or_before: Option<NaiveDate>,
  ) -> Result<Option<Point>> {
    Ok(self.recent(key, on_or_before, 1).await?.into_iter().next())
  }

  async fn recent(
    &self,
    key: SeriesKey,
    on_or_before: Option<NaiveDate>,
    limit: usize,
  ) -> Result<Vec<Point>> {
    let until = upper_bound(on_or_before);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(query_points(
          conn,
          "SELECT date, value FROM observations
           WHERE variable_id = ?1 AND country_id = ?2 AND date < ?3
           ORDER BY date DESC
           LIMIT ?4",
          rusqlite::params![key.variable_id, key.country_id, until, limit],
        )?)
      })
      .await?;
    decode_points(raw)
  }

  async fn observation_dates(
    &self,
    variable_ids: &[i64],
    country_id: i64,
  ) -> Result<Vec<NaiveDate>> {
    if variable_ids.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!(
      "SELECT DISTINCT substr(date, 1, 10) AS day FROM observations
       WHERE country_id = ?1 AND variable_id IN ({})
       ORDER BY day DESC",
      placeholders(2, variable_ids.len()),
    );
    let mut params = vec![Value::Integer(country_id)];
    params.extend(variable_ids.iter().map(|&v| Value::Integer(v)));

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.iter().map(|d| decode_date(d)).collect()
  }

  async fn values_on(
    &self,
    variable_ids: &[i64],
    country_id: i64,
    date: NaiveDate,
  ) -> Result<Vec<(i64, f64)>> {
    if variable_ids.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!(
      "SELECT variable_id, value FROM observations
       WHERE country_id = ?1 AND date >= ?2 AND date < ?3
         AND variable_id IN ({})
       ORDER BY variable_id, date",
      placeholders(4, variable_ids.len()),
    );
    let mut params = vec![
      Value::Integer(country_id),
      Value::Text(encode_date(date)),
      Value::Text(upper_bound(Some(date))),
    ];
    params.extend(variable_ids.iter().map(|&v| Value::Integer(v)));

    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
              Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<(i64, f64)>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn store_observations(&self, rows: Vec<Observation>) -> Result<usize> {
    if rows.is_empty() {
      return Ok(0);
    }
    if let Some(bad) = rows.iter().find(|o| !o.value.is_finite()) {
      return Err(Error::Invalid(format!(
        "non-finite value for {} on {}",
        bad.key(),
        bad.date
      )));
    }
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let keys: BTreeSet<SeriesKey> = rows.iter().map(Observation::key).collect();
        let missing: Vec<String> = keys
          .iter()
          .filter_map(|k| {
            match exists(
              &tx,
              "SELECT 1 FROM maestros WHERE variable_id = ?1 AND country_id = ?2",
              [k.variable_id, k.country_id],
            ) {
              Ok(true) => None,
              Ok(false) => Some(Ok(k.to_string())),
              Err(e) => Some(Err(e)),
            }
          })
          .collect::<rusqlite::Result<_>>()?;
        if !missing.is_empty() {
          return Ok(Err(Error::Conflict(format!(
            "observaciones sin fila de maestro: {}",
            missing.join(", ")
          ))));
        }
        {
          let mut stmt = tx.prepare(
            "INSERT INTO observations (variable_id, country_id, date, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (variable_id, country_id, date)
             DO UPDATE SET value = excluded.value",
          )?;
          for o in &rows {
            stmt.execute(rusqlite::params![
              o.variable_id,
              o.country_id,
              encode_date(o.date),
              o.value
            ])?;
          }
        }
        tx.commit()?;
        Ok(Ok(rows.len()))
      })
      .await??;
    tracing::debug!(rows = written, "observations upserted");
    Ok(written)
  }
}

/// Check the foreign keys a variable row points at.
fn variable_fk_violation(
  conn: &rusqlite::Connection,
  input: &NewVariable,
) -> rusqlite::Result<Option<Error>> {
  let sf = input.subfamily_id;
  if !exists(conn, "SELECT 1 FROM subfamilies WHERE id = ?1", [sf])? {
    return Ok(Some(Error::Conflict(format!("la sub-familia {sf} no existe"))));
  }
  if let Some(st) = input.series_type_id
    && !exists(conn, "SELECT 1 FROM series_types WHERE id = ?1", [st])?
  {
    return Ok(Some(Error::Conflict(format!("el tipo de serie {st} no existe"))));
  }
  Ok(None)
}
