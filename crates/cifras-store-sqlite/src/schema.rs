//! SQL schema for the Cifras SQLite store.
//!
//! Executed once at connection startup. Observations live in one dense table
//! whose primary key `(variable_id, country_id, date)` doubles as the covering
//! index for range scans.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS families (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS subfamilies (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    family_id  INTEGER NOT NULL REFERENCES families(id)
);

CREATE TABLE IF NOT EXISTS series_types (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO series_types (id, name) VALUES
    (1, 'Original'),
    (2, 'Desestacionalizada'),
    (3, 'Tendencia-ciclo');

CREATE TABLE IF NOT EXISTS variables (
    id               INTEGER PRIMARY KEY,
    name             TEXT NOT NULL,
    subfamily_id     INTEGER NOT NULL REFERENCES subfamilies(id),
    nominal_or_real  TEXT CHECK (nominal_or_real IN ('n', 'r')),
    currency         TEXT CHECK (currency IN ('usd', 'eur', 'uyu')),
    series_type_id   INTEGER REFERENCES series_types(id)
);

-- ISO-numeric-style ids are supplied by the caller, never generated.
CREATE TABLE IF NOT EXISTS countries (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS maestros (
    variable_id  INTEGER NOT NULL REFERENCES variables(id),
    country_id   INTEGER NOT NULL REFERENCES countries(id),
    periodicity  TEXT NOT NULL CHECK (periodicity IN ('D', 'W', 'M')),
    source       TEXT,
    active       INTEGER NOT NULL DEFAULT 1,
    link         TEXT,
    script       TEXT,
    notes        TEXT,
    category     TEXT,   -- legacy 'categoria', opaque
    kind         TEXT,   -- legacy 'tipo', opaque
    PRIMARY KEY (variable_id, country_id)
);

-- Written by the ingestion pipeline; treated as immutable by the API.
CREATE TABLE IF NOT EXISTS observations (
    variable_id  INTEGER NOT NULL,
    country_id   INTEGER NOT NULL,
    date         TEXT NOT NULL,   -- YYYY-MM-DD
    value        REAL NOT NULL,
    PRIMARY KEY (variable_id, country_id, date),
    FOREIGN KEY (variable_id, country_id)
        REFERENCES maestros(variable_id, country_id)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS graphs (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL,
    selector  TEXT
);

CREATE TABLE IF NOT EXISTS graph_countries (
    graph_id    INTEGER NOT NULL REFERENCES graphs(id) ON DELETE CASCADE,
    country_id  INTEGER NOT NULL REFERENCES countries(id) ON DELETE CASCADE,
    PRIMARY KEY (graph_id, country_id)
);

CREATE INDEX IF NOT EXISTS subfamilies_family_idx ON subfamilies(family_id);
CREATE INDEX IF NOT EXISTS variables_subfamily_idx ON variables(subfamily_id);
CREATE INDEX IF NOT EXISTS maestros_country_idx    ON maestros(country_id);
CREATE INDEX IF NOT EXISTS observations_country_idx
    ON observations(country_id, variable_id, date);

PRAGMA user_version = 1;
";
