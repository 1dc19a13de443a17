//! Molecule record store
//!
//! SQL primitives over a `StatementExecutor`. Each function issues exactly
//! the statements its name implies and nothing else; gateway errors are
//! returned untouched.
//!
//! Schema (consumed, not owned):
//!
//! ```text
//! molecule(id, name, formula, mass)
//! equivalent(id_mol_0, id_mol_1)      owner -> target
//! synonym(id_mol, name)
//! ```

use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use tracing::debug;

use crate::domain::{
    Associations, Molecule, MoleculeId, MoleculeSummary, Row, SqlValue, StatementExecutor,
};
use crate::error::{CatalogError, Result};

pub const INSERT_MOLECULE: &str =
    "INSERT INTO molecule (name, formula, mass) VALUES (?1, ?2, ?3) RETURNING id";

/// One row with the current associations as JSON arrays, or no row at all
/// when the molecule does not exist
pub const FETCH_ASSOCIATIONS: &str = "SELECT
    (SELECT json_group_array(e.id_mol_1) FROM equivalent e WHERE e.id_mol_0 = m.id) AS equivalent,
    (SELECT json_group_array(s.name) FROM synonym s WHERE s.id_mol = m.id) AS synonym
 FROM molecule m WHERE m.id = ?1";

pub const SEARCH_BY_NAME: &str =
    "SELECT id, name, formula, mass FROM molecule WHERE name = ?1 ORDER BY id";

pub const GET_MOLECULE: &str = "SELECT id, name, formula, mass FROM molecule WHERE id = ?1";

pub const EXISTS_ANY: &str = "SELECT 1 AS present FROM molecule LIMIT 1";

/// Association table layout: `(table, owner column, value column)`
#[derive(Debug, Clone, Copy)]
struct AssociationTable {
    table: &'static str,
    owner: &'static str,
    value: &'static str,
}

const EQUIVALENT: AssociationTable = AssociationTable {
    table: "equivalent",
    owner: "id_mol_0",
    value: "id_mol_1",
};

const SYNONYM: AssociationTable = AssociationTable {
    table: "synonym",
    owner: "id_mol",
    value: "name",
};

impl AssociationTable {
    /// `DELETE ... WHERE owner = ?1 AND value IN (?2, ..)`
    fn delete_statement(&self, count: usize) -> String {
        let list = (0..count)
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} IN ({})",
            self.table, self.owner, self.value, list
        )
    }

    /// `INSERT ... VALUES (?1, ?2), (?1, ?3), ..`
    fn insert_statement(&self, count: usize) -> String {
        let values = (0..count)
            .map(|i| format!("(?1, ?{})", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}, {}) VALUES {}",
            self.table, self.owner, self.value, values
        )
    }
}

/// Values bound per association statement. SQLite caps a statement at
/// 32766 parameters and the owner id takes one of them.
pub const MAX_VALUES_PER_STATEMENT: usize = 32_000;

fn owner_params<'v, T: 'v>(id: MoleculeId, values: impl IntoIterator<Item = &'v T>) -> Vec<SqlValue>
where
    for<'a> &'a T: Into<SqlValue>,
{
    std::iter::once(SqlValue::Integer(id))
        .chain(values.into_iter().map(Into::into))
        .collect()
}

/// One statement per batch of at most `MAX_VALUES_PER_STATEMENT` values
async fn execute_batched<E, T>(
    exec: &mut E,
    id: MoleculeId,
    values: &BTreeSet<T>,
    statement: impl Fn(usize) -> String,
) -> Result<()>
where
    E: StatementExecutor + ?Sized,
    for<'a> &'a T: Into<SqlValue>,
{
    let values: Vec<&T> = values.iter().collect();
    for batch in values.chunks(MAX_VALUES_PER_STATEMENT) {
        exec.execute(&statement(batch.len()), &owner_params(id, batch.iter().copied()))
            .await?;
    }
    Ok(())
}

async fn delete_values<E, T>(
    exec: &mut E,
    table: AssociationTable,
    id: MoleculeId,
    values: &BTreeSet<T>,
) -> Result<()>
where
    E: StatementExecutor + ?Sized,
    for<'a> &'a T: Into<SqlValue>,
{
    if values.is_empty() {
        return Ok(());
    }
    debug!(table = table.table, id, count = values.len(), "delete associations");
    execute_batched(exec, id, values, |n| table.delete_statement(n)).await
}

async fn insert_values<E, T>(
    exec: &mut E,
    table: AssociationTable,
    id: MoleculeId,
    values: &BTreeSet<T>,
) -> Result<()>
where
    E: StatementExecutor + ?Sized,
    for<'a> &'a T: Into<SqlValue>,
{
    if values.is_empty() {
        return Ok(());
    }
    debug!(table = table.table, id, count = values.len(), "insert associations");
    execute_batched(exec, id, values, |n| table.insert_statement(n)).await
}

// ═══════════════════════════════════════════════════════════════════════════
// Molecule rows
// ═══════════════════════════════════════════════════════════════════════════

/// Insert the base row; the store assigns the id
pub async fn insert_molecule<E>(exec: &mut E, name: &str, formula: &str, mass: f64) -> Result<MoleculeId>
where
    E: StatementExecutor + ?Sized,
{
    let rows = exec
        .execute(INSERT_MOLECULE, &[name.into(), formula.into(), mass.into()])
        .await?;
    let row = rows
        .first()
        .ok_or_else(|| CatalogError::database("molecule insert returned no id"))?;
    row.get_i64("id")
}

/// Scalar fields of one molecule, `NotFound` when absent
pub async fn get_summary<E>(exec: &mut E, id: MoleculeId) -> Result<MoleculeSummary>
where
    E: StatementExecutor + ?Sized,
{
    let rows = exec.execute(GET_MOLECULE, &[id.into()]).await?;
    rows.first()
        .map(summary_from_row)
        .unwrap_or_else(|| Err(CatalogError::molecule_not_found(id)))
}

/// Full molecule: scalar row plus both association sets
pub async fn get_molecule<E>(exec: &mut E, id: MoleculeId) -> Result<Molecule>
where
    E: StatementExecutor + ?Sized,
{
    let summary = get_summary(exec, id).await?;
    let associations = fetch_associations(exec, id).await?;
    Ok(Molecule {
        id: Some(summary.id),
        name: summary.name,
        formula: summary.formula,
        mass: summary.mass,
        equivalents: associations.equivalents,
        synonyms: associations.synonyms,
    })
}

/// Exact-match lookup on the name; no match is an empty vec
pub async fn search_by_name<E>(exec: &mut E, term: &str) -> Result<Vec<MoleculeSummary>>
where
    E: StatementExecutor + ?Sized,
{
    let rows = exec.execute(SEARCH_BY_NAME, &[term.into()]).await?;
    rows.iter().map(summary_from_row).collect()
}

/// Whether the molecule table holds at least one row (row content ignored)
pub async fn exists_any<E>(exec: &mut E) -> Result<bool>
where
    E: StatementExecutor + ?Sized,
{
    let rows = exec.execute(EXISTS_ANY, &[]).await?;
    Ok(!rows.is_empty())
}

fn summary_from_row(row: &Row) -> Result<MoleculeSummary> {
    Ok(MoleculeSummary {
        id: row.get_i64("id")?,
        name: row.get_str("name")?.to_string(),
        formula: row.get_str("formula")?.to_string(),
        mass: row.get_f64("mass")?,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Associations
// ═══════════════════════════════════════════════════════════════════════════

/// Currently persisted equivalents and synonyms
///
/// # Errors
///
/// - `NotFound` if the lookup yields zero rows
/// - `Database` if the gateway raises
pub async fn fetch_associations<E>(exec: &mut E, id: MoleculeId) -> Result<Associations>
where
    E: StatementExecutor + ?Sized,
{
    let rows = exec.execute(FETCH_ASSOCIATIONS, &[id.into()]).await?;
    let row = rows
        .first()
        .ok_or_else(|| CatalogError::molecule_not_found(id))?;
    Ok(Associations {
        equivalents: decode_set(row, "equivalent")?,
        synonyms: decode_set(row, "synonym")?,
    })
}

/// Aggregated columns arrive as JSON array text; NULL means no rows
fn decode_set<T: Ord + DeserializeOwned>(row: &Row, column: &str) -> Result<BTreeSet<T>> {
    match row.get(column) {
        None | Some(SqlValue::Null) => Ok(BTreeSet::new()),
        Some(SqlValue::Text(json)) => Ok(serde_json::from_str(json)?),
        Some(other) => Err(CatalogError::serialization(format!(
            "column '{}': expected JSON array, found {:?}",
            column, other
        ))),
    }
}

/// Bulk-insert `(id, e)` for each equivalent; no statement when empty
pub async fn insert_equivalents<E>(exec: &mut E, id: MoleculeId, equivalents: &BTreeSet<MoleculeId>) -> Result<()>
where
    E: StatementExecutor + ?Sized,
{
    insert_values(exec, EQUIVALENT, id, equivalents).await
}

/// Bulk-insert `(id, s)` for each synonym; no statement when empty
pub async fn insert_synonyms<E>(exec: &mut E, id: MoleculeId, synonyms: &BTreeSet<String>) -> Result<()>
where
    E: StatementExecutor + ?Sized,
{
    insert_values(exec, SYNONYM, id, synonyms).await
}

/// Delete the listed equivalent links of `id`, then insert the new ones.
/// Each step is skipped when its set is empty.
pub async fn replace_equivalents<E>(
    exec: &mut E,
    id: MoleculeId,
    to_delete: &BTreeSet<MoleculeId>,
    to_insert: &BTreeSet<MoleculeId>,
) -> Result<()>
where
    E: StatementExecutor + ?Sized,
{
    delete_values(exec, EQUIVALENT, id, to_delete).await?;
    insert_values(exec, EQUIVALENT, id, to_insert).await
}

/// Same as `replace_equivalents` for synonym rows
pub async fn replace_synonyms<E>(
    exec: &mut E,
    id: MoleculeId,
    to_delete: &BTreeSet<String>,
    to_insert: &BTreeSet<String>,
) -> Result<()>
where
    E: StatementExecutor + ?Sized,
{
    delete_values(exec, SYNONYM, id, to_delete).await?;
    insert_values(exec, SYNONYM, id, to_insert).await
}
