//! Three-phase repair of a raw dataset.
//!
//! 1. **Correct**: rename known misspellings and title-case every entity name.
//! 2. **Repoint**: rewrite every foreign key that points at a duplicate or
//!    corrupt row to the surviving row.
//! 3. **Delete**: drop corrupt rows, then every duplicate except the lowest id
//!    per normalized name.
//!
//! All three run in one transaction together with a final integrity scan;
//! any error rolls the whole run back.

pub mod integrity;
pub mod rules;

pub use integrity::*;
pub use rules::*;

use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::normalize::{canonical_name, normalize_key};
use crate::schema::{DependencyResolver, EntityTable};
use crate::store::register_functions;
use crate::ui::{Phase, Ui};

/// One name changed in the correction phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rename {
    pub table: EntityTable,
    pub id: i64,
    pub from: String,
    pub to: String,
}

/// What a reconciliation run changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub renamed: Vec<Rename>,
    /// Rewritten references keyed by `table.column`
    pub repointed: BTreeMap<String, u64>,
    /// Pokemon whose second type collapsed into the first
    pub cleared_type2: u64,
    pub removed: BTreeMap<EntityTable, u64>,
    pub deduplicated: BTreeMap<EntityTable, u64>,
}

impl ReconcileReport {
    /// True when the run found nothing to change
    pub fn is_noop(&self) -> bool {
        self.renamed.is_empty()
            && self.repointed.values().all(|n| *n == 0)
            && self.cleared_type2 == 0
            && self.removed.values().all(|n| *n == 0)
            && self.deduplicated.values().all(|n| *n == 0)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} renamed, {} references repointed, {} corrupt rows removed, {} duplicates removed",
            self.renamed.len(),
            self.repointed.values().sum::<u64>() + self.cleared_type2,
            self.removed.values().sum::<u64>(),
            self.deduplicated.values().sum::<u64>(),
        )
    }
}

/// Reconcile the dataset behind `conn` in a single transaction.
///
/// Not safe to run concurrently with itself or with live traffic; callers
/// gate queries until this returns.
pub fn reconcile(
    conn: &mut Connection,
    rules: &ReconcileRules,
    ui: &mut impl Ui,
) -> Result<ReconcileReport> {
    rules.validate()?;
    register_functions(conn)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut report = ReconcileReport::default();

    ui.set_phase(Phase::Correcting);
    for table in EntityTable::ALL {
        let renamed = correct_names(&tx, table, rules)?;
        ui.tally(format!("{} renamed", table), renamed.len() as u64);
        report.renamed.extend(renamed);
    }

    ui.set_phase(Phase::Repointing);
    let resolver = DependencyResolver::new();
    for table in EntityTable::ALL {
        let remap = build_remap(&tx, &resolver, table, rules)?;
        for (column, changed) in repoint(&tx, &resolver, table, &remap)? {
            ui.tally(format!("{} repointed", column), changed);
            *report.repointed.entry(column).or_default() += changed;
        }
    }
    report.cleared_type2 = tx.execute(
        "UPDATE pokemon SET type2_id = NULL WHERE type2_id = type1_id",
        [],
    )? as u64;

    ui.set_phase(Phase::Deduplicating);
    for table in EntityTable::ALL {
        let removed = delete_removals(&tx, table, rules)?;
        let deduplicated = delete_duplicates(&tx, table)?;
        tracing::info!(%table, removed, deduplicated, "rows deleted");
        ui.tally(format!("{} deleted", table), removed + deduplicated);
        report.removed.insert(table, removed);
        report.deduplicated.insert(table, deduplicated);
    }

    ui.set_phase(Phase::Verifying);
    let integrity = verify_integrity(&tx)?;
    if !integrity.is_clean() {
        tracing::error!(
            problems = %integrity.summary(),
            "reconciliation left the dataset inconsistent, rolling back"
        );
        return Err(Error::Integrity(integrity.summary()));
    }

    tx.commit()?;
    tracing::info!("{}", report.summary());
    ui.set_phase(Phase::Complete);
    ui.log(report.summary());

    Ok(report)
}

/// Phase A for one table: apply the typo map, then title-case. Only rows
/// whose name actually changes are written.
fn correct_names(
    conn: &Connection,
    table: EntityTable,
    rules: &ReconcileRules,
) -> Result<Vec<Rename>> {
    let corrections = rules.correction_map(table);

    let rows: Vec<(i64, String)> = {
        let mut stmt = conn.prepare(&format!("SELECT id, name FROM {} ORDER BY id", table))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    let mut renamed = Vec::new();
    let mut update = conn.prepare(&format!("UPDATE {} SET name = ?1 WHERE id = ?2", table))?;

    for (id, name) in rows {
        let mut fixed = match corrections.get(&normalize_key(&name)) {
            Some(to) => to.to_string(),
            None => name.clone(),
        };
        if rules.standardize_case {
            fixed = canonical_name(&fixed);
        }

        if fixed != name {
            tracing::debug!(%table, id, from = %name, to = %fixed, "renaming");
            update.execute(params![fixed, id])?;
            renamed.push(Rename {
                table,
                id,
                from: name,
                to: fixed,
            });
        }
    }

    Ok(renamed)
}

/// Map every doomed id of `table` to the id that replaces it: duplicates to
/// the lowest surviving id of their name group, corrupt rows to their
/// replacement (itself resolved through the duplicate map).
fn build_remap(
    conn: &Connection,
    resolver: &DependencyResolver,
    table: EntityTable,
    rules: &ReconcileRules,
) -> Result<HashMap<i64, i64>> {
    let removed: HashSet<i64> = rules.removals_for(table).map(|r| r.id).collect();

    let mut remap = HashMap::new();
    let mut survivors: HashMap<String, i64> = HashMap::new();
    {
        let mut stmt =
            conn.prepare(&format!("SELECT id, norm_key(name) FROM {} ORDER BY id", table))?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, key) = row?;
            if removed.contains(&id) {
                continue;
            }
            match survivors.entry(key) {
                Entry::Occupied(keep) => {
                    remap.insert(id, *keep.get());
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }
    }
    let surviving: HashSet<i64> = survivors.values().copied().collect();

    for removal in rules.removals_for(table) {
        match removal.replacement {
            Some(replacement) => {
                let target = remap.get(&replacement).copied().unwrap_or(replacement);
                if !surviving.contains(&target) {
                    return Err(Error::Integrity(format!(
                        "{} row {} is replaced by {}, which does not exist",
                        table, removal.id, replacement
                    )));
                }
                remap.insert(removal.id, target);
            }
            None => {
                let refs = count_references(conn, resolver, table, removal.id)?;
                if refs > 0 {
                    return Err(Error::Integrity(format!(
                        "{} row {} is still referenced {} time(s) and has no replacement",
                        table, removal.id, refs
                    )));
                }
            }
        }
    }

    Ok(remap)
}

fn count_references(
    conn: &Connection,
    resolver: &DependencyResolver,
    table: EntityTable,
    id: i64,
) -> Result<i64> {
    let mut total = 0;
    for (child, fk) in resolver.referencing(table.table_name()) {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", child.name, fk.column);
        total += conn.query_row(&sql, [id], |row| row.get::<_, i64>(0))?;
    }
    Ok(total)
}

/// Phase B for one table: rewrite each referencing column through `remap`.
/// Returns changed-row counts keyed by `child.column`.
fn repoint(
    conn: &Connection,
    resolver: &DependencyResolver,
    table: EntityTable,
    remap: &HashMap<i64, i64>,
) -> Result<Vec<(String, u64)>> {
    let mut counts = Vec::new();

    for (child, fk) in resolver.referencing(table.table_name()) {
        let sql = format!("UPDATE {0} SET {1} = ?1 WHERE {1} = ?2", child.name, fk.column);
        let mut stmt = conn.prepare(&sql)?;

        let mut changed = 0u64;
        for (from, to) in remap {
            let n = stmt.execute(params![to, from])? as u64;
            if n > 0 {
                tracing::debug!(
                    table = child.name,
                    column = fk.column,
                    from,
                    to,
                    rows = n,
                    "repointed"
                );
            }
            changed += n;
        }
        counts.push((format!("{}.{}", child.name, fk.column), changed));
    }

    Ok(counts)
}

/// Phase C, corrupt rows. Their references were repointed in phase B.
fn delete_removals(conn: &Connection, table: EntityTable, rules: &ReconcileRules) -> Result<u64> {
    let mut stmt = conn.prepare(&format!("DELETE FROM {} WHERE id = ?1", table))?;
    let mut deleted = 0;
    for removal in rules.removals_for(table) {
        deleted += stmt.execute([removal.id])? as u64;
    }
    Ok(deleted)
}

/// Phase C, duplicates: rank rows by id within each normalized name and
/// keep rank 1.
fn delete_duplicates(conn: &Connection, table: EntityTable) -> Result<u64> {
    let sql = format!(
        "WITH ranked AS (
             SELECT id, ROW_NUMBER() OVER (PARTITION BY norm_key(name) ORDER BY id) AS rank
             FROM {0}
         )
         DELETE FROM {0} WHERE id IN (SELECT id FROM ranked WHERE rank > 1)",
        table
    );
    Ok(conn.execute(&sql, [])? as u64)
}
