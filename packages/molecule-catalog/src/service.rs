//! Molecule service
//!
//! Orchestrates the record store and the reconciliation engine. Every
//! multi-statement write runs inside one gateway transaction: a failure
//! at any step rolls back everything issued before it, so an add can
//! never leave a molecule row without its associations.
//!
//! # Update semantics
//!
//! `update_molecule` reconciles associations only. `name`, `formula` and
//! `mass` are left as stored. Equivalents and synonyms are diffed
//! independently; an unchanged set issues no statement at all.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, NotFoundPolicy};
use crate::domain::{
    Associations, AutoCommit, GatewayTransaction, Molecule, MoleculeId, MoleculeSummary,
    QueryGateway,
};
use crate::error::{CatalogError, Result};
use crate::reconcile::{reconcile, ReconciliationPlan};
use crate::store;

/// What an update changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub id: MoleculeId,
    pub equivalents: ReconciliationPlan<MoleculeId>,
    pub synonyms: ReconciliationPlan<String>,
    /// The molecule had no stored row and was reconciled against empty sets
    pub fail_open: bool,
}

impl UpdateReport {
    pub fn changed(&self) -> bool {
        !(self.equivalents.is_noop() && self.synonyms.is_noop())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "count")]
pub enum SeedOutcome {
    /// Table was empty; this many molecules were added
    Seeded(usize),
    /// Table already held molecules; nothing written
    Skipped,
}

pub struct MoleculeService<G> {
    gateway: G,
    not_found_policy: NotFoundPolicy,
}

impl<G: QueryGateway> MoleculeService<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            not_found_policy: NotFoundPolicy::default(),
        }
    }

    pub fn from_config(gateway: G, config: &CatalogConfig) -> Self {
        Self::new(gateway).with_not_found_policy(config.not_found_policy)
    }

    pub fn with_not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found_policy = policy;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a molecule and its associations, returning the assigned id
    ///
    /// A caller-supplied `id` is ignored (logged); the store assigns ids.
    pub async fn add_molecule(&self, molecule: &Molecule) -> Result<MoleculeId> {
        let mut tx = self.gateway.begin().await?;
        let result = add_in(tx.as_mut(), molecule).await;
        let id = finish(tx, result).await?;
        info!(id, name = %molecule.name, "molecule added");
        Ok(id)
    }

    /// Reconcile the stored associations of `molecule.id` to the given sets
    ///
    /// # Errors
    ///
    /// - `Validation` if `id` is absent or the molecule lists itself as equivalent
    /// - `NotFound` if the molecule has no row and the policy is `Reject`
    /// - `Database` if any statement fails (everything is rolled back)
    pub async fn update_molecule(&self, molecule: &Molecule) -> Result<UpdateReport> {
        let id = molecule
            .id
            .ok_or_else(|| CatalogError::validation("update requires a molecule id"))?;
        if molecule.is_self_equivalent() {
            return Err(CatalogError::validation(format!(
                "molecule {} cannot be equivalent to itself",
                id
            )));
        }

        let mut tx = self.gateway.begin().await?;
        let result = self.update_in(tx.as_mut(), id, molecule).await;
        let report = finish(tx, result).await?;

        if report.changed() {
            info!(
                id,
                equivalents = %report.equivalents.summary(),
                synonyms = %report.synonyms.summary(),
                "molecule associations updated"
            );
        } else {
            debug!(id, "molecule associations already up to date");
        }
        Ok(report)
    }

    async fn update_in(
        &self,
        tx: &mut dyn GatewayTransaction,
        id: MoleculeId,
        molecule: &Molecule,
    ) -> Result<UpdateReport> {
        let (current, fail_open) = match store::fetch_associations(tx, id).await {
            Ok(current) => (current, false),
            Err(err) if err.is_not_found() => match self.not_found_policy {
                NotFoundPolicy::FailOpen => {
                    warn!(id, "no stored row for molecule, reconciling against empty associations");
                    (Associations::default(), true)
                }
                NotFoundPolicy::Reject => return Err(err),
            },
            Err(err) => return Err(err),
        };

        let equivalents = reconcile(&current.equivalents, &molecule.equivalents);
        if !equivalents.is_noop() {
            debug!(id, plan = %equivalents.summary(), "reconciling equivalents");
            store::replace_equivalents(tx, id, &equivalents.to_delete, &equivalents.to_insert)
                .await?;
        }

        let synonyms = reconcile(&current.synonyms, &molecule.synonyms);
        if !synonyms.is_noop() {
            debug!(id, plan = %synonyms.summary(), "reconciling synonyms");
            store::replace_synonyms(tx, id, &synonyms.to_delete, &synonyms.to_insert).await?;
        }

        Ok(UpdateReport {
            id,
            equivalents,
            synonyms,
            fail_open,
        })
    }

    /// Add every molecule when the catalog is empty, in one transaction
    pub async fn seed(&self, molecules: &[Molecule]) -> Result<SeedOutcome> {
        if self.exists_any().await? {
            info!("catalog already populated, seed skipped");
            return Ok(SeedOutcome::Skipped);
        }

        let mut tx = self.gateway.begin().await?;
        let result = async {
            for molecule in molecules {
                add_in(tx.as_mut(), molecule).await?;
            }
            Ok::<_, CatalogError>(molecules.len())
        }
        .await;
        let count = finish(tx, result).await?;
        info!(count, "catalog seeded");
        Ok(SeedOutcome::Seeded(count))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    /// Exact-match lookup by name
    ///
    /// An empty vec means no match; a database fault is an error, never an
    /// empty vec.
    pub async fn search(&self, term: &str) -> Result<Vec<MoleculeSummary>> {
        store::search_by_name(&mut AutoCommit(&self.gateway), term).await
    }

    /// Whether at least one molecule exists (seed check)
    pub async fn exists_any(&self) -> Result<bool> {
        store::exists_any(&mut AutoCommit(&self.gateway)).await
    }

    /// Full molecule with both association sets
    pub async fn get_molecule(&self, id: MoleculeId) -> Result<Molecule> {
        store::get_molecule(&mut AutoCommit(&self.gateway), id).await
    }
}

async fn add_in(tx: &mut dyn GatewayTransaction, molecule: &Molecule) -> Result<MoleculeId> {
    if let Some(supplied) = molecule.id {
        warn!(supplied, "ignoring caller-supplied id on add");
    }

    let id = store::insert_molecule(tx, &molecule.name, &molecule.formula, molecule.mass).await?;
    store::insert_equivalents(tx, id, &molecule.equivalents).await?;
    store::insert_synonyms(tx, id, &molecule.synonyms).await?;
    Ok(id)
}

/// Commit on success, roll back on failure; the original error wins
async fn finish<T>(mut tx: Box<dyn GatewayTransaction + '_>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Row;
    use crate::error::ErrorKind;
    use crate::infrastructure::recording::{RecordingGateway, BEGIN, COMMIT, ROLLBACK};

    fn voglibose() -> Molecule {
        Molecule::new("voglibose", "C10H21NO7", 267.277)
    }

    #[tokio::test]
    async fn test_add_ignores_supplied_id() {
        let gateway = RecordingGateway::new();
        gateway.push_rows(vec![Row::new().with("id", 5i64)]);
        let service = MoleculeService::new(gateway.clone());

        let id = service.add_molecule(&voglibose().with_id(99)).await.unwrap();

        assert_eq!(id, 5);
        let stmts = gateway.statements();
        assert_eq!(stmts.len(), 1);
        assert!(!stmts[0].params.contains(&99i64.into()));
    }

    #[tokio::test]
    async fn test_add_rolls_back_when_insert_returns_nothing() {
        let gateway = RecordingGateway::new();
        let service = MoleculeService::new(gateway.clone());

        let err = service.add_molecule(&voglibose()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Database);
        let markers: Vec<String> = gateway
            .log()
            .into_iter()
            .filter(|s| s.is_marker())
            .map(|s| s.statement)
            .collect();
        assert_eq!(markers, vec![BEGIN, ROLLBACK]);
    }

    #[tokio::test]
    async fn test_update_without_id_issues_nothing() {
        let gateway = RecordingGateway::new();
        let service = MoleculeService::new(gateway.clone());

        let err = service.update_molecule(&voglibose()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(gateway.log().is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_self_equivalence() {
        let gateway = RecordingGateway::new();
        let service = MoleculeService::new(gateway.clone());

        let err = service
            .update_molecule(&voglibose().with_id(1).with_equivalents([1]))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(gateway.log().is_empty());
    }

    #[tokio::test]
    async fn test_update_noop_commits_without_writes() {
        let gateway = RecordingGateway::new();
        gateway.push_rows(vec![Row::new()
            .with("equivalent", "[0]")
            .with("synonym", r#"["vague"]"#)]);
        let service = MoleculeService::new(gateway.clone());

        let report = service
            .update_molecule(&voglibose().with_id(1).with_equivalents([0]).with_synonyms(["vague"]))
            .await
            .unwrap();

        assert!(!report.changed());
        let log: Vec<String> = gateway.log().into_iter().map(|s| s.statement).collect();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], BEGIN);
        assert_eq!(log[1], store::FETCH_ASSOCIATIONS);
        assert_eq!(log[2], COMMIT);
    }

    #[tokio::test]
    async fn test_seed_skipped_when_populated() {
        let gateway = RecordingGateway::new();
        gateway.push_rows(vec![Row::new().with("present", 1i64)]);
        let service = MoleculeService::new(gateway.clone());

        let outcome = service.seed(&[voglibose()]).await.unwrap();

        assert_eq!(outcome, SeedOutcome::Skipped);
        assert_eq!(gateway.log().len(), 1);
    }

    #[test]
    fn test_seed_outcome_serializes_tagged() {
        let json = serde_json::to_string(&SeedOutcome::Seeded(3)).unwrap();
        assert_eq!(json, r#"{"outcome":"seeded","count":3}"#);
    }
}
