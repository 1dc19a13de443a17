//! Integer result-code contract
//!
//! For callers that only check success/failure: `0` is success, any
//! failure is non-zero, and search answers either the list of matches or
//! the sentinel `1`. The specific failure kind is logged, not returned.

use serde::Serialize;
use tracing::warn;

use crate::domain::{Molecule, MoleculeSummary, QueryGateway};
use crate::error::Result;
use crate::service::MoleculeService;

pub const SUCCESS: i32 = 0;
pub const SEARCH_FAILED: i32 = 1;

/// `0` on success, the error's status code otherwise
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(err) => err.status_code(),
    }
}

/// Serializes as the bare list of matches, or as the integer sentinel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchReply {
    Matches(Vec<MoleculeSummary>),
    Failed(i32),
}

pub async fn add_molecule<G: QueryGateway>(service: &MoleculeService<G>, molecule: &Molecule) -> i32 {
    let result = service.add_molecule(molecule).await;
    if let Err(err) = &result {
        warn!(error = %err, "add_molecule failed");
    }
    status_code(&result)
}

pub async fn update_molecule<G: QueryGateway>(service: &MoleculeService<G>, molecule: &Molecule) -> i32 {
    let result = service.update_molecule(molecule).await;
    if let Err(err) = &result {
        warn!(error = %err, "update_molecule failed");
    }
    status_code(&result)
}

pub async fn search<G: QueryGateway>(service: &MoleculeService<G>, term: &str) -> SearchReply {
    match service.search(term).await {
        Ok(matches) => SearchReply::Matches(matches),
        Err(err) => {
            warn!(error = %err, term, "search failed");
            SearchReply::Failed(SEARCH_FAILED)
        }
    }
}

/// A failed check reads as "empty"
pub async fn exists_any<G: QueryGateway>(service: &MoleculeService<G>) -> bool {
    match service.exists_any().await {
        Ok(present) => present,
        Err(err) => {
            warn!(error = %err, "exists_any failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(&Ok::<_, CatalogError>(7)), 0);
        assert_eq!(status_code::<()>(&Err(CatalogError::database("down"))), 1);
        assert_eq!(status_code::<()>(&Err(CatalogError::validation("no id"))), 1);
    }

    #[test]
    fn test_search_reply_serialization() {
        let failed = serde_json::to_string(&SearchReply::Failed(SEARCH_FAILED)).unwrap();
        assert_eq!(failed, "1");

        let empty = serde_json::to_string(&SearchReply::Matches(vec![])).unwrap();
        assert_eq!(empty, "[]");

        let hit = SearchReply::Matches(vec![MoleculeSummary {
            id: 1,
            name: "voglibose".into(),
            formula: "C10H21NO7".into(),
            mass: 267.277,
        }]);
        assert_eq!(
            serde_json::to_value(&hit).unwrap(),
            serde_json::json!([{
                "id": 1,
                "name": "voglibose",
                "formula": "C10H21NO7",
                "mass": 267.277
            }])
        );
    }
}
