//! # Check-Snapshot Subcommand
//!
//! Decodes every document of the collections the back-office reads and
//! reports the ones that do not fit their record type. Listing and the
//! dashboard skip such documents silently; export refuses to run.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use savania_core::{admin, contact, reservation, security};
use savania_core::{AdminAccount, Contact, Reservation, SecurityLogEntry};
use savania_store::{Document, DocumentStore, Query, StoreError};
use serde::de::DeserializeOwned;

use crate::{load_snapshot, runtime, EXIT_FINDINGS};

/// Arguments for the `savania check-snapshot` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// JSON store snapshot.
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,
}

/// Per-collection result.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub collection: &'static str,
    pub checked: usize,
    /// `(document id, decode error)`.
    pub failures: Vec<(String, String)>,
}

fn check_documents<T: DeserializeOwned>(
    collection: &'static str,
    documents: &[Document],
) -> CollectionReport {
    let failures = documents
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(_) => None,
            Err(StoreError::Decode { id, source, .. }) => Some((id, source.to_string())),
            Err(other) => Some((doc.id.clone(), other.to_string())),
        })
        .collect();
    CollectionReport {
        collection,
        checked: documents.len(),
        failures,
    }
}

/// Check every known collection in `store`.
pub async fn check_store(store: &dyn DocumentStore) -> Result<Vec<CollectionReport>, StoreError> {
    let fetch = |c: &'static str| async move { store.query(&Query::collection(c)).await };
    Ok(vec![
        check_documents::<Contact>(contact::COLLECTION, &fetch(contact::COLLECTION).await?),
        check_documents::<Reservation>(
            reservation::COLLECTION,
            &fetch(reservation::COLLECTION).await?,
        ),
        check_documents::<AdminAccount>(admin::COLLECTION, &fetch(admin::COLLECTION).await?),
        check_documents::<SecurityLogEntry>(
            security::COLLECTION,
            &fetch(security::COLLECTION).await?,
        ),
    ])
}

/// Execute the check-snapshot subcommand. Exit 2 when any document fails.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let store = load_snapshot(&args.snapshot)?;
    let reports = runtime()?.block_on(check_store(&store))?;

    let mut failed = 0;
    for report in &reports {
        println!(
            "{:<16} {} checked, {} invalid",
            report.collection,
            report.checked,
            report.failures.len()
        );
        for (id, error) in &report.failures {
            println!("  {id}: {error}");
        }
        failed += report.failures.len();
    }
    Ok(if failed == 0 { 0 } else { EXIT_FINDINGS })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn snapshot(body: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn reports_documents_that_do_not_decode() {
        let file = snapshot(serde_json::json!({
            "contacts": {
                "good": {
                    "nom": "Afi",
                    "email": "afi@example.tg",
                    "service": "piscine",
                    "sujet": "Réservation",
                    "message": "Samedi ?",
                    "date_soumission": "2026-03-05T10:00:00Z",
                    "statut": "nouveau"
                },
                "bad": {"nom": "Kofi", "statut": "archive"}
            },
            "admins": {
                "u1": {"email": "admin@savania.tg", "role": "superadmin", "active": true}
            }
        }));
        let store = load_snapshot(file.path()).unwrap();
        let reports = runtime().unwrap().block_on(check_store(&store)).unwrap();

        let contacts = &reports[0];
        assert_eq!(contacts.checked, 2);
        assert_eq!(contacts.failures.len(), 1);
        assert_eq!(contacts.failures[0].0, "bad");
        assert!(reports[2].failures.is_empty());

        assert_eq!(
            run_check(&CheckArgs {
                snapshot: file.path().to_path_buf()
            })
            .unwrap(),
            EXIT_FINDINGS
        );
    }

    #[test]
    fn empty_snapshot_is_clean() {
        let file = snapshot(serde_json::json!({}));
        assert_eq!(
            run_check(&CheckArgs {
                snapshot: file.path().to_path_buf()
            })
            .unwrap(),
            0
        );
    }
}
