//! Queued work across shutdown and restart, against an on-disk database.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use common::{contract_text, MockGenerator};
use contractlens::config::Config;
use contractlens::db::contract_repo::{self, NewContract};
use contractlens::db::{project_repo, Database};
use contractlens::storage::{DocumentStore, LocalStore};
use contractlens::{ContractService, ProcessingStatus};

fn start(dir: &Path, generator: MockGenerator) -> ContractService {
    let config = Config {
        worker_count: 1,
        ..Config::default()
    };
    ContractService::new(
        &config,
        Database::open(&dir.join("contractlens.db")).unwrap(),
        Arc::new(LocalStore::new(dir.join("uploads"))),
        Arc::new(generator),
    )
    .unwrap()
}

fn status_on_disk(dir: &Path, contract_id: i64) -> ProcessingStatus {
    let db = Database::open(&dir.join("contractlens.db")).unwrap();
    contract_repo::find_by_id(&db, contract_id)
        .unwrap()
        .unwrap()
        .processing_status
}

#[test]
fn shutdown_finishes_queued_contracts() {
    let temp_dir = TempDir::new().unwrap();
    let (generator, gate) = MockGenerator::valid().gated();
    let service = start(temp_dir.path(), generator);
    let project = service.create_project("Depot", None, None).unwrap();

    let text = contract_text(1000);
    let first = service.upload(project.id, "a.txt", text.as_bytes()).unwrap();
    let second = service.upload(project.id, "b.txt", text.as_bytes()).unwrap();

    // The single worker holds the first contract; the second is still queued.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = service.get_contract(first.id).unwrap().processing_status;
        if status == ProcessingStatus::Processing {
            break;
        }
        assert!(Instant::now() < deadline, "first contract never started");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(
        service.get_contract(second.id).unwrap().processing_status,
        ProcessingStatus::Pending
    );

    drop(gate);
    service.shutdown();

    assert_eq!(status_on_disk(temp_dir.path(), first.id), ProcessingStatus::Completed);
    assert_eq!(status_on_disk(temp_dir.path(), second.id), ProcessingStatus::Completed);
}

#[test]
fn pending_contract_from_earlier_process_runs_on_start() {
    let temp_dir = TempDir::new().unwrap();
    let contract_id = {
        let db = Database::open(&temp_dir.path().join("contractlens.db")).unwrap();
        let store = LocalStore::new(temp_dir.path().join("uploads"));
        let project = project_repo::insert(&db, "Depot", None, None).unwrap();
        let location = store
            .store(project.id, "lease.txt", contract_text(1000).as_bytes())
            .unwrap();
        contract_repo::insert(
            &db,
            &NewContract {
                project_id: project.id,
                file_name: "lease.txt",
                file_location: &location,
                file_size: Some(1000),
            },
        )
        .unwrap()
    };

    let service = start(temp_dir.path(), MockGenerator::valid());
    let result = service.recv_result().unwrap();
    assert_eq!(result.contract_id, contract_id);
    assert!(result.is_success(), "{:?}", result.error);
    service.shutdown();

    assert_eq!(status_on_disk(temp_dir.path(), contract_id), ProcessingStatus::Completed);
}
