//! Fetcher tests: file layout, ordering and progress reporting.

mod common;

use std::{cell::RefCell, fs, rc::Rc};

use ha_ingest::fetch::{fetch_snapshot, RemoteSnapshot};
use ha_ingest::remote::TransferObserver;

use common::{LocalSession, Recorder};

type Log = Rc<RefCell<Vec<(String, u64, u64)>>>;

/// Records every update under the label of the file being copied.
struct Labelled {
    label: String,
    log: Log,
}

impl TransferObserver for Labelled {
    fn update(&mut self, transferred: u64, total: u64) {
        self.log.borrow_mut().push((self.label.clone(), transferred, total));
    }
}

fn updates_for(log: &Log, label: &str) -> Vec<(u64, u64)> {
    log.borrow()
        .iter()
        .filter(|(l, ..)| l == label)
        .map(|&(_, done, total)| (done, total))
        .collect()
}

#[test]
fn copies_main_then_wal_with_progress() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = Recorder::create(&dir.path().join("home-assistant_v2.db"));
    recorder.add_days(1..=3, 50);

    let snapshot = RemoteSnapshot::new(recorder.path.display().to_string());
    let staging = dir.path().join("does").join("not").join("exist");
    let mut session = LocalSession::default();
    let log = Log::default();

    let staged = fetch_snapshot(&mut session, &snapshot, &staging, |label| Labelled {
        label: label.to_string(),
        log: Rc::clone(&log),
    })
    .unwrap();

    assert_eq!(session.downloads, vec![snapshot.main_path().to_string(), snapshot.wal_path()]);
    assert_eq!(staged.main, staging.join("home-assistant_v2.db"));
    assert_eq!(fs::read(&staged.main).unwrap(), fs::read(&recorder.path).unwrap());
    assert_eq!(fs::read(&staged.wal).unwrap(), fs::read(recorder.wal()).unwrap());

    // main db is reported completely before the WAL starts
    let labels: Vec<String> = log.borrow().iter().map(|(l, ..)| l.clone()).collect();
    let first_wal = labels.iter().position(|l| l == "write-ahead log").unwrap();
    assert!(labels[..first_wal].iter().all(|l| l == "main db"));
    assert!(labels[first_wal..].iter().all(|l| l == "write-ahead log"));

    for (label, path) in [("main db", &staged.main), ("write-ahead log", &staged.wal)] {
        let size = fs::metadata(path).unwrap().len();
        let updates = updates_for(&log, label);
        assert_eq!(updates.first(), Some(&(0, size)), "{label}");
        assert_eq!(updates.last(), Some(&(size, size)), "{label}");
    }
}

#[test]
fn missing_remote_wal_fetches_main_only() {
    let dir = tempfile::tempdir().unwrap();
    let remote = dir.path().join("blob.db");
    fs::write(&remote, vec![3u8; 200_000]).unwrap();
    let snapshot = RemoteSnapshot::new(remote.display().to_string());
    let staging = dir.path().join("staging");
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("blob.db-wal"), b"stale").unwrap();
    fs::write(staging.join("blob.db-shm"), b"stale").unwrap();

    let mut session = LocalSession::default();
    let log = Log::default();
    let staged = fetch_snapshot(&mut session, &snapshot, &staging, |label| Labelled {
        label: label.to_string(),
        log: Rc::clone(&log),
    })
    .unwrap();

    assert_eq!(session.downloads, vec![snapshot.main_path().to_string()]);
    assert!(!staged.has_wal());
    assert!(!staged.shm().exists());
    assert!(updates_for(&log, "write-ahead log").is_empty());
    assert_eq!(updates_for(&log, "main db").last(), Some(&(200_000, 200_000)));
}
