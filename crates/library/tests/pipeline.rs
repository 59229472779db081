use sheaf_library::error::ErrorKind;
use sheaf_library::{
    CacheStore, Delta, FetchOptions, Field, FileEntry, FileList, ProbeHandle, RemoteFile, Status, Values, date_seq,
};
use sheaf_storage::MockProbe;
use std::sync::Arc;

const BASE: &str = "https://data.example.org/wv/";

fn generated() -> FileList {
    FileList::from_template("wv_{variable}_{date}.tif")
        .unwrap()
        .expand([("variable", "ndvi")])
        .unwrap()
        .expand([("date", date_seq("20000101", "20000501", Delta::months(1)).unwrap())])
        .unwrap()
        .set_dir(BASE)
}

fn files(list: &FileList) -> Vec<(String, Vec<u8>)> {
    list.iter().enumerate().map(|(i, entry)| (entry.url().unwrap().to_string(), vec![b'x'; 10 * (i + 1)])).collect()
}

#[tokio::test]
async fn test_generate_cache_reload_and_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path().join("wv.json"));
    let list = generated();
    assert_eq!(list.len(), 5);

    let failing = list[2].url().unwrap().to_string();
    let mock = Arc::new(MockProbe::with_files(files(&list)).failing(&failing, "HTTP 503"));
    let probe: ProbeHandle = mock.clone();
    let options = FetchOptions::default().with_concurrency(2);

    let cached = list.cache(&store, &probe, options, |_| {}).await.unwrap();
    let statuses: Vec<&str> = cached.iter().map(|e| e.status().label()).collect();
    assert_eq!(statuses, ["ok", "ok", "error", "ok", "ok"]);
    assert!(matches!(cached[2].status(), Status::Error(reason) if reason.contains("HTTP 503")));

    // Totals need every entry resolved.
    let err = cached.data_size().unwrap_err();
    assert!(matches!(&*err, ErrorKind::UnresolvedMetadata { .. }));
    assert_eq!(cached.filter(FileEntry::is_ok).data_size().unwrap(), 10 + 20 + 40 + 50);

    let reloaded = FileList::from_cache(store.path()).unwrap();
    assert_eq!(reloaded.entries(), cached.entries());
    assert_eq!(reloaded.path_list().unwrap(), cached.path_list().unwrap());
    assert_eq!(reloaded.path_list().unwrap()[4], "https://data.example.org/wv/wv_ndvi_20000501.tif");

    // A re-run only probes the entry that failed.
    let rerun = list.cache(&store, &probe, options, |_| {}).await.unwrap();
    assert_eq!(mock.total_probes().await, 6);
    assert_eq!(mock.probes(&failing).await, 2);
    assert_eq!(rerun.entries(), cached.entries());

    // Two files are already deposited; one of them under a different name.
    let deposited = [&cached[0], &cached[3]].map(|entry| RemoteFile {
        id: entry.filename().unwrap().to_string(),
        filename: entry.filename().unwrap().to_string(),
        checksum: entry.checksum().unwrap().to_string(),
        size: entry.size().unwrap(),
    });
    let deposited = [RemoteFile { filename: "renamed.tif".to_string(), ..deposited[1].clone() }, deposited[0].clone()];

    let (present, missing) = reloaded.partition(&deposited, Field::Checksum);
    assert_eq!(present.len() + missing.len(), reloaded.len());
    let paths = reloaded.path_list().unwrap();
    assert_eq!(present.path_list().unwrap(), [paths[0].clone(), paths[3].clone()]);
    assert_eq!(reloaded.filter_matched(&deposited, Field::Filename).len(), 1);

    let upload = missing.filter(FileEntry::is_ok);
    assert_eq!(upload.len(), 2);
    assert_eq!(upload.data_size().unwrap(), 20 + 50);
}

#[tokio::test]
async fn test_merged_lists_share_one_cache() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path().join("merged.json"));
    let ndvi = generated();
    let evi = FileList::from_template("wv_{variable}_{date}.tif")
        .unwrap()
        .expand([("variable", Values::from("evi")), ("date", Values::from(["20000101"]))])
        .unwrap();
    let merged = ndvi.merge(&evi).unwrap();
    assert_eq!(merged.len(), 6);
    assert_eq!(merged[5].url(), Some("https://data.example.org/wv/wv_evi_20000101.tif"));
    merged.ensure_unique().unwrap();

    let probe: ProbeHandle = Arc::new(MockProbe::with_files(files(&merged)));
    let cached = merged.cache(&store, &probe, FetchOptions::default(), |_| {}).await.unwrap();
    assert!(cached.iter().all(FileEntry::is_ok));

    let summary = cached.summary(None);
    assert_eq!(summary.get("date_min"), Some("20000101"));
    assert_eq!(summary.get("date_max"), Some("20000501"));
    assert_eq!(summary.get("variable_min"), Some("evi"));
}
