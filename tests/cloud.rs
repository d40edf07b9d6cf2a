// Object-store behaviour and URI resolution through a session.

use anyhow::Result;
use churnflow::io::cloud::*;
use churnflow::io::storage::{Location, open_input};
use churnflow::{SessionBuilder, StorageError};
use object_store::memory::InMemory;
use std::io::Read;
use std::sync::Arc;

#[test]
fn fake_store_put_get_list_delete() -> Result<()> {
    let store = FakeObjectIO::new();
    store.put_object("lake", "churn/b.csv", b"2")?;
    store.put_object("lake", "churn/a.csv", b"1")?;
    store.put_object("lake", "other/c.csv", b"3")?;

    assert_eq!(store.get_object("lake", "churn/a.csv")?, b"1");
    let listed: Vec<String> = store
        .list_objects("lake", Some("churn/"))?
        .into_iter()
        .map(|o| o.key)
        .collect();
    assert_eq!(listed, vec!["churn/a.csv", "churn/b.csv"]);

    store.delete_object("lake", "churn/a.csv")?;
    assert!(!store.object_exists("lake", "churn/a.csv")?);
    Ok(())
}

#[test]
fn missing_objects_report_not_found() {
    let store = FakeObjectIO::new();
    let err = store.get_object("nope", "key").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(store.put_object("", "key", b"x").is_err());
}

#[test]
fn object_store_backed_put_get_list_delete() -> Result<()> {
    let store = ObjectStoreIO::from_store("lake", Arc::new(InMemory::new()))?;
    store.put_object("lake", "churn/b.csv", b"22")?;
    store.put_object("lake", "churn/a.csv", b"1")?;
    store.put_object("lake", "churned/x.csv", b"3")?;
    store.put_object("lake", "other/c.csv", b"4")?;

    assert_eq!(store.get_object("lake", "churn/b.csv")?, b"22");
    let listed: Vec<(String, u64)> = store
        .list_objects("lake", Some("churn/"))?
        .into_iter()
        .map(|o| (o.key, o.size))
        .collect();
    assert_eq!(
        listed,
        vec![("churn/a.csv".to_string(), 1), ("churn/b.csv".to_string(), 2)]
    );
    assert_eq!(store.list_objects("lake", Some("churn"))?.len(), 3);
    assert_eq!(store.list_objects("lake", None)?.len(), 4);

    store.delete_object("lake", "churn/a.csv")?;
    assert!(!store.object_exists("lake", "churn/a.csv")?);
    assert!(store.object_exists("lake", "churn/b.csv")?);
    Ok(())
}

#[test]
fn object_store_backed_errors_carry_a_kind() -> Result<()> {
    let store = ObjectStoreIO::from_store("lake", Arc::new(InMemory::new()))?;
    let err = store.get_object("lake", "missing.csv").unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.detail.is_some());

    assert_eq!(store.delete_object("lake", "missing.csv").unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(store.get_object("elsewhere", "a.csv").unwrap_err().kind, ErrorKind::NotFound);
    assert_eq!(store.put_object("", "a.csv", b"x").unwrap_err().kind, ErrorKind::InvalidInput);
    assert_eq!(ObjectStoreIO::from_env("ftp").unwrap_err().kind, ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn session_resolves_registered_schemes() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let session = SessionBuilder::new()
        .master("local")
        .warehouse_dir(tmp.path().join("wh"))
        .build()?;
    let store = FakeObjectIO::new();
    store.put_object("bucket", "dir/file.csv", b"hello")?;
    session.register_object_store("GS", Arc::new(store));

    assert!(session.object_store("gs").is_some());
    let mut text = String::new();
    open_input(&session, "gs://bucket/dir/file.csv")?.read_to_string(&mut text)?;
    assert_eq!(text, "hello");

    assert!(open_input(&session, "gs://bucket/missing.csv").is_err());
    let err = open_input(&session, "s3a://bucket/dir/file.csv").err().unwrap();
    assert!(matches!(
        err.downcast_ref::<StorageError>(),
        Some(StorageError::NoObjectStore { .. })
    ));

    let local = tmp.path().join("local.txt");
    std::fs::write(&local, "on disk")?;
    let mut text = String::new();
    open_input(&session, &format!("file://{}", local.display()))?.read_to_string(&mut text)?;
    assert_eq!(text, "on disk");
    Ok(())
}

#[test]
fn location_parsing() {
    assert!(matches!(
        Location::parse("abfs://container/path/x.csv"),
        Ok(Location::Object { ref scheme, .. }) if scheme == "abfs"
    ));
    assert!(Location::parse("").is_err());
}
