use std::fs;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use iod_core::{
    Catalog, CatalogError, InstallerStream, NotFoundError, PackageError, PackageMetadata,
    SigningKeyPair, create_container, load_catalog, write_container,
};
use iod_schema::{ContainerHeader, PACKAGE_EXTENSION};
use tempfile::TempDir;

fn test_key() -> SigningKeyPair {
    SigningKeyPair::from_seed([5u8; 32])
}

fn package(dir: &Path, name: &str, installer: Option<&[u8]>) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let dest = dir.join(format!("{name}.{PACKAGE_EXTENSION}"));
    let installer_path = installer.map(|contents| {
        let path = dir.join(format!("{name}.installer.tmp"));
        fs::write(&path, contents).unwrap();
        path
    });

    write_container(
        &PackageMetadata::with_name(name),
        installer_path.as_deref(),
        &test_key(),
        &dest,
    )
    .unwrap();

    if let Some(path) = installer_path {
        fs::remove_file(path).unwrap();
    }
    dest
}

async fn drain(mut stream: InstallerStream) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

/// Writes `good` valid packages spread over sub-directories plus one file of
/// each kind of damage, and returns the number of damaged files.
fn populate(root: &Path, good: usize) -> usize {
    for n in 0..good {
        let dir = match n % 3 {
            0 => root.to_path_buf(),
            1 => root.join("sub"),
            _ => root.join("sub").join("deeper"),
        };
        package(&dir, &format!("package{n}"), Some(format!("installer {n}").as_bytes()));
    }

    fs::create_dir_all(root.join("empty")).unwrap();
    fs::create_dir_all(root.join("sub")).unwrap();

    let valid = create_container(&PackageMetadata::with_name("broken"), None, &test_key()).unwrap();

    let mut tampered = valid.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;

    let nameless = {
        let json = br#"{"version":"1"}"#;
        let mut bytes = ContainerHeader::new(json.len() as u32, 0, 0).to_bytes().to_vec();
        bytes.extend_from_slice(json);
        bytes
    };

    let bad: Vec<(PathBuf, Vec<u8>)> = vec![
        (root.join("zero-length"), Vec::new()),
        (root.join("readme.txt"), b"not a package".to_vec()),
        (root.join("sub").join(format!("truncated.{PACKAGE_EXTENSION}")), valid[..valid.len() - 3].to_vec()),
        (root.join("sub").join(format!("tampered.{PACKAGE_EXTENSION}")), tampered),
        (root.join(format!("nameless.{PACKAGE_EXTENSION}")), nameless),
    ];
    for (path, bytes) in &bad {
        fs::write(path, bytes).unwrap();
    }
    bad.len()
}

#[test]
fn test_partial_failure_tolerance() {
    let dir = TempDir::new().unwrap();
    let bad = populate(dir.path(), 15);

    let load = load_catalog(dir.path()).unwrap();
    assert_eq!(load.store.len(), 15);
    assert_eq!(load.failures.len(), bad);

    for n in 0..15 {
        assert!(load.store.contains(&format!("package{n}")));
    }
    assert!(!load.store.contains("broken"));
}

#[test]
fn test_failures_are_categorized() {
    let dir = TempDir::new().unwrap();
    populate(dir.path(), 1);

    let load = load_catalog(dir.path()).unwrap();
    let category = |stem: &str| {
        load.failures
            .iter()
            .find(|f| f.path.file_stem().is_some_and(|n| n == stem))
            .map(|f| f.error.category())
    };

    assert_eq!(category("zero-length"), Some("structural"));
    assert_eq!(category("readme"), Some("structural"));
    assert_eq!(category("truncated"), Some("structural"));
    assert_eq!(category("tampered"), Some("verification"));
    assert_eq!(category("nameless"), Some("metadata"));
}

#[test]
fn test_load_is_reproducible() {
    let dir = TempDir::new().unwrap();
    populate(dir.path(), 6);

    let first = load_catalog(dir.path()).unwrap();
    let second = load_catalog(dir.path()).unwrap();

    assert_eq!(
        first.store.names().collect::<Vec<_>>(),
        second.store.names().collect::<Vec<_>>()
    );
    let paths = |load: &iod_core::CatalogLoad| {
        load.failures.iter().map(|f| f.path.clone()).collect::<Vec<_>>()
    };
    assert_eq!(paths(&first), paths(&second));
}

#[test]
fn test_names_are_sorted() {
    let dir = TempDir::new().unwrap();
    for name in ["zoom", "alpha", "mouse"] {
        package(dir.path(), name, None);
    }

    let load = load_catalog(dir.path()).unwrap();
    assert_eq!(load.store.names().collect::<Vec<_>>(), ["alpha", "mouse", "zoom"]);
    assert_eq!(load.store.entries().count(), 3);
}

#[test]
fn test_duplicate_name_last_file_wins() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a");
    let second = dir.path().join("b");
    package(&first, "dup", None);
    package(&second, "dup", Some(b"newer"));

    let load = load_catalog(dir.path()).unwrap();
    assert_eq!(load.store.len(), 1);
    assert!(load.failures.is_empty());

    let entry = load.store.get("dup").unwrap();
    assert!(entry.path.starts_with(&second));
    assert!(entry.has_installer());
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_is_scanned() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    let real = dir.path().join("real");
    fs::create_dir_all(&root).unwrap();
    package(&real, "linked", Some(b"payload"));
    std::os::unix::fs::symlink(&real, root.join("link")).unwrap();

    let load = load_catalog(&root).unwrap();
    assert!(load.failures.is_empty(), "{:?}", load.failures);
    assert_eq!(load.store.len(), 1);
    assert!(load.store.get("linked").unwrap().path.starts_with(root.join("link")));
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_is_a_failure_not_an_abort() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), "only", None);
    std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

    let load = load_catalog(dir.path()).unwrap();
    assert_eq!(load.store.len(), 1);
    assert_eq!(load.failures.len(), 1);
    assert!(load.failures[0].path.ends_with("loop"));
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    match load_catalog(&missing) {
        Err(CatalogError::Root { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected root error, got {other:?}"),
    }
}

#[test]
fn test_empty_root_loads_nothing() {
    let dir = TempDir::new().unwrap();
    let load = load_catalog(dir.path()).unwrap();
    assert!(load.store.is_empty());
    assert!(load.failures.is_empty());
}

#[test]
fn test_lookup_and_response() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), "with", Some(b"payload"));
    package(dir.path(), "without", None);

    let store = load_catalog(dir.path()).unwrap().store;
    assert!(store.get("missing").is_none());

    let with = store.response("with").unwrap();
    assert_eq!(with.installer.as_deref(), Some("/installer/with"));
    assert_eq!(with.package_data, store.get("with").unwrap().metadata_json);

    let without = store.response("without").unwrap();
    assert!(without.installer.is_none());

    assert!(matches!(
        store.response("missing"),
        Err(NotFoundError::Package(name)) if name == "missing"
    ));
}

#[tokio::test]
async fn test_stream_installer() {
    let dir = TempDir::new().unwrap();
    let payload: Vec<u8> = (0..=255u8).cycle().take(150_000).collect();
    package(dir.path(), "big", Some(&payload));
    package(dir.path(), "none", None);

    let store = load_catalog(dir.path()).unwrap().store;

    let stream = store.stream_installer("big").await.unwrap();
    assert_eq!(stream.len(), 150_000);
    assert_eq!(drain(stream).await.unwrap(), payload);

    assert!(matches!(
        store.stream_installer("none").await,
        Err(PackageError::NotFound(NotFoundError::NoInstaller(_)))
    ));
    assert!(matches!(
        store.stream_installer("missing").await,
        Err(PackageError::NotFound(NotFoundError::Package(_)))
    ));
}

#[tokio::test]
async fn test_concurrent_streams_share_nothing() {
    let dir = TempDir::new().unwrap();
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    package(dir.path(), "pkg", Some(&payload));

    let store = load_catalog(dir.path()).unwrap().store;
    let a = store.stream_installer("pkg").await.unwrap();
    let b = store.stream_installer("pkg").await.unwrap();

    let (a, b) = tokio::join!(drain(a), drain(b));
    assert_eq!(a.unwrap(), payload);
    assert_eq!(b.unwrap(), payload);
}

#[test]
fn test_reload_swaps_whole_store() {
    let dir = TempDir::new().unwrap();
    package(dir.path(), "first", None);

    let (catalog, failures) = Catalog::open(dir.path()).unwrap();
    assert!(failures.is_empty());
    assert_eq!(catalog.root(), dir.path());

    let before = catalog.snapshot();
    assert_eq!(before.len(), 1);

    package(dir.path(), "second", None);
    fs::write(dir.path().join("junk"), b"junk").unwrap();
    let failures = catalog.reload().unwrap();
    assert_eq!(failures.len(), 1);

    // Old snapshots are untouched; new ones see the rebuilt index.
    assert_eq!(before.len(), 1);
    let after = catalog.snapshot();
    assert_eq!(after.len(), 2);
    assert!(after.contains("second"));

    // Unchanged files give an identical index.
    catalog.reload().unwrap();
    assert_eq!(
        catalog.snapshot().names().collect::<Vec<_>>(),
        after.names().collect::<Vec<_>>()
    );
}

#[test]
fn test_reload_keeps_store_when_root_vanishes() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("packages");
    package(&root, "only", None);

    let (catalog, _) = Catalog::open(&root).unwrap();
    fs::remove_dir_all(&root).unwrap();

    assert!(catalog.reload().is_err());
    assert!(catalog.snapshot().contains("only"));
}
