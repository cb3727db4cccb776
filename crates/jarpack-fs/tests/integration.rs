use std::sync::Arc;

use jarpack_fs::{CleanupRegistry, FlushOnDrop, copy_into, same_file};
use tempfile::tempdir;

#[test]
fn test_relocated_copy_is_distinct_and_identical() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("target/app-1.0.jar");
    std::fs::create_dir_all(original.parent().unwrap()).unwrap();
    std::fs::write(&original, b"PK\x03\x04 contents").unwrap();

    let copy = copy_into(&original, dir.path().join("assembly-tmp")).unwrap();

    assert!(!same_file(&original, &copy));
    assert_eq!(copy.file_name(), original.file_name());
    assert_eq!(std::fs::read(&copy).unwrap(), std::fs::read(&original).unwrap());
}

#[test]
fn test_registry_outlives_scope_until_flush() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(CleanupRegistry::new());
    let guard = FlushOnDrop::new(Arc::clone(&registry));

    let scheduled: Vec<_> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("sanitized-{i}.jar"));
            std::fs::write(&path, b"jar").unwrap();
            registry.register(&path);
            path
        })
        .collect();

    assert!(scheduled.iter().all(|p| p.exists()));
    drop(guard);
    assert!(scheduled.iter().all(|p| !p.exists()));
}
