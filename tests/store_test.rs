use ma_video_cache::config::DEFAULT_ATTACHMENT_NAME;
use ma_video_cache::store::fs::FsStore;
use ma_video_cache::store::traits::{Attachment, AttachmentStore};

const MB: usize = 1024 * 1024;

fn open(dir: &tempfile::TempDir) -> FsStore {
    FsStore::new(dir.path(), DEFAULT_ATTACHMENT_NAME).unwrap()
}

#[tokio::test]
async fn test_fs_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    let data: Vec<u8> = (0..2 * MB).map(|i| (i % 251) as u8).collect();
    let stored = store
        .put("v1", Attachment::new("video/webm", data.clone()))
        .await
        .unwrap();
    assert_eq!(stored.len(), 2 * MB as u64);

    let read_back = store.get("v1").await.unwrap().unwrap();
    assert_eq!(read_back.content_type, "video/webm");
    assert_eq!(&read_back.data[..], &data[..]);

    // A second store over the same directory sees the entry.
    let reopened = open(&dir);
    assert_eq!(reopened.get("v1").await.unwrap().unwrap(), read_back);
}

#[tokio::test]
async fn test_fs_store_missing_id_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    assert!(store.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_fs_store_put_replaces_whole_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    store
        .put("v2", Attachment::new("video/mp4", vec![0xAAu8; 4096]))
        .await
        .unwrap();
    store
        .put("v2", Attachment::new("video/x-matroska", vec![0xBBu8; 10]))
        .await
        .unwrap();

    let got = store.get("v2").await.unwrap().unwrap();
    assert_eq!(got.content_type, "video/x-matroska");
    assert_eq!(&got.data[..], &[0xBBu8; 10]);

    // Only the live entry directory remains, no staging leftovers.
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_fs_store_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    store
        .put("v3", Attachment::new("video/mp4", vec![1u8; 16]))
        .await
        .unwrap();
    assert!(store.remove("v3").await.unwrap());
    assert!(store.get("v3").await.unwrap().is_none());
    assert!(!store.remove("v3").await.unwrap());
}

#[tokio::test]
async fn test_fs_store_ids_with_separators_stay_inside_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    store
        .put("../escape/v4", Attachment::new("video/mp4", vec![4u8; 4]))
        .await
        .unwrap();
    assert!(store.get("../escape/v4").await.unwrap().is_some());
    assert!(!dir.path().parent().unwrap().join("escape").exists());
}

#[tokio::test]
async fn test_fs_store_corrupt_entry_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    store
        .put("v5", Attachment::new("video/mp4", vec![5u8; 64]))
        .await
        .unwrap();
    let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().path();
    std::fs::write(entry.join(DEFAULT_ATTACHMENT_NAME), [5u8; 10]).unwrap();

    assert!(store.get("v5").await.is_err());
}

#[test]
fn test_fs_store_cleans_stale_staging_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join(".7631.tmp-0f3c9a5e7b2d4e61a8c09d1e2f3a4b5c");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join(DEFAULT_ATTACHMENT_NAME), b"partial").unwrap();
    let replaced = dir.path().join(".7631.old-9a8b7c6d5e4f30211203f4e5d6c7b8a9");
    std::fs::create_dir_all(&replaced).unwrap();

    let _store = open(&dir);
    assert!(!stale.exists());
    assert!(!replaced.exists());
}

#[test]
fn test_fs_store_keeps_unrelated_dot_entries() {
    let dir = tempfile::tempdir().unwrap();
    let git = dir.path().join(".git");
    std::fs::create_dir_all(&git).unwrap();
    std::fs::write(git.join("HEAD"), b"ref: refs/heads/main\n").unwrap();
    std::fs::write(dir.path().join(".env"), b"TOKEN=1").unwrap();
    std::fs::create_dir_all(dir.path().join(".cache.tmp-old")).unwrap();

    let _store = open(&dir);
    assert!(git.join("HEAD").exists());
    assert!(dir.path().join(".env").exists());
    assert!(dir.path().join(".cache.tmp-old").exists());
}
