use axum::body::Bytes;
use gallery_portal::{
    error::StorageError,
    storage::{BlobStore, LocalBlobStore, MockBlobStore, S3BlobStore, sanitize_filename},
};
use std::path::PathBuf;
use uuid::Uuid;

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("gallery-blob-{}", Uuid::new_v4()))
}

#[cfg(test)]
mod sanitize_tests {
    use super::*;

    #[test]
    fn test_keeps_plain_names() {
        assert_eq!(sanitize_filename("cat.png").unwrap(), "cat.png");
    }

    #[test]
    fn test_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\dog.jpg").unwrap(), "dog.jpg");
        assert_eq!(sanitize_filename("photos/trip/").unwrap(), "trip");
    }

    #[test]
    fn test_rejects_empty_and_dot_names() {
        for name in ["", "/", "..", "a/..", "."] {
            assert!(
                matches!(sanitize_filename(name), Err(StorageError::InvalidName(_))),
                "{:?} should be rejected",
                name
            );
        }
    }
}

#[cfg(test)]
mod local_tests {
    use super::*;

    #[tokio::test]
    async fn test_save_writes_file_and_returns_reference() {
        let dir = scratch_dir();
        let store = LocalBlobStore::new(&dir);
        store.ensure_ready().await.unwrap();

        let reference = store
            .save("cat.png", Bytes::from_static(b"not really a png"))
            .await
            .unwrap();

        assert_eq!(reference, "/images/cat.png");
        let written = tokio::fs::read(dir.join("cat.png")).await.unwrap();
        assert_eq!(written, b"not really a png");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let dir = scratch_dir();
        let store = LocalBlobStore::new(&dir);
        store.ensure_ready().await.unwrap();

        let first = store.save("a.png", Bytes::from_static(b"one")).await.unwrap();
        let second = store.save("a.png", Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tokio::fs::read(dir.join("a.png")).await.unwrap(), b"two");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_media_dir() {
        let dir = scratch_dir();
        let store = LocalBlobStore::new(&dir);
        store.ensure_ready().await.unwrap();

        let reference = store
            .save("../escape.png", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert_eq!(reference, "/images/escape.png");
        assert!(dir.join("escape.png").exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_io_error() {
        // ensure_ready was never called, so the directory does not exist.
        let store = LocalBlobStore::new(scratch_dir());
        let err = store
            .save("cat.png", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_saves() {
        let mock = MockBlobStore::new();
        let reference = mock
            .save("dir/dog.jpg", Bytes::from_static(b"woof"))
            .await
            .unwrap();

        assert_eq!(reference, "/images/dog.jpg");
        assert_eq!(mock.saved().await, vec![("dog.jpg".to_string(), 4)]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockBlobStore::new_failing();
        assert!(mock.save("dog.jpg", Bytes::new()).await.is_err());
        assert!(mock.saved().await.is_empty());
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_object_reference_format() {
        let store = S3BlobStore::new(
            "http://localhost:9000/",
            "us-east-1",
            "key",
            "secret",
            "gallery-images",
        )
        .await;

        assert_eq!(
            store.object_ref("images/cat.png"),
            "http://localhost:9000/gallery-images/images/cat.png"
        );
    }
}
