use std::collections::HashSet;

use punch_capture::contract::MediaReader;
use punch_capture::error::MediaReadError;
use punch_capture::media::{mime_for_uri, LocalMediaReader, MediaHandle};
use punch_capture::object_name::StoredObjectName;
use tempfile::tempdir;

#[test]
fn mime_is_inferred_from_extension_and_defaults_to_jpeg() {
    assert_eq!(mime_for_uri("file:///a/IMG_1.JPG"), "image/jpeg");
    assert_eq!(mime_for_uri("file:///a/shot.png?token=1"), "image/png");
    assert_eq!(mime_for_uri("content://media/external/images/42"), "image/jpeg");

    let handle = MediaHandle::new("file:///a/shot.heic", None, None);
    assert_eq!(handle.mime_type, "image/heic");
    assert_eq!(handle.file_name(), Some("shot.heic"));

    let explicit = MediaHandle::new("file:///a/raw", Some("image/png".to_string()), None);
    assert_eq!(explicit.mime_type, "image/png");
    assert_eq!(explicit.extension().as_deref(), Some("png"));
}

#[test]
fn object_names_follow_prefix_timestamp_extension() {
    let handle = MediaHandle::new("file:///cache/photo.jpeg", None, None);
    let name = StoredObjectName::for_handle(&handle, "punch", "jpg");

    let rest = name
        .as_str()
        .strip_prefix("punch_")
        .expect("prefix");
    let (stamp, ext) = rest.split_once('.').expect("extension");
    assert_eq!(ext, "jpg");
    assert!(stamp.parse::<i64>().unwrap() > 1_600_000_000_000);
}

#[test]
fn object_names_are_unique_and_increasing() {
    let stamps: Vec<i64> = (0..500)
        .map(|_| {
            let name = StoredObjectName::generate("punch", "jpg");
            name.as_str()["punch_".len()..name.as_str().len() - ".jpg".len()]
                .parse()
                .unwrap()
        })
        .collect();

    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    let unique: HashSet<_> = stamps.iter().collect();
    assert_eq!(unique.len(), stamps.len());
}

#[test]
fn unknown_extension_uses_configured_default() {
    let handle = MediaHandle::new(
        "content://media/42",
        Some("application/octet-stream".to_string()),
        None,
    );
    let name = StoredObjectName::for_handle(&handle, "punch", "jpg");
    assert!(name.as_str().ends_with(".jpg"));
}

#[tokio::test]
async fn local_reader_serves_every_access_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("capture.png");
    let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &bytes).unwrap();

    let reader = LocalMediaReader::new();
    let handle = MediaHandle::new(format!("file://{}", path.display()), None, None);

    let file = reader.read_file(&handle).await.unwrap();
    assert_eq!(file.as_ref(), bytes.as_slice());

    let blob = reader.fetch_blob(&handle).await.unwrap();
    assert_eq!(blob.bytes.as_ref(), bytes.as_slice());
    assert_eq!(blob.content_type.as_deref(), Some("image/png"));

    let plain = MediaHandle::new(path.display().to_string(), None, None);
    assert_eq!(reader.fetch_buffer(&plain).await.unwrap(), bytes);
}

#[tokio::test]
async fn local_reader_ignores_a_wrong_size_hint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.jpg");
    std::fs::write(&path, b"\xff\xd8\xff\xd9").unwrap();

    let reader = LocalMediaReader::new();
    for hint in [Some(u64::MAX), Some(0), Some(1 << 40)] {
        let handle = MediaHandle::new(format!("file://{}", path.display()), None, hint);
        let blob = reader.fetch_blob(&handle).await.unwrap();
        assert_eq!(blob.bytes.as_ref(), b"\xff\xd8\xff\xd9", "hint {hint:?}");
    }
}

#[tokio::test]
async fn local_reader_reports_missing_and_foreign_locators() {
    let dir = tempdir().unwrap();
    let reader = LocalMediaReader::new();

    let missing = MediaHandle::new(
        format!("file://{}", dir.path().join("gone.jpg").display()),
        None,
        None,
    );
    assert!(matches!(
        reader.read_file(&missing).await,
        Err(MediaReadError::NotFound { .. })
    ));
    assert!(matches!(
        reader.fetch_blob(&missing).await,
        Err(MediaReadError::NotFound { .. })
    ));

    let remote = MediaHandle::new("content://media/external/images/7", None, None);
    assert!(matches!(
        reader.fetch_buffer(&remote).await,
        Err(MediaReadError::UnsupportedUri { .. })
    ));
}
