use image::{ImageFormat, Rgba, RgbaImage};
use punch_capture::contract::{
    CaptureBackend, CaptureOptions, CredentialProvider, Permission, PermissionGate,
    PermissionStatus,
};
use punch_capture::error::AcquireError;
use punch_capture::media::CaptureSource;
use punch_capture_cli::device::{
    jpeg_quality, FileCaptureBackend, HostPermissions, StaticCredentials,
};
use tempfile::tempdir;

const OPTIONS: CaptureOptions = CaptureOptions { quality: 0.7 };

#[tokio::test]
async fn host_denies_camera_and_grants_library() {
    let gate = HostPermissions;
    assert_eq!(gate.request(Permission::Camera).await, PermissionStatus::Denied);
    assert_eq!(
        gate.request(Permission::MediaLibrary).await,
        PermissionStatus::Granted
    );
}

#[tokio::test]
async fn selection_is_reencoded_as_jpeg_in_the_cache() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("site-walk.png");
    RgbaImage::from_pixel(32, 24, Rgba([200, 40, 40, 128]))
        .save_with_format(&source, ImageFormat::Png)
        .unwrap();

    let backend = FileCaptureBackend::new(Some(source)).unwrap();
    let asset = backend
        .launch(CaptureSource::Gallery, OPTIONS)
        .await
        .unwrap()
        .expect("a selection was made");

    assert_eq!(asset.mime_type.as_deref(), Some("image/jpeg"));
    let path = asset.uri.strip_prefix("file://").expect("file uri");
    assert!(path.ends_with("site-walk.jpg"));
    assert!(std::path::Path::new(path).starts_with(backend.cache_dir()));

    let bytes = std::fs::read(path).unwrap();
    assert_eq!(asset.file_size, Some(bytes.len() as u64));
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
}

#[tokio::test]
async fn no_selection_is_a_cancelled_picker() {
    let backend = FileCaptureBackend::new(None).unwrap();
    let asset = backend.launch(CaptureSource::Gallery, OPTIONS).await.unwrap();
    assert!(asset.is_none());
}

#[tokio::test]
async fn undecodable_selection_is_a_device_error() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("broken.png");
    std::fs::write(&source, b"not an image").unwrap();

    let backend = FileCaptureBackend::new(Some(source)).unwrap();
    let err = backend
        .launch(CaptureSource::Gallery, OPTIONS)
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Device { .. }));
}

#[tokio::test]
async fn camera_is_unavailable_on_the_host() {
    let backend = FileCaptureBackend::new(None).unwrap();
    let err = backend
        .launch(CaptureSource::Camera, OPTIONS)
        .await
        .unwrap_err();
    assert!(matches!(err, AcquireError::Unavailable { .. }));
}

#[test]
fn quality_maps_onto_encoder_scale() {
    assert_eq!(jpeg_quality(0.7), 70);
    assert_eq!(jpeg_quality(1.0), 100);
    assert_eq!(jpeg_quality(0.001), 1);
}

#[tokio::test]
async fn static_credentials_hand_out_the_env_token() {
    assert_eq!(
        StaticCredentials::new(Some("t".to_string())).token().await,
        Some("t".to_string())
    );
    assert_eq!(StaticCredentials::new(None).token().await, None);
    assert!(!format!("{:?}", StaticCredentials::new(Some("secret".into()))).contains("secret"));
}
