// File: crates/metasaver-core/src/acquire.rs

use crate::MetaSaverError;
use crate::gateway::FileGateway;
use crate::kind::{SNIFF_LEN, sniff_extension};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a new photo or video comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Camera,
    Gallery,
}

/// The platform surfaces that hand over a captured or selected file.
///
/// `Ok(None)` means the user backed out; that is not an error.
#[async_trait]
pub trait MediaPicker: Send + Sync {
    /// A reference to a freshly captured file.
    async fn capture(&self) -> Result<Option<String>, MetaSaverError>;

    /// A reference to a file chosen from the gallery. May be remote.
    async fn pick(&self) -> Result<Option<String>, MetaSaverError>;
}

/// Base name of the cache copy of a gallery selection.
const PICKED_STEM: &str = "picked";

/// Produces a local path for `source`, or `None` if the user cancelled.
///
/// Camera captures are already local. Gallery picks are always copied into
/// `cache_dir` first, downloading remote references, so downstream code sees
/// the same kind of path either way.
pub async fn acquire(
    picker: &dyn MediaPicker,
    gateway: &dyn FileGateway,
    cache_dir: &Path,
    source: Source,
) -> Result<Option<PathBuf>, MetaSaverError> {
    let reference = match source {
        Source::Camera => picker.capture().await?,
        Source::Gallery => picker.pick().await?,
    };
    let Some(reference) = reference.filter(|r| !r.trim().is_empty()) else {
        debug!(?source, "acquisition cancelled");
        return Ok(None);
    };

    match source {
        Source::Camera => Ok(Some(local_path(&reference))),
        Source::Gallery => copy_to_cache(gateway, &reference, cache_dir)
            .await
            .map(Some),
    }
}

/// Copies (or downloads) `reference` to `<cache_dir>/picked.<ext>`.
///
/// A reference whose name has no extension is sniffed after it lands; if the
/// header is not recognised the copy stays as plain `picked` and will not
/// classify.
pub async fn copy_to_cache(
    gateway: &dyn FileGateway,
    reference: &str,
    cache_dir: &Path,
) -> Result<PathBuf, MetaSaverError> {
    gateway.mkdir(cache_dir).await?;

    let dest = if is_uri(reference) {
        let dest = cache_dir.join(cache_name(uri_file_name(reference)));
        let result = gateway.download_file(reference, &dest).await?;
        if result.status_code >= 400 {
            return Err(MetaSaverError::Download {
                url: reference.to_string(),
                status: result.status_code,
            });
        }
        debug!(uri = reference, dest = %dest.display(), "selection fetched");
        dest
    } else {
        let src = local_path(reference);
        let dest = cache_dir.join(cache_name(&src.to_string_lossy()));
        if src != dest {
            gateway.copy_file(&src, &dest).await?;
        }
        debug!(src = %src.display(), dest = %dest.display(), "selection cached");
        dest
    };

    if dest.extension().is_some() {
        return Ok(dest);
    }
    name_by_content(gateway, dest).await
}

async fn name_by_content(
    gateway: &dyn FileGateway,
    cached: PathBuf,
) -> Result<PathBuf, MetaSaverError> {
    let head = gateway.read_head(&cached, SNIFF_LEN).await?;
    let Some(ext) = sniff_extension(&head) else {
        debug!(path = %cached.display(), "unrecognised content");
        return Ok(cached);
    };
    let named = cached.with_extension(ext);
    gateway.move_file(&cached, &named).await?;
    Ok(named)
}

/// Any `scheme://` reference other than `file://` (http, https, content, ...).
fn is_uri(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    well_formed && !scheme.eq_ignore_ascii_case("file")
}

/// Strips a `file://` scheme; anything else is already a path.
fn local_path(reference: &str) -> PathBuf {
    PathBuf::from(reference.strip_prefix("file://").unwrap_or(reference))
}

/// The last path segment of a URI, without query or fragment.
fn uri_file_name(uri: &str) -> &str {
    let without_query = uri.split(['?', '#']).next().unwrap_or(uri);
    without_query.rsplit('/').next().unwrap_or("")
}

/// `picked.<ext>` with the source's lower-cased extension, bare `picked` if it has none.
fn cache_name(name: &str) -> String {
    match Path::new(name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{PICKED_STEM}.{}", ext.to_ascii_lowercase()),
        None => PICKED_STEM.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFs;

    struct Scripted {
        camera: Option<String>,
        gallery: Option<String>,
    }

    #[async_trait]
    impl MediaPicker for Scripted {
        async fn capture(&self) -> Result<Option<String>, MetaSaverError> {
            Ok(self.camera.clone())
        }

        async fn pick(&self) -> Result<Option<String>, MetaSaverError> {
            Ok(self.gallery.clone())
        }
    }

    fn picker(camera: Option<&str>, gallery: Option<&str>) -> Scripted {
        Scripted {
            camera: camera.map(str::to_string),
            gallery: gallery.map(str::to_string),
        }
    }

    const CACHE: &str = "/app/cache";

    #[tokio::test]
    async fn camera_path_is_used_in_place() {
        let fs = FakeFs::new();
        let path = acquire(
            &picker(Some("file:///dcim/IMG_1.jpg"), None),
            &*fs,
            Path::new(CACHE),
            Source::Camera,
        )
        .await
        .unwrap();

        assert_eq!(path, Some(PathBuf::from("/dcim/IMG_1.jpg")));
        assert!(fs.copies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_not_an_error() {
        let fs = FakeFs::new();
        for source in [Source::Camera, Source::Gallery] {
            let path = acquire(&picker(None, None), &*fs, Path::new(CACHE), source)
                .await
                .unwrap();
            assert_eq!(path, None);
        }
        let blank = acquire(&picker(None, Some("  ")), &*fs, Path::new(CACHE), Source::Gallery)
            .await
            .unwrap();
        assert_eq!(blank, None);
    }

    #[tokio::test]
    async fn gallery_file_is_copied_into_cache() {
        let fs = FakeFs::new();
        fs.put("/sdcard/Pictures/Holiday 1.JPEG", b"jpeg");

        let path = acquire(
            &picker(None, Some("file:///sdcard/Pictures/Holiday 1.JPEG")),
            &*fs,
            Path::new(CACHE),
            Source::Gallery,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(path, PathBuf::from("/app/cache/picked.jpeg"));
        assert_eq!(fs.read(&path), Some(b"jpeg".to_vec()));
        assert_eq!(*fs.mkdir_calls.lock().unwrap(), vec![PathBuf::from(CACHE)]);
    }

    #[tokio::test]
    async fn remote_selection_is_downloaded() {
        let fs = FakeFs::new();
        fs.serve("https://media.example/u/0/clip.MOV?token=abc", 200, b"moov");

        let path = acquire(
            &picker(None, Some("https://media.example/u/0/clip.MOV?token=abc")),
            &*fs,
            Path::new(CACHE),
            Source::Gallery,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(path, PathBuf::from("/app/cache/picked.mov"));
        assert_eq!(fs.read(&path), Some(b"moov".to_vec()));
    }

    #[tokio::test]
    async fn content_uri_is_fetched_and_named_by_its_header() {
        let fs = FakeFs::new();
        let uri = "content://media/external/images/media/42";
        fs.serve(uri, 200, &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']);

        let path = acquire(&picker(None, Some(uri)), &*fs, Path::new(CACHE), Source::Gallery)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path, PathBuf::from("/app/cache/picked.jpg"));
        assert_eq!(fs.read(&path).unwrap()[..2], [0xFF, 0xD8]);
        assert!(fs.read(Path::new("/app/cache/picked")).is_none());
        assert!(fs.copies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn extensionless_video_is_not_mistaken_for_an_image() {
        let fs = FakeFs::new();
        fs.put("/sdcard/Download/clip", b"\0\0\0\x18ftypmp42\0\0\0\0moov");

        let path = acquire(
            &picker(None, Some("/sdcard/Download/clip")),
            &*fs,
            Path::new(CACHE),
            Source::Gallery,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(path, PathBuf::from("/app/cache/picked.mp4"));
        assert_eq!(crate::classify(&path).unwrap(), crate::MediaKind::Video);
    }

    #[tokio::test]
    async fn unrecognised_content_stays_unclassifiable() {
        let fs = FakeFs::new();
        let uri = "content://downloads/public_downloads/7";
        fs.serve(uri, 200, b"plain text, not media");

        let path = acquire(&picker(None, Some(uri)), &*fs, Path::new(CACHE), Source::Gallery)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(path, PathBuf::from("/app/cache/picked"));
        assert!(matches!(
            crate::classify(&path),
            Err(MetaSaverError::UnsupportedKind(_))
        ));
    }

    #[tokio::test]
    async fn failed_download_is_reported() {
        let fs = FakeFs::new();
        fs.serve("https://media.example/photo.jpg", 403, b"");

        let err = acquire(
            &picker(None, Some("https://media.example/photo.jpg")),
            &*fs,
            Path::new(CACHE),
            Source::Gallery,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MetaSaverError::Download { status: 403, .. }));
        assert!(fs.read(Path::new("/app/cache/picked.jpg")).is_none());
    }

    #[tokio::test]
    async fn missing_gallery_file_propagates() {
        let fs = FakeFs::new();
        let err = acquire(
            &picker(None, Some("/sdcard/gone.png")),
            &*fs,
            Path::new(CACHE),
            Source::Gallery,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MetaSaverError::Io(_)));
    }

    #[test]
    fn cache_names_keep_the_extension() {
        assert_eq!(cache_name("a/b/IMG.HEIC"), "picked.heic");
        assert_eq!(cache_name("content-without-ext"), "picked");
        assert_eq!(uri_file_name("https://x.test/a/b.png?x=1#f"), "b.png");
        assert_eq!(uri_file_name("https://x.test/"), "");
    }

    #[test]
    fn every_scheme_but_file_is_fetched() {
        assert!(is_uri("https://x.test/a.jpg"));
        assert!(is_uri("content://media/external/images/media/42"));
        assert!(is_uri("ph://ED7AC36B-A150-4C38-BB8C/L0/001"));
        assert!(!is_uri("file:///sdcard/a.jpg"));
        assert!(!is_uri("FILE:///sdcard/a.jpg"));
        assert!(!is_uri("/sdcard/a.jpg"));
        assert!(!is_uri("/sdcard/odd ://name.jpg"));
    }
}
