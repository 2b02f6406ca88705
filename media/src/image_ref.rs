//! # Image references
//!
//! Product rows store an opaque image reference that accumulated several
//! shapes over the project's lifetime:
//!
//! - empty / NULL
//! - a full `http(s)://` URL (uploads store the CDN's `secure_url` directly)
//! - a legacy relative path, possibly with duplicated `image/upload/`
//!   markers, an old project prefix or a stray `media/` segment
//!
//! The reference is parsed into [`ImageRef`] exactly once at the storage
//! boundary, and [`ImageRef::resolve`] turns it into the single canonical
//! delivery URL. Resolution is pure: it never touches storage. Rewriting
//! stored rows is the repair CLI's job.

use regex::Regex;

/// Delivery host of the CDN.
pub const CDN_HOST: &str = "res.cloudinary.com";

/// Project prefix written by old migration scripts.
const LEGACY_PROJECT_PREFIX: &str = "yoquet/";

/// Segment left behind by references that once pointed at local media files.
const LEGACY_MEDIA_SEGMENT: &str = "media/";

/// Upload folder; redundant when it leads the raw reference.
const UPLOAD_FOLDER_PREFIX: &str = "productos/";

/// A stored product image reference, classified once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Empty,
    AbsoluteUrl(String),
    LegacyPath(String),
}

impl ImageRef {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Empty;
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Empty;
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Self::AbsoluteUrl(raw.to_string());
        }

        Self::LegacyPath(raw.to_string())
    }

    /// Resolves the reference to its canonical absolute URL.
    ///
    /// Absolute URLs are authoritative and returned unchanged. Legacy paths
    /// are cleaned into a public identifier and prefixed with the delivery
    /// template, unless the cleaned path already names the CDN host.
    pub fn resolve(&self, cloud_name: &str) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::AbsoluteUrl(url) => Some(url.clone()),
            Self::LegacyPath(path) => {
                let public_id = clean_legacy_path(path);

                if public_id.is_empty() {
                    return None;
                }

                if public_id.contains(CDN_HOST) {
                    return Some(public_id);
                }

                Some(format!(
                    "https://{CDN_HOST}/{cloud_name}/image/upload/{public_id}"
                ))
            }
        }
    }

    /// The CDN-relative identifier this reference points at, if any.
    ///
    /// Used by the repair pass to look the asset up on the CDN. Absolute
    /// URLs outside the CDN host have no identifier and cannot be verified.
    pub fn public_id(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::AbsoluteUrl(url) => {
                if !url.contains(CDN_HOST) {
                    return None;
                }

                let capture = Regex::new(r"/upload/(?:v\d+/)?(.+)$").unwrap();
                capture
                    .captures(url)
                    .map(|c| c[1].trim().to_string())
                    .filter(|id| !id.is_empty())
            }
            Self::LegacyPath(path) => {
                let public_id = clean_legacy_path(path);
                (!public_id.is_empty() && !public_id.contains(CDN_HOST)).then_some(public_id)
            }
        }
    }
}

/// Strips the junk legacy paths accumulated: leading slashes, duplicated
/// `image/upload/` markers, a redundant leading upload-folder segment and
/// the old project/media prefixes.
///
/// The leading `productos/` strip runs against the raw path, before the
/// project prefix is removed: `yoquet/productos/x.jpg` keeps its folder,
/// a bare `productos/x.jpg` loses it.
fn clean_legacy_path(path: &str) -> String {
    let mut path = path.trim().trim_start_matches('/').to_string();

    let markers = Regex::new(r"(image/upload/)+").unwrap();
    path = markers.replace_all(&path, "image/upload/").into_owned();

    if let Some(rest) = path.strip_prefix(UPLOAD_FOLDER_PREFIX) {
        path = rest.to_string();
    }

    path = path.replace(LEGACY_PROJECT_PREFIX, "");
    path = path.replace(LEGACY_MEDIA_SEGMENT, "");

    path.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::ImageRef;

    #[test]
    fn test_empty_reference() {
        assert_eq!(ImageRef::parse(None), ImageRef::Empty);
        assert_eq!(ImageRef::parse(Some("")), ImageRef::Empty);
        assert_eq!(ImageRef::parse(Some("   ")), ImageRef::Empty);
        assert_eq!(ImageRef::parse(None).resolve("demo"), None);
    }

    #[test]
    fn test_absolute_url_unchanged() {
        let url = "https://res.cloudinary.com/demo/image/upload/productos/foo.jpg";
        let resolved = ImageRef::parse(Some(url)).resolve("demo");
        assert_eq!(resolved.as_deref(), Some(url));

        // idempotent: resolving the resolved URL changes nothing
        let again = ImageRef::parse(resolved.as_deref()).resolve("demo");
        assert_eq!(again.as_deref(), Some(url));
    }

    #[test]
    fn test_foreign_absolute_url_unchanged() {
        let url = "http://example.com/imagenes/foo.png";
        assert_eq!(
            ImageRef::parse(Some(url)).resolve("demo").as_deref(),
            Some(url)
        );
    }

    #[test]
    fn test_legacy_project_prefix_stripped() {
        assert_eq!(
            ImageRef::parse(Some("yoquet/productos/foo.jpg"))
                .resolve("demo")
                .as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/productos/foo.jpg")
        );
    }

    #[test]
    fn test_leading_upload_folder_stripped() {
        assert_eq!(
            ImageRef::parse(Some("productos/foo.jpg"))
                .resolve("demo")
                .as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/foo.jpg")
        );
    }

    #[test]
    fn test_media_segment_removed() {
        assert_eq!(
            ImageRef::parse(Some("media/foo.jpg")).resolve("demo").as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/foo.jpg")
        );
    }

    #[test]
    fn test_repeated_upload_markers_collapsed() {
        assert_eq!(
            ImageRef::parse(Some("image/upload/image/upload/foo.webp"))
                .resolve("demo")
                .as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/image/upload/foo.webp")
        );
    }

    #[test]
    fn test_leading_slashes_stripped() {
        assert_eq!(
            ImageRef::parse(Some("//foo.jpg")).resolve("demo").as_deref(),
            Some("https://res.cloudinary.com/demo/image/upload/foo.jpg")
        );
    }

    #[test]
    fn test_host_never_double_prefixed() {
        let bare = "res.cloudinary.com/demo/image/upload/foo.jpg";
        assert_eq!(ImageRef::parse(Some(bare)).resolve("demo").as_deref(), Some(bare));
    }

    #[test]
    fn test_cleanup_to_empty_is_none() {
        assert_eq!(ImageRef::parse(Some("///")).resolve("demo"), None);
        assert_eq!(ImageRef::parse(Some("media/")).resolve("demo"), None);
        assert_eq!(ImageRef::parse(Some("yoquet/media/")).resolve("demo"), None);
    }

    #[test]
    fn test_public_id_from_delivery_url() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1712/productos/foo.jpg";
        assert_eq!(
            ImageRef::parse(Some(url)).public_id().as_deref(),
            Some("productos/foo.jpg")
        );
    }

    #[test]
    fn test_public_id_from_legacy_path() {
        assert_eq!(
            ImageRef::parse(Some("yoquet/productos/foo.jpg"))
                .public_id()
                .as_deref(),
            Some("productos/foo.jpg")
        );
        assert_eq!(
            ImageRef::parse(Some("http://example.com/foo.jpg")).public_id(),
            None
        );
    }
}
