use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    Category,
    Product,
    Misc,
}

impl Default for UploadKind {
    fn default() -> Self {
        UploadKind::Misc
    }
}

impl UploadKind {
    pub fn subdir(self) -> &'static str {
        match self {
            UploadKind::Category => "categories",
            UploadKind::Product => "products",
            UploadKind::Misc => "",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "category" => Some(UploadKind::Category),
            "product" => Some(UploadKind::Product),
            "misc" => Some(UploadKind::Misc),
            _ => None,
        }
    }
}

/// Human-readable form of the configured size limit for client messages.
pub fn size_limit_label(bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{} байт", bytes)
    }
}

pub fn allowed_mime(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/jpeg" | "image/png" | "image/gif" | "image/webp"
    )
}

pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => "",
    }
}

/// Filenames come from URL path segments; anything that could escape the
/// upload directory is rejected.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains("..")
}

pub async fn ensure_directories(root: &Path) -> Result<()> {
    for subdir in ["", "categories", "products"] {
        let dir = root.join(subdir);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::InternalError(format!("Failed to create upload dir {:?}: {}", dir, e))
        })?;
    }
    Ok(())
}

pub async fn save_file(root: &Path, kind: UploadKind, filename: &str, data: &[u8]) -> Result<PathBuf> {
    let path = root.join(kind.subdir()).join(filename);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store file {:?}: {}", path, e)))?;
    Ok(path)
}

pub async fn delete_file(root: &Path, kind: UploadKind, filename: &str) -> Result<()> {
    let path = root.join(kind.subdir()).join(filename);
    tokio::fs::remove_file(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound("Файл не найден".to_string())
        } else {
            AppError::InternalError(format!("Failed to delete file {:?}: {}", path, e))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_size_limits() {
        assert_eq!(size_limit_label(5 * 1024 * 1024), "5MB");
        assert_eq!(size_limit_label(10 * 1024 * 1024), "10MB");
        assert_eq!(size_limit_label(512 * 1024), "512KB");
        assert_eq!(size_limit_label(1000), "1000 байт");
    }

    #[test]
    fn accepts_only_image_mimes() {
        assert!(allowed_mime("image/jpeg"));
        assert!(allowed_mime("image/png"));
        assert!(allowed_mime("image/gif"));
        assert!(allowed_mime("image/webp"));
        assert!(!allowed_mime("image/svg+xml"));
        assert!(!allowed_mime("application/pdf"));
        assert!(!allowed_mime("text/html"));
    }

    #[test]
    fn maps_mime_to_extension() {
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("image/webp"), ".webp");
        assert_eq!(extension_for("application/pdf"), "");
    }

    #[test]
    fn rejects_traversal_filenames() {
        assert!(is_safe_filename("a1b2c3.jpg"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("../secret"));
        assert!(!is_safe_filename("a/b.jpg"));
        assert!(!is_safe_filename("a\\b.jpg"));
    }

    #[test]
    fn parses_upload_kind() {
        assert_eq!(UploadKind::parse("category"), Some(UploadKind::Category));
        assert_eq!(UploadKind::parse("product"), Some(UploadKind::Product));
        assert_eq!(UploadKind::parse("misc"), Some(UploadKind::Misc));
        assert_eq!(UploadKind::parse("video"), None);
    }

    #[tokio::test]
    async fn saves_and_deletes_files() {
        let root = std::env::temp_dir().join(format!("uploads-test-{}", uuid::Uuid::new_v4()));
        ensure_directories(&root).await.unwrap();

        save_file(&root, UploadKind::Product, "x.jpg", b"data")
            .await
            .unwrap();
        assert!(root.join("products/x.jpg").exists());

        delete_file(&root, UploadKind::Product, "x.jpg").await.unwrap();
        assert!(!root.join("products/x.jpg").exists());

        let err = delete_file(&root, UploadKind::Product, "x.jpg").await;
        assert!(matches!(err, Err(AppError::NotFound(_))));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
