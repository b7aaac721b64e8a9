use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// 解析対象の画像か（拡張子 jpg/jpeg、大文字小文字は問わない）
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// フォルダ直下の画像をファイル名順で返す
pub fn scan_folder(folder: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image_path(p))
        .collect();

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    images
}

/// 引数のパス群から解析対象を集める（引数の順を保つ）
///
/// - 画像ファイルはそのまま
/// - フォルダは直下の画像を展開
/// - 存在しないパスは残す（バッチ内で1件の失敗として扱われる）
/// - それ以外のファイルは除外
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            let found = scan_folder(path);
            if found.is_empty() {
                tracing::warn!(folder = %path.display(), "フォルダに画像がありません");
            }
            images.extend(found);
        } else if !path.exists() {
            tracing::warn!(path = %path.display(), "ファイルが存在しません");
            images.push(path.clone());
        } else if is_image_path(path) {
            images.push(path.clone());
        } else {
            tracing::warn!(path = %path.display(), "JPEG以外のファイルを除外");
        }
    }

    images
}
