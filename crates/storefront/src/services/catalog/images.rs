//! Product image reconciliation.
//!
//! Printful exposes the same mockup under several variants (every size of a
//! color shares one preview), so the raw image list is full of repeats.
//! Images are keyed by `(url, color)`: the first occurrence wins and output
//! keeps first-seen order.

use std::collections::HashSet;

use crate::db::products::NewImage;
use crate::services::printful::SyncProductDetail;

/// An image found on a Printful product before dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: String,
    pub color: Option<String>,
}

impl ImageCandidate {
    fn new(url: &str, color: Option<&str>) -> Self {
        Self {
            url: url.trim().to_string(),
            color: color.map(str::trim).filter(|c| !c.is_empty()).map(String::from),
        }
    }
}

/// Candidate images in variant order: each sellable variant's preview,
/// then its catalog image, then the product thumbnail.
#[must_use]
pub fn collect_candidates(detail: &SyncProductDetail) -> Vec<ImageCandidate> {
    let mut candidates = Vec::new();

    for variant in detail.sync_variants.iter().filter(|v| v.is_sellable()) {
        let color = variant.color.as_deref();
        if let Some(url) = variant.preview_url() {
            candidates.push(ImageCandidate::new(url, color));
        }
        if let Some(url) = variant.catalog_image() {
            candidates.push(ImageCandidate::new(url, color));
        }
    }

    if let Some(url) = &detail.sync_product.thumbnail_url {
        candidates.push(ImageCandidate::new(url, None));
    }

    candidates
}

/// Single-pass dedup keyed by `(url, color)`.
///
/// Empty URLs are skipped. Positions are assigned 0..n in first-seen order.
#[must_use]
pub fn dedup_images(candidates: impl IntoIterator<Item = ImageCandidate>) -> Vec<NewImage> {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut images = Vec::new();

    for candidate in candidates {
        if candidate.url.is_empty() {
            continue;
        }
        if !seen.insert((candidate.url.clone(), candidate.color.clone())) {
            continue;
        }
        images.push(NewImage {
            url: candidate.url,
            color: candidate.color,
            position: i32::try_from(images.len()).unwrap_or(i32::MAX),
        });
    }

    images
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(url: &str, color: Option<&str>) -> ImageCandidate {
        ImageCandidate::new(url, color)
    }

    #[test]
    fn test_first_occurrence_wins_in_order() {
        let images = dedup_images([
            candidate("https://cdn/black.png", Some("Black")),
            candidate("https://cdn/white.png", Some("White")),
            candidate("https://cdn/black.png", Some("Black")),
            candidate("https://cdn/thumb.png", None),
        ]);
        let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            ["https://cdn/black.png", "https://cdn/white.png", "https://cdn/thumb.png"]
        );
        let positions: Vec<i32> = images.iter().map(|i| i.position).collect();
        assert_eq!(positions, [0, 1, 2]);
    }

    #[test]
    fn test_same_url_different_color_kept() {
        let images = dedup_images([
            candidate("https://cdn/blank.png", Some("Black")),
            candidate("https://cdn/blank.png", Some("Navy")),
            candidate("https://cdn/blank.png", None),
        ]);
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn test_empty_urls_skipped() {
        let images = dedup_images([
            candidate("   ", Some("Black")),
            candidate("https://cdn/a.png", Some("")),
        ]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].position, 0);
        // Blank color is treated as no color
        assert_eq!(images[0].color, None);
    }

    #[test]
    fn test_collect_candidates_from_printful_product() {
        let detail: SyncProductDetail = serde_json::from_value(serde_json::json!({
            "sync_product": {"id": 9, "name": "Logo Tee", "thumbnail_url": "https://cdn/thumb.png"},
            "sync_variants": [
                {"id": 1, "name": "Black / S", "color": "Black",
                 "product": {"image": "https://cdn/blank-black.png"},
                 "files": [{"type": "preview", "preview_url": "https://cdn/mock-black.png"}]},
                {"id": 2, "name": "Black / M", "color": "Black",
                 "product": {"image": "https://cdn/blank-black.png"},
                 "files": [{"type": "preview", "preview_url": "https://cdn/mock-black.png"}]},
                {"id": 3, "name": "Red / M", "color": "Red", "is_ignored": true,
                 "files": [{"type": "preview", "preview_url": "https://cdn/mock-red.png"}]}
            ]
        }))
        .unwrap();

        let images = dedup_images(collect_candidates(&detail));
        let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://cdn/mock-black.png",
                "https://cdn/blank-black.png",
                "https://cdn/thumb.png"
            ]
        );
    }
}
