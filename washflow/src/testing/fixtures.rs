//! Image and stage fixtures.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageOutputFormat, Rgb, RgbImage};

use crate::core::StageKind;
use crate::stages::{StageDefinition, StageSet};

/// Encodes a solid-color RGB image as PNG.
#[must_use]
#[allow(clippy::expect_used)]
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .expect("in-memory PNG encoding");
    cursor.into_inner()
}

/// Writes a small photograph into `dir` and returns its path.
#[must_use]
#[allow(clippy::expect_used)]
pub fn write_photo(dir: &Path) -> PathBuf {
    let path = dir.join("photo.png");
    std::fs::write(&path, solid_png(16, 12, [90, 140, 200])).expect("write fixture photo");
    path
}

/// Stage definitions whose prompts name their stage, e.g. `"paint wash-1"`.
#[must_use]
pub fn labelled_stages() -> StageSet {
    StageKind::ALL
        .into_iter()
        .fold(StageSet::watercolor(), |set, kind| {
            set.with_prompt(kind, format!("paint {kind}"))
        })
}

/// The default definitions as a plain list.
#[must_use]
pub fn stage_definitions() -> Vec<StageDefinition> {
    StageSet::watercolor().into_vec()
}
