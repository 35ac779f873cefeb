use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use dmg_emu_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH, Shade};

use crate::error::CliError;

/// Expand shades to packed RGB bytes using a four-colour palette.
pub fn frame_to_rgb(frame: &[Shade], palette: &[u32; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() * 3);
    for &shade in frame {
        let px = palette[shade as usize];
        out.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, px as u8]);
    }
    out
}

pub fn write_png(path: &Path, frame: &[Shade], palette: &[u32; 4]) -> Result<(), CliError> {
    let rgb = frame_to_rgb(frame, palette);
    let wrap = |source: png::EncodingError| CliError::Screenshot {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(|e| wrap(e.into()))?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        SCREEN_WIDTH as u32,
        SCREEN_HEIGHT as u32,
    );
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(wrap)?;
    writer.write_image_data(&rgb).map_err(wrap)?;
    writer.finish().map_err(wrap)
}
