//! Embedded-preview engine, pure Rust.
//!
//! Camera RAW containers (CR2, CR3, NEF, ARW, DNG, ...) carry several
//! pre-rendered JPEG previews alongside the sensor data. This engine copies
//! those previews out byte-for-byte instead of rendering anything itself.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Open | `std::fs::read` into a session buffer |
//! | Sensor geometry | `rawloader::RawLoader::decode` in metadata-only mode over the buffer (width, height, crops) |
//! | Preview discovery | JPEG marker walk over the buffer |
//! | Preview dimensions | `image::ImageReader::into_dimensions` (header only) |
//! | Write | `std::fs::write` of the preview's byte range |
//!
//! Previews are indexed smallest first by pixel area, so index 0 is the
//! camera's thumbnail and the last index its largest rendering.
//!
//! ## Containers rawloader cannot parse
//!
//! rawloader has no decoder for some containers, CR3 among them. Those files
//! still carry their previews, so decoding succeeds as long as previews are
//! found and the reported sizes come from the previews instead:
//!
//! | Size | Sensor geometry known | Preview fallback |
//! |---|---|---|
//! | `raw_size` | full sensor | largest preview |
//! | `display_size` | sensor minus crop margins | selected preview (largest before a selection) |

use super::session::{DecoderSession, Dimensions, EngineError};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// One JPEG stream found inside a RAW container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    /// Byte range of the stream, SOI through EOI inclusive.
    pub range: Range<usize>,
    pub dimensions: Dimensions,
}

impl Preview {
    fn area(&self) -> u64 {
        u64::from(self.dimensions.width) * u64::from(self.dimensions.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Geometry {
    /// Read from the RAW metadata.
    Sensor { raw: Dimensions, display: Dimensions },
    /// rawloader rejected the container; sizes come from the previews.
    Previews,
}

#[derive(Debug)]
struct Decoded {
    /// Never empty.
    previews: Vec<Preview>,
    geometry: Geometry,
}

impl Decoded {
    fn largest(&self) -> Dimensions {
        self.previews
            .last()
            .map(|p| p.dimensions)
            .unwrap_or_default()
    }
}

/// Production [`DecoderSession`] backed by the embedded JPEG previews.
#[derive(Debug, Default)]
pub struct PreviewEngine {
    source: Option<PathBuf>,
    buffer: Vec<u8>,
    decoded: Option<Decoded>,
    selected: Option<usize>,
}

impl PreviewEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn selected_preview(&self) -> Result<&Preview, EngineError> {
        let decoded = self.decoded.as_ref().ok_or(EngineError::NotDecoded)?;
        let index = self.selected.ok_or(EngineError::NothingExtracted)?;
        decoded
            .previews
            .get(index)
            .ok_or(EngineError::NothingExtracted)
    }
}

impl DecoderSession for PreviewEngine {
    fn open(&mut self, path: &Path) -> Result<(), EngineError> {
        self.free_image();
        let buffer = std::fs::read(path)?;
        if buffer.is_empty() {
            return Err(EngineError::Unsupported(format!(
                "{} is empty",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), bytes = buffer.len(), "opened");
        self.buffer = buffer;
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    fn decode(&mut self) -> Result<(), EngineError> {
        let source = self.source.as_deref().ok_or(EngineError::NotOpen)?;
        let previews = find_previews(&self.buffer);
        if previews.is_empty() {
            return Err(EngineError::NoPreviews);
        }

        let geometry = match sensor_geometry(&self.buffer) {
            Ok((raw, display)) => Geometry::Sensor { raw, display },
            Err(reason) => {
                tracing::debug!(path = %source.display(), %reason, "no sensor geometry, using preview sizes");
                Geometry::Previews
            }
        };
        tracing::debug!(path = %source.display(), previews = previews.len(), ?geometry, "decoded");

        self.decoded = Some(Decoded { previews, geometry });
        Ok(())
    }

    fn extract_thumbnail(&mut self, index: usize) -> Result<(), EngineError> {
        let decoded = self.decoded.as_ref().ok_or(EngineError::NotDecoded)?;
        if index >= decoded.previews.len() {
            return Err(EngineError::ThumbnailOutOfRange {
                index,
                available: decoded.previews.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    fn write_thumbnail(&mut self, path: &Path) -> Result<(), EngineError> {
        let preview = self.selected_preview()?;
        std::fs::write(path, &self.buffer[preview.range.clone()])?;
        Ok(())
    }

    fn display_size(&self) -> Dimensions {
        let Some(decoded) = &self.decoded else {
            return Dimensions::default();
        };
        match decoded.geometry {
            Geometry::Sensor { display, .. } => display,
            Geometry::Previews => self
                .selected
                .and_then(|i| decoded.previews.get(i))
                .map(|p| p.dimensions)
                .unwrap_or_else(|| decoded.largest()),
        }
    }

    fn raw_size(&self) -> Dimensions {
        match &self.decoded {
            Some(Decoded {
                geometry: Geometry::Sensor { raw, .. },
                ..
            }) => *raw,
            Some(decoded) => decoded.largest(),
            None => Dimensions::default(),
        }
    }

    fn free_image(&mut self) {
        self.buffer = Vec::new();
        self.decoded = None;
        self.selected = None;
    }

    fn teardown(&mut self) {
        self.free_image();
        self.source = None;
    }
}

fn raw_loader() -> &'static rawloader::RawLoader {
    static LOADER: OnceLock<rawloader::RawLoader> = OnceLock::new();
    LOADER.get_or_init(rawloader::RawLoader::new)
}

/// Ask rawloader for `(raw, display)` sizes: full sensor and the cropped,
/// usable area.
///
/// Runs in dummy mode over the bytes already in memory: only the container
/// metadata is parsed, the sensor data is never unpacked.
fn sensor_geometry(buffer: &[u8]) -> Result<(Dimensions, Dimensions), String> {
    let decoded = raw_loader().decode(&mut Cursor::new(buffer), true)?;

    let [top, right, bottom, left] = decoded.crops;
    let raw = Dimensions {
        width: decoded.width as u32,
        height: decoded.height as u32,
    };
    let display = Dimensions {
        width: decoded.width.saturating_sub(left + right) as u32,
        height: decoded.height.saturating_sub(top + bottom) as u32,
    };
    Ok((raw, display))
}

/// Find every readable JPEG stream in `data`, smallest first.
///
/// Streams nested inside another stream (EXIF thumbnails in an APP1
/// segment) are not reported separately. Ties keep file order.
pub fn find_previews(data: &[u8]) -> Vec<Preview> {
    let mut previews: Vec<Preview> = find_jpeg_streams(data)
        .into_iter()
        .filter_map(|range| {
            let (width, height) =
                ImageReader::with_format(Cursor::new(&data[range.clone()]), ImageFormat::Jpeg)
                    .into_dimensions()
                    .ok()?;
            Some(Preview {
                range,
                dimensions: Dimensions { width, height },
            })
        })
        .collect();
    previews.sort_by_key(Preview::area);
    previews
}

const SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

fn find_jpeg_streams(data: &[u8]) -> Vec<Range<usize>> {
    let mut streams = Vec::new();
    let mut pos = 0;
    while let Some(offset) = data[pos..].windows(SOI.len()).position(|w| w == SOI) {
        let start = pos + offset;
        match jpeg_stream_end(data, start) {
            Some(end) => {
                streams.push(start..end);
                pos = end;
            }
            None => pos = start + 2,
        }
    }
    streams
}

/// Walk the marker segments of the stream starting at `start` and return the
/// offset just past its EOI, or `None` if the stream is truncated or malformed.
fn jpeg_stream_end(data: &[u8], start: usize) -> Option<usize> {
    let mut pos = start + 2;
    let mut seen_scan = false;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        // Fill bytes
        while *data.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;
        match marker {
            0xD9 => return seen_scan.then_some(pos),
            0x01 | 0xD0..=0xD7 => {}
            0xDA => {
                seen_scan = true;
                pos += segment_length(data, pos)?;
                // Entropy-coded data runs until the next real marker
                loop {
                    if *data.get(pos)? != 0xFF {
                        pos += 1;
                        continue;
                    }
                    match *data.get(pos + 1)? {
                        0x00 | 0xD0..=0xD7 => pos += 2,
                        0xFF => pos += 1,
                        0xD9 => return Some(pos + 2),
                        _ => break,
                    }
                }
            }
            0x00 => return None,
            _ => pos += segment_length(data, pos)?,
        }
    }
}

fn segment_length(data: &[u8], pos: usize) -> Option<usize> {
    let len = (usize::from(*data.get(pos)?) << 8) | usize::from(*data.get(pos + 1)?);
    (len >= 2).then_some(len)
}
