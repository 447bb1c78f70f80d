//! System clipboard through `arboard`.
//!
//! arboard exposes no change counter, so the reader derives one: every
//! `current_generation` call samples the clipboard and bumps the counter when
//! the content digest differs from the previous sample. The sample is kept so
//! the following `read_snapshot` does not hit the clipboard a second time.

use std::borrow::Cow;

use clipkeep_core::{ClipboardWriter, ContentKind, Error, Result, Snapshot, SnapshotReader};
use image::codecs::png::PngEncoder;
use image::ImageEncoder;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

enum Sample {
    Text(String),
    Image {
        width: usize,
        height: usize,
        rgba: Vec<u8>,
    },
}

impl Sample {
    fn digest(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        match self {
            Sample::Text(s) => {
                hasher.update(b"text:");
                hasher.update(s.as_bytes());
            }
            Sample::Image {
                width,
                height,
                rgba,
            } => {
                hasher.update(format!("image:{width}x{height}:").as_bytes());
                hasher.update(rgba);
            }
        }
        hasher.finalize().to_vec()
    }

    fn into_snapshot(self) -> Result<Snapshot> {
        match self {
            Sample::Text(s) => Ok(Snapshot::text(s)),
            Sample::Image {
                width,
                height,
                rgba,
            } => Ok(Snapshot::image(encode_png(width, height, &rgba)?)),
        }
    }
}

fn clipboard_err(e: arboard::Error) -> Error {
    Error::Clipboard(e.to_string())
}

/// Opens the clipboard on first use and after a failure.
fn connect(slot: &mut Option<arboard::Clipboard>) -> Result<&mut arboard::Clipboard> {
    if slot.is_none() {
        *slot = Some(arboard::Clipboard::new().map_err(clipboard_err)?);
    }
    slot.as_mut()
        .ok_or_else(|| Error::Clipboard("clipboard handle missing".into()))
}

fn encode_png(width: usize, height: usize, rgba: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            rgba,
            width as u32,
            height as u32,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::Clipboard(format!("png encode: {e}")))?;
    Ok(buf)
}

fn decode_png(png: &[u8]) -> Result<arboard::ImageData<'static>> {
    let img = image::load_from_memory(png)
        .map_err(|e| Error::Clipboard(format!("png decode: {e}")))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    Ok(arboard::ImageData {
        width: w as usize,
        height: h as usize,
        bytes: Cow::Owned(img.into_raw()),
    })
}

#[derive(Default)]
pub struct ArboardReader {
    clipboard: Option<arboard::Clipboard>,
    generation: u64,
    last_digest: Option<Vec<u8>>,
    pending: Option<Sample>,
}

impl ArboardReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text wins over images when both are offered.
    fn sample(&mut self) -> Result<Option<Sample>> {
        let text = connect(&mut self.clipboard)?.get_text();
        match text {
            Ok(text) => return Ok(Some(Sample::Text(text))),
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => return Err(self.reset(e)),
        }
        let image = connect(&mut self.clipboard)?.get_image();
        match image {
            Ok(img) => Ok(Some(Sample::Image {
                width: img.width,
                height: img.height,
                rgba: img.bytes.into_owned(),
            })),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(self.reset(e)),
        }
    }

    /// Drops the handle so the next call reconnects.
    fn reset(&mut self, e: arboard::Error) -> Error {
        self.clipboard = None;
        clipboard_err(e)
    }
}

impl SnapshotReader for ArboardReader {
    fn current_generation(&mut self) -> u64 {
        match self.sample() {
            Ok(sample) => {
                let digest = sample.as_ref().map(Sample::digest);
                if digest != self.last_digest {
                    self.generation += 1;
                    self.last_digest = digest;
                    trace!(generation = self.generation, "clipboard content changed");
                }
                self.pending = sample;
            }
            Err(e) => debug!(error = %e, "clipboard sample failed"),
        }
        self.generation
    }

    fn read_snapshot(&mut self) -> Result<Option<Snapshot>> {
        let sample = match self.pending.take() {
            Some(sample) => Some(sample),
            None => self.sample()?,
        };
        sample.map(Sample::into_snapshot).transpose()
    }
}

/// Keeps its clipboard handle alive: on X11 and Wayland the written content
/// is served by this process for as long as the handle exists.
#[derive(Default)]
pub struct ArboardWriter {
    clipboard: Option<arboard::Clipboard>,
}

impl ArboardWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWriter for ArboardWriter {
    fn write(&mut self, snapshot: &Snapshot) -> Result<()> {
        let cb = connect(&mut self.clipboard)?;
        let result = match (snapshot.kind, snapshot.text.as_deref()) {
            (ContentKind::Text, Some(text)) => cb.set_text(text.to_string()),
            (ContentKind::Text, None) => {
                return Err(Error::Clipboard("text entry without a string".into()))
            }
            (ContentKind::Image, _) => cb.set_image(decode_png(&snapshot.bytes)?),
        };
        if let Err(e) = result {
            self.clipboard = None;
            return Err(clipboard_err(e));
        }
        debug!(kind = ?snapshot.kind, bytes = snapshot.bytes.len(), "clipboard written");
        Ok(())
    }
}
