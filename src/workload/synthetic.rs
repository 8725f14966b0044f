//! # Synthetic image workload.
//!
//! A dependency-free stand-in for a real image library. [`Image`] is a plain
//! byte buffer tagged with width, height and [`Format`]; [`SyntheticWorkload`]
//! implements the four [`OperationKind`]s on it. Numerical fidelity is not a
//! goal: the operations exist to allocate, mutate and free memory at a
//! realistic rate and to fail now and then.
//!
//! ## Failure sources
//! - `blur` rejects [`Format::S8`] and [`Format::S32`];
//! - `pad` rejects outputs wider or taller than [`MAX_SIDE`];
//! - `create` rejects zero or oversized dimensions.
//!
//! ## Reclamation accounting
//! Every image shares a [`WorkloadStats`] with its workload. `dispose()` counts
//! as *disposed*; dropping an image without disposing it counts as *reclaimed*.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use rand::rngs::StdRng;

use crate::error::OperationError;
use crate::workload::{Artifact, Format, Invocation, OperationKind, Workload};

/// Largest width or height an image may reach.
pub const MAX_SIDE: u32 = 8192;

/// Largest border added per side by `pad` (exclusive).
const PAD_LIMIT: u32 = 5;

/// Shared counters for artifact lifecycle events.
#[derive(Debug, Default)]
pub struct WorkloadStats {
    created: AtomicU64,
    duplicated: AtomicU64,
    disposed: AtomicU64,
    reclaimed: AtomicU64,
    failed: AtomicU64,
}

impl WorkloadStats {
    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            duplicated: self.duplicated.load(Ordering::Relaxed),
            disposed: self.disposed.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Copy of [`WorkloadStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub created: u64,
    pub duplicated: u64,
    pub disposed: u64,
    pub reclaimed: u64,
    pub failed: u64,
}

impl StatsSnapshot {
    /// Images currently alive somewhere (pool, worker stacks, leaked threads).
    pub fn live(&self) -> u64 {
        (self.created + self.duplicated).saturating_sub(self.disposed + self.reclaimed)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} duplicated={} disposed={} reclaimed={} failed={} live={}",
            self.created,
            self.duplicated,
            self.disposed,
            self.reclaimed,
            self.failed,
            self.live()
        )
    }
}

/// Byte-buffer image.
pub struct Image {
    width: u32,
    height: u32,
    format: Format,
    data: Vec<u8>,
    stats: Arc<WorkloadStats>,
    disposed: bool,
}

impl Image {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Raw element bytes, row-major, little-endian.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reads element `(x, y)` as `f64`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the image.
    pub fn element(&self, x: u32, y: u32) -> f64 {
        assert!(x < self.width && y < self.height, "element out of bounds");
        let size = self.format.size_bytes();
        let at = (y as usize * self.width as usize + x as usize) * size;
        read_element(self.format, &self.data[at..at + size])
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.size_bytes()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish()
    }
}

impl Artifact for Image {
    fn duplicate(&self) -> Self {
        WorkloadStats::bump(&self.stats.duplicated);
        Image {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.clone(),
            stats: Arc::clone(&self.stats),
            disposed: false,
        }
    }

    fn dispose(mut self) {
        self.disposed = true;
        WorkloadStats::bump(&self.stats.disposed);
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if !self.disposed {
            WorkloadStats::bump(&self.stats.reclaimed);
        }
    }
}

/// Workload implementing blur, pad, convert and region-mask on [`Image`]s.
#[derive(Debug, Default)]
pub struct SyntheticWorkload {
    stats: Arc<WorkloadStats>,
}

impl SyntheticWorkload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared lifecycle counters of every image this workload produced.
    pub fn stats(&self) -> &Arc<WorkloadStats> {
        &self.stats
    }

    fn image(&self, width: u32, height: u32, format: Format, data: Vec<u8>) -> Image {
        WorkloadStats::bump(&self.stats.created);
        Image {
            width,
            height,
            format,
            data,
            stats: Arc::clone(&self.stats),
            disposed: false,
        }
    }

    fn filled(&self, width: u32, height: u32, format: Format, value: f64) -> Image {
        let size = format.size_bytes();
        let mut elem = [0u8; 8];
        write_element(format, value, &mut elem[..size]);
        let data = elem[..size].repeat(width as usize * height as usize);
        self.image(width, height, format, data)
    }

    fn blur(&self, input: Image, inplace: bool, rng: &mut StdRng) -> Result<Image, OperationError> {
        if matches!(input.format, Format::S8 | Format::S32) {
            return Err(OperationError::Unsupported {
                op: OperationKind::Blur,
                format: input.format,
            });
        }
        let sigma = 1.0 + rng.random::<f64>() * 2.0;
        let radius = sigma.round() as usize;

        if inplace {
            let mut image = input;
            box_blur(&mut image, radius);
            return Ok(image);
        }
        let mut output = self.image(input.width, input.height, input.format, input.data.clone());
        box_blur(&mut output, radius);
        input.dispose();
        Ok(output)
    }

    fn pad(&self, input: Image, rng: &mut StdRng) -> Result<Image, OperationError> {
        let top = rng.random_range(0..PAD_LIMIT);
        let bottom = rng.random_range(0..PAD_LIMIT);
        let left = rng.random_range(0..PAD_LIMIT);
        let right = rng.random_range(0..PAD_LIMIT);
        let width = input.width + left + right;
        let height = input.height + top + bottom;
        if width > MAX_SIDE || height > MAX_SIDE {
            return Err(OperationError::OutOfRange {
                op: OperationKind::Pad,
                detail: format!("padded size {width}x{height} exceeds {MAX_SIDE}"),
            });
        }

        let mut output = self.filled(width, height, input.format, rng.random::<f64>());
        let src_row = input.row_bytes();
        let dst_row = output.row_bytes();
        let offset = left as usize * input.format.size_bytes();
        for (y, line) in input.data.chunks_exact(src_row).enumerate() {
            let at = (y + top as usize) * dst_row + offset;
            output.data[at..at + src_row].copy_from_slice(line);
        }
        input.dispose();
        Ok(output)
    }

    fn convert(&self, input: Image, rng: &mut StdRng) -> Image {
        // 1 and 0 are the common scale/offset, so they get half the mass.
        let scale = if rng.random_bool(0.5) { rng.random::<f64>() } else { 1.0 };
        let offset = if rng.random_bool(0.5) { rng.random::<f64>() } else { 0.0 };
        let target = Format::ALL[rng.random_range(0..Format::ALL.len())];

        let src = input.format.size_bytes();
        let dst = target.size_bytes();
        let mut data = vec![0u8; input.data.len() / src * dst];
        for (from, to) in input.data.chunks_exact(src).zip(data.chunks_exact_mut(dst)) {
            write_element(target, read_element(input.format, from) * scale + offset, to);
        }
        let output = self.image(input.width, input.height, target, data);
        input.dispose();
        output
    }

    fn region_mask(&self, input: Image, rng: &mut StdRng) -> Image {
        let (w, h) = (input.width, input.height);
        let x = if w > 1 { rng.random_range(0..w - 1) } else { 0 };
        let y = if h > 1 { rng.random_range(0..h - 1) } else { 0 };
        let rw = if w - x > 1 { rng.random_range(1..w - x) } else { 1 };
        let rh = if h - y > 1 { rng.random_range(1..h - y) } else { 1 };

        let mut output = self.image(w, h, input.format, vec![0u8; input.data.len()]);
        let size = input.format.size_bytes();
        let row = input.row_bytes();
        let span = rw as usize * size;
        for line in y as usize..(y + rh) as usize {
            let at = line * row + x as usize * size;
            output.data[at..at + span].copy_from_slice(&input.data[at..at + span]);
        }
        input.dispose();
        output
    }
}

impl Workload for SyntheticWorkload {
    type Artifact = Image;

    fn create(&self, width: u32, height: u32, format: Format) -> Result<Image, OperationError> {
        if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
            return Err(OperationError::Create {
                detail: format!("invalid size {width}x{height}"),
            });
        }
        Ok(self.filled(width, height, format, 1.0))
    }

    fn apply(
        &self,
        call: Invocation,
        input: Image,
        rng: &mut StdRng,
    ) -> Result<Option<Image>, OperationError> {
        let res = match call.op {
            OperationKind::Blur => self.blur(input, call.inplace, rng),
            OperationKind::Pad => self.pad(input, rng),
            OperationKind::Convert => Ok(self.convert(input, rng)),
            OperationKind::RegionMask => Ok(self.region_mask(input, rng)),
        };
        if res.is_err() {
            WorkloadStats::bump(&self.stats.failed);
        }
        res.map(Some)
    }
}

/// Horizontal box blur over each row.
fn box_blur(image: &mut Image, radius: usize) {
    let format = image.format;
    let size = format.size_bytes();
    let width = image.width as usize;
    let row_bytes = image.row_bytes();
    let mut row = vec![0.0f64; width];

    for line in image.data.chunks_exact_mut(row_bytes) {
        for (v, elem) in row.iter_mut().zip(line.chunks_exact(size)) {
            *v = read_element(format, elem);
        }
        for (x, elem) in line.chunks_exact_mut(size).enumerate() {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let avg = row[lo..=hi].iter().sum::<f64>() / (hi - lo + 1) as f64;
            write_element(format, avg, elem);
        }
    }
}

fn read_element(format: Format, b: &[u8]) -> f64 {
    match format {
        Format::U8 => f64::from(b[0]),
        Format::S8 => f64::from(b[0] as i8),
        Format::U16 => f64::from(u16::from_le_bytes([b[0], b[1]])),
        Format::S16 => f64::from(i16::from_le_bytes([b[0], b[1]])),
        Format::S32 => f64::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        Format::F32 => f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        Format::F64 => f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
    }
}

/// Writes `v` into `out`, saturating integer formats.
fn write_element(format: Format, v: f64, out: &mut [u8]) {
    match format {
        Format::U8 => out[0] = v.round() as u8,
        Format::S8 => out[0] = (v.round() as i8) as u8,
        Format::U16 => out.copy_from_slice(&(v.round() as u16).to_le_bytes()),
        Format::S16 => out.copy_from_slice(&(v.round() as i16).to_le_bytes()),
        Format::S32 => out.copy_from_slice(&(v.round() as i32).to_le_bytes()),
        Format::F32 => out.copy_from_slice(&(v as f32).to_le_bytes()),
        Format::F64 => out.copy_from_slice(&v.to_le_bytes()),
    }
}
