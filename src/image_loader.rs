use crate::media::{Media, StillImage};
use crate::player::FrameSequence;
use anyhow::{anyhow, bail, Context as _, Result};
use image::RgbaImage;
use log::{debug, error, info};
use memmap2::Mmap;
use rayon::prelude::*;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use threadpool::ThreadPool;

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEntry {
    pub path: PathBuf,
    pub duration_us: u64,
    pub file_size: u64,
}

/// Converts an ffconcat duration to microseconds. No unit means seconds.
pub fn parse_duration(value: &str, unit: Option<&str>) -> Result<u64> {
    let value: f64 = value
        .parse()
        .with_context(|| format!("Failed to parse duration '{}'", value))?;
    let scale = match unit {
        Some("us") => 1.0,
        Some("ms") => 1_000.0,
        Some("s") | None => 1_000_000.0,
        Some(other) => bail!("Unknown duration unit '{}'", other),
    };
    Ok((value * scale).round() as u64)
}

/// Reads the frame list of a sequence directory.
///
/// Uses `input.txt` (`file '<name>'` / `duration <n>[us|ms|s]` pairs) when
/// present, otherwise every image file in name order at `fps`.
pub fn load_image_paths(dir: &Path, fps: f32) -> Result<(Vec<SequenceEntry>, usize)> {
    info!("Loading image paths from directory: {}", dir.display());
    let absolute_dir = std::fs::canonicalize(dir)
        .with_context(|| format!("Failed to resolve directory '{}'", dir.display()))?;
    let default_duration = (1_000_000.0 / fps.max(0.001)).round() as u64;
    let ffmpeg_input = absolute_dir.join("input.txt");

    let entries = if ffmpeg_input.is_file() {
        debug!("Reading frame list from {:?}", ffmpeg_input);
        read_concat_file(&ffmpeg_input, &absolute_dir, default_duration)?
    } else {
        debug!("No input.txt in {:?}, scanning for images", absolute_dir);
        scan_directory(&absolute_dir, default_duration)?
    };

    let frame_count = entries.len();
    Ok((entries, frame_count))
}

fn read_concat_file(input: &Path, dir: &Path, default_duration: u64) -> Result<Vec<SequenceEntry>> {
    let file_re = Regex::new(r"^file\s+'?([^']*?)'?$")?;
    let duration_re = Regex::new(r"^duration\s+([0-9]*\.?[0-9]+)\s*(us|ms|s)?$")?;

    let file = File::open(input).context("Failed to open input file")?;
    let reader = BufReader::new(file);
    let mut images: Vec<SequenceEntry> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if let Some(caps) = file_re.captures(line) {
            let full_path = dir.join(&caps[1]);
            let file_size = std::fs::metadata(&full_path)
                .with_context(|| format!("Failed to get metadata for file '{}'", full_path.display()))?
                .len();
            images.push(SequenceEntry {
                path: full_path,
                duration_us: default_duration,
                file_size,
            });
        } else if let Some(caps) = duration_re.captures(line) {
            let duration = parse_duration(&caps[1], caps.get(2).map(|m| m.as_str()))?;
            match images.last_mut() {
                Some(entry) => entry.duration_us = duration,
                None => bail!("Duration '{}' appears before any file", line),
            }
        }
    }
    Ok(images)
}

fn scan_directory(dir: &Path, default_duration: u64) -> Result<Vec<SequenceEntry>> {
    let image_re = Regex::new(r"(?i)\.(png|jpe?g|bmp|tiff?|tga|gif|webp)$")?;
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && image_re.is_match(&path.to_string_lossy()) {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| -> Result<SequenceEntry> {
            let file_size = std::fs::metadata(&path)?.len();
            Ok(SequenceEntry {
                path,
                duration_us: default_duration,
                file_size,
            })
        })
        .collect()
}

/// Decodes an image file through a memory map.
pub fn decode_file(path: &Path) -> Result<RgbaImage> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    // SAFETY: the mapping is only read while decoding and dropped right after.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map '{}'", path.display()))?;
    let image = image::load_from_memory(&mmap)
        .with_context(|| format!("Failed to decode '{}'", path.display()))?;
    Ok(image.to_rgba8())
}

fn decode_sequence(dir: &Path, fps: f32) -> Result<Vec<(RgbaImage, u64)>> {
    let (entries, frame_count) = load_image_paths(dir, fps)?;
    if frame_count == 0 {
        return Err(anyhow!("No frames found in '{}'", dir.display()));
    }
    let total_bytes: u64 = entries.iter().map(|e| e.file_size).sum();
    debug!("Decoding {} frames ({} bytes)", frame_count, total_bytes);

    entries
        .par_iter()
        .map(|entry| -> Result<(RgbaImage, u64)> {
            Ok((decode_file(&entry.path)?, entry.duration_us))
        })
        .collect()
}

/// Opens comparison media: directories become frame sequences loaded on a
/// thread pool, anything else is decoded as a still image.
pub struct MediaLoader {
    pool: ThreadPool,
    fps: f32,
}

impl MediaLoader {
    pub fn new(num_load_threads: usize, fps: f32) -> Self {
        Self {
            pool: ThreadPool::with_name("media-loader".to_string(), num_load_threads.max(1)),
            fps,
        }
    }

    pub fn open(&self, path: &Path) -> Result<Arc<dyn Media>> {
        if path.is_dir() {
            let sequence = Arc::new(FrameSequence::pending(path.display().to_string()));
            let job = sequence.clone();
            let dir = path.to_path_buf();
            let fps = self.fps;
            self.pool.execute(move || match decode_sequence(&dir, fps) {
                Ok(frames) => job.finish_loading(frames),
                Err(e) => {
                    error!("Error loading sequence {}: {:#}", dir.display(), e);
                    job.fail(format!("{:#}", e));
                }
            });
            Ok(sequence)
        } else {
            let image = decode_file(path)?;
            info!(
                "Loaded still image {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            Ok(Arc::new(StillImage::new(image)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::media::{MediaKind, Readiness};
    use image::Rgba;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "split_comparator_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, width: u32, height: u32, shade: u8) {
        RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn durations_understand_units() {
        assert_eq!(parse_duration("40000", Some("us")).unwrap(), 40_000);
        assert_eq!(parse_duration("40", Some("ms")).unwrap(), 40_000);
        assert_eq!(parse_duration("0.04", None).unwrap(), 40_000);
        assert!(parse_duration("abc", None).is_err());
    }

    #[test]
    fn concat_file_lists_frames_in_order() {
        let dir = scratch_dir("concat");
        write_png(&dir.join("b.png"), 2, 2, 1);
        write_png(&dir.join("a.png"), 2, 2, 2);
        std::fs::write(
            dir.join("input.txt"),
            "ffconcat version 1.0\nfile 'b.png'\nduration 40000us\nfile 'a.png'\nduration 0.1\n",
        )
        .unwrap();

        let (entries, count) = load_image_paths(&dir, 25.0).unwrap();
        assert_eq!(count, 2);
        assert!(entries[0].path.ends_with("b.png"));
        assert_eq!(entries[0].duration_us, 40_000);
        assert!(entries[1].path.ends_with("a.png"));
        assert_eq!(entries[1].duration_us, 100_000);
        assert!(entries[0].file_size > 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn directory_without_concat_file_uses_fps() {
        let dir = scratch_dir("scan");
        write_png(&dir.join("frame_002.png"), 2, 2, 1);
        write_png(&dir.join("frame_001.png"), 2, 2, 2);
        std::fs::write(dir.join("notes.md"), "not a frame").unwrap();

        let (entries, count) = load_image_paths(&dir, 25.0).unwrap();
        assert_eq!(count, 2);
        assert!(entries[0].path.ends_with("frame_001.png"));
        assert!(entries.iter().all(|e| e.duration_us == 40_000));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn loader_opens_stills_and_sequences() {
        let dir = scratch_dir("loader");
        let still_path = dir.join("still.png");
        write_png(&still_path, 6, 4, 9);
        let seq_dir = dir.join("seq");
        std::fs::create_dir_all(&seq_dir).unwrap();
        write_png(&seq_dir.join("0.png"), 3, 5, 1);
        write_png(&seq_dir.join("1.png"), 3, 5, 2);

        let loader = MediaLoader::new(2, 25.0);
        let still = loader.open(&still_path).unwrap();
        assert_eq!(still.kind(), MediaKind::Image);
        assert_eq!(still.natural_size(), Some(Size::new(6.0, 4.0)));

        let sequence = loader.open(&seq_dir).unwrap();
        assert_eq!(sequence.kind(), MediaKind::Video);
        assert_eq!(pollster::block_on(sequence.ready()), Readiness::Ready);
        assert_eq!(sequence.natural_size(), Some(Size::new(3.0, 5.0)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn broken_sequence_reports_failure() {
        let dir = scratch_dir("broken");
        std::fs::write(dir.join("input.txt"), "file 'missing.png'\n").unwrap();

        let loader = MediaLoader::new(1, 25.0);
        let sequence = loader.open(&dir).unwrap();
        assert!(matches!(
            pollster::block_on(sequence.ready()),
            Readiness::Failed(_)
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
