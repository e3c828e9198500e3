//! Local file frame source.
//!
//! This module provides `FileSource` for reading frames from local video files.
//! The file source is responsible for:
//! - Validating the path (local, existing, known container extension)
//! - Decoding frames in order
//! - Proving the stream is readable before a run starts
//! - Rewinding to frame 0 on request
//!
//! `stub://` paths select a deterministic synthetic video instead of a decoder,
//! e.g. `stub://lot_a?frames=300&fps=30&width=640&height=480`.

use std::path::Path;

use anyhow::{anyhow, bail, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::{FrameSource, VideoInfo};
use crate::frame::Frame;

/// Container extensions accepted for local files.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "wmv", "flv", "mkv"];

const STUB_SCHEME: &str = "stub://";
const DEFAULT_STUB_FRAMES: u64 = 300;
const DEFAULT_STUB_FPS: f64 = 30.0;
const DEFAULT_STUB_WIDTH: u32 = 640;
const DEFAULT_STUB_HEIGHT: u32 = 480;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "/data/lot_a/2024-05-01.mp4") or a `stub://` URL.
    pub path: String,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Validate the path, open the stream and check that a first frame decodes.
    pub fn open(config: FileConfig) -> Result<Self> {
        validate_video_path(&config.path)?;
        let backend = if config.path.starts_with(STUB_SCHEME) {
            FileBackend::Synthetic(SyntheticFileSource::parse(&config.path)?)
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::new(config.clone())?)
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                bail!("file decoding requires the ingest-file-ffmpeg feature")
            }
        };

        let mut source = Self { backend };
        if source.next_frame()?.is_none() {
            bail!("video stream has no readable frames: {}", config.path);
        }
        source.rewind()?;
        log::info!("FileSource: opened {}", config.path);
        Ok(source)
    }
}

impl FrameSource for FileSource {
    fn info(&self) -> VideoInfo {
        match &self.backend {
            FileBackend::Synthetic(source) => source.info(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.info(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.rewind(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.rewind(),
        }
    }

    fn frames_read(&self) -> u64 {
        match &self.backend {
            FileBackend::Synthetic(source) => source.frames_read,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frames_read(),
        }
    }
}

/// Reject paths that cannot name a local video file.
///
/// `stub://` URLs are accepted without touching the filesystem.
pub fn validate_video_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("video path is empty");
    }
    if path.starts_with(STUB_SCHEME) {
        return Ok(());
    }
    if path.contains("://") {
        bail!("file ingestion only supports local paths (no URL schemes)");
    }
    let p = Path::new(path);
    if !p.is_file() {
        bail!("video file does not exist: {}", path);
    }
    let ext = p
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "unsupported video extension '{}' (expected one of {})",
            ext,
            VIDEO_EXTENSIONS.join(", ")
        );
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

/// Gray asphalt with painted bay lines; a dark block appears in the left bay
/// for 50 frames out of every 100.
struct SyntheticFileSource {
    info: VideoInfo,
    cursor: u64,
    frames_read: u64,
}

impl SyntheticFileSource {
    fn parse(url: &str) -> Result<Self> {
        let rest = &url[STUB_SCHEME.len()..];
        let query = rest.split_once('?').map(|(_, q)| q).unwrap_or("");
        let mut info = VideoInfo {
            width: DEFAULT_STUB_WIDTH,
            height: DEFAULT_STUB_HEIGHT,
            fps: DEFAULT_STUB_FPS,
            total_frames: DEFAULT_STUB_FRAMES,
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}'", pair))?;
            let bad = || anyhow!("invalid value '{}' for stub parameter '{}'", value, key);
            match key {
                "frames" => info.total_frames = value.parse().map_err(|_| bad())?,
                "fps" => info.fps = value.parse().map_err(|_| bad())?,
                "width" => info.width = value.parse().map_err(|_| bad())?,
                "height" => info.height = value.parse().map_err(|_| bad())?,
                other => bail!("unknown stub parameter '{}'", other),
            }
        }
        if info.width == 0 || info.height == 0 {
            bail!("stub video dimensions must be non-zero");
        }
        Ok(Self {
            info,
            cursor: 0,
            frames_read: 0,
        })
    }

    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.cursor >= self.info.total_frames {
            return Ok(None);
        }
        let frame = self.render(self.cursor);
        self.cursor += 1;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn render(&self, index: u64) -> Frame {
        let (width, height) = (self.info.width, self.info.height);
        let mut frame = Frame::filled(width, height, [128, 128, 128], index);
        let image = frame.image_mut();

        let bay = (width / 4).max(1);
        for x in (0..width).step_by(bay as usize) {
            for y in 0..height {
                image.put_pixel(x, y, image::Rgb([235, 235, 235]));
            }
        }

        let scene_state = index / 50;
        if scene_state % 2 == 1 {
            let x0 = (bay / 8).min(width - 1);
            let y0 = height / 8;
            let x1 = (bay - bay / 8).min(width);
            let y1 = height - height / 8;
            for y in y0..y1 {
                for x in x0..x1 {
                    image.put_pixel(x, y, image::Rgb([25, 25, 30]));
                }
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_parameters_are_parsed() {
        let config = FileConfig::new("stub://lot?frames=12&fps=6&width=64&height=48");
        let mut source = FileSource::open(config).expect("stub source");
        let info = source.info();
        assert_eq!(info.total_frames, 12);
        assert_eq!(info.fps, 6.0);
        assert_eq!(info.duration_secs(), 2.0);
        // open() probes one frame and rewinds
        assert_eq!(source.next_frame().unwrap().unwrap().index, 0);
        let mut count = 1;
        while source.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 12);
    }

    #[test]
    fn empty_stub_stream_is_rejected() {
        assert!(FileSource::open(FileConfig::new("stub://lot?frames=0")).is_err());
    }

    #[test]
    fn bad_stub_parameters_are_rejected() {
        assert!(FileSource::open(FileConfig::new("stub://lot?frames=many")).is_err());
        assert!(FileSource::open(FileConfig::new("stub://lot?color=red")).is_err());
        assert!(FileSource::open(FileConfig::new("stub://lot?width=0")).is_err());
    }

    #[test]
    fn rejects_urls_missing_files_and_extensions() {
        assert!(validate_video_path("").is_err());
        assert!(validate_video_path("rtsp://camera/stream").is_err());
        assert!(validate_video_path("/definitely/not/here.mp4").is_err());

        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("clip.txt");
        std::fs::write(&txt, b"not a video").unwrap();
        assert!(validate_video_path(txt.to_str().unwrap()).is_err());

        let mp4 = dir.path().join("clip.MP4");
        std::fs::write(&mp4, b"").unwrap();
        assert!(validate_video_path(mp4.to_str().unwrap()).is_ok());
    }

    #[test]
    fn synthetic_scene_alternates() {
        let source = SyntheticFileSource::parse("stub://lot?width=64&height=48").unwrap();
        let empty = source.render(10);
        let parked = source.render(60);
        let px = |f: &Frame| f.image().get_pixel(8, 24).0;
        assert_eq!(px(&empty), [128, 128, 128]);
        assert_eq!(px(&parked), [25, 25, 30]);
    }
}
