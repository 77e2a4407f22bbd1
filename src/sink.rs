// ------------------------------------------------------------
// Video sinks
//
// Frames arrive strictly in time order and must all share the
// resolution the sink was opened with.
//   FfmpegSink       : raw RGB piped into an ffmpeg child process
//   PngSequenceSink  : frames/frame_000000.png ... (optionally encoded afterwards)
// ------------------------------------------------------------

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use clap::ValueEnum;
use image::RgbImage;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Ordered consumer of emitted frames.
pub trait FrameSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()>;

    /// Finalize the output. Called once after the last frame.
    fn release(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VideoCodec {
    /// MPEG-4 part 2 (fourcc `mp4v`)
    Mpeg4,
    /// H.264 via libx264 (fourcc `avc1`)
    H264,
}

impl VideoCodec {
    pub fn fourcc(self) -> &'static str {
        match self {
            VideoCodec::Mpeg4 => "mp4v",
            VideoCodec::H264 => "avc1",
        }
    }

    fn ffmpeg_encoder(self) -> &'static str {
        match self {
            VideoCodec::Mpeg4 => "mpeg4",
            VideoCodec::H264 => "libx264",
        }
    }
}

fn check_dimensions(frame: &RgbImage, expected: (u32, u32)) -> Result<()> {
    if frame.dimensions() != expected {
        let (w, h) = frame.dimensions();
        return Err(Error::sink(format!(
            "frame is {w}x{h}, sink expects {}x{}",
            expected.0, expected.1
        )));
    }
    Ok(())
}

pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

// ------------------------------------------------------------
// ffmpeg pipe
// ------------------------------------------------------------
pub struct FfmpegSink {
    path: PathBuf,
    size: (u32, u32),
    child: Child,
    stdin: Option<ChildStdin>,
    frames: usize,
}

impl FfmpegSink {
    pub fn open(path: &Path, codec: VideoCodec, frame_rate: u32, size: (u32, u32)) -> Result<Self> {
        let size_arg = format!("{}x{}", size.0, size.1);
        let rate_arg = frame_rate.to_string();

        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-y",
            "-hide_banner",
            "-loglevel", "error",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "-s", &size_arg,
            "-r", &rate_arg,
            "-i", "pipe:0",
            "-an",
            "-c:v", codec.ffmpeg_encoder(),
            "-pix_fmt", "yuv420p",
        ])
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::sink(format!("cannot start ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::sink("ffmpeg stdin unavailable"))?;

        info!(
            path = %path.display(),
            codec = codec.fourcc(),
            frame_rate,
            width = size.0,
            height = size.1,
            "video sink opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            size,
            child,
            stdin: Some(stdin),
            frames: 0,
        })
    }
}

impl FrameSink for FfmpegSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        check_dimensions(frame, self.size)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::sink("video sink already released"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| Error::sink(format!("ffmpeg write failed at frame {}: {e}", self.frames)))?;
        self.frames += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        // Closing stdin signals end of stream.
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| Error::sink(format!("waiting for ffmpeg failed: {e}")))?;
        if !status.success() {
            return Err(Error::sink(format!("ffmpeg exited with {status}")));
        }
        info!(path = %self.path.display(), frames = self.frames, "video written");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

// ------------------------------------------------------------
// PNG frame sequence
// ------------------------------------------------------------
pub struct PngSequenceSink {
    frames_dir: PathBuf,
    size: (u32, u32),
    frames: usize,
}

impl PngSequenceSink {
    /// Creates `frames_dir` and clears old frame files from it.
    pub fn create(frames_dir: &Path, size: (u32, u32)) -> Result<Self> {
        fs::create_dir_all(frames_dir).map_err(|e| {
            Error::sink(format!("cannot create {}: {e}", frames_dir.display()))
        })?;

        let entries = fs::read_dir(frames_dir)
            .map_err(|e| Error::sink(format!("cannot read {}: {e}", frames_dir.display())))?;
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_file() && p.extension().is_some_and(|ext| ext == "png") {
                let _ = fs::remove_file(p);
            }
        }

        Ok(Self {
            frames_dir: frames_dir.to_path_buf(),
            size,
            frames: 0,
        })
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.frames_dir.join(format!("frame_{index:06}.png"))
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }
}

impl FrameSink for PngSequenceSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        check_dimensions(frame, self.size)?;
        let path = self.frame_path(self.frames);
        frame
            .save(&path)
            .map_err(|e| Error::sink(format!("failed to save {}: {e}", path.display())))?;
        self.frames += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        info!(dir = %self.frames_dir.display(), frames = self.frames, "frame sequence written");
        Ok(())
    }
}

/// Encode a `frame_%06d.png` sequence into a video. Returns `Ok(false)` when ffmpeg
/// is not on `PATH`.
pub fn encode_png_sequence(
    frames_dir: &Path,
    codec: VideoCodec,
    frame_rate: u32,
    out: &Path,
) -> Result<bool> {
    if !ffmpeg_available() {
        warn!("ffmpeg not found on PATH; video will not be created");
        return Ok(false);
    }

    let input_pattern = frames_dir.join("frame_%06d.png");
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-framerate")
        .arg(frame_rate.to_string())
        .arg("-i")
        .arg(&input_pattern)
        .arg("-c:v")
        .arg(codec.ffmpeg_encoder())
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg(out)
        .status()
        .map_err(|e| Error::sink(format!("failed to run ffmpeg: {e}")))?;

    if !status.success() {
        return Err(Error::sink(format!("ffmpeg encoding failed with {status}")));
    }
    info!(path = %out.display(), "video encoded from frame sequence");
    Ok(true)
}
