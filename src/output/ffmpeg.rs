use super::VideoSink;
use anyhow::{anyhow, bail, ensure, Context, Result};
use image::RgbImage;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone)]
pub struct EncodeConfig {
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// ffmpeg executable, looked up on PATH unless it contains a separator
    pub ffmpeg: PathBuf,
}

impl EncodeConfig {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

/// Check a frame sequence can be encoded as yuv420p MP4
fn validate_frames(frames: &[RgbImage], fps: u32) -> Result<(u32, u32)> {
    ensure!(fps > 0, "fps must be non-zero");
    let Some(first) = frames.first() else {
        bail!("no frames to encode");
    };

    let (width, height) = first.dimensions();
    ensure!(width > 0 && height > 0, "frame width/height must be non-zero");
    ensure!(
        width % 2 == 0 && height % 2 == 0,
        "frame width/height must be even for yuv420p output, got {}x{}",
        width,
        height
    );

    if let Some((idx, frame)) = frames
        .iter()
        .enumerate()
        .find(|(_, f)| f.dimensions() != (width, height))
    {
        bail!(
            "frame {} is {}x{}, expected {}x{}",
            idx,
            frame.width(),
            frame.height(),
            width,
            height
        );
    }

    Ok((width, height))
}

pub fn is_ffmpeg_on_path() -> bool {
    ffmpeg_available(Path::new("ffmpeg"))
}

fn ffmpeg_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    Ok(())
}

/// `out.mp4` -> `out.mp4.partial`
fn partial_path(out_path: &Path) -> PathBuf {
    let mut name = OsString::from(out_path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Move a finished encode into place, or discard it if encoding failed
///
/// The output path is only touched once the encode succeeded.
fn finalize(partial: &Path, out_path: &Path, encoded: Result<()>) -> Result<()> {
    let result = encoded.and_then(|()| {
        std::fs::rename(partial, out_path).with_context(|| {
            format!(
                "Failed to move {} to {}",
                partial.display(),
                out_path.display()
            )
        })
    });

    if result.is_err() && partial.exists() {
        if let Err(e) = std::fs::remove_file(partial) {
            tracing::warn!("Failed to remove {}: {}", partial.display(), e);
        }
    }

    result
}

/// MP4 writer backed by the system `ffmpeg` binary
///
/// Frames are piped as raw RGB24 and encoded with libx264 into a
/// `.partial` file that replaces the output only after ffmpeg succeeds.
pub struct FfmpegOutput {
    cfg: EncodeConfig,
}

impl FfmpegOutput {
    pub fn new(cfg: EncodeConfig) -> Result<Self> {
        tracing::info!("Writing video to {}", cfg.out_path.display());

        if !cfg.overwrite && cfg.out_path.exists() {
            bail!("Output file {} already exists", cfg.out_path.display());
        }

        if !ffmpeg_available(&cfg.ffmpeg) {
            bail!(
                "{} is required for MP4 encoding, but could not be run",
                cfg.ffmpeg.display()
            );
        }

        Ok(Self { cfg })
    }

    pub fn path(&self) -> &Path {
        &self.cfg.out_path
    }

    /// Run ffmpeg writing to `target`; ffmpeg's stderr is reported on failure
    fn encode_to(&self, target: &Path, frames: &[RgbImage], fps: u32) -> Result<()> {
        let (width, height) = frames[0].dimensions();

        let mut cmd = Command::new(&self.cfg.ffmpeg);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", width, height),
            "-r",
            &fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            "mp4",
        ])
        .arg(target);

        let mut child = cmd
            .spawn()
            .context("Failed to spawn ffmpeg (is it installed and on PATH?)")?;

        // stdin is closed at the end of this block so ffmpeg sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => frames.iter().enumerate().try_for_each(|(idx, frame)| {
                stdin
                    .write_all(frame.as_raw())
                    .with_context(|| format!("Failed to write frame {} to ffmpeg", idx))
            }),
            None => Err(anyhow!("Failed to open ffmpeg stdin")),
        };

        let output = child
            .wait_with_output()
            .context("Failed to wait for ffmpeg to finish")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(match written {
                Err(e) => e.context(format!(
                    "ffmpeg exited with status {}: {}",
                    output.status,
                    stderr.trim()
                )),
                Ok(()) => anyhow!(
                    "ffmpeg exited with status {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        written
    }
}

impl VideoSink for FfmpegOutput {
    fn write_video(&mut self, frames: &[RgbImage], fps: u32) -> Result<()> {
        let _span = tracing::debug_span!("ffmpeg_encode").entered();

        let (width, height) = validate_frames(frames, fps)?;
        if !self.cfg.overwrite && self.cfg.out_path.exists() {
            bail!("Output file {} already exists", self.cfg.out_path.display());
        }
        ensure_parent_dir(&self.cfg.out_path)?;

        let partial = partial_path(&self.cfg.out_path);
        let encoded = self.encode_to(&partial, frames, fps);
        finalize(&partial, &self.cfg.out_path, encoded)?;

        tracing::info!(
            "Encoded {} frames ({}x{} @ {} fps)",
            frames.len(),
            width,
            height,
            fps
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_catches_bad_sequences() {
        let frame = RgbImage::new(4, 2);
        assert!(validate_frames(&[frame.clone()], 0).is_err());
        assert!(validate_frames(&[], 15).is_err());
        assert!(validate_frames(&[RgbImage::new(3, 2)], 15).is_err());
        assert!(validate_frames(&[frame.clone(), RgbImage::new(4, 4)], 15).is_err());
    }

    #[test]
    fn validation_accepts_consistent_even_frames() {
        let frames = vec![RgbImage::new(4, 2); 3];
        assert_eq!(validate_frames(&frames, 15).unwrap(), (4, 2));
    }

    #[test]
    fn refuses_existing_file_without_overwrite() {
        let path = std::env::temp_dir().join("cinemask_existing_output.mp4");
        std::fs::write(&path, b"x").unwrap();
        let cfg = EncodeConfig {
            overwrite: false,
            ..EncodeConfig::new(&path)
        };
        let err = FfmpegOutput::new(cfg).err().unwrap();
        assert!(err.to_string().contains("already exists"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("out/video.mp4")),
            PathBuf::from("out/video.mp4.partial")
        );
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cinemask-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finalize_failure_discards_partial_and_keeps_output() {
        let dir = scratch_dir("finalize-err");
        let out = dir.join("video.mp4");
        let partial = partial_path(&out);
        std::fs::write(&out, b"GOOD").unwrap();
        std::fs::write(&partial, b"PARTIAL").unwrap();

        let err = finalize(&partial, &out, Err(anyhow!("encoder crashed"))).unwrap_err();
        assert_eq!(err.to_string(), "encoder crashed");
        assert!(!partial.exists());
        assert_eq!(std::fs::read(&out).unwrap(), b"GOOD");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn finalize_success_moves_partial_into_place() {
        let dir = scratch_dir("finalize-ok");
        let out = dir.join("video.mp4");
        let partial = partial_path(&out);
        std::fs::write(&out, b"OLD").unwrap();
        std::fs::write(&partial, b"NEW").unwrap();

        finalize(&partial, &out, Ok(())).unwrap();
        assert!(!partial.exists());
        assert_eq!(std::fs::read(&out).unwrap(), b"NEW");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    mod with_fake_ffmpeg {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Mutex;

        // serializes script creation and spawning so no script is
        // executed while another thread still holds it open for writing
        static SPAWN_LOCK: Mutex<()> = Mutex::new(());

        /// Shell script answering `-version` and running `body` otherwise,
        /// with `$last` set to the output path argument
        fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("ffmpeg");
            let script = format!(
                "#!/bin/sh\n[ \"$1\" = \"-version\" ] && exit 0\nfor last; do :; done\n{}\n",
                body
            );
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn output(dir: &Path, ffmpeg: PathBuf) -> FfmpegOutput {
            FfmpegOutput::new(EncodeConfig {
                ffmpeg,
                ..EncodeConfig::new(dir.join("video.mp4"))
            })
            .unwrap()
        }

        #[test]
        fn failed_encode_leaves_previous_output_untouched() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let dir = scratch_dir("ffmpeg-fails");
            let ffmpeg = fake_ffmpeg(&dir, "printf PARTIAL > \"$last\"\nexit 1");
            let out = dir.join("video.mp4");
            std::fs::write(&out, b"GOOD").unwrap();

            let frames = vec![RgbImage::new(4, 2); 2];
            assert!(output(&dir, ffmpeg).write_video(&frames, 15).is_err());

            assert_eq!(std::fs::read(&out).unwrap(), b"GOOD");
            assert!(!partial_path(&out).exists());
            let _ = std::fs::remove_dir_all(dir);
        }

        #[test]
        fn early_exit_reports_ffmpeg_stderr() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let dir = scratch_dir("ffmpeg-early-exit");
            let ffmpeg = fake_ffmpeg(&dir, "echo \"Unknown encoder 'libx264'\" >&2\nexit 1");

            // larger than a pipe buffer, so writing fails once ffmpeg is gone
            let frames = vec![RgbImage::new(256, 256); 4];
            let err = output(&dir, ffmpeg).write_video(&frames, 15).unwrap_err();

            let msg = format!("{:#}", err);
            assert!(msg.contains("Unknown encoder 'libx264'"), "{}", msg);
            assert!(msg.contains("exited with status"), "{}", msg);
            assert!(!dir.join("video.mp4").exists());
            let _ = std::fs::remove_dir_all(dir);
        }

        #[test]
        fn successful_encode_replaces_output() {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let dir = scratch_dir("ffmpeg-ok");
            let ffmpeg = fake_ffmpeg(&dir, "cat > /dev/null\nprintf VIDEO > \"$last\"");
            let out = dir.join("video.mp4");
            std::fs::write(&out, b"OLD").unwrap();

            let frames = vec![RgbImage::new(4, 2); 3];
            output(&dir, ffmpeg).write_video(&frames, 15).unwrap();

            assert_eq!(std::fs::read(&out).unwrap(), b"VIDEO");
            assert!(!partial_path(&out).exists());
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
