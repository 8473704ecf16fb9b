#![cfg(unix)]

mod support;

use std::{fs, time::Duration};

use scenebuild::{BuildConfig, BuildError, TranscodeOpts, TranscodePipeline, Workspace};
use support::{fake_tool, transcoder};

fn video(ws: &Workspace) -> std::path::PathBuf {
    let path = ws.output_dir().join("1080p/Demo.mp4");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"mp4").unwrap();
    path
}

#[test]
fn gif_replaces_extension_and_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = Workspace::adopt(tmp.path().join("ws"));
    let input = video(&ws);
    fs::create_dir_all(ws.thumbnails_dir()).unwrap();
    fs::write(ws.thumbnails_dir().join("Demo.gif"), b"stale").unwrap();
    let cfg = BuildConfig::default().with_transcoder(transcoder(tmp.path()));

    let gif = TranscodePipeline::new(&cfg)
        .export_animated_image(&input, &ws, TranscodeOpts::default())
        .unwrap();

    assert_eq!(gif, ws.thumbnails_dir().join("Demo.gif"));
    assert_eq!(fs::read(&gif).unwrap(), b"img");
    let args = fs::read_to_string(tmp.path().join("ffmpeg-args.txt")).unwrap();
    assert!(args.starts_with("-i "));
    assert!(args.contains("scale=iw*1:ih*1,fps=30"));
}

#[test]
fn slow_transcoder_times_out() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = Workspace::adopt(tmp.path().join("ws"));
    let input = video(&ws);
    let slow = fake_tool(tmp.path(), "ffmpeg", "ffmpeg version 6.1", "exec sleep 30");
    let cfg = BuildConfig::default()
        .with_transcoder(slow)
        .with_transcode_timeout(Duration::from_millis(300));

    let err = TranscodePipeline::new(&cfg)
        .export_animated_image(&input, &ws, TranscodeOpts::default())
        .unwrap_err();

    match err {
        BuildError::TranscodeFailed(msg) => assert!(msg.contains("timed out")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_source_is_checked_before_the_tool() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = Workspace::adopt(tmp.path().join("ws"));
    let cfg = BuildConfig::default().with_transcoder(transcoder(tmp.path()));

    let err = TranscodePipeline::new(&cfg)
        .export_still_image(&ws.output_dir().join("1080p/Missing.mp4"), &ws)
        .unwrap_err();

    assert!(matches!(err, BuildError::SourceArtifactMissing(_)));
    assert!(!ws.thumbnails_dir().exists());
    assert!(!tmp.path().join("ffmpeg-args.txt").exists());
}

#[test]
fn invalid_scale_is_rejected_before_running() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = Workspace::adopt(tmp.path().join("ws"));
    let input = video(&ws);
    let cfg = BuildConfig::default().with_transcoder(transcoder(tmp.path()));

    let err = TranscodePipeline::new(&cfg)
        .export_animated_image(
            &input,
            &ws,
            TranscodeOpts {
                fps: 30,
                scale: -1.0,
            },
        )
        .unwrap_err();

    assert!(matches!(err, BuildError::TranscodeFailed(_)));
    assert!(!ws.thumbnails_dir().exists());
}
