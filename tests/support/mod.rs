#![allow(dead_code)]

use std::path::{Path, PathBuf};

use scenebuild::ToolCommand;

/// Answers `--version`/`-version` like a real tool, then runs `body`.
pub fn fake_tool(dir: &Path, name: &str, version: &str, body: &str) -> ToolCommand {
    let script = dir.join(format!("{name}.sh"));
    let text = format!(
        "case \"$1\" in --version|-version) echo \"{version}\"; exit 0;; esac\n{body}\n"
    );
    std::fs::write(&script, text).unwrap();
    ToolCommand::new("sh").with_arg(script)
}

/// Engine that writes `<out>/<label>/<scene>.mp4` and reports on stdout.
/// Arguments arrive as: flag, output flag, output dir, scene file, scene.
pub fn rendering_engine(dir: &Path, label: &str) -> ToolCommand {
    fake_tool(
        dir,
        "engine",
        "FakeEngine v1.0",
        &format!(
            "mkdir -p \"$3/{label}\" && printf 'mp4' > \"$3/{label}/$5.mp4\"\necho \"Rendered $5 with $1\""
        ),
    )
}

/// Transcoder that writes a placeholder to its last argument.
pub fn transcoder(dir: &Path) -> ToolCommand {
    fake_tool(
        dir,
        "ffmpeg",
        "ffmpeg version 6.1",
        "echo \"$@\" > \"$(dirname \"$0\")/ffmpeg-args.txt\"\nfor last; do :; done\nprintf 'img' > \"$last\"",
    )
}

pub fn write_scene(dir: &Path) -> PathBuf {
    let path = dir.join("demo_scene.py");
    std::fs::write(&path, "class Demo(Scene):\n    def construct(self):\n        pass\n").unwrap();
    path
}
