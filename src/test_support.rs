//! Shell scripts standing in for ffmpeg.
//!
//! All of them are written once, before any test can spawn a child, so no
//! forked process holds a script open for writing when another one execs it.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::OnceLock;

use tempfile::TempDir;

pub(crate) struct Scripts {
    dir: TempDir,
}

impl Scripts {
    /// Reports progress and writes `mp4` to the output.
    pub(crate) fn progress(&self) -> String {
        self.path("progress")
    }

    /// Leaves a partial output and exits 69.
    pub(crate) fn fail(&self) -> String {
        self.path("fail")
    }

    /// Succeeds without producing anything.
    pub(crate) fn noop(&self) -> String {
        self.path("noop")
    }

    /// Complains on stderr, then dies from SIGKILL.
    pub(crate) fn killed(&self) -> String {
        self.path("killed")
    }

    pub(crate) fn version(&self) -> String {
        self.path("version")
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }
}

const SCRIPTS: [(&str, &str); 5] = [
    (
        "progress",
        r#"for last; do :; done
echo "  Duration: 00:00:02.00, start: 0.000000" >&2
echo "out_time_us=1000000"
echo "progress=continue"
echo "out_time_us=2000000"
echo "progress=end"
printf 'mp4' > "$last""#,
    ),
    (
        "fail",
        r#"for last; do :; done
printf 'half' > "$last"
echo "Conversion failed!" >&2
exit 69"#,
    ),
    ("noop", "exit 0"),
    (
        "killed",
        r#"echo "Killing myself" >&2
kill -9 $$"#,
    ),
    ("version", "echo 'ffmpeg version 6.1 Copyright'"),
];

pub(crate) fn scripts() -> &'static Scripts {
    static SCRIPTS_DIR: OnceLock<Scripts> = OnceLock::new();
    SCRIPTS_DIR.get_or_init(|| {
        let dir = tempfile::Builder::new()
            .prefix("fake-ffmpeg")
            .tempdir()
            .unwrap();
        for (name, body) in SCRIPTS {
            write_script(&dir.path().join(name), body);
        }
        Scripts { dir }
    })
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
