use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::operation::Operation;

/// H.264 settings shared by both routes.
const H264_OUTPUT: [&str; 10] = [
    "-preset",
    "fast",
    "-profile:v",
    "main",
    "-level",
    "4.0",
    "-pix_fmt",
    "yuv420p",
    "-movflags",
    "+faststart",
];

const CONVERT_VIDEO_BITRATE: &str = "5000k";
const CONVERT_AUDIO_BITRATE: &str = "128k";

/// Argument vector for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
}

impl Invocation {
    pub fn for_operation(op: &Operation, input: &Path, output: &Path) -> Self {
        let mut inv = Self { args: Vec::new() };
        inv.push_all(["-hide_banner", "-nostdin", "-y", "-i"]);
        inv.push(input);

        match op {
            Operation::Process(params) => {
                inv.push("-vf");
                inv.push(format!("{},{}", params.crop_filter(), params.scale_filter()));
                inv.push_all(["-c:v", "libx264", "-b:v"]);
                inv.push(&params.bitrate);
                inv.push_all(H264_OUTPUT);
                inv.push("-an");
            }
            Operation::Convert => {
                inv.push_all(["-c:v", "libx264", "-b:v", CONVERT_VIDEO_BITRATE]);
                inv.push_all(H264_OUTPUT);
                inv.push_all(["-c:a", "aac", "-b:a", CONVERT_AUDIO_BITRATE]);
            }
        }

        // key=value progress on stdout, stderr stays free for diagnostics
        inv.push_all(["-progress", "pipe:1", "-nostats"]);
        inv.push(output);
        inv
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Printable form for logs.
    pub fn command_line(&self, program: &str) -> String {
        let mut res = program.to_string();
        for a in &self.args {
            res.push(' ');
            res.push_str(&a.to_string_lossy());
        }
        res
    }

    fn push(&mut self, arg: impl AsRef<OsStr>) {
        self.args.push(arg.as_ref().to_owned());
    }

    fn push_all<const N: usize>(&mut self, args: [&str; N]) {
        self.args.extend(args.iter().map(OsString::from));
    }
}
