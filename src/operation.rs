use std::collections::HashMap;

pub const DEFAULT_BITRATE: &str = "5000k";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessParams {
    pub crop_x: i64,
    pub crop_y: i64,
    pub crop_w: i64,
    pub crop_h: i64,
    pub scale_w: i64,
    pub scale_h: i64,
    pub bitrate: String,
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self {
            crop_x: 0,
            crop_y: 0,
            crop_w: 1920,
            crop_h: 1080,
            scale_w: 1920,
            scale_h: 1080,
            bitrate: DEFAULT_BITRATE.to_string(),
        }
    }
}

impl ProcessParams {
    /// Builds parameters from the multipart text fields.
    ///
    /// Values are not range checked: whatever parses is handed to the engine.
    /// A field that is missing, has no leading integer, or parses to zero keeps
    /// its default.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let d = Self::default();
        let int = |name: &str, default: i64| {
            fields
                .get(name)
                .and_then(|v| parse_leading_int(v))
                .filter(|v| *v != 0)
                .unwrap_or(default)
        };
        Self {
            crop_x: int("cropX", d.crop_x),
            crop_y: int("cropY", d.crop_y),
            crop_w: int("cropW", d.crop_w),
            crop_h: int("cropH", d.crop_h),
            scale_w: int("scaleW", d.scale_w),
            scale_h: int("scaleH", d.scale_h),
            bitrate: fields
                .get("bitrate")
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or(d.bitrate),
        }
    }

    pub fn crop_filter(&self) -> String {
        format!(
            "crop={}:{}:{}:{}",
            self.crop_w, self.crop_h, self.crop_x, self.crop_y
        )
    }

    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.scale_w, self.scale_h)
    }
}

/// Form fields the process route reads, everything else is ignored.
pub const PROCESS_FIELDS: [&str; 7] = [
    "cropX", "cropY", "cropW", "cropH", "scaleW", "scaleH", "bitrate",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Crop, scale and re-encode to H.264 without audio.
    Process(ProcessParams),
    /// Re-encode to H.264 video with AAC audio.
    Convert,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Process(_) => "process",
            Operation::Convert => "convert",
        }
    }

    /// Prefix of the engine output file in the temp dir.
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Operation::Process(_) => "processed",
            Operation::Convert => "converted",
        }
    }

    pub fn download_name(&self) -> String {
        format!("{}.mp4", self.output_prefix())
    }

    pub fn failure_label(&self) -> &'static str {
        match self {
            Operation::Process(_) => "Failed to process video",
            Operation::Convert => "Failed to convert video",
        }
    }
}

/// Reads an optionally signed integer from the start of `s`, ignoring anything
/// after the digits ("720px" is 720).
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let value: i64 = rest[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
