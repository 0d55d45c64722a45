use serde::{Deserialize, Serialize};

use crate::error::{Result, SukashiError};

// Structs for parsing ffprobe JSON output (-print_format json)

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    pub format: ProbeFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeStream {
    pub index: usize,
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Stream time base as a fraction, e.g. "1/90000"
    pub time_base: Option<String>,
    /// Stream duration in time base units
    pub duration_ts: Option<i64>,
    /// Stream duration in seconds, as a decimal string
    pub duration: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub sample_rate: Option<String>,
    pub channels: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeFormat {
    pub format_name: Option<String>,
    /// Container duration in seconds, as a decimal string
    pub duration: Option<String>,
}

impl ProbeOutput {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SukashiError::Undecodable(format!("Unrecognized probe output: {}", e)))
    }
}

impl ProbeStream {
    pub fn is_video(&self) -> bool {
        self.codec_type == "video"
    }

    pub fn is_audio(&self) -> bool {
        self.codec_type == "audio"
    }
}

/// Parse an ffprobe fraction string such as "1/90000" or "30000/1001".
/// Returns None for malformed or zero-denominator values ("0/0" marks
/// unknown rates in ffprobe output).
pub fn parse_fraction(value: &str) -> Option<(i64, i64)> {
    let (num, den) = value.split_once('/')?;
    let num: i64 = num.trim().parse().ok()?;
    let den: i64 = den.trim().parse().ok()?;
    if den == 0 {
        return None;
    }
    Some((num, den))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "time_base": "1/90000",
                "duration_ts": 900000,
                "duration": "10.000000",
                "avg_frame_rate": "30/1"
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "time_base": "1/44100",
                "duration_ts": 441000,
                "duration": "10.000000",
                "sample_rate": "44100",
                "channels": 2
            }
        ],
        "format": {
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "duration": "10.023000"
        }
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let probe = ProbeOutput::parse(SAMPLE).unwrap();
        assert_eq!(probe.streams.len(), 2);
        assert!(probe.streams[0].is_video());
        assert_eq!(probe.streams[0].width, Some(1920));
        assert_eq!(probe.streams[0].duration_ts, Some(900000));
        assert!(probe.streams[1].is_audio());
        assert_eq!(probe.streams[1].channels, Some(2));
        assert_eq!(probe.format.duration.as_deref(), Some("10.023000"));
    }

    #[test]
    fn test_parse_rejects_non_probe_json() {
        assert!(ProbeOutput::parse("{\"error\": true}").is_err());
        assert!(ProbeOutput::parse("not json").is_err());
    }

    #[test]
    fn test_parse_fraction() {
        assert_eq!(parse_fraction("1/90000"), Some((1, 90000)));
        assert_eq!(parse_fraction("30000/1001"), Some((30000, 1001)));
        assert_eq!(parse_fraction("0/0"), None);
        assert_eq!(parse_fraction("30"), None);
        assert_eq!(parse_fraction("a/b"), None);
    }
}
