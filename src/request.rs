use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

use crate::compose::WatermarkSpec;
use crate::error::{Result, SukashiError};
use crate::geometry::{Position, SizeSpec};
use crate::workflow::Workflow;

/// Strictly-typed form of the incoming `addWatermark` argument bag.
/// Parsed once; any missing or mistyped field rejects the request before
/// the pipeline starts.
#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub video_path: PathBuf,
    pub watermark_path: PathBuf,
    /// Fraction of the source frame size
    pub position: Position,
    /// Absolute pixels
    pub size: SizeSpec,
}

impl WatermarkRequest {
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| SukashiError::InvalidArguments(format!("Request is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(args: &Value) -> Result<Self> {
        let request = Self {
            video_path: PathBuf::from(string_field(args, "videoPath")?),
            watermark_path: PathBuf::from(string_field(args, "watermarkPath")?),
            position: Position {
                x: nested_number(args, "position", "x")?,
                y: nested_number(args, "position", "y")?,
            },
            size: SizeSpec {
                width: nested_number(args, "size", "width")?,
                height: nested_number(args, "size", "height")?,
            },
        };
        request.check_numbers()?;
        Ok(request)
    }

    fn check_numbers(&self) -> Result<()> {
        for (name, value) in [
            ("position.x", self.position.x),
            ("position.y", self.position.y),
            ("size.width", self.size.width),
            ("size.height", self.size.height),
        ] {
            if !value.is_finite() {
                return Err(SukashiError::InvalidArguments(format!(
                    "Field '{}' must be a finite number",
                    name
                )));
            }
        }
        if self.size.width <= 0.0 || self.size.height <= 0.0 {
            return Err(SukashiError::InvalidArguments(
                "Watermark size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Check the referenced files exist before any processing is attempted
    pub fn validate_files(&self) -> Result<()> {
        for path in [&self.video_path, &self.watermark_path] {
            if !path.is_file() {
                return Err(SukashiError::FileNotFound(path.display().to_string()));
            }
        }
        Ok(())
    }

    pub fn watermark_spec(&self) -> WatermarkSpec {
        WatermarkSpec {
            image_path: self.watermark_path.clone(),
            position: self.position,
            size: self.size,
        }
    }
}

fn string_field(args: &Value, name: &str) -> Result<String> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| missing_field(name))
}

fn nested_number(args: &Value, object: &str, name: &str) -> Result<f64> {
    args.get(object)
        .and_then(|v| v.get(name))
        .and_then(Value::as_f64)
        .ok_or_else(|| missing_field(&format!("{}.{}", object, name)))
}

fn missing_field(name: &str) -> SukashiError {
    SukashiError::InvalidArguments(format!("Required field '{}' is missing or has invalid format", name))
}

/// Wire code for an error response, one of the fixed response tags
pub fn error_code(error: &SukashiError) -> &'static str {
    match error {
        SukashiError::InvalidArguments(_) => "INVALID_ARGUMENTS",
        SukashiError::FileNotFound(_) => "FILE_NOT_FOUND",
        // The response tags carry no decode code; an undecodable source
        // surfaces as the track that could not be built from it.
        SukashiError::Undecodable(_) | SukashiError::TrackCreation(_) => "TRACK_CREATION_FAILED",
        SukashiError::ImageLoad(_) => "IMAGE_LOAD_FAILED",
        SukashiError::ExportCancelled => "EXPORT_CANCELLED",
        _ => "EXPORT_FAILED",
    }
}

pub fn success_response(output_path: &std::path::Path) -> Value {
    json!({ "outputPath": output_path.to_string_lossy() })
}

pub fn error_response(error: &SukashiError) -> Value {
    json!({
        "error": {
            "code": error_code(error),
            "message": error.to_string(),
        }
    })
}

/// Thin boundary between the caller's request format and the pipeline:
/// parses and validates the argument bag, runs the workflow, and maps the
/// terminal result back to the caller's response shape.
pub struct RequestAdapter {
    workflow: Workflow,
}

impl RequestAdapter {
    pub fn new(workflow: Workflow) -> Self {
        Self { workflow }
    }

    pub async fn handle(&self, raw: &str) -> Value {
        match self.process(raw).await {
            Ok(output_path) => {
                info!("Request completed: {}", output_path.display());
                success_response(&output_path)
            }
            Err(error) => error_response(&error),
        }
    }

    async fn process(&self, raw: &str) -> Result<PathBuf> {
        let request = WatermarkRequest::from_json(raw)?;
        request.validate_files()?;
        self.workflow
            .add_watermark(&request.video_path, &request.watermark_spec(), false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_bag() -> Value {
        json!({
            "videoPath": "/media/clip.mp4",
            "watermarkPath": "/media/mark.png",
            "position": { "x": 0.8, "y": 0.8 },
            "size": { "width": 200.0, "height": 200.0 }
        })
    }

    #[test]
    fn test_parse_valid_request() {
        let request = WatermarkRequest::from_value(&valid_bag()).unwrap();
        assert_eq!(request.video_path, PathBuf::from("/media/clip.mp4"));
        assert_eq!(request.position, Position { x: 0.8, y: 0.8 });
        assert_eq!(request.size, SizeSpec { width: 200.0, height: 200.0 });
    }

    #[test]
    fn test_parse_accepts_integer_numbers() {
        let mut bag = valid_bag();
        bag["size"] = json!({ "width": 200, "height": 150 });
        let request = WatermarkRequest::from_value(&bag).unwrap();
        assert_eq!(request.size.width, 200.0);
        assert_eq!(request.size.height, 150.0);
    }

    #[test]
    fn test_missing_field_is_invalid_arguments() {
        let mut bag = valid_bag();
        bag.as_object_mut().unwrap().remove("watermarkPath");
        let err = WatermarkRequest::from_value(&bag).unwrap_err();
        assert!(matches!(err, SukashiError::InvalidArguments(_)));
        assert!(err.to_string().contains("watermarkPath"));
    }

    #[test]
    fn test_mistyped_nested_field_is_invalid_arguments() {
        let mut bag = valid_bag();
        bag["position"] = json!({ "x": "left", "y": 0.8 });
        let err = WatermarkRequest::from_value(&bag).unwrap_err();
        assert!(matches!(err, SukashiError::InvalidArguments(_)));
        assert!(err.to_string().contains("position.x"));
    }

    #[test]
    fn test_non_positive_size_is_rejected() {
        let mut bag = valid_bag();
        bag["size"] = json!({ "width": 0.0, "height": 100.0 });
        let err = WatermarkRequest::from_value(&bag).unwrap_err();
        assert!(matches!(err, SukashiError::InvalidArguments(_)));
    }

    #[test]
    fn test_malformed_json_is_invalid_arguments() {
        let err = WatermarkRequest::from_json("{not json").unwrap_err();
        assert!(matches!(err, SukashiError::InvalidArguments(_)));
    }

    #[test]
    fn test_validate_files_reports_missing_video() {
        let request = WatermarkRequest::from_value(&valid_bag()).unwrap();
        let err = request.validate_files().unwrap_err();
        assert!(matches!(err, SukashiError::FileNotFound(_)));
    }

    #[test]
    fn test_error_codes_cover_the_taxonomy() {
        assert_eq!(error_code(&SukashiError::InvalidArguments("x".into())), "INVALID_ARGUMENTS");
        assert_eq!(error_code(&SukashiError::FileNotFound("x".into())), "FILE_NOT_FOUND");
        assert_eq!(error_code(&SukashiError::Undecodable("x".into())), "TRACK_CREATION_FAILED");
        assert_eq!(error_code(&SukashiError::TrackCreation("x".into())), "TRACK_CREATION_FAILED");
        assert_eq!(error_code(&SukashiError::ImageLoad("x".into())), "IMAGE_LOAD_FAILED");
        assert_eq!(error_code(&SukashiError::ExportCancelled), "EXPORT_CANCELLED");
        assert_eq!(error_code(&SukashiError::Export("x".into())), "EXPORT_FAILED");
        assert_eq!(error_code(&SukashiError::Media("x".into())), "EXPORT_FAILED");
    }

    #[test]
    fn test_response_shapes() {
        let ok = success_response(std::path::Path::new("/tmp/out.mp4"));
        assert_eq!(ok["outputPath"], "/tmp/out.mp4");

        let err = error_response(&SukashiError::ExportCancelled);
        assert_eq!(err["error"]["code"], "EXPORT_CANCELLED");
        assert!(err["error"]["message"].as_str().is_some());
    }
}
