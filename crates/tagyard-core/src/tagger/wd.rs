//! WD-series tagger backend (SmilingWolf ONNX exports).
//!
//! These models expect:
//! - Input layout: NHWC \[1, size, size, 3\]
//! - Channel order: BGR
//! - Pixel range: raw 0..255 as f32, no normalization
//! - Square input, shorter side padded with white
//!
//! The label list ships next to the model as `selected_tags.csv` with one
//! row per output index; categories are 9 (rating), 4 (character) and
//! 0 (general).

use std::path::Path;
use std::sync::Mutex;

use image::{imageops, DynamicImage, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::ModelError;
use crate::types::{RawPrediction, ScoreMap};

/// Model weights file name inside the model directory.
pub const MODEL_FILE: &str = "model.onnx";

/// Label list file name inside the model directory.
pub const LABEL_FILE: &str = "selected_tags.csv";

const CATEGORY_GENERAL: u32 = 0;
const CATEGORY_CHARACTER: u32 = 4;
const CATEGORY_RATING: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelCategory {
    Rating,
    General,
    Character,
}

#[derive(Debug)]
struct Label {
    name: String,
    category: LabelCategory,
}

/// A loaded WD tagging model.
///
/// `Session::run` needs `&mut self`, hence the `Mutex`.
#[derive(Debug)]
pub struct WdTagger {
    identity: String,
    session: Mutex<Session>,
    input_name: String,
    input_size: u32,
    labels: Vec<Label>,
}

impl WdTagger {
    /// Load a model from its directory (`model.onnx` + `selected_tags.csv`).
    pub fn load(identity: &str, dir: &Path) -> Result<Self, ModelError> {
        let load_err = |message: String| ModelError::Load {
            identity: identity.to_string(),
            message,
        };

        let model_path = dir.join(MODEL_FILE);
        let session = Session::builder()
            .map_err(|e| load_err(format!("Failed to create ONNX session builder: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| load_err(format!("Failed to load {model_path:?}: {e}")))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| load_err("Model has no inputs".to_string()))?;
        let input_name = input.name().to_string();

        // NHWC: dims are [batch, height, width, channels].
        let input_size = input
            .dtype()
            .tensor_shape()
            .and_then(|shape| shape.get(1).copied())
            .filter(|&d| d > 0)
            .ok_or_else(|| load_err("Could not read input height from model metadata".to_string()))?
            as u32;

        let label_path = dir.join(LABEL_FILE);
        let label_text = std::fs::read_to_string(&label_path)
            .map_err(|e| load_err(format!("Failed to read {label_path:?}: {e}")))?;
        let labels = parse_labels(&label_text).map_err(load_err)?;

        tracing::debug!(
            "Loaded {identity} (input {input_name:?}, size {input_size}, {} labels)",
            labels.len()
        );

        Ok(Self {
            identity: identity.to_string(),
            session: Mutex::new(session),
            input_name,
            input_size,
            labels,
        })
    }
}

impl super::Tagger for WdTagger {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn predict(&self, image: &DynamicImage) -> Result<RawPrediction, ModelError> {
        let predict_err = |message: String| ModelError::Predict {
            identity: self.identity.clone(),
            message,
        };

        let tensor = preprocess(image, self.input_size);
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| predict_err(format!("Failed to create input tensor: {e}")))?;
        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| predict_err(format!("Session lock poisoned: {e}")))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| predict_err(format!("ONNX inference failed: {e}")))?;

        let (_, scores) = outputs
            .iter()
            .next()
            .ok_or_else(|| predict_err("Model produced no outputs".to_string()))?;
        let (_, scores) = scores
            .try_extract_tensor::<f32>()
            .map_err(|e| predict_err(format!("Failed to extract output tensor: {e}")))?;

        if scores.len() < self.labels.len() {
            return Err(predict_err(format!(
                "Model produced {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }

        Ok(collect_scores(&self.labels, scores))
    }
}

/// Pair output scores with labels by index and split them per category.
fn collect_scores(labels: &[Label], scores: &[f32]) -> RawPrediction {
    let mut rating = ScoreMap::new();
    let mut general = ScoreMap::new();
    let mut character = ScoreMap::new();

    for (label, &score) in labels.iter().zip(scores) {
        let bucket = match label.category {
            LabelCategory::Rating => &mut rating,
            LabelCategory::General => &mut general,
            LabelCategory::Character => &mut character,
        };
        bucket.insert(label.name.clone(), score);
    }

    RawPrediction {
        rating,
        general,
        character,
    }
}

/// Parse `selected_tags.csv`: header row, then `tag_id,name,category,count`.
fn parse_labels(text: &str) -> Result<Vec<Label>, String> {
    let mut labels = Vec::new();

    for (line_no, line) in text.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let _tag_id = fields.next();
        let name = fields
            .next()
            .ok_or_else(|| format!("Label file line {} has no name field", line_no + 1))?;
        let category: u32 = fields
            .next()
            .and_then(|c| c.trim().parse().ok())
            .ok_or_else(|| format!("Label file line {} has a bad category", line_no + 1))?;

        let category = match category {
            CATEGORY_RATING => LabelCategory::Rating,
            CATEGORY_CHARACTER => LabelCategory::Character,
            CATEGORY_GENERAL => LabelCategory::General,
            other => {
                tracing::debug!("Skipping label {name:?} with unknown category {other}");
                continue;
            }
        };

        labels.push(Label {
            name: name.trim().to_string(),
            category,
        });
    }

    if labels.is_empty() {
        return Err("Label file contains no usable labels".to_string());
    }
    Ok(labels)
}

/// Pad to a white square, resize, and lay out as NHWC BGR f32.
fn preprocess(image: &DynamicImage, size: u32) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (w, h) = rgb.dimensions();
    let side = w.max(h).max(1);

    let mut canvas = RgbImage::from_pixel(side, side, image::Rgb([255, 255, 255]));
    let x_off = (side - w) / 2;
    let y_off = (side - h) / 2;
    imageops::overlay(&mut canvas, &rgb, x_off as i64, y_off as i64);

    let resized = imageops::resize(&canvas, size, size, imageops::FilterType::Lanczos3);

    let dim = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, dim, dim, 3));
    for (i, pixel) in resized.as_raw().chunks_exact(3).enumerate() {
        let y = i / dim;
        let x = i % dim;
        // BGR order.
        tensor[[0, y, x, 0]] = pixel[2] as f32;
        tensor[[0, y, x, 1]] = pixel[1] as f32;
        tensor[[0, y, x, 2]] = pixel[0] as f32;
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
tag_id,name,category,count
9999999,general,9,100
9999998,sensitive,9,100
1,1girl,0,500
2,solo,0,400
3,hatsune_miku,4,300
";

    #[test]
    fn parse_labels_splits_categories() {
        let labels = parse_labels(SAMPLE_CSV).unwrap();
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[0].category, LabelCategory::Rating);
        assert_eq!(labels[2].category, LabelCategory::General);
        assert_eq!(labels[4].category, LabelCategory::Character);
        assert_eq!(labels[4].name, "hatsune_miku");
    }

    #[test]
    fn parse_labels_rejects_empty_input() {
        assert!(parse_labels("tag_id,name,category,count\n").is_err());
    }

    #[test]
    fn collect_scores_buckets_by_category() {
        let labels = parse_labels(SAMPLE_CSV).unwrap();
        let scores = [0.9, 0.05, 0.98, 0.95, 0.7];
        let p = collect_scores(&labels, &scores);

        assert_eq!(p.rating.get("general"), Some(&0.9));
        assert_eq!(p.general.get("1girl"), Some(&0.98));
        assert_eq!(p.character.get("hatsune_miku"), Some(&0.7));
        assert_eq!(p.rating.len(), 2);
        assert_eq!(p.general.len(), 2);
        assert_eq!(p.character.len(), 1);
    }

    #[test]
    fn preprocess_produces_nhwc_tensor() {
        let img = DynamicImage::new_rgb8(640, 480);
        let tensor = preprocess(&img, 448);
        assert_eq!(tensor.shape(), &[1, 448, 448, 3]);
    }

    #[test]
    fn preprocess_pads_with_white() {
        // A tall black strip gets white padding on the sides.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            10,
            100,
            image::Rgb([0, 0, 0]),
        ));
        let tensor = preprocess(&img, 64);
        // Top-left corner is padding.
        assert_eq!(tensor[[0, 0, 0, 0]], 255.0);
        // Center is image content.
        assert_eq!(tensor[[0, 32, 32, 0]], 0.0);
    }

    #[test]
    fn preprocess_swaps_to_bgr() {
        // Pure red input: R=200, G=0, B=0.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            8,
            8,
            image::Rgb([200, 0, 0]),
        ));
        let tensor = preprocess(&img, 8);
        // Channel 0 is blue, channel 2 is red.
        assert_eq!(tensor[[0, 4, 4, 0]], 0.0);
        assert_eq!(tensor[[0, 4, 4, 2]], 200.0);
    }
}
