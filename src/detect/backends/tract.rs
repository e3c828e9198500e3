#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::geometry::Rect;

const DEFAULT_INPUT_SIZE: u32 = 640;
/// Boxes below this score are not worth handing to the adapter.
const MIN_CANDIDATE_SCORE: f32 = 0.1;

/// Tract-based backend for YOLOv8-style ONNX detectors.
///
/// Expects a single `[1, 3, S, S]` input and a `[1, 4 + classes, anchors]`
/// output where the first four rows are `cx, cy, w, h` in input pixels and the
/// remaining rows are per-class scores in COCO order.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    model_path: PathBuf,
    input_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input_size(model_path, DEFAULT_INPUT_SIZE)
    }

    pub fn with_input_size<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            model_path: model_path.to_path_buf(),
            input_size,
        })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let frame = RgbImage::from_raw(width, height, pixels.to_vec()).ok_or_else(|| {
            anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                width as usize * height as usize * 3,
                width,
                height,
                pixels.len()
            )
        })?;
        let resized = imageops::resize(
            &frame,
            self.input_size,
            self.input_size,
            imageops::FilterType::Triangle,
        );

        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", shape));
        }
        let rows = shape[1];
        let anchors = shape[2];
        let scale_x = width as f64 / self.input_size as f64;
        let scale_y = height as f64 / self.input_size as f64;

        let mut detections = Vec::new();
        for i in 0..anchors {
            let (class_id, score) = (4..rows)
                .map(|row| (row - 4, view[[0, row, i]]))
                .fold((0usize, f32::NEG_INFINITY), |best, cand| {
                    if cand.1 > best.1 {
                        cand
                    } else {
                        best
                    }
                });
            if !score.is_finite() || score < MIN_CANDIDATE_SCORE {
                continue;
            }
            let cx = view[[0, 0, i]] as f64;
            let cy = view[[0, 1, i]] as f64;
            let w = view[[0, 2, i]] as f64;
            let h = view[[0, 3, i]] as f64;
            let rect = Rect::new(
                (cx - w / 2.0) * scale_x,
                (cy - h / 2.0) * scale_y,
                w * scale_x,
                h * scale_y,
            )
            .clamp_to(width, height);
            detections.push(RawDetection {
                rect,
                confidence: score as f64,
                class_id: class_id as u32,
            });
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn model_path(&self) -> Option<&Path> {
        Some(&self.model_path)
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, width, height)
    }
}
