/// YOLOv8 object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, per-class argmax decoding
/// of the raw output tensor, and class-aware NMS.
use std::path::Path;

use crate::detect::domain::object_detector::ObjectDetector;
use crate::error::ModelError;
use crate::shared::classes::class_label;
use crate::shared::detection::{BoundingBox, Detection};
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Minimum class score for a box to enter NMS at all. The configured
/// confidence threshold is applied downstream; this floor just keeps
/// the candidate set small.
const SCORE_FLOOR: f32 = 0.05;

/// Object detector backed by an ONNX Runtime session.
pub struct OnnxDetector {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxDetector {
    /// Load a YOLOv8 ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path) -> Result<Self, ModelError> {
        let session = ort::session::Session::builder()
            .and_then(|b| b.with_execution_providers(preferred_execution_providers()))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| ModelError::Load {
                path: model_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // shape is [N, C, H, W]
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ModelError> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(ModelError::Inference("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let shape = tensor.shape();

        // YOLOv8 output shape is [1, 4 + num_classes, num_candidates]
        // (transposed) or [1, num_candidates, 4 + num_classes]. Handle both.
        let (num_dets, num_feats) = if shape.len() == 3 {
            if shape[1] < shape[2] {
                (shape[2], shape[1])
            } else {
                (shape[1], shape[2])
            }
        } else {
            return Err(ModelError::Inference(format!(
                "unexpected output shape: {shape:?}"
            )));
        };
        if num_feats < 5 {
            return Err(ModelError::Inference(format!(
                "output has {num_feats} features per box, need at least 5"
            )));
        }

        let data = tensor
            .as_slice()
            .ok_or_else(|| ModelError::Inference("output tensor is not contiguous".into()))?;
        let transposed = shape[1] < shape[2];
        let num_classes = num_feats - 4;

        let mut raw = Vec::new();
        for i in 0..num_dets {
            let at = |f: usize| -> f32 {
                if transposed {
                    data[f * num_dets + i]
                } else {
                    data[i * num_feats + f]
                }
            };

            // Rows 0..4 are cx, cy, w, h; the rest are per-class scores.
            let mut best_class = 0usize;
            let mut best_score = f32::MIN;
            for c in 0..num_classes {
                let score = at(4 + c);
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < SCORE_FLOOR {
                continue;
            }

            let cx = at(0) as f64;
            let cy = at(1) as f64;
            let w = at(2) as f64;
            let h = at(3) as f64;

            // Map from letterbox coords back to original frame coords.
            let bbox = BoundingBox {
                x1: ((cx - w / 2.0) - pad_x as f64) / scale,
                y1: ((cy - h / 2.0) - pad_y as f64) / scale,
                x2: ((cx + w / 2.0) - pad_x as f64) / scale,
                y2: ((cy + h / 2.0) - pad_y as f64) / scale,
            };

            raw.push(Detection {
                bbox: bbox.clamp(frame.width(), frame.height()),
                class_id: best_class,
                label: class_label(best_class).to_string(),
                score: best_score as f64,
                track_id: None,
            });
        }

        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

/// Return the preferred ONNX execution providers for the current platform.
/// An empty list means the default CPU provider.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` x `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Pad with 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region.
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy class-aware NMS: sort by score descending, suppress overlapping
/// boxes of the same class.
fn nms(dets: &mut [Detection], iou_thresh: f64) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if dets[i].bbox.iou(&dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}
