//! Decoding of YOLOv8-style detection heads.
//!
//! The exported model emits one tensor shaped `[1, 4 + C, N]`: for each of
//! `N` anchors a `cx, cy, w, h` box in canvas pixels followed by `C` class
//! scores. Some exports transpose it to `[1, N, 4 + C]`; both are accepted.

use super::BoundingBox;
use crate::{Error, Result, config::ModelConfig};
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl From<&ModelConfig> for DecodeParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// A surviving box in canvas coordinates, before label lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

pub fn decode_output(output: ArrayViewD<'_, f32>, params: &DecodeParams) -> Result<Vec<Candidate>> {
    let table = as_feature_major(output)?;
    let num_classes = table.nrows() - 4;

    let mut candidates = Vec::new();
    for anchor in table.axis_iter(Axis(1)) {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, anchor[4 + c]))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .unwrap_or((0, 0.0));

        if !(confidence >= params.confidence_threshold) {
            continue;
        }

        candidates.push(Candidate {
            class_id,
            confidence: confidence.clamp(0.0, 1.0),
            bbox: BoundingBox::from_center(anchor[0], anchor[1], anchor[2], anchor[3]),
        });
    }

    debug!(
        "{} anchors above threshold {} across {} classes",
        candidates.len(),
        params.confidence_threshold,
        num_classes
    );

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

/// Class-aware NMS. Output is sorted by confidence, highest first.
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Normalizes the raw output to a `[4 + C, N]` view.
fn as_feature_major(output: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>> {
    let shape = output.shape().to_vec();
    let table = match shape.len() {
        3 if shape[0] == 1 => output.index_axis_move(Axis(0), 0).into_dimensionality::<Ix2>()?,
        2 => output.into_dimensionality::<Ix2>()?,
        _ => {
            return Err(Error::inference(format!(
                "unexpected detection output shape {:?}",
                shape
            )));
        }
    };

    // Anchors vastly outnumber features, so the longer axis is the anchor axis.
    let table = if table.nrows() > table.ncols() {
        table.reversed_axes()
    } else {
        table
    };

    if table.nrows() <= 4 {
        return Err(Error::inference(format!(
            "detection output {:?} has no class scores",
            shape
        )));
    }

    Ok(table)
}
