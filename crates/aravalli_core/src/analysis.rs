//! crates/aravalli_core/src/analysis.rs
//!
//! Turns raw simulated readings into an assessment: degradation status,
//! construction flags, derived spectral indices and a canned prediction.

use crate::domain::DegradationStatus;

/// NDVI strictly below this counts as sparse vegetation.
pub const SPARSE_VEGETATION_NDVI: f64 = 0.2;
/// Nightlight strictly above this turns sparse vegetation into permanent degradation.
pub const DEGRADATION_NIGHTLIGHT: f64 = 50.0;
/// Nightlight strictly above this counts as construction.
pub const CONSTRUCTION_NIGHTLIGHT: f64 = 60.0;
/// A legality draw strictly above this marks the construction as legal.
pub const LEGALITY_CUTOFF: f64 = 0.7;

pub const STABLE_PREDICTION: &str = "Stable ecosystem expected for next 12 months.";
pub const AT_RISK_PREDICTION: &str = "High risk of desertification in 6 months if unchecked.";

/// The raw draws an `AnalysisSimulator` produces for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedReadings {
    /// Vegetation index, nominally in [-0.2, 0.6).
    pub ndvi: f64,
    /// Nightlight intensity, nominally in [0, 100).
    pub nightlight: f64,
    /// Uniform draw in [0, 1) deciding legality.
    pub legality_draw: f64,
    /// Model confidence, nominally in [0.85, 0.99).
    pub ml_confidence: f64,
    pub tree_count: u32,
    /// Structures seen if construction is detected; ignored otherwise.
    pub structure_count: u32,
    pub water_body_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralIndices {
    /// Enhanced Vegetation Index.
    pub evi: f64,
    /// Soil Adjusted Vegetation Index.
    pub savi: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub label: &'static str,
    pub count: u32,
}

/// Everything derived from one set of readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub ndvi: f64,
    pub nightlight: f64,
    pub status: DegradationStatus,
    pub construction_detected: bool,
    pub is_legal_construction: bool,
    pub ml_confidence: f64,
    pub detected_objects: Vec<DetectedObject>,
    pub indices: SpectralIndices,
    pub prediction: &'static str,
}

pub fn classify_degradation(ndvi: f64, nightlight: f64) -> DegradationStatus {
    if ndvi < SPARSE_VEGETATION_NDVI {
        if nightlight > DEGRADATION_NIGHTLIGHT {
            DegradationStatus::PermanentDegradation
        } else {
            DegradationStatus::Seasonal
        }
    } else {
        DegradationStatus::Natural
    }
}

pub fn spectral_indices(ndvi: f64) -> SpectralIndices {
    SpectralIndices {
        evi: ndvi * 0.8 + 0.1,
        savi: ndvi * 0.9 + 0.05,
    }
}

pub fn prediction_for(status: DegradationStatus) -> &'static str {
    match status {
        DegradationStatus::Natural => STABLE_PREDICTION,
        _ => AT_RISK_PREDICTION,
    }
}

pub fn assess(readings: &SimulatedReadings) -> Assessment {
    let status = classify_degradation(readings.ndvi, readings.nightlight);
    let construction_detected = readings.nightlight > CONSTRUCTION_NIGHTLIGHT;
    let structures = if construction_detected {
        readings.structure_count
    } else {
        0
    };

    Assessment {
        ndvi: readings.ndvi,
        nightlight: readings.nightlight,
        status,
        construction_detected,
        is_legal_construction: readings.legality_draw > LEGALITY_CUTOFF,
        ml_confidence: readings.ml_confidence,
        detected_objects: vec![
            DetectedObject { label: "Trees", count: readings.tree_count },
            DetectedObject { label: "Structures", count: structures },
            DetectedObject { label: "Water Bodies", count: readings.water_body_count },
        ],
        indices: spectral_indices(readings.ndvi),
        prediction: prediction_for(status),
    }
}
