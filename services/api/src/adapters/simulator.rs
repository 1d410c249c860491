//! services/api/src/adapters/simulator.rs
//!
//! The random `AnalysisSimulator` used until real sensor data exists.

use aravalli_core::analysis::SimulatedReadings;
use aravalli_core::ports::AnalysisSimulator;
use rand::Rng;

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSimulator;

impl AnalysisSimulator for RandomSimulator {
    fn sample(&self) -> SimulatedReadings {
        let mut rng = rand::thread_rng();
        SimulatedReadings {
            ndvi: rng.gen::<f64>() * 0.8 - 0.2,
            nightlight: rng.gen::<f64>() * 100.0,
            legality_draw: rng.gen::<f64>(),
            ml_confidence: 0.85 + rng.gen::<f64>() * 0.14,
            tree_count: rng.gen_range(10..60),
            structure_count: rng.gen_range(1..6),
            water_body_count: rng.gen_range(0..2),
        }
    }
}
