//! crates/aravalli_core/src/hotspots.rs
//!
//! Fixed details for the hotspots drawn on the live map. `loc_1` is a
//! degradation site, `loc_2` a construction site; every other id reads as
//! healthy forest.

#[derive(Debug, Clone, PartialEq)]
pub struct YearStatus {
    pub year: i32,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotProfile {
    pub soil_moisture: u32,
    pub canopy_cover: u32,
    pub alerts: Vec<&'static str>,
    pub history: Vec<YearStatus>,
}

fn history(statuses: [&'static str; 3]) -> Vec<YearStatus> {
    (2021..)
        .zip(statuses)
        .map(|(year, status)| YearStatus { year, status })
        .collect()
}

pub fn profile_for(location_id: &str) -> HotspotProfile {
    match location_id {
        "loc_1" => HotspotProfile {
            soil_moisture: 32,
            canopy_cover: 28,
            alerts: vec!["Rapid vegetation loss detected", "Soil erosion risk: High"],
            history: history(["Healthy", "Minor Degradation", "Critical"]),
        },
        "loc_2" => HotspotProfile {
            soil_moisture: 45,
            canopy_cover: 15,
            alerts: vec!["Unauthorized structure detected", "High nightlight intensity"],
            history: history(["Healthy", "Stable", "Construction"]),
        },
        _ => HotspotProfile {
            soil_moisture: 85,
            canopy_cover: 90,
            alerts: Vec::new(),
            history: history(["Healthy", "Healthy", "Healthy"]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sites_carry_alerts() {
        let degraded = profile_for("loc_1");
        assert_eq!((degraded.soil_moisture, degraded.canopy_cover), (32, 28));
        assert_eq!(degraded.history[2], YearStatus { year: 2023, status: "Critical" });

        let construction = profile_for("loc_2");
        assert_eq!((construction.soil_moisture, construction.canopy_cover), (45, 15));
        assert_eq!(construction.alerts[0], "Unauthorized structure detected");
    }

    #[test]
    fn unknown_sites_are_healthy() {
        let profile = profile_for("loc_99");
        assert_eq!((profile.soil_moisture, profile.canopy_cover), (85, 90));
        assert!(profile.alerts.is_empty());
        assert!(profile.history.iter().all(|h| h.status == "Healthy"));
    }
}
