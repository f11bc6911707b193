//! Abnormality rules for vital signs and disease threshold lookup.
//!
//! These are the limits the dashboards flag readings against. They are kept
//! here so every view agrees on what "abnormal" means.

use std::cmp::Reverse;
use std::fmt;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::models::{parse_timestamp, DiseaseThreshold, ThresholdMetric, VitalSigns};

pub const HEART_RATE_MIN: f64 = 60.0;
pub const HEART_RATE_MAX: f64 = 100.0;
pub const SPO2_MIN: f64 = 95.0;
pub const SYSTOLIC_MAX: f64 = 140.0;
pub const DIASTOLIC_MAX: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Vital {
    HeartRate,
    BloodPressure,
    OxygenSaturation,
}

impl fmt::Display for Vital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vital::HeartRate => "heart rate",
            Vital::BloodPressure => "blood pressure",
            Vital::OxygenSaturation => "oxygen saturation",
        };
        f.write_str(s)
    }
}

pub fn heart_rate_abnormal(bpm: f64) -> bool {
    bpm > HEART_RATE_MAX || bpm < HEART_RATE_MIN
}

pub fn spo2_abnormal(percent: f64) -> bool {
    percent < SPO2_MIN
}

pub fn blood_pressure_abnormal(systolic: f64, diastolic: f64) -> bool {
    systolic > SYSTOLIC_MAX || diastolic > DIASTOLIC_MAX
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VitalAssessment {
    pub flagged: Vec<Vital>,
}

impl VitalAssessment {
    pub fn is_normal(&self) -> bool {
        self.flagged.is_empty()
    }

    pub fn is_flagged(&self, vital: Vital) -> bool {
        self.flagged.contains(&vital)
    }
}

/// The most recent reading by timestamp, whatever order the backend used.
/// A missing or unreadable timestamp sorts as the epoch; ties keep the
/// earlier entry.
pub fn latest_reading(vitals: &[VitalSigns]) -> Option<&VitalSigns> {
    vitals.iter().min_by_key(|v| {
        Reverse(
            v.timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .map(|ts| ts.timestamp_millis())
                .unwrap_or(0),
        )
    })
}

/// Flags the readings present in `vitals`. Missing readings are never
/// flagged, and blood pressure needs both values.
pub fn assess(vitals: &VitalSigns) -> VitalAssessment {
    let mut flagged = Vec::new();
    if vitals.heart_rate.map(heart_rate_abnormal).unwrap_or(false) {
        flagged.push(Vital::HeartRate);
    }
    if let (Some(sys), Some(dia)) = (vitals.systolic, vitals.diastolic) {
        if blood_pressure_abnormal(sys, dia) {
            flagged.push(Vital::BloodPressure);
        }
    }
    if vitals.oxygen_saturation.map(spo2_abnormal).unwrap_or(false) {
        flagged.push(Vital::OxygenSaturation);
    }
    VitalAssessment { flagged }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatIntensity {
    Critical,
    Elevated,
    Low,
    Normal,
}

impl HeartbeatIntensity {
    pub fn for_rate(bpm: f64) -> HeartbeatIntensity {
        if bpm > 100.0 {
            HeartbeatIntensity::Critical
        } else if bpm > 85.0 {
            HeartbeatIntensity::Elevated
        } else if bpm < 60.0 {
            HeartbeatIntensity::Low
        } else {
            HeartbeatIntensity::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn between(previous: f64, current: f64) -> Trend {
        if current > previous + 0.1 {
            Trend::Up
        } else if current < previous - 0.1 {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

impl DiseaseThreshold {
    pub fn range(&self, metric: ThresholdMetric) -> RangeInclusive<f64> {
        match metric {
            ThresholdMetric::HeartRate => self.heart_rate_min..=self.heart_rate_max,
            ThresholdMetric::Temperature => self.temperature_min..=self.temperature_max,
            ThresholdMetric::Spo2 => self.spo2_min..=self.spo2_max,
            ThresholdMetric::SystolicBp => self.systolic_bp_min..=self.systolic_bp_max,
            ThresholdMetric::DiastolicBp => self.diastolic_bp_min..=self.diastolic_bp_max,
        }
    }

    pub fn contains(&self, metric: ThresholdMetric, value: f64) -> bool {
        self.range(metric).contains(&value)
    }

    /// True when every reading present in `vitals` sits inside this profile.
    /// A record with no readings matches nothing.
    pub fn matches(&self, vitals: &VitalSigns) -> bool {
        let mut seen = false;
        for metric in ThresholdMetric::ALL {
            if let Some(value) = metric.reading(vitals) {
                seen = true;
                if !self.contains(metric, value) {
                    return false;
                }
            }
        }
        seen
    }
}

pub fn matching_diseases<'t>(thresholds: &'t [DiseaseThreshold], vitals: &VitalSigns) -> Vec<&'t str> {
    thresholds
        .iter()
        .filter(|t| t.matches(vitals))
        .map(|t| t.disease.as_str())
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn threshold(
    id: i64,
    disease: &str,
    heart_rate: (f64, f64),
    temperature: (f64, f64),
    spo2: (f64, f64),
    systolic: (f64, f64),
    diastolic: (f64, f64),
) -> DiseaseThreshold {
    DiseaseThreshold {
        id,
        disease: disease.to_string(),
        heart_rate_min: heart_rate.0,
        heart_rate_max: heart_rate.1,
        temperature_min: temperature.0,
        temperature_max: temperature.1,
        spo2_min: spo2.0,
        spo2_max: spo2.1,
        systolic_bp_min: systolic.0,
        systolic_bp_max: systolic.1,
        diastolic_bp_min: diastolic.0,
        diastolic_bp_max: diastolic.1,
    }
}

/// Reference ranges shown when the backend has none configured.
pub fn reference_thresholds() -> Vec<DiseaseThreshold> {
    const HR: (f64, f64) = (60.0, 100.0);
    const TEMP: (f64, f64) = (36.1, 37.2);
    const SPO2: (f64, f64) = (95.0, 100.0);
    const SYS: (f64, f64) = (90.0, 120.0);
    const DIA: (f64, f64) = (60.0, 80.0);

    vec![
        threshold(1, "Normal", HR, TEMP, SPO2, SYS, DIA),
        threshold(2, "Hypertension", HR, TEMP, SPO2, (140.0, 180.0), (90.0, 120.0)),
        threshold(3, "Hypotension", HR, TEMP, SPO2, (70.0, 90.0), (40.0, 60.0)),
        threshold(4, "Fever", (100.0, 130.0), (38.0, 41.0), SPO2, SYS, DIA),
        threshold(5, "Hypoxemia", HR, TEMP, (85.0, 94.0), SYS, DIA),
        threshold(6, "Tachycardia", (101.0, 150.0), TEMP, SPO2, SYS, DIA),
        threshold(7, "Bradycardia", (40.0, 59.0), TEMP, SPO2, SYS, DIA),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(hr: Option<f64>, sys: Option<f64>, dia: Option<f64>, spo2: Option<f64>) -> VitalSigns {
        VitalSigns {
            heart_rate: hr,
            systolic: sys,
            diastolic: dia,
            oxygen_saturation: spo2,
            ..Default::default()
        }
    }

    #[test]
    fn heart_rate_limits_are_exclusive() {
        assert!(!heart_rate_abnormal(60.0));
        assert!(!heart_rate_abnormal(100.0));
        assert!(heart_rate_abnormal(100.5));
        assert!(heart_rate_abnormal(59.0));
    }

    #[test]
    fn spo2_and_pressure_limits() {
        assert!(spo2_abnormal(94.9));
        assert!(!spo2_abnormal(95.0));
        assert!(blood_pressure_abnormal(141.0, 80.0));
        assert!(blood_pressure_abnormal(120.0, 91.0));
        assert!(!blood_pressure_abnormal(140.0, 90.0));
    }

    #[test]
    fn assessment_flags_only_present_readings() {
        let normal = assess(&vitals(Some(72.0), Some(120.0), Some(80.0), Some(98.0)));
        assert!(normal.is_normal());

        let sick = assess(&vitals(Some(130.0), Some(150.0), Some(95.0), Some(90.0)));
        assert_eq!(
            sick.flagged,
            vec![Vital::HeartRate, Vital::BloodPressure, Vital::OxygenSaturation]
        );

        // systolic alone is not enough to judge pressure
        let partial = assess(&vitals(None, Some(200.0), None, None));
        assert!(partial.is_normal());
    }

    #[test]
    fn latest_reading_goes_by_timestamp() {
        let at = |hr: f64, ts: Option<&str>| VitalSigns {
            heart_rate: Some(hr),
            timestamp: ts.map(str::to_string),
            ..Default::default()
        };
        let newest_first = vec![
            at(130.0, Some("2024-05-02T09:00:00")),
            at(72.0, Some("2024-05-01T10:00:00")),
        ];
        assert_eq!(latest_reading(&newest_first).and_then(|v| v.heart_rate), Some(130.0));

        let mixed = vec![
            at(80.0, None),
            at(72.0, Some("2024-05-01T10:00:00Z")),
            at(90.0, Some("2024-05-01T12:30:00+02:00")),
        ];
        // 12:30+02:00 is 10:30Z
        assert_eq!(latest_reading(&mixed).and_then(|v| v.heart_rate), Some(90.0));

        let untimed = vec![at(61.0, None), at(62.0, Some("garbage"))];
        assert_eq!(latest_reading(&untimed).and_then(|v| v.heart_rate), Some(61.0));
        assert!(latest_reading(&[]).is_none());
    }

    #[test]
    fn heartbeat_intensity_bands() {
        assert_eq!(HeartbeatIntensity::for_rate(101.0), HeartbeatIntensity::Critical);
        assert_eq!(HeartbeatIntensity::for_rate(90.0), HeartbeatIntensity::Elevated);
        assert_eq!(HeartbeatIntensity::for_rate(85.0), HeartbeatIntensity::Normal);
        assert_eq!(HeartbeatIntensity::for_rate(55.0), HeartbeatIntensity::Low);
    }

    #[test]
    fn trend_ignores_small_moves() {
        assert_eq!(Trend::between(72.0, 72.1), Trend::Stable);
        assert_eq!(Trend::between(72.0, 72.3), Trend::Up);
        assert_eq!(Trend::between(72.0, 71.5), Trend::Down);
    }

    #[test]
    fn matches_reference_diseases() {
        let table = reference_thresholds();
        assert_eq!(table.len(), 7);

        let tachy = vitals(Some(120.0), None, None, Some(97.0));
        let found = matching_diseases(&table, &tachy);
        assert!(found.contains(&"Tachycardia"));
        assert!(found.contains(&"Fever"));
        assert!(!found.contains(&"Normal"));

        assert!(matching_diseases(&table, &VitalSigns::default()).is_empty());
        assert!(table[0].contains(ThresholdMetric::Temperature, 36.6));
    }
}
