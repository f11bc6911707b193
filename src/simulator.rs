//! Demo vital-sign generator: random jitter around fixed baselines.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::models::VitalSigns;
use crate::vitals::{HeartbeatIntensity, Trend};

pub const WINDOW_SIZE: usize = 40;

fn jitter<R: Rng + ?Sized>(rng: &mut R, base: f64, spread: f64) -> f64 {
    base + (rng.gen::<f64>() - 0.5) * spread
}

/// One reading around a healthy adult baseline.
pub fn fake_reading<R: Rng + ?Sized>(rng: &mut R) -> VitalSigns {
    VitalSigns {
        heart_rate: Some(jitter(rng, 70.0, 20.0).round()),
        temperature: Some((jitter(rng, 36.5, 2.0) * 10.0).round() / 10.0),
        oxygen_saturation: Some(jitter(rng, 98.0, 4.0).round()),
        systolic: Some(jitter(rng, 120.0, 30.0).round()),
        diastolic: Some(jitter(rng, 80.0, 20.0).round()),
        pulse: Some(jitter(rng, 70.0, 15.0).round()),
        timestamp: Some(Utc::now().to_rfc3339()),
        source: Some("simulator".to_string()),
        ..Default::default()
    }
}

/// The latest [`WINDOW_SIZE`] readings, oldest first.
#[derive(Debug, Clone, Default)]
pub struct VitalsWindow {
    readings: VecDeque<VitalSigns>,
}

impl VitalsWindow {
    pub fn push(&mut self, reading: VitalSigns) {
        if self.readings.len() == WINDOW_SIZE {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn latest(&self) -> Option<&VitalSigns> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VitalSigns> {
        self.readings.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiveVitalKind {
    HeartRate,
    BloodPressure,
    Temperature,
    OxygenSaturation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveVital {
    pub kind: LiveVitalKind,
    pub value: f64,
    pub trend: Trend,
    baseline: f64,
    spread: f64,
    normal: (f64, f64),
}

impl LiveVital {
    fn new(kind: LiveVitalKind, baseline: f64, spread: f64, normal: (f64, f64)) -> Self {
        LiveVital {
            kind,
            value: baseline,
            trend: Trend::Stable,
            baseline,
            spread,
            normal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            LiveVitalKind::HeartRate => "Heart Rate",
            LiveVitalKind::BloodPressure => "Blood Pressure",
            LiveVitalKind::Temperature => "Temperature",
            LiveVitalKind::OxygenSaturation => "Oxygen Saturation",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self.kind {
            LiveVitalKind::HeartRate => "bpm",
            LiveVitalKind::BloodPressure => "/80 mmHg",
            LiveVitalKind::Temperature => "°C",
            LiveVitalKind::OxygenSaturation => "%",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        let (min, max) = match self.kind {
            LiveVitalKind::BloodPressure => (90.0, 140.0),
            _ => self.normal,
        };
        self.value > max || self.value < min
    }

    /// Pulse animation band; only the heart-rate card has one.
    pub fn heartbeat(&self) -> Option<HeartbeatIntensity> {
        match self.kind {
            LiveVitalKind::HeartRate => Some(HeartbeatIntensity::for_rate(self.value)),
            _ => None,
        }
    }

    fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let variation = rng.gen::<f64>() * 2.0 * self.spread - self.spread;
        let next = ((self.baseline + variation) * 10.0).round() / 10.0;
        self.trend = Trend::between(self.value, next);
        self.value = next;
    }
}

/// The four headline vitals on the live card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveVitals {
    pub vitals: Vec<LiveVital>,
}

impl Default for LiveVitals {
    fn default() -> Self {
        LiveVitals {
            vitals: vec![
                LiveVital::new(LiveVitalKind::HeartRate, 72.0, 5.0, (60.0, 100.0)),
                LiveVital::new(LiveVitalKind::BloodPressure, 120.0, 3.0, (90.0, 140.0)),
                LiveVital::new(LiveVitalKind::Temperature, 36.8, 0.2, (36.5, 37.5)),
                LiveVital::new(LiveVitalKind::OxygenSaturation, 98.0, 1.0, (95.0, 100.0)),
            ],
        }
    }
}

impl LiveVitals {
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for vital in &mut self.vitals {
            vital.tick(rng);
        }
    }

    pub fn get(&self, kind: LiveVitalKind) -> Option<&LiveVital> {
        self.vitals.iter().find(|v| v.kind == kind)
    }
}

/// Calls `on_tick` every `tick` until `shutdown` flips to true or it ran
/// `max_ticks` times. The first call is immediate. Returns the call count.
async fn tick_until<F>(
    tick: Duration,
    max_ticks: Option<usize>,
    mut shutdown: watch::Receiver<bool>,
    mut on_tick: F,
) -> usize
where
    F: FnMut(),
{
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut produced = 0usize;

    loop {
        if *shutdown.borrow() || max_ticks.map(|max| produced >= max).unwrap_or(false) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                on_tick();
                produced += 1;
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    produced
}

/// Emits a fake reading every `tick` into a [`VitalsWindow`].
pub async fn run_simulator<F>(
    tick: Duration,
    max_ticks: Option<usize>,
    shutdown: watch::Receiver<bool>,
    mut sink: F,
) -> VitalsWindow
where
    F: FnMut(&VitalSigns, &VitalsWindow),
{
    let mut window = VitalsWindow::default();
    info!("Simulating vitals every {:?}", tick);
    let produced = tick_until(tick, max_ticks, shutdown, || {
        // ThreadRng is not Send, keep it out of the await points
        window.push(fake_reading(&mut rand::thread_rng()));
        if let Some(latest) = window.latest() {
            sink(latest, &window);
        }
    })
    .await;
    debug!("Simulator stopped after {} readings", produced);
    window
}

/// Steps the live vitals card every `tick` and hands it to `sink`.
pub async fn run_live_vitals<F>(
    tick: Duration,
    max_ticks: Option<usize>,
    shutdown: watch::Receiver<bool>,
    mut sink: F,
) -> LiveVitals
where
    F: FnMut(&LiveVitals),
{
    let mut live = LiveVitals::default();
    info!("Updating live vitals every {:?}", tick);
    let produced = tick_until(tick, max_ticks, shutdown, || {
        live.tick(&mut rand::thread_rng());
        sink(&live);
    })
    .await;
    debug!("Live vitals stopped after {} updates", produced);
    live
}
