use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use super::Validate;
use crate::simulation::{Point, TrackModel};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackConfig {
    pub track: TrackDefinition,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_lane_half_width")]
    pub lane_half_width: f64,
    #[serde(default = "default_closed")]
    pub closed: bool,
    /// Subdivide segments so consecutive samples are at most this far apart.
    #[serde(default)]
    pub resample_spacing: Option<f64>,
    pub points: Vec<[f64; 2]>,
}

fn default_lane_half_width() -> f64 {
    4.0
}

fn default_closed() -> bool {
    true
}

impl TrackDefinition {
    /// Centerline points after optional resampling.
    pub fn centerline(&self) -> Vec<Point> {
        let points: Vec<Point> = self.points.iter().map(|p| Point::new(p[0], p[1])).collect();

        let spacing = match self.resample_spacing {
            Some(spacing) if spacing > 0.0 && points.len() >= 2 => spacing,
            _ => return points,
        };

        let segment_count = if self.closed { points.len() } else { points.len() - 1 };
        let mut resampled = Vec::new();
        for i in 0..segment_count {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            let pieces = ((b - a).norm() / spacing).ceil().max(1.0) as usize;
            for j in 0..pieces {
                let t = j as f64 / pieces as f64;
                resampled.push(a + (b - a) * t);
            }
        }
        if !self.closed {
            resampled.push(points[points.len() - 1]);
        }

        resampled
    }

    pub fn build_model(&self) -> TrackModel {
        let centerline = self.centerline();
        log::debug!(
            "Building track '{}': {} points -> {} samples",
            self.name,
            self.points.len(),
            centerline.len()
        );
        TrackModel::new(&centerline, self.lane_half_width, self.closed)
    }
}

impl Validate for TrackConfig {
    fn validate(&self) -> Result<()> {
        let track = &self.track;

        if track.points.len() < 2 {
            return Err(anyhow!("Track '{}' needs at least 2 points, got {}", track.name, track.points.len()));
        }

        for (i, p) in track.points.iter().enumerate() {
            if !p[0].is_finite() || !p[1].is_finite() {
                return Err(anyhow!("Track point {} is not finite: ({}, {})", i, p[0], p[1]));
            }
        }

        if track.lane_half_width <= 0.0 || !track.lane_half_width.is_finite() {
            return Err(anyhow!("Lane half-width must be positive, got {}", track.lane_half_width));
        }

        if let Some(spacing) = track.resample_spacing {
            if spacing <= 0.0 || !spacing.is_finite() {
                return Err(anyhow!("Resample spacing must be positive, got {}", spacing));
            }
        }

        Ok(())
    }
}
