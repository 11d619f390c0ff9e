use super::{Point, Vec2, SpawnPose};

/// Relock triggers when the best local match is further than this many lane half-widths.
const RELOCK_LANE_FACTOR: f64 = 2.5;

/// Lateral spacing between vehicles on the spawn grid.
const SPAWN_SPACING: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub position: Point,
    pub tangent: Vec2,
    /// Tangent rotated +90 degrees.
    pub normal: Vec2,
    /// Cumulative arc length from the first sample.
    pub s: f64,
}

impl TrackSample {
    /// Returned by every query on a track without usable geometry.
    pub fn sentinel() -> Self {
        Self {
            position: Point::origin(),
            tangent: Vec2::x(),
            normal: Vec2::zeros(),
            s: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub index: usize,
    /// Positive on the side the sample normal points to.
    pub cross_track_error: f64,
    pub sample: TrackSample,
}

/// Arc-length parameterized centerline shared read-only by every vehicle.
#[derive(Debug, Clone)]
pub struct TrackModel {
    samples: Vec<TrackSample>,
    closed: bool,
    lane_half_width: f64,
    total_length: f64,
}

impl TrackModel {
    pub fn new(points: &[Point], lane_half_width: f64, closed: bool) -> Self {
        let n = points.len();
        if n < 2 {
            log::warn!("Track built from {} point(s); queries will return the origin sentinel", n);
            return Self {
                samples: Vec::new(),
                closed,
                lane_half_width,
                total_length: 0.0,
            };
        }

        let mut arc = Vec::with_capacity(n);
        arc.push(0.0);
        for pair in points.windows(2) {
            let last = arc[arc.len() - 1];
            arc.push(last + (pair[1] - pair[0]).norm());
        }

        let closing = if closed {
            (points[0] - points[n - 1]).norm()
        } else {
            0.0
        };
        let total_length = arc[n - 1] + closing;

        let samples = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let direction = if closed {
                    points[(i + 1) % n] - *p
                } else if i == n - 1 {
                    *p - points[i - 1]
                } else {
                    points[i + 1] - *p
                };

                let length = direction.norm();
                let tangent = if length > 0.0 {
                    direction / length
                } else {
                    Vec2::new(1.0, 0.0)
                };
                let normal = Vec2::new(-tangent.y, tangent.x);

                TrackSample {
                    position: *p,
                    tangent,
                    normal,
                    s: arc[i],
                }
            })
            .collect();

        Self {
            samples,
            closed,
            lane_half_width,
            total_length,
        }
    }

    pub fn samples(&self) -> &[TrackSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn lane_half_width(&self) -> f64 {
        self.lane_half_width
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn sample(&self, index: usize) -> TrackSample {
        if self.samples.is_empty() {
            return TrackSample::sentinel();
        }
        self.samples[index % self.samples.len()]
    }

    /// Nearest sample to `(x, y)`, searched in a window around `index_hint`.
    ///
    /// Falls back to a scan over every sample when the local best is further than
    /// 2.5 lane half-widths, so a vehicle that was teleported or knocked far off the
    /// line still locks onto the true nearest point.
    pub fn nearest_projection(&self, x: f64, y: f64, index_hint: usize, window_radius: usize) -> Projection {
        let n = self.samples.len();
        if n == 0 {
            return Projection {
                index: 0,
                cross_track_error: 0.0,
                sample: TrackSample::sentinel(),
            };
        }

        let query = Point::new(x, y);
        let hint = index_hint % n;
        let window = window_radius.min(n);

        let mut best_index = hint;
        let mut best_d2 = f64::INFINITY;
        for k in 0..=(2 * window) {
            // hint - window + k, wrapped into [0, n)
            let i = (hint + n * 2 + k - window) % n;
            let d2 = nalgebra::distance_squared(&query, &self.samples[i].position);
            if d2 < best_d2 {
                best_d2 = d2;
                best_index = i;
            }
        }

        let relock_distance = self.lane_half_width * RELOCK_LANE_FACTOR;
        if best_d2 > relock_distance * relock_distance {
            log::debug!(
                "Relocking projection at ({:.2}, {:.2}): local best {:.2}m from hint {}",
                x, y, best_d2.sqrt(), hint
            );
            best_index = 0;
            best_d2 = f64::INFINITY;
            for (i, sample) in self.samples.iter().enumerate() {
                let d2 = nalgebra::distance_squared(&query, &sample.position);
                if d2 < best_d2 {
                    best_d2 = d2;
                    best_index = i;
                }
            }
        }

        let sample = self.samples[best_index];
        let cross_track_error = (query - sample.position).dot(&sample.normal);

        Projection {
            index: best_index,
            cross_track_error,
            sample,
        }
    }

    /// Sample roughly `distance` meters ahead of `index`, using the average
    /// sample spacing. Always at least one sample ahead; wraps past the end.
    pub fn lookahead_sample(&self, index: usize, distance: f64) -> TrackSample {
        let n = self.samples.len();
        if n == 0 {
            return TrackSample::sentinel();
        }

        let step = self.total_length / n as f64;
        let offset = (distance / step.max(1e-6)).floor();
        let offset = if offset.is_finite() && offset >= 1.0 {
            offset as usize
        } else {
            1
        };

        self.samples[(index % n + offset % n) % n]
    }

    /// Starting pose for vehicle `i` of `count`, lined up across the first sample.
    pub fn spawn_pose(&self, i: usize, count: usize) -> SpawnPose {
        let base = self.samples.first().copied().unwrap_or_else(|| TrackSample {
            normal: Vec2::y(),
            ..TrackSample::sentinel()
        });
        let offset = (i as f64 - (count.max(1) as f64 - 1.0) / 2.0) * SPAWN_SPACING;
        let position = base.position + base.normal * offset;

        SpawnPose {
            x: position.x,
            y: position.y,
            heading: base.tangent.y.atan2(base.tangent.x),
            index: 0,
        }
    }
}
