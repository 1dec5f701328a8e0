// src/hough.rs - Probabilistic Hough transform for straight segments

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::image_utils::is_foreground;

/// Votes a (rho, theta) cell needs before a segment is traced through it
pub const DEFAULT_ACCUMULATOR_THRESHOLD: u32 = 50;

/// Upper bound on line refits per accepted seed
const MAX_REFITS: usize = 8;

/// Parameters of the segment extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    /// Distance resolution of the accumulator, in pixels
    pub rho: f64,
    /// Angle resolution of the accumulator, in radians
    pub theta: f64,
    pub threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    /// Half width of the corridor traced and cleared around a segment
    pub suppression_radius: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: PI / 180.0,
            threshold: DEFAULT_ACCUMULATOR_THRESHOLD,
            min_line_length: 50,
            max_line_gap: 10,
            suppression_radius: 0,
        }
    }
}

/// Segment between two integer pixel positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

/// Straight line through `origin` along the unit vector `dir`
#[derive(Debug, Clone, Copy)]
struct Line {
    origin: (f64, f64),
    dir: (f64, f64),
}

impl Line {
    /// Line through `point` whose normal makes the angle `theta` with the x axis
    fn from_normal_angle(point: (i32, i32), theta: f64) -> Self {
        Line {
            origin: (point.0 as f64, point.1 as f64),
            dir: (-theta.sin(), theta.cos()),
        }
        .canonical()
    }

    /// Principal-axis fit through the points
    fn fit(points: &[(i32, i32)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let (sum_x, sum_y) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
        let (mx, my) = (sum_x / n, sum_y / n);

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            let dx = x as f64 - mx;
            let dy = y as f64 - my;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        if sxx + syy == 0.0 {
            return None;
        }

        let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        Some(
            Line {
                origin: (mx, my),
                dir: (angle.cos(), angle.sin()),
            }
            .canonical(),
        )
    }

    /// Shallow lines run left to right, steep ones top to bottom
    fn canonical(self) -> Self {
        let flip = if self.x_major() { self.dir.0 < 0.0 } else { self.dir.1 < 0.0 };
        if flip {
            Line { dir: (-self.dir.0, -self.dir.1), ..self }
        } else {
            self
        }
    }

    #[inline]
    fn x_major(&self) -> bool {
        self.dir.0.abs() >= self.dir.1.abs()
    }

    #[inline]
    fn major(&self, p: (i32, i32)) -> i32 {
        if self.x_major() { p.0 } else { p.1 }
    }

    /// Signed position of the projection of `p` along the line
    #[inline]
    fn position(&self, p: (i32, i32)) -> f64 {
        (p.0 as f64 - self.origin.0) * self.dir.0 + (p.1 as f64 - self.origin.1) * self.dir.1
    }

    /// Perpendicular distance from `p` to the line, along the normal `(-dir.y, dir.x)`
    #[inline]
    fn distance(&self, p: (i32, i32)) -> f64 {
        ((p.0 as f64 - self.origin.0) * -self.dir.1 + (p.1 as f64 - self.origin.1) * self.dir.0).abs()
    }

    fn point_at(&self, t: f64) -> (i32, i32) {
        (
            (self.origin.0 + t * self.dir.0).round() as i32,
            (self.origin.1 + t * self.dir.1).round() as i32,
        )
    }

    /// Pixels at the given major-axis coordinate lying within `band` of the line
    fn slice(self, major: i32, band: f64) -> impl Iterator<Item = (i32, i32)> {
        let x_major = self.x_major();
        let (o_major, o_minor, d_major, d_minor) = if x_major {
            (self.origin.0, self.origin.1, self.dir.0, self.dir.1)
        } else {
            (self.origin.1, self.origin.0, self.dir.1, self.dir.0)
        };
        // |d_major| >= 1/sqrt(2) for a unit vector on its major axis
        let center = o_minor + (major as f64 - o_major) * d_minor / d_major;
        let half = band / d_major.abs();

        ((center - half).floor() as i32..=(center + half).ceil() as i32)
            .map(move |minor| if x_major { (major, minor) } else { (minor, major) })
            .filter(move |&p| self.distance(p) <= band)
    }
}

/// Edge pixels still available for extraction
struct EdgeMask {
    width: i32,
    height: i32,
    active: Vec<bool>,
    voted: Vec<bool>,
}

impl EdgeMask {
    fn new(mask: &GrayImage) -> Self {
        let active: Vec<bool> = mask.pixels().map(is_foreground).collect();
        Self {
            width: mask.width() as i32,
            height: mask.height() as i32,
            voted: vec![false; active.len()],
            active,
        }
    }

    #[inline]
    fn index(&self, (x, y): (i32, i32)) -> Option<usize> {
        if x >= 0 && y >= 0 && x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    #[inline]
    fn is_active(&self, p: (i32, i32)) -> bool {
        self.index(p).map_or(false, |i| self.active[i])
    }

    /// Active pixels within `band` of the line, walking both ways from
    /// `seed_major` until more than `max_gap` consecutive slices are empty
    fn trace(&self, line: Line, seed_major: i32, band: f64, max_gap: i32) -> Vec<(i32, i32)> {
        let limit = if line.x_major() { self.width } else { self.height };
        let mut run = Vec::new();

        for (direction, first) in [(1, 0), (-1, 1)] {
            let mut gap = 0;
            let mut i = first;
            loop {
                let major = seed_major + direction * i;
                if major < 0 || major >= limit {
                    break;
                }
                let before = run.len();
                run.extend(line.slice(major, band).filter(|&p| self.is_active(p)));
                if run.len() == before {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                } else {
                    gap = 0;
                }
                i += 1;
            }
        }

        run
    }
}

struct Accumulator {
    num_angles: usize,
    num_rho: usize,
    trig: Vec<(f64, f64)>,
    votes: Vec<i32>,
}

impl Accumulator {
    fn new(width: u32, height: u32, rho: f64, theta: f64) -> Self {
        let num_angles = ((PI / theta).round() as usize).max(1);
        let num_rho = ((((width + height) * 2 + 1) as f64) / rho).round() as usize;
        let trig = (0..num_angles)
            .map(|n| {
                let angle = n as f64 * theta;
                (angle.cos() / rho, angle.sin() / rho)
            })
            .collect();
        Self {
            num_angles,
            num_rho,
            trig,
            votes: vec![0; num_angles * num_rho],
        }
    }

    #[inline]
    fn cell(&self, n: usize, x: i32, y: i32) -> usize {
        let (cos_t, sin_t) = self.trig[n];
        let r = (x as f64 * cos_t + y as f64 * sin_t).round() as i64 + ((self.num_rho as i64 - 1) / 2);
        n * self.num_rho + r as usize
    }

    /// Add the votes of one point; returns the strongest cell it touched
    fn vote(&mut self, x: i32, y: i32) -> (i32, usize) {
        let mut best = (0, 0);
        for n in 0..self.num_angles {
            let idx = self.cell(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.0 {
                best = (self.votes[idx], n);
            }
        }
        best
    }

    fn unvote(&mut self, x: i32, y: i32) {
        for n in 0..self.num_angles {
            let idx = self.cell(n, x, y);
            self.votes[idx] -= 1;
        }
    }
}

/// Extract straight segments from a binary edge mask.
///
/// Points are visited in raster order so results are deterministic. Each
/// point votes in the accumulator; once a cell reaches `threshold`, the
/// line through that point is refit to the edge pixels lying near it and
/// followed both ways while gaps stay within `max_line_gap`. Segments whose
/// horizontal or vertical extent reaches `min_line_length` are kept, and
/// every mask pixel within `suppression_radius` (at least 1 px) of a kept
/// segment, measured perpendicular to it, is consumed.
pub fn detect_segments(mask: &GrayImage, params: &HoughParams) -> Vec<LineSegment> {
    let (width, height) = mask.dimensions();
    let mut segments = Vec::new();
    if width == 0 || height == 0 {
        return segments;
    }

    let mut edges = EdgeMask::new(mask);
    let points: Vec<(i32, i32)> = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| is_foreground(p))
        .map(|(x, y, _)| (x as i32, y as i32))
        .collect();

    let mut accumulator = Accumulator::new(width, height, params.rho, params.theta);
    let threshold = params.threshold as i32;
    let max_gap = params.max_line_gap as i32;
    let min_length = params.min_line_length as i32;
    let band = params.suppression_radius.max(1) as f64;

    for &seed in &points {
        let Some(seed_index) = edges.index(seed) else {
            continue;
        };
        if !edges.active[seed_index] {
            continue;
        }

        let (max_votes, max_n) = accumulator.vote(seed.0, seed.1);
        edges.voted[seed_index] = true;
        if max_votes < threshold {
            continue;
        }

        // The accumulator angle is coarse; refit until the traced run stops growing
        let mut line = Line::from_normal_angle(seed, max_n as f64 * params.theta);
        let mut run: Vec<(i32, i32)> = Vec::new();
        for _ in 0..MAX_REFITS {
            let next = edges.trace(line, line.major(seed), band, max_gap);
            let settled = next.len() == run.len();
            run = next;
            match Line::fit(&run) {
                Some(fitted) => line = fitted,
                None => break,
            }
            if settled {
                break;
            }
        }

        let (t_min, t_max) = run
            .iter()
            .map(|&p| line.position(p))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
        let good_line = run.len() >= 2 && {
            let (start, end) = (line.point_at(t_min), line.point_at(t_max));
            (end.0 - start.0).abs() >= min_length || (end.1 - start.1).abs() >= min_length
        };

        if !good_line {
            // Consume the traced pixels without withdrawing their votes
            edges.active[seed_index] = false;
            for &p in &run {
                if let Some(i) = edges.index(p) {
                    edges.active[i] = false;
                }
            }
            continue;
        }

        // Clear the perpendicular corridor around the segment, ends included
        let from = line.major(line.point_at(t_min - band));
        let to = line.major(line.point_at(t_max + band));
        for major in from.min(to)..=from.max(to) {
            for p in line.slice(major, band) {
                let Some(i) = edges.index(p) else {
                    continue;
                };
                if edges.active[i] {
                    if edges.voted[i] {
                        accumulator.unvote(p.0, p.1);
                    }
                    edges.active[i] = false;
                }
            }
        }

        segments.push(LineSegment {
            start: line.point_at(t_min),
            end: line.point_at(t_max),
        });
    }

    debug!(
        candidate_points = points.len(),
        segments = segments.len(),
        "segment extraction finished"
    );

    segments
}
