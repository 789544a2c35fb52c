//! Hooks for an external renderer.
//!
//! The controller hands a [`Frame`] to a [`Renderer`] once per tick, including every
//! all-red clearing tick. A renderer returning `false` ends the episode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::simulation_engine::intersections::LightState;
use crate::simulation_engine::lanes::Lane;
use crate::simulation_engine::vehicles::Vehicle;

/// Read-only view of the intersection for one tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Lane holding green, or `None` while all approaches are red.
    pub green: Option<usize>,
    pub lanes: &'a [Lane],
    pub tick: u64,
}

impl<'a> Frame<'a> {
    /// Green lane index, or -1 while all approaches are red.
    pub fn signal_index(&self) -> i32 {
        self.green.map_or(-1, |lane| lane as i32)
    }

    pub fn light_for(&self, lane: usize) -> LightState {
        if self.green == Some(lane) {
            LightState::Green
        } else {
            LightState::Red
        }
    }

    pub fn queue_lengths(&self) -> impl Iterator<Item = usize> + 'a {
        let lanes = self.lanes;
        lanes.iter().map(Lane::len)
    }

    /// Every vehicle to draw: queued and crossing.
    pub fn vehicles(&self) -> impl Iterator<Item = &'a Vehicle> + 'a {
        let lanes = self.lanes;
        lanes
            .iter()
            .flat_map(|lane| lane.queued())
            .chain(lanes.iter().flat_map(|lane| lane.released().iter()))
    }
}

/// External presentation layer. Returns `true` to keep running.
pub trait Renderer {
    fn draw(&mut self, frame: &Frame<'_>) -> bool;
}

impl<F> Renderer for F
where
    F: FnMut(&Frame<'_>) -> bool,
{
    fn draw(&mut self, frame: &Frame<'_>) -> bool {
        self(frame)
    }
}

/// Renderer for running without a display. Always continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessRenderer;

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, _frame: &Frame<'_>) -> bool {
        true
    }
}

/// Headless renderer that stops once a shared flag is raised (e.g. from a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct StopSignalRenderer {
    stop: Arc<AtomicBool>,
}

impl StopSignalRenderer {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }

    pub fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

impl Renderer for StopSignalRenderer {
    fn draw(&mut self, _frame: &Frame<'_>) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::intersections::IntersectionGeometry;
    use crate::simulation_engine::lanes::create_lanes;

    #[test]
    fn frame_reports_all_red_as_minus_one() {
        let lanes = create_lanes(&IntersectionGeometry::default(), 20);
        let frame = Frame {
            green: None,
            lanes: &lanes,
            tick: 0,
        };
        assert_eq!(frame.signal_index(), -1);
        assert!((0..4).all(|i| frame.light_for(i) == LightState::Red));

        let frame = Frame {
            green: Some(2),
            ..frame
        };
        assert_eq!(frame.signal_index(), 2);
        assert_eq!(frame.light_for(2), LightState::Green);
    }

    #[test]
    fn stop_signal_renderer_follows_flag() {
        let lanes = create_lanes(&IntersectionGeometry::default(), 20);
        let frame = Frame {
            green: Some(0),
            lanes: &lanes,
            tick: 0,
        };
        let mut renderer = StopSignalRenderer::default();
        assert!(renderer.draw(&frame));
        renderer.handle().store(true, Ordering::Relaxed);
        assert!(!renderer.draw(&frame));
    }
}
