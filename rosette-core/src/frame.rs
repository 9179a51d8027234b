//! Read-only snapshots handed to renderers.

use glam::DVec3;
use serde::Serialize;

use crate::{
    clocks::NeuronState,
    types::{NeuronId, SegmentId},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CellFrame {
    pub neuron: NeuronId,
    pub position: DVec3,
    pub radius: f64,
    pub state: NeuronState,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NeuriteFrame {
    pub neuron: NeuronId,
    pub segment: SegmentId,
    pub parent: Option<SegmentId>,
    pub proximal: DVec3,
    pub distal: DVec3,
    pub radius: f64,
    pub growing: bool,
}

/// Every agent's geometry at one point of the run.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Physics steps taken so far.
    pub step: u64,
    /// Biological cycles taken so far.
    pub cycle: u64,
    pub cells: Vec<CellFrame>,
    pub neurites: Vec<NeuriteFrame>,
}

/// A passive consumer of frames, such as a renderer.
///
/// The container calls [`Animator::draw`] and never reads anything back.
pub trait Animator {
    fn draw(&mut self, frame: &Frame);
}

/// Keeps every frame it is handed.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    pub frames: Vec<Frame>,
}

impl Animator for FrameRecorder {
    fn draw(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}
