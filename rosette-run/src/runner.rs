//! The driver loop.
//!
//! [`Runner`] owns a [`Container`] and decides when each of its operations
//! runs: physics on every step, a biological cycle every
//! `steps_per_cycle` steps, and a frame every `frame_every` steps.

use std::io::{self, Write};

use anyhow::Context;
use rosette_core::{
    Container, CycleReport,
    frame::{Animator, Frame},
};

use crate::{settings::RunConfig, tissue};

/// What one call to [`Runner::step_once`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub cycle: Option<CycleReport>,
    pub differentiated: usize,
    pub drew: bool,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub cycles: u64,
    pub frames: u64,
    pub neurites: usize,
    pub differentiated: usize,
}

pub struct Runner {
    cfg: RunConfig,
    container: Container,
    steps_per_cycle: u64,
    frames: u64,
    differentiated: usize,
}

impl Runner {
    /// Builds the container and lays out the initial tissue.
    pub fn new(cfg: RunConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let mut container =
            Container::new(cfg.engine.clone()).context("building the simulation container")?;
        tissue::build_rosette(&mut container, &cfg.tissue).context("building the tissue")?;
        let steps_per_cycle = cfg.steps_per_cycle();
        Ok(Self {
            cfg,
            container,
            steps_per_cycle,
            frames: 0,
            differentiated: 0,
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Simulated time reached so far.
    pub fn time(&self) -> f64 {
        self.container.steps() as f64 * self.cfg.engine.physics.timestep
    }

    /// Advances one physics step, running a cycle and drawing a frame when
    /// their turn comes.
    pub fn step_once(&mut self, animator: &mut impl Animator) -> anyhow::Result<StepReport> {
        let mut report = StepReport::default();
        self.container
            .update_cell_positions()
            .context("updating cell positions")?;
        let step = self.container.steps();

        if step % self.steps_per_cycle == 0 {
            let cycle = self.container.advance_cycles().context("advancing cycles")?;
            report.differentiated = self
                .container
                .differentiate()
                .context("checking differentiation")?;
            self.differentiated += report.differentiated;
            report.cycle = Some(cycle);
            tracing::debug!(
                time = self.time(),
                cycle = self.container.cycles(),
                grew = cycle.growth_events,
                branched = cycle.branch_events,
                differentiated = report.differentiated,
                "cycle"
            );
        }

        if step % self.cfg.run.frame_every == 0 {
            self.container
                .update_drawings(animator)
                .context("drawing frame")?;
            self.frames += 1;
            report.drew = true;
        }
        Ok(report)
    }

    /// Runs until `total_time`, logging progress about ten times.
    pub fn run(&mut self, animator: &mut impl Animator) -> anyhow::Result<RunSummary> {
        let total = self.cfg.total_steps();
        let progress_every = (total / 10).max(1);
        tracing::info!(
            steps = total,
            steps_per_cycle = self.steps_per_cycle,
            frame_every = self.cfg.run.frame_every,
            "run started"
        );

        self.container
            .update_drawings(animator)
            .context("drawing initial frame")?;
        self.frames += 1;

        while self.container.steps() < total {
            self.step_once(animator)?;
            if self.container.steps() % progress_every == 0 {
                tracing::info!(
                    time = self.time(),
                    cycles = self.container.cycles(),
                    neurites = self.container.neurite_count(),
                    differentiated = self.differentiated,
                    "progress"
                );
            }
        }

        let summary = self.summary();
        tracing::info!(?summary, "run finished");
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            steps: self.container.steps(),
            cycles: self.container.cycles(),
            frames: self.frames,
            neurites: self.container.neurite_count(),
            differentiated: self.differentiated,
        }
    }
}

/// Writes every frame as one JSON object per line.
///
/// [`Animator::draw`] cannot fail, so the first write error is kept and
/// later frames are skipped; [`JsonLinesAnimator::finish`] reports it.
pub struct JsonLinesAnimator<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> JsonLinesAnimator<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")
    }

    /// Flushes and hands back the writer, or the first error hit.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> Animator for JsonLinesAnimator<W> {
    fn draw(&mut self, frame: &Frame) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_frame(frame) {
            tracing::error!(error = %e, "frame write failed");
            self.error = Some(e);
        }
    }
}

/// Discards frames; used when no output file is given.
#[derive(Debug, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn draw(&mut self, _frame: &Frame) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosette_core::frame::FrameRecorder;

    fn small_run() -> RunConfig {
        let mut cfg = RunConfig::default();
        cfg.run.total_time = 3.0;
        cfg.run.cycle_interval = 1.0;
        cfg.run.frame_every = 5;
        cfg.tissue.neurons = 3;
        cfg.engine.physics.timestep = 0.1;
        cfg
    }

    #[test]
    fn cadence_follows_settings() {
        let mut runner = Runner::new(small_run()).expect("valid run");
        let mut recorder = FrameRecorder::default();
        let summary = runner.run(&mut recorder).expect("run completes");

        assert_eq!(summary.steps, 30);
        assert_eq!(summary.cycles, 3);
        // Initial frame plus one every five steps.
        assert_eq!(summary.frames, 7);
        assert_eq!(recorder.frames.len(), 7);
        assert_eq!(recorder.frames[0].step, 0);
        assert_eq!(recorder.frames[6].step, 30);
        assert!((runner.time() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn step_once_reports_cycles_on_schedule() {
        let mut runner = Runner::new(small_run()).expect("valid run");
        let mut recorder = FrameRecorder::default();
        let cycled: Vec<bool> = (0..20)
            .map(|_| {
                runner
                    .step_once(&mut recorder)
                    .expect("step succeeds")
                    .cycle
                    .is_some()
            })
            .collect();

        let expected: Vec<bool> = (1..=20).map(|s| s % 10 == 0).collect();
        assert_eq!(cycled, expected);
    }

    #[test]
    fn json_lines_animator_writes_one_object_per_frame() {
        let mut runner = Runner::new(small_run()).expect("valid run");
        let mut animator = JsonLinesAnimator::new(Vec::new());
        runner.run(&mut animator).expect("run completes");

        let bytes = animator.finish().expect("in-memory writer");
        let text = String::from_utf8(bytes).expect("utf-8 json");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);

        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("valid json");
        assert_eq!(first["step"], 0);
        assert_eq!(first["cells"].as_array().map(Vec::len), Some(3));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_animator_keeps_first_error() {
        let mut animator = JsonLinesAnimator::new(FailingWriter);
        animator.draw(&Frame::default());
        animator.draw(&Frame::default());
        let err = animator.finish().err().expect("write failed");
        assert_eq!(err.to_string(), "disk full");
    }
}
