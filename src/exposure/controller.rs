//! Exposure controller implementation
//!
//! This module implements the controller that owns the exposure state, turns
//! completed frames into mapping updates, and handles the user-facing toggles.

use crate::config::ExposureConfig;
use crate::exposure::histogram::HistogramAnalyzer;
use crate::exposure::mapping::ElevationMapping;
use crate::exposure::policy::{ExposurePhase, ExposurePolicy, ExposureState, PolicyOutcome};
use crate::exposure::sampler::FrameSampler;
use crate::render::{RenderPipeline, RenderedFrame};
use parking_lot::Mutex;
use std::sync::{Arc, mpsc};
use tracing::{debug, info, trace, warn};

/// Inputs the controller reacts to
#[derive(Debug, Clone)]
pub enum ExposureEvent {
    /// A frame finished rendering
    FrameComplete(RenderedFrame),
    /// The camera stopped moving (already debounced)
    ViewSettled,
    /// The user typed in new mapping bounds
    ManualMapping(ElevationMapping),
    /// The user toggled inclusion of below-sea-level elevations
    IncludeNegativeElevations(bool),
    /// The user toggled auto-exposure
    SetAutoExposure(bool),
}

/// What happened to a completed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Auto-exposure idle or converged; the frame was not analysed
    Ignored,
    /// No valid pixel in the frame; mapping unchanged
    Empty,
    /// A new mapping was applied and a redraw requested
    Remapped(ElevationMapping),
    /// Exposure converged on this frame; mapping unchanged
    Converged,
}

/// Snapshot for the settings surface
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureStatus {
    /// Controller phase
    pub phase: ExposurePhase,
    /// Mapping currently in the pipeline
    pub mapping: ElevationMapping,
    /// Current widening multiplier
    pub spread: u32,
    /// Whether below-sea-level elevations may be mapped
    pub include_negative_elevations: bool,
    /// Read-only z:x scale factor readout
    pub scale_factor: String,
}

/// Auto-exposure controller
///
/// Sole owner and writer of [`ExposureState`]. Every input goes through one of
/// the public methods (or [`ExposureController::handle_event`]) and is fully
/// processed, including any mapping write, before the next one is looked at.
pub struct ExposureController<P: RenderPipeline> {
    /// Render pipeline the mapping is written to
    pipeline: P,
    /// State machine
    state: ExposureState,
    /// Decision rules
    policy: ExposurePolicy,
    /// Frame reduction with a reused scratch buffer
    sampler: FrameSampler,
    /// Mapping captured when auto-exposure was last switched on
    manual_snapshot: Option<ElevationMapping>,
    /// Last published scale factor
    scale_factor: String,
    /// Event receiver (taken when the event loop starts)
    event_receiver: Option<mpsc::Receiver<ExposureEvent>>,
    /// Status sender to the settings surface
    status_sender: Option<mpsc::SyncSender<ExposureStatus>>,
    /// Frames that went through analysis
    frames_analyzed: u64,
}

impl<P: RenderPipeline> ExposureController<P> {
    /// Create a controller driving `pipeline`
    ///
    /// If the configuration enables auto-exposure, the controller starts armed
    /// and the pipeline's current mapping is captured for later restoration.
    pub fn new(pipeline: P, config: &ExposureConfig) -> Self {
        let mut controller = Self {
            pipeline,
            state: ExposureState::new(config.include_negative_elevations),
            policy: ExposurePolicy::new(config.limits, config.convergence_frames),
            sampler: FrameSampler::new(config.sampler.downscale_factor),
            manual_snapshot: None,
            scale_factor: "1".to_string(),
            event_receiver: None,
            status_sender: None,
            frames_analyzed: 0,
        };

        if config.auto_exposure {
            controller.enable();
        }

        controller
    }

    /// Attach the event channel consumed by [`run`](Self::run) and
    /// [`spawn_event_loop`](Self::spawn_event_loop)
    #[must_use]
    pub fn with_event_receiver(mut self, receiver: mpsc::Receiver<ExposureEvent>) -> Self {
        self.event_receiver = Some(receiver);
        self
    }

    /// Attach a channel receiving a status snapshot after every change
    #[must_use]
    pub fn with_status_sender(mut self, sender: mpsc::SyncSender<ExposureStatus>) -> Self {
        self.status_sender = Some(sender);
        self
    }

    /// Controller state
    pub fn state(&self) -> &ExposureState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> ExposurePhase {
        self.state.phase()
    }

    /// True unless auto-exposure is switched off
    pub fn is_enabled(&self) -> bool {
        self.state.phase() != ExposurePhase::Idle
    }

    /// Last published z:x scale factor
    pub fn scale_factor(&self) -> &str {
        &self.scale_factor
    }

    /// Number of frames that went through analysis
    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Render pipeline
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Mutable render pipeline access, for the caller that produces frames
    ///
    /// Changing the mapping through this handle bypasses the controller; use
    /// [`set_manual_mapping`](Self::set_manual_mapping) for user edits.
    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    /// Status snapshot
    pub fn status(&self) -> ExposureStatus {
        ExposureStatus {
            phase: self.state.phase(),
            mapping: self.pipeline.mapping(),
            spread: self.state.spread(),
            include_negative_elevations: self.state.include_negative_elevations(),
            scale_factor: self.scale_factor.clone(),
        }
    }

    /// Switch auto-exposure on
    ///
    /// Captures the current mapping so [`disable`](Self::disable) can restore
    /// it, starts a fresh search and requests a frame to analyse.
    pub fn enable(&mut self) {
        if self.is_enabled() {
            debug!("Auto-exposure already enabled, ignoring");
            return;
        }

        let mapping = self.pipeline.mapping();
        info!(
            "Auto-exposure enabled, storing manual mapping [{}, {}]",
            mapping.u_min, mapping.u_max
        );
        self.manual_snapshot = Some(mapping);
        self.state.arm();
        self.pipeline.request_redraw();
        self.send_status_update();
    }

    /// Switch auto-exposure off
    ///
    /// Frames arriving afterwards are ignored, so an analysis started before
    /// the switch never reaches the pipeline. The mapping captured by the last
    /// [`enable`](Self::enable) is restored.
    pub fn disable(&mut self) {
        if !self.is_enabled() {
            debug!("Auto-exposure already disabled, ignoring");
            return;
        }

        self.state.halt();
        match self.manual_snapshot.take() {
            Some(mapping) => {
                info!(
                    "Auto-exposure disabled, restoring manual mapping [{}, {}]",
                    mapping.u_min, mapping.u_max
                );
                self.pipeline.set_mapping(mapping);
                self.pipeline.request_redraw();
            }
            None => info!("Auto-exposure disabled, no stored mapping to restore"),
        }
        self.send_status_update();
    }

    /// Analyse a completed frame and apply the resulting mapping
    pub fn on_frame_complete(&mut self, frame: &RenderedFrame) -> FrameOutcome {
        if !self.state.phase().is_searching() {
            trace!("Frame ignored in phase {}", self.state.phase());
            return FrameOutcome::Ignored;
        }

        let sampled = self.sampler.sample(frame);
        let Some(observed) = HistogramAnalyzer::analyze(sampled) else {
            debug!("No valid pixels in frame, waiting for the next one");
            return FrameOutcome::Empty;
        };
        self.frames_analyzed += 1;

        debug!(
            "Observed intensities [{}, {}] over {} samples ({:.0}% of levels used)",
            observed.min,
            observed.max,
            observed.valid_samples,
            observed.utilization() * 100.0
        );

        let current = self.pipeline.mapping();
        let outcome = self.policy.step(
            &mut self.state,
            &observed,
            current,
            self.pipeline.view_width_meters(),
        );

        match outcome {
            PolicyOutcome::Remap {
                mapping,
                scale_factor,
            } => {
                debug!(
                    "Phase {}: mapping [{:.1}, {:.1}] -> [{:.1}, {:.1}]",
                    self.state.phase(),
                    current.u_min,
                    current.u_max,
                    mapping.u_min,
                    mapping.u_max
                );
                if let Some(factor) = scale_factor {
                    self.scale_factor = factor.to_string();
                }
                self.pipeline.set_mapping(mapping);
                self.pipeline.request_redraw();
                self.send_status_update();
                FrameOutcome::Remapped(mapping)
            }
            PolicyOutcome::Converged => {
                info!(
                    "Exposure converged at [{:.1}, {:.1}] after {} analysed frames",
                    current.u_min, current.u_max, self.frames_analyzed
                );
                self.send_status_update();
                FrameOutcome::Converged
            }
            PolicyOutcome::Halted => FrameOutcome::Ignored,
        }
    }

    /// The camera settled on a new view; search again from the current mapping
    pub fn on_view_settled(&mut self) {
        if !self.is_enabled() {
            trace!("View settled while auto-exposure is off");
            return;
        }

        debug!("View settled, re-arming exposure search");
        self.state.rearm();
        self.pipeline.request_redraw();
        self.send_status_update();
    }

    /// Apply a mapping typed in by the user
    ///
    /// A collapsed or inverted window is padded the same way computed mappings
    /// are, so `u_min < u_max` always holds in the pipeline. While auto-exposure
    /// is on, the search restarts from the new mapping.
    pub fn set_manual_mapping(&mut self, mut mapping: ElevationMapping) {
        if mapping.u_max <= mapping.u_min {
            let padded = mapping.u_min + self.policy.limits().degenerate_padding;
            warn!(
                "Manual mapping [{}, {}] is not increasing; using [{}, {}]",
                mapping.u_min, mapping.u_max, mapping.u_min, padded
            );
            mapping.u_max = padded;
        }

        self.pipeline.set_mapping(mapping);
        if self.is_enabled() {
            debug!("Manual mapping while auto-exposure is on, re-arming search");
            self.state.rearm();
        }
        self.pipeline.request_redraw();
        self.send_status_update();
    }

    /// Toggle inclusion of below-sea-level elevations
    pub fn set_include_negative_elevations(&mut self, include: bool) {
        if self.state.include_negative_elevations == include {
            return;
        }

        info!("Include negative elevations: {}", include);
        self.state.include_negative_elevations = include;
        if self.is_enabled() {
            self.state.rearm();
            self.pipeline.request_redraw();
        }
        self.send_status_update();
    }

    /// Dispatch one event
    pub fn handle_event(&mut self, event: ExposureEvent) {
        match event {
            ExposureEvent::FrameComplete(frame) => {
                self.on_frame_complete(&frame);
            }
            ExposureEvent::ViewSettled => self.on_view_settled(),
            ExposureEvent::ManualMapping(mapping) => self.set_manual_mapping(mapping),
            ExposureEvent::IncludeNegativeElevations(include) => {
                self.set_include_negative_elevations(include);
            }
            ExposureEvent::SetAutoExposure(true) => self.enable(),
            ExposureEvent::SetAutoExposure(false) => self.disable(),
        }
    }

    /// Process events until every sender is dropped
    pub fn run(&mut self) {
        let Some(receiver) = self.event_receiver.take() else {
            warn!("Event loop already running or no receiver attached; run() call ignored");
            return;
        };

        info!("Entering exposure event loop");
        while let Ok(event) = receiver.recv() {
            self.handle_event(event);
        }
        info!("Exposure event loop exited");
    }

    /// Send a status snapshot, dropping it if the receiver is full or gone
    fn send_status_update(&self) {
        let Some(sender) = &self.status_sender else {
            return;
        };

        match sender.try_send(self.status()) {
            Ok(()) => trace!("Status update sent"),
            Err(mpsc::TrySendError::Full(_)) => {
                debug!("Status channel full, dropping update");
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                warn!("Status receiver disconnected");
            }
        }
    }
}

impl<P: RenderPipeline + Send + 'static> ExposureController<P> {
    /// Spawn the event loop in a background thread
    ///
    /// The controller is locked only while a single event is handled, so other
    /// holders of the mutex (e.g. the thread producing frames) are not blocked
    /// between events. Events are still handled strictly one at a time.
    pub fn spawn_event_loop(controller: Arc<Mutex<Self>>) -> Option<std::thread::JoinHandle<()>> {
        let Some(receiver) = controller.lock().event_receiver.take() else {
            warn!("Event loop already running or no receiver attached");
            return None;
        };

        Some(std::thread::spawn(move || {
            info!("Entering exposure event loop");
            while let Ok(event) = receiver.recv() {
                controller.lock().handle_event(event);
            }
            info!("Exposure event loop exited");
        }))
    }
}
