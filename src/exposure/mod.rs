//! Auto-exposure module
//!
//! Adjusts the elevation-to-intensity mapping until the visible terrain uses
//! the 256 available grey levels well, much like camera auto-exposure.
//!
//! # Overview
//!
//! - **Sampling**: each completed frame is shrunk (`FrameSampler`) and reduced
//!   to per-pixel intensity plus validity
//! - **Analysis**: `HistogramAnalyzer` finds the darkest and brightest valid
//!   intensity, or reports that the frame has no data
//! - **Decision**: `ExposurePolicy` remaps the observed range back to
//!   elevations, widens the window when both ends clip, or declares
//!   convergence
//! - **Orchestration**: `ExposureController` owns the state, writes the mapping
//!   into the render pipeline and asks for the next frame
//!
//! # Event Flow
//!
//! ```text
//! RenderPipeline → frame → FrameSampler → HistogramAnalyzer → ExposurePolicy
//!       ↑                                                          ↓
//!       └──────────── set_mapping + request_redraw ─── ExposureController
//! ```
//!
//! The loop paces itself: every redraw request produces the frame that drives
//! the next step. Camera movement is coalesced by `ViewSettleDebouncer` before
//! it re-arms the search.
//!
//! # Example Usage
//!
//! ```
//! use heightmapper::config::ExposureConfig;
//! use heightmapper::exposure::{ElevationMapping, ExposureController, FrameOutcome};
//! use heightmapper::render::{ElevationGrid, HeightfieldRenderer, RenderPipeline};
//!
//! // Rolling hills between 200 m and 830 m, seen through a sea-level-to-Everest mapping
//! let grid = ElevationGrid::from_fn(64, 64, |x, _| Some(200.0 + x as f32 * 10.0));
//! let renderer = HeightfieldRenderer::new(grid, ElevationMapping::default(), 5_000.0);
//! let mut controller = ExposureController::new(renderer, &ExposureConfig::default());
//!
//! let frame = controller.pipeline_mut().render();
//! let outcome = controller.on_frame_complete(&frame);
//!
//! // The window tightens around the hills and another frame is requested
//! assert!(matches!(outcome, FrameOutcome::Remapped(_)));
//! let mapping = controller.pipeline().mapping();
//! assert!(mapping.u_min > 100.0 && mapping.u_max < 1_000.0);
//! assert!(controller.pipeline_mut().take_redraw_request());
//! ```

pub mod controller;
pub mod debounce;
pub mod histogram;
pub mod mapping;
pub mod policy;
pub mod sampler;

pub use controller::{ExposureController, ExposureEvent, ExposureStatus, FrameOutcome};
pub use debounce::ViewSettleDebouncer;
pub use histogram::{HistogramAnalyzer, ObservedExtrema};
pub use mapping::ElevationMapping;
pub use policy::{ExposurePhase, ExposurePolicy, ExposureState, PolicyOutcome};
pub use sampler::{FrameSampler, Sample, SampledFrame};
