//! Integration tests for `Heightmapper`
//!
//! Drives the exposure controller against the CPU heightfield renderer:
//! convergence with and without clipping, no-data edges, the clamp laws over
//! long runs, enable/disable restoration, view-settle re-arming, configuration
//! persistence, the background event loop and terrarium loading.

use heightmapper::{
    config::{ConfigManager, ExposureConfig, SamplerSettings},
    error::{HeightmapperError, get_user_friendly_error},
    exposure::{
        ElevationMapping, ExposureController, ExposureEvent, ExposurePhase, ExposureState,
        FrameOutcome, ViewSettleDebouncer,
    },
    render::{ElevationGrid, HeightfieldRenderer, RenderPipeline, terrarium},
};
use parking_lot::Mutex;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

/// Left half deeper than the deepest trench, right half higher than Everest
fn clipping_grid() -> ElevationGrid {
    ElevationGrid::from_fn(64, 64, |x, _| Some(if x < 32 { -12_000.0 } else { 9_500.0 }))
}

/// Smooth, hilly terrain with a coastline and a missing-data corner
fn rolling_terrain() -> ElevationGrid {
    ElevationGrid::from_fn(128, 96, |x, y| {
        if x < 8 && y < 8 {
            return None;
        }
        let fx = x as f32 / 11.0;
        let fy = y as f32 / 7.0;
        Some(-400.0 + 1_800.0 * (fx.sin() * fy.cos() + 1.0) + 12.0 * x as f32)
    })
}

fn full_resolution(include_negative_elevations: bool) -> ExposureConfig {
    ExposureConfig {
        include_negative_elevations,
        sampler: SamplerSettings {
            downscale_factor: 1,
        },
        ..ExposureConfig::default()
    }
}

/// Render one frame if requested and feed it back to the controller
fn pump(controller: &mut ExposureController<HeightfieldRenderer>) -> Option<FrameOutcome> {
    if !controller.pipeline_mut().take_redraw_request() {
        return None;
    }
    let frame = controller.pipeline_mut().render();
    Some(controller.on_frame_complete(&frame))
}

/// Terrain beyond the physical limits clips at both ends; one widening and then convergence
#[test]
fn test_clipped_terrain_converges() {
    let renderer = HeightfieldRenderer::new(clipping_grid(), ElevationMapping::default(), 10_000.0);
    let mut controller = ExposureController::new(renderer, &full_resolution(true));

    let Some(FrameOutcome::Remapped(mapping)) = pump(&mut controller) else {
        panic!("first frame should widen");
    };
    assert_eq!(controller.phase(), ExposurePhase::Widening);
    assert_eq!(controller.state().spread(), 2);
    assert_eq!(controller.state().last_max_intensity(), Some(257));
    assert!((mapping.u_min - (-2.0 / 255.0 * 8848.0)).abs() < 1e-9);
    assert_eq!(mapping.u_max, 8900.0);
    assert_eq!(controller.scale_factor(), "0.8848");

    assert_eq!(pump(&mut controller), Some(FrameOutcome::Converged));
    assert_eq!(controller.phase(), ExposurePhase::Converged);
    assert_eq!(controller.state().spread(), ExposureState::RESTART_SPREAD);

    // Converged: no redraw pending, mapping frozen
    assert_eq!(pump(&mut controller), None);
    assert_eq!(controller.pipeline().mapping(), mapping);
}

/// Gentle ramp from 200 m to 830 m, well inside the sea-level-to-Everest window
fn hill_ramp() -> ElevationGrid {
    ElevationGrid::from_fn(64, 64, |x, _| Some(200.0 + x as f32 * 10.0))
}

/// Pump frames until the controller converges, returning the frame count
fn frames_to_converge(
    controller: &mut ExposureController<HeightfieldRenderer>,
    budget: usize,
) -> Option<usize> {
    for frame in 1..=budget {
        match pump(controller)? {
            FrameOutcome::Converged => return Some(frame),
            FrameOutcome::Remapped(_) | FrameOutcome::Empty | FrameOutcome::Ignored => {}
        }
    }
    None
}

/// Terrain that fits the window settles once a tightened window saturates
#[test]
fn test_unclipped_terrain_converges() {
    let cases = [
        ("ramp", hill_ramp(), 5_000.0),
        ("rolling", rolling_terrain(), 25_000.0),
    ];

    for (name, grid, view_width) in cases {
        for downscale_factor in [1, 4] {
            let config = ExposureConfig {
                sampler: SamplerSettings { downscale_factor },
                ..ExposureConfig::default()
            };
            let renderer =
                HeightfieldRenderer::new(grid.clone(), ElevationMapping::default(), view_width);
            let mut controller = ExposureController::new(renderer, &config);

            let frames = frames_to_converge(&mut controller, 32);
            assert!(
                frames.is_some(),
                "{name} at 1/{downscale_factor} did not converge: {:?}",
                controller.status()
            );
            assert_eq!(controller.phase(), ExposurePhase::Converged);

            // The window ends up hugging the terrain rather than the physical limits
            let (low, high) = grid.elevation_range().unwrap();
            let mapping = controller.pipeline().mapping();
            assert!(mapping.u_max < 8_900.0, "{name}: {mapping:?}");
            assert!(
                mapping.range() < f64::from(high - low) * 1.5,
                "{name}: {mapping:?}"
            );
        }
    }
}

/// Edges of missing data do not read as black terrain after downscaling
#[test]
fn test_data_holes_do_not_fake_dark_terrain() {
    let holed = ElevationGrid::from_fn(64, 64, |x, y| {
        if (20..44).contains(&x) && (20..44).contains(&y) {
            None
        } else {
            Some(200.0 + x as f32 * 10.0)
        }
    });
    let renderer = HeightfieldRenderer::new(holed, ElevationMapping::default(), 5_000.0);
    let mut controller = ExposureController::new(renderer, &ExposureConfig::default());

    let Some(FrameOutcome::Remapped(mapping)) = pump(&mut controller) else {
        panic!("first frame should remap");
    };
    // Lowest real elevation is 200 m; a darkened edge would drag u_min toward sea level
    assert!(mapping.u_min > 150.0, "{mapping:?}");
    assert!(mapping.u_max < 900.0, "{mapping:?}");
}

/// Every mapping written over a long run respects the physical and sea-level clamps
#[test]
fn test_mappings_stay_within_limits() {
    for include_negative in [false, true] {
        let config = ExposureConfig {
            include_negative_elevations: include_negative,
            ..ExposureConfig::default()
        };
        let renderer =
            HeightfieldRenderer::new(rolling_terrain(), ElevationMapping::default(), 25_000.0);
        let mut controller = ExposureController::new(renderer, &config);

        for _ in 0..200 {
            let Some(outcome) = pump(&mut controller) else {
                break;
            };
            if let FrameOutcome::Remapped(mapping) = outcome {
                assert!(mapping.u_min >= -11_000.0, "{mapping:?}");
                assert!(mapping.u_max <= 8_900.0, "{mapping:?}");
                assert!(mapping.u_max > mapping.u_min, "{mapping:?}");
                if !include_negative {
                    assert!(mapping.u_min >= 0.0, "{mapping:?}");
                }
            }
        }
        assert!(controller.frames_analyzed() > 0);
    }
}

/// Switching auto-exposure on and off restores the hand-set mapping exactly
#[test]
fn test_enable_disable_restores_manual_mapping() {
    let manual = ElevationMapping::new(-123.25, 4567.75);
    let config = ExposureConfig {
        auto_exposure: false,
        ..full_resolution(true)
    };
    let renderer = HeightfieldRenderer::new(rolling_terrain(), manual, 25_000.0);
    let mut controller = ExposureController::new(renderer, &config);
    assert!(!controller.is_enabled());

    controller.enable();
    for _ in 0..5 {
        pump(&mut controller);
    }
    assert_ne!(controller.pipeline().mapping(), manual);

    controller.disable();
    assert_eq!(controller.pipeline().mapping(), manual);
    assert_eq!(controller.phase(), ExposurePhase::Idle);

    // The restoring redraw is rendered but not analysed
    assert_eq!(pump(&mut controller), Some(FrameOutcome::Ignored));
    assert_eq!(controller.pipeline().mapping(), manual);
}

/// A burst of pans produces one settled signal, which re-arms the converged search
#[test]
fn test_pan_rearms_after_settling() {
    let grid = clipping_grid();
    let renderer = HeightfieldRenderer::new(grid.clone(), ElevationMapping::default(), 10_000.0);
    let mut controller = ExposureController::new(renderer, &full_resolution(true));

    pump(&mut controller);
    assert_eq!(pump(&mut controller), Some(FrameOutcome::Converged));

    let mut debouncer = ViewSettleDebouncer::new(Duration::from_millis(250));
    let start = Instant::now();
    let mut settled = 0;
    for step in 0..6u32 {
        let now = start + Duration::from_millis(u64::from(step) * 40);
        debouncer.move_started();
        controller
            .pipeline_mut()
            .set_view(grid.crop(step * 2, 0, 64, 64), 10_000.0);
        debouncer.move_ended(now);
        if debouncer.poll(now) {
            settled += 1;
        }
    }
    assert_eq!(settled, 0);
    assert_eq!(controller.phase(), ExposurePhase::Converged);

    assert!(debouncer.poll(start + Duration::from_millis(200 + 250)));
    controller.on_view_settled();
    assert_eq!(controller.phase(), ExposurePhase::Sampling);
    assert_eq!(controller.state().spread(), ExposureState::RESTART_SPREAD);

    // Still clipped: widen once more from the restart spread, then converge
    assert!(matches!(pump(&mut controller), Some(FrameOutcome::Remapped(_))));
    assert_eq!(controller.state().spread(), 4);
    assert_eq!(pump(&mut controller), Some(FrameOutcome::Converged));
}

/// A saved configuration drives a controller the same way after reloading
#[test]
fn test_config_persistence_integration() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("Heightmapper").join("config.json");

    let config = ExposureConfig {
        auto_exposure: false,
        include_negative_elevations: true,
        initial_mapping: ElevationMapping::new(-250.0, 3000.0),
        convergence_frames: 3,
        view_settle_ms: 400,
        ..ExposureConfig::default()
    };
    ConfigManager::save_to(&config, &config_path).unwrap();

    let loaded = ConfigManager::load_from(&config_path).unwrap();
    assert_eq!(loaded, config);

    let renderer =
        HeightfieldRenderer::new(rolling_terrain(), loaded.initial_mapping, 25_000.0);
    let controller = ExposureController::new(renderer, &loaded);
    assert!(!controller.is_enabled());
    assert!(controller.state().include_negative_elevations());
    assert_eq!(controller.pipeline().mapping(), config.initial_mapping);
}

/// Invalid configuration files surface a readable error
#[test]
fn test_invalid_config_error_message() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("config.json");
    std::fs::write(&config_path, r#"{ "convergence_frames": 0 }"#).unwrap();

    let err = ConfigManager::load_from(&config_path).unwrap_err();
    assert!(matches!(err, HeightmapperError::InvalidConfig { .. }));
    assert!(get_user_friendly_error(&err).contains("convergence_frames"));
}

/// Events sent to the background loop are handled in order
#[test]
fn test_event_loop_thread() {
    let (event_tx, event_rx) = mpsc::channel();
    let (status_tx, status_rx) = mpsc::sync_channel(32);

    let manual = ElevationMapping::new(0.0, 8848.0);
    let config = ExposureConfig {
        auto_exposure: false,
        ..full_resolution(false)
    };
    let renderer = HeightfieldRenderer::new(rolling_terrain(), manual, 25_000.0);
    let controller = Arc::new(Mutex::new(
        ExposureController::new(renderer, &config)
            .with_event_receiver(event_rx)
            .with_status_sender(status_tx),
    ));

    let handle = ExposureController::spawn_event_loop(Arc::clone(&controller)).unwrap();
    assert!(ExposureController::spawn_event_loop(Arc::clone(&controller)).is_none());

    let frame = controller.lock().pipeline_mut().render();
    event_tx.send(ExposureEvent::SetAutoExposure(true)).unwrap();
    event_tx.send(ExposureEvent::FrameComplete(frame.clone())).unwrap();
    event_tx.send(ExposureEvent::SetAutoExposure(false)).unwrap();
    event_tx.send(ExposureEvent::FrameComplete(frame)).unwrap();
    drop(event_tx);
    handle.join().unwrap();

    let controller = controller.lock();
    assert_eq!(controller.phase(), ExposurePhase::Idle);
    assert_eq!(controller.frames_analyzed(), 1);
    assert_eq!(controller.pipeline().mapping(), manual);

    let statuses: Vec<_> = status_rx.try_iter().collect();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0].phase, ExposurePhase::Sampling);
    assert_ne!(statuses[1].mapping, manual);
    assert_eq!(statuses[2].phase, ExposurePhase::Idle);
    assert_eq!(statuses[2].mapping, manual);
}

/// Terrarium PNGs decode to the elevations they encode
#[test]
fn test_terrarium_round_trip_through_disk() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("tile.png");

    let grid = clipping_grid();
    let image = image::RgbaImage::from_fn(grid.width(), grid.height(), |x, y| {
        terrarium::encode_pixel(grid.get(x, y))
    });
    image.save(&path).unwrap();

    let loaded = terrarium::load(&path).unwrap();
    assert_eq!(loaded, grid);
    assert_eq!(loaded.elevation_range(), Some((-12_000.0, 9_500.0)));
}

#[test]
fn test_terrarium_load_errors() {
    let temp_dir = tempfile::tempdir().unwrap();

    let missing = terrarium::load(&temp_dir.path().join("missing.png")).unwrap_err();
    assert!(matches!(missing, HeightmapperError::IoError(_)));

    let not_an_image = temp_dir.path().join("notes.png");
    std::fs::write(&not_an_image, "definitely not a png").unwrap();
    let err = terrarium::load(&not_an_image).unwrap_err();
    assert!(matches!(err, HeightmapperError::ImageError { .. }));
    assert!(get_user_friendly_error(&err).contains("terrarium"));
}
