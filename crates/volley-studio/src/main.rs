//! Headless demo: renders a grid of spinning cubes as a single instanced draw,
//! then a mixed cube/line queue that goes through the per-draw fallback.

mod scene;

use anyhow::{Context as _, Result};
use volley_engine::batch::{BatchOptions, BatchPolicy, HomogeneityCheck};
use volley_engine::logging::{init_logging, LoggingConfig};
use volley_engine::Context;
use volley_wgpu::{WgpuBackend, WgpuInit};

use scene::Scene;

const FRAMES: u32 = 3;
const GRID: u32 = 12;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let init = WgpuInit {
        target_size: (1280, 720),
        ..WgpuInit::default()
    };
    let backend = pollster::block_on(WgpuBackend::new(init))
        .context("failed to initialize the wgpu backend")?;

    let ctx = Context::with_options(
        backend,
        BatchOptions {
            policy: BatchPolicy::Instanced,
            check: HomogeneityCheck::Warn,
        },
    );
    let scene = Scene::create(&ctx).context("failed to build the demo scene")?;

    for frame in 0..FRAMES {
        ctx.backend().clear(wgpu::Color {
            r: 0.02,
            g: 0.02,
            b: 0.05,
            a: 1.0,
        });

        let t = frame as f32 * 0.25;

        ctx.set_batch_options(BatchOptions {
            policy: BatchPolicy::Instanced,
            ..ctx.batch_options()
        });
        scene.record_grid(&ctx, GRID, t);
        let report = ctx.submit(scene.grid_queue()).context("grid submission failed")?;
        log::info!(
            "frame {frame}: grid {:?}, {} draw(s) for {} cubes, store {} bytes{}",
            report.path,
            report.draws_issued,
            report.instances,
            report.shared_capacity,
            if report.reallocated { " (grown)" } else { "" },
        );

        ctx.set_batch_options(BatchOptions {
            policy: BatchPolicy::Auto,
            ..ctx.batch_options()
        });
        scene.record_mixed(&ctx, t);
        let report = ctx.submit(scene.mixed_queue()).context("mixed submission failed")?;
        log::info!(
            "frame {frame}: mixed {:?}, {} draw(s) for {} calls",
            report.path,
            report.draws_issued,
            report.instances,
        );
    }

    let (width, height) = ctx.backend().target_size();
    log::info!("rendered {FRAMES} frames into a {width}x{height} offscreen target");
    Ok(())
}
