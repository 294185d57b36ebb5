//! LAM Viewer command-line entry point
//!
//! Loads a model from an asset directory, waits for its geometry and prints
//! the resulting camera framing.

use std::process::ExitCode;
use std::rc::Rc;

use lam_viewer::{ConfigManager, FsFetcher, ResourceFetcher, TokioScheduler, Viewer};

const CONFIG_FILE: &str = "lam-viewer.ron";

fn main() -> ExitCode {
    lam_viewer::logging::init();

    let mut args = std::env::args().skip(1);
    let (Some(root), Some(model)) = (args.next(), args.next()) else {
        eprintln!("usage: lam-viewer <asset-dir> <model.urdf|model.obj>");
        return ExitCode::FAILURE;
    };

    tracing::info!("Starting LAM Viewer");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = ConfigManager::new(CONFIG_FILE).config().clone();
    let fetcher: Rc<dyn ResourceFetcher> = Rc::new(FsFetcher::new(root));
    let viewer = Viewer::new(config, Rc::clone(&fetcher), Rc::new(TokioScheduler));

    let local = tokio::task::LocalSet::new();
    let code = local.block_on(&runtime, async {
        if model.ends_with(".obj") {
            let text = match fetcher.fetch_text(&model).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("{e}");
                    return ExitCode::FAILURE;
                }
            };
            match viewer.show_static(&model, &text) {
                Ok(framing) => {
                    println!(
                        "{model}: {} shape, distance {:.3}",
                        framing.shape.name(),
                        framing.distance
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("{e}");
                    ExitCode::FAILURE
                }
            }
        } else {
            match viewer.load(&model).await {
                Ok(report) => {
                    println!(
                        "{}: {}/{} meshes, {} joints, {} shape, distance {:.3}",
                        report.robot_name,
                        report.meshes_loaded,
                        report.meshes_total,
                        viewer.joint_names().len(),
                        report.framing.shape.name(),
                        report.framing.distance,
                    );
                    for failure in &report.mesh_failures {
                        println!("  failed {}: {}", failure.locator, failure.reason);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    tracing::error!("{e}");
                    ExitCode::FAILURE
                }
            }
        }
    });

    viewer.dispose();
    code
}
