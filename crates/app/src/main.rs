//! Entry point for Surfview: load an OBJ surface and draw it.

mod config;

use anyhow::Result;
use platform::WindowConfig;
use renderer::RendererConfig;

use crate::config::ViewerConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ViewerConfig::from_args(std::env::args().skip(1))?;
    log::info!(
        "Starting Surfview. Mesh: {}, backend: {:?}, mode: {:?}, window_size={}x{}",
        cfg.mesh_path.display(),
        cfg.backends,
        cfg.render_mode,
        cfg.width,
        cfg.height
    );

    let mesh = match asset::load_obj_from_path(&cfg.mesh_path) {
        Ok(mesh) => mesh,
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(1);
        }
    };
    if mesh.is_empty() {
        log::warn!("{} contains no triangles; the window will stay empty", cfg.mesh_path.display());
    }

    let window = WindowConfig {
        title: format!("Surfview - {}", cfg.mesh_path.display()),
        width: cfg.width,
        height: cfg.height,
    };
    let renderer = RendererConfig {
        backends: cfg.backends,
        render_mode: cfg.render_mode,
        shader_path: cfg.shader_path,
        light_pos: cfg.light_pos,
    };

    platform::run_viewer(window, renderer, mesh)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
