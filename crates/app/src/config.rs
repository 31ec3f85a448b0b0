//! Command-line configuration.
//! Accepts `--key=value` flags plus one positional mesh path.

use std::path::PathBuf;

use anyhow::{Result, bail};
use renderer::{DEFAULT_LIGHT_POS, RenderMode};

pub const USAGE: &str = "usage: surfview <mesh.obj> [--gpu-backend=auto|vulkan|dx12|metal|gl] \
[--size=WxH] [--width=W] [--height=H] [--render-mode=wireframe|filled] \
[--shader=PATH] [--light=x,y,z]";

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub mesh_path: PathBuf,
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub render_mode: RenderMode,
    pub shader_path: Option<PathBuf>,
    pub light_pos: [f32; 3],
}

impl ViewerConfig {
    /// Parse arguments (without the program name).
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mesh_path: Option<PathBuf> = None;
        let mut backends = wgpu::Backends::all();
        let mut w: Option<u32> = None;
        let mut h: Option<u32> = None;
        let mut render_mode = RenderMode::default();
        let mut shader_path: Option<PathBuf> = None;
        let mut light_pos = DEFAULT_LIGHT_POS;

        for arg in args {
            let arg = arg.as_ref();
            if let Some(val) = arg.strip_prefix("--gpu-backend=") {
                backends = parse_backend(val);
            } else if let Some(v) = arg.strip_prefix("--size=") {
                match v.split_once('x').or_else(|| v.split_once('X')) {
                    Some((sw, sh)) => match (sw.parse::<u32>(), sh.parse::<u32>()) {
                        (Ok(pw), Ok(ph)) => {
                            w = Some(pw);
                            h = Some(ph);
                        }
                        _ => log::warn!("Ignoring malformed size '{}'", v),
                    },
                    None => log::warn!("Ignoring malformed size '{}'", v),
                }
            } else if let Some(v) = arg.strip_prefix("--width=") {
                match v.parse::<u32>() {
                    Ok(pw) => w = Some(pw),
                    Err(_) => log::warn!("Ignoring malformed width '{}'", v),
                }
            } else if let Some(v) = arg.strip_prefix("--height=") {
                match v.parse::<u32>() {
                    Ok(ph) => h = Some(ph),
                    Err(_) => log::warn!("Ignoring malformed height '{}'", v),
                }
            } else if let Some(v) = arg.strip_prefix("--render-mode=") {
                render_mode = RenderMode::from_name(v).unwrap_or_else(|| {
                    log::warn!("Unknown render mode '{}', using wireframe.", v);
                    RenderMode::Wireframe
                });
            } else if let Some(v) = arg.strip_prefix("--shader=") {
                shader_path = Some(PathBuf::from(v));
            } else if let Some(v) = arg.strip_prefix("--light=") {
                match parse_vec3(v) {
                    Some(p) => light_pos = p,
                    None => log::warn!("Ignoring malformed light position '{}'", v),
                }
            } else if arg.starts_with("--") {
                log::warn!("Unknown option '{}'", arg);
            } else if mesh_path.is_none() {
                mesh_path = Some(PathBuf::from(arg));
            } else {
                bail!("unexpected extra argument '{}'\n{}", arg, USAGE);
            }
        }

        let Some(mesh_path) = mesh_path else {
            bail!("missing mesh path\n{}", USAGE);
        };

        Ok(Self {
            mesh_path,
            backends,
            width: w.unwrap_or(1280).max(1),
            height: h.unwrap_or(720).max(1),
            render_mode,
            shader_path,
            light_pos,
        })
    }
}

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_vec3(v: &str) -> Option<[f32; 3]> {
    let mut it = v.split(',').map(|c| c.trim().parse::<f32>());
    let out = [it.next()?.ok()?, it.next()?.ok()?, it.next()?.ok()?];
    if it.next().is_some() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_with_only_mesh_path() {
        let cfg = ViewerConfig::from_args(["bunny.obj"]).unwrap();
        assert_eq!(cfg.mesh_path, PathBuf::from("bunny.obj"));
        assert_eq!(cfg.backends, wgpu::Backends::all());
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.render_mode, RenderMode::Wireframe);
        assert_eq!(cfg.shader_path, None);
        assert_eq!(cfg.light_pos, [0.0, -4.0, -10.0]);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = ViewerConfig::from_args([
            "--gpu-backend=vk",
            "--size=800x600",
            "mesh.obj",
            "--render-mode=filled",
            "--shader=shaders/custom.wgsl",
            "--light=1, 2,3.5",
        ])
        .unwrap();
        assert_eq!(cfg.backends, wgpu::Backends::VULKAN);
        assert_eq!((cfg.width, cfg.height), (800, 600));
        assert_eq!(cfg.render_mode, RenderMode::Filled);
        assert_eq!(cfg.shader_path, Some(PathBuf::from("shaders/custom.wgsl")));
        assert_eq!(cfg.light_pos, [1.0, 2.0, 3.5]);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let cfg = ViewerConfig::from_args([
            "m.obj",
            "--gpu-backend=glide",
            "--size=big",
            "--width=0",
            "--light=1,2",
            "--render-mode=points",
        ])
        .unwrap();
        assert_eq!(cfg.backends, wgpu::Backends::all());
        assert_eq!(cfg.width, 1);
        assert_eq!(cfg.height, 720);
        assert_eq!(cfg.light_pos, [0.0, -4.0, -10.0]);
        assert_eq!(cfg.render_mode, RenderMode::Wireframe);
    }

    #[test]
    fn mesh_path_is_required() {
        let err = ViewerConfig::from_args(["--size=10x10"]).unwrap_err();
        assert!(err.to_string().contains("missing mesh path"));
    }

    #[test]
    fn second_positional_is_rejected() {
        assert!(ViewerConfig::from_args(["a.obj", "b.obj"]).is_err());
    }
}
