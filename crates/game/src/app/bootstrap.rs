use engine::{resolve_app_paths, LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::city::{self, CityScene, LocalHost};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Iso City Startup ===");

    let config_dir = match resolve_app_paths() {
        Ok(paths) => {
            info!(root = %paths.root.display(), "project_root_resolved");
            Some(paths.config_dir)
        }
        Err(error) => {
            warn!(error = %error, "project_root_unresolved_using_defaults");
            None
        }
    };
    let sim_config = city::load_sim_config(config_dir.as_deref());

    let config = LoopConfig {
        window_title: format!("Iso City - {}", sim_config.city),
        ..LoopConfig::default()
    };
    let host = LocalHost::new(&sim_config);
    let scene = CityScene::new(sim_config, Box::new(host));

    AppWiring {
        config,
        scene: Box::new(scene),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
