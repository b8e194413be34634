use anyhow::Result;
use instance_studio::cli::CliOverrides;
use instance_studio::config::StudioConfig;
use instance_studio::{logging, StudioApp};
use std::io;
use tracing::{error, info, warn};

fn main() {
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(cli) {
        error!(target: "studio", "{err:?}");
        eprintln!("Application error: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: CliOverrides) -> Result<()> {
    let (mut config, config_error) = match &cli.config {
        Some(path) => match StudioConfig::load(path) {
            Ok(config) => (config, None),
            Err(err) => (StudioConfig::default(), Some(err)),
        },
        None => (StudioConfig::default(), None),
    };
    let overrides = cli.config_overrides();
    config.apply_overrides(&overrides);
    logging::init(config.logging.filter.as_deref())?;
    if let Some(err) = config_error {
        warn!(target: "config", "Config load error: {err:?}. Falling back to defaults.");
    }
    if !overrides.is_empty() {
        info!(target: "config", "command line overrides: {}", overrides.applied_fields().join(", "));
    }

    let mut app = StudioApp::new(&config)?;
    if let Some(scene) = &cli.scene {
        let count = app.load_scene_file(scene)?;
        info!(target: "studio", "seeded {count} instance(s) from {}", scene.display());
    }
    if let Some(script) = &cli.script {
        app.run_script(script)?;
    }
    if app.quit_requested() {
        return Ok(());
    }
    println!("{}: type 'help' for commands", app.session().title());
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    app.run_repl(stdin.lock(), &mut stdout)
}
