use anyhow::Result;

use glimmer_engine::device::GpuInit;
use glimmer_engine::logging::{LoggingConfig, init_logging};
use glimmer_engine::window::{Runtime, RuntimeConfig};

mod app;

use app::TracerApp;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    // Initial shader registration is fatal on failure: the loop must not
    // start without valid programs.
    let app = TracerApp::new()?;

    Runtime::run(RuntimeConfig::default(), GpuInit::default(), app)
}
