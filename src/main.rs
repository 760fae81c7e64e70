use annular_field_sim::{run, Config};
use anyhow::Result;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cfg = Config::new()?;
    run(cfg)
}
