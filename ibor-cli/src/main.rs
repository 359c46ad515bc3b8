use anyhow::Result;
use ibor_cli::app;

fn main() -> Result<()> {
    app::run()
}
