use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = moodviz::config::Config::parse();
    moodviz::app::run(cfg)
}
