//! Show the effective configuration.

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;

pub fn run() -> Result<()> {
    let (config, path) = Config::load()?;
    match path {
        Some(path) => println!("{} {}", "# loaded from".dimmed(), path.display()),
        None => println!("{}", "# no murmur.toml found, showing defaults".dimmed()),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
