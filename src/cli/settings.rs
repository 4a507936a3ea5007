use std::error::Error;

use crate::core::config::{path_display, Config};

pub fn set_config_value(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if let Err(message) = config.set_value(key, value) {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }
    config.save()?;
    let shown = if key == "api-key" { "(hidden)" } else { value };
    println!("✅ Set {key} to: {shown}");
    Ok(())
}

pub fn unset_config_value(key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if let Err(message) = config.unset_value(key) {
        eprintln!("❌ {message}");
        std::process::exit(1);
    }
    config.save()?;
    println!("✅ Unset {key}");
    Ok(())
}

pub fn print_config() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    println!("Config file: {}\n", path_display(Config::get_config_path()?));
    config.print_all();
    Ok(())
}
