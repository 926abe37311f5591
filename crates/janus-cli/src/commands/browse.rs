//! Config browsing commands: cd, ls, lsd, pwd

use anyhow::{anyhow, Result};

use crate::nav::Navigator;
use crate::output::{pretty, print_entry};

pub fn cd_command(nav: &mut Navigator, path: Option<&str>) -> Result<()> {
    nav.cd(path.unwrap_or(""))?;
    Ok(())
}

/// Execute the ls command
pub fn ls_command(nav: &Navigator, key: Option<&str>) -> Result<()> {
    if let Some(key) = key {
        let value = nav
            .child(key)
            .ok_or_else(|| anyhow!("No such key {key}"))?;
        println!("{}", pretty(value));
        return Ok(());
    }

    for entry in nav.entries() {
        print_entry(&entry);
    }
    Ok(())
}

/// Execute the lsd command
///
/// With a key, looks the entry up by key first and then by `name`.
pub fn lsd_command(nav: &Navigator, key: Option<&str>) -> Result<()> {
    let value = match key {
        Some(key) => nav
            .child(key)
            .or_else(|| nav.find_named(key))
            .ok_or_else(|| anyhow!("No such key {key}"))?,
        None => nav.current(),
    };
    println!("{}", pretty(value));
    Ok(())
}

pub fn pwd_command(nav: &Navigator) {
    println!("{}", nav.pwd());
}
