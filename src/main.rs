// src/main.rs

//! Compiles a rasterstyle configuration and prints the resulting tree and
//! the blit colormap of every frame.
//!
//! Usage: `rasterstyle-dump <config.json> [--automatic NAME]...`

use anyhow::{bail, Context};
use log::info;

use rasterstyle::blit::{BlitColorMap, BlitOverrides, BlitSource, SlotKind};
use rasterstyle::{describe, setup, RasterStyleConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: rasterstyle-dump <config.json> [--automatic NAME]...");
    };
    let mut automatic = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--automatic" => match args.next() {
                Some(name) => automatic.push(name),
                None => bail!("--automatic needs a colorant name"),
            },
            other => bail!("unexpected argument '{}'", other),
        }
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read configuration '{}'", path))?;
    let config = RasterStyleConfig::from_json(&text)
        .with_context(|| format!("Failed to parse configuration '{}'", path))?;
    let mut rs = setup::build(&config).context("Failed to build rasterstyle")?;
    info!("Built {} from '{}'", rs.id(), path);

    for name in &automatic {
        let index = rs
            .add_automatic_separation(name)
            .with_context(|| format!("Failed to add separation '{}'", name))?;
        info!("Automatic separation '{}' -> {}", name, index);
    }

    print!("{}", describe::dump(&rs));
    for frame in rs.frames() {
        let map = BlitColorMap::build(&rs, BlitSource::Frame(frame), &BlitOverrides::default())
            .with_context(|| format!("Failed to build blit colormap for frame {:?}", frame))?;
        println!(
            "frame {:?}: {} bpp, {:?}",
            frame,
            map.bits_per_pixel(),
            map.packing()
        );
        for slot in map.slots() {
            let name = match slot.kind {
                SlotKind::Colorant => rs.colorant_name(slot.colorant).unwrap_or("?"),
                _ => "",
            };
            println!(
                "  {:?} {} {} @{}+{}",
                slot.kind, slot.colorant, name, slot.bit_offset, slot.bit_size
            );
        }
    }
    info!("Done.");
    Ok(())
}
