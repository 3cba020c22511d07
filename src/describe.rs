// src/describe.rs

//! Human-readable dumps of a rasterstyle tree, for tests and diagnostics.

use std::fmt::{self, Write};

use crate::rasterstyle::{Channel, Colorant, RasterStyle, Sheet, Tree};

/// Writes an indented description of an entity and everything below it.
pub trait Describe {
    fn describe(&self, tree: &Tree, out: &mut dyn Write, depth: usize) -> fmt::Result;
}

fn indent(out: &mut dyn Write, depth: usize) -> fmt::Result {
    write!(out, "{:width$}", "", width = depth * 2)
}

impl Describe for RasterStyle {
    fn describe(&self, tree: &Tree, out: &mut dyn Write, depth: usize) -> fmt::Result {
        indent(out, depth)?;
        writeln!(
            out,
            "{} {:?} {:?} {:?}/{:?} vpc={} {}",
            self.id(),
            self.kind(),
            self.process_color_model(),
            self.separation_style(),
            self.interleaving_style(),
            self.values_per_component(),
            self.generation()
        )?;
        if let Some(parent) = self.parent() {
            indent(out, depth + 1)?;
            writeln!(out, "parent {}", parent.read().id())?;
        }
        for (name, index) in self.fully_fledged().iter() {
            indent(out, depth + 1)?;
            writeln!(out, "ff {} = {}", name, index)?;
        }
        for (name, index) in self.reserved().iter() {
            indent(out, depth + 1)?;
            writeln!(out, "reserved {} = {}", name, index)?;
        }
        for &sheet in tree.sheets() {
            if let Some(s) = tree.sheet(sheet) {
                s.describe(tree, out, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl Describe for Sheet {
    fn describe(&self, tree: &Tree, out: &mut dyn Write, depth: usize) -> fmt::Result {
        indent(out, depth)?;
        writeln!(
            out,
            "sheet {} required={}{}",
            self.sequence(),
            self.required_channels(),
            if self.is_omitted() { " omitted" } else { "" }
        )?;
        for &ch in self.channels() {
            if let Some(channel) = tree.channel(ch) {
                channel.describe(tree, out, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl Describe for Channel {
    fn describe(&self, tree: &Tree, out: &mut dyn Write, depth: usize) -> fmt::Result {
        indent(out, depth)?;
        write!(out, "channel {} '{}'", self.render_index(), self.name())?;
        if self.is_required() {
            out.write_str(" required")?;
        }
        if self.is_required_by_partial_paint() {
            out.write_str(" painted")?;
        }
        if self.is_omitted() {
            out.write_str(" omitted")?;
        }
        out.write_char('\n')?;
        for &c in self.colorants() {
            if let Some(colorant) = tree.colorant(c) {
                colorant.describe(tree, out, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl Describe for Colorant {
    fn describe(&self, _tree: &Tree, out: &mut dyn Write, depth: usize) -> fmt::Result {
        let info = self.info();
        indent(out, depth)?;
        write!(
            out,
            "colorant {} '{}' {:?} at ({}, {}) band {} angle {}",
            info.index,
            info.name,
            info.colorant_type,
            info.offset_x,
            info.offset_y,
            info.offset_band,
            info.screen_angle.angle
        )?;
        if let Some(original) = &info.original_name {
            write!(out, " was '{}'", original)?;
        }
        if let Some(eq) = self.equivalent() {
            write!(out, " real={:?}", eq.real)?;
        }
        if self.is_omitted() {
            out.write_str(" omitted")?;
        }
        out.write_char('\n')
    }
}

/// The full dump of a rasterstyle as a string.
pub fn dump(rs: &RasterStyle) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = rs.describe(rs.tree(), &mut out, 0);
    out
}
