// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Terminal output helpers shared by the subcommands.

use std::io::IsTerminal;
use std::sync::OnceLock;

/// Global output flags, set once from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFlags {
    pub json: bool,
    pub quiet: bool,
    pub no_color: bool,
}

static FLAGS: OnceLock<OutputFlags> = OnceLock::new();

pub fn init(flags: OutputFlags) {
    let _ = FLAGS.set(flags);
}

fn flags() -> OutputFlags {
    FLAGS.get().copied().unwrap_or_default()
}

pub fn is_json() -> bool {
    flags().json
}

pub fn is_quiet() -> bool {
    flags().quiet
}

/// Print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

/// Status symbols, colored when stderr is a terminal.
pub struct Styled {
    color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            color: !flags().no_color && std::io::stderr().is_terminal(),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn ok_sym(&self) -> String {
        self.paint("32", "[OK]")
    }

    pub fn warn_sym(&self) -> String {
        self.paint("33", "[!!]")
    }

    pub fn info_sym(&self) -> String {
        self.paint("36", "[..]")
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}
