//! Output formatters for assembly results.
//!
//! Trait-based formatters for rendering an [`AssemblyOutput`] in various
//! shapes (human-readable page listing, JSON, compact).

use crate::types::{AssemblyOutput, LabelAddress, Warning};
use std::collections::BTreeMap;

/// Trait for formatting assembly outputs.
///
/// Implementors provide methods for rendering each component of the
/// output, plus a method to render the whole.
pub trait OutputFormatter {
    /// Format the source name header.
    fn format_header(&self, source: &str) -> Option<String>;

    /// Format the compiled ROM banks.
    fn format_rom_pages(&self, rom_pages: &BTreeMap<u8, String>) -> Option<String>;

    /// Format the compiled RAM image.
    fn format_ram_image(&self, ram_image: &BTreeMap<u16, String>) -> Option<String>;

    /// Format the label/address map.
    fn format_labels(&self, labels: &BTreeMap<String, LabelAddress>) -> Option<String>;

    /// Format soft warnings.
    fn format_warnings(&self, warnings: &[Warning]) -> Option<String>;

    /// Format the complete output.
    ///
    /// Default implementation concatenates all component outputs.
    fn format_output(&self, output: &AssemblyOutput, source: &str) -> String {
        let mut parts = Vec::new();
        if let Some(s) = self.format_header(source) {
            parts.push(s);
        }
        if let Some(s) = self.format_rom_pages(&output.rom_pages) {
            parts.push(s);
        }
        if let Some(s) = self.format_ram_image(&output.ram_image) {
            parts.push(s);
        }
        if let Some(s) = self.format_labels(&output.labels) {
            parts.push(s);
        }
        if let Some(s) = self.format_warnings(&output.warnings) {
            parts.push(s);
        }
        parts.join("")
    }
}

/// Human-readable page listing, one `Rom n: …` line per page.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Include the label/address map.
    pub verbose: bool,
    /// Suppress the header and warnings.
    pub quiet: bool,
}

impl OutputFormatter for HumanFormatter {
    fn format_header(&self, source: &str) -> Option<String> {
        if self.quiet {
            return None;
        }
        Some(format!("File: {}\n", source))
    }

    fn format_rom_pages(&self, rom_pages: &BTreeMap<u8, String>) -> Option<String> {
        let mut text = String::new();
        for (page, nibbles) in rom_pages {
            text.push_str(&format!("Rom {}: {}\n", page, nibbles));
        }
        Some(text)
    }

    fn format_ram_image(&self, ram_image: &BTreeMap<u16, String>) -> Option<String> {
        let mut text = String::new();
        for (addr, nibbles) in ram_image {
            text.push_str(&format!("Ram {}: {}\n", addr, nibbles));
        }
        Some(text)
    }

    fn format_labels(&self, labels: &BTreeMap<String, LabelAddress>) -> Option<String> {
        if !self.verbose || labels.is_empty() {
            return None;
        }
        let mut text = String::from("Labels:\n");
        for (name, address) in labels {
            text.push_str(&format!(
                "  {} = {} + {}\n",
                name, address.page, address.offset
            ));
        }
        Some(text)
    }

    fn format_warnings(&self, warnings: &[Warning]) -> Option<String> {
        if self.quiet || warnings.is_empty() {
            return None;
        }
        let mut text = String::new();
        for warning in warnings {
            text.push_str(&format!("warning: {}\n", warning));
        }
        Some(text)
    }
}

/// JSON output, a serde projection of the whole [`AssemblyOutput`].
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Pretty-print with indentation.
    pub pretty: bool,
}

impl OutputFormatter for JsonFormatter {
    fn format_header(&self, _source: &str) -> Option<String> {
        None
    }

    fn format_rom_pages(&self, _rom_pages: &BTreeMap<u8, String>) -> Option<String> {
        None
    }

    fn format_ram_image(&self, _ram_image: &BTreeMap<u16, String>) -> Option<String> {
        None
    }

    fn format_labels(&self, _labels: &BTreeMap<String, LabelAddress>) -> Option<String> {
        None
    }

    fn format_warnings(&self, _warnings: &[Warning]) -> Option<String> {
        None
    }

    fn format_output(&self, output: &AssemblyOutput, source: &str) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            source: &'a str,
            #[serde(flatten)]
            output: &'a AssemblyOutput,
        }

        let wrapped = JsonOutput { source, output };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&wrapped)
        } else {
            serde_json::to_string(&wrapped)
        };
        // Serialization of plain maps and strings cannot fail.
        rendered.unwrap_or_default()
    }
}

/// Compact tab-separated output, one page per line with spacing stripped.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl OutputFormatter for ShortFormatter {
    fn format_header(&self, _source: &str) -> Option<String> {
        None
    }

    fn format_rom_pages(&self, rom_pages: &BTreeMap<u8, String>) -> Option<String> {
        let mut text = String::new();
        for (page, nibbles) in rom_pages {
            text.push_str(&format!(
                "rom\t{}\t{}\n",
                page,
                crate::types::strip_spacing(nibbles)
            ));
        }
        Some(text)
    }

    fn format_ram_image(&self, ram_image: &BTreeMap<u16, String>) -> Option<String> {
        let mut text = String::new();
        for (addr, nibbles) in ram_image {
            text.push_str(&format!(
                "ram\t{}\t{}\n",
                addr,
                crate::types::strip_spacing(nibbles)
            ));
        }
        Some(text)
    }

    fn format_labels(&self, _labels: &BTreeMap<String, LabelAddress>) -> Option<String> {
        None
    }

    fn format_warnings(&self, _warnings: &[Warning]) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn sample() -> AssemblyOutput {
        assemble(".PROM 0\n.LABEL start\nPASS\nBRANCH Z start").unwrap()
    }

    #[test]
    fn test_human_listing() {
        let text = HumanFormatter::default().format_output(&sample(), "demo.p16");
        assert!(text.contains("File: demo.p16"));
        assert!(text.contains("Rom 0: 0 3200"));
    }

    #[test]
    fn test_human_verbose_lists_labels() {
        let formatter = HumanFormatter {
            verbose: true,
            quiet: false,
        };
        let text = formatter.format_output(&sample(), "demo.p16");
        assert!(text.contains("start = ROM 0 + 0"));
    }

    #[test]
    fn test_json_round_trips() {
        let text = JsonFormatter::default().format_output(&sample(), "demo.p16");
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["source"], "demo.p16");
        assert_eq!(value["rom_pages"]["0"], "0 3200");
    }

    #[test]
    fn test_short_strips_spacing() {
        let text = ShortFormatter.format_output(&sample(), "demo.p16");
        assert!(text.contains("rom\t0\t03200"));
    }
}
