use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tcumux_demux::Demux;
use tcumux_frame::Tag;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConsoleRow {
    pub name: &'static str,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ConsoleRow {
    fn new(tag: Tag, path: Option<PathBuf>) -> Self {
        Self {
            name: tag.name(),
            tag: format!("{:#04x}", tag.byte()),
            path,
        }
    }
}

#[derive(Serialize)]
struct RegistryOutput<'a> {
    device: &'a Path,
    consoles: &'a [ConsoleRow],
}

pub fn registry_rows<T>(demux: &Demux<T>) -> Vec<ConsoleRow> {
    demux
        .channels()
        .map(|channel| ConsoleRow::new(channel.tag(), Some(channel.peer_path().to_path_buf())))
        .collect()
}

pub fn tag_rows() -> Vec<ConsoleRow> {
    Tag::ALL.iter().map(|&tag| ConsoleRow::new(tag, None)).collect()
}

/// Print where each console can be attached.
pub fn print_registry(device: &Path, rows: &[ConsoleRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RegistryOutput {
                device,
                consoles: rows,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONSOLE", "TAG", "TERMINAL"]);
            for row in rows {
                table.add_row(vec![
                    row.name.to_string(),
                    row.tag.clone(),
                    path_text(row.path.as_deref()),
                ]);
            }
            println!("{}", device.display());
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("consoles on {}:", device.display());
            for row in rows {
                println!(
                    "  {:<7} ({}) {}",
                    row.name,
                    row.tag,
                    path_text(row.path.as_deref())
                );
            }
        }
        OutputFormat::Raw => {
            for row in rows {
                println!("{}={}", row.name, path_text(row.path.as_deref()));
            }
        }
    }
}

/// Print the fixed tag assignment.
pub fn print_tags(rows: &[ConsoleRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONSOLE", "TAG"]);
            for row in rows {
                table.add_row(vec![row.name.to_string(), row.tag.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!("{:<7} {}", row.name, row.tag);
            }
        }
        OutputFormat::Raw => {
            for row in rows {
                println!("{}", row.name);
            }
        }
    }
}

fn path_text(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_rows_use_hex_bytes() {
        let rows = tag_rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].name, "SPE");
        assert_eq!(rows[0].tag, "0xe0");
        assert_eq!(rows[5].name, "RCE");
        assert_eq!(rows[5].tag, "0xe5");
    }

    #[test]
    fn registry_json_shape() {
        let rows = vec![ConsoleRow::new(Tag::Bpmp, Some(PathBuf::from("/dev/pts/7")))];
        let out = RegistryOutput {
            device: Path::new("/dev/ttyUSB3"),
            consoles: &rows,
        };
        let json = serde_json::to_string(&out).expect("registry should serialize");
        assert_eq!(
            json,
            r#"{"device":"/dev/ttyUSB3","consoles":[{"name":"BPMP","tag":"0xe2","path":"/dev/pts/7"}]}"#
        );
    }
}
