//! Key scripts: one sheet action per line.
//!
//! ```text
//! # comments and blank lines are skipped
//! select Revenue 2024-01
//! key 5
//! key Enter
//! select-sub Regions West 2024-02
//! type 42
//! paste 10\t20\t30
//! choose actual
//! rename Revenue Sales
//! undo
//! ```
//!
//! Variables are named by id or title. `paste` understands `\t` and `\n`
//! escapes so a clipboard run fits on one line.

use std::fmt;
use std::str::FromStr;

use forecast_core::{Month, VariableId};
use forecast_engine::{Choice, ForecastSheet, KeyInput, MemoryStore, SegmentMode, SheetError};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select { variable: String, month: Month },
    SelectSub { variable: String, name: String, month: Month },
    Key(KeyInput),
    Type(String),
    Paste(String),
    Choose(Choice),
    Expand(String),
    Hide(String),
    Show(String),
    Toggle,
    Mode(SegmentMode),
    ClickOutside,
    Undo,
    Redo,
    Rename { variable: String, title: String },
    Create(String),
    Delete(String),
}

/// Script line that does not parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();
        let month = |s: &str| s.parse::<Month>().map_err(|e| e.to_string());
        let arity = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(format!("'{}' takes {} argument(s), got {}", verb, n, args.len()))
            }
        };

        let command = match verb {
            "select" => {
                arity(2)?;
                Command::Select { variable: args[0].to_string(), month: month(args[1])? }
            }
            "select-sub" => {
                arity(3)?;
                Command::SelectSub {
                    variable: args[0].to_string(),
                    name: args[1].to_string(),
                    month: month(args[2])?,
                }
            }
            "key" => {
                arity(1)?;
                Command::Key(args[0].parse::<KeyInput>().map_err(|e| e.to_string())?)
            }
            "type" => Command::Type(rest.to_string()),
            "paste" => Command::Paste(unescape(rest)),
            "choose" => {
                arity(1)?;
                Command::Choose(match args[0].to_ascii_lowercase().as_str() {
                    "actual" => Choice::Actual,
                    "projected" => Choice::Projected,
                    "both" => Choice::Both,
                    other => return Err(format!("unknown choice '{}'", other)),
                })
            }
            "expand" => {
                arity(1)?;
                Command::Expand(args[0].to_string())
            }
            "hide" => {
                arity(1)?;
                Command::Hide(args[0].to_string())
            }
            "show" => {
                arity(1)?;
                Command::Show(args[0].to_string())
            }
            "toggle" => Command::Toggle,
            "mode" => {
                arity(1)?;
                Command::Mode(match args[0] {
                    "basic" => SegmentMode::Basic,
                    "expression" => SegmentMode::Expression,
                    other => return Err(format!("unknown mode '{}'", other)),
                })
            }
            "click-outside" => Command::ClickOutside,
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "rename" => {
                arity(2)?;
                Command::Rename { variable: args[0].to_string(), title: args[1].to_string() }
            }
            "create" => {
                arity(1)?;
                Command::Create(args[0].to_string())
            }
            "delete" => {
                arity(1)?;
                Command::Delete(args[0].to_string())
            }
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(command)
    }
}

fn unescape(text: &str) -> String {
    text.replace("\\t", "\t").replace("\\n", "\n")
}

/// Parse a whole script, skipping blank lines and `#` comments.
pub fn parse_script(source: &str) -> Result<Vec<(usize, Command)>, ParseError> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            line.parse()
                .map(|cmd| (i + 1, cmd))
                .map_err(|message| ParseError { line: i + 1, message })
        })
        .collect()
}

/// Failure while running a parsed script.
#[derive(Debug)]
pub enum RunError {
    /// A variable named in the script does not exist.
    UnknownVariable { line: usize, name: String },
    Sheet { line: usize, error: SheetError },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UnknownVariable { line, name } => write!(f, "line {}: no variable '{}'", line, name),
            RunError::Sheet { line, error } => write!(f, "line {}: {}", line, error),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Sheet { error, .. } => Some(error),
            _ => None,
        }
    }
}

fn resolve(sheet: &ForecastSheet<MemoryStore>, line: usize, name: &str) -> Result<VariableId, RunError> {
    sheet
        .variables()
        .iter()
        .find(|v| v.id.as_str() == name)
        .or_else(|| sheet.variables().iter().find(|v| v.title == name))
        .map(|v| v.id.clone())
        .ok_or_else(|| RunError::UnknownVariable { line, name: name.to_string() })
}

/// Run `commands` against `sheet`, stopping at the first error.
pub fn run(sheet: &mut ForecastSheet<MemoryStore>, commands: &[(usize, Command)]) -> Result<(), RunError> {
    for (line, command) in commands {
        let line = *line;
        let result: Result<String, SheetError> = match command {
            Command::Select { variable, month } => {
                let id = resolve(sheet, line, variable)?;
                sheet.select_cell(&id, *month).map(|ok| format!("selected: {}", ok))
            }
            Command::SelectSub { variable, name, month } => {
                let id = resolve(sheet, line, variable)?;
                sheet.select_sub_frame(&id, name, *month).map(|ok| format!("selected: {}", ok))
            }
            Command::Key(input) => sheet.handle_key(*input).map(|o| format!("{:?}", o)),
            Command::Type(text) => sheet.type_text(text).map(|o| format!("{:?}", o)),
            Command::Paste(text) => sheet.paste(text).map(|o| format!("{:?}", o)),
            Command::Choose(choice) => sheet.choose(*choice).map(|o| format!("{:?}", o)),
            Command::Expand(variable) => {
                let id = resolve(sheet, line, variable)?;
                Ok(format!("expanded: {:?}", sheet.toggle_expanded(&id)))
            }
            Command::Hide(variable) => {
                let id = resolve(sheet, line, variable)?;
                sheet.set_hidden(&id, true);
                Ok("hidden".to_string())
            }
            Command::Show(variable) => {
                let id = resolve(sheet, line, variable)?;
                sheet.set_hidden(&id, false);
                Ok("shown".to_string())
            }
            Command::Toggle => Ok(format!("toggled: {}", sheet.toggle_editor_target())),
            Command::Mode(mode) => Ok(format!("mode: {}", sheet.set_segment_mode(*mode))),
            Command::ClickOutside => sheet.click_outside().map(|o| format!("{:?}", o)),
            Command::Undo => sheet.undo().map(|e| format!("undo: {:?}", e.map(|e| e.kind))),
            Command::Redo => sheet.redo().map(|e| format!("redo: {:?}", e.map(|e| e.kind))),
            Command::Rename { variable, title } => {
                let id = resolve(sheet, line, variable)?;
                sheet
                    .update_variable_title(&id, title)
                    .map(|n| format!("renamed, {} expressions repaired", n))
            }
            Command::Create(title) => sheet.create_variable(title).map(|id| format!("created {}", id)),
            Command::Delete(variable) => {
                let id = resolve(sheet, line, variable)?;
                sheet.delete_variable(&id).map(|ok| format!("deleted: {}", ok))
            }
        };
        let outcome = result.map_err(|error| RunError::Sheet { line, error })?;
        log::debug!("line {}: {}", line, outcome);
    }
    Ok(())
}
