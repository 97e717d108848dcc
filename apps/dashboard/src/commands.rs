//! Line commands typed into the dashboard prompt.

use shared::domain::Status;

pub const HELP: &str = "\
commands:
  level <label>                 show another level
  status <unit> <stage>         pre-rock | pre-insulate | cover | approved | issue | clear | \"label\"
  comment <unit> <text>         add a comment
  resolve <unit> <index>        toggle a comment's resolved flag (index starts at 0)
  expand <unit>                 show or hide a unit's comments
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    SelectLevel {
        level: String,
    },
    ChangeStatus {
        unit_number: String,
        status: Option<Status>,
    },
    AddComment {
        unit_number: String,
        text: String,
    },
    ToggleResolved {
        unit_number: String,
        comment_index: usize,
    },
    ToggleExpanded {
        unit_number: String,
    },
    Help,
    Quit,
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn unit_and_rest<'a>(rest: &'a str, usage: &str) -> Result<(String, &'a str), String> {
    let (unit_number, tail) = split_word(rest);
    if unit_number.is_empty() {
        return Err(format!("usage: {usage}"));
    }
    Ok((unit_number.to_string(), tail))
}

/// Stage shorthand or a literal label. `clear` unsets the status.
pub fn parse_status(raw: &str) -> Result<Option<Status>, String> {
    let raw = raw.trim();
    let status = match raw.to_ascii_lowercase().as_str() {
        "" => return Err("missing status".to_string()),
        "pre-rock" | "prerock" => Status::OkToPreRock,
        "pre-insulate" | "preinsulate" => Status::OkToPreInsulate,
        "cover" => Status::OkToCover,
        "approved" => Status::Approved,
        "issue" => Status::Issue,
        "clear" | "none" => return Ok(None),
        _ => {
            let label = raw
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .unwrap_or(raw);
            if label.trim().is_empty() {
                return Err("empty status label; use clear to unset".to_string());
            }
            return Ok(Status::from_label(label));
        }
    };
    Ok(Some(status))
}

pub fn parse_command(line: &str) -> Result<Option<DashboardCommand>, String> {
    let (verb, rest) = split_word(line);
    let command = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "level" => {
            if rest.is_empty() {
                return Err("usage: level <label>".to_string());
            }
            DashboardCommand::SelectLevel {
                level: rest.to_string(),
            }
        }
        "status" => {
            let (unit_number, stage) = unit_and_rest(rest, "status <unit> <stage>")?;
            DashboardCommand::ChangeStatus {
                unit_number,
                status: parse_status(stage)?,
            }
        }
        "comment" => {
            let (unit_number, text) = unit_and_rest(rest, "comment <unit> <text>")?;
            if text.is_empty() {
                return Err("comment text is empty".to_string());
            }
            DashboardCommand::AddComment {
                unit_number,
                text: text.to_string(),
            }
        }
        "resolve" => {
            let (unit_number, index) = unit_and_rest(rest, "resolve <unit> <index>")?;
            let comment_index = index
                .parse()
                .map_err(|_| format!("comment index must be a number, got {index:?}"))?;
            DashboardCommand::ToggleResolved {
                unit_number,
                comment_index,
            }
        }
        "expand" => {
            let (unit_number, _) = unit_and_rest(rest, "expand <unit>")?;
            DashboardCommand::ToggleExpanded { unit_number }
        }
        "help" | "?" => DashboardCommand::Help,
        "quit" | "exit" | "q" => DashboardCommand::Quit,
        other => return Err(format!("unknown command {other:?}; type help")),
    };
    Ok(Some(command))
}
