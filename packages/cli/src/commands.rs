// ABOUTME: Parser for chat input lines
// ABOUTME: Plain text goes to the planner; lines starting with ':' are session commands

use std::path::PathBuf;

use seedplan_planner::{Language, Rating};

pub const HELP_TEXT: &str = "\
Commands:
  :verify N           re-check legal requirement N against current sources
  :script <context>   write a negotiation script (e.g. :script landlord)
  :places <category>  list nearby places (e.g. :places wholesale markets)
  :rate up|down       rate the latest plan update
  :done N             toggle checklist step N
  :breakeven          show the break-even calculator and cash flow
  :export <path>      write the plan as paginated markdown
  :language <tag>     switch language (auto, en, hi, kn, ta, te, mr, bn, gu)
  :plan               show the current plan
  :reset              start over
  :help               show this help
  :quit               exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Zero-based legal requirement index
    Verify(usize),
    Script(String),
    Places(String),
    Rate(Rating),
    /// Zero-based checklist index
    Done(usize),
    BreakEven,
    Export(PathBuf),
    Language(Language),
    Plan,
    Reset,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Empty,
    Text(String),
    Command(ChatCommand),
    Invalid(String),
}

/// Users count from 1
fn position(arg: &str, what: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("{} needs a number starting at 1", what)),
    }
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(arg)
    }
}

fn parse_command(body: &str) -> Result<ChatCommand, String> {
    let (name, arg) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    match name.to_lowercase().as_str() {
        "verify" => position(arg, ":verify").map(ChatCommand::Verify),
        "script" => required(arg, ":script <context>").map(|c| ChatCommand::Script(c.to_string())),
        "places" => {
            required(arg, ":places <category>").map(|c| ChatCommand::Places(c.to_string()))
        }
        "rate" => match arg.trim().to_lowercase().as_str() {
            "up" | "+" => Ok(ChatCommand::Rate(Rating::Up)),
            "down" | "-" => Ok(ChatCommand::Rate(Rating::Down)),
            _ => Err("usage: :rate up|down".to_string()),
        },
        "done" => position(arg, ":done").map(ChatCommand::Done),
        "breakeven" => Ok(ChatCommand::BreakEven),
        "export" => required(arg, ":export <path>").map(|p| ChatCommand::Export(PathBuf::from(p))),
        "language" | "lang" => required(arg, ":language <tag>")?
            .parse::<Language>()
            .map(ChatCommand::Language),
        "plan" => Ok(ChatCommand::Plan),
        "reset" => Ok(ChatCommand::Reset),
        "help" | "?" => Ok(ChatCommand::Help),
        "quit" | "exit" | "q" => Ok(ChatCommand::Quit),
        other => Err(format!("unknown command ':{}' (try :help)", other)),
    }
}

pub fn parse_line(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    match line.strip_prefix(':') {
        Some(body) => match parse_command(body.trim()) {
            Ok(command) => ChatInput::Command(command),
            Err(message) => ChatInput::Invalid(message),
        },
        None => ChatInput::Text(line.to_string()),
    }
}
