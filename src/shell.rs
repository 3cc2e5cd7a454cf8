use std::fmt;
use std::io::{self, BufRead, Write};

use log::{debug, info};

use crate::region::{AllocError, ProcessId, RegionAllocator};

const PROMPT: &str = "> ";
const USAGE: &str = "Commands: add <id> <size>, remove <id>, stat, compact, help, exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    UnexpectedArgument(String),
    InvalidSize(String),
    InvalidId(AllocError),
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            ParseError::MissingArgument(what) => write!(f, "missing {what}"),
            ParseError::UnexpectedArgument(arg) => write!(f, "unexpected argument `{arg}`"),
            ParseError::InvalidSize(size) => {
                write!(f, "`{size}` is not a positive integer size")
            }
            ParseError::InvalidId(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(ProcessId, u32),
    Remove(ProcessId),
    Stat,
    Compact,
    Help,
    Exit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        let command = match name {
            "add" => {
                let id = next_id(&mut words)?;
                let size = words.next().ok_or(ParseError::MissingArgument("size"))?;
                let size = match size.parse::<u32>() {
                    Ok(size) if size > 0 => size,
                    _ => return Err(ParseError::InvalidSize(size.to_string())),
                };
                Command::Add(id, size)
            }
            "remove" => Command::Remove(next_id(&mut words)?),
            "stat" => Command::Stat,
            "compact" => Command::Compact,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(ParseError::UnexpectedArgument(extra.to_string()));
        }

        Ok(Some(command))
    }
}

fn next_id<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<ProcessId, ParseError> {
    let id = words.next().ok_or(ParseError::MissingArgument("process id"))?;
    ProcessId::new(id).map_err(ParseError::InvalidId)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Owns the allocator for the lifetime of an interactive session and renders outcomes to `out`.
pub struct Session<W: Write> {
    allocator: RegionAllocator,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(allocator: RegionAllocator, out: W) -> Self {
        Self { allocator, out }
    }

    pub fn allocator(&self) -> &RegionAllocator {
        &self.allocator
    }

    pub fn into_inner(self) -> (RegionAllocator, W) {
        (self.allocator, self.out)
    }

    pub fn execute(&mut self, command: Command) -> io::Result<Flow> {
        debug!("executing {command:?}");

        match command {
            Command::Add(id, size) => match self.allocator.allocate(&id, size) {
                Ok(()) => writeln!(self.out, "Process {id} added.")?,
                Err(AllocError::AlreadyAllocated) => {
                    writeln!(self.out, "Process {id} is already allocated.")?
                }
                Err(err) => writeln!(self.out, "Cannot add process {id}: {err}.")?,
            },
            Command::Remove(id) => match self.allocator.free(&id) {
                Ok(_) => writeln!(self.out, "Process {id} removed.")?,
                Err(_) => writeln!(self.out, "Process {id} not found.")?,
            },
            Command::Stat => self.print_status()?,
            Command::Compact => {
                self.allocator.compact();
                writeln!(self.out, "Memory compacted.")?;
            }
            Command::Help => writeln!(self.out, "{USAGE}")?,
            Command::Exit => return Ok(Flow::Exit),
        }

        Ok(Flow::Continue)
    }

    fn print_status(&mut self) -> io::Result<()> {
        writeln!(self.out, "\nCurrent memory layout:")?;
        for region in self.allocator.snapshot() {
            writeln!(self.out, "{region}")?;
        }
        writeln!(self.out, "{}\n", self.allocator.stats())
    }

    /// Reads commands from `input` until `exit` or end of input.
    pub fn run<R: BufRead>(&mut self, input: R) -> io::Result<()> {
        writeln!(self.out, "Memory Allocator CLI")?;
        writeln!(self.out, "{USAGE}")?;

        let mut lines = input.lines();
        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(self.out)?;
                break;
            };

            match Command::parse(&line?) {
                Ok(Some(command)) => {
                    if self.execute(command)? == Flow::Exit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => writeln!(self.out, "Invalid command: {err}.")?,
            }
        }

        info!("session finished, {}", self.allocator.stats());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> ProcessId {
        ProcessId::new(id).unwrap()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(
            Command::parse("add A 200"),
            Ok(Some(Command::Add(pid("A"), 200)))
        );
        assert_eq!(
            Command::parse("  remove   A "),
            Ok(Some(Command::Remove(pid("A"))))
        );
        assert_eq!(Command::parse("stat"), Ok(Some(Command::Stat)));
        assert_eq!(Command::parse("compact"), Ok(Some(Command::Compact)));
        assert_eq!(Command::parse("quit"), Ok(Some(Command::Exit)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            Command::parse("alloc A 1"),
            Err(ParseError::UnknownCommand("alloc".to_string()))
        );
        assert_eq!(
            Command::parse("add A"),
            Err(ParseError::MissingArgument("size"))
        );
        assert_eq!(
            Command::parse("remove"),
            Err(ParseError::MissingArgument("process id"))
        );
        assert_eq!(
            Command::parse("add A -5"),
            Err(ParseError::InvalidSize("-5".to_string()))
        );
        assert_eq!(
            Command::parse("add A 0"),
            Err(ParseError::InvalidSize("0".to_string()))
        );
        assert_eq!(
            Command::parse("add free 10"),
            Err(ParseError::InvalidId(AllocError::InvalidId))
        );
        assert_eq!(
            Command::parse("stat now"),
            Err(ParseError::UnexpectedArgument("now".to_string()))
        );
    }

    #[test]
    fn execute_reports_outcomes() {
        let allocator = RegionAllocator::new(100).unwrap();
        let mut session = Session::new(allocator, Vec::new());

        session.execute(Command::Add(pid("A"), 60)).unwrap();
        session.execute(Command::Add(pid("A"), 10)).unwrap();
        session.execute(Command::Add(pid("B"), 60)).unwrap();
        session.execute(Command::Remove(pid("Z"))).unwrap();
        session.execute(Command::Remove(pid("A"))).unwrap();
        assert_eq!(session.execute(Command::Exit).unwrap(), Flow::Exit);

        let (_, out) = session.into_inner();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Process A added.");
        assert_eq!(lines[1], "Process A is already allocated.");
        assert!(lines[2].starts_with("Cannot add process B: not enough space for 60"));
        assert_eq!(lines[3], "Process Z not found.");
        assert_eq!(lines[4], "Process A removed.");
    }

    #[test]
    fn stat_prints_region_table() {
        let mut allocator = RegionAllocator::new(1000).unwrap();
        allocator.allocate(&pid("A"), 200).unwrap();
        let mut session = Session::new(allocator, Vec::new());

        session.execute(Command::Stat).unwrap();

        let (_, out) = session.into_inner();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(
            "Current memory layout:\n[0 - 199] Process A (200)\n[200 - 999] Free (800)\n"
        ));
    }
}
