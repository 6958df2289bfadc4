//! Shell commands
//!
//! Command table and the read-eval loop.

use std::io::{self, BufRead, Write};

use crate::engine::Container;
use crate::index::HashIndex;

use super::parser::{split_args, LineBuffer, MAX_ARGS};
use super::{CONTINUATION_PROMPT, PROMPT};

/// Bucket count of the command table
const COMMAND_BUCKETS: usize = 32;

/// Console commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read,
    Write,
    Delete,
    List,
    Rename,
    Clean,
    Help,
    Exit,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Read,
        Command::Write,
        Command::Delete,
        Command::List,
        Command::Rename,
        Command::Clean,
        Command::Help,
        Command::Exit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::Read => "read",
            Command::Write => "write",
            Command::Delete => "delete",
            Command::List => "list",
            Command::Rename => "rename",
            Command::Clean => "clean",
            Command::Help => "help",
            Command::Exit => "exit",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Read => "Read entry",
            Command::Write => "Write entry",
            Command::Delete => "Delete entry",
            Command::List => "Print every entry name",
            Command::Rename => "Change name to a entry",
            Command::Clean => "Remove all",
            Command::Help => "Print help",
            Command::Exit => "Leave console",
        }
    }
}

/// Interactive console bound to one container
pub struct Shell {
    container: Container,
    commands: HashIndex<Command>,
    buffer: LineBuffer,
    running: bool,
}

impl Shell {
    pub fn new(container: Container) -> Self {
        let mut commands = HashIndex::with_capacity(COMMAND_BUCKETS);
        for command in Command::ALL {
            commands.add(command.name(), command);
        }

        Self {
            container,
            commands,
            buffer: LineBuffer::new(),
            running: true,
        }
    }

    /// Read commands from `input` until EOF or `exit`
    pub fn run<R, W, E>(&mut self, mut input: R, out: &mut W, err: &mut E) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut line = String::new();
        while self.running {
            let prompt = if self.buffer.is_continuing() {
                CONTINUATION_PROMPT
            } else {
                PROMPT
            };
            write!(out, "{}", prompt)?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                break;
            }

            match self.buffer.push_line(&line) {
                Ok(Some(command)) => self.exec(&command, out, err)?,
                Ok(None) => {}
                Err(e) => writeln!(err, "{}", e)?,
            }
        }
        Ok(())
    }

    /// Execute one complete command line
    pub fn exec<W: Write, E: Write>(&mut self, line: &str, out: &mut W, err: &mut E) -> io::Result<()> {
        let args = split_args(line, MAX_ARGS);
        let Some(name) = args.first() else {
            return Ok(());
        };

        match self.commands.get(name).copied() {
            Some(command) => self.dispatch(command, &args, out, err),
            None => writeln!(err, "{}: command not found", name),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn into_container(self) -> Container {
        self.container
    }

    // =========================================================================
    // Command Handlers
    // =========================================================================

    fn dispatch<W: Write, E: Write>(
        &mut self,
        command: Command,
        args: &[String],
        out: &mut W,
        err: &mut E,
    ) -> io::Result<()> {
        match command {
            Command::Read => self.cmd_read(args, out, err),
            Command::Write => self.cmd_write(args, out, err),
            Command::Delete => self.cmd_delete(args, out, err),
            Command::List => self.cmd_list(out),
            Command::Rename => self.cmd_rename(args, out),
            Command::Clean => self.cmd_clean(err),
            Command::Help => self.cmd_help(out),
            Command::Exit => {
                self.running = false;
                Ok(())
            }
        }
    }

    fn cmd_read<W: Write, E: Write>(&self, args: &[String], out: &mut W, err: &mut E) -> io::Result<()> {
        if args.len() != 2 {
            return writeln!(out, "{} [name]", args[0]);
        }

        match self.container.read(&args[1]) {
            Ok(data) => {
                out.write_all(data)?;
                out.write_all(b"\n")
            }
            Err(e) if e.is_not_found() => {
                writeln!(err, "{}: entry \"{}\" not found", args[0], args[1])
            }
            Err(e) => writeln!(err, "{}: {}", args[0], e),
        }
    }

    fn cmd_write<W: Write, E: Write>(&mut self, args: &[String], out: &mut W, err: &mut E) -> io::Result<()> {
        if args.len() != 3 {
            return writeln!(out, "{} [name] [string]", args[0]);
        }

        match self.container.write(&args[1], args[2].as_bytes()) {
            Ok(_) => writeln!(out, "DONE"),
            Err(e) => writeln!(err, "{}: can't add entry ({})", args[0], e),
        }
    }

    fn cmd_delete<W: Write, E: Write>(&mut self, args: &[String], out: &mut W, err: &mut E) -> io::Result<()> {
        if args.len() != 2 {
            return writeln!(out, "{} [name]", args[0]);
        }

        match self.container.delete(&args[1]) {
            Ok(()) => writeln!(out, "DONE"),
            Err(e) if e.is_not_found() => {
                writeln!(err, "{}: entry \"{}\" not found", args[0], args[1])
            }
            Err(e) => writeln!(err, "{}: {}", args[0], e),
        }
    }

    fn cmd_list<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for name in self.container.names() {
            writeln!(out, "{}", name)?;
        }
        Ok(())
    }

    fn cmd_rename<W: Write>(&mut self, args: &[String], out: &mut W) -> io::Result<()> {
        if args.len() != 3 {
            return writeln!(out, "{} [name] [newname]", args[0]);
        }

        match self.container.rename(&args[1], &args[2]) {
            Ok(()) => writeln!(out, "OK"),
            Err(e) => {
                tracing::debug!(error = %e, "Rename failed");
                writeln!(out, "Can't rename entry")
            }
        }
    }

    fn cmd_clean<E: Write>(&mut self, err: &mut E) -> io::Result<()> {
        match self.container.clean_up() {
            Ok(()) => Ok(()),
            Err(e) => writeln!(err, "clean: {}", e),
        }
    }

    fn cmd_help<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for command in Command::ALL {
            writeln!(out, "{}\t:{}", command.name(), command.description())?;
        }
        Ok(())
    }
}
