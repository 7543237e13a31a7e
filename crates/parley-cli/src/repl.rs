//! Interactive REPL for a running roster.
//!
//! The main thread owns the line editor. Every plain line is posted to the
//! blackboard as a `user` message; a background task on the runtime waits on
//! the blackboard's tail channel and prints agent output above the prompt as
//! it lands.

use std::path::PathBuf;
use std::sync::Arc;

use parley_board::{Blackboard, Message, MessageId};
use parley_orchestrator::Orchestrator;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, ExternalPrinter, Helper};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::display::{format_agents, Palette};
use crate::error::Result;

/// Tab completion for slash commands.
struct CommandCompleter;

impl CommandCompleter {
    const COMMANDS: &'static [&'static str] = &["/agents", "/help", "/history", "/quit"];
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches = Self::COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Print the whole blackboard
    History,
    /// List the roster
    Agents,
    /// Show help
    Help,
    /// Stop the session
    Quit,
    /// Unrecognised slash command
    Unknown(String),
    /// Plain text, posted as a user message
    Text(String),
}

impl ReplCommand {
    /// Parses one input line.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        if let Some(stripped) = input.strip_prefix('/') {
            let cmd = stripped.split_whitespace().next().unwrap_or("").to_lowercase();
            return match cmd.as_str() {
                "history" => ReplCommand::History,
                "agents" => ReplCommand::Agents,
                "help" | "h" | "?" => ReplCommand::Help,
                "quit" | "exit" | "q" => ReplCommand::Quit,
                _ => ReplCommand::Unknown(cmd),
            };
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => ReplCommand::Text(input.to_string()),
        }
    }
}

/// Prints lines straight to stdout when the editor cannot provide a printer.
struct StdoutPrinter;

impl ExternalPrinter for StdoutPrinter {
    fn print(&mut self, msg: String) -> rustyline::Result<()> {
        println!("{}", msg);
        Ok(())
    }
}

type Printer = Box<dyn ExternalPrinter + Send>;

/// Messages past `last_seen` that should be shown live, advancing `last_seen`.
///
/// User messages are skipped: the terminal already shows what was typed.
pub fn drain(board: &Blackboard, last_seen: &mut MessageId) -> Vec<Arc<Message>> {
    let fresh = board.since(*last_seen);
    if let Some(last) = fresh.last() {
        *last_seen = last.id();
    }
    fresh.into_iter().filter(|m| !m.sender().is_user()).collect()
}

/// Prints agent output until told to stop, then prints what is left.
async fn print_new_messages(
    board: Arc<Blackboard>,
    mut last_seen: MessageId,
    mut out: Printer,
    palette: Palette,
    mut stop: watch::Receiver<bool>,
) {
    let mut tail = board.subscribe();

    loop {
        for message in drain(&board, &mut last_seen) {
            if out.print(palette.format_message(&message)).is_err() {
                return;
            }
        }
        tokio::select! {
            changed = tail.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = stop.changed() => break,
        }
    }

    for message in drain(&board, &mut last_seen) {
        let _ = out.print(palette.format_message(&message));
    }
}

/// REPL state
pub struct Repl {
    editor: Editor<CommandCompleter, DefaultHistory>,
    orchestrator: Orchestrator,
    runtime: Runtime,
    roster: String,
    history_path: Option<PathBuf>,
    palette: Palette,
}

impl Repl {
    /// Creates a REPL around an orchestrator that has not been started yet.
    pub fn new(orchestrator: Orchestrator, roster: impl Into<String>) -> Result<Self> {
        let config = rustyline::Config::builder()
            .completion_type(rustyline::CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CommandCompleter));

        let palette = Palette::for_terminal(orchestrator.agents().into_iter().map(|(name, _)| name));

        Ok(Self {
            editor,
            orchestrator,
            runtime: Runtime::new()?,
            roster: roster.into(),
            history_path: None,
            palette,
        })
    }

    /// Loads and saves line history at `path`.
    pub fn with_history(mut self, path: PathBuf) -> Self {
        if path.exists() {
            let _ = self.editor.load_history(&path);
        }
        self.history_path = Some(path);
        self
    }

    /// Runs the REPL loop until `/quit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        self.runtime.block_on(self.orchestrator.start())?;

        let printer: Printer = match self.editor.create_external_printer() {
            Ok(p) => Box::new(p),
            Err(e) => {
                debug!("external printer unavailable: {}", e);
                Box::new(StdoutPrinter)
            }
        };
        let board = Arc::clone(self.orchestrator.board());
        let from = board.tail_id();
        let (stop_tx, stop_rx) = watch::channel(false);
        let printer_task: JoinHandle<()> = self.runtime.spawn(print_new_messages(
            board,
            from,
            printer,
            self.palette.clone(),
            stop_rx,
        ));

        println!("Parley v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Roster '{}' with {} agents. Type /help for commands, /quit to exit",
            self.roster,
            self.orchestrator.agents().len()
        );
        println!();

        let result = self.read_loop();

        let orchestrator = &mut self.orchestrator;
        self.runtime.block_on(async move {
            if let Err(e) = orchestrator.shutdown().await {
                warn!("shutdown: {}", e);
            }
            let _ = stop_tx.send(true);
            let _ = printer_task.await;
        });

        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }

        println!("Goodbye!");
        result
    }

    fn read_loop(&mut self) -> Result<()> {
        loop {
            match self.editor.readline("you> ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line.as_str())?;

                    let cmd = ReplCommand::parse(&line);
                    debug!(?cmd, "parsed input");
                    if self.handle_command(cmd)? {
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Handles one command. Returns true if the session should end.
    fn handle_command(&mut self, cmd: ReplCommand) -> Result<bool> {
        match cmd {
            ReplCommand::Text(text) => {
                self.orchestrator.post_user(text)?;
            }
            ReplCommand::History => {
                let messages = self.orchestrator.since(0);
                if messages.is_empty() {
                    println!("(no messages yet)");
                }
                for message in messages {
                    println!("{}", self.palette.format_message(&message));
                }
            }
            ReplCommand::Agents => {
                println!("{}", format_agents(&self.orchestrator.agents()));
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => return Ok(true),
            ReplCommand::Unknown(cmd) => {
                println!("Unknown command: /{} (try /help)", cmd);
            }
        }
        Ok(false)
    }
}

fn print_help() {
    println!("Anything you type is posted to the board as a user message.");
    println!();
    println!("  /history   Print every message on the board");
    println!("  /agents    List the agents in evaluation order");
    println!("  /help      Show this help");
    println!("  /quit      Stop the agents and exit (also: quit, exit, q)");
}
