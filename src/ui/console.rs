// Console front end - text screens and the stdin command reader
//
// The binary has no widget toolkit. Screens print to stdout and user input
// arrives as lines on stdin. The reader thread only parses lines and posts
// them to the UI loop; every command executes on the UI thread.

use crate::models::{DropInfo, InventoryItem, LogRing};
use crate::ui::controller::AppController;
use crate::ui::event_loop::UiHandle;
use crate::ui::screens::{HomeScreen, InventoryScreen, LogsScreen, Screen, ScreenManager, Toaster};
use std::io::{self, BufRead};
use std::thread::JoinHandle;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  login <token>   store the OAuth token and log in
  logout          stop mining and forget the token
  start           start mining
  stop            stop mining
  show <screen>   home, login, inventory, settings, channels, logs
  help            show this help
  quit            save settings and exit";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("{0}")]
    InvalidScreen(String),
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Start,
    Stop,
    Show(Screen),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "login" if rest.is_empty() => Err(CommandError::MissingArgument("login")),
            "login" => Ok(Command::Login(rest.to_string())),
            "logout" => Ok(Command::Logout),
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "show" if rest.is_empty() => Err(CommandError::MissingArgument("show")),
            "show" => rest
                .parse()
                .map(Command::Show)
                .map_err(CommandError::InvalidScreen),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Execute `command` on the UI thread.
///
/// Returns `false` when the UI loop should quit.
pub fn dispatch(controller: &mut AppController, command: Command) -> bool {
    tracing::debug!("Console command: {:?}", command);
    match command {
        Command::Login(token) => controller.login(&token),
        Command::Logout => controller.logout(),
        Command::Start => controller.start_mining(),
        Command::Stop => controller.stop_mining(),
        Command::Show(screen) => {
            controller.show_screen(screen);
            println!("-- {} --", screen);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {
            controller.shutdown();
            return false;
        }
    }
    true
}

/// Spawn the thread that turns stdin lines into posted commands.
///
/// End of input behaves like `quit`.
pub fn spawn_input_reader(ui: UiHandle<AppController>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("dropminer-input".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Failed to read console input: {}", e);
                        break;
                    }
                };

                match Command::parse(&line) {
                    Ok(command) => {
                        let quit = command == Command::Quit;
                        if !post_command(&ui, command) || quit {
                            return;
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => tracing::warn!("{}", e),
                }
            }

            tracing::debug!("Console input closed");
            post_command(&ui, Command::Quit);
        })
}

/// Post `command` to the UI thread, quitting the loop after `quit`.
///
/// Returns `false` once the UI loop is gone.
pub fn post_command(ui: &UiHandle<AppController>, command: Command) -> bool {
    let handle = ui.clone();
    ui.post(move |controller| {
        if !dispatch(controller, command) {
            handle.quit();
        }
    })
}

/// Route SIGINT and SIGTERM through the same path as the `quit` command.
///
/// Can only be installed once per process.
pub fn install_interrupt_handler(ui: UiHandle<AppController>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, shutting down");
        post_command(&ui, Command::Quit);
    })
}

/// Build a [`ScreenManager`] backed by the console screens
pub fn console_screens() -> ScreenManager {
    ScreenManager::new(
        Box::new(ConsoleHome),
        Box::new(ConsoleInventory),
        Box::new(ConsoleLogs),
        Box::new(ConsoleToaster),
    )
}

pub struct ConsoleHome;

impl HomeScreen for ConsoleHome {
    fn update_status(&mut self, status: &str) {
        println!("[status] {}", status);
    }

    fn update_progress(&mut self, current: u64, total: u64) {
        println!("[progress] {}/{} min", current, total);
    }

    fn update_channel(&mut self, channel: &str) {
        println!("[channel] {}", channel);
    }

    fn update_drop(&mut self, drop: &DropInfo) {
        println!("[drop] {}", drop);
    }
}

pub struct ConsoleInventory;

impl InventoryScreen for ConsoleInventory {
    fn update_inventory(&mut self, items: &[InventoryItem]) {
        println!("[inventory]");
        for item in items {
            println!("  {}", item);
        }
    }
}

pub struct ConsoleLogs;

impl LogsScreen for ConsoleLogs {
    fn add_log(&mut self, line: &str) {
        println!("{}", line);
    }

    fn on_enter(&mut self, history: &LogRing) {
        for entry in history.iter() {
            println!("{}", entry.display_line());
        }
    }
}

pub struct ConsoleToaster;

impl Toaster for ConsoleToaster {
    fn show(&mut self, text: &str) {
        println!(">> {}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("login abc123"),
            Ok(Command::Login("abc123".to_string()))
        );
        assert_eq!(Command::parse("  START "), Ok(Command::Start));
        assert_eq!(Command::parse("stop"), Ok(Command::Stop));
        assert_eq!(Command::parse("logout"), Ok(Command::Logout));
        assert_eq!(Command::parse("show Logs"), Ok(Command::Show(Screen::Logs)));
        assert_eq!(Command::parse("?"), Ok(Command::Help));
        assert_eq!(Command::parse("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("   "), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("login"),
            Err(CommandError::MissingArgument("login"))
        );
        assert_eq!(
            Command::parse("show"),
            Err(CommandError::MissingArgument("show"))
        );
        assert!(matches!(
            Command::parse("show attic"),
            Err(CommandError::InvalidScreen(_))
        ));
        assert_eq!(
            Command::parse("mine"),
            Err(CommandError::Unknown("mine".to_string()))
        );
    }
}
