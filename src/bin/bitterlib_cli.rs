use bitterlib::{
    report::ResultTable,
    search::Presenter,
    settings::Settings,
    shell::{execute_shell_command, parse_shell_tokens, ShellCommand},
};
use serde::Serialize;
use std::env;
use std::io::BufRead;

const DEFAULT_SETTINGS_PATH: &str = "settings.json";

fn usage() {
    eprintln!(
        "Usage:\n  \
  bitterlib_cli --version\n  \
  bitterlib_cli [--settings PATH] settings\n  \
  bitterlib_cli [--settings PATH] init-settings PATH\n  \
  bitterlib_cli [--settings PATH] rebuild [--yes]\n  \
  bitterlib_cli [--settings PATH] compounds RECEPTOR_NAME\n  \
  bitterlib_cli [--settings PATH] compound-ids COMPOUND_NAME\n  \
  bitterlib_cli [--settings PATH] receptors COMPOUND_NAME BITTER_ID\n  \
  bitterlib_cli [--settings PATH] search TERM [--choose BITTER_ID] [--export]\n\n  \
  Settings are read from 'settings.json' unless --settings is given;\n  \
  a missing settings file means built-in defaults"
    );
}

fn load_settings(path: &str) -> Result<Settings, String> {
    if std::path::Path::new(path).exists() {
        Settings::load_from_path(path).map_err(|e| e.to_string())
    } else {
        Ok(Settings::default())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn parse_global_settings_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--settings" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_SETTINGS_PATH.to_string(), 1)
}

fn read_stdin_line() -> Option<String> {
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

/// Terminal-backed presenter: tables on stdout, prompts and notices on
/// stderr.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn choose(&mut self, title: &str, prompt: &str, options: &[i64]) -> Option<i64> {
        let listed = options
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!("{title}");
        eprintln!("{prompt} [{listed}] (empty cancels):");
        let answer = read_stdin_line()?;
        if answer.is_empty() {
            return None;
        }
        match answer.parse::<i64>() {
            Ok(id) if options.contains(&id) => Some(id),
            _ => {
                eprintln!("'{answer}' is not a listed Bitter ID, cancelling");
                None
            }
        }
    }

    fn render_table(&mut self, table: &ResultTable) {
        for (key, value) in &table.metadata {
            println!("# {key}: {value}");
        }
        if !table.headers.is_empty() {
            println!("{}", table.headers.join("\t"));
        }
        for row in &table.rows {
            println!("{}", row.join("\t"));
        }
    }

    fn report(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm(&mut self, question: &str) -> bool {
        eprintln!("{question} [y/N]");
        matches!(read_stdin_line().as_deref(), Some("y" | "Y" | "yes"))
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing command".to_string());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("bitterlib_cli {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (settings_path, cmd_idx) = parse_global_settings_arg(&args);
    if args.len() <= cmd_idx {
        usage();
        return Err("Missing command".to_string());
    }

    let command = parse_shell_tokens(&args[cmd_idx..])?;
    if command == ShellCommand::Help {
        usage();
        return Ok(());
    }

    let settings = load_settings(&settings_path)?;
    let mut presenter = ConsolePresenter;
    let result = execute_shell_command(&settings, &mut presenter, &command)?;

    match &command {
        // The presenter already rendered the table or the notice.
        ShellCommand::Search { .. } => {
            if let Some(path) = result.output.get("exported").and_then(|v| v.as_str()) {
                eprintln!("Exported to '{path}'");
            }
            Ok(())
        }
        _ => print_json(&result.output),
    }
}
