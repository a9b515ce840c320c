use crate::{
    report::ResultTable,
    search::{run_search, Presenter, SearchOutcome},
    settings::Settings,
    store::Store,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    ShowSettings,
    InitSettings { path: String },
    Rebuild { assume_yes: bool },
    CompoundsByReceptor { receptor: String },
    CompoundIds { name: String },
    ReceptorsByCompound { name: String, id: i64 },
    Search {
        term: String,
        choose: Option<i64>,
        export: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ShellRunResult {
    pub state_changed: bool,
    pub output: Value,
}

impl ShellCommand {
    pub fn preview(&self) -> String {
        match self {
            Self::Help => "show shell command help".to_string(),
            Self::ShowSettings => "show effective settings".to_string(),
            Self::InitSettings { path } => {
                format!("write a default settings file to '{path}'")
            }
            Self::Rebuild { assume_yes: true } => {
                "rebuild the store without confirmation".to_string()
            }
            Self::Rebuild { assume_yes: false } => {
                "rebuild the store from the configured source files".to_string()
            }
            Self::CompoundsByReceptor { receptor } => {
                format!("list compounds detected by receptor '{receptor}'")
            }
            Self::CompoundIds { name } => {
                format!("list Bitter IDs for compound name '{name}'")
            }
            Self::ReceptorsByCompound { name, id } => {
                format!("list receptors detecting compound '{name}' (Bitter ID {id})")
            }
            Self::Search {
                term,
                choose,
                export,
            } => {
                let chosen = choose
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                format!("search '{term}' (choose={chosen}, export={export})")
            }
        }
    }

    pub fn is_state_mutating(&self) -> bool {
        matches!(self, Self::Rebuild { .. })
    }
}

pub fn shell_help_text() -> &'static str {
    "bitterlib shell commands:\n\
help\n\
settings\n\
init-settings PATH\n\
rebuild [--yes]\n\
compounds RECEPTOR_NAME\n\
compound-ids COMPOUND_NAME\n\
receptors COMPOUND_NAME BITTER_ID\n\
search TERM [--choose BITTER_ID] [--export]"
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .map_err(|_| format!("Invalid Bitter ID '{raw}', expected an integer"))
}

fn token_error(command: &str) -> String {
    format!("Invalid '{command}' usage. Try: help")
}

pub fn parse_shell_tokens(tokens: &[String]) -> Result<ShellCommand, String> {
    if tokens.is_empty() {
        return Err("Missing shell command".to_string());
    }
    let cmd = tokens[0].as_str();
    match cmd {
        "help" | "-h" | "--help" => Ok(ShellCommand::Help),
        "settings" => {
            if tokens.len() == 1 {
                Ok(ShellCommand::ShowSettings)
            } else {
                Err(token_error(cmd))
            }
        }
        "init-settings" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::InitSettings {
                    path: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "rebuild" => match tokens.len() {
            1 => Ok(ShellCommand::Rebuild { assume_yes: false }),
            2 if tokens[1] == "--yes" => Ok(ShellCommand::Rebuild { assume_yes: true }),
            _ => Err(token_error(cmd)),
        },
        "compounds" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::CompoundsByReceptor {
                    receptor: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "compound-ids" => {
            if tokens.len() == 2 {
                Ok(ShellCommand::CompoundIds {
                    name: tokens[1].clone(),
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "receptors" => {
            if tokens.len() == 3 {
                Ok(ShellCommand::ReceptorsByCompound {
                    name: tokens[1].clone(),
                    id: parse_id(&tokens[2])?,
                })
            } else {
                Err(token_error(cmd))
            }
        }
        "search" => {
            if tokens.len() < 2 {
                return Err(token_error(cmd));
            }
            let term = tokens[1].clone();
            let mut choose = None;
            let mut export = false;
            let mut idx = 2usize;
            while idx < tokens.len() {
                match tokens[idx].as_str() {
                    "--choose" => {
                        if idx + 1 >= tokens.len() {
                            return Err("Missing value after --choose".to_string());
                        }
                        choose = Some(parse_id(&tokens[idx + 1])?);
                        idx += 2;
                    }
                    "--export" => {
                        export = true;
                        idx += 1;
                    }
                    other => {
                        return Err(format!("Unknown argument '{other}' for search"));
                    }
                }
            }
            Ok(ShellCommand::Search {
                term,
                choose,
                export,
            })
        }
        other => Err(format!("Unknown shell command '{other}'. Try: help")),
    }
}

/// Answers the identifier selection from a `--choose` value. A value that
/// is not among the candidates declines the selection.
struct Preselect<'a> {
    inner: &'a mut dyn Presenter,
    choice: Option<i64>,
}

impl Presenter for Preselect<'_> {
    fn choose(&mut self, title: &str, prompt: &str, options: &[i64]) -> Option<i64> {
        match self.choice {
            Some(id) if options.contains(&id) => Some(id),
            Some(id) => {
                self.inner
                    .report(&format!("Bitter ID {id} is not among the candidates"));
                None
            }
            None => self.inner.choose(title, prompt, options),
        }
    }

    fn render_table(&mut self, table: &ResultTable) {
        self.inner.render_table(table);
    }

    fn report(&mut self, message: &str) {
        self.inner.report(message);
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.inner.confirm(question)
    }
}

pub fn execute_shell_command(
    settings: &Settings,
    presenter: &mut dyn Presenter,
    command: &ShellCommand,
) -> Result<ShellRunResult, String> {
    let result = match command {
        ShellCommand::Help => ShellRunResult {
            state_changed: false,
            output: json!({ "help": shell_help_text() }),
        },
        ShellCommand::ShowSettings => ShellRunResult {
            state_changed: false,
            output: serde_json::to_value(settings)
                .map_err(|e| format!("Could not serialize settings: {e}"))?,
        },
        ShellCommand::InitSettings { path } => {
            Settings::default()
                .save_to_path(path)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "message": format!("Wrote default settings to '{path}'") }),
            }
        }
        ShellCommand::Rebuild { assume_yes } => {
            if !assume_yes
                && !presenter.confirm(
                    "Rebuild the store? Existing receptor, compound and ligand data will be replaced.",
                )
            {
                return Ok(ShellRunResult {
                    state_changed: false,
                    output: json!({ "message": "Rebuild cancelled" }),
                });
            }
            let store = Store::new(settings.database_file.clone());
            let summary = store
                .rebuild(&settings.source_files())
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: true,
                output: json!({
                    "message": format!("Rebuilt store at '{}'", settings.database_file),
                    "summary": summary
                }),
            }
        }
        ShellCommand::CompoundsByReceptor { receptor } => {
            let store = Store::new(settings.database_file.clone());
            let hits = store
                .compounds_by_receptor(receptor)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "receptor": receptor, "compounds": hits }),
            }
        }
        ShellCommand::CompoundIds { name } => {
            let store = Store::new(settings.database_file.clone());
            let hits = store.compounds_by_name(name).map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "compound": name, "matches": hits }),
            }
        }
        ShellCommand::ReceptorsByCompound { name, id } => {
            let store = Store::new(settings.database_file.clone());
            let receptors = store
                .receptors_by_compound(name, *id)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "compound": name, "bitter_id": id, "receptors": receptors }),
            }
        }
        ShellCommand::Search {
            term,
            choose,
            export,
        } => {
            let store = Store::new(settings.database_file.clone());
            let outcome = {
                let mut preselect = Preselect {
                    inner: &mut *presenter,
                    choice: *choose,
                };
                run_search(&store, &mut preselect, term).map_err(|e| e.to_string())?
            };
            match outcome {
                SearchOutcome::Found(table) => {
                    presenter.render_table(&table);
                    let exported = if *export {
                        let path = table
                            .export_csv(&settings.export_folder)
                            .map_err(|e| e.to_string())?;
                        Some(path.display().to_string())
                    } else {
                        None
                    };
                    ShellRunResult {
                        state_changed: false,
                        output: json!({
                            "found": true,
                            "rows": table.rows.len(),
                            "exported": exported
                        }),
                    }
                }
                SearchOutcome::Cancelled => {
                    presenter.render_table(&ResultTable::empty());
                    ShellRunResult {
                        state_changed: false,
                        output: json!({ "found": false, "cancelled": true }),
                    }
                }
                SearchOutcome::NotFound => {
                    presenter.report(&format!("No compound or receptor matches '{term}'"));
                    ShellRunResult {
                        state_changed: false,
                        output: json!({ "found": false, "cancelled": false }),
                    }
                }
            }
        }
    };
    Ok(result)
}
