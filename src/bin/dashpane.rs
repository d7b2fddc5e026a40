use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dashpane::common::config::{Config, config_file};
use dashpane::common::log;
use dashpane::layout_engine::{Action, AppLayouts, LayoutCommand, LayoutEngine, LayoutStore};
use dashpane::reactor::{self, Event, Reactor};

#[derive(Parser)]
#[command(version, about = "Headless driver for the dashpane layout engine")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Layout state file to load and save (overrides the configured one).
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Record handled events to the specified file path. Overwrites the file if
    /// it exists.
    #[arg(long, value_name = "PATH")]
    record: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active layout of one or every application.
    Show {
        #[arg(long)]
        app: Option<String>,
    },
    /// List an application's named layouts.
    List {
        #[arg(long)]
        app: String,
    },
    /// Apply one command, written in ron, e.g. `select_layout("Focus")`.
    Exec {
        #[arg(long)]
        app: String,
        command: String,
    },
    /// Trigger a hotkey action.
    Action {
        #[arg(long)]
        app: String,
        action: Action,
    },
    /// Restore default layouts for one application, or for all of them.
    Reset {
        #[arg(long)]
        app: Option<String>,
    },
    /// Check the configuration and the stored layouts without changing them.
    Validate,
    /// Re-apply a recorded journal onto the default layouts and print the result.
    Replay { path: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let opt = Cli::parse();
    log::init_logging();

    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let mut config = Config::read_or_default(&config_path)?;
    if let Some(state) = opt.state.clone() {
        config.settings.state_file = Some(state);
    }

    if let Commands::Validate = opt.command {
        return validate(&config);
    }

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }

    if let Commands::Replay { path } = &opt.command {
        let engine = reactor::replay(path, &config)?;
        print_all(&engine);
        return Ok(());
    }

    let record = reactor::Record::new(opt.record.as_deref())
        .context("opening the --record file")?;
    let mut reactor = Reactor::boot(&config, record);

    match opt.command {
        Commands::Show { app: Some(app) } => match reactor.engine().draw(&app) {
            Some(drawing) => print!("{drawing}"),
            None => eprintln!("no layouts stored for {app}"),
        },
        Commands::Show { app: None } => print_all(reactor.engine()),
        Commands::List { app } => match reactor.engine().app(&app) {
            Some(layouts) => print_list(layouts),
            None => eprintln!("no layouts stored for {app}"),
        },
        Commands::Exec { app, command } => {
            let command: LayoutCommand =
                ron::from_str(&command).with_context(|| format!("parsing command {command:?}"))?;
            let response = reactor.handle_event(Event::Command { app: app.clone(), command });
            report(&reactor, &app, response.changed, &response.created);
        }
        Commands::Action { app, action } => {
            let response = reactor.handle_event(Event::Action { app: app.clone(), action });
            report(&reactor, &app, response.changed, &response.created);
        }
        Commands::Reset { app: Some(app) } => {
            let _ = reactor.handle_event(Event::Command {
                app: app.clone(),
                command: LayoutCommand::ResetLayouts,
            });
            report(&reactor, &app, true, &[]);
        }
        Commands::Reset { app: None } => {
            let _ = reactor.handle_event(Event::ResetAll);
            print_all(reactor.engine());
        }
        Commands::Validate | Commands::Replay { .. } => unreachable!("handled above"),
    }

    if !config.settings.save_on_change {
        reactor.save()?;
    }
    Ok(())
}

fn validate(config: &Config) -> anyhow::Result<()> {
    let mut issues = config.validate();

    let store = LayoutStore::new(config.state_file());
    match store.load() {
        Ok(Some(stored)) => {
            for (app, value) in stored {
                let checked = serde_json::from_value::<AppLayouts>(value)
                    .map_err(|e| e.to_string())
                    .and_then(|layouts| {
                        AppLayouts::merged_over(&config.defaults_for(&app), layouts)
                            .map(|_| ())
                            .map_err(|e| e.to_string())
                    });
                if let Err(e) = checked {
                    issues.push(format!("stored layouts for {app} will be discarded: {e}"));
                }
            }
        }
        Ok(None) => {}
        Err(e) => issues.push(format!("{}: {e}", store.path().display())),
    }

    if issues.is_empty() {
        println!("Config validation passed");
        Ok(())
    } else {
        for issue in issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }
}

fn print_all(engine: &LayoutEngine) {
    for app in engine.apps().keys() {
        if let Some(drawing) = engine.draw(app) {
            print!("{drawing}");
        }
    }
}

fn print_list(layouts: &AppLayouts) {
    for name in layouts.layout_names() {
        let marker = if name == layouts.active_name() { "*" } else { " " };
        let mut flags = Vec::new();
        if layouts.is_protected(name) {
            flags.push("default");
        }
        if layouts.layout(name).is_some_and(|l| l.ignore_when_cycling) {
            flags.push("skip");
        }
        if flags.is_empty() {
            println!("{marker} {name}");
        } else {
            println!("{marker} {name} ({})", flags.join(", "));
        }
    }
}

fn report(reactor: &Reactor, app: &str, changed: bool, created: &[String]) {
    if !changed {
        println!("no change");
    }
    for id in created {
        println!("created {id}");
    }
    if let Some(drawing) = reactor.engine().draw(app) {
        print!("{drawing}");
    }
}
