//! wortblick - read web pages in the language you are learning

use clap::Parser;
use colored::Colorize;

use wortblick::cli::{Cli, Commands, SettingsCommands};
use wortblick::error::Result;

mod commands;
mod utils;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint.dimmed());
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Translate {
            page,
            output,
            level,
            target,
            no_simplify,
            batch_size,
            verify_restore,
            json,
        } => commands::cmd_translate(
            &page, output, level, target, no_simplify, batch_size, verify_restore, json,
        ),
        Commands::Restore { page, output } => commands::cmd_restore(&page, output),
        Commands::Preview { page, limit, json } => commands::cmd_preview(&page, limit, json),
        Commands::Lookup { word, context, analyze, json } => {
            commands::cmd_lookup(&word, context, analyze, json)
        }

        Commands::Settings(SettingsCommands::Show { json }) => commands::cmd_settings_show(json),
        Commands::Settings(SettingsCommands::Set {
            native,
            target,
            level,
            simplify,
            auto_translate,
            api_key,
            api_base,
            model,
            batch_size,
            batch_timeout,
            modifier,
        }) => commands::cmd_settings_set(commands::SettingsUpdate {
            native,
            target,
            level,
            simplify,
            auto_translate,
            api_key,
            api_base,
            model,
            batch_size,
            batch_timeout,
            modifier,
        }),
        Commands::Settings(SettingsCommands::Setup) => commands::cmd_settings_setup(),
        Commands::Settings(SettingsCommands::Reset { yes }) => commands::cmd_settings_reset(yes),

        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
