use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "wortblick")]
#[command(author, version, about = "Read web pages in the language you are learning", long_about = None)]
#[command(after_help = r#"Examples:
  wortblick translate article.html -o article.de.html    Translate a saved page
  wortblick translate https://example.com/news --level A2
  wortblick restore article.de.html -o article.html       Undo a translation
  wortblick preview https://example.com/news              Show what would be translated
  wortblick lookup Hund --context "Der Hund läuft."       Gloss and explain a word

Quick Start:
  1. wortblick settings setup
  2. wortblick translate <page> -o translated.html
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate the article of a page in place
    #[command(after_help = r#"Examples:
  wortblick translate page.html                   Write translated page to stdout
  wortblick translate page.html -o out.html       Write to a file
  wortblick translate https://example.com --level B2 --no-simplify
  wortblick translate page.html --verify-restore  Check the page restores exactly
"#)]
    Translate {
        /// Local HTML file or http(s) URL
        page: String,

        /// Write the translated page here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CEFR level for this run (A1-C2)
        #[arg(long)]
        level: Option<String>,

        /// Target language for this run
        #[arg(long)]
        target: Option<String>,

        /// Translate faithfully instead of simplifying to the level
        #[arg(long)]
        no_simplify: bool,

        /// Blocks per translation request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Restore a copy afterwards and report any difference from the input
        #[arg(long)]
        verify_restore: bool,

        /// Print the run summary as JSON on stderr
        #[arg(long)]
        json: bool,
    },

    /// Restore a page previously written by `translate`
    Restore {
        /// Translated HTML file
        page: PathBuf,

        /// Write the restored page here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the extracted article and which blocks match the page
    Preview {
        /// Local HTML file or http(s) URL
        page: String,

        /// Max characters of each block to display
        #[arg(long, default_value = "120")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Gloss a word and optionally run the deeper analysis
    Lookup {
        word: String,

        /// Sentence the word appeared in
        #[arg(long, short)]
        context: Option<String>,

        /// Run the grammar analysis even when a gloss is available
        #[arg(long)]
        analyze: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Generate shell completions
    #[command(after_help = r#"Examples:
  wortblick completions bash > ~/.local/share/bash-completion/completions/wortblick
  wortblick completions zsh > ~/.zfunc/_wortblick
  wortblick completions fish > ~/.config/fish/completions/wortblick.fish
"#)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change individual settings
    #[command(after_help = r#"Examples:
  wortblick settings set --level A2 --target Spanish
  wortblick settings set --api-key sk-...
  wortblick settings set --modifier control
"#)]
    Set {
        /// Your native language (glosses and explanations)
        #[arg(long)]
        native: Option<String>,

        /// Language pages are translated into
        #[arg(long)]
        target: Option<String>,

        /// CEFR level (A1-C2)
        #[arg(long)]
        level: Option<String>,

        /// Simplify to the CEFR level
        #[arg(long)]
        simplify: Option<bool>,

        /// Translate pages as soon as they are opened
        #[arg(long)]
        auto_translate: Option<bool>,

        /// API key for the translation endpoint
        #[arg(long)]
        api_key: Option<String>,

        /// OpenAI-compatible API base URL
        #[arg(long)]
        api_base: Option<String>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Blocks per translation request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Seconds before a translation batch is abandoned
        #[arg(long)]
        batch_timeout: Option<u64>,

        /// Key held for sentence mode (alt, control, shift, meta)
        #[arg(long)]
        modifier: Option<String>,
    },

    /// Interactive settings wizard
    Setup,

    /// Reset all settings to defaults
    Reset {
        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}
