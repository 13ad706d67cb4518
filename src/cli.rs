//! CLI module - Command-line interface definitions and dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// prime-uve - manage Python virtual environments outside project directories.
#[derive(Parser, Debug)]
#[command(name = "prime-uve")]
#[command(
    author,
    version,
    about,
    long_about = r#"prime-uve keeps Python virtual environments outside your project
directories and wires them up through a committed .env.uve file.

Each project gets a venv under ${HOME}/prime-uve/venvs/<name>_<hash>, and
the project's .env.uve sets UV_PROJECT_ENVIRONMENT so that uv (via the uve
wrapper) resolves the right environment automatically.

Typical workflow:
    prime-uve init           # in a project with pyproject.toml
    uve sync                 # create the venv and install dependencies
    prime-uve list           # see all tracked venvs
    prime-uve prune --orphan # clean up venvs whose projects are gone

Examples:
    prime-uve init --force
    prime-uve list --json
    prime-uve activate --shell fish
    prime-uve configure vscode --create
"#
)]
pub struct Cli {
    /// Verbose output (more diagnostics).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Enable more detailed diagnostics on stderr, including per-venv disk\n\
usage in list output."
    )]
    pub verbose: bool,

    /// Assume yes for all confirmation prompts.
    #[arg(
        short,
        long,
        global = true,
        long_help = "Skip confirmation prompts and proceed as if the user answered yes.\n\n\
Useful for scripting. Destructive commands still honor --dry-run."
    )]
    pub yes: bool,

    /// Show what would be done without doing it.
    #[arg(
        long,
        global = true,
        long_help = "Print the actions a command would take without touching the\n\
filesystem or the cache."
    )]
    pub dry_run: bool,

    /// Emit machine-readable JSON on stdout.
    #[arg(
        long,
        global = true,
        long_help = "Emit machine-readable JSON on stdout instead of human-oriented text.\n\n\
Status messages still go to stderr."
    )]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global flags threaded through every command handler.
#[derive(Debug, Clone, Copy)]
pub struct GlobalOpts {
    pub verbose: bool,
    pub yes: bool,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up a managed venv mapping for the current project.
    #[command(
        long_about = "Set up the current project to use a managed venv.\n\n\
Requires a pyproject.toml in the current directory or an ancestor. Writes\n\
UV_PROJECT_ENVIRONMENT into .env.uve (creating it if needed), creates the\n\
venv directory, and records the mapping in the cache.\n\n\
Refuses to overwrite an existing .env.uve mapping unless --force is given.\n\n\
Examples:\n\
  prime-uve init\n\
  prime-uve init --force\n\
  prime-uve init --venv-dir /data/venvs\n"
    )]
    Init {
        /// Overwrite an existing .env.uve mapping.
        #[arg(long)]
        force: bool,

        /// Base directory for the venv instead of ${HOME}/prime-uve/venvs.
        #[arg(
            long,
            value_name = "DIR",
            long_help = "Place the venv under DIR instead of the default base directory.\n\n\
The path is stored verbatim in .env.uve, so prefer ${HOME}-relative values\n\
when the file is committed and shared."
        )]
        venv_dir: Option<PathBuf>,
    },

    /// List all tracked venvs and their status.
    #[command(
        long_about = "List every project-to-venv mapping in the cache, validated against\n\
the project's .env.uve and the filesystem.\n\n\
With --verbose, includes per-venv disk usage. With --json, emits the full\n\
mapping list plus a summary object.\n\n\
Examples:\n\
  prime-uve list\n\
  prime-uve list --orphan-only\n\
  prime-uve list --json\n"
    )]
    List {
        /// Only show orphaned venvs.
        #[arg(long)]
        orphan_only: bool,
    },

    /// Remove venvs by status, project path, or wholesale.
    #[command(
        long_about = "Remove managed venv directories and their cache entries.\n\n\
Exactly one selection mode is required:\n\
  --all       every tracked venv\n\
  --valid     only venvs whose mapping validates\n\
  --orphan    venvs whose project/env file is gone, plus untracked\n\
              directories in the venv base dir\n\
  --current   the venv of the current project\n\
  PATH        a specific venv directory (must be under the base dir)\n\n\
Prompts for confirmation unless --yes. --dry-run lists what would be\n\
removed without deleting anything.\n\n\
Examples:\n\
  prime-uve prune --orphan\n\
  prime-uve prune --all --yes\n\
  prime-uve prune --dry-run --valid\n"
    )]
    Prune {
        /// Remove every tracked venv.
        #[arg(long)]
        all: bool,

        /// Remove only venvs that validate as healthy.
        #[arg(long)]
        valid: bool,

        /// Remove orphaned venvs (and untracked dirs in the base dir).
        #[arg(long)]
        orphan: bool,

        /// Remove the current project's venv.
        #[arg(long)]
        current: bool,

        /// A specific venv directory to remove.
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Print shell commands to activate the project's venv.
    #[command(
        long_about = "Print the commands a shell would run to activate the project's venv:\n\
one export per .env.uve variable, then the activation command for the venv.\n\n\
Placeholders like ${HOME} are left unexpanded for POSIX shells so the\n\
printed commands stay portable.\n\n\
Intended for eval:\n\
  eval \"$(prime-uve activate)\"\n\n\
Examples:\n\
  prime-uve activate\n\
  prime-uve activate --shell fish\n"
    )]
    Activate {
        /// Target shell (bash/zsh/fish/pwsh/cmd); detected when omitted.
        #[arg(long, value_name = "SHELL")]
        shell: Option<String>,
    },

    /// Spawn an interactive shell inside the project's venv.
    #[command(
        long_about = "Start an interactive subshell with the project's venv active:\n\
.env.uve variables exported (expanded), VIRTUAL_ENV set, and the venv's\n\
bin directory prepended to PATH.\n\n\
Exit the subshell to return; its exit code is forwarded.\n\n\
Examples:\n\
  prime-uve shell\n\
  prime-uve shell --shell zsh\n"
    )]
    Shell {
        /// Shell to spawn (bash/zsh/fish/pwsh/cmd); detected when omitted.
        #[arg(long, value_name = "SHELL")]
        shell: Option<String>,
    },

    /// Re-register an existing .env.uve mapping in the cache.
    #[command(
        long_about = "Read the project's existing .env.uve and re-add its mapping to the\n\
cache. Fixes a cache that fell out of sync (deleted, migrated from another\n\
machine, or edited by hand).\n\n\
Examples:\n\
  prime-uve register\n\
  prime-uve register --dry-run\n"
    )]
    Register,

    /// Configure editors to use the managed venv.
    Configure {
        #[command(subcommand)]
        action: ConfigureCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigureCommands {
    /// Point a VS Code workspace at the managed interpreter.
    #[command(
        long_about = "Update a VS Code workspace file to use the managed venv:\n\
sets python.defaultInterpreterPath, enables terminal environment\n\
activation, and points python.envFile at the project's .env.uve.\n\n\
Searches the project root and .vscode/ for *.code-workspace files. With\n\
multiple candidates, pass --workspace to pick one. With none, --create\n\
writes a minimal single-folder workspace.\n\n\
A malformed workspace file is backed up to <file>.bak and recreated.\n\n\
Examples:\n\
  prime-uve configure vscode\n\
  prime-uve configure vscode --create\n\
  prime-uve configure vscode --workspace my.code-workspace\n"
    )]
    Vscode {
        /// Workspace file to update.
        #[arg(long, value_name = "FILE")]
        workspace: Option<PathBuf>,

        /// Create a workspace file when none exists.
        #[arg(long)]
        create: bool,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOpts {
        verbose: cli.verbose,
        yes: cli.yes,
        dry_run: cli.dry_run,
        json: cli.json,
    };

    match cli.command {
        Commands::Init { force, venv_dir } => {
            crate::commands::init::run_init(&opts, force, venv_dir.as_deref())
        }

        Commands::List { orphan_only } => crate::commands::list::run_list(&opts, orphan_only),

        Commands::Prune {
            all,
            valid,
            orphan,
            current,
            path,
        } => {
            let mode = crate::commands::prune::PruneMode::from_flags(
                all,
                valid,
                orphan,
                current,
                path,
            )?;
            crate::commands::prune::run_prune(&opts, mode)
        }

        Commands::Activate { shell } => {
            crate::commands::activate::run_activate(&opts, shell.as_deref())
        }

        Commands::Shell { shell } => crate::commands::shell::run_shell(&opts, shell.as_deref()),

        Commands::Register => crate::commands::register::run_register(&opts),

        Commands::Configure { action } => match action {
            ConfigureCommands::Vscode { workspace, create } => {
                crate::commands::configure::run_configure_vscode(
                    &opts,
                    workspace.as_deref(),
                    create,
                )
            }
        },
    }
}
