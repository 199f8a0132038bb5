//! Top-level CLI surface: argument parsing and dispatch to `crate::command`.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};

use crate::command;
use crate::multiplexer::AgentType;

#[derive(Parser)]
#[command(name = "nzm")]
#[command(about = "Orchestrator for multi-agent interactive coding sessions hosted in a terminal multiplexer")]
#[command(
    after_help = "Pane titles are expected to follow <session>__<type>_<index>[_<variant>][<suffix>], \
type in {cc, cod, gmi} for Claude, Codex and Gemini respectively."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Clap-facing mirror of `crate::multiplexer::AgentType`, restricted to the
/// three agent kinds a `--type` filter makes sense against.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliAgentType {
    Claude,
    Codex,
    Gemini,
}

impl From<CliAgentType> for AgentType {
    fn from(value: CliAgentType) -> Self {
        match value {
            CliAgentType::Claude => AgentType::Claude,
            CliAgentType::Codex => AgentType::Codex,
            CliAgentType::Gemini => AgentType::Gemini,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot of every session and the classifier state of its panes
    Status {
        /// Emit a machine-readable JSON envelope instead of a table
        #[arg(long)]
        robot_status: bool,
    },

    /// Recommended next actions across every session
    Plan {
        #[arg(long)]
        robot_plan: bool,
    },

    /// Captured output for a session's panes
    Tail {
        /// Session name
        session: String,

        /// Number of lines to capture per pane
        #[arg(short = 'n', long, default_value_t = 200)]
        lines: u16,

        /// Restrict to these pane IDs or indices (comma-separated)
        #[arg(long = "panes", value_delimiter = ',')]
        panes: Vec<String>,

        #[arg(long)]
        robot_tail: bool,
    },

    /// Send a message to one or more panes in a session
    Send {
        /// Session name
        session: String,

        /// Message text to send
        #[arg(long = "msg")]
        message: String,

        /// Send to every eligible pane (user panes are still excluded)
        #[arg(long)]
        all: bool,

        /// Explicit pane IDs or indices (comma-separated); overrides `--type`/`--all`
        #[arg(long = "panes", value_delimiter = ',')]
        panes: Vec<String>,

        /// Restrict to panes of this agent type
        #[arg(long = "type", value_enum)]
        agent_type: Option<CliAgentType>,

        /// Pane IDs or indices to drop before any other filter is applied
        #[arg(long = "exclude", value_delimiter = ',')]
        exclude: Vec<String>,

        /// Milliseconds to wait between sends to successive panes
        #[arg(long = "delay-ms", default_value_t = 0)]
        delay_ms: u64,

        /// Resolve targets and print what would be sent without sending
        #[arg(long = "dry-run")]
        dry_run: bool,

        #[arg(long)]
        robot_send: bool,
    },

    /// Interrupt one or more panes, then optionally send a follow-up message
    Interrupt {
        /// Session name
        session: String,

        /// Follow-up message to send once a pane settles
        #[arg(long = "msg")]
        message: Option<String>,

        /// Explicit pane IDs or indices (comma-separated)
        #[arg(long = "panes", value_delimiter = ',')]
        panes: Vec<String>,

        /// Interrupt every eligible pane
        #[arg(long)]
        all: bool,

        /// Also interrupt panes already settled/waiting
        #[arg(long)]
        force: bool,

        /// Skip polling for readiness; treat every interrupted pane as ready immediately
        #[arg(long = "no-wait")]
        no_wait: bool,

        /// Resolve targets and report what would happen without sending anything
        #[arg(long = "dry-run")]
        dry_run: bool,

        /// Milliseconds to wait for a pane to settle before giving up
        #[arg(long = "timeout-ms", default_value_t = 10_000)]
        timeout_ms: u64,

        #[arg(long)]
        robot_interrupt: bool,
    },

    /// Classifier output for every pane in a session
    Activity {
        session: String,

        #[arg(long)]
        robot_activity: bool,
    },

    /// Full correlated snapshot for a session, or every session if none is named
    Snapshot {
        session: Option<String>,

        /// Base URL of the agent-mail service, if reachable
        #[arg(long = "mail-url")]
        mail_url: Option<String>,

        /// Base URL of the dependency-graph ("beads") service, if reachable
        #[arg(long = "beads-url")]
        beads_url: Option<String>,
    },

    /// Interactive TUI dashboard over a session's panes
    Dashboard { session: String },

    /// Generate shell completion scripts
    Completions { shell: Shell },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status { robot_status } => command::status::run(robot_status),

        Commands::Plan { robot_plan } => command::plan::run(robot_plan),

        Commands::Tail {
            session,
            lines,
            panes,
            robot_tail,
        } => command::tail::run(&session, lines, &panes, robot_tail),

        Commands::Send {
            session,
            message,
            all,
            panes,
            agent_type,
            exclude,
            delay_ms,
            dry_run,
            robot_send,
        } => {
            let agent_types: Vec<AgentType> = agent_type.into_iter().map(AgentType::from).collect();
            command::send::run(
                &session,
                &message,
                all,
                &panes,
                &agent_types,
                &exclude,
                delay_ms,
                dry_run,
                robot_send,
            )
        }

        Commands::Interrupt {
            session,
            message,
            panes,
            all,
            force,
            no_wait,
            dry_run,
            timeout_ms,
            robot_interrupt,
        } => command::interrupt::run(
            &session,
            message.as_deref(),
            &panes,
            all,
            force,
            no_wait,
            dry_run,
            timeout_ms,
            robot_interrupt,
        ),

        Commands::Activity { session, robot_activity } => command::activity::run(&session, robot_activity),

        Commands::Snapshot {
            session,
            mail_url,
            beads_url,
        } => command::snapshot::run(session.as_deref(), mail_url.as_deref(), beads_url.as_deref()),

        Commands::Dashboard { session } => command::dashboard::run(&session),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
