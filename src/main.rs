//! grindview - run memcheck and browse its report as a tree.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grindview::config::{ConfigLoader, GrindConfig, ToolConfig};
use grindview::display;
use grindview::report::{ErrorKind, ReportBuilder, ReportFilter, ResultTree};
use grindview::session::Session;
use grindview::xml::{FeedError, StreamingXmlParser};

#[derive(Parser)]
#[command(
    name = "grindview",
    about = "Run memcheck and browse its report as a tree",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct OutputArgs {
    /// Print the tree as JSON.
    #[arg(long)]
    json: bool,
    /// Only show errors of this kind (e.g. InvalidRead, Leak_DefinitelyLost).
    #[arg(long)]
    kind: Option<ErrorKind>,
    /// Only show errors containing this text in a label, dir or file.
    #[arg(long)]
    grep: Option<String>,
    /// Show errors that do not contain the --grep text.
    #[arg(long, requires = "grep")]
    invert: bool,
}

impl OutputArgs {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            kind: self.kind,
            text: self.grep.clone(),
            invert: self.invert,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program under the tool and show the report.
    Run {
        /// Tool executable, overriding the config file.
        #[arg(long)]
        tool: Option<String>,
        /// Use stock valgrind flags (--xml=yes, --xml-fd, <valgrindoutput>).
        #[arg(long)]
        valgrind: bool,
        #[command(flatten)]
        output: OutputArgs,
        /// Program to run and its arguments.
        #[arg(last = true, required = true)]
        program: Vec<String>,
    },
    /// Show a report saved to a file.
    Parse {
        /// Report file.
        file: PathBuf,
        /// Bytes fed to the parser at a time.
        #[arg(long, default_value_t = 8192)]
        chunk_size: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<GrindConfig, ExitCode> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    loader.load().map_err(|e| {
        display::print_error(&e.to_string());
        ExitCode::from(2)
    })
}

fn show(tree: &ResultTree, output: &OutputArgs) -> ExitCode {
    let filter = output.filter();
    if output.json {
        let nodes: Vec<_> = filter
            .visible_roots(tree)
            .into_iter()
            .map(|id| tree.node(id))
            .collect();
        match serde_json::to_string_pretty(&nodes) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                display::print_error(&format!("Failed to serialize report: {e}"));
                return ExitCode::FAILURE;
            }
        }
    } else {
        display::print_tree(tree, &filter);
    }
    ExitCode::SUCCESS
}

async fn run_command(
    mut config: GrindConfig,
    tool: Option<String>,
    valgrind: bool,
    program: &[String],
    output: &OutputArgs,
) -> ExitCode {
    if valgrind {
        config.tool = ToolConfig::valgrind().with_program(config.tool.program);
    }
    if let Some(tool) = tool {
        config.tool.program = tool;
    }
    let options = config.tool_options();

    if !output.json {
        display::print_run_start(program);
    }

    let mut session = Session::new(config.tool);
    if let Err(e) = session.start(program, &options) {
        display::print_error(&e.to_string());
        return ExitCode::from(127);
    }

    let outcome = tokio::select! {
        result = session.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match outcome {
        Some(result) => result,
        None => {
            tracing::info!("Interrupted, stopping tool");
            session.terminate().await;
            Ok(session.exit_status())
        }
    };

    let code = show(session.tree(), output);
    match result {
        Ok(status) => {
            if !output.json {
                display::print_run_end(status, display::count_entries(session.tree()));
            }
            code
        }
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn parse_command(
    tool: &ToolConfig,
    file: &Path,
    chunk_size: usize,
    output: &OutputArgs,
) -> ExitCode {
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            display::print_error(&format!("Failed to read {}: {e}", file.display()));
            return ExitCode::from(2);
        }
    };

    let builder = ReportBuilder::with_schema(&tool.root_element, tool.tool_id.clone());
    let mut parser = StreamingXmlParser::new(builder);
    let mut chunks = bytes.chunks(chunk_size.max(1)).peekable();
    let mut rejected = false;
    loop {
        let chunk = chunks.next().unwrap_or_default();
        let is_final = chunks.peek().is_none();
        match parser.feed(chunk, is_final) {
            Ok(()) => {}
            Err(FeedError::Malformed(e)) => tracing::warn!(error = %e, "Malformed report"),
            Err(FeedError::Handler(e)) => {
                display::print_error(&e.to_string());
                rejected = true;
            }
        }
        if is_final {
            break;
        }
    }

    let code = show(parser.handler().tree(), output);
    if rejected {
        ExitCode::FAILURE
    } else {
        code
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match cli.command {
        Commands::Run {
            tool,
            valgrind,
            output,
            program,
        } => run_command(config, tool, valgrind, &program, &output).await,
        Commands::Parse {
            file,
            chunk_size,
            output,
        } => parse_command(&config.tool, &file, chunk_size, &output),
    }
}
