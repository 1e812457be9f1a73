use std::path::{Component, Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use mir_interp::perf::scenarios::{self, Scenario};
use mir_interp::vm::{DispatchMode, InterpConfig};

static PERF_TRACE_INIT: Once = Once::new();
const TRACE_ENV: &str = "MIR_INTERP_TRACE";
const DEFAULT_TRACE_FILTER: &str = "mir::interp=info,mir::interp::ffi=debug,mir_interp_cli=info";
const INSN_TRACE_FILTER: &str = "mir::interp=info,mir::interp::insn=trace";


#[derive(Debug, Parser)]
#[command(
    name = "mir-interp",
    author,
    version,
    about = "Run and inspect the built-in MIR interpreter workloads",
    long_about = None,
    after_help = "Tracing: set MIR_INTERP_TRACE=1 or to an EnvFilter expression"
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DispatchArg {
    Direct,
    Indexed,
}

impl From<DispatchArg> for DispatchMode {
    fn from(value: DispatchArg) -> Self {
        match value {
            DispatchArg::Direct => DispatchMode::Direct,
            DispatchArg::Indexed => DispatchMode::Indexed,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interpret a scenario and print its first result.
    Run {
        /// Scenario key, see `list`
        scenario: String,
        /// Integer arguments; the scenario defaults are used when omitted
        #[arg(value_name = "ARGS", allow_negative_numbers = true)]
        args: Vec<i64>,
        /// Dispatch mode (defaults to MIR_INTERP_DISPATCH, then direct)
        #[arg(long, value_enum)]
        dispatch: Option<DispatchArg>,
        /// Log every executed instruction
        #[arg(long)]
        trace: bool,
        /// Fail unless the result matches the scenario's native reference
        #[arg(long)]
        check: bool,
        /// Print interface cache counters to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Print the compiled form of every function in a scenario.
    Disasm {
        scenario: String,
        /// Write the listing to a file instead of stdout
        #[arg(long, value_parser = parse_sanitized_path)]
        output: Option<PathBuf>,
    },
    /// List the built-in scenarios.
    List,
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow!("Parent directory components ('..') are not allowed in file paths."));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn env_toggle_enabled(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    !(trimmed.eq_ignore_ascii_case("0") || trimmed.eq_ignore_ascii_case("false") || trimmed.eq_ignore_ascii_case("off"))
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Installs a stderr subscriber when `MIR_INTERP_TRACE` is set, or when instruction tracing
/// was requested on the command line.
fn maybe_init_perf_tracing(insn_trace: bool) {
    let raw = std::env::var(TRACE_ENV).ok();
    let enabled = raw.as_deref().is_some_and(env_toggle_enabled);
    if !enabled && !insn_trace {
        return;
    }

    PERF_TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = raw
            .as_deref()
            .filter(|raw| env_toggle_enabled(raw))
            .and_then(filter_expr_from)
            .or_else(|| std::env::var("RUST_LOG").ok());
        let fallback = if insn_trace { INSN_TRACE_FILTER } else { DEFAULT_TRACE_FILTER };

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(fallback),
        };

        let _ = builder.try_init();
    });
}

fn find_scenario(key: &str) -> anyhow::Result<&'static Scenario> {
    scenarios::find(key).ok_or_else(|| anyhow!("unknown scenario '{key}' (see `mir-interp list`)"))
}

fn run_scenario(
    key: &str,
    args: &[i64],
    dispatch: Option<DispatchArg>,
    trace: bool,
    check: bool,
    stats: bool,
) -> anyhow::Result<()> {
    let spec = find_scenario(key)?;
    let args = if args.is_empty() { spec.default_args } else { args };

    let mut config = InterpConfig::from_env().context("reading interpreter configuration")?;
    if let Some(mode) = dispatch {
        config.dispatch = mode.into();
    }
    config.trace = trace;

    let mut prepared = spec.prepare(config)?;
    let value = prepared.run(args)?;
    println!("{value}");

    if stats {
        let s = prepared.interp().cache_stats();
        eprintln!(
            "thunks generated={} cache hits={} site hits={} scratch high water={}",
            s.generated,
            s.hits,
            s.site_hits,
            prepared.interp().scratch_high_water()
        );
    }
    if check {
        let expected = spec.reference(args);
        if value != expected {
            return Err(anyhow!("{key}: interpreter returned {value}, native reference is {expected}"));
        }
    }
    Ok(())
}

fn disassemble(key: &str) -> anyhow::Result<String> {
    let spec = find_scenario(key)?;
    let prepared = spec.prepare(InterpConfig::default())?;
    let interp = prepared.interp();
    let mut out = String::new();
    for id in interp.module().func_ids() {
        let cf = interp
            .compile(id)
            .with_context(|| format!("compiling function #{} of {key}", id.0))?;
        out.push_str(&cf.disassemble());
        out.push('\n');
    }
    Ok(out)
}

fn list_scenarios() -> String {
    let mut out = String::new();
    for spec in scenarios::all() {
        let defaults: Vec<String> = spec.default_args.iter().map(i64::to_string).collect();
        out.push_str(&format!(
            "{:<12} {} [{}({})]\n",
            spec.key,
            spec.title,
            spec.entry,
            defaults.join(", ")
        ));
    }
    out
}

fn main() -> anyhow::Result<()> {
    let CliArgs { command } = CliArgs::parse();
    let insn_trace = matches!(command, Commands::Run { trace: true, .. });
    maybe_init_perf_tracing(insn_trace);

    match command {
        Commands::Run {
            scenario,
            args,
            dispatch,
            trace,
            check,
            stats,
        } => run_scenario(&scenario, &args, dispatch, trace, check, stats),
        Commands::Disasm { scenario, output } => {
            let listing = disassemble(&scenario)?;
            match output {
                Some(path) => std::fs::write(&path, listing)
                    .with_context(|| format!("Failed to write listing to '{}'", path.display())),
                None => {
                    print!("{listing}");
                    Ok(())
                }
            }
        }
        Commands::List => {
            print!("{}", list_scenarios());
            Ok(())
        }
    }
}
