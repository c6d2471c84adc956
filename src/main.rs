mod cli;

use clipforge::config;
use clipforge_av::{compile, validate::validate_trim, Preset};
use clipforge_common::paths::engine_input_name;
use clipforge_common::Capability;
use clipforge_engine::{
    check_tools, EngineSession, FfmpegLoader, HostEnvironment, InputFile, SessionError,
    SessionEvent,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, OptionArgs};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipforge=trace,clipforge_engine=trace,clipforge_av=trace,clipforge_common=debug"
                .to_string()
        } else {
            "clipforge=info,clipforge_engine=info,clipforge_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Process {
            input,
            output,
            options,
            duration,
            timeout,
            json,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(process_file(ProcessRequest {
                input,
                output,
                options,
                duration,
                timeout,
                json,
                config_path: cli.config,
            }))
        }
        Commands::Args {
            input,
            options,
            single_thread,
        } => print_args(&input, &options, single_thread, cli.config.as_deref()),
        Commands::CheckTools => run_check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Presets => list_presets(),
        Commands::Version => {
            println!("clipforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct ProcessRequest {
    input: PathBuf,
    output: Option<PathBuf>,
    options: OptionArgs,
    duration: Option<u64>,
    timeout: Option<u64>,
    json: bool,
    config_path: Option<PathBuf>,
}

async fn process_file(request: ProcessRequest) -> Result<()> {
    let config = config::load_config_or_default(request.config_path.as_deref())?;

    if !request.input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", request.input);
    }

    let options = request.options.resolve(&config.defaults);
    let mut input = InputFile::from_path(&request.input)
        .await
        .with_context(|| format!("Failed to read input file: {:?}", request.input))?;
    if let Some(secs) = request.duration {
        input = input.with_duration(secs);
    }

    let session = Arc::new(
        EngineSession::new(Arc::new(FfmpegLoader::new()), config.engine.clone())
            .with_limits(config.limits.clone()),
    );

    let reporter = tokio::spawn(report_progress(session.subscribe(), !request.json));

    let capability = session.load().await.context("Failed to load ffmpeg")?;
    tracing::info!("Processing {:?} ({})", request.input, capability);

    let run = session.run(input, options);
    let result = match request.timeout {
        Some(secs) => {
            tokio::pin!(run);
            tokio::select! {
                result = &mut run => result,
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::warn!("Timed out after {}s, cancelling", secs);
                    session.cancel();
                    run.await
                }
            }
        }
        None => run.await,
    };

    let snapshot = session.snapshot();
    let outcome = match result {
        Ok(info) => {
            let destination = request
                .output
                .unwrap_or_else(|| default_output_path(&request.input, &info.name));
            let data = session
                .output_data()
                .context("Conversion finished without output")?;
            tokio::fs::write(&destination, &data)
                .await
                .with_context(|| format!("Failed to write output: {:?}", destination))?;

            if !request.json {
                println!();
                println!("Output: {}", destination.display());
                println!("Size: {}", info.size);
            }
            Ok(())
        }
        Err(SessionError::Execution { message, last_log }) => {
            if !last_log.is_empty() {
                eprintln!("ffmpeg: {}", last_log);
            }
            Err(anyhow::anyhow!("Conversion failed: {}", message))
        }
        Err(e) => Err(anyhow::Error::new(e)),
    };

    if request.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    // Release the output; dropping the last session handle closes the reporter.
    if let Err(e) = session.reset() {
        tracing::debug!("Session reset failed: {}", e);
    }
    drop(session);
    let _ = reporter.await;

    outcome
}

/// Print progress on stderr until the session is dropped.
async fn report_progress(
    mut events: tokio::sync::broadcast::Receiver<SessionEvent>,
    show_progress: bool,
) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(SessionEvent::Progress { percent }) if show_progress => {
                eprint!("\rProgress: {:>3}%", percent);
                let _ = std::io::stderr().flush();
            }
            Ok(SessionEvent::Phase { phase }) => tracing::debug!("Session {}", phase),
            Ok(SessionEvent::Log { line }) => tracing::trace!("ffmpeg: {}", line),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Progress reporter skipped {} events", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn default_output_path(input: &Path, output_name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(output_name))
        .unwrap_or_else(|| PathBuf::from(output_name))
}

fn print_args(
    input: &str,
    options: &OptionArgs,
    single_thread: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let options = options.resolve(&config.defaults);

    validate_trim(&options.start_time, &options.end_time, None)?;

    let capability = if single_thread
        || config.engine.force_single_thread
        || !HostEnvironment::detect().shared_memory
    {
        Capability::SingleThreaded
    } else {
        Capability::MultiThreaded
    };

    let args = compile(&engine_input_name(input), &options, capability);
    let rendered: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();
    println!("ffmpeg {}", rendered.join(" "));

    Ok(())
}

/// Quote an argument for copy-pasting into a POSIX shell.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:=+/".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn run_check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to convert files.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let warnings = config::validate_config(&config)?;

    println!(
        "  Engine cores: {} (multi-threaded), {} (single-threaded)",
        config.engine.multi_threaded_core, config.engine.single_threaded_core
    );
    println!("  Force single thread: {}", config.engine.force_single_thread);
    println!("  Event buffer: {}", config.engine.event_buffer);
    println!(
        "  Max input size: {}",
        clipforge_common::size::format_file_size(config.limits.max_input_bytes)
    );
    println!("  Accepted types: {}", config.limits.accepted_types.join(", "));
    println!(
        "  Defaults: {} {} q{} {}fps",
        config.defaults.format,
        config.defaults.resolution,
        config.defaults.quality,
        config.defaults.frame_rate
    );

    for warning in &warnings {
        println!("  ! {}", warning);
    }

    Ok(())
}

fn list_presets() -> Result<()> {
    for preset in Preset::ALL {
        let options = preset.apply(Default::default());
        println!(
            "{:<10} {:<28} {} {} q{} {}",
            preset.name(),
            preset.description(),
            options.format,
            options.resolution,
            options.quality,
            options.frame_rate
        );
    }
    Ok(())
}
