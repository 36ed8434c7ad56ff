//! iconkit command-line front end

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use iconkit_core::{
    CancellationToken, ConversionPipeline, DirectorySink, EngineSession, NamespaceScope,
    OperationKind, PipelineConfig, SourceImage,
};
use iconkit_engine::ProcessEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const EXIT_CANCELLED: i32 = 130;

fn conversion_command(kind: OperationKind, about: &'static str) -> Command {
    Command::new(kind.as_str())
        .about(about)
        .arg(
            Arg::new("input")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Source image"),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Converter program implementing the native operations"),
        )
        .arg(
            Arg::new("engine-arg")
                .long("engine-arg")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Argument placed before the operation name (repeatable)"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Directory the result is written to"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Pipeline configuration file (TOML)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64).range(1..))
                .help("Limit on the native call, in seconds"),
        )
        .arg(
            Arg::new("per-request")
                .long("per-request")
                .action(ArgAction::SetTrue)
                .help("Stage input and containers under a request-unique directory"),
        )
}

fn cli() -> Command {
    Command::new("iconkit")
        .version(iconkit_core::VERSION)
        .about("Convert images to ICO, ICNS and PNG icon sets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(conversion_command(OperationKind::Ico, "Convert to a Windows ICO file"))
        .subcommand(conversion_command(
            OperationKind::PngSet,
            "Convert to a zip of PNGs at every icon size",
        ))
        .subcommand(conversion_command(OperationKind::Icns, "Convert to a macOS ICNS file"))
        .subcommand(conversion_command(
            OperationKind::All,
            "Convert to a zip with ICNS, ICO and every PNG",
        ))
}

fn load_config(args: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(secs) = args.get_one::<u64>("timeout") {
        config = config.with_invoke_timeout(*secs);
    }
    if args.get_flag("per-request") {
        config = config.with_namespace(NamespaceScope::PerRequest);
    }
    Ok(config)
}

async fn convert(kind: OperationKind, args: &ArgMatches) -> Result<i32> {
    let input = args
        .get_one::<PathBuf>("input")
        .context("missing input path")?;
    let program = args
        .get_one::<PathBuf>("engine")
        .context("missing --engine")?;
    let out = args
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let engine_args: Vec<String> = args
        .get_many::<String>("engine-arg")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let config = load_config(args)?;
    let source = SourceImage::from_path(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;

    let engine = ProcessEngine::new(program.clone())?.with_leading_args(engine_args);
    let session = Arc::new(EngineSession::new(engine));
    session.initialize().await?;

    let sink = Arc::new(DirectorySink::new(&out));
    let pipeline = ConversionPipeline::new(session, sink, config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    match pipeline.run(source, kind, &cancel).await {
        Ok(report) => {
            if let iconkit_core::CollectionStatus::Partial { missing } = &report.status {
                warn!(missing = missing.len(), "some outputs were not produced");
            }
            info!(hash = %report.hash.short(), "done");
            println!("{}", out.join(&report.file_name).display());
            Ok(0)
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("cancelled during {}", e.stage());
            Ok(EXIT_CANCELLED)
        }
        Err(e) => Err(anyhow::Error::new(e).context("conversion failed")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let Some((name, args)) = matches.subcommand() else {
        return Ok(());
    };
    let kind: OperationKind = name.parse().map_err(anyhow::Error::msg)?;

    let code = convert(kind, args).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
