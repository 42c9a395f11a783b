use clap::{Parser, ValueEnum};
use fanout::{browser, Channel, Config, DispatchReport, Engine, ImeKeepalive, InputExecutor, Message};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Broadcast messages to several chat surfaces at once")]
#[command(version)]
struct Cli {
    /// Deployment config file
    config: PathBuf,

    /// Send a single message instead of reading lines from stdin
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    /// Delivery channel (overrides config)
    #[arg(long, value_enum)]
    channel: Option<ChannelArg>,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Script,
    OsInput,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Script => Channel::Script,
            ChannelArg::OsInput => Channel::OsInput,
        }
    }
}

fn input_executor(config: &Config) -> Option<InputExecutor> {
    #[cfg(feature = "os-input")]
    {
        match InputExecutor::native(config.dispatch.clone()) {
            Ok(executor) => return Some(executor),
            Err(e) => warn!("OS input unavailable: {}", e),
        }
    }
    let needs_input = config
        .targets
        .iter()
        .any(|t| config.channel_for(t) == Channel::OsInput);
    if needs_input && !cfg!(feature = "os-input") {
        warn!("built without the os-input feature; os_input targets will fail");
    }
    None
}

fn print_report(report: &DispatchReport) -> fanout::Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> fanout::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = Config::load(&cli.config)?;
    if let Some(channel) = cli.channel {
        config.channel = channel.into();
    }

    if cli.check {
        println!("Config valid: {}", config.name);
        println!("  Channel: {:?}", config.channel);
        println!("  Targets: {}", config.targets.len());
        for t in &config.targets {
            println!(
                "    - {} ({:?}, {:?}): {}",
                t.id,
                config.channel_for(t),
                t.input_kind,
                t.url
            );
            println!(
                "      editor selectors: {}, retry: {} x {}ms",
                t.selectors.editor.len(),
                t.retry.attempts,
                t.retry.delay_ms
            );
        }
        if config.keepalive.enabled {
            println!("  Keepalive: every {}ms idle", config.keepalive.idle_ms);
        }
        return Ok(());
    }

    // Override headless if specified
    if cli.headless {
        config.browser.headless = true;
    }

    let executor = input_executor(&config);
    let keepalive_config = config.keepalive.clone();

    let session = browser::launch(&config.browser, &config.targets).await?;
    let mut builder = Engine::builder(config)
        .surfaces(session.surfaces())
        .screen(session.host())
        .host(session.host());
    if let Some(ref executor) = executor {
        builder = builder.executor(executor.clone());
    }
    let engine = builder.build()?;
    engine.start_modal_watchers();

    // OS input dispatch moves focus into the target pages; the keepalive
    // stays cancelled until the next line is typed.
    let moves_focus = engine.uses_os_input();
    let keepalive = executor.map(|e| ImeKeepalive::new(e, keepalive_config));
    let before_dispatch = |ka: &Option<ImeKeepalive>| {
        if let (Some(ka), true) = (ka, moves_focus) {
            ka.on_blur();
        }
    };
    if let Some(ref ka) = keepalive {
        ka.on_focus();
    }

    let mut success = true;
    if let Some(text) = cli.message {
        before_dispatch(&keepalive);
        let report = engine.dispatch(&Message::new(text)).await;
        print_report(&report)?;
        success = report.success;
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(ref ka) = keepalive {
                ka.on_keystroke();
            }
            if line.trim().is_empty() {
                continue;
            }
            before_dispatch(&keepalive);
            let report = engine.dispatch(&Message::new(line)).await;
            print_report(&report)?;
            success = report.success;
        }
    }

    if let Some(ka) = keepalive {
        ka.shutdown();
    }
    drop(engine);
    session.close().await?;

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
