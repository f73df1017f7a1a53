use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::debug;
use tracing_subscriber::EnvFilter;
use wifijoin::{
    ConnectRequest, NetworkManagerAdapter, PlatformAdapter, PollPolicy, WifiJoin, normalize,
};

#[derive(Parser, Debug)]
#[command(name = "wifijoin")]
#[command(version, about = "Join a Wi-Fi network on demand and verify the link")]
struct Cli {
    /// Identity checks before a join times out.
    #[arg(long, global = true)]
    attempts: Option<u32>,

    /// Delay before each identity check, in milliseconds.
    #[arg(long = "interval-ms", global = true)]
    interval_ms: Option<u64>,

    /// More log output (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SSID of the current wireless link.
    Current,
    /// Join a network and wait until the radio reports it.
    Connect(ConnectArgs),
    /// Release a network and remove its profile.
    Disconnect {
        /// SSID to release.
        ssid: String,
    },
    /// Pin traffic to the current wireless link.
    Bind {
        /// Bind even if the link has no internet.
        #[arg(long)]
        allow_no_internet: bool,
    },
    /// Stop pinning traffic to the wireless link.
    Unbind,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// SSID, or SSID prefix with --prefix.
    target: String,

    /// Match any SSID starting with TARGET, ignoring case.
    #[arg(long)]
    prefix: bool,

    /// Passphrase or key. Omit for open networks.
    #[arg(short, long)]
    password: Option<String>,

    /// Treat the password as a WEP key.
    #[arg(long)]
    wep: bool,

    /// The network does not broadcast its SSID.
    #[arg(long)]
    hidden: bool,

    /// Forget the network again if the join fails.
    #[arg(long)]
    once: bool,

    /// Verification window in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Ask for permission before touching the radio.
    #[arg(long)]
    require_permission: bool,

    /// Pin traffic to the link once joined.
    #[arg(long)]
    bind: bool,

    /// With --bind, allow a link without internet.
    #[arg(long, requires = "bind")]
    allow_no_internet: bool,
}

impl ConnectArgs {
    fn into_request(self) -> ConnectRequest {
        let mut request = ConnectRequest {
            password: self.password,
            is_wep: self.wep,
            is_hidden: self.hidden,
            ..ConnectRequest::default()
        };

        if self.prefix {
            request.ssid_prefix = Some(self.target);
        } else {
            request.ssid = Some(self.target);
        }
        if self.once {
            request = request.join_once();
        }
        if let Some(secs) = self.timeout {
            request = request.with_timeout(Duration::from_secs(secs));
        }
        if self.require_permission {
            request = request.require_permission();
        }
        if self.bind {
            request = request.bind_traffic(self.allow_no_internet);
        }
        request
    }
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn poll_policy(cli: &Cli) -> PollPolicy {
    let mut policy = PollPolicy::new();
    if let Some(attempts) = cli.attempts {
        policy = policy.with_max_attempts(attempts);
    }
    if let Some(ms) = cli.interval_ms {
        policy = policy.with_interval(Duration::from_millis(ms));
    }
    policy
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let adapter = Arc::new(
        NetworkManagerAdapter::system()
            .await
            .context("failed to reach NetworkManager on the system bus")?,
    );
    let join = WifiJoin::with_policy(adapter.clone(), poll_policy(&cli));
    debug!("Verification policy: {:?}", join.poll_policy());

    match cli.command {
        Command::Current => {
            let ssid = join.get_current_identity().await?;
            println!("{ssid}");
        }
        Command::Connect(args) => {
            let intent = normalize(args.into_request())?;
            let target = intent.target_identity.clone();
            join.connect(intent).await?;

            match join.get_current_identity().await {
                Ok(ssid) => println!("connected to {ssid}"),
                Err(_) => println!("connected to {target}"),
            }
        }
        Command::Disconnect { ssid } => {
            join.disconnect(&ssid).await;
            println!("released {ssid}");
        }
        Command::Bind { allow_no_internet } => {
            join.set_traffic_binding(true, allow_no_internet).await?;
            println!("traffic bound to wireless link");
        }
        Command::Unbind => {
            // Binding state is per process, so go to the platform directly.
            if let Err(e) = adapter.unbind_traffic().await {
                bail!("failed to release traffic binding: {e}");
            }
            println!("traffic binding released");
        }
    }

    Ok(())
}
