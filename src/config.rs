use anyhow::Result;
use clap::Parser;

use crate::upstream::Upstream;

/// Command line of the proxy binary.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Forwards every request to one upstream and allows any CORS origin"
)]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:9000
    #[arg(value_name = "LISTEN_HOST:PORT")]
    pub listen: String,
    /// Upstream to forward to, e.g. 127.0.0.1:9001
    #[arg(value_name = "TO_HOST:PORT")]
    pub upstream: String,
}

/// Settings for the whole process, fixed at startup.
///
/// Built once in `main` and handed to the forwarder and server constructors.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub upstream: Upstream,
}

impl Config {
    /// Builds the configuration from parsed arguments.
    ///
    /// # Arguments
    ///
    /// * `args` - The parsed command line
    ///
    /// # Returns
    ///
    /// The configuration, or an error when the upstream is not a valid
    /// `host:port`.
    pub fn from_args(args: Args) -> Result<Self> {
        Ok(Self {
            listen: normalize_listen(&args.listen),
            upstream: Upstream::from_host_port(&args.upstream)?,
        })
    }
}

/// `:8080` means every interface.
fn normalize_listen(listen: &str) -> String {
    match listen.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => listen.to_string(),
    }
}
