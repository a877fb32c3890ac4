// Command-line configuration

use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Host and port of a JVM already listening for a debugger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn parse_endpoint(value: &str) -> Result<Endpoint, String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got {:?}", value))?;

    if host.is_empty() {
        return Err(format!("missing host in {:?}", value));
    }

    let port = port
        .parse()
        .map_err(|_| format!("invalid port {:?}", port))?;

    Ok(Endpoint {
        host: host.to_string(),
        port,
    })
}

#[derive(Debug, Parser)]
#[command(name = "lwdb", version, about = "Lightweight interactive Java debugger over JDWP")]
pub struct Args {
    /// Fully-qualified name of the class whose main method is debugged
    pub main_class: String,

    /// Class path handed to the JVM
    #[arg(short = 'c', long)]
    pub classpath: Option<String>,

    /// Extra JVM option, repeatable
    #[arg(long = "jvm-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub jvm_args: Vec<String>,

    /// Java launcher to run
    #[arg(long, env = "LWDB_JAVA", default_value = "java")]
    pub java: PathBuf,

    /// Attach to a JVM started with -agentlib:jdwp=...,server=y,suspend=y instead of launching one
    #[arg(long, value_name = "HOST:PORT", value_parser = parse_endpoint)]
    pub attach: Option<Endpoint>,

    /// How long to keep retrying the debugger connection
    #[arg(long, default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    /// Arguments for the program's main method
    #[arg(last = true)]
    pub program_args: Vec<String>,
}

impl Args {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
