// Target process launcher
//
// Starts the JVM with the JDWP agent listening on a loopback port (or attaches to one
// that is already listening) and retries the debugger connection until it succeeds.

use crate::config::{Args, Endpoint};
use crate::error::SessionError;
use crate::jdwp_target::JdwpTarget;
use jdwp_client::JdwpConnection;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info};

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Launch or attach, as configured
pub async fn start_target(args: &Args) -> Result<JdwpTarget, SessionError> {
    match &args.attach {
        Some(endpoint) => attach(endpoint, args.connect_timeout()).await,
        None => launch(args).await,
    }
}

async fn attach(endpoint: &Endpoint, timeout: Duration) -> Result<JdwpTarget, SessionError> {
    info!("Attaching to {}", endpoint);
    let connection = connect_with_retry(&endpoint.host, endpoint.port, timeout, None).await?;
    Ok(JdwpTarget::new(connection, None))
}

async fn launch(args: &Args) -> Result<JdwpTarget, SessionError> {
    let port = reserve_port()?;
    let jvm_args = jvm_command_args(args, port);
    info!("Launching {} {}", args.java.display(), jvm_args.join(" "));

    let mut child = Command::new(&args.java)
        .args(&jvm_args)
        // the console owns our stdin
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            SessionError::LaunchFailure(format!("cannot start {}: {}", args.java.display(), e))
        })?;

    if let Some(stdout) = child.stdout.take() {
        pump(stdout, tokio::io::stdout(), "stdout");
    }
    if let Some(stderr) = child.stderr.take() {
        pump(stderr, tokio::io::stderr(), "stderr");
    }

    let connection =
        connect_with_retry("127.0.0.1", port, args.connect_timeout(), Some(&mut child)).await?;
    Ok(JdwpTarget::new(connection, Some(child)))
}

/// JVM command line for a debuggee listening on `port`, suspended until we connect
pub fn jvm_command_args(args: &Args, port: u16) -> Vec<String> {
    let mut command = vec![format!(
        "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address=127.0.0.1:{}",
        port
    )];

    if let Some(classpath) = &args.classpath {
        command.push("-cp".to_string());
        command.push(classpath.clone());
    }

    command.extend(args.jvm_args.iter().cloned());
    command.push(args.main_class.clone());
    command.extend(args.program_args.iter().cloned());
    command
}

/// Ask the OS for a free loopback port; the listener is dropped so the JVM can bind it
fn reserve_port() -> Result<u16, SessionError> {
    std::net::TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .map_err(|e| SessionError::LaunchFailure(format!("no free port: {}", e)))
}

/// Copy one of the child's output streams until it closes
fn pump<R, W>(mut from: R, mut to: W, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::io::copy(&mut from, &mut to).await {
            Ok(bytes) => debug!("Target {} closed after {} bytes", name, bytes),
            Err(e) => debug!("Target {} pump stopped: {}", name, e),
        }
    });
}

async fn connect_with_retry(
    host: &str,
    port: u16,
    timeout: Duration,
    mut child: Option<&mut Child>,
) -> Result<JdwpConnection, SessionError> {
    let deadline = Instant::now() + timeout;

    loop {
        match JdwpConnection::connect(host, port).await {
            Ok(connection) => {
                info!("Connected to JDWP agent at {}:{}", host, port);
                return Ok(connection);
            }
            Err(e) if Instant::now() >= deadline => {
                return Err(SessionError::LaunchFailure(format!(
                    "no JDWP agent at {}:{} after {} ms: {}",
                    host,
                    port,
                    timeout.as_millis(),
                    e
                )));
            }
            Err(e) => debug!("JDWP connect to {}:{} failed, retrying: {}", host, port, e),
        }

        if let Some(child) = child.as_deref_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(SessionError::LaunchFailure(format!(
                    "JVM exited before accepting the debugger: {}",
                    status
                )));
            }
        }

        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_jvm_command_args() {
        let args = Args::try_parse_from([
            "lwdb",
            "--classpath",
            "out",
            "--jvm-arg",
            "-Xmx64m",
            "com.acme.Calc",
            "--",
            "7",
        ])
        .unwrap();

        assert_eq!(
            jvm_command_args(&args, 40123),
            vec![
                "-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,address=127.0.0.1:40123",
                "-cp",
                "out",
                "-Xmx64m",
                "com.acme.Calc",
                "7",
            ]
        );
    }

    #[test]
    fn test_jvm_command_args_without_classpath() {
        let args = Args::try_parse_from(["lwdb", "Calc"]).unwrap();
        let command = jvm_command_args(&args, 1);
        assert_eq!(command.len(), 2);
        assert_eq!(command[1], "Calc");
    }

    #[test]
    fn test_reserve_port_is_nonzero() {
        assert_ne!(reserve_port().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_timeout() {
        let port = reserve_port().unwrap();
        let result = connect_with_retry("127.0.0.1", port, Duration::from_millis(50), None).await;
        assert!(matches!(result, Err(SessionError::LaunchFailure(_))));
    }

    #[tokio::test]
    async fn test_missing_java_is_launch_failure() {
        let args = Args::try_parse_from(["lwdb", "--java", "/nonexistent/java", "Calc"]).unwrap();
        assert!(matches!(
            start_target(&args).await,
            Err(SessionError::LaunchFailure(_))
        ));
    }
}
