use std::{path::Path, process::Stdio, time::Duration};

use anyhow::{Context, Result, anyhow};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStdin, ChildStdout, Command},
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::test]
async fn cli_relay_end_to_end() -> Result<()> {
    let binary = assert_cmd::cargo::cargo_bin!("ws_relay");

    let (mut relay_child, mut relay_stdout) = spawn_relay(&binary).await?;
    let addr = read_relay_addr(&mut relay_stdout).await?;

    // Drain additional relay logs in the background so the pipe never fills.
    let relay_log_task = tokio::spawn(async move {
        drain_stdout(relay_stdout).await;
    });

    let mut p1 = spawn_client(&binary, &addr).await?;
    let mut p2 = spawn_client(&binary, &addr).await?;

    // p2's own echo proves both peers are registered before the exchange.
    p2.send_line("p2 checking in").await.context("p2 probe")?;
    expect_broadcast(&mut p2, "p2 checking in", "waiting for p2 echo").await?;
    expect_broadcast(&mut p1, "p2 checking in", "waiting for p1 to hear p2").await?;

    // p1 speaks; the broadcast is delivered to both peers, p1 included.
    p1.send_line("hello").await.context("p1 send hello")?;
    expect_broadcast(&mut p1, "hello", "waiting for p1 echo").await?;
    expect_broadcast(&mut p2, "hello", "waiting for p2 to hear p1").await?;

    // p2 leaves; the relay keeps serving the remaining peer.
    p2.send_line("/quit").await.context("p2 send quit")?;
    let p2_quit = read_line_expect(&mut p2.stdout, "waiting for p2 quit confirmation").await?;
    assert_eq!(p2_quit, "*** leaving relay");
    ensure_success(&mut p2.child, "p2 client").await?;

    p1.send_line("again").await.context("p1 send again")?;
    expect_broadcast(&mut p1, "again", "waiting for p1 after p2 left").await?;

    p1.send_line("/quit").await.context("p1 send quit")?;
    let p1_quit = read_line_expect(&mut p1.stdout, "waiting for p1 quit confirmation").await?;
    assert_eq!(p1_quit, "*** leaving relay");
    ensure_success(&mut p1.child, "p1 client").await?;

    // Relay stays up after clients disconnect; terminate it manually.
    let _ = relay_child.kill().await;
    let _ = relay_child.wait().await;
    let _ = relay_log_task.await;

    Ok(())
}

struct ClientProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ClientProcess {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.stdin
            .write_all(line.as_bytes())
            .await
            .with_context(|| format!("failed to send line '{line}'"))?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }
}

async fn expect_broadcast(client: &mut ClientProcess, payload: &str, description: &str) -> Result<()> {
    let line = read_line_expect(&mut client.stdout, description).await?;
    let prefix = format!("{payload} : ");
    if !line.starts_with(&prefix) {
        return Err(anyhow!("{description}: unexpected frame '{line}'"));
    }
    Ok(())
}

async fn spawn_relay(binary: &Path) -> Result<(Child, BufReader<ChildStdout>)> {
    let mut cmd = Command::new(binary);
    cmd.arg("serve")
        .arg("--listen")
        .arg("127.0.0.1:0")
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().context("failed to spawn relay")?;
    let stdout = child
        .stdout
        .take()
        .context("relay stdout missing after spawn")?;

    Ok((child, BufReader::new(stdout)))
}

async fn read_relay_addr(reader: &mut BufReader<ChildStdout>) -> Result<String> {
    let line = read_line(reader)
        .await?
        .context("relay did not emit listening address")?;
    let trimmed = line.trim();
    let addr = trimmed
        .split_whitespace()
        .last()
        .context("unexpected relay banner format")?;
    if !addr.contains(':') {
        return Err(anyhow!("relay banner missing socket: {trimmed}"));
    }
    Ok(addr.to_string())
}

async fn spawn_client(binary: &Path, addr: &str) -> Result<ClientProcess> {
    let mut cmd = Command::new(binary);
    cmd.arg("client")
        .arg("--server")
        .arg(addr)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = cmd.spawn().context("failed to spawn client")?;

    let stdin = child
        .stdin
        .take()
        .context("client stdin missing after spawn")?;
    let stdout = child
        .stdout
        .take()
        .context("client stdout missing after spawn")?;

    let mut process = ClientProcess {
        child,
        stdin,
        stdout: BufReader::new(stdout),
    };

    let banner = read_line_expect(&mut process.stdout, "waiting for connect banner").await?;
    if banner != format!("*** connected to {addr}") {
        return Err(anyhow!("expected connect banner, got '{banner}'"));
    }

    Ok(process)
}

async fn read_line_expect(
    reader: &mut BufReader<ChildStdout>,
    description: &str,
) -> Result<String> {
    match read_line(reader).await {
        Ok(Some(line)) => Ok(line),
        Ok(None) => Err(anyhow!("{description}: stream closed")),
        Err(err) => Err(err.context(format!("{description}: failed to read line"))),
    }
}

async fn read_line(reader: &mut BufReader<ChildStdout>) -> Result<Option<String>> {
    let mut line = String::new();
    let read_future = reader.read_line(&mut line);
    let bytes_io = match timeout(READ_TIMEOUT, read_future).await {
        Ok(result) => result,
        Err(_) => return Err(anyhow!("timed out waiting for line")),
    };
    let byte_count = bytes_io?;
    if byte_count == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn drain_stdout(mut reader: BufReader<ChildStdout>) {
    let mut buffer = String::new();
    while reader
        .read_line(&mut buffer)
        .await
        .map(|bytes| {
            let has_data = bytes > 0;
            if has_data {
                buffer.clear();
            }
            has_data
        })
        .unwrap_or(false)
    {}
}

async fn ensure_success(child: &mut Child, name: &str) -> Result<()> {
    let status = child
        .wait()
        .await
        .with_context(|| format!("failed to await {name} process"))?;
    if !status.success() {
        return Err(anyhow!("{name} exited with status {status}"));
    }
    Ok(())
}
