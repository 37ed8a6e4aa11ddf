use anyhow::{Context, Result};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    select,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, Utf8Bytes},
};
use tracing::{info, warn};

use crate::cli::ClientArgs;

type RelaySink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type RelaySource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub async fn run(args: ClientArgs) -> Result<()> {
    let (mut sink, mut source) = establish_connection(&args).await?;

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();

    run_client_loop(&mut sink, &mut source, &mut stdin, &mut input).await?;
    shutdown_connection(&mut sink).await;

    Ok(())
}

async fn establish_connection(args: &ClientArgs) -> Result<(RelaySink, RelaySource)> {
    let (stream, _) = connect_async(format!("ws://{}", args.server))
        .await
        .with_context(|| format!("failed to connect to ws://{}", args.server))?;

    info!("connected to ws://{}", args.server);
    write_stdout(&format!("*** connected to {}", args.server)).await?;

    Ok(stream.split())
}

async fn run_client_loop(
    sink: &mut RelaySink,
    source: &mut RelaySource,
    stdin: &mut BufReader<tokio::io::Stdin>,
    input: &mut String,
) -> Result<()> {
    loop {
        input.clear();
        select! {
            frame = source.next() => {
                if !handle_relay_frame(frame).await? {
                    break;
                }
            }
            bytes_read = stdin.read_line(input) => {
                if !handle_stdin_input(bytes_read, input, sink).await? {
                    break;
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                handle_ctrl_c(ctrl_c);
                break;
            }
        }
    }
    Ok(())
}

async fn handle_relay_frame(frame: Option<Result<Message, tungstenite::Error>>) -> Result<bool> {
    match frame {
        Some(Ok(Message::Text(text))) => {
            write_stdout(text.as_str()).await?;
            Ok(true)
        }
        Some(Ok(Message::Close(_))) | None => {
            write_stdout("*** relay closed the connection").await?;
            Ok(false)
        }
        Some(Ok(_)) => Ok(true),
        Some(Err(error)) => {
            write_stderr(&format!("!!! connection error: {error}")).await?;
            Ok(false)
        }
    }
}

async fn handle_stdin_input(
    bytes_read: io::Result<usize>,
    input: &str,
    sink: &mut RelaySink,
) -> Result<bool> {
    let bytes_read = bytes_read?;
    if bytes_read == 0 {
        return Ok(false);
    }

    let text = input.trim_end();
    if text.is_empty() {
        return Ok(true);
    }

    if text.eq_ignore_ascii_case("/quit") {
        write_stdout("*** leaving relay").await?;
        return Ok(false);
    }

    sink.send(Message::Text(Utf8Bytes::from(text.to_string())))
        .await?;
    Ok(true)
}

fn handle_ctrl_c(result: io::Result<()>) {
    if let Err(error) = result {
        warn!(?error, "ctrl-c handler failed");
    }
}

async fn shutdown_connection(sink: &mut RelaySink) {
    if let Err(error) = sink.close().await {
        warn!(?error, "failed to close client connection cleanly");
    }
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}
