use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, instrument};

use crate::aof::{Aof, AppendFsync};
use crate::config::Config;
use crate::connection::{Connection, ConnectionError, TxState};
use crate::engine::Engine;
use crate::frame::Frame;
use crate::stats::Stats;
use crate::timer::TimerWheel;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let stats = Arc::new(Stats::new(config.port));

    let aof = if config.aof_enabled {
        Some(Arc::new(Aof::new(&config.aof_file, config.appendfsync)?))
    } else {
        None
    };

    let mut engine = Engine::new(Arc::clone(&stats), aof.clone());
    if config.aof_enabled {
        let records = Aof::replay(&config.aof_file)?;
        info!(records = records.len(), "replaying append-only file");
        engine.replay(records);
    }
    let engine = Arc::new(Mutex::new(engine));

    let timers = TimerWheel::new();
    timers.start();
    {
        // Background expiry sweep, once per second.
        let engine = Arc::clone(&engine);
        timers.add_repeating(Duration::from_secs(1), Duration::from_secs(1), move || {
            engine.lock().unwrap().sweep_expired();
        });
    }
    if let Some(aof) = &aof {
        if config.appendfsync == AppendFsync::EverySec {
            let aof = Arc::clone(aof);
            timers.add_repeating(Duration::from_secs(1), Duration::from_secs(1), move || {
                aof.flush_if_pending();
            });
        }
    }

    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("rudis server listening on {}", listener.local_addr()?);

    tokio::select! {
        res = accept_loop(listener, engine, stats) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            if let Some(aof) = &aof {
                aof.flush();
            }
            Ok(())
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    engine: Arc<Mutex<Engine>>,
    stats: Arc<Stats>,
) -> Result<(), Error> {
    loop {
        let (socket, client_address) = listener.accept().await?;
        let engine = Arc::clone(&engine);
        let stats = Arc::clone(&stats);
        stats.client_connected();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, engine).await {
                error!("connection error: {}", e);
            }
            stats.client_disconnected();
        });
    }
}

#[instrument(name = "connection", skip(stream, engine), fields(client_address = %client_address))]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    engine: Arc<Mutex<Engine>>,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, client_address);

    loop {
        let frame = match conn.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(ConnectionError::Protocol(err)) => {
                // Malformed framing: tell the client why, then hang up.
                let reply = Frame::Error(format!("ERR Protocol error: {err}"));
                let _ = conn.write_frame(&reply).await;
                return Err(err.into());
            }
            Err(ConnectionError::Io(err)) => return Err(err.into()),
        };
        debug!("Received frame from client: {:?}", frame);

        // Transaction control runs on the connection itself; everything
        // else goes through the engine.
        let reply = match (control_command(&frame).as_deref(), conn.state) {
            (Some("MULTI"), TxState::Normal) => {
                conn.state = TxState::InTransaction;
                conn.queue.clear();
                Frame::Simple("OK".to_string())
            }
            (Some("MULTI"), TxState::InTransaction) => {
                Frame::Error("ERR MULTI calls can not be nested".to_string())
            }
            (Some("EXEC"), TxState::InTransaction) => {
                let queue = std::mem::take(&mut conn.queue);
                conn.state = TxState::Normal;
                engine.lock().unwrap().execute_transaction(queue)
            }
            (Some("EXEC"), TxState::Normal) => {
                Frame::Error("ERR EXEC without MULTI".to_string())
            }
            (Some("DISCARD"), TxState::InTransaction) => {
                conn.queue.clear();
                conn.state = TxState::Normal;
                Frame::Simple("OK".to_string())
            }
            (Some("DISCARD"), TxState::Normal) => {
                Frame::Error("ERR DISCARD without MULTI".to_string())
            }
            (_, TxState::InTransaction) => {
                conn.queue.push(frame);
                Frame::Simple("QUEUED".to_string())
            }
            (_, TxState::Normal) => engine.lock().unwrap().execute(frame, false),
        };

        conn.write_frame(&reply).await?;
    }

    debug!("Connection closed");
    Ok(())
}

/// The uppercased name of a request whose first element is a string frame,
/// if it is one of the transaction-control commands.
fn control_command(frame: &Frame) -> Option<String> {
    let Frame::Array(parts) = frame else {
        return None;
    };
    let name = match parts.first() {
        Some(Frame::Bulk(bytes)) => String::from_utf8_lossy(bytes).to_uppercase(),
        Some(Frame::Simple(s)) => s.to_uppercase(),
        _ => return None,
    };
    matches!(name.as_str(), "MULTI" | "EXEC" | "DISCARD").then_some(name)
}
