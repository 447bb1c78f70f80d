//! Loopback control socket: one JSON request per line, one JSON response per
//! line. Every request becomes a command on the event loop.

use anyhow::Result;
use clipkeep_core::protocol::{ImagePayload, Request, Response};
use clipkeep_core::{AppHandle, EntryId};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

pub async fn serve(listener: TcpListener, app: AppHandle) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "client connected");
                let app = app.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, app).await {
                        warn!(%peer, error = %e, "client error");
                    }
                    debug!(%peer, "client disconnected");
                });
            }
            Err(e) => warn!(error = %e, "accept error"),
        }
    }
}

async fn handle_client(stream: TcpStream, app: AppHandle) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(&line) {
            Ok(req) => {
                let shutdown = matches!(req, Request::Shutdown);
                let resp = dispatch(&app, req).await;
                if shutdown {
                    write_line(&mut write, &resp).await?;
                    return Ok(());
                }
                resp
            }
            Err(e) => Response::err(format!("bad request: {e}")),
        };
        write_line(&mut write, &resp).await?;
    }
    Ok(())
}

async fn write_line(
    write: &mut tokio::net::tcp::OwnedWriteHalf,
    resp: &Response<Value>,
) -> Result<()> {
    let mut s = serde_json::to_string(resp)?;
    s.push('\n');
    write.write_all(s.as_bytes()).await?;
    write.flush().await?;
    Ok(())
}

fn reply<T: Serialize>(r: clipkeep_core::Result<T>) -> Response<Value> {
    let value = r
        .map_err(|e| e.to_string())
        .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string()));
    match value {
        Ok(v) => Response::ok(v),
        Err(e) => Response::err(e),
    }
}

/// Unknown ids are a no-op, not a failure: the entry may have just been
/// evicted or deleted.
fn found(id: EntryId, r: clipkeep_core::Result<bool>) -> Response<Value> {
    reply(r.map(|found| json!({ "id": id, "found": found })))
}

async fn dispatch(app: &AppHandle, req: Request) -> Response<Value> {
    match req {
        Request::Health => Response::ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "now": chrono::Utc::now().timestamp(),
        })),
        Request::List { limit } => reply(app.list(limit).await),
        Request::Image { id } => match app.image(id).await {
            Ok(Some(png)) => reply(Ok(ImagePayload::new(id, &png))),
            Ok(None) => Response::err(format!("no image entry: {id}")),
            Err(e) => Response::err(e.to_string()),
        },
        Request::Pin { id } => reply(app.toggle_pin(id).await.map(|pinned| {
            json!({ "id": id, "found": pinned.is_some(), "pinned": pinned })
        })),
        Request::Delete { id } => found(id, app.delete(id).await),
        Request::Activate { id } => found(id, app.activate(id).await),
        Request::Copy { id } => found(id, app.copy(id).await),
        Request::Toggle => reply(app.toggle().await),
        Request::FocusLost => reply(app.focus_lost().await),
        Request::Rebind { binding } => reply(
            app.rebind(binding)
                .await
                .map(|()| json!({ "binding": binding, "shortcut": binding.to_string() })),
        ),
        Request::Status => reply(app.status().await),
        Request::Shutdown => reply(app.shutdown().map(|()| Value::Bool(true))),
    }
}
