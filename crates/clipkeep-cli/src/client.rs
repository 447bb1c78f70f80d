//! Blocking client for the daemon's control socket.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clipkeep_core::protocol::{DaemonInfo, Request, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DaemonClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl DaemonClient {
    /// Finds the daemon through the info file it writes at startup.
    pub fn connect(info_path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(info_path).with_context(|| {
            format!(
                "clipkeepd is not running (no {}); start it with `clipkeepd`",
                info_path.display()
            )
        })?;
        let info: DaemonInfo = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", info_path.display()))?;
        Self::connect_port(info.port).with_context(|| {
            format!(
                "clipkeepd is not running (pid {} no longer listening on port {})",
                info.pid, info.port
            )
        })
    }

    pub fn connect_port(port: u16) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        debug!(%addr, "connected to clipkeepd");
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        })
    }

    /// Sends one request and returns the `data` of a successful response.
    pub fn call(&mut self, req: &Request) -> Result<Value> {
        let line = serde_json::to_string(req)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;

        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            bail!("clipkeepd closed the connection");
        }
        let resp: Response<Value> = serde_json::from_str(buf.trim())?;
        if !resp.ok {
            return Err(anyhow!(resp
                .error
                .unwrap_or_else(|| "request failed".to_string())));
        }
        Ok(resp.data.unwrap_or(Value::Null))
    }

    pub fn call_as<T: DeserializeOwned>(&mut self, req: &Request) -> Result<T> {
        let value = self.call(req)?;
        serde_json::from_value(value).context("unexpected response from clipkeepd")
    }
}
