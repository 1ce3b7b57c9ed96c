use std::time::Duration;

use log::debug;

use crossbeam_channel;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::{QueryError, Scalar, Transport};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// One message captured on its way to the remote end.
#[derive(Debug, Clone)]
pub struct Request {
  pub path: String,
  pub args: Vec<Scalar>,
  pub expects_reply: bool,
}

/// In-process transport binding.
///
/// Queries block on the reply channel; replies are correlated by order,
/// so callers are expected to issue one query at a time. Network bindings
/// live outside this crate, behind the same `Transport` trait.
pub struct ChannelTransport {
  request_tx: Sender<Request>,
  reply_rx: Receiver<Vec<Scalar>>,
  timeout: Duration,
}

/// The other side of a `channel_pair`, owned by whatever is standing in
/// for the remote application.
pub struct RemoteEnd {
  request_rx: Receiver<Request>,
  reply_tx: Sender<Vec<Scalar>>,
}

pub fn channel_pair() -> (ChannelTransport, RemoteEnd) {
  let (request_tx, request_rx) = crossbeam_channel::unbounded::<Request>();
  let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<Vec<Scalar>>();

  let transport = ChannelTransport {
    request_tx,
    reply_rx,
    timeout: DEFAULT_QUERY_TIMEOUT,
  };

  let remote = RemoteEnd {
    request_rx,
    reply_tx,
  };

  (transport, remote)
}

impl ChannelTransport {
  pub fn set_timeout(&mut self, timeout: Duration) {
    self.timeout = timeout;
  }
}

impl Transport for ChannelTransport {
  fn query(&self, path: &str, args: &[Scalar]) -> Result<Vec<Scalar>, QueryError> {
    debug!("query {} {:?}", path, args);

    self
      .request_tx
      .send(Request {
        path: path.to_string(),
        args: args.to_vec(),
        expects_reply: true,
      })
      .map_err(|err| QueryError::Disconnected {
        cause: err.to_string(),
      })?;

    match self.reply_rx.recv_timeout(self.timeout) {
      Ok(values) => {
        debug!("reply {} {:?}", path, values);
        Ok(values)
      }
      Err(RecvTimeoutError::Timeout) => Err(QueryError::Timeout {
        path: path.to_string(),
      }),
      Err(RecvTimeoutError::Disconnected) => Err(QueryError::Disconnected {
        cause: "reply channel closed".to_string(),
      }),
    }
  }

  fn cmd(&self, path: &str, args: &[Scalar]) -> Result<(), QueryError> {
    debug!("cmd {} {:?}", path, args);

    self
      .request_tx
      .send(Request {
        path: path.to_string(),
        args: args.to_vec(),
        expects_reply: false,
      })
      .map_err(|err| QueryError::Disconnected {
        cause: err.to_string(),
      })
  }
}

impl RemoteEnd {
  pub fn recv(&self) -> Option<Request> {
    self.request_rx.recv().ok()
  }

  pub fn reply(&self, values: Vec<Scalar>) {
    drop(self.reply_tx.send(values));
  }
}
