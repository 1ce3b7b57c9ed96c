use std::sync::Arc;

use crate::query::{QueryError, Transport, NAMESPACE};
use crate::session::clip::{decode_notes, ClipDetails, Note};

/// A handle on whatever clip is currently selected in the remote
/// application's editor view.
///
/// Carries no state of its own: no coordinates, no mirrors. The remote
/// resolves the selection on every call, so two calls in a row may well
/// address two different clips.
pub struct DetailClip {
  transport: Arc<dyn Transport>,
}

fn view_path(verb: &str, prop: &str) -> String {
  format!("/{}/view/detail_clip/{}/{}", NAMESPACE, verb, prop)
}

impl DetailClip {
  pub fn new(transport: Arc<dyn Transport>) -> DetailClip {
    DetailClip { transport }
  }

  pub fn details(&self) -> Result<ClipDetails, QueryError> {
    let path = view_path("get", "details");
    let response = self.transport.query(&path, &[])?;
    // unlike the indexed clip queries there are no routing indices to
    // drop; the response is the details alone
    ClipDetails::from_scalars(&path, &response)
  }

  pub fn notes(&self) -> Result<Vec<Note>, QueryError> {
    let path = view_path("get", "notes");
    let response = self.transport.query(&path, &[])?;
    // notes-only response here as well, grouping starts at the first value
    decode_notes(&path, &response)
  }

  /// Clear all notes in the selected clip.
  pub fn remove_notes(&self) -> Result<(), QueryError> {
    self.transport.cmd(&view_path("remove", "notes"), &[])
  }

  /// Add a note event to the selected clip.
  pub fn add_note(
    &self,
    pitch: u8,
    start_time: f64,
    duration: f64,
    velocity: u8,
    mute: bool,
  ) -> Result<(), QueryError> {
    let args = Note::new(pitch, start_time, duration, velocity, mute).to_scalars();
    self.transport.cmd(&view_path("add", "notes"), &args)
  }
}
