use std::fmt;
use std::sync::Arc;

use log::debug;

use serde_derive::{Deserialize, Serialize};

use crate::query::{decode, object_path, FromScalar, QueryError, Scalar, Transport, NAMESPACE};
use crate::session::{ClipIndex, TrackIndex};

pub const DEFAULT_CLIP_LENGTH: f64 = 4.0;

const CLASS_IDENTIFIER: &'static str = "clip";

const DETAILS_FIELDS: usize = 8;
const NOTE_FIELDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
  Empty,
  Stopped,
  Playing,
  Starting,
}

impl ClipState {
  pub fn symbol(&self) -> char {
    match self {
      ClipState::Empty => ' ',
      ClipState::Stopped => '-',
      ClipState::Playing => '>',
      ClipState::Starting => '*',
    }
  }
}

/// Everything the remote reports about a clip in one round trip.
///
/// Decoded positionally from a flat scalar sequence; no field names are
/// transmitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipDetails {
  pub name: String,
  pub length: i64,
  pub signature_numerator: u32,
  pub signature_denominator: u32,
  pub start_marker: f64,
  pub end_marker: f64,
  pub loop_start: f64,
  pub loop_end: f64,
}

impl ClipDetails {
  pub fn from_scalars(path: &str, values: &[Scalar]) -> Result<ClipDetails, QueryError> {
    if values.len() < DETAILS_FIELDS {
      return Err(QueryError::ShapeMismatch {
        path: path.to_string(),
        expected: DETAILS_FIELDS,
        actual: values.len(),
      });
    }

    Ok(ClipDetails {
      name: decode(path, &values[0])?,
      length: decode(path, &values[1])?,
      signature_numerator: decode(path, &values[2])?,
      signature_denominator: decode(path, &values[3])?,
      start_marker: decode(path, &values[4])?,
      end_marker: decode(path, &values[5])?,
      loop_start: decode(path, &values[6])?,
      loop_end: decode(path, &values[7])?,
    })
  }

  pub fn to_scalars(&self) -> Vec<Scalar> {
    vec![
      Scalar::from(self.name.as_str()),
      Scalar::from(self.length),
      Scalar::from(self.signature_numerator),
      Scalar::from(self.signature_denominator),
      Scalar::from(self.start_marker),
      Scalar::from(self.end_marker),
      Scalar::from(self.loop_start),
      Scalar::from(self.loop_end),
    ]
  }
}

/// A single note event: (pitch, start_time, duration, velocity, mute).
///
/// Notes have no identity of their own; they only ever travel as flat
/// groups of five scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
  pub pitch: u8,
  pub start_time: f64,
  pub duration: f64,
  pub velocity: u8,
  pub mute: bool,
}

impl Note {
  pub fn new(pitch: u8, start_time: f64, duration: f64, velocity: u8, mute: bool) -> Note {
    Note {
      pitch,
      start_time,
      duration,
      velocity,
      mute,
    }
  }

  pub fn from_scalars(path: &str, values: &[Scalar]) -> Result<Note, QueryError> {
    if values.len() < NOTE_FIELDS {
      return Err(QueryError::ShapeMismatch {
        path: path.to_string(),
        expected: NOTE_FIELDS,
        actual: values.len(),
      });
    }

    Ok(Note {
      pitch: decode(path, &values[0])?,
      start_time: decode(path, &values[1])?,
      duration: decode(path, &values[2])?,
      velocity: decode(path, &values[3])?,
      mute: decode(path, &values[4])?,
    })
  }

  pub fn to_scalars(&self) -> Vec<Scalar> {
    vec![
      Scalar::from(self.pitch),
      Scalar::from(self.start_time),
      Scalar::from(self.duration),
      Scalar::from(self.velocity),
      Scalar::from(self.mute),
    ]
  }
}

// A trailing partial group is dropped, as the wire format's slicing
// semantics have it.
pub(crate) fn decode_notes(path: &str, values: &[Scalar]) -> Result<Vec<Note>, QueryError> {
  values
    .chunks(NOTE_FIELDS)
    .filter(|chunk| chunk.len() == NOTE_FIELDS)
    .map(|chunk| Note::from_scalars(path, chunk))
    .collect()
}

// Expands an explicit table of remote-backed properties into getter and
// setter pairs over get_property/set_property. Every read is a fresh
// round trip; nothing is cached locally.
macro_rules! remote_properties {
  ($($(#[$meta:meta])* $getter:ident, $setter:ident: $ty:ty => $prop:expr;)*) => {
    $(
      $(#[$meta])*
      pub fn $getter(&self) -> Result<$ty, QueryError> {
        self.get_property($prop)
      }

      pub fn $setter(&self, value: $ty) -> Result<(), QueryError> {
        self.set_property($prop, Scalar::from(value))
      }
    )*
  };
}

/// A handle on one clip slot of the remote session grid.
///
/// The authoritative clip lives in the remote application; `name`,
/// `length` and `state` are best-effort local mirrors that can drift
/// except where explicitly refreshed with a query.
pub struct Clip {
  transport: Arc<dyn Transport>,
  track: TrackIndex,
  index: ClipIndex,
  name: String,
  length: f64,
  state: ClipState,
}

impl Clip {
  pub fn new<T>(
    transport: Arc<dyn Transport>,
    track: TrackIndex,
    index: ClipIndex,
    name: T,
  ) -> Clip
  where
    T: Into<String>,
  {
    Clip::with_length(transport, track, index, name, DEFAULT_CLIP_LENGTH)
  }

  pub fn with_length<T>(
    transport: Arc<dyn Transport>,
    track: TrackIndex,
    index: ClipIndex,
    name: T,
    length: f64,
  ) -> Clip
  where
    T: Into<String>,
  {
    Clip {
      transport,
      track,
      index,
      name: name.into(),
      length,
      state: ClipState::Stopped,
    }
  }

  pub fn track_index(&self) -> TrackIndex {
    self.track
  }

  pub fn index(&self) -> ClipIndex {
    self.index
  }

  pub fn get_name(&self) -> &str {
    self.name.as_str()
  }

  pub fn get_length(&self) -> f64 {
    self.length
  }

  // Local mirror only; the remote is not told about it
  pub fn set_length(&mut self, length: f64) {
    self.length = length;
  }

  pub fn get_state(&self) -> ClipState {
    self.state
  }

  // For whatever populates the slots; play/stop assert Playing/Stopped
  // themselves and nothing else in here touches the mirror
  pub fn set_state(&mut self, state: ClipState) {
    self.state = state;
  }

  fn address(&self) -> Vec<Scalar> {
    vec![Scalar::from(self.track), Scalar::from(self.index)]
  }

  /// Start playing the clip.
  ///
  /// Fires the clip slot rather than the clip: group tracks have clip
  /// slots without clips, and the remote fires those the same way.
  pub fn play(&mut self) -> Result<(), QueryError> {
    debug!("firing clip ({},{})", self.track, self.index);
    self
      .transport
      .cmd(&format!("/{}/clip_slot/fire", NAMESPACE), &self.address())?;
    self.state = ClipState::Playing;
    Ok(())
  }

  /// Stop playing the clip.
  pub fn stop(&mut self) -> Result<(), QueryError> {
    debug!("stopping clip ({},{})", self.track, self.index);
    self
      .transport
      .cmd(&format!("/{}/clip/stop", NAMESPACE), &self.address())?;
    self.state = ClipState::Stopped;
    Ok(())
  }

  pub fn details(&self) -> Result<ClipDetails, QueryError> {
    let path = object_path(CLASS_IDENTIFIER, "get", "details");
    let response = self.transport.query(&path, &self.address())?;
    // the first two values echo the track and clip indices
    ClipDetails::from_scalars(&path, response.get(2..).unwrap_or(&[]))
  }

  pub fn notes(&self) -> Result<Vec<Note>, QueryError> {
    let path = object_path(CLASS_IDENTIFIER, "get", "notes");
    let response = self.transport.query(&path, &self.address())?;
    // the first two values echo the track and clip indices, the rest are
    // (pitch, start_time, duration, velocity, mute) groups
    decode_notes(&path, response.get(2..).unwrap_or(&[]))
  }

  /// Clear all notes in the clip.
  pub fn remove_notes(&self) -> Result<(), QueryError> {
    self
      .transport
      .cmd(&format!("/{}/clip/remove/notes", NAMESPACE), &self.address())
  }

  /// Add a note event to the clip. No range validation happens here; the
  /// remote is the judge of pitch and velocity.
  pub fn add_note(
    &self,
    pitch: u8,
    start_time: f64,
    duration: f64,
    velocity: u8,
    mute: bool,
  ) -> Result<(), QueryError> {
    let mut args = self.address();
    args.extend(Note::new(pitch, start_time, duration, velocity, mute).to_scalars());
    self
      .transport
      .cmd(&format!("/{}/clip/add/notes", NAMESPACE), &args)
  }

  // One-way; the local name mirror is only refreshed when the slots are
  // rescanned or a snapshot is restored
  pub fn set_name(&self, name: &str) -> Result<(), QueryError> {
    let mut args = self.address();
    args.push(Scalar::from(name));
    self
      .transport
      .cmd(&object_path(CLASS_IDENTIFIER, "set", "name"), &args)
  }

  pub fn snapshot(&self) -> ClipSnapshot {
    ClipSnapshot {
      track: self.track,
      index: self.index,
      name: self.name.clone(),
      length: self.length,
    }
  }

  pub fn from_snapshot(transport: Arc<dyn Transport>, snapshot: ClipSnapshot) -> Clip {
    Clip::with_length(
      transport,
      snapshot.track,
      snapshot.index,
      snapshot.name,
      snapshot.length,
    )
  }

  fn get_property<T>(&self, prop: &str) -> Result<T, QueryError>
  where
    T: FromScalar,
  {
    let path = object_path(CLASS_IDENTIFIER, "get", prop);
    let response = self.transport.query(&path, &self.address())?;
    // the first two values echo the routing indices, the third is the value
    let value = response.get(2).ok_or_else(|| QueryError::ShapeMismatch {
      path: path.clone(),
      expected: 3,
      actual: response.len(),
    })?;
    decode(&path, value)
  }

  fn set_property(&self, prop: &str, value: Scalar) -> Result<(), QueryError> {
    let mut args = self.address();
    args.push(value);
    self
      .transport
      .cmd(&object_path(CLASS_IDENTIFIER, "set", prop), &args)
  }

  remote_properties! {
    /// Time signature numerator
    signature_numerator, set_signature_numerator: u32 => "signature_numerator";
    /// Time signature denominator
    signature_denominator, set_signature_denominator: u32 => "signature_denominator";
    /// Start marker in beats
    start_marker, set_start_marker: f64 => "start_marker";
    /// End marker in beats
    end_marker, set_end_marker: f64 => "end_marker";
    /// Loop start time in beats
    loop_start, set_loop_start: f64 => "loop_start";
    /// Loop end time in beats
    loop_end, set_loop_end: f64 => "loop_end";
    /// Coarse pitch bend in semitones
    pitch_coarse, set_pitch_coarse: i32 => "pitch_coarse";
    is_playing, set_is_playing: bool => "is_playing";
    is_midi_clip, set_is_midi_clip: bool => "is_midi_clip";
    is_audio_clip, set_is_audio_clip: bool => "is_audio_clip";
  }
}

impl fmt::Display for Clip {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = if self.name.is_empty() {
      String::new()
    } else {
      format!(": {}", self.name)
    };
    write!(
      f,
      "Clip ({},{}){} [{}]",
      self.track,
      self.index,
      name,
      self.state.symbol()
    )
  }
}

/// The subset of a clip that takes part in save/restore. Everything else
/// (state, transport handle) is transient and rebuilt on restore.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipSnapshot {
  pub track: TrackIndex,
  pub index: ClipIndex,
  pub name: String,
  pub length: f64,
}

#[cfg(test)]
mod test {

  use std::sync::Arc;

  use crate::query::testing::FakeTransport;
  use crate::query::{QueryError, Scalar};

  use super::{decode_notes, Clip, ClipDetails, ClipSnapshot, ClipState, Note};

  fn details_reply() -> Vec<Scalar> {
    vec![
      Scalar::Int(2),
      Scalar::Int(1),
      Scalar::Str("Intro".to_string()),
      Scalar::Int(8),
      Scalar::Int(4),
      Scalar::Int(4),
      Scalar::Float(0.0),
      Scalar::Float(8.0),
      Scalar::Float(0.0),
      Scalar::Float(4.0),
    ]
  }

  #[test]
  pub fn play_fires_the_clip_slot() {
    let transport = Arc::new(FakeTransport::new());
    let mut clip = Clip::new(transport.clone(), 2, 1, "Bass");

    clip.play().unwrap();

    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip_slot/fire".to_string(),
        vec![Scalar::Int(2), Scalar::Int(1)]
      )]
    );
    assert_eq!(clip.get_state(), ClipState::Playing);
  }

  #[test]
  pub fn stop_stops_the_clip() {
    let transport = Arc::new(FakeTransport::new());
    let mut clip = Clip::new(transport.clone(), 2, 1, "Bass");

    clip.play().unwrap();
    clip.stop().unwrap();

    assert_eq!(
      transport.sent()[1],
      (
        "/live/clip/stop".to_string(),
        vec![Scalar::Int(2), Scalar::Int(1)]
      )
    );
    assert_eq!(clip.get_state(), ClipState::Stopped);
  }

  #[test]
  pub fn details_drops_the_echoed_indices() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(details_reply());
    let clip = Clip::new(transport.clone(), 2, 1, "");

    let details = clip.details().unwrap();

    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip/get/details".to_string(),
        vec![Scalar::Int(2), Scalar::Int(1)]
      )]
    );
    assert_eq!(details.name, "Intro");
    assert_eq!(details.length, 8);
    assert_eq!(details.signature_numerator, 4);
    assert_eq!(details.signature_denominator, 4);
    assert_eq!(details.start_marker, 0.0);
    assert_eq!(details.end_marker, 8.0);
    assert_eq!(details.loop_start, 0.0);
    assert_eq!(details.loop_end, 4.0);
  }

  #[test]
  pub fn short_details_reply_is_an_error() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(vec![
      Scalar::Int(2),
      Scalar::Int(1),
      Scalar::Str("Intro".to_string()),
    ]);
    let clip = Clip::new(transport, 2, 1, "");

    match clip.details() {
      Err(QueryError::ShapeMismatch {
        expected, actual, ..
      }) => {
        assert_eq!(expected, 8);
        assert_eq!(actual, 1);
      }
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  pub fn details_round_trip() {
    let details = ClipDetails::from_scalars("/live/clip/get/details", &details_reply()[2..]).unwrap();
    let decoded =
      ClipDetails::from_scalars("/live/clip/get/details", &details.to_scalars()).unwrap();
    assert_eq!(decoded, details);
  }

  #[test]
  pub fn notes_strips_two_and_groups_by_five() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(vec![
      Scalar::Int(0),
      Scalar::Int(0),
      Scalar::Int(60),
      Scalar::Float(0.0),
      Scalar::Float(0.5),
      Scalar::Int(100),
      Scalar::Int(0),
      Scalar::Int(64),
      Scalar::Float(1.0),
      Scalar::Float(0.25),
      Scalar::Int(90),
      Scalar::Int(1),
    ]);
    let clip = Clip::new(transport.clone(), 0, 0, "");

    let notes = clip.notes().unwrap();

    assert_eq!(
      transport.sent()[0].0,
      "/live/clip/get/notes".to_string()
    );
    assert_eq!(
      notes,
      vec![
        Note::new(60, 0.0, 0.5, 100, false),
        Note::new(64, 1.0, 0.25, 90, true),
      ]
    );
  }

  #[test]
  pub fn partial_note_group_is_dropped() {
    let mut values = Vec::new();
    for note in &[Note::new(60, 0.0, 1.0, 100, false), Note::new(62, 1.0, 1.0, 100, false)] {
      values.extend(note.to_scalars());
    }
    values.push(Scalar::Int(64));
    values.push(Scalar::Float(2.0));
    values.push(Scalar::Float(1.0));

    let notes = decode_notes("/live/clip/get/notes", &values).unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].pitch, 62);
  }

  #[test]
  pub fn note_round_trip() {
    let note = Note::new(127, 3.5, 0.75, 64, true);
    let decoded = Note::from_scalars("/live/clip/get/notes", &note.to_scalars()).unwrap();
    assert_eq!(decoded, note);
  }

  #[test]
  pub fn add_note_sends_address_then_fields() {
    let transport = Arc::new(FakeTransport::new());
    let clip = Clip::new(transport.clone(), 1, 3, "");

    clip.add_note(60, 0.0, 0.5, 100, false).unwrap();

    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip/add/notes".to_string(),
        vec![
          Scalar::Int(1),
          Scalar::Int(3),
          Scalar::Int(60),
          Scalar::Float(0.0),
          Scalar::Float(0.5),
          Scalar::Int(100),
          Scalar::Bool(false),
        ]
      )]
    );
  }

  #[test]
  pub fn remove_notes_is_one_way() {
    let transport = Arc::new(FakeTransport::new());
    let clip = Clip::new(transport.clone(), 1, 3, "");

    clip.remove_notes().unwrap();

    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip/remove/notes".to_string(),
        vec![Scalar::Int(1), Scalar::Int(3)]
      )]
    );
  }

  #[test]
  pub fn set_name_leaves_the_mirror_alone() {
    let transport = Arc::new(FakeTransport::new());
    let clip = Clip::new(transport.clone(), 0, 0, "Bass");

    clip.set_name("Lead").unwrap();

    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip/set/name".to_string(),
        vec![
          Scalar::Int(0),
          Scalar::Int(0),
          Scalar::Str("Lead".to_string())
        ]
      )]
    );
    assert_eq!(clip.get_name(), "Bass");
  }

  #[test]
  pub fn property_getter_returns_the_third_slot() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(vec![Scalar::Int(2), Scalar::Int(1), Scalar::Float(1.5)]);
    let clip = Clip::new(transport.clone(), 2, 1, "");

    assert_eq!(clip.loop_start().unwrap(), 1.5);
    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip/get/loop_start".to_string(),
        vec![Scalar::Int(2), Scalar::Int(1)]
      )]
    );
  }

  #[test]
  pub fn property_setter_appends_the_value() {
    let transport = Arc::new(FakeTransport::new());
    let clip = Clip::new(transport.clone(), 2, 1, "");

    clip.set_loop_start(1.5).unwrap();

    assert_eq!(
      transport.sent(),
      vec![(
        "/live/clip/set/loop_start".to_string(),
        vec![Scalar::Int(2), Scalar::Int(1), Scalar::Float(1.5)]
      )]
    );
  }

  #[test]
  pub fn property_reply_without_value_is_an_error() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(vec![Scalar::Int(2), Scalar::Int(1)]);
    let clip = Clip::new(transport, 2, 1, "");

    match clip.is_playing() {
      Err(QueryError::ShapeMismatch { actual, .. }) => assert_eq!(actual, 2),
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  pub fn property_reply_with_wrong_type_is_an_error() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(vec![
      Scalar::Int(2),
      Scalar::Int(1),
      Scalar::Str("wat".to_string()),
    ]);
    let clip = Clip::new(transport, 2, 1, "");

    match clip.loop_end() {
      Err(QueryError::TypeMismatch { value, .. }) => {
        assert_eq!(value, Scalar::Str("wat".to_string()));
      }
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  pub fn boolean_property_accepts_integer_replies() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_reply(vec![Scalar::Int(0), Scalar::Int(0), Scalar::Int(1)]);
    let clip = Clip::new(transport, 0, 0, "");

    assert_eq!(clip.is_midi_clip().unwrap(), true);
  }

  #[test]
  pub fn display_with_name() {
    let transport = Arc::new(FakeTransport::new());
    let mut clip = Clip::new(transport, 2, 1, "Bass");
    clip.set_state(ClipState::Playing);

    assert_eq!(format!("{}", clip), "Clip (2,1): Bass [>]");
  }

  #[test]
  pub fn display_without_name() {
    let transport = Arc::new(FakeTransport::new());
    let clip = Clip::new(transport, 0, 0, "");

    assert_eq!(format!("{}", clip), "Clip (0,0) [-]");
  }

  #[test]
  pub fn state_symbols() {
    assert_eq!(ClipState::Empty.symbol(), ' ');
    assert_eq!(ClipState::Stopped.symbol(), '-');
    assert_eq!(ClipState::Playing.symbol(), '>');
    assert_eq!(ClipState::Starting.symbol(), '*');
  }

  #[test]
  pub fn snapshot_keeps_the_persistent_subset() {
    let transport = Arc::new(FakeTransport::new());
    let mut clip = Clip::with_length(transport, 3, 2, "Pad", 16.0);
    clip.set_state(ClipState::Playing);

    let snapshot = clip.snapshot();
    assert_eq!(
      snapshot,
      ClipSnapshot {
        track: 3,
        index: 2,
        name: "Pad".to_string(),
        length: 16.0,
      }
    );
  }

  #[test]
  pub fn snapshot_toml_round_trip() {
    let snapshot = ClipSnapshot {
      track: 3,
      index: 2,
      name: "Pad".to_string(),
      length: 16.0,
    };

    let serialized = toml::to_string(&snapshot).unwrap();
    let restored: ClipSnapshot = toml::from_str(&serialized).unwrap();
    assert_eq!(restored, snapshot);
  }

  #[test]
  pub fn restore_resets_the_transient_fields() {
    let transport = Arc::new(FakeTransport::new());
    let mut clip = Clip::with_length(transport.clone(), 3, 2, "Pad", 16.0);
    clip.set_state(ClipState::Playing);

    let restored = Clip::from_snapshot(transport, clip.snapshot());

    assert_eq!(restored.get_state(), ClipState::Stopped);
    assert_eq!(restored.get_name(), "Pad");
    assert_eq!(restored.get_length(), 16.0);
    assert_eq!(restored.track_index(), 3);
    assert_eq!(restored.index(), 2);
  }
}
