use failure::{Error, Fail};

use log::debug;

use crate::session::clip::Clip;
use crate::session::{ClipIndex, TrackIndex};

#[derive(Debug, Fail)]
pub enum TrackError {
  #[fail(display = "No clip at slot {} of track {}", slot, track)]
  EmptySlot { track: TrackIndex, slot: ClipIndex },
}

/// A track of the remote session grid, holding the local clip proxies
/// for its slots.
///
/// The `playing` flag is a best-effort mirror: it is only touched by
/// `play_clip`/`stop_clip` (and by the group fan-out), never by queries.
pub struct Track {
  index: TrackIndex,
  playing: bool,
  clips: Vec<Option<Clip>>,
}

impl Track {
  pub fn new(index: TrackIndex) -> Track {
    Track {
      index,
      playing: false,
      clips: Vec::new(),
    }
  }

  pub fn get_index(&self) -> TrackIndex {
    self.index
  }

  pub fn is_playing(&self) -> bool {
    self.playing
  }

  pub fn set_playing(&mut self, playing: bool) {
    self.playing = playing;
  }

  pub fn clips(&self) -> &[Option<Clip>] {
    self.clips.as_slice()
  }

  pub fn clip(&self, slot: ClipIndex) -> Option<&Clip> {
    self.clips.get(slot).and_then(Option::as_ref)
  }

  pub fn clip_mut(&mut self, slot: ClipIndex) -> Option<&mut Clip> {
    self.clips.get_mut(slot).and_then(Option::as_mut)
  }

  pub fn has_clip(&self, slot: ClipIndex) -> bool {
    self.clip(slot).is_some()
  }

  // Slot population is driven from outside, when the session grid is
  // scanned or restored
  pub fn put_clip(&mut self, slot: ClipIndex, clip: Clip) {
    if self.clips.len() <= slot {
      self.clips.resize_with(slot + 1, || None);
    }
    self.clips[slot] = Some(clip);
  }

  pub fn play_clip(&mut self, slot: ClipIndex) -> Result<(), Error> {
    let index = self.index;
    let clip = self
      .clips
      .get_mut(slot)
      .and_then(Option::as_mut)
      .ok_or(TrackError::EmptySlot { track: index, slot })?;
    clip.play()?;
    self.playing = true;
    Ok(())
  }

  pub fn stop_clip(&mut self, slot: ClipIndex) -> Result<(), Error> {
    let index = self.index;
    let clip = self
      .clips
      .get_mut(slot)
      .and_then(Option::as_mut)
      .ok_or(TrackError::EmptySlot { track: index, slot })?;
    clip.stop()?;
    self.playing = false;
    Ok(())
  }
}

/// A track that contains member tracks. Firing one of its clip slots
/// makes the remote fire the same slot across every member.
pub struct Group {
  track: Track,
  tracks: Vec<Track>,
}

impl Group {
  pub fn new(index: TrackIndex) -> Group {
    Group {
      track: Track::new(index),
      tracks: Vec::new(),
    }
  }

  pub fn get_index(&self) -> TrackIndex {
    self.track.get_index()
  }

  pub fn is_playing(&self) -> bool {
    self.track.is_playing()
  }

  pub fn set_playing(&mut self, playing: bool) {
    self.track.set_playing(playing);
  }

  pub fn clip(&self, slot: ClipIndex) -> Option<&Clip> {
    self.track.clip(slot)
  }

  pub fn has_clip(&self, slot: ClipIndex) -> bool {
    self.track.has_clip(slot)
  }

  pub fn put_clip(&mut self, slot: ClipIndex, clip: Clip) {
    self.track.put_clip(slot, clip);
  }

  pub fn add_track(&mut self, track: Track) {
    self.tracks.push(track);
  }

  pub fn tracks(&self) -> &[Track] {
    self.tracks.as_slice()
  }

  pub fn tracks_mut(&mut self) -> &mut [Track] {
    self.tracks.as_mut_slice()
  }

  pub fn play_clip(&mut self, slot: ClipIndex) -> Result<(), Error> {
    self.track.play_clip(slot)?;

    // the remote fires this slot in every member track as a side effect,
    // so the member mirrors have to follow without another round trip
    debug!("group {} fired slot {}", self.track.get_index(), slot);
    for track in self.tracks.iter_mut() {
      let has_clip = track.has_clip(slot);
      track.set_playing(has_clip);
    }

    Ok(())
  }

  // Stopping a group clip does not cascade to the member tracks
  pub fn stop_clip(&mut self, slot: ClipIndex) -> Result<(), Error> {
    self.track.stop_clip(slot)
  }
}
