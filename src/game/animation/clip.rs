// Animation clips and the library that owns them

use super::pose::{Pose, Transform, TransformRecord};
use super::{AnimationError, Skeleton};
use crate::core::math;
use crate::engine::assets::{load_archive, ArchiveReader, ArchiveWriter, AssetKind};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One key on a joint track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub transform: Transform,
}

impl Keyframe {
    pub fn new(time: f32, transform: Transform) -> Self {
        Self { time, transform }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct KeyframeRecord {
    time: f32,
    transform: TransformRecord,
}

/// Immutable keyframed animation: one track per skeleton joint
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationData {
    duration: f32,
    tracks: Vec<Vec<Keyframe>>,
}

impl AnimationData {
    /// Build animation data. Tracks must be non-empty and sorted by time.
    pub fn new(duration: f32, tracks: Vec<Vec<Keyframe>>) -> Result<Self, AnimationError> {
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(AnimationError::InvalidClip(format!(
                "duration must be positive, got {}",
                duration
            )));
        }

        for (index, track) in tracks.iter().enumerate() {
            if track.is_empty() {
                return Err(AnimationError::InvalidClip(format!("track {} has no keys", index)));
            }
            if track.windows(2).any(|pair| pair[1].time < pair[0].time) {
                return Err(AnimationError::InvalidClip(format!(
                    "track {} keys are not sorted by time",
                    index
                )));
            }
        }

        Ok(Self { duration, tracks })
    }

    /// Decode an animation archive held in memory
    pub fn from_archive_bytes(bytes: &[u8], path: &str) -> Result<Self, AnimationError> {
        let (header, mut reader) = ArchiveReader::open(bytes, AssetKind::Animation.tag(), path)?;

        let duration = reader.read_f32()?;
        // every track carries at least its key count
        let mut tracks = Vec::with_capacity(reader.record_capacity(header.count, 4)?);
        for _ in 0..header.count {
            let key_count = reader.read_u32()?;
            let key_count =
                reader.record_capacity(key_count, std::mem::size_of::<KeyframeRecord>())?;

            let mut keys = Vec::with_capacity(key_count);
            for _ in 0..key_count {
                let record: KeyframeRecord = reader.read_pod()?;
                keys.push(Keyframe::new(record.time, Transform::from(record.transform)));
            }
            tracks.push(keys);
        }

        Self::new(duration, tracks)
    }

    /// Encode as an animation archive
    pub fn to_archive_bytes(&self) -> Vec<u8> {
        let mut writer = ArchiveWriter::new(AssetKind::Animation.tag(), self.tracks.len() as u32);
        writer.write_f32(self.duration);
        for track in &self.tracks {
            writer.write_u32(track.len() as u32);
            for key in track {
                writer.write_pod(&KeyframeRecord {
                    time: key.time,
                    transform: key.transform.to_record(),
                });
            }
        }
        writer.finish()
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Interpolated transform of one track at `time`
    pub fn sample_track(&self, track: usize, time: f32) -> Option<Transform> {
        let keys = self.tracks.get(track)?;
        let next = keys.partition_point(|key| key.time <= time);

        let transform = if next == 0 {
            keys[0].transform
        } else if next == keys.len() {
            keys[keys.len() - 1].transform
        } else {
            let a = &keys[next - 1];
            let b = &keys[next];
            let span = b.time - a.time;
            let t = if span > 0.0 { (time - a.time) / span } else { 0.0 };
            a.transform.interpolate(&b.transform, t)
        };

        Some(transform)
    }

    /// Sample every track into `out`, resizing it to the track count
    pub fn sample(&self, time: f32, out: &mut Pose) {
        out.resize(self.tracks.len());
        for track in 0..self.tracks.len() {
            if let Some(transform) = self.sample_track(track, time) {
                out.set(track, transform);
            }
        }
    }
}

/// An animation asset with its own playback cursor.
///
/// A default clip has no data and reports `is_valid() == false` until a load
/// succeeds.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    name: String,
    path: Option<String>,
    data: Option<Arc<AnimationData>>,
    playback_time: f32,
    playback_speed: f32,
    playing: bool,
    looping: bool,
}

impl Default for AnimationClip {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: None,
            data: None,
            playback_time: 0.0,
            playback_speed: 1.0,
            playing: false,
            looping: true,
        }
    }
}

impl AnimationClip {
    /// Clip over already-decoded animation data
    pub fn from_data(name: &str, data: Arc<AnimationData>) -> Self {
        Self {
            name: name.to_string(),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Load a clip from disk, naming it after the file stem
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnimationError> {
        let mut clip = Self::default();
        clip.load_from_file(path)?;
        Ok(clip)
    }

    /// Replace the clip's data with the archive at `path`.
    ///
    /// On failure the clip is left exactly as it was.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), AnimationError> {
        let path = path.as_ref();
        let path_string = path.to_string_lossy().to_string();
        let bytes = load_archive(path)?;
        let data = AnimationData::from_archive_bytes(&bytes, &path_string)?;

        if self.name.is_empty() {
            self.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| path_string.clone());
        }
        self.data = Some(Arc::new(data));
        self.path = Some(path_string);
        self.playback_time = 0.0;

        log::info!(
            "Loaded animation '{}' ({:.3}s) from {}",
            self.name,
            self.duration(),
            path.display()
        );
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&Arc<AnimationData>> {
        self.data.as_ref()
    }

    /// Duration in seconds, zero for an invalid clip
    pub fn duration(&self) -> f32 {
        self.data.as_ref().map_or(0.0, |data| data.duration())
    }

    pub fn playback_time(&self) -> f32 {
        self.playback_time
    }

    /// Move the cursor. Looping clips wrap into `[0, duration)`, others clamp.
    pub fn set_playback_time(&mut self, time: f32) {
        if !self.is_valid() {
            return;
        }

        let duration = self.duration();
        self.playback_time = if self.looping {
            math::wrap(time, duration)
        } else {
            math::clamp(time, 0.0, duration)
        };
    }

    /// Playback position in `[0, 1]`
    pub fn playback_ratio(&self) -> f32 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        self.playback_time / duration
    }

    pub fn set_playback_ratio(&mut self, ratio: f32) {
        self.set_playback_time(ratio * self.duration());
    }

    /// Advance playback by `dt` seconds scaled by the playback speed
    pub fn update(&mut self, dt: f32) {
        if !self.playing || !self.is_valid() {
            return;
        }

        let duration = self.duration();
        let step = dt * self.playback_speed;
        let time = self.playback_time + step;

        if self.looping {
            self.playback_time = math::wrap(time, duration);
        } else if time >= duration {
            self.playback_time = duration;
            self.playing = false;
        } else if time <= 0.0 && step < 0.0 {
            // Reverse playback stops at the start
            self.playback_time = 0.0;
            self.playing = false;
        } else {
            self.playback_time = time.max(0.0);
        }
    }

    /// Sample the pose at the current cursor position
    pub fn sample(&self, skeleton: &Skeleton, out: &mut Pose) -> Result<(), AnimationError> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| AnimationError::InvalidClip(self.name.clone()))?;

        if data.num_tracks() != skeleton.num_joints() {
            return Err(AnimationError::TrackCountMismatch {
                tracks: data.num_tracks(),
                joints: skeleton.num_joints(),
            });
        }

        data.sample(self.playback_time, out);
        Ok(())
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Pause and rewind
    pub fn stop(&mut self) {
        self.playing = false;
        self.playback_time = 0.0;
    }

    /// Rewind without changing the playing flag
    pub fn reset(&mut self) {
        self.playback_time = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn playback_speed(&self) -> f32 {
        self.playback_speed
    }

    pub fn set_playback_speed(&mut self, speed: f32) {
        self.playback_speed = speed;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// File the clip was loaded from, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

/// Stable handle to a clip in a [`ClipLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(usize);

impl ClipId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owns every clip of one character; layers and states refer to clips by id
#[derive(Debug, Default)]
pub struct ClipLibrary {
    clips: Vec<AnimationClip>,
    by_name: HashMap<String, ClipId>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clip under its name. Duplicate names are rejected.
    pub fn insert(&mut self, clip: AnimationClip) -> Result<ClipId, AnimationError> {
        if self.by_name.contains_key(clip.name()) {
            return Err(AnimationError::DuplicateAnimation(clip.name().to_string()));
        }

        let id = ClipId(self.clips.len());
        self.by_name.insert(clip.name().to_string(), id);
        self.clips.push(clip);
        Ok(id)
    }

    pub fn get(&self, id: ClipId) -> Option<&AnimationClip> {
        self.clips.get(id.0)
    }

    pub fn get_mut(&mut self, id: ClipId) -> Option<&mut AnimationClip> {
        self.clips.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ClipId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, id: ClipId) -> bool {
        id.0 < self.clips.len()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clip names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.clips.iter().map(|clip| clip.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClipId, &AnimationClip)> {
        self.clips.iter().enumerate().map(|(i, clip)| (ClipId(i), clip))
    }
}
