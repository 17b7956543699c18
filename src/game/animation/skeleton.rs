// Skeleton: joint hierarchy and bind pose

use super::pose::{Transform, TransformRecord};
use super::AnimationError;
use crate::engine::assets::{load_archive, ArchiveReader, ArchiveWriter, AssetError, AssetKind};
use std::path::Path;

/// A named joint and its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joint {
    pub name: String,
    /// `None` for root joints
    pub parent: Option<usize>,
}

impl Joint {
    pub fn new(name: &str, parent: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            parent,
        }
    }
}

/// Immutable bone hierarchy shared read-only by everything that animates it
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
    rest_pose: Vec<Transform>,
    /// Joint indices ordered so every parent precedes its children
    order: Vec<usize>,
    source_path: Option<String>,
}

impl Skeleton {
    /// Build a skeleton, rejecting missing parents and cycles
    pub fn new(joints: Vec<Joint>, rest_pose: Vec<Transform>) -> Result<Self, AnimationError> {
        if joints.is_empty() {
            return Err(AnimationError::InvalidSkeleton("no joints".to_string()));
        }
        if rest_pose.len() != joints.len() {
            return Err(AnimationError::InvalidSkeleton(format!(
                "{} rest transforms for {} joints",
                rest_pose.len(),
                joints.len()
            )));
        }

        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent {
                if parent >= joints.len() || parent == index {
                    return Err(AnimationError::InvalidSkeleton(format!(
                        "joint '{}' has invalid parent {}",
                        joint.name, parent
                    )));
                }
            }
        }

        let order = evaluation_order(&joints)?;

        Ok(Self {
            joints,
            rest_pose,
            order,
            source_path: None,
        })
    }

    /// Load a skeleton archive from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnimationError> {
        let path = path.as_ref();
        let bytes = load_archive(path)?;
        let mut skeleton = Self::from_archive_bytes(&bytes, &path.to_string_lossy())?;
        skeleton.source_path = Some(path.to_string_lossy().to_string());

        log::info!(
            "Loaded skeleton with {} joints from {}",
            skeleton.num_joints(),
            path.display()
        );
        Ok(skeleton)
    }

    /// Decode a skeleton archive held in memory
    pub fn from_archive_bytes(bytes: &[u8], path: &str) -> Result<Self, AnimationError> {
        let (header, mut reader) = ArchiveReader::open(bytes, AssetKind::Skeleton.tag(), path)?;

        // name length + parent + rest transform
        let min_joint_size = 4 + 4 + std::mem::size_of::<TransformRecord>();
        let capacity = reader.record_capacity(header.count, min_joint_size)?;
        let mut joints = Vec::with_capacity(capacity);
        let mut rest_pose = Vec::with_capacity(capacity);
        for _ in 0..header.count {
            let name = reader.read_string()?;
            let parent = match reader.read_i32()? {
                -1 => None,
                index if index >= 0 => Some(index as usize),
                index => {
                    return Err(AssetError::Malformed(format!(
                        "joint '{}' has parent index {}",
                        name, index
                    ))
                    .into())
                }
            };
            let record: TransformRecord = reader.read_pod()?;

            joints.push(Joint { name, parent });
            rest_pose.push(Transform::from(record));
        }

        Self::new(joints, rest_pose)
    }

    /// Encode as a skeleton archive
    pub fn to_archive_bytes(&self) -> Vec<u8> {
        let mut writer = ArchiveWriter::new(AssetKind::Skeleton.tag(), self.joints.len() as u32);
        for (joint, transform) in self.joints.iter().zip(&self.rest_pose) {
            writer.write_string(&joint.name);
            writer.write_i32(joint.parent.map_or(-1, |p| p as i32));
            writer.write_pod(&transform.to_record());
        }
        writer.finish()
    }

    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|joint| joint.name == name)
    }

    pub fn joint_name(&self, index: usize) -> Option<&str> {
        self.joints.get(index).map(|joint| joint.name.as_str())
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|joint| joint.name.as_str()).collect()
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.joints.get(index).and_then(|joint| joint.parent)
    }

    /// `false` for out of range indices
    pub fn is_root(&self, index: usize) -> bool {
        self.joints
            .get(index)
            .map_or(false, |joint| joint.parent.is_none())
    }

    pub fn rest_pose(&self) -> &[Transform] {
        &self.rest_pose
    }

    /// Parents-first joint order used by local-to-model conversion
    pub fn evaluation_order(&self) -> &[usize] {
        &self.order
    }

    /// File the skeleton was loaded from, if any
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }
}

/// Depth-first ordering that fails on cycles
fn evaluation_order(joints: &[Joint]) -> Result<Vec<usize>, AnimationError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; joints.len()];
    let mut order = Vec::with_capacity(joints.len());

    for start in 0..joints.len() {
        // Walk up to the first visited ancestor, then emit the chain top-down
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            match marks[index] {
                Mark::Done => break,
                Mark::Visiting => {
                    return Err(AnimationError::InvalidSkeleton(format!(
                        "cycle through joint '{}'",
                        joints[index].name
                    )))
                }
                Mark::Unvisited => {
                    marks[index] = Mark::Visiting;
                    chain.push(index);
                    current = joints[index].parent;
                }
            }
        }

        for &index in chain.iter().rev() {
            marks[index] = Mark::Done;
            order.push(index);
        }
    }

    Ok(order)
}
