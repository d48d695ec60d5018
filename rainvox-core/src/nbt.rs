//! Helpers for reading loosely typed NBT tags.

use rainvox_utils::BlockPos;
use simdnbt::owned::{NbtCompound, NbtList, NbtTag};

use crate::error::NbtLoadError;

/// Helper to parse i32 from NBT
#[must_use]
pub fn nbt_i32(tag: &NbtTag) -> Option<i32> {
    match tag {
        NbtTag::Byte(b) => Some(i32::from(*b)),
        NbtTag::Short(s) => Some(i32::from(*s)),
        NbtTag::Int(i) => Some(*i),
        _ => None,
    }
}

/// Helper to parse f32 from NBT, accepting doubles and integers
#[must_use]
pub fn nbt_f32(tag: &NbtTag) -> Option<f32> {
    match tag {
        NbtTag::Float(f) => Some(*f),
        NbtTag::Double(d) => Some(*d as f32),
        other => nbt_i32(other).map(|i| i as f32),
    }
}

/// Reads an optional float, falling back to `default` when absent or mistyped.
#[must_use]
pub fn float_or(nbt: &NbtCompound, key: &str, default: f32) -> f32 {
    nbt.get(key).and_then(nbt_f32).unwrap_or(default)
}

/// Reads a required int.
pub fn require_i32(nbt: &NbtCompound, key: &'static str) -> Result<i32, NbtLoadError> {
    let tag = nbt.get(key).ok_or(NbtLoadError::MissingTag(key))?;
    nbt_i32(tag).ok_or(NbtLoadError::WrongType(key))
}

/// Reads a list of compounds. An empty list may be stored without an element type.
pub fn require_compounds<'a>(
    nbt: &'a NbtCompound,
    key: &'static str,
) -> Result<&'a [NbtCompound], NbtLoadError> {
    match nbt.get(key) {
        None => Err(NbtLoadError::MissingTag(key)),
        Some(NbtTag::List(NbtList::Compound(list))) => Ok(list.as_slice()),
        Some(NbtTag::List(NbtList::Empty)) => Ok(&[]),
        Some(_) => Err(NbtLoadError::WrongType(key)),
    }
}

/// Writes a position as `X`, `Y` and `Z` int tags.
pub fn write_pos(nbt: &mut NbtCompound, pos: BlockPos) {
    nbt.insert("X", NbtTag::Int(pos.x()));
    nbt.insert("Y", NbtTag::Int(pos.y()));
    nbt.insert("Z", NbtTag::Int(pos.z()));
}

/// Reads a position written by [`write_pos`].
pub fn read_pos(nbt: &NbtCompound) -> Result<BlockPos, NbtLoadError> {
    Ok(BlockPos::new(
        require_i32(nbt, "X")?,
        require_i32(nbt, "Y")?,
        require_i32(nbt, "Z")?,
    ))
}
