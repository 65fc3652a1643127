//! Resource access flags.
//!
//! Passes declare how they touch each resource with [`Access`]. The graph only
//! cares whether an access reads, writes, or both; the richer bits exist so a
//! device layer observing the graph can derive barriers from the same
//! declaration.

use bitflags::bitflags;

bitflags! {
    /// How a pass accesses a resource.
    ///
    /// Every bit belongs to either [`Access::READABLE`] or [`Access::WRITABLE`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        /// Generic read.
        const READ = 1 << 0;
        /// Generic write.
        const WRITE = 1 << 1;
        /// Sampled in a shader.
        const SHADER_READ = 1 << 2;
        /// Bound as uniform/constant data.
        const UNIFORM_READ = 1 << 3;
        /// Read as a storage buffer or image.
        const STORAGE_READ = 1 << 4;
        /// Read-only depth/stencil (depth test without writes).
        const DEPTH_READ = 1 << 5;
        /// Source of a copy.
        const COPY_SRC = 1 << 6;
        /// Written as a color attachment.
        const RENDER_TARGET = 1 << 7;
        /// Written as a depth/stencil attachment.
        const DEPTH_WRITE = 1 << 8;
        /// Written as a storage buffer or image.
        const STORAGE_WRITE = 1 << 9;
        /// Destination of a copy.
        const COPY_DST = 1 << 10;

        /// Generic read and write.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();

        /// Every bit that implies reading.
        const READABLE = Self::READ.bits()
            | Self::SHADER_READ.bits()
            | Self::UNIFORM_READ.bits()
            | Self::STORAGE_READ.bits()
            | Self::DEPTH_READ.bits()
            | Self::COPY_SRC.bits();

        /// Every bit that implies writing.
        const WRITABLE = Self::WRITE.bits()
            | Self::RENDER_TARGET.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::STORAGE_WRITE.bits()
            | Self::COPY_DST.bits();
    }
}

impl Access {
    /// Check if this access includes reading.
    pub fn reads(self) -> bool {
        self.intersects(Self::READABLE)
    }

    /// Check if this access includes writing.
    pub fn writes(self) -> bool {
        self.intersects(Self::WRITABLE)
    }

    /// Collapse onto the read/write classification used for scheduling.
    ///
    /// Returns `None` when neither bit is set.
    pub fn class(self) -> Option<AccessClass> {
        match (self.reads(), self.writes()) {
            (true, true) => Some(AccessClass::ReadWrite),
            (true, false) => Some(AccessClass::Read),
            (false, true) => Some(AccessClass::Write),
            (false, false) => None,
        }
    }
}

/// Scheduling-relevant part of an [`Access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessClass {
    /// Read-only access.
    Read,
    /// Write-only access.
    Write,
    /// Read and write access.
    ReadWrite,
}

impl AccessClass {
    /// Check if this class includes reading.
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Check if this class includes writing.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}
