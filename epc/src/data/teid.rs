use anyhow::{Result, ensure};

/// Hands out tunnel endpoint identifiers from a single monotonic space.  TEID 0 is never
/// allocated because it means "not yet assigned" in a GTP-C header.
#[derive(Debug, Default)]
pub struct TeidAllocator {
    last: u32,
}

impl TeidAllocator {
    /// An allocator whose next TEID will be `last + 1`.
    pub fn starting_after(last: u32) -> Self {
        TeidAllocator { last }
    }

    pub fn allocate(&mut self) -> Result<u32> {
        ensure!(self.last != u32::MAX, "TEID space exhausted");
        self.last += 1;
        Ok(self.last)
    }
}
