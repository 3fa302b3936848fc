//! Bounds-checked byte region (C6): a borrowed view over a caller-owned
//! buffer, used as the substrate for the layout engine and typed view
//! rather than requiring values to live in owned `Vec<u8>`s. This is the
//! seam where IPC transports (shared memory, named pipes) hand a raw
//! buffer to the rest of the crate without it needing to know where the
//! bytes came from.

use crate::error::{ensure, error, Result};

/// An immutable bounds-checked view over a byte slice.
pub struct Region<'a> {
    bytes: &'a [u8],
}

/// A mutable bounds-checked view over a byte slice.
pub struct RegionMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> Region<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Region { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.bytes
    }

    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8]> {
        let end = self.checked_end(start, len)?;
        Ok(&self.bytes[start..end])
    }

    pub fn sub_region(&self, start: usize, len: usize) -> Result<Region<'a>> {
        let end = self.checked_end(start, len)?;
        Ok(Region::new(&self.bytes[start..end]))
    }

    pub fn copy_to(&self, start: usize, dst: &mut [u8]) -> Result<()> {
        let src = self.slice(start, dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    pub fn equal_at(&self, start: usize, other: &[u8]) -> Result<bool> {
        Ok(self.slice(start, other.len())? == other)
    }

    /// First offset at or after `from` where `needle` occurs, or `None`.
    pub fn find(&self, from: usize, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || from >= self.bytes.len() {
            return None;
        }
        self.bytes[from..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|p| p + from)
    }

    /// Allocate a fresh buffer of length `new_len`, copying
    /// `min(self.len(), new_len)` bytes from the start of this region and
    /// zero-filling the rest. This region is left untouched; the caller
    /// wraps the result in a new `Region`/`RegionMut` of its own, since a
    /// borrowed region cannot grow in place.
    pub fn resize(&self, new_len: usize) -> Vec<u8> {
        let mut out = vec![0u8; new_len];
        let keep = self.bytes.len().min(new_len);
        out[..keep].copy_from_slice(&self.bytes[..keep]);
        out
    }

    /// Allocate a fresh buffer holding `self`'s bytes followed by
    /// `other`'s.
    pub fn merge(&self, other: &Region<'_>) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len() + other.bytes.len());
        out.extend_from_slice(self.bytes);
        out.extend_from_slice(other.bytes);
        out
    }

    fn checked_end(&self, start: usize, len: usize) -> Result<usize> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| error!(OutOfBounds, "region offset overflow"))?;
        ensure!(
            end <= self.bytes.len(),
            OutOfBounds,
            "region access [{}, {}) out of bounds for region of length {}",
            start,
            end,
            self.bytes.len(),
        );
        Ok(end)
    }
}

impl<'a> RegionMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        RegionMut { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.bytes
    }

    pub fn as_ref(&self) -> Region<'_> {
        Region::new(self.bytes)
    }

    pub fn slice_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8]> {
        let end = checked_end(self.bytes.len(), start, len)?;
        Ok(&mut self.bytes[start..end])
    }

    pub fn write_at(&mut self, start: usize, src: &[u8]) -> Result<()> {
        let dst = self.slice_mut(start, src.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    pub fn fill(&mut self, start: usize, len: usize, byte: u8) -> Result<()> {
        let dst = self.slice_mut(start, len)?;
        dst.fill(byte);
        Ok(())
    }

    /// Copy `len` bytes from `src_start` to `dst_start` within the same
    /// region. Ranges may overlap.
    pub fn copy_within(&mut self, src_start: usize, dst_start: usize, len: usize) -> Result<()> {
        checked_end(self.bytes.len(), src_start, len)?;
        checked_end(self.bytes.len(), dst_start, len)?;
        self.bytes.copy_within(src_start..src_start + len, dst_start);
        Ok(())
    }

    /// Split into two disjoint mutable sub-regions at `at`.
    pub fn split_at_mut(&mut self, at: usize) -> Result<(RegionMut<'_>, RegionMut<'_>)> {
        ensure!(
            at <= self.bytes.len(),
            OutOfBounds,
            "split offset {} exceeds region length {}",
            at,
            self.bytes.len(),
        );
        let (a, b) = self.bytes.split_at_mut(at);
        Ok((RegionMut::new(a), RegionMut::new(b)))
    }
}

fn checked_end(region_len: usize, start: usize, len: usize) -> Result<usize> {
    let end = start
        .checked_add(len)
        .ok_or_else(|| error!(OutOfBounds, "region offset overflow"))?;
    ensure!(
        end <= region_len,
        OutOfBounds,
        "region access [{}, {}) out of bounds for region of length {}",
        start,
        end,
        region_len,
    );
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_in_bounds() {
        let buf = [1, 2, 3, 4, 5];
        let region = Region::new(&buf);
        assert_eq!(region.slice(1, 3).unwrap(), &[2, 3, 4]);
    }

    #[test]
    fn slice_out_of_bounds_errors() {
        let buf = [1, 2, 3];
        let region = Region::new(&buf);
        assert!(region.slice(2, 5).is_err());
    }

    #[test]
    fn write_and_read_back() {
        let mut buf = [0u8; 8];
        let mut region = RegionMut::new(&mut buf);
        region.write_at(2, &[9, 9, 9]).unwrap();
        assert_eq!(region.as_ref().slice(2, 3).unwrap(), &[9, 9, 9]);
    }

    #[test]
    fn fill_range() {
        let mut buf = [0u8; 4];
        let mut region = RegionMut::new(&mut buf);
        region.fill(1, 2, 0xAB).unwrap();
        assert_eq!(buf, [0, 0xAB, 0xAB, 0]);
    }

    #[test]
    fn find_needle() {
        let buf = b"hello world";
        let region = Region::new(buf);
        assert_eq!(region.find(0, b"world"), Some(6));
        assert_eq!(region.find(7, b"world"), None);
    }

    #[test]
    fn copy_within_overlapping() {
        let mut buf = [1, 2, 3, 4, 5];
        let mut region = RegionMut::new(&mut buf);
        region.copy_within(0, 1, 3).unwrap();
        assert_eq!(buf, [1, 1, 2, 3, 5]);
    }

    #[test]
    fn resize_grows_and_zero_fills() {
        let buf = [1, 2, 3];
        let region = Region::new(&buf);
        assert_eq!(region.resize(5), vec![1, 2, 3, 0, 0]);
    }

    #[test]
    fn resize_truncates() {
        let buf = [1, 2, 3, 4];
        let region = Region::new(&buf);
        assert_eq!(region.resize(2), vec![1, 2]);
    }

    #[test]
    fn merge_concatenates() {
        let a = Region::new(&[1, 2]);
        let b = Region::new(&[3, 4, 5]);
        assert_eq!(a.merge(&b), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn split_at_mut_disjoint() {
        let mut buf = [1, 2, 3, 4];
        let mut region = RegionMut::new(&mut buf);
        let (mut a, mut b) = region.split_at_mut(2).unwrap();
        a.write_at(0, &[9, 9]).unwrap();
        b.write_at(0, &[8, 8]).unwrap();
        assert_eq!(buf, [9, 9, 8, 8]);
    }
}
