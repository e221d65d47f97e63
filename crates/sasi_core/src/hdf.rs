/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    hdf.rs

    Implements support for raw X68000 SASI hard disk images (.HDF), including
    creation of blank images.

    An HDF image is a flat array of 256-byte blocks with no header or footer.

*/

use std::{
    fs::{File, OpenOptions},
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::device_types::sasi::{SASI_BLOCK_SIZE, SASI_HD_BLOCKS};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Creation of image failed as the file already exists (Will not overwrite).")]
    FileExists,
    #[error("The image was an invalid size ({0} bytes is not a multiple of the block size).")]
    InvalidLength(u64),
    #[error("Short write creating image: block {block} wrote {written} of {expected} bytes.")]
    ShortWrite {
        block: usize,
        written: usize,
        expected: usize,
    },
    #[error("Image IO error: {0}")]
    Io(#[from] io::Error),
}

/// Byte-addressable, seekable block storage backing a hard disk controller.
pub trait BlockImage {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, ImageError>;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ImageError>;
    fn write(&mut self, buf: &[u8]) -> Result<usize, ImageError>;
    fn length(&mut self) -> Result<u64, ImageError>;
    fn flush(&mut self) -> Result<(), ImageError> {
        Ok(())
    }
}

pub struct HardDiskImage<T> {
    stream: T,
}

impl<T: Read + Write + Seek> HardDiskImage<T> {
    /// Wrap a stream as a hard disk image. The stream length must be a whole number of blocks.
    pub fn new(mut stream: T) -> Result<Self, ImageError> {
        let len = stream.seek(SeekFrom::End(0))?;
        if len % SASI_BLOCK_SIZE as u64 != 0 {
            return Err(ImageError::InvalidLength(len));
        }
        stream.seek(SeekFrom::Start(0))?;
        log::debug!("Opened hard disk image: {} blocks", len / SASI_BLOCK_SIZE as u64);
        Ok(Self { stream })
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl HardDiskImage<Cursor<Vec<u8>>> {
    /// Create an in-memory image from a byte vector.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageError> {
        Self::new(Cursor::new(bytes))
    }

    /// Create an in-memory image of `blocks` zeroed blocks.
    pub fn blank(blocks: usize) -> Self {
        Self {
            stream: Cursor::new(vec![0; blocks * SASI_BLOCK_SIZE]),
        }
    }
}

impl HardDiskImage<File> {
    pub fn from_file(file: File) -> Result<Self, ImageError> {
        Self::new(file)
    }
}

impl<T: Read + Write + Seek> BlockImage for HardDiskImage<T> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, ImageError> {
        Ok(self.stream.seek(pos)?)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ImageError> {
        Ok(self.stream.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ImageError> {
        Ok(self.stream.write(buf)?)
    }

    fn length(&mut self) -> Result<u64, ImageError> {
        let pos = self.stream.stream_position()?;
        let len = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    fn flush(&mut self) -> Result<(), ImageError> {
        Ok(self.stream.flush()?)
    }
}

/// Write a blank 20MB image: 0x13C98 blocks of 256 zero bytes.
///
/// Fails if any block write is short. The state of a partially written
/// destination is left to the caller.
pub fn write_blank_image<W: Write>(out: &mut W) -> Result<(), ImageError> {
    let block_buf = [0u8; SASI_BLOCK_SIZE];

    for block in 0..SASI_HD_BLOCKS {
        let written = out.write(&block_buf)?;
        if written < SASI_BLOCK_SIZE {
            log::error!("Short write creating image at block {}: {} bytes", block, written);
            return Err(ImageError::ShortWrite {
                block,
                written,
                expected: SASI_BLOCK_SIZE,
            });
        }
    }
    Ok(())
}

/// Create a new blank HDF image at the specified path. Will not overwrite an existing file.
pub fn create_hdf(path: impl AsRef<Path>) -> Result<HardDiskImage<File>, ImageError> {
    let path = path.as_ref();
    let mut file = match OpenOptions::new().read(true).write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            log::warn!("Requested image file already exists: {}", path.display());
            return Err(ImageError::FileExists);
        }
        Err(e) => return Err(e.into()),
    };

    write_blank_image(&mut file)?;
    file.flush()?;
    log::debug!("Created blank image: {}", path.display());
    HardDiskImage::from_file(file)
}

/// Open an existing HDF image for reading and writing.
pub fn open_hdf(path: impl AsRef<Path>) -> Result<HardDiskImage<File>, ImageError> {
    let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
    HardDiskImage::from_file(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_image_is_20mb() {
        let mut out = Vec::new();
        write_blank_image(&mut out).unwrap();
        assert_eq!(out.len(), SASI_HD_BLOCKS * SASI_BLOCK_SIZE);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn short_write_fails_creation() {
        let mut buf = vec![0xAAu8; 1000];
        let mut slice = buf.as_mut_slice();
        match write_blank_image(&mut slice) {
            Err(ImageError::ShortWrite { block, written, expected }) => {
                assert_eq!(block, 3);
                assert_eq!(written, 1000 - 3 * SASI_BLOCK_SIZE);
                assert_eq!(expected, SASI_BLOCK_SIZE);
            }
            other => panic!("expected ShortWrite, got {:?}", other),
        }
    }

    #[test]
    fn rejects_partial_block_length() {
        match HardDiskImage::from_bytes(vec![0; SASI_BLOCK_SIZE + 1]) {
            Err(ImageError::InvalidLength(len)) => assert_eq!(len, SASI_BLOCK_SIZE as u64 + 1),
            _ => panic!("expected InvalidLength"),
        }
    }

    #[test]
    fn length_preserves_position() {
        let mut image = HardDiskImage::blank(4);
        image.seek(SeekFrom::Start(300)).unwrap();
        assert_eq!(image.length().unwrap(), 4 * SASI_BLOCK_SIZE as u64);
        image.write(&[0x5A]).unwrap();
        assert_eq!(image.get_ref().get_ref()[300], 0x5A);
    }

    #[test]
    fn create_hdf_will_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.hdf");

        let mut image = create_hdf(&path).unwrap();
        assert_eq!(image.length().unwrap(), (SASI_HD_BLOCKS * SASI_BLOCK_SIZE) as u64);

        assert!(matches!(create_hdf(&path), Err(ImageError::FileExists)));

        let mut reopened = open_hdf(&path).unwrap();
        let mut buf = [0xFFu8; SASI_BLOCK_SIZE];
        reopened.seek(SeekFrom::Start(0x1000)).unwrap();
        assert_eq!(reopened.read(&mut buf).unwrap(), SASI_BLOCK_SIZE);
        assert!(buf.iter().all(|&b| b == 0));
    }
}
