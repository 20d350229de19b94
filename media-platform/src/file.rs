//! A host file as a storage medium.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use media_adapters::media_buffer::{copy_from_cells, copy_into_cells};
use media_adapters::{SharedBuffer, StorageMedia};

/// Byte-addressed access to a file on the host.
///
/// A missing file is not an error: the medium reports
/// [`needs_initialization`](StorageMedia::needs_initialization) and creates
/// the file in [`initialize`](StorageMedia::initialize).
///
/// Writes past the end grow the file; reads past the end fail with
/// [`ErrorKind::UnexpectedEof`].
///
/// # Examples
///
/// ```no_run
/// use media_platform::file::FileMedia;
/// use media_platform::{SharedBuffer, StorageMedia};
///
/// let mut media = FileMedia::open("disk.img")?;
/// if media.needs_initialization() {
///     media.initialize()?;
///     media.after_initialize()?;
/// }
/// media.write(&SharedBuffer::from_slice(b"data"), 0)?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct FileMedia {
    path: PathBuf,
    file: Option<File>,
    needs_init: bool,
}

impl FileMedia {
    /// Open `path` for reading and writing.
    ///
    /// # Errors
    ///
    /// Any failure other than the file not existing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, needs_init) = match Self::open_read_write(&path) {
            Ok(file) => (Some(file), false),
            Err(e) if e.kind() == ErrorKind::NotFound => (None, true),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            file,
            needs_init,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_read_write(path: &Path) -> io::Result<File> {
        OpenOptions::new().read(true).write(true).open(path)
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "file not initialized"))
    }
}

impl StorageMedia for FileMedia {
    type Error = io::Error;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> io::Result<()> {
        let mut data = vec![0u8; buffer.len()];
        copy_from_cells(&mut data, buffer.cells());
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&data)?;
        file.flush()
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> io::Result<()> {
        let mut data = vec![0u8; buffer.len()];
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut data)?;
        copy_into_cells(buffer.cells(), &data);
        Ok(())
    }

    fn needs_initialization(&self) -> bool {
        self.needs_init
    }

    fn initialize(&mut self) -> io::Result<()> {
        self.file = Some(File::create(&self.path)?);
        Ok(())
    }

    fn after_initialize(&mut self) -> io::Result<()> {
        self.file = None;
        self.file = Some(Self::open_read_write(&self.path)?);
        self.needs_init = false;
        Ok(())
    }
}
