use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Creates the byte sink a finalized recording is written to.
///
/// The returned writer is flushed and dropped (closed) by the recorder on
/// every exit path of finalize.
pub trait SinkFactory: Send + Sync {
    fn create(&self, path: &Path) -> std::io::Result<Box<dyn Write + Send>>;
}

/// Writes recordings to the local filesystem, creating missing parent
/// directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSinkFactory;

impl SinkFactory for FileSinkFactory {
    fn create(&self, path: &Path) -> std::io::Result<Box<dyn Write + Send>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("mic_capture_sink_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("out.bin");

        let mut sink = FileSinkFactory.create(&path).unwrap();
        sink.write_all(b"abc").unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert_eq!(fs::read(&path).unwrap(), b"abc");
        fs::remove_dir_all(&dir).ok();
    }
}
