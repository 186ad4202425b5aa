//! The file slot table.
//!
//! Frames refer to their input and output files by slot number.  Input is
//! read a line at a time into a queue, with trailing blanks removed.  Output
//! is written to a scratch file beside the target and moved into place when
//! the file is closed; a file it replaces is kept as `NAME~1`.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cmd_result::CmdFailure;

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn io_failure(path: &Path, err: std::io::Error) -> CmdFailure {
    CmdFailure::File(format!("{}: {err}", path.display()))
}

enum Stream {
    Input {
        reader: Box<dyn BufRead>,
        queue: VecDeque<String>,
    },
    Output {
        writer: BufWriter<File>,
        scratch: PathBuf,
    },
}

/// One open file.
pub struct LudFile {
    pub path: PathBuf,
    /// Input is exhausted.  Output files are never at end of file.
    pub eof: bool,
    /// Lines read or written so far.
    pub line_counter: usize,
    /// Output opened together with an input of the same name by `FE`; it is
    /// discarded on close if the frame was never changed.
    pub paired: bool,
    stream: Stream,
}

impl LudFile {
    pub fn is_output(&self) -> bool {
        matches!(self.stream, Stream::Output { .. })
    }

    /// Lines read from the file but not yet taken.
    pub fn queued(&self) -> usize {
        match &self.stream {
            Stream::Input { queue, .. } => queue.len(),
            Stream::Output { .. } => 0,
        }
    }
}

/// All open files, indexed by slot.
#[derive(Default)]
pub struct FileTable {
    slots: Vec<Option<LudFile>>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, file: LudFile) -> usize {
        match self.slots.iter().position(Option::is_none) {
            Some(slot) => {
                self.slots[slot] = Some(file);
                slot
            }
            None => {
                self.slots.push(Some(file));
                self.slots.len() - 1
            }
        }
    }

    pub fn get(&self, slot: usize) -> Option<&LudFile> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, slot: usize) -> Result<&mut LudFile, CmdFailure> {
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or_else(|| CmdFailure::File("File not open".to_string()))
    }

    pub fn is_eof(&self, slot: usize) -> bool {
        self.get(slot).is_none_or(|f| f.eof && f.queued() == 0)
    }

    pub fn open_input(&mut self, path: impl AsRef<Path>) -> Result<usize, CmdFailure> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_failure(path, e))?;
        Ok(self.open_reader(path, Box::new(BufReader::new(file))))
    }

    /// Opens an input slot over any reader.
    pub fn open_reader(&mut self, path: impl AsRef<Path>, reader: Box<dyn BufRead>) -> usize {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "input opened");
        self.insert(LudFile {
            path,
            eof: false,
            line_counter: 0,
            paired: false,
            stream: Stream::Input {
                reader,
                queue: VecDeque::new(),
            },
        })
    }

    pub fn open_output(&mut self, path: impl AsRef<Path>, paired: bool) -> Result<usize, CmdFailure> {
        let path = path.as_ref().to_path_buf();
        let mut scratch = path.clone().into_os_string();
        scratch.push("~0");
        let scratch = PathBuf::from(scratch);
        let file = File::create(&scratch).map_err(|e| io_failure(&scratch, e))?;
        debug!(path = %path.display(), "output opened");
        Ok(self.insert(LudFile {
            path,
            eof: false,
            line_counter: 0,
            paired,
            stream: Stream::Output {
                writer: BufWriter::new(file),
                scratch,
            },
        }))
    }

    /// Returns up to `n` lines from an input file.  Fewer are returned only
    /// at end of file, and then only if `best_try` is set; otherwise a short
    /// read fails and leaves the lines queued.
    pub fn read(&mut self, slot: usize, n: usize, best_try: bool) -> Result<Vec<String>, CmdFailure> {
        let file = self.get_mut(slot)?;
        let Stream::Input { reader, queue } = &mut file.stream else {
            return Err(CmdFailure::File("Not an input file".to_string()));
        };
        while queue.len() < n && !file.eof {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => file.eof = true,
                Ok(_) => {
                    let end = line.trim_end_matches(['\n', '\r', ' ']).len();
                    line.truncate(end);
                    queue.push_back(line);
                }
                Err(e) => return Err(io_failure(&file.path, e)),
            }
        }
        if queue.len() < n && !best_try {
            return Err(CmdFailure::File("Not enough lines".to_string()));
        }
        let take = n.min(queue.len());
        file.line_counter += take;
        Ok(queue.drain(..take).collect())
    }

    /// Puts lines taken by [`read`](Self::read) back at the head of the queue.
    pub fn unread(&mut self, slot: usize, lines: Vec<String>) -> Result<(), CmdFailure> {
        let file = self.get_mut(slot)?;
        let Stream::Input { queue, .. } = &mut file.stream else {
            return Err(CmdFailure::File("Not an input file".to_string()));
        };
        file.line_counter -= lines.len();
        for line in lines.into_iter().rev() {
            queue.push_front(line);
        }
        Ok(())
    }

    pub fn write(&mut self, slot: usize, line: &str) -> Result<(), CmdFailure> {
        let file = self.get_mut(slot)?;
        let Stream::Output { writer, .. } = &mut file.stream else {
            return Err(CmdFailure::File("Not an output file".to_string()));
        };
        writeln!(writer, "{line}").map_err(|e| io_failure(&file.path, e))?;
        file.line_counter += 1;
        Ok(())
    }

    /// Copies whatever input remains to the output.
    pub fn windthru(&mut self, input: usize, output: usize) -> Result<usize, CmdFailure> {
        let mut copied = 0;
        loop {
            let lines = self.read(input, 64, true)?;
            if lines.is_empty() {
                return Ok(copied);
            }
            for line in &lines {
                self.write(output, line)?;
            }
            copied += lines.len();
        }
    }

    /// Closes a slot, returning the report for the user.  Closing an output
    /// with `delete` set throws its text away.
    pub fn close(&mut self, slot: usize, delete: bool) -> Result<String, CmdFailure> {
        let file = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or_else(|| CmdFailure::File("File not open".to_string()))?;
        let name = file.path.display().to_string();
        let n = file.line_counter;
        match file.stream {
            Stream::Input { .. } => {
                debug!(name, lines = n, "input closed");
                Ok(format!("{name} closed ({n} line{} read).", plural(n)))
            }
            Stream::Output { writer, scratch } => {
                drop(writer.into_inner().map_err(|e| io_failure(&scratch, e.into_error()))?);
                if delete {
                    fs::remove_file(&scratch).map_err(|e| io_failure(&scratch, e))?;
                    debug!(name, "output discarded");
                    return Ok(format!("{name} not written."));
                }
                if file.path.exists() {
                    let mut backup = file.path.clone().into_os_string();
                    backup.push("~1");
                    if let Err(e) = fs::rename(&file.path, &backup) {
                        warn!(name, error = %e, "backup failed");
                    }
                }
                fs::rename(&scratch, &file.path).map_err(|e| io_failure(&file.path, e))?;
                debug!(name, lines = n, "output closed");
                Ok(format!("{name} created ({n} line{} written).", plural(n)))
            }
        }
    }

    /// Open slots, lowest first.
    pub fn open_slots(&self) -> Vec<usize> {
        (0..self.slots.len()).filter(|&s| self.get(s).is_some()).collect()
    }
}
