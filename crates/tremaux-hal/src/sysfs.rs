//! Linux GPIO sysfs backend.
//!
//! Line ownership maps onto the kernel's export mechanism: acquiring a line
//! writes its number to `<root>/export`, releasing writes it to
//! `<root>/unexport`, and a line is held while `<root>/gpioN` exists.
//! The kernel creates that directory asynchronously, so `acquire` waits for
//! it (up to the export timeout) before returning.
//! Direction and level go through the per-line `direction` and `value`
//! attribute files.  The root defaults to `/sys/class/gpio` and can be
//! pointed elsewhere for testing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tremaux_types::{Level, Line, PinMode, PortFault};

use crate::port::DigitalPort;

/// Default mount point of the GPIO sysfs class.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// How long `acquire` waits for `gpioN` to appear after the export write.
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_millis(500);

const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A [`DigitalPort`] backed by `/sys/class/gpio`.
#[derive(Debug, Clone)]
pub struct SysfsPort {
    root: PathBuf,
    export_timeout: Duration,
}

impl SysfsPort {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn line_dir(&self, line: Line) -> PathBuf {
        self.root.join(format!("gpio{}", line.0))
    }

    fn put(path: &Path, contents: &str) -> Result<(), PortFault> {
        fs::write(path, contents)
            .map_err(|e| PortFault::new(format!("write {}: {e}", path.display())))
    }

    fn wait_for_export(&self, line: Line) -> Result<(), PortFault> {
        let dir = self.line_dir(line);
        let deadline = Instant::now() + self.export_timeout;
        loop {
            if dir.is_dir() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PortFault::new(format!(
                    "{} did not appear within {:?} of export",
                    dir.display(),
                    self.export_timeout
                )));
            }
            thread::sleep(EXPORT_POLL_INTERVAL);
        }
    }
}

impl Default for SysfsPort {
    fn default() -> Self {
        Self::new(DEFAULT_GPIO_ROOT)
    }
}

impl DigitalPort for SysfsPort {
    fn is_held(&self, line: Line) -> Result<bool, PortFault> {
        let dir = self.line_dir(line);
        match fs::metadata(&dir) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PortFault::new(format!("stat {}: {e}", dir.display()))),
        }
    }

    fn acquire(&mut self, line: Line) -> Result<(), PortFault> {
        Self::put(&self.root.join("export"), &line.0.to_string())?;
        self.wait_for_export(line)
    }

    fn release(&mut self, line: Line) -> Result<(), PortFault> {
        Self::put(&self.root.join("unexport"), &line.0.to_string())
    }

    fn set_mode(&mut self, line: Line, mode: PinMode) -> Result<(), PortFault> {
        let direction = match mode {
            PinMode::Input => "in",
            PinMode::Output => "out",
        };
        Self::put(&self.line_dir(line).join("direction"), direction)
    }

    fn write(&mut self, line: Line, level: Level) -> Result<(), PortFault> {
        let value = if level.is_high() { "1" } else { "0" };
        Self::put(&self.line_dir(line).join("value"), value)
    }

    fn read(&mut self, line: Line) -> Result<Level, PortFault> {
        let path = self.line_dir(line).join("value");
        let raw = fs::read_to_string(&path)
            .map_err(|e| PortFault::new(format!("read {}: {e}", path.display())))?;
        match raw.trim() {
            "0" => Ok(Level::Low),
            "1" => Ok(Level::High),
            other => Err(PortFault::new(format!(
                "unexpected value {other:?} in {}",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sysfs_with_line(n: u32) -> (tempfile::TempDir, SysfsPort) {
        let dir = tempfile::tempdir().expect("tmp dir");
        fs::create_dir(dir.path().join(format!("gpio{n}"))).expect("line dir");
        let port = SysfsPort::new(dir.path());
        (dir, port)
    }

    #[test]
    fn exported_line_is_held() {
        let (_dir, port) = fake_sysfs_with_line(18);
        assert!(port.is_held(Line(18)).unwrap());
        assert!(!port.is_held(Line(19)).unwrap());
    }

    #[test]
    fn acquire_and_release_write_the_line_number() {
        let (dir, mut port) = fake_sysfs_with_line(11);
        port.acquire(Line(11)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "11");
        port.release(Line(11)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("unexport")).unwrap(), "11");
    }

    #[test]
    fn acquire_fails_when_the_line_never_appears() {
        let (dir, port) = fake_sysfs_with_line(18);
        let mut port = port.with_export_timeout(Duration::from_millis(20));
        let err = port.acquire(Line(11)).unwrap_err();
        assert!(err.to_string().contains("gpio11"), "{err}");
        assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "11");
    }

    #[test]
    fn acquire_waits_for_the_kernel_to_create_the_line() {
        let (dir, port) = fake_sysfs_with_line(18);
        let mut port = port.with_export_timeout(Duration::from_secs(5));
        let line_dir = dir.path().join("gpio11");
        let creator = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            fs::create_dir(line_dir).unwrap();
        });

        port.acquire(Line(11)).unwrap();
        creator.join().unwrap();

        assert!(port.is_held(Line(11)).unwrap());
    }

    #[test]
    fn mode_and_level_use_attribute_files() {
        let (dir, mut port) = fake_sysfs_with_line(3);
        port.set_mode(Line(3), PinMode::Output).unwrap();
        port.write(Line(3), Level::High).unwrap();
        let line_dir = dir.path().join("gpio3");
        assert_eq!(fs::read_to_string(line_dir.join("direction")).unwrap(), "out");
        assert_eq!(fs::read_to_string(line_dir.join("value")).unwrap(), "1");
        assert_eq!(port.read(Line(3)).unwrap(), Level::High);
    }

    #[test]
    fn read_tolerates_trailing_newline() {
        let (dir, mut port) = fake_sysfs_with_line(18);
        fs::write(dir.path().join("gpio18").join("value"), "0\n").unwrap();
        assert_eq!(port.read(Line(18)).unwrap(), Level::Low);
    }

    #[test]
    fn garbage_value_is_a_fault() {
        let (dir, mut port) = fake_sysfs_with_line(18);
        fs::write(dir.path().join("gpio18").join("value"), "x").unwrap();
        assert!(port.read(Line(18)).is_err());
    }

    #[test]
    fn unexported_line_cannot_be_read() {
        let (_dir, mut port) = fake_sysfs_with_line(18);
        assert!(port.read(Line(5)).is_err());
    }
}
