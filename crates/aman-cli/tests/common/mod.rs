#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

#[allow(dead_code)]
pub const DOS_DOC: &str = "TABLE OF CONTENTS\n\ndos.library/Close\ndos.library/Open\n\
    \x0cdos.library/Close\n   NAME\n\tClose -- Close an open file\n   SEE ALSO\n\tOpen()\n\
    \x0cdos.library/Open\n   NAME\n\tOpen -- Open a file for input or output\n   SYNOPSIS\n\tfile = Open( name, accessMode )\n   SEE ALSO\n\tClose()\n\
    \x0c\n";

#[allow(dead_code)]
pub const FILE_DOC: &str = "TABLE OF CONTENTS\n\nfile.library/Close\n\
    \x0cfile.library/Close\n   NAME\n\tClose -- close a file handle\n   SEE ALSO\n\tOpen()\n\
    \x0c\n";

/// Autodoc directory and cache directory of one test.
#[allow(dead_code)]
pub struct Fixture {
    pub temp: TempDir,
    pub docs: PathBuf,
    pub cache: PathBuf,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("failed to create temp dir for tests");
        let docs = temp.path().join("autodocs");
        fs::create_dir(&docs).unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        for (name, text) in [("dos.doc", DOS_DOC), ("file.doc", FILE_DOC)] {
            let path = docs.join(name);
            fs::write(&path, text).unwrap();
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(past)
                .unwrap();
        }
        let cache = temp.path().join("cache");
        Self { temp, docs, cache }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// `aman` pointed at this fixture through the environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = aman_cmd(self.path());
        cmd.env("AMANPATH", &self.docs);
        cmd.env("AMANCACHE", &self.cache);
        cmd
    }
}

/// Create an `aman` command isolated from the user's environment and config.
#[allow(dead_code)]
pub fn aman_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aman"));
    cmd.timeout(CMD_TIMEOUT);
    for var in ["AMANPATH", "AMANCACHE", "PAGER", "MANPAGER"] {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env("NO_COLOR", "1");
    cmd
}
