use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Scratch working directory for one binary invocation.
pub struct Workdir {
    pub root: PathBuf,
}

impl Workdir {
    pub fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("bg-gen-e2e-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    /// Copies a file from the crate into the same relative location.
    pub fn install(&self, relative: &str) -> &Self {
        let from = Path::new(env!("CARGO_MANIFEST_DIR")).join(relative);
        self.write(relative, &std::fs::read(from).unwrap())
    }

    pub fn write(&self, relative: &str, contents: &[u8]) -> &Self {
        let to = self.root.join(relative);
        std::fs::create_dir_all(to.parent().unwrap()).unwrap();
        std::fs::write(to, contents).unwrap();
        self
    }

    pub fn run(&self, bin: &str) -> Output {
        Command::new(bin)
            .current_dir(&self.root)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
