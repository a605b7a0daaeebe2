//! Fixed host source surrounding the generated sections.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EmitError;

/// File names looked up by [`Fragments::load`].
pub const PROLOGUE_FILE: &str = "prologue.cpp";
pub const MID_FILE: &str = "mid.cpp";
pub const EPILOGUE_FILE: &str = "epilogue.cpp";

/// Prologue, mid and epilogue text.
///
/// The generated allocation section goes between `prologue` and `mid`, the
/// execution section between `mid` and `epilogue`. The built-in set declares
/// `context`, `queue`, `err`, `data_size`, the `input_data`/`size_data`/
/// `output_data` vectors, `global_size` and one `cl_kernel` per
/// [`kernel_name`](crate::emit::kernel_name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragments {
    pub prologue: String,
    pub mid: String,
    pub epilogue: String,
}

impl Default for Fragments {
    fn default() -> Self {
        Fragments::builtin()
    }
}

impl Fragments {
    /// The fragments shipped with the crate.
    pub fn builtin() -> Self {
        Fragments {
            prologue: include_str!("../templates/prologue.cpp").to_string(),
            mid: include_str!("../templates/mid.cpp").to_string(),
            epilogue: include_str!("../templates/epilogue.cpp").to_string(),
        }
    }

    /// Reads `prologue.cpp`, `mid.cpp` and `epilogue.cpp` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, EmitError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|err| EmitError::io(path, err))
        };
        Ok(Fragments {
            prologue: read(PROLOGUE_FILE)?,
            mid: read(MID_FILE)?,
            epilogue: read(EPILOGUE_FILE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::kernel_name;
    use hashpipe_core::ops::Opcode;

    #[test]
    fn builtin_prologue_creates_every_kernel() {
        let fragments = Fragments::builtin();
        for opcode in [Opcode::Md5, Opcode::Sha256, Opcode::Sha384, Opcode::Sha512, Opcode::Xor] {
            let kernel = kernel_name(opcode).unwrap();
            assert!(
                fragments.prologue.contains(&format!("cl_kernel {kernel} = clCreateKernel(")),
                "{kernel} missing from prologue"
            );
        }
    }

    #[test]
    fn builtin_fragments_declare_section_variables() {
        let fragments = Fragments::builtin();
        for name in ["input_data", "size_data", "output_data", "data_size", "queue", "context"] {
            assert!(fragments.prologue.contains(name), "{name}");
        }
        assert!(fragments.mid.contains("size_t global_size"));
        assert!(fragments.epilogue.trim_end().ends_with('}'));
    }

    #[test]
    fn load_reports_missing_file_path() {
        let dir = std::env::temp_dir().join("hashpipe-no-such-fragments");
        let err = Fragments::load(&dir).unwrap_err();
        match err {
            EmitError::Io { path, .. } => assert!(path.ends_with(PROLOGUE_FILE)),
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
