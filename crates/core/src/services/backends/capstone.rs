use capstone::{arch, prelude::*, Capstone};
use sha2::{Digest, Sha256};

/// Capstone-based mnemonic fingerprinting.
///
/// Operands are dropped so that relocated call/jump targets in an unlinked
/// object hash the same as the resolved ones in a linked binary.
pub struct MnemonicFingerprinter {
    cs: Capstone,
}

fn make_cs(arch: &str) -> Option<Capstone> {
    let built = match arch {
        "x86_64" | "amd64" => {
            Capstone::new().x86().mode(arch::x86::ArchMode::Mode64).detail(false).build()
        }
        "x86" | "i386" => {
            Capstone::new().x86().mode(arch::x86::ArchMode::Mode32).detail(false).build()
        }
        "arm" | "armv7" => {
            Capstone::new().arm().mode(arch::arm::ArchMode::Arm).detail(false).build()
        }
        "thumb" => Capstone::new().arm().mode(arch::arm::ArchMode::Thumb).detail(false).build(),
        "arm64" | "aarch64" => {
            Capstone::new().arm64().mode(arch::arm64::ArchMode::Arm).detail(false).build()
        }
        _ => return None,
    };
    built.ok()
}

impl MnemonicFingerprinter {
    /// Build a fingerprinter for `arch`, or `None` if capstone has no mode for it.
    pub fn for_arch(arch: &str) -> Option<Self> {
        make_cs(&arch.to_lowercase()).map(|cs| Self { cs })
    }

    /// SHA-256 over the newline-joined mnemonic sequence of `code`.
    ///
    /// Returns `None` when nothing decodes.
    pub fn digest(&self, code: &[u8], address: u64) -> Option<String> {
        let insns = self.cs.disasm_all(code, address).ok()?;
        if insns.is_empty() {
            return None;
        }
        let mut hasher = Sha256::new();
        for insn in insns.iter() {
            hasher.update(insn.mnemonic().unwrap_or("?").as_bytes());
            hasher.update(b"\n");
        }
        Some(format!("{:x}", hasher.finalize()))
    }
}
