use std::fs;
use std::path::Path;

use goblin::elf::{self, Elf};
use goblin::Object;

use crate::model::{FunctionDescriptor, Signature};
use crate::services::extract::{sha256_hex, ExtractError, ExtractOptions, Extractor};

/// goblin-backed extractor for ELF relocatable objects, executables, and shared objects.
pub struct ObjectExtractor;

#[derive(Debug, Clone)]
struct ExecSection {
    index: usize,
    name: String,
    /// Base of this section in the signature's address space.
    base: u64,
    file_offset: u64,
    size: u64,
}

impl ExecSection {
    fn is_stub_section(&self) -> bool {
        self.name.starts_with(".plt") || self.name == ".got.plt"
    }
}

fn arch_from_machine(machine: u16) -> Option<String> {
    match machine {
        elf::header::EM_X86_64 => Some("x86_64".into()),
        elf::header::EM_386 => Some("x86".into()),
        elf::header::EM_AARCH64 => Some("arm64".into()),
        elf::header::EM_ARM => Some("arm".into()),
        _ => None,
    }
}

/// Executable, file-backed, non-empty sections.
///
/// Relocatable objects have every section at address zero, so each section is
/// based at its file offset instead to keep symbol addresses distinct.
fn exec_sections(elf: &Elf) -> Vec<ExecSection> {
    let relocatable = elf.header.e_type == elf::header::ET_REL;
    elf.section_headers
        .iter()
        .enumerate()
        .filter(|(_, sh)| {
            sh.sh_flags & elf::section_header::SHF_EXECINSTR as u64 != 0
                && sh.sh_type != elf::section_header::SHT_NOBITS
                && sh.sh_size > 0
        })
        .map(|(index, sh)| ExecSection {
            index,
            name: elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("").to_string(),
            base: if relocatable { sh.sh_offset } else { sh.sh_addr },
            file_offset: sh.sh_offset,
            size: sh.sh_size,
        })
        .collect()
}

/// Map `[offset, offset+size)` inside `sec` to a file byte range, clamped to the section.
fn file_range(sec: &ExecSection, offset: u64, size: u64, bytes_len: usize) -> Option<(usize, usize)> {
    if offset >= sec.size {
        return None;
    }
    let available = sec.size - offset;
    let start = sec.file_offset.saturating_add(offset);
    let end = start.saturating_add(size.min(available)).min(bytes_len as u64);
    if start as usize >= bytes_len || end <= start {
        None
    } else {
        Some((start as usize, end as usize))
    }
}

fn elf_functions(
    elf: &Elf,
    bytes: &[u8],
    sections: &[ExecSection],
    arch: Option<&str>,
    options: &ExtractOptions,
) -> Vec<FunctionDescriptor> {
    let relocatable = elf.header.e_type == elf::header::ET_REL;
    #[cfg(feature = "capstone-backend")]
    let fingerprinter = arch.and_then(super::capstone::MnemonicFingerprinter::for_arch);
    #[cfg(not(feature = "capstone-backend"))]
    let _ = arch;

    let mut functions = Vec::new();
    for sym in elf.syms.iter() {
        if !sym.is_function() || sym.st_shndx == elf::section_header::SHN_UNDEF as usize {
            continue;
        }
        let Some(sec) = sections.iter().find(|s| s.index == sym.st_shndx) else {
            continue;
        };
        let offset = if relocatable {
            sym.st_value
        } else {
            match sym.st_value.checked_sub(sec.base) {
                Some(off) => off,
                None => continue,
            }
        };
        let address = sec.base.saturating_add(offset);
        let name = match elf.strtab.get_at(sym.st_name) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("sub_{address:X}"),
        };
        // Hand-written assembly often leaves st_size at zero; keep those as empty bodies.
        let body: &[u8] = if sym.st_size == 0 {
            if offset >= sec.size {
                continue;
            }
            &[]
        } else {
            match file_range(sec, offset, sym.st_size, bytes.len()) {
                Some((start, end)) => &bytes[start..end],
                None => continue,
            }
        };

        let viable = sym.st_size >= options.min_function_size && !sec.is_stub_section();
        #[cfg(feature = "capstone-backend")]
        let mnemonic_digest = fingerprinter.as_ref().and_then(|fp| fp.digest(body, address));
        #[cfg(not(feature = "capstone-backend"))]
        let mnemonic_digest = None;

        functions.push(
            FunctionDescriptor::new(address, name, sym.st_size, sha256_hex(body))
                .with_mnemonic_digest(mnemonic_digest)
                .with_viable(viable),
        );
    }
    functions
}

impl Extractor for ObjectExtractor {
    fn extract(&self, path: &Path, options: &ExtractOptions) -> Result<Signature, ExtractError> {
        let bytes = fs::read(path)
            .map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })?;
        if bytes.is_empty() {
            return Err(ExtractError::NoExecutableContent(path.to_path_buf()));
        }

        let elf = match Object::parse(&bytes) {
            Ok(Object::Elf(elf)) => elf,
            Ok(Object::PE(_)) => {
                return Err(ExtractError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: "PE".into(),
                })
            }
            Ok(Object::Mach(_)) => {
                return Err(ExtractError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: "Mach-O".into(),
                })
            }
            Ok(_) => {
                return Err(ExtractError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    format: "unknown".into(),
                })
            }
            Err(e) => {
                return Err(ExtractError::Parse { path: path.to_path_buf(), reason: e.to_string() })
            }
        };

        let sections = exec_sections(&elf);
        if sections.is_empty() {
            return Err(ExtractError::NoExecutableContent(path.to_path_buf()));
        }

        let arch = options
            .arch
            .as_ref()
            .map(|a| a.to_lowercase())
            .or_else(|| arch_from_machine(elf.header.e_machine));
        let functions = elf_functions(&elf, &bytes, &sections, arch.as_deref(), options);

        let name = path
            .file_name()
            .and_then(|os| os.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Signature::new(name, arch, sha256_hex(&bytes), functions))
    }

    fn name(&self) -> &'static str {
        "elf"
    }
}
