#![allow(dead_code)]

use std::fs;
use std::path::Path;

use object::write::{Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

/// lea eax, [rdi+rsi]; ret
pub const ADD_CODE: &[u8] = &[0x8D, 0x04, 0x37, 0xC3];
/// mov rax, rdi; mov rcx, rdx; rep movsb; ret
pub const MEMCPY_CODE: &[u8] = &[0x48, 0x89, 0xF8, 0x48, 0x89, 0xD1, 0xF3, 0xA4, 0xC3];
/// xor eax, eax; ret
pub const ZERO_CODE: &[u8] = &[0x31, 0xC0, 0xC3];
/// mov eax, edi; sub eax, esi; ret
pub const SUB_CODE: &[u8] = &[0x89, 0xF8, 0x29, 0xF0, 0xC3];

/// Build an x86_64 ELF relocatable object with one `.text` function per entry.
pub fn elf_object(functions: &[(&str, &[u8])]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    for (name, code) in functions {
        let offset = obj.append_section_data(text, code, 16);
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: offset,
            size: code.len() as u64,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
    obj.write().expect("write elf object")
}

/// An ELF object with only a `.data` section.
pub fn data_only_object() -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let data = obj.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
    let offset = obj.append_section_data(data, b"table\x00", 1);
    obj.add_symbol(Symbol {
        name: b"lookup_table".to_vec(),
        value: offset,
        size: 6,
        kind: SymbolKind::Data,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(data),
        flags: SymbolFlags::None,
    });
    obj.write().expect("write data object")
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, bytes).expect("write fixture");
}

/// Corpus used by the matching tests:
/// - libc: `memcpy` and `add` in nested directories
/// - libdup: another `memcpy` with identical code
/// - libx / liby: identical code under different names (`zero_a`, `zero_b`)
pub fn write_matching_corpus(root: &Path) {
    write_file(&root.join("libc/string/memcpy.o"), &elf_object(&[("memcpy", MEMCPY_CODE)]));
    write_file(&root.join("libc/math/add.o"), &elf_object(&[("add", ADD_CODE)]));
    write_file(&root.join("libdup/memcpy_copy.o"), &elf_object(&[("memcpy", MEMCPY_CODE)]));
    write_file(&root.join("libx/zero.o"), &elf_object(&[("zero_a", ZERO_CODE)]));
    write_file(&root.join("liby/zero.o"), &elf_object(&[("zero_b", ZERO_CODE)]));
}

/// Target object containing the corpus functions at different offsets, plus one unknown.
pub fn target_object() -> Vec<u8> {
    elf_object(&[
        ("t_unknown", SUB_CODE),
        ("t_zero", ZERO_CODE),
        ("t_memcpy", MEMCPY_CODE),
        ("t_add", ADD_CODE),
    ])
}
