mod common;

use common::{data_only_object, elf_object, write_file, ADD_CODE, MEMCPY_CODE, ZERO_CODE};
use sigmatch_core::services::backends::ObjectExtractor;
use sigmatch_core::services::extract::{sha256_hex, ExtractError, ExtractOptions, Extractor};
use tempfile::tempdir;

#[test]
fn extracts_named_functions_from_relocatable_elf() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("string.o");
    let bytes = elf_object(&[("memcpy", MEMCPY_CODE), ("add", ADD_CODE)]);
    write_file(&path, &bytes);

    let sig = ObjectExtractor.extract(&path, &ExtractOptions::default()).expect("extract");
    assert_eq!(sig.name, "string.o");
    assert_eq!(sig.arch.as_deref(), Some("x86_64"));
    assert_eq!(sig.source_digest, sha256_hex(&bytes));
    assert_eq!(sig.function_count(), 2);

    let names: Vec<&str> = sig.viable_symbols().iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"memcpy"));
    assert!(names.contains(&"add"));

    let memcpy = sig.functions().find(|f| f.name == "memcpy").expect("memcpy descriptor");
    assert_eq!(memcpy.size, MEMCPY_CODE.len() as u64);
    assert_eq!(memcpy.digest, sha256_hex(MEMCPY_CODE));
    assert!(sig.is_viable(memcpy.address));
    assert_eq!(sig.function(memcpy.address).map(|f| f.name.as_str()), Some("memcpy"));

    let add = sig.functions().find(|f| f.name == "add").expect("add descriptor");
    assert_ne!(add.address, memcpy.address, "section-relative values must not collide");
}

#[cfg(feature = "capstone-backend")]
#[test]
fn capstone_backend_records_mnemonic_digests() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("zero.o");
    write_file(&path, &elf_object(&[("zero", ZERO_CODE)]));

    let sig = ObjectExtractor.extract(&path, &ExtractOptions::default()).expect("extract");
    let zero = sig.functions().next().expect("one function");
    assert!(zero.mnemonic_digest.is_some());
    assert_eq!(zero.structural_key(), zero.mnemonic_digest.as_deref().unwrap_or_default());
}

#[test]
fn undersized_functions_are_not_viable() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("mixed.o");
    write_file(&path, &elf_object(&[("zero", ZERO_CODE), ("memcpy", MEMCPY_CODE)]));

    let options = ExtractOptions { arch: None, min_function_size: 4 };
    let sig = ObjectExtractor.extract(&path, &options).expect("extract");
    let zero = sig.functions().find(|f| f.name == "zero").expect("zero descriptor");
    assert!(!zero.viable);
    assert!(!sig.is_viable(zero.address));
    assert_eq!(sig.viable_functions().len(), 1);
    assert!(sig.function(zero.address).is_some(), "stubs stay resolvable");
}

#[test]
fn arch_hint_overrides_header() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("add.o");
    write_file(&path, &elf_object(&[("add", ADD_CODE)]));

    let options = ExtractOptions { arch: Some("X86".into()), min_function_size: 1 };
    let sig = ObjectExtractor.extract(&path, &options).expect("extract");
    assert_eq!(sig.arch.as_deref(), Some("x86"));
}

#[test]
fn empty_and_data_only_objects_have_no_executable_content() {
    let tmp = tempdir().expect("tempdir");
    let empty = tmp.path().join("empty.o");
    let data = tmp.path().join("data.o");
    write_file(&empty, b"");
    write_file(&data, &data_only_object());

    for path in [&empty, &data] {
        let err = ObjectExtractor.extract(path, &ExtractOptions::default()).expect_err("no code");
        assert!(err.is_no_executable_content(), "unexpected error for {}: {err}", path.display());
    }
}

#[test]
fn garbage_and_missing_files_are_distinct_failures() {
    let tmp = tempdir().expect("tempdir");
    let garbage = tmp.path().join("garbage.o");
    write_file(&garbage, b"\x7fELF this is not really an object file");

    let err = ObjectExtractor.extract(&garbage, &ExtractOptions::default()).expect_err("garbage");
    assert!(!err.is_no_executable_content());
    assert!(matches!(err, ExtractError::Parse { .. }), "unexpected error: {err}");

    let missing = tmp.path().join("missing.o");
    let err = ObjectExtractor.extract(&missing, &ExtractOptions::default()).expect_err("missing");
    assert!(matches!(err, ExtractError::Io { .. }));
}
