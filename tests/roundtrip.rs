//! Full conversion cycles over a synthetic class library.

mod common;

use std::{fs, io::Cursor};

use common::{build_assembly, hello_world, identifiers, scratch_dir, CLI_HEADER_RVA};
use webcil::prelude::*;

fn options() -> ConvertOptions {
    ConvertOptions::default().with_timestamp(0x6543_2100)
}

#[test]
fn wrapped_roundtrip() {
    let dir = scratch_dir("wrapped_roundtrip");
    let input = dir.join("HelloWorld.dll");
    let output = dir.join("HelloWorld.wasm");
    fs::write(&input, hello_world()).unwrap();

    convert_to_webcil(&input, &output, true).unwrap();

    let module = fs::read(&output).unwrap();
    assert_eq!(Format::detect(&module), Some(Format::Wasm));

    let mut reader = Cursor::new(module);
    let pe = convert_from_webcil(&mut reader, true).unwrap();
    assert_eq!(Format::detect(&pe), Some(Format::Pe));

    let original = MetadataSummary::from_pe_bytes(hello_world()).unwrap();
    let reconstructed = MetadataSummary::from_pe_bytes(pe).unwrap();
    assert_eq!(original, reconstructed);
    assert_eq!(reconstructed.cli_header_rva, CLI_HEADER_RVA);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn bare_roundtrip() {
    let original = hello_world();
    let file = File::from_mem(original.clone()).unwrap();

    let payload = pe_to_webcil(&file).unwrap();
    assert_eq!(Format::detect(&payload), Some(Format::Webcil));

    let pe = convert_from_webcil_with(
        &mut Cursor::new(&payload),
        &options().with_webassembly(false),
    )
    .unwrap();

    // Identical section layout, so everything behind the headers matches
    assert_eq!(pe.len(), original.len());
    assert_eq!(&pe[0x200..], &original[0x200..]);

    // Converting the reconstruction again yields the same payload
    let again = pe_to_webcil(&File::from_mem(pe).unwrap()).unwrap();
    assert_eq!(again, payload);
}

#[test]
fn wasm_layers() {
    // PE -> Webcil -> wasm -> Webcil -> PE
    let original = build_assembly("Contoso.Billing", "InvoiceService", "Submit");
    let payload = pe_to_webcil(&File::from_mem(original).unwrap()).unwrap();

    let mut module = Vec::new();
    WasmWebcilWrapper::new(&payload)
        .write_wrapped(&mut module)
        .unwrap();

    let unwrapped = WasmWebcilUnwrapper::new(&mut Cursor::new(&module))
        .unwrap_to_vec()
        .unwrap();
    assert_eq!(unwrapped, payload);

    let pe = convert_from_webcil(&mut Cursor::new(&unwrapped), false).unwrap();
    let summary = MetadataSummary::from_pe_bytes(pe).unwrap();

    assert_eq!(
        summary.identifiers,
        identifiers("Contoso.Billing", "InvoiceService", "Submit")
    );
    assert!(summary.has_identifier("InvoiceService"));
    assert!(summary.has_identifier("Submit"));
}

#[test]
fn reproducible_output() {
    let payload = pe_to_webcil(&File::from_mem(hello_world()).unwrap()).unwrap();
    let options = options().with_webassembly(false);

    let first = convert_from_webcil_with(&mut Cursor::new(&payload), &options).unwrap();
    let second = convert_from_webcil_with(&mut Cursor::new(&payload), &options).unwrap();
    assert_eq!(first, second);

    let other = convert_from_webcil_with(
        &mut Cursor::new(&payload),
        &options.with_timestamp(1),
    )
    .unwrap();
    assert_ne!(first, other);
    assert_eq!(&first[0x200..], &other[0x200..]);
}

#[test]
fn batch_roundtrip() {
    let dir = scratch_dir("batch_roundtrip");
    let names = [
        ("Alpha", "First", "One"),
        ("Beta", "Second", "Two"),
        ("Gamma", "Third", "Three"),
    ];

    let mut to_webcil = Vec::new();
    let mut to_pe = Vec::new();
    for (namespace, type_name, method) in names {
        let input = dir.join(format!("{namespace}.dll"));
        fs::write(&input, build_assembly(namespace, type_name, method)).unwrap();

        let wasm = dir.join(format!("{namespace}.wasm"));
        to_webcil.push(BatchJob::new(&input, &wasm, Direction::ToWebcil));
        to_pe.push(BatchJob::new(
            &wasm,
            dir.join(format!("{namespace}.out.dll")),
            Direction::FromWebcil,
        ));
    }

    assert!(convert_batch(&to_webcil, &options()).iter().all(|result| result.is_ok()));
    assert!(convert_batch(&to_pe, &options()).iter().all(|result| result.is_ok()));

    for (namespace, type_name, method) in names {
        let pe = fs::read(dir.join(format!("{namespace}.out.dll"))).unwrap();
        let summary = MetadataSummary::from_pe_bytes(pe).unwrap();
        assert_eq!(summary.identifiers, identifiers(namespace, type_name, method));
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn rejects_non_webcil() {
    let pe = hello_world();

    // A PE image is neither a wasm module nor a Webcil payload
    assert!(matches!(
        convert_from_webcil(&mut Cursor::new(&pe), true),
        Err(Error::InvalidWasmPrefix)
    ));
    assert!(matches!(
        convert_from_webcil(&mut Cursor::new(&pe), false),
        Err(Error::Malformed { .. })
    ));

    assert!(matches!(
        convert_from_webcil(&mut Cursor::new(b"\0asm"), true),
        Err(Error::TruncatedWasmPrefix)
    ));
}
