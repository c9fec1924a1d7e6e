//! Record files on disk

use replica_blob::{BlobError, BlobFile, RecordFile, RecordLayout, SegmentFile, utf16};
use replica_core::{
    Primitive, PrimitiveKind, TypeId, TypeRegistry, Value, Visibility, structurally_equal,
};
use tempfile::tempdir;

/// `Slot { level: u8, score: u32, pos: Pos { x: i16, y: i16 } }`
fn save_registry() -> (TypeRegistry, TypeId) {
    let mut registry = TypeRegistry::new();
    let pos = registry.declare_struct("Pos").unwrap();
    for name in ["x", "y"] {
        registry
            .add_field(pos, name, TypeId::primitive(PrimitiveKind::I16), Visibility::Public)
            .unwrap();
    }
    let slot = registry.declare_class("Slot", None).unwrap();
    registry
        .add_field(slot, "level", TypeId::primitive(PrimitiveKind::U8), Visibility::Public)
        .unwrap();
    registry
        .add_field(slot, "score", TypeId::primitive(PrimitiveKind::U32), Visibility::Private)
        .unwrap();
    registry
        .add_field(slot, "pos", pos, Visibility::Public)
        .unwrap();
    (registry, slot)
}

#[test]
fn test_save_and_reload_records() {
    let (registry, slot) = save_registry();
    let dir = tempdir().unwrap();
    let path = dir.path().join("game.sav");

    // 8-byte header, then three 9-byte records
    let mut file = RecordFile::new(&registry, slot, 8 + 3 * 9, 8).unwrap();
    assert_eq!(file.len(), 3);

    let record = file.record(&registry, 2).unwrap();
    let obj = record.as_object().unwrap();
    registry.set_field(obj, "level", Value::from(7u8)).unwrap();
    registry.set_field(obj, "score", Value::from(1234u32)).unwrap();
    let pos = registry.get_field(obj, "pos").unwrap();
    let mut pos = pos.as_struct().unwrap().clone();
    registry
        .set_struct_field(&mut pos, "y", Value::from(-5i16))
        .unwrap();
    registry.set_field(obj, "pos", Value::Struct(pos)).unwrap();
    file.commit_all().unwrap();
    file.save_path(&path).unwrap();

    let mut reloaded = RecordFile::new(&registry, slot, 8 + 3 * 9, 8).unwrap();
    reloaded.load_path(&path).unwrap();
    assert_eq!(reloaded.segments().slot_byte(2, 0).unwrap(), 7);
    assert_eq!(reloaded.segments().slot_u32(2, 1).unwrap(), 1234);

    let again = reloaded.record(&registry, 2).unwrap();
    assert!(structurally_equal(&record, &again));
    assert!(!record.ptr_eq(&again));
}

#[test]
fn test_record_copy_does_not_touch_buffer() {
    let (registry, slot) = save_registry();
    let mut file = RecordFile::new(&registry, slot, 18, 0).unwrap();

    let copy = file.record_copy(&registry, 0).unwrap();
    registry
        .set_field(copy.as_object().unwrap(), "level", Value::from(99u8))
        .unwrap();
    file.commit_all().unwrap();

    assert_eq!(file.segments().slot_byte(0, 0).unwrap(), 0);
    let cached = file.record(&registry, 0).unwrap();
    assert_eq!(
        registry
            .get_field(cached.as_object().unwrap(), "level")
            .unwrap()
            .as_primitive(),
        Some(Primitive::U8(0))
    );

    // Storing the copy explicitly does update the buffer
    file.set_record(1, &copy).unwrap();
    assert_eq!(file.segments().slot_byte(1, 0).unwrap(), 99);
}

#[test]
fn test_reload_drops_cached_records() {
    let (registry, slot) = save_registry();
    let mut file = RecordFile::new(&registry, slot, 9, 0).unwrap();
    let stale = file.record(&registry, 0).unwrap();

    let mut bytes = vec![0u8; 9];
    bytes[0] = 3;
    file.load(&bytes[..]).unwrap();

    let fresh = file.record(&registry, 0).unwrap();
    assert!(!fresh.ptr_eq(&stale));
    assert_eq!(
        registry
            .get_field(fresh.as_object().unwrap(), "level")
            .unwrap()
            .as_primitive(),
        Some(Primitive::U8(3))
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let mut blob = BlobFile::new(4);
    let err = blob.load_path(dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, BlobError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
}

#[test]
fn test_short_file_is_size_mismatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.bin");
    BlobFile::from_bytes(vec![1, 2]).save_path(&path).unwrap();

    let mut segments = SegmentFile::new(4, 0, 2).unwrap();
    assert!(matches!(
        segments.load_path(&path),
        Err(BlobError::SizeMismatch {
            expected: 4,
            found: 2
        })
    ));
}

#[test]
fn test_utf16_names_in_segments() {
    let mut segments = SegmentFile::new(2 + 2 * 8, 2, 8).unwrap();
    for (slot, name) in ["ARIA", "Zoë"].into_iter().enumerate() {
        let mut bytes = utf16::encode(name);
        bytes.resize(8, 0);
        segments.set_segment_bytes(slot, &bytes).unwrap();
    }

    let raw = segments.segment_bytes(1).unwrap();
    let name = utf16::decode(raw).unwrap();
    assert_eq!(name.trim_end_matches('\0'), "Zoë");
    assert_eq!(
        utf16::decode(segments.segment_bytes(0).unwrap()).unwrap(),
        "ARIA"
    );
}

#[test]
fn test_layout_over_existing_segments() {
    let (registry, slot) = save_registry();
    let layout = RecordLayout::of(&registry, slot).unwrap();
    assert_eq!(layout.size(), 9);

    // Segments wider than the record leave padding untouched
    let mut bytes = vec![0xAA; 24];
    bytes[0] = 1;
    bytes[12] = 2;
    let segments = SegmentFile::from_bytes(bytes, 0, 12).unwrap();
    let mut file = RecordFile::with_layout(segments, layout).unwrap();

    let second = file.record(&registry, 1).unwrap();
    assert_eq!(
        registry
            .get_field(second.as_object().unwrap(), "level")
            .unwrap()
            .as_primitive(),
        Some(Primitive::U8(2))
    );
    file.set_record(1, &second).unwrap();
    assert_eq!(file.segments().slot_byte(1, 11).unwrap(), 0xAA);
}
